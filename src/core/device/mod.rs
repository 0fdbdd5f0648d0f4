// Copyright (c) 2023 Nick Piaddo
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Device objects and helper functions.

// From dependency library

// From standard library

// From this library
pub use label_struct::Label;
pub use tag_name_enum::TagName;
pub use tag_struct::Tag;
pub use usage_enum::Usage;
pub use uuid_struct::Uuid;

mod label_struct;
mod tag_name_enum;
mod tag_struct;
mod usage_enum;
mod uuid_struct;
