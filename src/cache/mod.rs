// Copyright (c) 2023 Nick Piaddo
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! High-level handle pairing an in-memory device list with the on-disk tag
//! cache location.

// From dependency library

// From standard library

// From this library
pub use cache_error_enum::CacheError;
pub use cache_struct::Cache;
pub use device_struct::Device;

mod cache_error_enum;
mod cache_struct;
mod device_struct;
