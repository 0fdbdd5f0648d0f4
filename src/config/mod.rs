// Copyright (c) 2023 Nick Piaddo
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Library configuration (`blkid.conf`).

// From dependency library

// From standard library

// From this library
pub use config_error_enum::ConfigError;
pub use config_struct::Config;
pub use eval_method_enum::EvalMethod;

pub(crate) use config_struct::default_cache_file;

mod config_error_enum;
mod config_struct;
mod eval_method_enum;
