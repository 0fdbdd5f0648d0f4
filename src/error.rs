// Copyright (c) 2023 Nick Piaddo
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Library-level error module.

// From dependency library
use thiserror::Error;

// From standard library

// From this library
use crate::core::errors::ConversionError;
use crate::core::errors::ParserError;

use crate::cache::CacheError;
use crate::config::ConfigError;

use crate::probe::ProbeBuilderError;
use crate::probe::ProbeError;

/// A specialized [`Result`](std::result::Result) type for `rsdevid`.
///
/// This typedef is generally used at the program-level to avoid writing out [`RsDevIdError`]
/// directly, and is, otherwise, a direct mapping to [`Result`](std::result::Result).
#[allow(dead_code)]
pub type Result<T> = std::result::Result<T, RsDevIdError>;

/// Library-level runtime errors.
///
/// This enum includes all variants of error types susceptible to occur in the library. Other, more
/// granular error types, are automatically converted to `RsDevIdError` when needed.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RsDevIdError {
    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Conversion(#[from] ConversionError),

    #[error(transparent)]
    Parser(#[from] ParserError),

    #[error(transparent)]
    Probe(#[from] ProbeError),

    #[error(transparent)]
    ProbeBuilder(#[from] ProbeBuilderError),
}
