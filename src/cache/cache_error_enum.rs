// Copyright (c) 2023 Nick Piaddo
// SPDX-License-Identifier: Apache-2.0 OR MIT

// From dependency library
use thiserror::Error;

// From standard library

// From this library
use crate::config::ConfigError;

/// [`Cache`](crate::cache::Cache) runtime errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CacheError {
    /// Error while reading the library configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Error while performing Input/Output operations.
    #[error(transparent)]
    IoError(#[from] std::io::Error),
}
