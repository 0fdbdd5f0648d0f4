// Copyright (c) 2023 Nick Piaddo
// SPDX-License-Identifier: Apache-2.0 OR MIT

// From dependency library
use thiserror::Error;

// From standard library

// From this library

/// [`Config`](crate::config::Config) runtime errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// Error while performing Input/Output operations.
    #[error(transparent)]
    IoError(#[from] std::io::Error),

    /// Error while parsing a configuration file.
    #[error("{0}")]
    Parse(String),
}
