// Copyright (c) 2023 Nick Piaddo
// SPDX-License-Identifier: Apache-2.0 OR MIT

// From dependency library
use thiserror::Error;

// From standard library

// From this library
use crate::probe::ProbeError;

/// [`ProbeBuilder`](crate::probe::ProbeBuilder) runtime errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProbeBuilderError {
    /// Error when two mutually exclusive options are set simultaneously.
    #[error("{0}")]
    MutuallyExclusive(String),

    /// Error while configuring the [`Probe`](crate::probe::Probe) under
    /// construction.
    #[error(transparent)]
    Probe(#[from] ProbeError),

    /// Error when a required option is missing.
    #[error("{0}")]
    Required(String),
}
