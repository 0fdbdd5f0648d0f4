// Copyright (c) 2023 Nick Piaddo
// SPDX-License-Identifier: Apache-2.0 OR MIT

// From dependency library
use thiserror::Error;

// From standard library

// From this library

/// Value conversion runtime errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConversionError {
    /// Error while converting a value to a [`Label`](crate::core::device::Label).
    #[error("{0}")]
    Label(String),

    /// Error while converting a value to a [`Usage`](crate::core::device::Usage).
    #[error("{0}")]
    Usage(String),

    /// Error while converting a value to a [`Uuid`](crate::core::device::Uuid).
    #[error("{0}")]
    Uuid(String),
}
