// Copyright (c) 2023 Nick Piaddo
// SPDX-License-Identifier: Apache-2.0 OR MIT

// From dependency library

// From standard library

// From this library

/// Result of a device scan.
#[derive(Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum ScanResult {
    /// Found device properties with conflicting values (e.g. several
    /// intolerant file system signatures on the same device). In this case,
    /// manual intervention is advised.
    ConflictingValues,
    /// Found no device properties.
    NoProperties,
    /// Found device properties.
    FoundProperties,
}

impl ScanResult {
    /// Returns `true` when the scan found device properties.
    pub fn found(&self) -> bool {
        matches!(self, ScanResult::FoundProperties)
    }
}
