// Copyright (c) 2023 Nick Piaddo
// SPDX-License-Identifier: Apache-2.0 OR MIT

// From dependency library

// From standard library

// From this library

/// Device topology information.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Topology {
    pub(crate) alignment_offset: u64,
    pub(crate) minimum_io_size: u64,
    pub(crate) optimal_io_size: u64,
    pub(crate) logical_sector_size: u64,
    pub(crate) physical_sector_size: u64,
}

impl Topology {
    /// Alignment offset in bytes.
    pub fn alignment_offset(&self) -> u64 {
        self.alignment_offset
    }

    /// Minimum size in bytes of an I/O request.
    pub fn minimum_io_size(&self) -> u64 {
        self.minimum_io_size
    }

    /// Optimal size in bytes of an I/O request (0 when unknown).
    pub fn optimal_io_size(&self) -> u64 {
        self.optimal_io_size
    }

    /// Logical sector size in bytes.
    pub fn logical_sector_size(&self) -> u64 {
        self.logical_sector_size
    }

    /// Physical sector size in bytes.
    pub fn physical_sector_size(&self) -> u64 {
        self.physical_sector_size
    }
}
