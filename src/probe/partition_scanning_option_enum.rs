// Copyright (c) 2023 Nick Piaddo
// SPDX-License-Identifier: Apache-2.0 OR MIT

// From dependency library
use num_enum::IntoPrimitive;

// From standard library
use std::fmt;

// From this library

/// Optional scanning criteria for partition search functions.
#[derive(Clone, Copy, Debug, Eq, PartialEq, IntoPrimitive)]
#[non_exhaustive]
#[repr(u32)]
pub enum PartitionScanningOption {
    /// Scan for a GPT partition table even when the protective MBR is missing
    /// or invalid.
    ForceGPT = 1 << 1,
    /// Collect `PART_ENTRY_*` details about the partition matching the
    /// probing window.
    EntryDetails = 1 << 2,
    /// Extract properties `PTMAGIC`, and `PTMAGIC_OFFSET`.
    Magic = 1 << 3,
}

impl PartitionScanningOption {
    /// View this `PartitionScanningOption` as a UTF-8 `str`.
    pub fn as_str(&self) -> &str {
        match self {
            PartitionScanningOption::ForceGPT => "Force GPT",
            PartitionScanningOption::EntryDetails => "Entry details",
            PartitionScanningOption::Magic => "Magic",
        }
    }
}

impl fmt::Display for PartitionScanningOption {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
