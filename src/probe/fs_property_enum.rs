// Copyright (c) 2023 Nick Piaddo
// SPDX-License-Identifier: Apache-2.0 OR MIT

// From dependency library
use num_enum::IntoPrimitive;

// From standard library
use std::fmt;

// From this library

/// File system properties.
///
/// Extractable properties:
/// - `TYPE`: file system type.
/// - `SEC_TYPE`: secondary file system type.
/// - `LABEL`: file system label.
/// - `LABEL_FATBOOT`: label stored in a FAT boot sector, when it differs from
///   the root-directory label.
/// - `UUID`: file system's UUID (lower case).
/// - `UUID_SUB`: subvolume UUID (e.g. for `BTRFS`).
/// - `LOGUUID`: external log UUID (e.g. for `XFS`).
/// - `USAGE`: usage string (i.e. "raid", "filesystem", etc.).
/// - `VERSION`: file system version.
/// - `SBMAGIC`: super block magic string.
/// - `SBMAGIC_OFFSET`: offset of `SBMAGIC`.
/// - `FSSIZE`: file system size.
/// - `BLOCK_SIZE`: minimal block size accessible to the file system.
#[derive(Clone, Copy, Debug, Eq, PartialEq, IntoPrimitive)]
#[non_exhaustive]
#[repr(u32)]
pub enum FsProperty {
    /// Accept bad checksums, reporting them with a `SBBADCSUM=1` tag.
    BadChecksum = 1 << 10,
    /// Combination of `Label`, `Uuid`, `Type` and `SecondType`.
    Default = (1 << 1) | (1 << 3) | (1 << 5) | (1 << 6),
    /// Extract properties `LABEL`, and `LABEL_FATBOOT`.
    Label = 1 << 1,
    /// Extract properties `SBMAGIC`, and `SBMAGIC_OFFSET`.
    Magic = 1 << 9,
    /// Extract property `SEC_TYPE`.
    SecondType = 1 << 6,
    /// Extract property `TYPE`.
    Type = 1 << 5,
    /// Extract property `USAGE`.
    Usage = 1 << 7,
    /// Extract properties `UUID`, `UUID_SUB`, and `LOGUUID`.
    Uuid = 1 << 3,
    /// Extract property `VERSION`.
    Version = 1 << 8,
    /// Extract property `FSSIZE`.
    FsInfo = 1 << 11,
}

impl FsProperty {
    /// View this `FsProperty` as a UTF-8 `str`.
    pub fn as_str(&self) -> &str {
        match self {
            FsProperty::BadChecksum => "Bad checksum",
            FsProperty::Default => "Default",
            FsProperty::Label => "Label",
            FsProperty::Magic => "Magic",
            FsProperty::SecondType => "Second type",
            FsProperty::Type => "Type",
            FsProperty::Usage => "Usage",
            FsProperty::Uuid => "UUID",
            FsProperty::Version => "Version",
            FsProperty::FsInfo => "Fs Info",
        }
    }
}

impl fmt::Display for FsProperty {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
