// Copyright (c) 2023 Nick Piaddo
// SPDX-License-Identifier: Apache-2.0 OR MIT

// From dependency library

// From standard library
use std::fmt;
use std::str::FromStr;

// From this library
use crate::config::ConfigError;

/// Tag evaluation method.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EvalMethod {
    /// Read tags from `udev`'s `/dev/disk/by-*` symlinks.
    Udev,
    /// Extract tags by scanning the block device directly.
    Scan,
}

impl EvalMethod {
    /// View this `EvalMethod` as a UTF-8 `str`.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Udev => "udev",
            Self::Scan => "scan",
        }
    }
}

impl fmt::Display for EvalMethod {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EvalMethod {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "udev" => Ok(Self::Udev),
            "scan" => Ok(Self::Scan),
            unknown => Err(ConfigError::Parse(format!(
                "unknown evaluation method: {:?}",
                unknown
            ))),
        }
    }
}
