// Copyright (c) 2023 Nick Piaddo
// SPDX-License-Identifier: Apache-2.0 OR MIT

// From dependency library
use num_enum::IntoPrimitive;

// From standard library
use std::fmt;
use std::str::FromStr;

// From this library
use crate::core::errors::ConversionError;
use crate::core::errors::ParserError;

/// Device usage.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, IntoPrimitive)]
#[non_exhaustive]
#[repr(i32)]
pub enum Usage {
    FileSystem = 1 << 1,
    Raid = 1 << 2,
    Crypto = 1 << 3,
    Other = 1 << 4,
    Unknown = 0i32,
}

impl Usage {
    /// View this `Usage` as a UTF-8 `str`.
    pub fn as_str(&self) -> &str {
        match self {
            Self::FileSystem => "filesystem",
            Self::Raid => "raid",
            Self::Crypto => "crypto",
            Self::Other => "other",
            Self::Unknown => "unknown",
        }
    }
}

impl AsRef<Usage> for Usage {
    #[inline]
    fn as_ref(&self) -> &Usage {
        self
    }
}

impl AsRef<str> for Usage {
    #[inline]
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for Usage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&[u8]> for Usage {
    type Error = ConversionError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        std::str::from_utf8(bytes)
            .map_err(|e| {
                ConversionError::Usage(format!(
                    "bytes to UTF-8 string slice conversion error. {:?}",
                    e
                ))
            })
            .and_then(|s| Self::from_str(s).map_err(|e| ConversionError::Usage(e.to_string())))
    }
}

impl FromStr for Usage {
    type Err = ParserError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "filesystem" => Ok(Self::FileSystem),
            "raid" => Ok(Self::Raid),
            "crypto" => Ok(Self::Crypto),
            "other" => Ok(Self::Other),
            "unknown" => Ok(Self::Unknown),
            unknown => Err(ParserError::Usage(format!(
                "unsupported usage category: {:?}",
                unknown
            ))),
        }
    }
}

#[cfg(test)]
#[allow(unused_imports)]
mod tests {
    use super::*;
    use pretty_assertions::{assert_eq, assert_ne};

    #[test]
    fn usage_parses_a_known_category() {
        let actual: Usage = "raid".parse().unwrap();
        let expected = Usage::Raid;

        assert_eq!(actual, expected);
    }

    #[test]
    #[should_panic(expected = "unsupported usage category")]
    fn usage_can_not_parse_an_unknown_category() {
        let _: Usage = "tape".parse().unwrap();
    }
}
