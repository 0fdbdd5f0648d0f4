// Copyright (c) 2023 Nick Piaddo
// SPDX-License-Identifier: Apache-2.0 OR MIT

// From dependency library

// From standard library
use std::fmt;
use std::str::FromStr;

// From this library
use crate::core::errors::ConversionError;
use crate::core::errors::ParserError;

/// A device/file system unique identifier.
///
/// Most identifiers are 16-byte DCE UUIDs rendered as lowercase hexadecimal
/// `xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx`, but some file systems use shorter
/// serial numbers (e.g. the FAT family's `XXXX-XXXX` volume ids); this type
/// keeps the rendered form.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub struct Uuid(String);

impl Uuid {
    /// Renders a 16-byte DCE UUID in the canonical
    /// `xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx` lowercase form.
    pub fn from_bytes(uuid: &[u8; 16]) -> Uuid {
        let rendered = format!(
            "{:02x}{:02x}{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
            uuid[0], uuid[1], uuid[2], uuid[3],
            uuid[4], uuid[5],
            uuid[6], uuid[7],
            uuid[8], uuid[9],
            uuid[10], uuid[11], uuid[12], uuid[13], uuid[14], uuid[15]
        );

        Self(rendered)
    }

    /// Returns `true` when every byte of `buf` is zero (an unset identifier).
    pub fn is_empty_uuid(buf: &[u8]) -> bool {
        buf.iter().all(|&b| b == 0)
    }

    /// View this `Uuid` as a UTF-8 `str`.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<Uuid> for Uuid {
    #[inline]
    fn as_ref(&self) -> &Uuid {
        self
    }
}

impl AsRef<str> for Uuid {
    #[inline]
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Uuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<&[u8]> for Uuid {
    type Error = ConversionError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        match bytes.len() {
            16 => {
                let mut uuid = [0u8; 16];
                uuid.copy_from_slice(bytes);

                Ok(Self::from_bytes(&uuid))
            }
            len => Err(ConversionError::Uuid(format!(
                "expected a 16-byte identifier, got {} bytes",
                len
            ))),
        }
    }
}

impl FromStr for Uuid {
    type Err = ParserError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_matches('"').trim_matches('\'');

        if trimmed.is_empty() {
            return Err(ParserError::Uuid("empty UUID string".to_owned()));
        }

        if !trimmed
            .chars()
            .all(|c| c.is_ascii_hexdigit() || c == '-')
        {
            return Err(ParserError::Uuid(format!(
                "invalid character in UUID string: {}",
                s
            )));
        }

        Ok(Self(trimmed.to_lowercase()))
    }
}

#[cfg(test)]
#[allow(unused_imports)]
mod tests {
    use super::*;
    use pretty_assertions::{assert_eq, assert_ne};

    #[test]
    fn uuid_renders_a_dce_uuid_in_canonical_form() {
        let bytes: [u8; 16] = [
            0x11, 0x11, 0x11, 0x11, 0x22, 0x22, 0x33, 0x33, 0x44, 0x44, 0x55, 0x55, 0x55, 0x55,
            0x55, 0x55,
        ];

        let actual = Uuid::from_bytes(&bytes).to_string();
        let expected = "11111111-2222-3333-4444-555555555555";

        assert_eq!(actual, expected);
    }

    #[test]
    fn uuid_detects_an_all_zero_identifier() {
        assert!(Uuid::is_empty_uuid(&[0u8; 16]));
        assert!(!Uuid::is_empty_uuid(&[0, 0, 1, 0]));
    }

    #[test]
    #[should_panic(expected = "invalid character")]
    fn uuid_can_not_parse_a_string_with_invalid_characters() {
        let _: Uuid = "not-a-uuid!".parse().unwrap();
    }
}
