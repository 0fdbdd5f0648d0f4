// Copyright (c) 2023 Nick Piaddo
// SPDX-License-Identifier: Apache-2.0 OR MIT

// From dependency library
use enum_iterator::Sequence;

// From standard library
use std::fmt;
use std::str::FromStr;

// From this library
use crate::core::errors::ParserError;

/// Names a device can be referred to by in a mount table source field.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Sequence)]
#[non_exhaustive]
pub enum TagName {
    Id,
    Label,
    PartLabel,
    PartUuid,
    Uuid,
}

impl TagName {
    /// View this `TagName` as a UTF-8 `str`.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Id => "ID",
            Self::Label => "LABEL",
            Self::PartLabel => "PARTLABEL",
            Self::PartUuid => "PARTUUID",
            Self::Uuid => "UUID",
        }
    }

    /// Returns `true` when `s` is a supported tag name.
    pub fn is_valid(s: &str) -> bool {
        enum_iterator::all::<TagName>().any(|name| name.as_str() == s)
    }
}

impl AsRef<str> for TagName {
    #[inline]
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for TagName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TagName {
    type Err = ParserError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        enum_iterator::all::<TagName>()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| ParserError::TagName(format!("unsupported tag name: {:?}", s)))
    }
}

#[cfg(test)]
#[allow(unused_imports)]
mod tests {
    use super::*;
    use pretty_assertions::{assert_eq, assert_ne};

    #[test]
    fn tag_name_parses_supported_names() {
        let actual: TagName = "LABEL".parse().unwrap();
        let expected = TagName::Label;

        assert_eq!(actual, expected);
    }

    #[test]
    fn tag_name_rejects_lowercase_names() {
        assert!(!TagName::is_valid("label"));
        assert!(TagName::is_valid("PARTUUID"));
    }
}
