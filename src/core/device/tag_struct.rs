// Copyright (c) 2023 Nick Piaddo
// SPDX-License-Identifier: Apache-2.0 OR MIT

// From dependency library

// From standard library
use std::fmt;
use std::str::FromStr;

// From this library
use crate::core::device::TagName;
use crate::core::errors::ParserError;

/// A `NAME=value` device identifier (e.g. `LABEL=rootfs`,
/// `UUID="ac4f36bf-191b-4fb0-b808-6d7fc9fc88be"`).
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub struct Tag {
    name: TagName,
    value: String,
}

impl Tag {
    /// Creates a new `Tag`.
    pub fn new<T>(name: TagName, value: T) -> Tag
    where
        T: Into<String>,
    {
        Self {
            name,
            value: value.into(),
        }
    }

    /// Returns this `Tag`'s name.
    pub fn name(&self) -> TagName {
        self.name
    }

    /// Returns this `Tag`'s value.
    pub fn value(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)
    }
}

impl FromStr for Tag {
    type Err = ParserError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, value) = s
            .split_once('=')
            .ok_or_else(|| ParserError::Tag(format!("missing `=` separator in: {:?}", s)))?;

        let name: TagName = name.parse()?;

        // Remove opening/closing quotes/double-quotes if present.
        let trimmed = value.trim();
        let value = if trimmed.starts_with('"') {
            trimmed
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .ok_or_else(|| {
                    ParserError::Tag(format!("missing closing double-quote in: {:?}", s))
                })
        } else if trimmed.starts_with('\'') {
            trimmed
                .strip_prefix('\'')
                .and_then(|v| v.strip_suffix('\''))
                .ok_or_else(|| ParserError::Tag(format!("missing closing quote in: {:?}", s)))
        } else {
            Ok(trimmed)
        }?;

        if value.is_empty() {
            return Err(ParserError::Tag(format!("empty tag value in: {:?}", s)));
        }

        Ok(Self::new(name, value))
    }
}

#[cfg(test)]
#[allow(unused_imports)]
mod tests {
    use super::*;
    use pretty_assertions::{assert_eq, assert_ne};

    #[test]
    fn tag_parses_a_label_tag_string() {
        let actual: Tag = "LABEL=rootfs".parse().unwrap();
        let expected = Tag::new(TagName::Label, "rootfs");

        assert_eq!(actual, expected);
    }

    #[test]
    fn tag_parses_a_double_quoted_value() {
        let actual: Tag = r#"UUID="ac4f36bf-191b-4fb0-b808-6d7fc9fc88be""#.parse().unwrap();
        let expected = Tag::new(TagName::Uuid, "ac4f36bf-191b-4fb0-b808-6d7fc9fc88be");

        assert_eq!(actual, expected);
    }

    #[test]
    #[should_panic(expected = "unsupported tag name")]
    fn tag_can_not_parse_an_unsupported_tag_name() {
        let _: Tag = "SERIAL=0xdeadbeef".parse().unwrap();
    }

    #[test]
    #[should_panic(expected = "missing `=` separator")]
    fn tag_can_not_parse_a_string_without_separator() {
        let _: Tag = "/dev/sda1".parse().unwrap();
    }
}
