// Copyright (c) 2023 Nick Piaddo
// SPDX-License-Identifier: Apache-2.0 OR MIT

// From dependency library

// From standard library
use std::path::Path;
use std::path::PathBuf;

// From this library
use crate::core::device::Label;
use crate::core::device::Tag;
use crate::core::device::TagName;
use crate::core::device::Uuid;

/// A block device entry in a [`Cache`](crate::cache::Cache).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Device {
    name: PathBuf,
    devno: u64,
    tags: Vec<Tag>,
}

impl Device {
    /// Creates a new cache entry for the device at `name`.
    pub fn new<T>(name: T, devno: u64) -> Device
    where
        T: Into<PathBuf>,
    {
        Self {
            name: name.into(),
            devno,
            tags: Vec::new(),
        }
    }

    /// Returns the device's name.
    pub fn name(&self) -> &Path {
        &self.name
    }

    /// Returns the device's device number (0 when unknown).
    pub fn device_number(&self) -> u64 {
        self.devno
    }

    /// Returns the device's tags.
    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    /// Adds a tag, replacing a previous tag of the same name.
    pub fn add_tag(&mut self, tag: Tag) {
        self.tags.retain(|t| t.name() != tag.name());
        self.tags.push(tag);
    }

    /// Returns `true` if this device has the given tag, with the same value.
    pub fn has_tag(&self, tag: &Tag) -> bool {
        self.tags.contains(tag)
    }

    /// Returns `true` if this device has a tag named `tag_name`.
    pub fn has_tag_named(&self, tag_name: TagName) -> bool {
        self.tags.iter().any(|t| t.name() == tag_name)
    }

    /// Returns the value of the tag named `tag_name`.
    pub fn tag_value(&self, tag_name: TagName) -> Option<&str> {
        self.tags
            .iter()
            .find(|t| t.name() == tag_name)
            .map(|t| t.value())
    }

    /// Returns the device's label, when it carries a `LABEL` tag.
    pub fn label(&self) -> Option<Label> {
        self.tag_value(TagName::Label).and_then(|v| v.parse().ok())
    }

    /// Returns the device's UUID, when it carries a `UUID` tag.
    pub fn uuid(&self) -> Option<Uuid> {
        self.tag_value(TagName::Uuid).and_then(|v| v.parse().ok())
    }
}

#[cfg(test)]
#[allow(unused_imports)]
mod tests {
    use super::*;
    use pretty_assertions::{assert_eq, assert_ne};

    #[test]
    fn device_replaces_a_tag_with_the_same_name() {
        let mut device = Device::new("/dev/vda1", 0);
        device.add_tag(Tag::new(TagName::Label, "old"));
        device.add_tag(Tag::new(TagName::Label, "new"));

        assert_eq!(device.tags().len(), 1);
        assert_eq!(device.tag_value(TagName::Label), Some("new"));
    }

    #[test]
    fn device_exposes_typed_label_and_uuid() {
        let mut device = Device::new("/dev/vda1", 0);
        device.add_tag(Tag::new(TagName::Label, "rootfs"));
        device.add_tag(Tag::new(TagName::Uuid, "ac4f36bf-191b-4fb0-b808-6d7fc9fc88be"));

        assert_eq!(device.label().unwrap().as_str(), "rootfs");
        assert_eq!(
            device.uuid().unwrap().as_str(),
            "ac4f36bf-191b-4fb0-b808-6d7fc9fc88be"
        );
    }
}
