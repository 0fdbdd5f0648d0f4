// Copyright (c) 2023 Nick Piaddo
// SPDX-License-Identifier: Apache-2.0 OR MIT

// From dependency library

// From standard library
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;
use std::path::PathBuf;

// From this library
use crate::core::device::Tag;
use crate::core::device::TagName;

/// Sidecar cache of canonicalized paths and evaluated tags, used by the
/// staged `Table::find_*` lookups.
///
/// Canonicalization results are memoized. Device tags and canonical paths
/// can be seeded up front, which also serves environments where the devices
/// themselves are not readable.
///
/// The cache is not thread-safe; shared use requires external locking.
#[derive(Debug, Default)]
pub struct PathCache {
    canonical: RefCell<HashMap<PathBuf, PathBuf>>,
    device_tags: HashMap<PathBuf, Vec<Tag>>,
}

impl PathCache {
    pub fn new() -> PathCache {
        Self::default()
    }

    /// Seeds a canonicalization result, overriding the file system lookup.
    pub fn insert_canonical<F, T>(&mut self, from: F, to: T)
    where
        F: Into<PathBuf>,
        T: Into<PathBuf>,
    {
        self.canonical.borrow_mut().insert(from.into(), to.into());
    }

    /// Seeds the tags of a device.
    pub fn insert_tags<T>(&mut self, device: T, tags: Vec<Tag>)
    where
        T: Into<PathBuf>,
    {
        self.device_tags.insert(device.into(), tags);
    }

    /// Canonicalizes `path`, from the memo or the file system.
    pub fn resolve_path(&self, path: &Path) -> Option<PathBuf> {
        if let Some(resolved) = self.canonical.borrow().get(path) {
            return Some(resolved.clone());
        }

        let resolved = fs::canonicalize(path).ok()?;
        self.canonical
            .borrow_mut()
            .insert(path.to_path_buf(), resolved.clone());

        Some(resolved)
    }

    /// Resolves a tag to a device path: first from the seeded tags, then
    /// through the `udev` `/dev/disk/by-*` symlinks.
    pub fn resolve_tag(&self, name: TagName, value: &str) -> Option<PathBuf> {
        for (device, tags) in &self.device_tags {
            if tags
                .iter()
                .any(|t| t.name() == name && t.value() == value)
            {
                return Some(device.clone());
            }
        }

        let by_dir = match name {
            TagName::Id => "by-id",
            TagName::Label => "by-label",
            TagName::PartLabel => "by-partlabel",
            TagName::PartUuid => "by-partuuid",
            TagName::Uuid => "by-uuid",
        };

        let link = PathBuf::from("/dev/disk").join(by_dir).join(value);
        self.resolve_path(&link)
    }

    /// The tags of `device`. Devices without seeded tags are opened to
    /// check accessibility; an inaccessible device reports the I/O error
    /// (the caller falls back to evaluating table tags instead).
    pub fn read_tags(&self, device: &Path) -> io::Result<&[Tag]> {
        if let Some(tags) = self.device_tags.get(device) {
            return Ok(tags);
        }

        fs::File::open(device)?;
        Ok(&[])
    }

    /// Returns `true` when `device` carries the tag `name=value`.
    pub fn device_has_tag(&self, device: &Path, name: TagName, value: &str) -> bool {
        self.device_tags
            .get(device)
            .map(|tags| tags.iter().any(|t| t.name() == name && t.value() == value))
            .unwrap_or(false)
    }
}

#[cfg(test)]
#[allow(unused_imports)]
mod tests {
    use super::*;
    use pretty_assertions::{assert_eq, assert_ne};

    #[test]
    fn path_cache_resolves_a_seeded_tag() {
        let mut cache = PathCache::new();
        cache.insert_tags(
            "/dev/sda1",
            vec![Tag::new(TagName::Uuid, "11111111-2222-3333-4444-555555555555")],
        );

        let actual = cache.resolve_tag(TagName::Uuid, "11111111-2222-3333-4444-555555555555");
        let expected = Some(PathBuf::from("/dev/sda1"));

        assert_eq!(actual, expected);
    }

    #[test]
    fn path_cache_prefers_a_seeded_canonical_path() {
        let mut cache = PathCache::new();
        cache.insert_canonical("/dev/disk/by-label/root", "/dev/sda2");

        let actual = cache.resolve_path(Path::new("/dev/disk/by-label/root"));
        let expected = Some(PathBuf::from("/dev/sda2"));

        assert_eq!(actual, expected);
    }
}
