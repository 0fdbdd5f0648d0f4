// Copyright (c) 2023 Nick Piaddo
// SPDX-License-Identifier: Apache-2.0 OR MIT

// From dependency library

// From standard library
use std::fmt;
use std::path::Path;
use std::path::PathBuf;

// From this library
use crate::core::device::Tag;
use crate::table::PathCache;

// pseudo file systems have no backing device
const PSEUDO_FS_TYPES: &[&str] = &[
    "autofs",
    "bpf",
    "cgroup",
    "cgroup2",
    "configfs",
    "debugfs",
    "devpts",
    "devtmpfs",
    "efivarfs",
    "hugetlbfs",
    "mqueue",
    "overlay",
    "proc",
    "pstore",
    "ramfs",
    "securityfs",
    "sysfs",
    "tmpfs",
    "tracefs",
];

const NET_FS_TYPES: &[&str] = &[
    "afs", "ceph", "cifs", "fuse.sshfs", "nfs", "nfs4", "smb3", "smbfs",
];

/// The mount source: either a device/directory path, or a `NAME=value` tag.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Source {
    Path(PathBuf),
    Tag(Tag),
}

impl Source {
    /// Classifies `s` as a tag when it parses as a valid `NAME=value` pair,
    /// as a path otherwise.
    pub fn parse(s: &str) -> Source {
        match s.parse::<Tag>() {
            Ok(tag) => Self::Tag(tag),
            Err(_) => Self::Path(PathBuf::from(s)),
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(path) => write!(f, "{}", path.display()),
            Self::Tag(tag) => write!(f, "{}", tag),
        }
    }
}

/// One mounted or mount-configured file system: an entry of an fstab, mtab
/// or mountinfo table.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct FsEntry {
    source: Option<Source>,
    target: Option<PathBuf>,
    fstype: Option<String>,
    options: Option<String>,
    /// mountinfo optional fields (propagation tags).
    attributes: Option<String>,
    comment: Option<String>,
    /// Kernel fs-root subpath (bind-mount inner path, btrfs subvolume).
    root: Option<String>,
    /// mountinfo identifiers; 0 where unavailable.
    id: i32,
    parent_id: i32,
    /// Kernel-reported device number; 0 where unavailable.
    devno: u64,
}

impl FsEntry {
    /// Creates an empty entry.
    pub fn new() -> FsEntry {
        Self::default()
    }

    /// Sets the mount source; `TAG=value` strings become tags, anything
    /// else a path.
    pub fn set_source(&mut self, source: &str) -> &mut FsEntry {
        self.source = Some(Source::parse(source));
        self
    }

    /// Sets the mount point.
    pub fn set_target<T>(&mut self, target: T) -> &mut FsEntry
    where
        T: Into<PathBuf>,
    {
        self.target = Some(target.into());
        self
    }

    /// Sets the file system type.
    pub fn set_fstype<T>(&mut self, fstype: T) -> &mut FsEntry
    where
        T: Into<String>,
    {
        self.fstype = Some(fstype.into());
        self
    }

    /// Sets the comma-separated mount options.
    pub fn set_options<T>(&mut self, options: T) -> &mut FsEntry
    where
        T: Into<String>,
    {
        self.options = Some(options.into());
        self
    }

    /// Sets the mountinfo optional fields.
    pub fn set_attributes<T>(&mut self, attributes: T) -> &mut FsEntry
    where
        T: Into<String>,
    {
        self.attributes = Some(attributes.into());
        self
    }

    /// Sets the entry comment.
    pub fn set_comment<T>(&mut self, comment: T) -> &mut FsEntry
    where
        T: Into<String>,
    {
        self.comment = Some(comment.into());
        self
    }

    /// Sets the kernel fs-root subpath.
    pub fn set_root<T>(&mut self, root: T) -> &mut FsEntry
    where
        T: Into<String>,
    {
        self.root = Some(root.into());
        self
    }

    /// Sets the mountinfo mount ID.
    pub fn set_id(&mut self, id: i32) -> &mut FsEntry {
        self.id = id;
        self
    }

    /// Sets the mountinfo parent ID.
    pub fn set_parent_id(&mut self, parent_id: i32) -> &mut FsEntry {
        self.parent_id = parent_id;
        self
    }

    /// Sets the kernel-reported device number.
    pub fn set_devno(&mut self, devno: u64) -> &mut FsEntry {
        self.devno = devno;
        self
    }

    pub fn source(&self) -> Option<&Source> {
        self.source.as_ref()
    }

    /// The source as a path; `None` when the source is a tag, or unset.
    pub fn source_path(&self) -> Option<&Path> {
        match &self.source {
            Some(Source::Path(path)) => Some(path),
            _ => None,
        }
    }

    /// The source as a tag; `None` when the source is a path, or unset.
    pub fn tag(&self) -> Option<&Tag> {
        match &self.source {
            Some(Source::Tag(tag)) => Some(tag),
            _ => None,
        }
    }

    pub fn target(&self) -> Option<&Path> {
        self.target.as_deref()
    }

    pub fn fstype(&self) -> Option<&str> {
        self.fstype.as_deref()
    }

    pub fn options(&self) -> Option<&str> {
        self.options.as_deref()
    }

    pub fn attributes(&self) -> Option<&str> {
        self.attributes.as_deref()
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    pub fn root(&self) -> Option<&str> {
        self.root.as_deref()
    }

    pub fn id(&self) -> i32 {
        self.id
    }

    pub fn parent_id(&self) -> i32 {
        self.parent_id
    }

    pub fn devno(&self) -> u64 {
        self.devno
    }

    /// Looks up a mount option. The outer `None` means "option absent", the
    /// inner one "present without a value".
    pub fn option_value(&self, name: &str) -> Option<Option<&str>> {
        let options = self.options.as_deref()?;

        for option in options.split(',') {
            match option.split_once('=') {
                Some((key, value)) if key == name => return Some(Some(value)),
                None if option == name => return Some(None),
                _ => {}
            }
        }

        None
    }

    /// Returns `true` when this entry describes a swap area.
    pub fn is_swap_area(&self) -> bool {
        self.fstype.as_deref() == Some("swap")
    }

    /// Returns `true` for file systems without a backing device (proc,
    /// sysfs, tmpfs, ...).
    pub fn is_pseudo_fs(&self) -> bool {
        matches!(self.fstype.as_deref(), Some(fstype) if PSEUDO_FS_TYPES.contains(&fstype))
    }

    /// Returns `true` for network file systems.
    pub fn is_net_fs(&self) -> bool {
        matches!(self.fstype.as_deref(), Some(fstype) if NET_FS_TYPES.contains(&fstype))
    }

    /// Returns `true` when the entry comes from the kernel (mountinfo
    /// entries carry a mount ID).
    pub fn is_kernel_mount(&self) -> bool {
        self.id > 0
    }

    /// Compares the stored target with `path`, literally.
    pub fn streq_target(&self, path: &Path) -> bool {
        self.target.as_deref() == Some(path)
    }

    /// Compares the stored source path with `path`, literally. `"none"`
    /// matches entries without a source.
    pub fn streq_srcpath(&self, path: &Path) -> bool {
        match &self.source {
            Some(Source::Path(src)) => src == path,
            Some(Source::Tag(_)) => false,
            None => path == Path::new("none"),
        }
    }

    /// Full match of `target` against this entry, canonicalizing through
    /// `cache` when the literal comparison fails.
    pub fn match_target(&self, target: &Path, cache: Option<&PathCache>) -> bool {
        let Some(stored) = self.target.as_deref() else {
            return false;
        };

        if stored == target {
            return true;
        }

        let Some(cache) = cache else {
            return false;
        };

        if let Some(cn) = cache.resolve_path(target) {
            if stored == cn {
                return true;
            }
            if let Some(stored_cn) = cache.resolve_path(stored) {
                return stored_cn == cn;
            }
        }

        false
    }

    /// Full match of `source` against this entry: literal path or tag
    /// comparison first, then tag evaluation through `cache`.
    pub fn match_source(&self, source: &str, cache: Option<&PathCache>) -> bool {
        let wanted = Source::parse(source);

        match (&self.source, &wanted) {
            (None, Source::Path(path)) => return path == Path::new("none"),
            (Some(Source::Tag(stored)), Source::Tag(tag)) => return stored == tag,
            (Some(Source::Path(stored)), Source::Path(path)) if stored == path => return true,
            _ => {}
        }

        let Some(cache) = cache else {
            return false;
        };

        match (&self.source, &wanted) {
            // evaluate the stored tag to a device path
            (Some(Source::Tag(stored)), Source::Path(path)) => {
                let resolved = cache.resolve_tag(stored.name(), stored.value());
                let path = cache.resolve_path(path).or_else(|| Some(path.clone()));
                resolved.is_some() && resolved == path
            }
            // evaluate the wanted tag to a device path
            (Some(Source::Path(stored)), Source::Tag(tag)) => {
                let resolved = cache.resolve_tag(tag.name(), tag.value());
                let stored = cache.resolve_path(stored).or_else(|| Some(stored.clone()));
                resolved.is_some() && resolved == stored
            }
            // both paths, compare canonicalized
            (Some(Source::Path(stored)), Source::Path(path)) => {
                match (cache.resolve_path(stored), cache.resolve_path(path)) {
                    (Some(a), Some(b)) => a == b,
                    _ => false,
                }
            }
            _ => false,
        }
    }
}

#[cfg(test)]
#[allow(unused_imports)]
mod tests {
    use super::*;
    use crate::core::device::TagName;
    use pretty_assertions::{assert_eq, assert_ne};

    #[test]
    fn fs_entry_classifies_a_tag_source() {
        let mut fs = FsEntry::new();
        fs.set_source("LABEL=rootfs");

        let tag = fs.tag().unwrap();

        assert_eq!(tag.name(), TagName::Label);
        assert_eq!(tag.value(), "rootfs");
        assert_eq!(fs.source_path(), None);
    }

    #[test]
    fn fs_entry_classifies_a_path_source() {
        let mut fs = FsEntry::new();
        fs.set_source("/dev/sda1");

        assert_eq!(fs.source_path(), Some(Path::new("/dev/sda1")));
        assert_eq!(fs.tag(), None);
    }

    #[test]
    fn fs_entry_looks_up_mount_options() {
        let mut fs = FsEntry::new();
        fs.set_options("rw,noatime,subvol=/volumes/home,bind");

        assert_eq!(fs.option_value("subvol"), Some(Some("/volumes/home")));
        assert_eq!(fs.option_value("bind"), Some(None));
        assert_eq!(fs.option_value("ro"), None);
    }

    #[test]
    fn fs_entry_detects_pseudo_file_systems() {
        let mut fs = FsEntry::new();
        fs.set_fstype("proc");

        assert!(fs.is_pseudo_fs());
        assert!(!fs.is_net_fs());
    }
}
