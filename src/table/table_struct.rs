// Copyright (c) 2023 Nick Piaddo
// SPDX-License-Identifier: Apache-2.0 OR MIT

// From dependency library
use bitflags::bitflags;

// From standard library
use std::io;
use std::os::unix::fs::FileTypeExt;
use std::os::unix::fs::MetadataExt;
use std::path::Path;
use std::path::PathBuf;

// From this library
use crate::core::device::TagName;
use crate::core::utils::misc;
use crate::table::fs_entry_struct::Source;
use crate::table::table_iter_struct::IterPos;
use crate::table::Direction;
use crate::table::FsEntry;
use crate::table::PathCache;
use crate::table::TableIter;

bitflags! {
    /// Options for [`Table::uniq_fs`].
    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    pub struct UniqFlags: u32 {
        /// Remove later mounted file systems (the default keeps them).
        const FORWARD = 1 << 0;
        /// Keep the parent ID -> mount ID relationship valid while
        /// removing entries (mountinfo tables only).
        const KEEPTREE = 1 << 1;
    }
}

/// Ordered list of [`FsEntry`] values, usually representing an fstab, mtab
/// or mountinfo file.
///
/// The `find_*` lookups are `mount(8)` compatible: the first attempt is
/// always based on comparison with unmodified (non-canonicalized or
/// un-evaluated) paths or tags, later attempts go through the optional
/// [`PathCache`]. For example, with an fstab holding two entries for the
/// same device
///
/// ```text
/// LABEL=foo   /foo   auto   rw
/// /dev/foo    /foo   auto   rw
/// ```
///
/// `find_source("/dev/foo")` returns the second line while
/// `find_source("LABEL=foo")` returns the first.
#[derive(Debug, Default)]
pub struct Table {
    ents: Vec<FsEntry>,
    cache: Option<PathCache>,
    intro_comment: Option<String>,
    trailing_comment: Option<String>,
}

impl Table {
    /// Creates an empty table.
    pub fn new() -> Table {
        Self::default()
    }

    /// Number of entries in the table.
    pub fn nents(&self) -> usize {
        self.ents.len()
    }

    /// Returns `true` when the table holds no entry.
    pub fn is_empty(&self) -> bool {
        self.ents.is_empty()
    }

    /// Appends an entry to the table.
    pub fn add_fs(&mut self, fs: FsEntry) {
        log::debug!(
            "Table::add_fs add entry: {:?} {:?}",
            fs.source().map(|s| s.to_string()),
            fs.target()
        );
        self.ents.push(fs);
    }

    /// Removes the entry at `index` and hands it back, so it can be linked
    /// into another table.
    pub fn remove_fs(&mut self, index: usize) -> Option<FsEntry> {
        if index < self.ents.len() {
            Some(self.ents.remove(index))
        } else {
            None
        }
    }

    /// Returns the entry at `index`.
    pub fn get_fs(&self, index: usize) -> Option<&FsEntry> {
        self.ents.get(index)
    }

    /// Returns the index of the first entry matching `pred`.
    pub fn position<P>(&self, pred: P) -> Option<usize>
    where
        P: Fn(&FsEntry) -> bool,
    {
        self.ents.iter().position(pred)
    }

    /// Iterates over the entries, in table order.
    pub fn iter(&self) -> impl Iterator<Item = &FsEntry> {
        self.ents.iter()
    }

    /// First entry of the table.
    pub fn first_fs(&self) -> Option<&FsEntry> {
        self.ents.first()
    }

    /// Last entry of the table.
    pub fn last_fs(&self) -> Option<&FsEntry> {
        self.ents.last()
    }

    /// Sets up a cache for canonicalized paths and evaluated tags,
    /// recommended for the `find_*` lookups.
    pub fn set_cache(&mut self, cache: PathCache) {
        self.cache = Some(cache);
    }

    /// The table's path/tag cache.
    pub fn cache(&self) -> Option<&PathCache> {
        self.cache.as_ref()
    }

    pub fn intro_comment(&self) -> Option<&str> {
        self.intro_comment.as_deref()
    }

    pub fn set_intro_comment<T>(&mut self, comment: T)
    where
        T: Into<String>,
    {
        self.intro_comment = Some(comment.into());
    }

    pub fn trailing_comment(&self) -> Option<&str> {
        self.trailing_comment.as_deref()
    }

    pub fn set_trailing_comment<T>(&mut self, comment: T)
    where
        T: Into<String>,
    {
        self.trailing_comment = Some(comment.into());
    }

    /// Returns `true` when the table looks like kernel mountinfo: the first
    /// entry reports a kernel mount with a fs-root.
    pub fn is_mountinfo(&self) -> bool {
        match self.ents.first() {
            Some(fs) => fs.is_kernel_mount() && fs.root().is_some(),
            None => false,
        }
    }

    //------------------------------------------------------------------
    // Iteration
    //------------------------------------------------------------------

    fn indices(&self, direction: Direction) -> impl Iterator<Item = usize> {
        let n = self.ents.len();
        let forward = direction == Direction::Forward;

        (0..n).map(move |i| if forward { i } else { n - 1 - i })
    }

    /// Advances `itr` and returns the index of the entry it passed over.
    fn next_index(&self, itr: &mut TableIter) -> Option<usize> {
        let n = self.ents.len();

        let index = match itr.pos {
            IterPos::Start => match itr.direction {
                Direction::Forward if n > 0 => 0,
                Direction::Backward if n > 0 => n - 1,
                _ => {
                    itr.pos = IterPos::End;
                    return None;
                }
            },
            IterPos::At(index) if index < n => index,
            _ => {
                itr.pos = IterPos::End;
                return None;
            }
        };

        itr.pos = match itr.direction {
            Direction::Forward if index + 1 < n => IterPos::At(index + 1),
            Direction::Backward if index > 0 => IterPos::At(index - 1),
            _ => IterPos::End,
        };

        Some(index)
    }

    /// Returns the next entry in the iterator's direction.
    pub fn next_fs(&self, itr: &mut TableIter) -> Option<&FsEntry> {
        let index = self.next_index(itr)?;

        self.ents.get(index)
    }

    /// Positions `itr` so that the next call to [`Table::next_fs`] returns
    /// the entry at `index`.
    pub fn set_iter(&self, itr: &mut TableIter, index: usize) {
        itr.pos = if index < self.ents.len() {
            IterPos::At(index)
        } else {
            IterPos::End
        };
    }

    /// Returns the next entry matching `pred`.
    pub fn find_next_fs<P>(&self, itr: &mut TableIter, pred: P) -> Option<&FsEntry>
    where
        P: Fn(&FsEntry) -> bool,
    {
        loop {
            let index = self.next_index(itr)?;

            if pred(&self.ents[index]) {
                return Some(&self.ents[index]);
            }
        }
    }

    //------------------------------------------------------------------
    // Lookups
    //------------------------------------------------------------------

    fn find_target_index(&self, path: &Path, direction: Direction) -> Option<usize> {
        if path.as_os_str().is_empty() {
            return None;
        }

        log::debug!("Table::find_target lookup TARGET: {:?}", path);

        // native target
        for i in self.indices(direction) {
            if self.ents[i].streq_target(path) {
                return Some(i);
            }
        }

        let cache = self.cache.as_ref()?;
        let cn = cache.resolve_path(path)?;

        log::debug!("Table::find_target lookup canonical TARGET: {:?}", cn);

        // canonicalized path against the stored targets
        for i in self.indices(direction) {
            if self.ents[i].streq_target(&cn) {
                return Some(i);
            }
        }

        // non-canonicalized targets in the table; mountinfo targets are
        // already canonicalized by the kernel
        for i in self.indices(direction) {
            let fs = &self.ents[i];

            let Some(target) = fs.target() else { continue };
            if fs.is_swap_area() || fs.is_kernel_mount() || target == Path::new("/") {
                continue;
            }

            if let Some(target_cn) = cache.resolve_path(target) {
                if target_cn == cn {
                    return Some(i);
                }
            }
        }

        None
    }

    /// Looks up the entry mounted on `path`: first by literal comparison,
    /// then (with a cache) comparing canonicalized paths.
    pub fn find_target(&self, path: &Path, direction: Direction) -> Option<&FsEntry> {
        self.find_target_index(path, direction)
            .map(|i| &self.ents[i])
    }

    fn find_srcpath_index(&self, path: &Path, direction: Direction) -> Option<usize> {
        if path.as_os_str().is_empty() {
            return None;
        }

        log::debug!("Table::find_srcpath lookup SRCPATH: {:?}", path);

        // native paths
        let mut ntags = 0;
        for i in self.indices(direction) {
            if self.ents[i].streq_srcpath(path) {
                return Some(i);
            }
        }
        for fs in &self.ents {
            if fs.tag().is_some() {
                ntags += 1;
            }
        }

        let cache = self.cache.as_ref()?;
        let cn = cache.resolve_path(path)?;
        let nents = self.ents.len();

        log::debug!("Table::find_srcpath lookup canonical SRCPATH: {:?}", cn);

        // canonicalized path against the stored source paths
        if ntags < nents {
            for i in self.indices(direction) {
                if self.ents[i].streq_srcpath(&cn) {
                    return Some(i);
                }
            }
        }

        // evaluated tags
        if ntags > 0 {
            match cache.read_tags(&cn) {
                Ok(_) => {
                    // the canonicalized path's tags are in the cache
                    for i in self.indices(direction) {
                        let Some(tag) = self.ents[i].tag() else { continue };
                        if cache.device_has_tag(&cn, tag.name(), tag.value()) {
                            return Some(i);
                        }
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                    // the path is inaccessible, evaluate every tag in the
                    // table by symlinks instead; this could be expensive on
                    // systems with a huge fstab/mtab
                    for i in self.indices(direction) {
                        let Some(tag) = self.ents[i].tag() else { continue };
                        if cache.resolve_tag(tag.name(), tag.value()) == Some(cn.clone()) {
                            return Some(i);
                        }
                    }
                }
                Err(_) => {}
            }
        }

        // non-canonicalized source paths in the table
        if ntags <= nents {
            for i in self.indices(direction) {
                let fs = &self.ents[i];

                if fs.is_net_fs() || fs.is_pseudo_fs() {
                    continue;
                }

                let Some(srcpath) = fs.source_path() else { continue };
                if let Some(srcpath_cn) = cache.resolve_path(srcpath) {
                    if srcpath_cn == cn {
                        return Some(i);
                    }
                }
            }
        }

        None
    }

    /// Looks up the entry whose source is the device or directory `path`.
    pub fn find_srcpath(&self, path: &Path, direction: Direction) -> Option<&FsEntry> {
        self.find_srcpath_index(path, direction)
            .map(|i| &self.ents[i])
    }

    fn find_tag_index(&self, name: TagName, value: &str, direction: Direction) -> Option<usize> {
        log::debug!("Table::find_tag lookup by TAG: {} {}", name, value);

        for i in self.indices(direction) {
            if let Some(tag) = self.ents[i].tag() {
                if tag.name() == name && tag.value() == value {
                    return Some(i);
                }
            }
        }

        // evaluate the tag to a device name
        let cache = self.cache.as_ref()?;
        let cn = cache.resolve_tag(name, value)?;

        self.find_srcpath_index(&cn, direction)
    }

    /// Looks up the entry carrying the tag `name=value`, literally first,
    /// then (with a cache) resolving the tag to a device path.
    pub fn find_tag(&self, name: TagName, value: &str, direction: Direction) -> Option<&FsEntry> {
        self.find_tag_index(name, value, direction)
            .map(|i| &self.ents[i])
    }

    /// Looks up an entry by `source`, a path or a `TAG=value` string.
    pub fn find_source(&self, source: &str, direction: Direction) -> Option<&FsEntry> {
        log::debug!("Table::find_source lookup SOURCE: {:?}", source);

        match Source::parse(source) {
            Source::Tag(tag) => self.find_tag(tag.name(), tag.value(), direction),
            Source::Path(path) => self.find_srcpath(&path, direction),
        }
    }

    /// Looks up an entry by fully evaluating both `source` and `target`
    /// against every entry; more expensive than the other lookups.
    pub fn find_pair(
        &self,
        source: &str,
        target: &Path,
        direction: Direction,
    ) -> Option<&FsEntry> {
        if source.is_empty() || target.as_os_str().is_empty() {
            return None;
        }

        log::debug!(
            "Table::find_pair lookup SOURCE: {:?} TARGET: {:?}",
            source,
            target
        );

        for i in self.indices(direction) {
            let fs = &self.ents[i];
            if fs.match_target(target, self.cache.as_ref())
                && fs.match_source(source, self.cache.as_ref())
            {
                return Some(&self.ents[i]);
            }
        }

        None
    }

    /// Looks up an entry by device number. Note that zero is a valid device
    /// number for root pseudo file systems (e.g. tmpfs).
    pub fn find_devno(&self, devno: u64, direction: Direction) -> Option<&FsEntry> {
        log::debug!("Table::find_devno lookup DEVNO: {}", devno);

        self.indices(direction)
            .find(|&i| self.ents[i].devno() == devno)
            .map(|i| &self.ents[i])
    }

    fn find_mountpoint_index(&self, path: &Path, direction: Direction) -> Option<usize> {
        log::debug!("Table::find_mountpoint lookup MOUNTPOINT: {:?}", path);

        let mut mnt = path.to_path_buf();

        loop {
            if let Some(index) = self.find_target_index(&mnt, direction) {
                return Some(index);
            }

            match mnt.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => mnt = parent.to_path_buf(),
                _ => break,
            }
        }

        self.find_target_index(Path::new("/"), direction)
    }

    /// Returns the entry of the mount point containing `path`: the target
    /// lookup is repeated with the last path component stripped until a hit,
    /// falling back to `/`.
    pub fn find_mountpoint(&self, path: &Path, direction: Direction) -> Option<&FsEntry> {
        self.find_mountpoint_index(path, direction)
            .map(|i| &self.ents[i])
    }

    fn find_target_with_option_index(
        &self,
        path: &Path,
        option: &str,
        value: &str,
        direction: Direction,
    ) -> Option<usize> {
        for i in self.indices(direction) {
            let fs = &self.ents[i];
            if fs.streq_target(path) && fs.option_value(option) == Some(Some(value)) {
                return Some(i);
            }
        }

        None
    }

    /// Looks up an entry matching both `path` and the mount option
    /// `option=value`; no canonicalization, no device name lookup.
    pub fn find_target_with_option(
        &self,
        path: &Path,
        option: &str,
        value: &str,
        direction: Direction,
    ) -> Option<&FsEntry> {
        self.find_target_with_option_index(path, option, value, direction)
            .map(|i| &self.ents[i])
    }

    //------------------------------------------------------------------
    // Tree reconstruction (mountinfo tables)
    //------------------------------------------------------------------

    /// Returns the root file system: the entry with the smallest parent ID.
    pub fn get_root_fs(&self) -> Option<&FsEntry> {
        if !self.is_mountinfo() {
            return None;
        }

        log::debug!("Table::get_root_fs lookup root fs");

        let mut root: Option<usize> = None;
        let mut root_id = 0;

        for (i, fs) in self.ents.iter().enumerate() {
            let id = fs.parent_id();
            if root.is_none() || id < root_id {
                root = Some(i);
                root_id = id;
            }
        }

        root.map(|i| &self.ents[i])
    }

    /// Returns the next child of `parent`, in ascending mount-ID order
    /// (the order of mounting). The iterator carries the last returned
    /// child between calls.
    pub fn next_child_fs(&self, itr: &mut TableIter, parent: &FsEntry) -> Option<&FsEntry> {
        if !self.is_mountinfo() {
            return None;
        }

        log::debug!(
            "Table::next_child_fs lookup next child of {:?}",
            parent.target()
        );

        let parent_id = parent.id();

        // ID of the previously returned child
        let last_child_id = match itr.pos {
            IterPos::At(index) => self.ents.get(index).map(|fs| fs.id()).unwrap_or(0),
            _ => 0,
        };

        let mut child: Option<usize> = None;
        let mut child_id = 0;

        for (i, fs) in self.ents.iter().enumerate() {
            if fs.parent_id() != parent_id {
                continue;
            }

            let id = fs.id();

            // rootfs is its own parent in early userspace, skip it
            if id == parent_id {
                continue;
            }

            if (last_child_id == 0 || id > last_child_id) && (child.is_none() || id < child_id) {
                child = Some(i);
                child_id = id;
            }
        }

        let index = child?;

        // remember the child for the next call
        self.set_iter(itr, index);

        Some(&self.ents[index])
    }

    //------------------------------------------------------------------
    // De-duplication
    //------------------------------------------------------------------

    fn move_parent(&mut self, old_id: i32, new_id: i32) {
        log::debug!(
            "Table::move_parent moving parent ID from {} -> {}",
            old_id,
            new_id
        );

        for fs in &mut self.ents {
            if fs.parent_id() == old_id {
                fs.set_parent_id(new_id);
            }
        }
    }

    /// De-duplicates the table without changing the entry order. `cmp`
    /// returns `true` when two entries are equal; of each group of equal
    /// entries the one visited first survives (the later mounted file
    /// system with the default backward direction).
    pub fn uniq_fs<F>(&mut self, flags: UniqFlags, cmp: F)
    where
        F: Fn(&FsEntry, &FsEntry) -> bool,
    {
        if self.ents.is_empty() {
            return;
        }

        log::debug!("Table::uniq_fs de-duplicate");

        let keep_tree = flags.contains(UniqFlags::KEEPTREE) && self.is_mountinfo();

        if flags.contains(UniqFlags::FORWARD) {
            let mut p = 0;
            while p < self.ents.len() {
                let duplicate = (0..p).any(|x| cmp(&self.ents[x], &self.ents[p]));

                if duplicate {
                    if keep_tree {
                        let (id, parent_id) = (self.ents[p].id(), self.ents[p].parent_id());
                        self.move_parent(id, parent_id);
                    }
                    log::debug!(
                        "Table::uniq_fs remove duplicate {:?}",
                        self.ents[p].target()
                    );
                    self.ents.remove(p);
                } else {
                    p += 1;
                }
            }
        } else {
            let mut p = self.ents.len();
            while p > 0 {
                p -= 1;
                let duplicate = ((p + 1)..self.ents.len()).any(|x| cmp(&self.ents[x], &self.ents[p]));

                if duplicate {
                    if keep_tree {
                        let (id, parent_id) = (self.ents[p].id(), self.ents[p].parent_id());
                        self.move_parent(id, parent_id);
                    }
                    log::debug!(
                        "Table::uniq_fs remove duplicate {:?}",
                        self.ents[p].target()
                    );
                    self.ents.remove(p);
                }
            }
        }
    }

    //------------------------------------------------------------------
    // fs-root (bind mounts and subvolumes)
    //------------------------------------------------------------------

    fn resolve_spec(&self, fs: &FsEntry) -> Option<PathBuf> {
        match fs.source()? {
            Source::Tag(tag) => self
                .cache
                .as_ref()
                .and_then(|cache| cache.resolve_tag(tag.name(), tag.value())),
            Source::Path(path) => match &self.cache {
                Some(cache) => cache.resolve_path(path).or_else(|| Some(path.clone())),
                None => Some(path.clone()),
            },
        }
    }

    fn btrfs_fs_root(&self, fs: &FsEntry) -> Option<String> {
        fn with_leading_slash(vol: &str) -> String {
            if vol.starts_with('/') {
                vol.to_owned()
            } else {
                format!("/{}", vol)
            }
        }

        if let Some(Some(vol)) = fs.option_value("subvol") {
            return Some(with_leading_slash(vol));
        }

        if let Some(Some(id)) = fs.option_value("subvolid") {
            // the kernel keeps the subvol path in mountinfo up to date, use
            // it instead of reconstructing the path from backrefs
            let target = fs.target()?;
            let target = self
                .cache
                .as_ref()
                .and_then(|cache| cache.resolve_path(target))
                .unwrap_or_else(|| target.to_path_buf());

            let index =
                self.find_target_with_option_index(&target, "subvolid", id, Direction::Backward)?;

            if let Some(Some(vol)) = self.ents[index].option_value("subvol") {
                return Some(with_leading_slash(vol));
            }
        }

        None
    }

    /// Computes the fs-root that will probably be used in the mountinfo
    /// file for `fs` after mount(2): the inner path for a bind mount
    /// (`bind` set, mountinfo tables), the subvolume path for btrfs.
    /// Returns the table entry that will be used as a source for a bind
    /// mount, along with the fs-root.
    pub fn get_fs_root(&self, fs: &FsEntry, bind: bool) -> (Option<&FsEntry>, String) {
        log::debug!(
            "Table::get_fs_root lookup fs-root for {:?}",
            fs.source().map(|s| s.to_string())
        );

        if bind && self.is_mountinfo() {
            let src = match self.resolve_spec(fs) {
                Some(src) => src,
                None => return (None, "/".to_owned()),
            };

            let mnt = self
                .find_mountpoint_index(&src, Direction::Backward)
                .and_then(|i| self.ents[i].target())
                .map(|t| t.to_path_buf());

            let Some(mnt) = mnt else {
                return (None, "/".to_owned());
            };

            // fs-root is the source with the mount point stripped off
            let src_str = src.to_string_lossy();
            let mnt_str = mnt.to_string_lossy();
            let stripped = if mnt_str.len() > 1 {
                &src_str[mnt_str.len().min(src_str.len())..]
            } else {
                &src_str[..]
            };
            let mut root = if stripped.is_empty() {
                "/".to_owned()
            } else {
                stripped.to_owned()
            };

            let src_fs_index = self.find_target_index(&mnt, Direction::Backward);

            if let Some(index) = src_fs_index {
                // the source may itself sit on a subvolume or another bind
                // mount; compose the final root from both
                if let Some(src_root) = self.ents[index].root() {
                    if !root.starts_with(src_root) {
                        root = if root == "/" {
                            src_root.to_owned()
                        } else {
                            format!("{}{}", src_root, root)
                        };
                    }
                }

                log::debug!("Table::get_fs_root fs-root result: {}", root);
                return (Some(&self.ents[index]), root);
            }

            log::debug!("Table::get_fs_root fs-root result: {}", root);
            return (None, root);
        }

        if matches!(fs.fstype(), Some("btrfs") | Some("auto")) {
            if let Some(root) = self.btrfs_fs_root(fs) {
                log::debug!("Table::get_fs_root fs-root result: {}", root);
                return (None, root);
            }
        }

        (None, "/".to_owned())
    }

    //------------------------------------------------------------------
    // Mount status
    //------------------------------------------------------------------

    /// Decides whether the configured entry `fstab_fs` (usually from
    /// fstab) is already mounted according to this table (usually
    /// mountinfo). Swap entries are ignored. Source, fs-root and target of
    /// the entries are compared explicitly.
    pub fn is_fs_mounted(&self, fstab_fs: &FsEntry) -> bool {
        log::debug!(
            "Table::is_fs_mounted target={:?}, source={:?}",
            fstab_fs.target(),
            fstab_fs.source().map(|s| s.to_string())
        );

        if fstab_fs.is_swap_area() || self.is_empty() {
            return false;
        }

        let mut root: Option<String> = None;
        let mut src: Option<PathBuf> = None;

        if self.is_mountinfo() {
            // fs-roots can be used
            let bind = fstab_fs.option_value("bind").is_some();
            let (root_fs, computed) = self.get_fs_root(fstab_fs, bind);

            src = root_fs.and_then(|fs| fs.source_path().map(|p| p.to_path_buf()));
            root = Some(computed);
        }

        if src.is_none() {
            src = if self.cache.is_some() && !fstab_fs.is_pseudo_fs() {
                self.resolve_spec(fstab_fs)
            } else {
                fstab_fs.source_path().map(|p| p.to_path_buf())
            };
        }

        let (Some(src), Some(tgt)) = (src, fstab_fs.target()) else {
            log::debug!("Table::is_fs_mounted ignore (no source/target)");
            return false;
        };

        let mut devno = 0;
        if root.is_some() {
            devno = fstab_fs.devno();
            if devno == 0 {
                if let Ok(metadata) = std::fs::metadata(&src) {
                    if metadata.file_type().is_block_device() {
                        devno = metadata.rdev();
                    }
                }
            }
        }

        let mut canonical_tgt: Option<Option<PathBuf>> = None;

        for fs in &self.ents {
            if std::ptr::eq(fs, fstab_fs) {
                return true;
            }

            let mut eq = fs.streq_srcpath(&src);

            if !eq && devno != 0 && fs.devno() == devno {
                eq = true;
            }

            if !eq {
                // the source does not match; maybe it is the backing file
                // of a loop device
                let Some(srcpath) = fs.source_path() else {
                    continue;
                };
                if !srcpath.to_string_lossy().starts_with("/dev/loop") {
                    continue;
                }

                let offset = match fstab_fs.option_value("offset") {
                    Some(Some(value)) => match value.parse::<u64>() {
                        Ok(offset) => Some(offset),
                        Err(_) => {
                            log::debug!("Table::is_fs_mounted failed to parse offset=");
                            continue;
                        }
                    },
                    _ => None,
                };

                if !misc::loop_is_backed_by(srcpath, &src, offset) {
                    continue;
                }
            }

            if let Some(root) = &root {
                match fs.root() {
                    Some(r) if r == root => {}
                    _ => continue,
                }
            }

            // compare the target, canonicalizing lazily to avoid readlink()
            // on mount points
            if fs.streq_target(tgt) {
                return true;
            }

            if let Some(cache) = &self.cache {
                let resolved =
                    canonical_tgt.get_or_insert_with(|| cache.resolve_path(tgt));

                if let Some(resolved) = resolved {
                    if fs.streq_target(resolved) {
                        return true;
                    }
                }
            }
        }

        false
    }
}
