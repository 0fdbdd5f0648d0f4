// Copyright (c) 2023 Nick Piaddo
// SPDX-License-Identifier: Apache-2.0 OR MIT

// Exercises the mount-table model: lookups, tree reconstruction,
// de-duplication and mount-status reasoning.

use std::path::Path;

use pretty_assertions::assert_eq;

use rsdevid::core::device::{Tag, TagName};
use rsdevid::table::{Direction, FsEntry, PathCache, Table, TableIter, UniqFlags};

fn fstab_entry(source: &str, target: &str, fstype: &str, options: &str) -> FsEntry {
    let mut fs = FsEntry::new();
    fs.set_source(source)
        .set_target(target)
        .set_fstype(fstype)
        .set_options(options);

    fs
}

fn mountinfo_entry(
    id: i32,
    parent_id: i32,
    source: &str,
    target: &str,
    fstype: &str,
    root: &str,
) -> FsEntry {
    let mut fs = FsEntry::new();
    fs.set_id(id)
        .set_parent_id(parent_id)
        .set_source(source)
        .set_target(target)
        .set_fstype(fstype)
        .set_root(root);

    fs
}

fn sample_mountinfo() -> Table {
    let mut tb = Table::new();
    tb.add_fs(mountinfo_entry(26, 1, "/dev/sda3", "/", "ext4", "/"));
    tb.add_fs(mountinfo_entry(27, 26, "proc", "/proc", "proc", "/"));
    tb.add_fs(mountinfo_entry(28, 26, "/dev/sda1", "/boot", "ext4", "/"));
    tb.add_fs(mountinfo_entry(29, 26, "/dev/sdb1", "/home", "ext4", "/"));
    tb.add_fs(mountinfo_entry(30, 29, "/dev/sdc1", "/home/data", "ext4", "/"));

    tb
}

#[test]
fn table_iterates_forward_and_backward() {
    let tb = sample_mountinfo();

    let mut itr = TableIter::new(Direction::Forward);
    let first = tb.next_fs(&mut itr).unwrap();
    assert_eq!(first.id(), 26);

    let second = tb.next_fs(&mut itr).unwrap();
    assert_eq!(second.id(), 27);

    itr.reset(Direction::Backward);
    let last = tb.next_fs(&mut itr).unwrap();
    assert_eq!(last.id(), 30);
}

#[test]
fn table_find_next_fs_applies_the_predicate() {
    let tb = sample_mountinfo();

    let mut itr = TableIter::new(Direction::Forward);
    let fs = tb
        .find_next_fs(&mut itr, |fs| fs.fstype() == Some("proc"))
        .unwrap();

    assert_eq!(fs.target(), Some(Path::new("/proc")));
    assert!(tb
        .find_next_fs(&mut itr, |fs| fs.fstype() == Some("proc"))
        .is_none());
}

#[test]
fn table_find_source_picks_the_matching_representation() {
    let mut tb = Table::new();
    tb.add_fs(fstab_entry("LABEL=foo", "/a", "auto", "rw"));
    tb.add_fs(fstab_entry("/dev/sda1", "/a", "auto", "rw"));

    let by_tag = tb.find_source("LABEL=foo", Direction::Forward).unwrap();
    assert_eq!(by_tag.tag(), Some(&Tag::new(TagName::Label, "foo")));

    let by_path = tb.find_source("/dev/sda1", Direction::Forward).unwrap();
    assert_eq!(by_path.source_path(), Some(Path::new("/dev/sda1")));
}

#[test]
fn table_find_source_evaluates_a_tag_through_the_cache() {
    let mut tb = Table::new();
    tb.add_fs(fstab_entry("LABEL=foo", "/a", "auto", "rw"));
    tb.add_fs(fstab_entry("/dev/sda1", "/a", "auto", "rw"));

    let mut cache = PathCache::new();
    cache.insert_canonical("/dev/sda1", "/dev/sda1");
    cache.insert_tags(
        "/dev/sda1",
        vec![Tag::new(TagName::Uuid, "ac4f36bf-191b-4fb0-b808-6d7fc9fc88be")],
    );
    tb.set_cache(cache);

    let fs = tb
        .find_source(
            "UUID=ac4f36bf-191b-4fb0-b808-6d7fc9fc88be",
            Direction::Forward,
        )
        .unwrap();

    assert_eq!(fs.source_path(), Some(Path::new("/dev/sda1")));
}

#[test]
fn table_find_target_with_a_canonicalized_path() {
    let mut tb = Table::new();
    tb.add_fs(fstab_entry("/dev/sda1", "/mnt/data", "ext4", "rw"));

    let mut cache = PathCache::new();
    cache.insert_canonical("/mnt/link", "/mnt/data");
    tb.set_cache(cache);

    // literal comparison fails, the canonicalized one matches
    let fs = tb.find_target(Path::new("/mnt/link"), Direction::Forward);

    assert!(fs.is_some());
}

#[test]
fn table_find_mountpoint_strips_path_components() {
    let tb = sample_mountinfo();

    let fs = tb
        .find_mountpoint(Path::new("/home/data/projects/demo"), Direction::Backward)
        .unwrap();
    assert_eq!(fs.target(), Some(Path::new("/home/data")));

    let fs = tb
        .find_mountpoint(Path::new("/usr/share/doc"), Direction::Backward)
        .unwrap();
    assert_eq!(fs.target(), Some(Path::new("/")));
}

#[test]
fn table_find_devno_scans_linearly() {
    let mut tb = sample_mountinfo();
    let mut fs = fstab_entry("/dev/sdd1", "/extra", "ext4", "rw");
    fs.set_devno(0x0811);
    tb.add_fs(fs);

    let found = tb.find_devno(0x0811, Direction::Forward).unwrap();

    assert_eq!(found.target(), Some(Path::new("/extra")));
}

#[test]
fn table_find_pair_matches_source_and_target() {
    let mut tb = Table::new();
    tb.add_fs(fstab_entry("/dev/sda1", "/a", "ext4", "rw"));
    tb.add_fs(fstab_entry("/dev/sda1", "/b", "ext4", "rw"));

    let fs = tb
        .find_pair("/dev/sda1", Path::new("/b"), Direction::Forward)
        .unwrap();

    assert_eq!(fs.target(), Some(Path::new("/b")));
    assert!(tb
        .find_pair("/dev/sda2", Path::new("/b"), Direction::Forward)
        .is_none());
}

#[test]
fn table_get_root_fs_has_the_smallest_parent_id() {
    let tb = sample_mountinfo();

    let root = tb.get_root_fs().unwrap();

    assert_eq!(root.id(), 26);
    assert_eq!(root.target(), Some(Path::new("/")));
}

#[test]
fn table_next_child_fs_walks_children_in_mount_order() {
    let tb = sample_mountinfo();
    let root = tb.get_root_fs().unwrap().clone();

    let mut itr = TableIter::new(Direction::Forward);

    let first = tb.next_child_fs(&mut itr, &root).unwrap().id();
    let second = tb.next_child_fs(&mut itr, &root).unwrap().id();
    let third = tb.next_child_fs(&mut itr, &root).unwrap().id();

    assert_eq!((first, second, third), (27, 28, 29));
    assert!(tb.next_child_fs(&mut itr, &root).is_none());
}

#[test]
fn table_uniq_fs_keeps_the_later_mounted_entry() {
    let mut tb = Table::new();
    tb.add_fs(mountinfo_entry(10, 1, "/dev/sda1", "/a", "ext4", "/"));
    tb.add_fs(mountinfo_entry(11, 10, "/dev/sdb1", "/a", "ext4", "/"));
    tb.add_fs(mountinfo_entry(12, 11, "/dev/sdc1", "/b", "ext4", "/"));

    tb.uniq_fs(UniqFlags::KEEPTREE, |a, b| a.target() == b.target());

    assert_eq!(tb.nents(), 2);

    // the later mounted /a survived, and its parent link was rewritten to
    // the removed entry's parent
    let survivor = tb.find_target(Path::new("/a"), Direction::Forward).unwrap();
    assert_eq!(survivor.id(), 11);
    assert_eq!(survivor.parent_id(), 1);
}

#[test]
fn table_uniq_fs_forward_removes_later_duplicates() {
    let mut tb = Table::new();
    tb.add_fs(mountinfo_entry(10, 1, "/dev/sda1", "/a", "ext4", "/"));
    tb.add_fs(mountinfo_entry(11, 10, "/dev/sdb1", "/a", "ext4", "/"));

    tb.uniq_fs(UniqFlags::FORWARD, |a, b| a.target() == b.target());

    assert_eq!(tb.nents(), 1);
    assert_eq!(tb.first_fs().unwrap().id(), 10);
}

#[test]
fn table_get_fs_root_defaults_to_slash() {
    let tb = sample_mountinfo();
    let fs = fstab_entry("/dev/sda1", "/boot", "ext4", "rw");

    let (src_fs, root) = tb.get_fs_root(&fs, false);

    assert!(src_fs.is_none());
    assert_eq!(root, "/");
}

#[test]
fn table_get_fs_root_reads_the_btrfs_subvolume_option() {
    let tb = Table::new();
    let fs = fstab_entry("/dev/sda2", "/home", "btrfs", "rw,subvol=volumes/home");

    let (src_fs, root) = tb.get_fs_root(&fs, false);

    assert!(src_fs.is_none());
    assert_eq!(root, "/volumes/home");
}

#[test]
fn table_get_fs_root_resolves_a_bind_mount() {
    let tb = sample_mountinfo();
    let fs = fstab_entry("/home/data/projects", "/mnt/projects", "auto", "bind");

    let (src_fs, root) = tb.get_fs_root(&fs, true);

    // /home/data is the closest mount point, the fs-root is the inner path
    assert_eq!(src_fs.unwrap().target(), Some(Path::new("/home/data")));
    assert_eq!(root, "/projects");
}

#[test]
fn table_is_fs_mounted_finds_a_configured_entry() {
    let tb = sample_mountinfo();

    let mounted = fstab_entry("/dev/sda1", "/boot", "ext4", "rw");
    let unmounted = fstab_entry("/dev/sde1", "/backup", "ext4", "rw");
    let swap = fstab_entry("/dev/sda2", "none", "swap", "sw");

    assert!(tb.is_fs_mounted(&mounted));
    assert!(!tb.is_fs_mounted(&unmounted));
    assert!(!tb.is_fs_mounted(&swap));
}

#[test]
fn table_is_fs_mounted_is_reflexive() {
    let tb = sample_mountinfo();

    for fs in tb.iter() {
        if fs.is_swap_area() {
            continue;
        }
        assert!(tb.is_fs_mounted(fs), "entry {:?} not detected", fs.target());
    }
}

#[test]
fn table_remove_fs_hands_the_entry_back() {
    let mut tb = sample_mountinfo();
    let index = tb.position(|fs| fs.id() == 28).unwrap();

    let fs = tb.remove_fs(index).unwrap();

    assert_eq!(fs.id(), 28);
    assert_eq!(tb.nents(), 4);

    // the entry can be re-linked elsewhere
    let mut other = Table::new();
    other.add_fs(fs);
    assert_eq!(other.nents(), 1);
}

#[test]
fn table_keeps_intro_and_trailing_comments() {
    let mut tb = Table::new();
    tb.set_intro_comment("# static file system information\n");
    tb.set_trailing_comment("# end\n");

    assert_eq!(
        tb.intro_comment(),
        Some("# static file system information\n")
    );
    assert_eq!(tb.trailing_comment(), Some("# end\n"));
}
