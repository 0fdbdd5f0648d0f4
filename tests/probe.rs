// Copyright (c) 2023 Nick Piaddo
// SPDX-License-Identifier: Apache-2.0 OR MIT

// Exercises the probing engine end-to-end on synthesized device images.

use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use pretty_assertions::assert_eq;

use rsdevid::probe::{
    Filter, FsProperty, PartitionScanningOption, Probe, ScanResult,
};

static INIT: std::sync::Once = std::sync::Once::new();

fn init_logging() {
    INIT.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

fn put(img: &mut [u8], offset: usize, bytes: &[u8]) {
    img[offset..offset + bytes.len()].copy_from_slice(bytes);
}

fn put_u16_le(img: &mut [u8], offset: usize, value: u16) {
    put(img, offset, &value.to_le_bytes());
}

fn put_u32_le(img: &mut [u8], offset: usize, value: u32) {
    put(img, offset, &value.to_le_bytes());
}

fn put_u64_le(img: &mut [u8], offset: usize, value: u64) {
    put(img, offset, &value.to_le_bytes());
}

fn put_u32_be(img: &mut [u8], offset: usize, value: u32) {
    put(img, offset, &value.to_be_bytes());
}

fn put_u64_be(img: &mut [u8], offset: usize, value: u64) {
    put(img, offset, &value.to_be_bytes());
}

fn write_image(dir: &tempfile::TempDir, name: &str, img: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    let mut file = File::create(&path).unwrap();
    file.write_all(img).unwrap();
    file.sync_all().unwrap();

    path
}

const TEST_UUID: [u8; 16] = [
    0x11, 0x11, 0x11, 0x11, 0x22, 0x22, 0x33, 0x33, 0x44, 0x44, 0x55, 0x55, 0x55, 0x55, 0x55,
    0x55,
];

/// A valid ext4 superblock at offset 1024: journal + extents features,
/// label "TESTFS", a fixed UUID.
fn ext4_superblock(img: &mut [u8]) {
    let sb = 1024;

    put_u32_le(img, sb + 0x04, (img.len() / 4096) as u32); // s_blocks_count
    put_u32_le(img, sb + 0x18, 2); // s_log_block_size -> 4096
    put_u16_le(img, sb + 0x3e, 0); // s_minor_rev_level
    put(img, sb + 0x38, &[0x53, 0xef]); // s_magic
    put_u32_le(img, sb + 0x4c, 1); // s_rev_level
    put_u32_le(img, sb + 0x5c, 0x0004); // has_journal
    put_u32_le(img, sb + 0x60, 0x0040); // extents
    put(img, sb + 0x68, &TEST_UUID);
    put(img, sb + 0x78, b"TESTFS");
}

fn ext4_image() -> Vec<u8> {
    let mut img = vec![0u8; 10 * 1024 * 1024];
    ext4_superblock(&mut img);

    img
}

/// A valid xfs superblock at offset 0.
fn xfs_superblock(img: &mut [u8]) {
    put(img, 0, b"XFSB");
    put_u32_be(img, 4, 4096); // sb_blocksize
    put_u64_be(img, 8, (img.len() / 4096) as u64); // sb_dblocks
    put(img, 32, &TEST_UUID);
    put(img, 102, &512u16.to_be_bytes()); // sb_sectsize
    put(img, 108, b"XFSTEST");
}

// same polynomial as the library, duplicated so the fixtures do not depend
// on the code under test
fn crc32(data: &[u8]) -> u32 {
    let mut crc: u32 = !0;
    for &byte in data {
        crc ^= byte as u32;
        for _ in 0..8 {
            let mask = (crc & 1).wrapping_neg();
            crc = (crc >> 1) ^ (0xedb8_8320 & mask);
        }
    }
    !crc
}

/// A 64 MiB GPT disk with a protective MBR and one Linux partition.
fn gpt_image() -> Vec<u8> {
    let size = 64 * 1024 * 1024;
    let sectors = (size / 512) as u64;
    let mut img = vec![0u8; size];

    // protective MBR
    img[446 + 4] = 0xee;
    put_u32_le(&mut img, 446 + 8, 1);
    put_u32_le(&mut img, 446 + 12, (sectors - 1) as u32);
    put(&mut img, 510, &[0x55, 0xaa]);

    // one partition array entry at LBA 2
    let entry = 1024;
    // Linux filesystem type GUID (0fc63daf-8483-4772-8e79-3d69d8477de4)
    put(
        &mut img,
        entry,
        &[
            0xaf, 0x3d, 0xc6, 0x0f, 0x83, 0x84, 0x72, 0x47, 0x8e, 0x79, 0x3d, 0x69, 0xd8, 0x47,
            0x7d, 0xe4,
        ],
    );
    // unique GUID 12345678-1234-5678-9abc-def012345678
    put(
        &mut img,
        entry + 16,
        &[
            0x78, 0x56, 0x34, 0x12, 0x34, 0x12, 0x78, 0x56, 0x9a, 0xbc, 0xde, 0xf0, 0x12, 0x34,
            0x56, 0x78,
        ],
    );
    put_u64_le(&mut img, entry + 32, 2048); // first LBA
    put_u64_le(&mut img, entry + 40, 4095); // last LBA
    let name: Vec<u8> = "boot".encode_utf16().flat_map(|u| u.to_le_bytes()).collect();
    put(&mut img, entry + 56, &name);

    let entries_crc = crc32(&img[1024..1024 + 128 * 128]);

    // header in LBA 1
    let hdr = 512;
    put(&mut img, hdr, b"EFI PART");
    put_u32_le(&mut img, hdr + 8, 0x0001_0000); // revision
    put_u32_le(&mut img, hdr + 12, 92); // header size
    put_u64_le(&mut img, hdr + 24, 1); // my LBA
    put_u64_le(&mut img, hdr + 32, sectors - 1); // alternate LBA
    put_u64_le(&mut img, hdr + 40, 34); // first usable
    put_u64_le(&mut img, hdr + 48, sectors - 34); // last usable
    put(
        &mut img,
        hdr + 56,
        &[
            0x78, 0x56, 0x34, 0x12, 0x34, 0x12, 0x78, 0x56, 0xca, 0xfe, 0xca, 0xfe, 0xca, 0xfe,
            0xca, 0xfe,
        ],
    );
    put_u64_le(&mut img, hdr + 72, 2); // partition entries LBA
    put_u32_le(&mut img, hdr + 80, 128); // number of entries
    put_u32_le(&mut img, hdr + 84, 128); // entry size
    put_u32_le(&mut img, hdr + 88, entries_crc);

    let header_crc = crc32(&img[hdr..hdr + 92]);
    put_u32_le(&mut img, hdr + 16, header_crc);

    img
}

/// A 16 MiB image holding an LVM label in sector 1 and a stale MBR in
/// sector 0.
fn lvm_over_mbr_image() -> Vec<u8> {
    let mut img = vec![0u8; 16 * 1024 * 1024];

    // stale MBR
    img[446 + 4] = 0x83;
    put_u32_le(&mut img, 446 + 8, 2048);
    put_u32_le(&mut img, 446 + 12, 1000);
    put(&mut img, 510, &[0x55, 0xaa]);

    // LVM label header in sector 1
    put(&mut img, 512, b"LABELONE");
    put_u64_le(&mut img, 520, 1); // sector_xl
    put_u32_le(&mut img, 532, 32); // offset to the pv header
    put(&mut img, 536, b"LVM2 001");
    put(&mut img, 544, b"0123456789abcdefghijklmnopqrstuv");

    img
}

fn lookup_str(probe: &Probe, name: &str) -> Option<String> {
    probe
        .lookup_value(name)
        .and_then(|v| v.as_str())
        .map(|s| s.to_owned())
}

#[test]
fn probe_identifies_an_ext4_file_system() {
    init_logging();

    let dir = tempfile::tempdir().unwrap();
    let path = write_image(&dir, "ext4.img", &ext4_image());

    let mut probe = Probe::builder()
        .scan_device(path)
        .collect_fs_properties(vec![
            FsProperty::Type,
            FsProperty::Label,
            FsProperty::Uuid,
            FsProperty::Version,
        ])
        .build()
        .unwrap();

    let result = probe.do_safeprobe().unwrap();

    assert_eq!(result, ScanResult::FoundProperties);
    assert_eq!(lookup_str(&probe, "TYPE").as_deref(), Some("ext4"));
    assert_eq!(lookup_str(&probe, "LABEL").as_deref(), Some("TESTFS"));
    assert_eq!(
        lookup_str(&probe, "UUID").as_deref(),
        Some("11111111-2222-3333-4444-555555555555")
    );
    assert_eq!(lookup_str(&probe, "VERSION").as_deref(), Some("1.0"));
}

#[test]
fn probe_identifies_a_gpt_partition_table() {
    init_logging();

    let dir = tempfile::tempdir().unwrap();
    let path = write_image(&dir, "gpt.img", &gpt_image());

    let mut probe = Probe::builder()
        .scan_device(path)
        .scan_device_superblocks(false)
        .scan_device_partitions(true)
        .partitions_scanning_options(vec![
            PartitionScanningOption::EntryDetails,
            PartitionScanningOption::Magic,
        ])
        .build()
        .unwrap();

    let result = probe.do_probe().unwrap();

    assert_eq!(result, ScanResult::FoundProperties);
    assert_eq!(lookup_str(&probe, "PTTYPE").as_deref(), Some("gpt"));
    assert_eq!(lookup_str(&probe, "PTMAGIC_OFFSET").as_deref(), Some("512"));
    assert_eq!(
        lookup_str(&probe, "PART_ENTRY_SCHEME").as_deref(),
        Some("gpt")
    );
    assert_eq!(
        lookup_str(&probe, "PART_ENTRY_UUID").as_deref(),
        Some("12345678-1234-5678-9abc-def012345678")
    );
    assert_eq!(lookup_str(&probe, "PART_ENTRY_NUMBER").as_deref(), Some("1"));
    assert_eq!(lookup_str(&probe, "PART_ENTRY_OFFSET").as_deref(), Some("2048"));
    assert_eq!(lookup_str(&probe, "PART_ENTRY_SIZE").as_deref(), Some("2048"));
    assert_eq!(lookup_str(&probe, "PART_ENTRY_NAME").as_deref(), Some("boot"));

    // exactly one set of values, then the pass is over
    let result = probe.do_probe().unwrap();

    assert_eq!(result, ScanResult::NoProperties);
}

#[test]
fn probe_suppresses_a_stale_mbr_inside_a_wiped_area() {
    init_logging();

    let dir = tempfile::tempdir().unwrap();
    let path = write_image(&dir, "lvm.img", &lvm_over_mbr_image());

    let mut probe = Probe::builder()
        .scan_device(path)
        .collect_fs_properties(vec![FsProperty::Type, FsProperty::Uuid])
        .scan_device_partitions(true)
        .build()
        .unwrap();

    let result = probe.do_safeprobe().unwrap();

    assert_eq!(result, ScanResult::FoundProperties);
    assert_eq!(lookup_str(&probe, "TYPE").as_deref(), Some("LVM2_member"));
    assert_eq!(
        lookup_str(&probe, "UUID").as_deref(),
        Some("012345-6789-abcd-efgh-ijkl-mnop-qrstuv")
    );
    // the MBR sits inside the region wiped by pvcreate: stale, not reported
    assert!(!probe.has_value("PTTYPE"));
}

#[test]
fn probe_reports_an_ambivalent_result_for_two_file_systems() {
    init_logging();

    let mut img = ext4_image();
    xfs_superblock(&mut img);

    let dir = tempfile::tempdir().unwrap();
    let path = write_image(&dir, "ambivalent.img", &img);

    let mut probe = Probe::builder()
        .scan_device(path)
        .collect_fs_properties(vec![FsProperty::Type])
        .build()
        .unwrap();

    let result = probe.do_safeprobe().unwrap();

    assert_eq!(result, ScanResult::ConflictingValues);
}

#[test]
fn probe_wipes_a_signature_and_finds_nothing_afterwards() {
    init_logging();

    let dir = tempfile::tempdir().unwrap();
    let path = write_image(&dir, "wipe.img", &ext4_image());

    let mut probe = Probe::builder()
        .scan_device(&path)
        .allow_writes()
        .collect_fs_properties(vec![FsProperty::Type, FsProperty::Label])
        .build()
        .unwrap();

    let result = probe.do_probe().unwrap();
    assert_eq!(result, ScanResult::FoundProperties);
    assert_eq!(lookup_str(&probe, "TYPE").as_deref(), Some("ext4"));

    probe.do_wipe(false).unwrap();

    let result = probe.do_probe().unwrap();

    assert_eq!(result, ScanResult::NoProperties);
    assert_eq!(probe.lookup_value("TYPE"), None);

    // the magic is gone from the device as well
    let content = std::fs::read(&path).unwrap();
    assert_eq!(&content[1024 + 0x38..1024 + 0x3a], &[0, 0]);
}

#[test]
fn probe_dry_run_wipe_keeps_the_signature() {
    init_logging();

    let dir = tempfile::tempdir().unwrap();
    let path = write_image(&dir, "dryrun.img", &ext4_image());

    let mut probe = Probe::builder()
        .scan_device(&path)
        .allow_writes()
        .collect_fs_properties(vec![FsProperty::Type, FsProperty::Label])
        .build()
        .unwrap();

    assert_eq!(probe.do_probe().unwrap(), ScanResult::FoundProperties);

    probe.do_wipe(true).unwrap();
    probe.step_back().unwrap();

    // the same step re-runs and emits the same result
    assert_eq!(probe.do_probe().unwrap(), ScanResult::FoundProperties);
    assert_eq!(lookup_str(&probe, "TYPE").as_deref(), Some("ext4"));
    assert_eq!(lookup_str(&probe, "LABEL").as_deref(), Some("TESTFS"));
}

#[test]
fn probe_type_filter_excludes_a_file_system() {
    init_logging();

    let dir = tempfile::tempdir().unwrap();
    let path = write_image(&dir, "filtered.img", &ext4_image());

    let mut probe = Probe::builder()
        .scan_device(path)
        .collect_fs_properties(vec![FsProperty::Type])
        .build()
        .unwrap();

    probe
        .scan_superblocks_for_file_systems(Filter::Out, &["ext4"])
        .unwrap();

    assert_eq!(probe.do_safeprobe().unwrap(), ScanResult::NoProperties);

    // removing the filter restores the default behaviour
    probe.reset_superblocks_filter().unwrap();

    assert_eq!(probe.do_safeprobe().unwrap(), ScanResult::FoundProperties);
    assert_eq!(lookup_str(&probe, "TYPE").as_deref(), Some("ext4"));
}

#[test]
fn probe_reset_clears_values_and_positions() {
    init_logging();

    let dir = tempfile::tempdir().unwrap();
    let path = write_image(&dir, "reset.img", &ext4_image());

    let mut probe = Probe::builder()
        .scan_device(path)
        .collect_fs_properties(vec![FsProperty::Type])
        .build()
        .unwrap();

    assert_eq!(probe.do_probe().unwrap(), ScanResult::FoundProperties);
    assert!(probe.numof_values() > 0);

    probe.reset_probe();

    assert_eq!(probe.numof_values(), 0);

    // probing starts over from scratch
    assert_eq!(probe.do_probe().unwrap(), ScanResult::FoundProperties);
    assert_eq!(lookup_str(&probe, "TYPE").as_deref(), Some("ext4"));
}

#[test]
fn probe_pass_end_is_sticky_until_reset() {
    init_logging();

    let dir = tempfile::tempdir().unwrap();
    let path = write_image(&dir, "sticky.img", &vec![0u8; 2 * 1024 * 1024]);

    let mut probe = Probe::builder().scan_device(path).build().unwrap();

    assert_eq!(probe.do_probe().unwrap(), ScanResult::NoProperties);
    assert_eq!(probe.do_probe().unwrap(), ScanResult::NoProperties);
    assert_eq!(probe.do_probe().unwrap(), ScanResult::NoProperties);
}

#[test]
fn probe_clone_draws_from_the_parent_window() {
    init_logging();

    let dir = tempfile::tempdir().unwrap();
    let path = write_image(&dir, "clone.img", &ext4_image());

    let mut parent = Probe::builder()
        .scan_device(path)
        .collect_fs_properties(vec![FsProperty::Type])
        .build()
        .unwrap();

    assert_eq!(parent.do_safeprobe().unwrap(), ScanResult::FoundProperties);

    // the clone starts with fresh chains and values, shares the device
    let mut clone = parent.clone_probe();

    assert_eq!(clone.numof_values(), 0);
    assert_eq!(clone.do_safeprobe().unwrap(), ScanResult::FoundProperties);
    assert_eq!(lookup_str(&clone, "TYPE").as_deref(), Some("ext4"));
}

#[test]
fn probe_flags_a_tiny_device() {
    init_logging();

    let dir = tempfile::tempdir().unwrap();
    let floppy = write_image(&dir, "floppy.img", &vec![0u8; 1440 * 1024]);
    let disk = write_image(&dir, "disk.img", &vec![0u8; 1440 * 1024 + 1]);

    let probe = Probe::builder().scan_device(floppy).build().unwrap();
    assert!(probe.is_tiny());

    let probe = Probe::builder().scan_device(disk).build().unwrap();
    assert!(!probe.is_tiny());
}

#[test]
fn probe_window_limits_the_scanned_region() {
    init_logging();

    // the superblock sits outside the probing window
    let dir = tempfile::tempdir().unwrap();
    let path = write_image(&dir, "window.img", &ext4_image());

    let mut probe = Probe::builder()
        .scan_device(path)
        .scan_device_segment(4 * 1024 * 1024, 4 * 1024 * 1024)
        .collect_fs_properties(vec![FsProperty::Type])
        .build()
        .unwrap();

    assert_eq!(probe.do_safeprobe().unwrap(), ScanResult::NoProperties);
}

#[test]
fn probe_rejects_a_window_bigger_than_the_device() {
    init_logging();

    let dir = tempfile::tempdir().unwrap();
    let path = write_image(&dir, "small.img", &vec![0u8; 4096]);

    let result = Probe::builder()
        .scan_device(path)
        .scan_device_segment(0, 8192)
        .build();

    assert!(result.is_err());
}
