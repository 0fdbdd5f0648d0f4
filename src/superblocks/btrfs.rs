// Copyright (c) 2023 Nick Piaddo
// SPDX-License-Identifier: Apache-2.0 OR MIT

// From dependency library

// From standard library

// From this library
use crate::core::device::Usage;
use crate::core::utils::bytes;
use crate::probe::IdFlags;
use crate::probe::IdInfo;
use crate::probe::IdMag;
use crate::probe::MagicMatch;
use crate::probe::Probe;
use crate::probe::ProbeError;
use crate::probe::ProbeOutcome;

// the primary superblock lives at 64 KiB
pub(super) static BTRFS_ID_INFO: IdInfo = IdInfo {
    name: "btrfs",
    usage: Usage::FileSystem,
    flags: IdFlags::empty(),
    magics: &[IdMag {
        magic: b"_BHRfS_M",
        kboff: 64,
        sboff: 0x40,
    }],
    probe_fn: probe_btrfs,
};

fn probe_btrfs(pr: &mut Probe, _mag: Option<&MagicMatch>) -> Result<ProbeOutcome, ProbeError> {
    let buf = match pr.get_buffer(64 * 1024, 1024)? {
        Some(buf) => buf,
        None => return Ok(ProbeOutcome::NothingDetected),
    };

    let mut fsid = [0u8; 16];
    fsid.copy_from_slice(&buf[32..48]);

    // per-device identifier, inside the embedded dev_item
    let mut dev_uuid = [0u8; 16];
    dev_uuid.copy_from_slice(&buf[267..283]);

    let total_bytes = bytes::u64_le(&buf, 112);
    let sector_size = bytes::u32_le(&buf, 144);

    pr.set_label(&buf[299..555])?;
    pr.set_uuid(&fsid)?;
    pr.set_uuid_named("UUID_SUB", &dev_uuid)?;
    pr.set_fs_size(total_bytes)?;
    pr.set_block_size(sector_size as u64)?;

    Ok(ProbeOutcome::Found)
}
