// Copyright (c) 2023 Nick Piaddo
// SPDX-License-Identifier: Apache-2.0 OR MIT

// From dependency library

// From standard library

// From this library
use crate::core::device::Usage;
use crate::core::utils::bytes;
use crate::probe::IdFlags;
use crate::probe::IdInfo;
use crate::probe::MagicMatch;
use crate::probe::Probe;
use crate::probe::ProbeError;
use crate::probe::ProbeOutcome;

const MD_MAGIC: u32 = 0xa92b_4efc;
const MD_RESERVED: u64 = 64 * 1024;

// the 0.90 superblock sits 64 KiB-aligned at the device end, 1.x moved it
// to fixed offsets near the begin; no static magic table, the probe
// function does the location math
pub(super) static LINUX_RAID_ID_INFO: IdInfo = IdInfo {
    name: "linux_raid_member",
    usage: Usage::Raid,
    flags: IdFlags::empty(),
    magics: &[],
    probe_fn: probe_linux_raid,
};

fn probe_md_090(pr: &mut Probe) -> Result<ProbeOutcome, ProbeError> {
    let size = pr.device_size();
    if size < MD_RESERVED * 2 {
        return Ok(ProbeOutcome::NothingDetected);
    }

    let sb_offset = (size & !(MD_RESERVED - 1)) - MD_RESERVED;

    let buf = match pr.get_buffer(sb_offset, 64)? {
        Some(buf) => buf,
        None => return Ok(ProbeOutcome::NothingDetected),
    };

    if bytes::u32_le(&buf, 0) != MD_MAGIC {
        return Ok(ProbeOutcome::NothingDetected);
    }

    let major = bytes::u32_le(&buf, 4);
    let minor = bytes::u32_le(&buf, 8);
    let patch = bytes::u32_le(&buf, 12);

    if major != 0 {
        return Ok(ProbeOutcome::NothingDetected);
    }

    // the set identifier is stored as four words
    let mut uuid = [0u8; 16];
    uuid[0..4].copy_from_slice(&buf[20..24]);
    uuid[4..8].copy_from_slice(&buf[52..56]);
    uuid[8..12].copy_from_slice(&buf[56..60]);
    uuid[12..16].copy_from_slice(&buf[60..64]);

    pr.set_uuid(&uuid)?;
    pr.set_version(&format!("{}.{}.{}", major, minor, patch))?;

    Ok(ProbeOutcome::Found)
}

fn probe_md_1x(pr: &mut Probe) -> Result<ProbeOutcome, ProbeError> {
    // 1.1 keeps the superblock at offset 0, 1.2 at 4 KiB
    for (sb_offset, version) in [(0u64, "1.1"), (4096u64, "1.2")] {
        let buf = match pr.get_buffer(sb_offset, 64)? {
            Some(buf) => buf,
            None => continue,
        };

        if bytes::u32_le(&buf, 0) != MD_MAGIC || bytes::u32_le(&buf, 4) != 1 {
            continue;
        }

        let mut uuid = [0u8; 16];
        uuid.copy_from_slice(&buf[16..32]);

        pr.set_uuid(&uuid)?;
        pr.set_label(&buf[32..64])?;
        pr.set_version(version)?;

        return Ok(ProbeOutcome::Found);
    }

    Ok(ProbeOutcome::NothingDetected)
}

fn probe_linux_raid(pr: &mut Probe, _mag: Option<&MagicMatch>) -> Result<ProbeOutcome, ProbeError> {
    if let ProbeOutcome::Found = probe_md_090(pr)? {
        return Ok(ProbeOutcome::Found);
    }

    probe_md_1x(pr)
}
