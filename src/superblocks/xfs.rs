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

pub(super) static XFS_ID_INFO: IdInfo = IdInfo {
    name: "xfs",
    usage: Usage::FileSystem,
    flags: IdFlags::empty(),
    magics: &[IdMag {
        magic: b"XFSB",
        kboff: 0,
        sboff: 0,
    }],
    probe_fn: probe_xfs,
};

// log records start with a magic of their own; an external log device has
// no XFSB superblock, only record headers
pub(super) static XFS_LOG_ID_INFO: IdInfo = IdInfo {
    name: "xfs_external_log",
    usage: Usage::Other,
    flags: IdFlags::empty(),
    magics: &[],
    probe_fn: probe_xfs_log,
};

const XLOG_HEADER_MAGIC: u32 = 0xfeed_babe;

fn is_power_of_two(n: u32) -> bool {
    n != 0 && n & (n - 1) == 0
}

fn probe_xfs(pr: &mut Probe, _mag: Option<&MagicMatch>) -> Result<ProbeOutcome, ProbeError> {
    let buf = match pr.get_buffer(0, 512)? {
        Some(buf) => buf,
        None => return Ok(ProbeOutcome::NothingDetected),
    };

    let block_size = bytes::u32_be(&buf, 4);
    let dblocks = bytes::u64_be(&buf, 8);
    let sector_size = bytes::u16_be(&buf, 102) as u32;

    if !is_power_of_two(block_size) || !(512..=65536).contains(&block_size) {
        return Ok(ProbeOutcome::NothingDetected);
    }
    if !is_power_of_two(sector_size) || !(512..=32768).contains(&sector_size) {
        return Ok(ProbeOutcome::NothingDetected);
    }

    let mut uuid = [0u8; 16];
    uuid.copy_from_slice(&buf[32..48]);

    pr.set_label(&buf[108..120])?;
    pr.set_uuid(&uuid)?;
    pr.set_fs_size(dblocks * block_size as u64)?;
    pr.set_block_size(block_size as u64)?;

    Ok(ProbeOutcome::Found)
}

fn probe_xfs_log(pr: &mut Probe, _mag: Option<&MagicMatch>) -> Result<ProbeOutcome, ProbeError> {
    // record headers sit at sector boundaries; checking the first two
    // sectors is enough to identify a dedicated log device
    for sector in 0..2u64 {
        let buf = match pr.get_buffer(sector * 512, 512)? {
            Some(buf) => buf,
            None => return Ok(ProbeOutcome::NothingDetected),
        };

        if bytes::u32_be(&buf, 0) != XLOG_HEADER_MAGIC {
            continue;
        }

        let version = bytes::u32_be(&buf, 8);
        if version != 1 && version != 2 {
            continue;
        }

        let mut uuid = [0u8; 16];
        uuid.copy_from_slice(&buf[304..320]);
        pr.set_uuid_named("LOGUUID", &uuid)?;

        return Ok(ProbeOutcome::Found);
    }

    Ok(ProbeOutcome::NothingDetected)
}
