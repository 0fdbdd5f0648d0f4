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

// the ext superblock lives 1 KiB into the device
const EXT_SB_OFFSET: u64 = 1024;
const EXT_SB_SIZE: u64 = 1024;

const FEATURE_COMPAT_HAS_JOURNAL: u32 = 0x0004;

const FEATURE_INCOMPAT_FILETYPE: u32 = 0x0002;
const FEATURE_INCOMPAT_RECOVER: u32 = 0x0004;
const FEATURE_INCOMPAT_JOURNAL_DEV: u32 = 0x0008;
const FEATURE_INCOMPAT_META_BG: u32 = 0x0010;
const FEATURE_INCOMPAT_64BIT: u32 = 0x0080;

// anything beyond these means the file system is not plain ext2/ext3
const EXT2_FEATURE_INCOMPAT_SUPP: u32 = FEATURE_INCOMPAT_FILETYPE | FEATURE_INCOMPAT_META_BG;
const EXT3_FEATURE_INCOMPAT_SUPP: u32 =
    FEATURE_INCOMPAT_FILETYPE | FEATURE_INCOMPAT_RECOVER | FEATURE_INCOMPAT_META_BG;

static EXT_MAGICS: &[IdMag] = &[IdMag {
    magic: b"\x53\xEF",
    kboff: 1,
    sboff: 0x38,
}];

pub(super) static EXT2_ID_INFO: IdInfo = IdInfo {
    name: "ext2",
    usage: Usage::FileSystem,
    flags: IdFlags::empty(),
    magics: EXT_MAGICS,
    probe_fn: probe_ext2,
};

pub(super) static EXT3_ID_INFO: IdInfo = IdInfo {
    name: "ext3",
    usage: Usage::FileSystem,
    flags: IdFlags::empty(),
    magics: EXT_MAGICS,
    probe_fn: probe_ext3,
};

pub(super) static EXT4_ID_INFO: IdInfo = IdInfo {
    name: "ext4",
    usage: Usage::FileSystem,
    flags: IdFlags::empty(),
    magics: EXT_MAGICS,
    probe_fn: probe_ext4,
};

struct ExtSuperBlock {
    blocks_count: u32,
    blocks_count_hi: u32,
    log_block_size: u32,
    rev_level: u32,
    minor_rev_level: u16,
    feature_compat: u32,
    feature_incompat: u32,
    uuid: [u8; 16],
    volume_name: [u8; 16],
}

fn read_super_block(pr: &mut Probe) -> Result<Option<ExtSuperBlock>, ProbeError> {
    let buf = match pr.get_buffer(EXT_SB_OFFSET, EXT_SB_SIZE)? {
        Some(buf) => buf,
        None => return Ok(None),
    };

    let mut uuid = [0u8; 16];
    uuid.copy_from_slice(&buf[0x68..0x78]);
    let mut volume_name = [0u8; 16];
    volume_name.copy_from_slice(&buf[0x78..0x88]);

    Ok(Some(ExtSuperBlock {
        blocks_count: bytes::u32_le(&buf, 0x04),
        blocks_count_hi: bytes::u32_le(&buf, 0x150),
        log_block_size: bytes::u32_le(&buf, 0x18),
        rev_level: bytes::u32_le(&buf, 0x4c),
        minor_rev_level: bytes::u16_le(&buf, 0x3e),
        feature_compat: bytes::u32_le(&buf, 0x5c),
        feature_incompat: bytes::u32_le(&buf, 0x60),
        uuid,
        volume_name,
    }))
}

impl ExtSuperBlock {
    fn has_journal(&self) -> bool {
        self.feature_compat & FEATURE_COMPAT_HAS_JOURNAL != 0
    }

    fn block_size(&self) -> u64 {
        // sanity-capped, s_log_block_size above 16 means a corrupt superblock
        1024u64 << self.log_block_size.min(16)
    }

    fn fs_size(&self) -> u64 {
        let blocks = if self.feature_incompat & FEATURE_INCOMPAT_64BIT != 0 {
            (self.blocks_count_hi as u64) << 32 | self.blocks_count as u64
        } else {
            self.blocks_count as u64
        };

        blocks * self.block_size()
    }
}

fn emit(pr: &mut Probe, sb: &ExtSuperBlock) -> Result<ProbeOutcome, ProbeError> {
    pr.set_label(&sb.volume_name)?;
    pr.set_uuid(&sb.uuid)?;
    pr.set_version(&format!("{}.{}", sb.rev_level, sb.minor_rev_level))?;
    pr.set_fs_size(sb.fs_size())?;
    pr.set_block_size(sb.block_size())?;

    Ok(ProbeOutcome::Found)
}

fn probe_ext2(pr: &mut Probe, _mag: Option<&MagicMatch>) -> Result<ProbeOutcome, ProbeError> {
    let sb = match read_super_block(pr)? {
        Some(sb) => sb,
        None => return Ok(ProbeOutcome::NothingDetected),
    };

    // ext2 has no journal and no newer incompatible features
    if sb.has_journal() || sb.feature_incompat & !EXT2_FEATURE_INCOMPAT_SUPP != 0 {
        return Ok(ProbeOutcome::NothingDetected);
    }

    emit(pr, &sb)
}

fn probe_ext3(pr: &mut Probe, _mag: Option<&MagicMatch>) -> Result<ProbeOutcome, ProbeError> {
    let sb = match read_super_block(pr)? {
        Some(sb) => sb,
        None => return Ok(ProbeOutcome::NothingDetected),
    };

    if !sb.has_journal() || sb.feature_incompat & !EXT3_FEATURE_INCOMPAT_SUPP != 0 {
        return Ok(ProbeOutcome::NothingDetected);
    }

    emit(pr, &sb)
}

fn probe_ext4(pr: &mut Probe, _mag: Option<&MagicMatch>) -> Result<ProbeOutcome, ProbeError> {
    let sb = match read_super_block(pr)? {
        Some(sb) => sb,
        None => return Ok(ProbeOutcome::NothingDetected),
    };

    // an external journal device is not a file system
    if sb.feature_incompat & FEATURE_INCOMPAT_JOURNAL_DEV != 0 {
        return Ok(ProbeOutcome::NothingDetected);
    }

    // ext4 carries at least one feature unknown to ext2/ext3
    if sb.feature_incompat & !EXT3_FEATURE_INCOMPAT_SUPP == 0 {
        return Ok(ProbeOutcome::NothingDetected);
    }

    emit(pr, &sb)
}
