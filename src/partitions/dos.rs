// Copyright (c) 2023 Nick Piaddo
// SPDX-License-Identifier: Apache-2.0 OR MIT

// From dependency library

// From standard library

// From this library
use crate::core::device::Usage;
use crate::core::utils::bytes;
use crate::partitions::PartEntry;
use crate::partitions::PartitionTable;
use crate::probe::IdFlags;
use crate::probe::IdInfo;
use crate::probe::IdMag;
use crate::probe::MagicMatch;
use crate::probe::Probe;
use crate::probe::ProbeError;
use crate::probe::ProbeOutcome;

pub(super) static DOS_ID_INFO: IdInfo = IdInfo {
    name: "dos",
    usage: Usage::Other,
    flags: IdFlags::empty(),
    magics: &[IdMag {
        magic: b"\x55\xAA",
        kboff: 0,
        sboff: 510,
    }],
    probe_fn: probe_dos,
};

const MBR_ENTRIES_OFFSET: usize = 446;
const MBR_ENTRY_SIZE: usize = 16;
const MBR_DISK_ID_OFFSET: usize = 440;

const TYPE_GPT_PROTECTIVE: u8 = 0xee;

// the MBR boot-sector magic is shared with FAT file systems
fn is_fat_boot_sector(buf: &[u8]) -> bool {
    const FAT_STRINGS: [&[u8]; 6] = [
        b"MSWIN",
        b"FAT32   ",
        b"MSDOS",
        b"FAT16   ",
        b"FAT12   ",
        b"FAT     ",
    ];

    FAT_STRINGS
        .iter()
        .any(|s| buf[0x52..].starts_with(s) || buf[0x36..].starts_with(s))
}

/// Parses the MBR in the first sector of the probing window.
pub(super) fn parse_table(pr: &mut Probe) -> Result<Option<PartitionTable>, ProbeError> {
    let buf = match pr.get_buffer(0, 512)? {
        Some(buf) => buf,
        None => return Ok(None),
    };

    if bytes::u16_le(&buf, 510) != 0xaa55 {
        return Ok(None);
    }

    if is_fat_boot_sector(&buf) {
        return Ok(None);
    }

    let disk_id = bytes::u32_le(&buf, MBR_DISK_ID_OFFSET);
    let mut entries = Vec::new();

    for i in 0..4 {
        let entry = &buf[MBR_ENTRIES_OFFSET + i * MBR_ENTRY_SIZE..][..MBR_ENTRY_SIZE];

        // only 0x80 (bootable) and 0x00 are valid status bytes
        if entry[0] != 0 && entry[0] != 0x80 {
            return Ok(None);
        }

        let part_type = entry[4];

        // GPT keeps a protective MBR, the gpt prober handles it
        if part_type == TYPE_GPT_PROTECTIVE {
            return Ok(None);
        }

        let start = bytes::u32_le(entry, 8) as u64;
        let size = bytes::u32_le(entry, 12) as u64;

        if part_type == 0 || size == 0 {
            continue;
        }

        let number = (i + 1) as u64;
        entries.push(PartEntry {
            number,
            start,
            size,
            type_str: format!("0x{:x}", part_type),
            uuid: (disk_id != 0).then(|| format!("{:08x}-{:02}", disk_id, number)),
            name: None,
        });
    }

    let ptuuid = (disk_id != 0).then(|| format!("{:08x}", disk_id));

    Ok(Some(PartitionTable {
        scheme: "dos",
        ptuuid,
        entries,
    }))
}

fn probe_dos(pr: &mut Probe, _mag: Option<&MagicMatch>) -> Result<ProbeOutcome, ProbeError> {
    let table = match parse_table(pr)? {
        Some(table) => table,
        None => return Ok(ProbeOutcome::NothingDetected),
    };

    // an MBR inside a region wiped by an earlier superblock is stale
    if pr.use_wiper(0, 512) {
        return Ok(ProbeOutcome::NothingDetected);
    }

    super::emit_table(pr, &table)?;

    Ok(ProbeOutcome::Found)
}
