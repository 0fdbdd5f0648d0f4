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
use crate::probe::PartitionScanningOption;
use crate::probe::Probe;
use crate::probe::ProbeError;
use crate::probe::ProbeOutcome;

pub(super) static GPT_ID_INFO: IdInfo = IdInfo {
    name: "gpt",
    usage: Usage::Other,
    flags: IdFlags::empty(),
    // the header lives in LBA 1
    magics: &[IdMag {
        magic: b"EFI PART",
        kboff: 0,
        sboff: 512,
    }],
    probe_fn: probe_gpt,
};

const GPT_REVISION_V1: u32 = 0x0001_0000;
const GPT_HEADER_MIN_SIZE: u64 = 92;
const TYPE_GPT_PROTECTIVE: u8 = 0xee;

/// Reflected CRC-32 as specified by the EFI standard.
pub(crate) fn crc32(data: &[u8]) -> u32 {
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

/// GUIDs store their first three fields little-endian.
fn format_guid(guid: &[u8]) -> String {
    format!(
        "{:02x}{:02x}{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
        guid[3], guid[2], guid[1], guid[0],
        guid[5], guid[4],
        guid[7], guid[6],
        guid[8], guid[9],
        guid[10], guid[11], guid[12], guid[13], guid[14], guid[15]
    )
}

fn is_empty_guid(guid: &[u8]) -> bool {
    guid.iter().all(|&b| b == 0)
}

fn utf16le_to_string(raw: &[u8]) -> String {
    let units: Vec<u16> = raw
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .take_while(|&u| u != 0)
        .collect();

    String::from_utf16_lossy(&units)
}

fn has_protective_mbr(pr: &mut Probe) -> Result<bool, ProbeError> {
    let buf = match pr.get_buffer(0, 512)? {
        Some(buf) => buf,
        None => return Ok(false),
    };

    if bytes::u16_le(&buf, 510) != 0xaa55 {
        return Ok(false);
    }

    let protective = (0..4).any(|i| buf[446 + i * 16 + 4] == TYPE_GPT_PROTECTIVE);

    Ok(protective)
}

/// Parses and verifies the GPT header and partition array in the probing
/// window. Without `force`, a valid protective MBR is required.
pub(super) fn parse_table(
    pr: &mut Probe,
    force: bool,
) -> Result<Option<PartitionTable>, ProbeError> {
    if !force && !has_protective_mbr(pr)? {
        return Ok(None);
    }

    let header = match pr.get_buffer(512, GPT_HEADER_MIN_SIZE)? {
        Some(header) => header,
        None => return Ok(None),
    };

    if &header[0..8] != b"EFI PART" {
        return Ok(None);
    }
    if bytes::u32_le(&header, 8) != GPT_REVISION_V1 {
        return Ok(None);
    }

    let header_size = bytes::u32_le(&header, 12) as u64;
    if !(GPT_HEADER_MIN_SIZE..=4096).contains(&header_size) {
        return Ok(None);
    }

    // the header checksum is computed with its own field zeroed
    let mut full_header = match pr.get_buffer(512, header_size)? {
        Some(full_header) => full_header,
        None => return Ok(None),
    };

    let header_crc = bytes::u32_le(&full_header, 16);
    full_header[16..20].fill(0);

    if !pr.verify_csum(crc32(&full_header) as u64, header_crc as u64)? {
        return Ok(None);
    }

    // this header must describe itself as the primary one in LBA 1
    if bytes::u64_le(&header, 24) != 1 {
        return Ok(None);
    }

    let entries_lba = bytes::u64_le(&header, 72);
    let num_entries = bytes::u32_le(&header, 80) as u64;
    let entry_size = bytes::u32_le(&header, 84) as u64;

    if entry_size < 128 || entry_size % 8 != 0 || num_entries == 0 || num_entries > 1024 {
        return Ok(None);
    }

    let array = match pr.get_buffer(entries_lba * 512, num_entries * entry_size)? {
        Some(array) => array,
        None => return Ok(None),
    };

    let entries_crc = bytes::u32_le(&header, 88);
    if !pr.verify_csum(crc32(&array) as u64, entries_crc as u64)? {
        return Ok(None);
    }

    let mut entries = Vec::new();
    for i in 0..num_entries as usize {
        let entry = &array[i * entry_size as usize..][..entry_size as usize];

        if is_empty_guid(&entry[0..16]) {
            // unused slot
            continue;
        }

        let first_lba = bytes::u64_le(entry, 32);
        let last_lba = bytes::u64_le(entry, 40);
        if last_lba < first_lba {
            continue;
        }

        let name = utf16le_to_string(&entry[56..]);

        entries.push(PartEntry {
            number: (i + 1) as u64,
            start: first_lba,
            size: last_lba - first_lba + 1,
            type_str: format_guid(&entry[0..16]),
            uuid: Some(format_guid(&entry[16..32])),
            name: (!name.is_empty()).then_some(name),
        });
    }

    Ok(Some(PartitionTable {
        scheme: "gpt",
        ptuuid: Some(format_guid(&header[56..72])),
        entries,
    }))
}

fn probe_gpt(pr: &mut Probe, _mag: Option<&MagicMatch>) -> Result<ProbeOutcome, ProbeError> {
    let force = pr.pt_flag(PartitionScanningOption::ForceGPT);

    let table = match parse_table(pr, force)? {
        Some(table) => table,
        None => return Ok(ProbeOutcome::NothingDetected),
    };

    // a GPT header inside a region wiped by an earlier superblock is stale
    if pr.use_wiper(512, 512) {
        return Ok(ProbeOutcome::NothingDetected);
    }

    super::emit_table(pr, &table)?;

    Ok(ProbeOutcome::Found)
}

#[cfg(test)]
#[allow(unused_imports)]
mod tests {
    use super::*;
    use pretty_assertions::{assert_eq, assert_ne};

    #[test]
    fn gpt_crc32_matches_the_reference_check_value() {
        // the CRC-32 of "123456789" is the standard check value
        assert_eq!(crc32(b"123456789"), 0xcbf4_3926);
    }

    #[test]
    fn gpt_formats_a_guid_with_mixed_endianness() {
        let guid: [u8; 16] = [
            0x28, 0x73, 0x2a, 0xc1, 0x1f, 0xf8, 0xd2, 0x11, 0xba, 0x4b, 0x00, 0xa0, 0xc9, 0x3e,
            0xc9, 0x3b,
        ];

        // the EFI System Partition type GUID
        let actual = format_guid(&guid);
        let expected = "c12a7328-f81f-11d2-ba4b-00a0c93ec93b";

        assert_eq!(actual, expected);
    }

    #[test]
    fn gpt_decodes_a_utf16_partition_name() {
        let raw: Vec<u8> = "EFI system partition"
            .encode_utf16()
            .flat_map(|u| u.to_le_bytes())
            .chain([0, 0])
            .collect();

        let actual = utf16le_to_string(&raw);
        let expected = "EFI system partition";

        assert_eq!(actual, expected);
    }
}
