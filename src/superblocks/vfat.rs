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

pub(super) static VFAT_ID_INFO: IdInfo = IdInfo {
    name: "vfat",
    usage: Usage::FileSystem,
    flags: IdFlags::empty(),
    magics: &[
        IdMag {
            magic: b"MSWIN",
            kboff: 0,
            sboff: 0x52,
        },
        IdMag {
            magic: b"FAT32   ",
            kboff: 0,
            sboff: 0x52,
        },
        IdMag {
            magic: b"MSDOS",
            kboff: 0,
            sboff: 0x36,
        },
        IdMag {
            magic: b"FAT16   ",
            kboff: 0,
            sboff: 0x36,
        },
        IdMag {
            magic: b"FAT12   ",
            kboff: 0,
            sboff: 0x36,
        },
        IdMag {
            magic: b"FAT     ",
            kboff: 0,
            sboff: 0x36,
        },
    ],
    probe_fn: probe_vfat,
};

const DIR_ENTRY_SIZE: u64 = 32;
const ATTR_VOLUME_ID: u8 = 0x08;
const ATTR_LONG_NAME: u8 = 0x0f;
const ATTR_MASK: u8 = 0x3f;
const ENTRY_FREE: u8 = 0xe5;

struct Bpb {
    sector_size: u32,
    sectors_per_cluster: u32,
    reserved_sectors: u32,
    num_fats: u32,
    dir_entries: u32,
    fat_size: u32,
    total_sectors: u64,
    fat32: bool,
    root_cluster: u32,
}

impl Bpb {
    fn parse(buf: &[u8]) -> Option<Bpb> {
        let sector_size = bytes::u16_le(buf, 11) as u32;
        let sectors_per_cluster = buf[13] as u32;
        let reserved_sectors = bytes::u16_le(buf, 14) as u32;
        let num_fats = buf[16] as u32;
        let dir_entries = bytes::u16_le(buf, 17) as u32;
        let total16 = bytes::u16_le(buf, 19) as u64;
        let media = buf[21];
        let fat_length16 = bytes::u16_le(buf, 22) as u32;
        let total32 = bytes::u32_le(buf, 32) as u64;
        let fat32_length = bytes::u32_le(buf, 36);

        if !matches!(sector_size, 512 | 1024 | 2048 | 4096) {
            return None;
        }
        if sectors_per_cluster == 0 || !sectors_per_cluster.is_power_of_two() {
            return None;
        }
        if reserved_sectors == 0 || num_fats == 0 {
            return None;
        }
        if media != 0xf0 && media < 0xf8 {
            return None;
        }

        let fat32 = fat_length16 == 0 && fat32_length != 0;
        let fat_size = if fat32 { fat32_length } else { fat_length16 };
        if fat_size == 0 {
            return None;
        }

        let total_sectors = if total16 != 0 { total16 } else { total32 };
        if total_sectors == 0 {
            return None;
        }

        Some(Bpb {
            sector_size,
            sectors_per_cluster,
            reserved_sectors,
            num_fats,
            dir_entries,
            fat_size,
            total_sectors,
            fat32,
            root_cluster: bytes::u32_le(buf, 44),
        })
    }

    fn root_dir_sectors(&self) -> u64 {
        ((self.dir_entries as u64 * DIR_ENTRY_SIZE) + self.sector_size as u64 - 1)
            / self.sector_size as u64
    }

    fn root_dir_start(&self) -> u64 {
        (self.reserved_sectors as u64 + self.num_fats as u64 * self.fat_size as u64)
            * self.sector_size as u64
    }

    fn data_start_sector(&self) -> u64 {
        self.reserved_sectors as u64
            + self.num_fats as u64 * self.fat_size as u64
            + self.root_dir_sectors()
    }

    fn cluster_count(&self) -> u64 {
        (self.total_sectors - self.data_start_sector()) / self.sectors_per_cluster as u64
    }
}

/// Scans a chunk of directory entries for the volume label.
fn volume_label(dir: &[u8]) -> Option<[u8; 11]> {
    for entry in dir.chunks_exact(DIR_ENTRY_SIZE as usize) {
        match entry[0] {
            // end of directory
            0 => return None,
            b if b == ENTRY_FREE => continue,
            _ => {}
        }

        let attr = entry[11];
        if attr & ATTR_MASK == ATTR_LONG_NAME {
            continue;
        }
        if attr & ATTR_VOLUME_ID != 0 {
            let mut label = [0u8; 11];
            label.copy_from_slice(&entry[0..11]);
            return Some(label);
        }
    }

    None
}

fn format_serial(serial: u32) -> String {
    format!("{:04X}-{:04X}", serial >> 16, serial & 0xffff)
}

fn probe_vfat(pr: &mut Probe, _mag: Option<&MagicMatch>) -> Result<ProbeOutcome, ProbeError> {
    let buf = match pr.get_buffer(0, 512)? {
        Some(buf) => buf,
        None => return Ok(ProbeOutcome::NothingDetected),
    };

    let bpb = match Bpb::parse(&buf) {
        Some(bpb) => bpb,
        None => return Ok(ProbeOutcome::NothingDetected),
    };

    let (boot_label, serial, version) = if bpb.fat32 {
        (&buf[71..82], bytes::u32_le(&buf, 67), "FAT32")
    } else {
        let version = if bpb.cluster_count() < 4085 {
            "FAT12"
        } else {
            "FAT16"
        };
        (&buf[43..54], bytes::u32_le(&buf, 39), version)
    };

    // the boot-sector label is a historical copy, the authoritative label
    // lives in the root directory
    let root_label = if bpb.fat32 {
        if bpb.root_cluster >= 2 {
            let cluster_bytes = bpb.sectors_per_cluster as u64 * bpb.sector_size as u64;
            let offset = (bpb.data_start_sector()
                + (bpb.root_cluster as u64 - 2) * bpb.sectors_per_cluster as u64)
                * bpb.sector_size as u64;

            pr.get_buffer(offset, cluster_bytes.min(64 * 1024))?
                .and_then(|dir| volume_label(&dir))
        } else {
            None
        }
    } else {
        let length = (bpb.root_dir_sectors() * bpb.sector_size as u64).min(64 * 1024);
        if length >= DIR_ENTRY_SIZE {
            pr.get_buffer(bpb.root_dir_start(), length)?
                .and_then(|dir| volume_label(&dir))
        } else {
            None
        }
    };

    if let Some(label) = root_label {
        pr.set_label(&label)?;
    }

    let boot_label_set = boot_label.iter().any(|&b| b != 0 && b != b' ');
    if boot_label_set {
        let boot_label = boot_label.to_vec();
        pr.set_label_named("LABEL_FATBOOT", &boot_label)?;
    }

    if serial != 0 {
        pr.set_uuid_str("UUID", &format_serial(serial))?;
    }

    if !bpb.fat32 {
        pr.set_sec_type("msdos")?;
    }

    pr.set_version(version)?;
    pr.set_fs_size(bpb.total_sectors * bpb.sector_size as u64)?;
    pr.set_block_size(bpb.sector_size as u64)?;

    Ok(ProbeOutcome::Found)
}

#[cfg(test)]
#[allow(unused_imports)]
mod tests {
    use super::*;
    use pretty_assertions::{assert_eq, assert_ne};

    #[test]
    fn vfat_formats_a_volume_serial_in_fat_notation() {
        let actual = format_serial(0x1234_abcd);
        let expected = "1234-ABCD";

        assert_eq!(actual, expected);
    }

    #[test]
    fn vfat_finds_a_volume_label_among_directory_entries() {
        let mut dir = vec![0u8; 96];
        // a regular file entry
        dir[0] = b'F';
        dir[11] = 0x20;
        // the volume label entry
        dir[32..43].copy_from_slice(b"TESTVOL    ");
        dir[32 + 11] = ATTR_VOLUME_ID;

        let actual = volume_label(&dir);

        assert_eq!(actual, Some(*b"TESTVOL    "));
    }
}
