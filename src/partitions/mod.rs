// Copyright (c) 2023 Nick Piaddo
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Partition table search functions.

// From dependency library

// From standard library

// From this library
use crate::core::utils::misc;
use crate::probe::chain_driver;
use crate::probe::chain_driver::ChainDriver;
use crate::probe::chain_driver::MagicOutcome;
use crate::probe::ChainKind;
use crate::probe::IdInfo;
use crate::probe::PartitionScanningOption;
use crate::probe::Probe;
use crate::probe::ProbeError;
use crate::probe::ProbeOutcome;

mod dos;
mod gpt;

static ID_INFOS: &[&IdInfo] = &[&dos::DOS_ID_INFO, &gpt::GPT_ID_INFO];

/// One partition slot parsed out of a partition table.
#[derive(Clone, Debug)]
pub(crate) struct PartEntry {
    pub(crate) number: u64,
    /// First sector, in 512-byte units.
    pub(crate) start: u64,
    /// Size in 512-byte sectors.
    pub(crate) size: u64,
    pub(crate) type_str: String,
    pub(crate) uuid: Option<String>,
    pub(crate) name: Option<String>,
}

/// A parsed partition table.
#[derive(Clone, Debug)]
pub(crate) struct PartitionTable {
    pub(crate) scheme: &'static str,
    pub(crate) ptuuid: Option<String>,
    pub(crate) entries: Vec<PartEntry>,
}

/// Emits the `PART_ENTRY_*` set for one partition slot.
fn emit_part_entry(pr: &mut Probe, scheme: &str, entry: &PartEntry) -> Result<(), ProbeError> {
    pr.set_value("PART_ENTRY_SCHEME", scheme.as_bytes().to_vec())?;

    if let Some(name) = &entry.name {
        pr.set_value("PART_ENTRY_NAME", name.as_bytes().to_vec())?;
    }
    if let Some(uuid) = &entry.uuid {
        pr.set_value("PART_ENTRY_UUID", uuid.as_bytes().to_vec())?;
    }

    pr.set_value("PART_ENTRY_TYPE", entry.type_str.as_bytes().to_vec())?;
    pr.set_value_u64("PART_ENTRY_NUMBER", entry.number)?;
    pr.set_value_u64("PART_ENTRY_OFFSET", entry.start)?;
    pr.set_value_u64("PART_ENTRY_SIZE", entry.size)?;

    Ok(())
}

/// Emits the table-level values plus, when entry details are requested, the
/// `PART_ENTRY_*` set for the partition the probing window corresponds to
/// (the first in-use slot for a whole-device window).
fn emit_table(pr: &mut Probe, table: &PartitionTable) -> Result<(), ProbeError> {
    pr.set_value("PTTYPE", table.scheme.as_bytes().to_vec())?;

    if let Some(ptuuid) = &table.ptuuid {
        pr.set_value("PTUUID", ptuuid.as_bytes().to_vec())?;
    }

    if pr.pt_flag(PartitionScanningOption::EntryDetails) {
        if let Some(entry) = table.entries.first() {
            emit_part_entry(pr, table.scheme, entry)?;
        }
    }

    Ok(())
}

/// Probing a partition block device: the table lives on the whole disk, so
/// parse it through the whole-disk probe and report the entry covering this
/// device.
fn probe_partition_device(pr: &mut Probe) -> Result<ProbeOutcome, ProbeError> {
    let start = match misc::partition_start_sector(pr.device_number()) {
        Some(start) => start,
        None => return Ok(ProbeOutcome::NothingDetected),
    };

    let table = {
        let disk_pr = match pr.whole_disk_probe() {
            Some(disk_pr) => disk_pr,
            None => return Ok(ProbeOutcome::NothingDetected),
        };

        match gpt::parse_table(disk_pr, true)? {
            Some(table) => Some(table),
            None => dos::parse_table(disk_pr)?,
        }
    };

    let entry = table.and_then(|table| {
        table
            .entries
            .iter()
            .find(|e| e.start == start)
            .cloned()
            .map(|e| (table.scheme, e))
    });

    match entry {
        Some((scheme, entry)) => {
            emit_part_entry(pr, scheme, &entry)?;
            Ok(ProbeOutcome::Found)
        }
        None => Ok(ProbeOutcome::NothingDetected),
    }
}

/// The partitions chain driver, disabled by default.
pub(crate) struct PartitionsDriver;

impl ChainDriver for PartitionsDriver {
    fn default_enabled(&self) -> bool {
        false
    }

    fn default_flags(&self) -> u32 {
        0
    }

    fn has_filter(&self) -> bool {
        true
    }

    fn id_infos(&self) -> &'static [&'static IdInfo] {
        ID_INFOS
    }

    fn probe(&self, pr: &mut Probe) -> Result<ProbeOutcome, ProbeError> {
        let kind = ChainKind::Partitions;
        let infos = self.id_infos();

        if pr.chain(kind).idx < 0
            && pr.device_number() != 0
            && !pr.is_whole_disk()
        {
            // the window is a partition, not a disk
            pr.chain_mut(kind).idx = infos.len() as i32 - 1;
            return probe_partition_device(pr);
        }

        if pr.is_tiny() && !pr.pt_flag(PartitionScanningOption::ForceGPT) {
            pr.chain_mut(kind).idx = infos.len() as i32 - 1;
            return Ok(ProbeOutcome::NothingDetected);
        }

        let mut i = (pr.chain(kind).idx + 1).max(0) as usize;

        while i < infos.len() {
            pr.chain_mut(kind).idx = i as i32;
            let id = infos[i];

            if pr.chain(kind).filter_skips(i) {
                i += 1;
                continue;
            }

            log::debug!("partitions: probing [{}] {}", i, id.name);

            let mag = match chain_driver::get_id_magic(pr, id)? {
                MagicOutcome::NoMatch => {
                    i += 1;
                    continue;
                }
                MagicOutcome::Match(mag) => mag,
            };

            match (id.probe_fn)(pr, mag.as_ref())? {
                ProbeOutcome::NothingDetected => {
                    i += 1;
                    continue;
                }
                ProbeOutcome::Found => {
                    if let Some(mag) = &mag {
                        pr.set_magic(mag.offset, mag.magic)?;
                    }

                    log::debug!("partitions: {} partition table identified", id.name);
                    return Ok(ProbeOutcome::Found);
                }
            }
        }

        pr.chain_mut(kind).idx = infos.len() as i32 - 1;
        Ok(ProbeOutcome::NothingDetected)
    }

    fn safeprobe(&self, pr: &mut Probe) -> Result<chain_driver::SafeOutcome, ProbeError> {
        match self.probe(pr)? {
            ProbeOutcome::Found => Ok(chain_driver::SafeOutcome::Found),
            ProbeOutcome::NothingDetected => Ok(chain_driver::SafeOutcome::NothingDetected),
        }
    }
}
