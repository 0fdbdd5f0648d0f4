// Copyright (c) 2023 Nick Piaddo
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! File system superblock search functions.
//!
//! The catalogue is ordered: container formats (RAID, LVM, crypto) come
//! before plain file systems, so that a file system signature left over
//! inside a container does not shadow the container itself.

// From dependency library

// From standard library

// From this library
use crate::core::device::Usage;
use crate::probe::chain_driver;
use crate::probe::chain_driver::ChainDriver;
use crate::probe::chain_driver::MagicOutcome;
use crate::probe::chain_driver::SafeOutcome;
use crate::probe::ChainKind;
use crate::probe::FsProperty;
use crate::probe::IdFlags;
use crate::probe::IdInfo;
use crate::probe::Probe;
use crate::probe::ProbeError;
use crate::probe::ProbeOutcome;
use crate::probe::ProbeValue;

mod btrfs;
mod ext_fs;
mod linux_raid;
mod luks;
mod lvm;
mod swap;
mod vfat;
mod xfs;

static ID_INFOS: &[&IdInfo] = &[
    &linux_raid::LINUX_RAID_ID_INFO,
    &lvm::LVM2_ID_INFO,
    &luks::LUKS_ID_INFO,
    &vfat::VFAT_ID_INFO,
    &xfs::XFS_ID_INFO,
    &xfs::XFS_LOG_ID_INFO,
    &ext_fs::EXT4_ID_INFO,
    &ext_fs::EXT3_ID_INFO,
    &ext_fs::EXT2_ID_INFO,
    &btrfs::BTRFS_ID_INFO,
    &swap::SWAP_ID_INFO,
];

/// The superblocks chain driver, enabled by default.
pub(crate) struct SuperblocksDriver;

impl ChainDriver for SuperblocksDriver {
    fn default_enabled(&self) -> bool {
        true
    }

    fn default_flags(&self) -> u32 {
        FsProperty::Default.into()
    }

    fn has_filter(&self) -> bool {
        true
    }

    fn id_infos(&self) -> &'static [&'static IdInfo] {
        ID_INFOS
    }

    fn probe(&self, pr: &mut Probe) -> Result<ProbeOutcome, ProbeError> {
        let kind = ChainKind::Superblocks;
        let infos = self.id_infos();

        let mut i = (pr.chain(kind).idx + 1).max(0) as usize;

        while i < infos.len() {
            pr.chain_mut(kind).idx = i as i32;
            let id = infos[i];

            if pr.chain(kind).filter_skips(i) {
                i += 1;
                continue;
            }

            // don't probe for RAIDs, swap or journals on CD/DVDs
            if matches!(id.usage, Usage::Raid | Usage::Other) && pr.is_cdrom() {
                i += 1;
                continue;
            }

            // don't probe for RAIDs on floppies
            if id.usage == Usage::Raid && pr.is_tiny() {
                i += 1;
                continue;
            }

            log::debug!("superblocks: probing [{}] {}", i, id.name);

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
                    pr.set_fs_type(id.name)?;
                    pr.set_usage(id.usage)?;
                    if let Some(mag) = &mag {
                        pr.set_magic(mag.offset, mag.magic)?;
                    }

                    log::debug!("superblocks: {} identified", id.name);
                    return Ok(ProbeOutcome::Found);
                }
            }
        }

        pr.chain_mut(kind).idx = infos.len() as i32 - 1;
        Ok(ProbeOutcome::NothingDetected)
    }

    fn safeprobe(&self, pr: &mut Probe) -> Result<SafeOutcome, ProbeError> {
        let kind = ChainKind::Superblocks;
        let infos = self.id_infos();

        let mut saved: Vec<ProbeValue> = Vec::new();
        let mut saved_idx: i32 = -1;
        let mut count = 0usize;
        let mut intolerant = 0usize;

        loop {
            match self.probe(pr)? {
                ProbeOutcome::NothingDetected => break,
                ProbeOutcome::Found => {
                    // floppy or so, return the first result
                    if pr.is_tiny() && count == 0 {
                        return Ok(SafeOutcome::Found);
                    }

                    count += 1;
                    let idx = pr.chain(kind).idx;

                    if count == 1 {
                        // keep the first result aside
                        saved = pr.take_chain_values(kind);
                        saved_idx = idx;
                    } else {
                        pr.chain_reset_values(kind);
                    }

                    let id = infos[idx as usize];

                    // the first detected RAID or crypto container wins,
                    // don't look for file systems stacked on top of it
                    if matches!(id.usage, Usage::Raid | Usage::Crypto) {
                        break;
                    }

                    if !id.flags.contains(IdFlags::TOLERANT) {
                        intolerant += 1;
                    }
                }
            }
        }

        if count > 0 {
            // restore the first result
            pr.chain_reset_values(kind);
            pr.append_values(saved);
            pr.chain_mut(kind).idx = saved_idx;
        }

        if intolerant > 1 {
            log::debug!(
                "superblocks: ambivalent result detected ({} file systems)",
                count
            );
            return Ok(SafeOutcome::Ambivalent);
        }

        if count == 0 {
            return Ok(SafeOutcome::NothingDetected);
        }

        Ok(SafeOutcome::Found)
    }
}
