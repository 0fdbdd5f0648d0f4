// Copyright (c) 2023 Nick Piaddo
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Device topology extraction.

// From dependency library

// From standard library

// From this library
use crate::core::device::Usage;
use crate::probe::chain_driver;
use crate::probe::ChainData;
use crate::probe::ChainKind;
use crate::probe::IdFlags;
use crate::probe::IdInfo;
use crate::probe::MagicMatch;
use crate::probe::Probe;
use crate::probe::ProbeError;
use crate::probe::ProbeOutcome;
use crate::probe::Topology;

const BLKSSZGET: libc::c_ulong = 0x1268;
const BLKIOMIN: libc::c_ulong = 0x1278;
const BLKIOOPT: libc::c_ulong = 0x1279;
const BLKALIGNOFF: libc::c_ulong = 0x127a;
const BLKPBSZGET: libc::c_ulong = 0x127b;

static IOCTL_ID_INFO: IdInfo = IdInfo {
    name: "ioctl",
    usage: Usage::Other,
    flags: IdFlags::empty(),
    magics: &[],
    probe_fn: probe_ioctl,
};

static ID_INFOS: &[&IdInfo] = &[&IOCTL_ID_INFO];

fn ioctl_c_int(fd: libc::c_int, request: libc::c_ulong) -> Option<libc::c_int> {
    let mut value: libc::c_int = 0;
    match unsafe { libc::ioctl(fd, request, &mut value) } {
        r if r < 0 => None,
        _ => Some(value),
    }
}

fn probe_ioctl(pr: &mut Probe, _mag: Option<&MagicMatch>) -> Result<ProbeOutcome, ProbeError> {
    if !pr.is_block_device() {
        return Ok(ProbeOutcome::NothingDetected);
    }

    let fd = pr.raw_fd();

    let logical = match ioctl_c_int(fd, BLKSSZGET) {
        Some(logical) if logical > 0 => logical as u64,
        _ => return Ok(ProbeOutcome::NothingDetected),
    };

    let topology = Topology {
        alignment_offset: ioctl_c_int(fd, BLKALIGNOFF).map(|v| v.max(0) as u64).unwrap_or(0),
        minimum_io_size: ioctl_c_int(fd, BLKIOMIN).map(|v| v as u64).unwrap_or(0),
        optimal_io_size: ioctl_c_int(fd, BLKIOOPT).map(|v| v as u64).unwrap_or(0),
        logical_sector_size: logical,
        physical_sector_size: ioctl_c_int(fd, BLKPBSZGET)
            .map(|v| v as u64)
            .unwrap_or(logical),
    };

    pr.set_value_u64("LOGICAL_SECTOR_SIZE", topology.logical_sector_size)?;
    pr.set_value_u64("PHYSICAL_SECTOR_SIZE", topology.physical_sector_size)?;
    pr.set_value_u64("MINIMUM_IO_SIZE", topology.minimum_io_size)?;
    pr.set_value_u64("OPTIMAL_IO_SIZE", topology.optimal_io_size)?;
    pr.set_value_u64("ALIGNMENT_OFFSET", topology.alignment_offset)?;

    pr.set_chain_data(ChainKind::Topology, ChainData::Topology(topology));

    Ok(ProbeOutcome::Found)
}

/// The topology chain driver, disabled by default; block devices only.
pub(crate) struct TopologyDriver;

impl chain_driver::ChainDriver for TopologyDriver {
    fn default_enabled(&self) -> bool {
        false
    }

    fn default_flags(&self) -> u32 {
        0
    }

    fn has_filter(&self) -> bool {
        false
    }

    fn id_infos(&self) -> &'static [&'static IdInfo] {
        ID_INFOS
    }

    fn probe(&self, pr: &mut Probe) -> Result<ProbeOutcome, ProbeError> {
        let kind = ChainKind::Topology;
        let infos = self.id_infos();

        let mut i = (pr.chain(kind).idx + 1).max(0) as usize;

        while i < infos.len() {
            pr.chain_mut(kind).idx = i as i32;
            let id = infos[i];

            log::debug!("topology: probing [{}] {}", i, id.name);

            match (id.probe_fn)(pr, None)? {
                ProbeOutcome::NothingDetected => {
                    i += 1;
                    continue;
                }
                ProbeOutcome::Found => return Ok(ProbeOutcome::Found),
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
