// Copyright (c) 2023 Nick Piaddo
// SPDX-License-Identifier: Apache-2.0 OR MIT

// From dependency library

// From standard library

// From this library
use crate::partitions;
use crate::probe::ChainKind;
use crate::probe::IdInfo;
use crate::probe::MagicMatch;
use crate::probe::Probe;
use crate::probe::ProbeError;
use crate::probe::ProbeOutcome;
use crate::superblocks;
use crate::topology;

/// Outcome of a full-chain safe probe.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum SafeOutcome {
    Found,
    NothingDetected,
    /// Several mutually-exclusive signatures were detected.
    Ambivalent,
}

/// Contract every decoder catalogue satisfies.
pub(crate) trait ChainDriver: Sync {
    fn default_enabled(&self) -> bool;

    fn default_flags(&self) -> u32;

    fn has_filter(&self) -> bool;

    /// Ordered array of static format descriptors.
    fn id_infos(&self) -> &'static [&'static IdInfo];

    /// Advances the chain cursor and tries descriptors from `cursor + 1`.
    /// On success the cursor names the producing descriptor and its values
    /// are emitted (unless the chain is in binary mode). On failure the
    /// cursor is left at the end of the catalogue.
    fn probe(&self, pr: &mut Probe) -> Result<ProbeOutcome, ProbeError>;

    /// One-shot exhaustive scan; collects all matches and either selects one
    /// unambiguously or reports an ambivalent result.
    fn safeprobe(&self, pr: &mut Probe) -> Result<SafeOutcome, ProbeError>;
}

pub(crate) fn driver_for(kind: ChainKind) -> &'static dyn ChainDriver {
    match kind {
        ChainKind::Superblocks => &superblocks::SuperblocksDriver,
        ChainKind::Topology => &topology::TopologyDriver,
        ChainKind::Partitions => &partitions::PartitionsDriver,
    }
}

/// Result of a magic lookup for one descriptor.
#[derive(Debug)]
pub(crate) enum MagicOutcome {
    /// A signature matched (`Some`), or the descriptor defines no signature
    /// and its probe function decides on its own (`None`).
    Match(Option<MagicMatch>),
    NoMatch,
}

/// Searches a descriptor's magic table on the device.
///
/// Each candidate loads the 1 KiB-aligned region containing the signature and
/// compares in place.
pub(crate) fn get_id_magic(
    pr: &mut Probe,
    id: &IdInfo,
) -> Result<MagicOutcome, ProbeError> {
    for mag in id.magics {
        let off = (mag.kboff + (mag.sboff as u64 >> 10)) << 10;

        let buf = match pr.get_buffer(off, 1024)? {
            Some(buf) => buf,
            None => continue,
        };

        let sboff = (mag.sboff & 0x3ff) as usize;
        if buf.len() >= sboff + mag.magic.len() && &buf[sboff..sboff + mag.magic.len()] == mag.magic
        {
            log::debug!(
                "chain_driver::get_id_magic magic sboff={}, kboff={}",
                mag.sboff,
                mag.kboff
            );

            return Ok(MagicOutcome::Match(Some(MagicMatch {
                offset: off + sboff as u64,
                magic: mag.magic,
            })));
        }
    }

    if id.magics.is_empty() {
        // no magic string defined, the probe function decides
        Ok(MagicOutcome::Match(None))
    } else {
        Ok(MagicOutcome::NoMatch)
    }
}
