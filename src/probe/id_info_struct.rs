// Copyright (c) 2023 Nick Piaddo
// SPDX-License-Identifier: Apache-2.0 OR MIT

// From dependency library
use bitflags::bitflags;

// From standard library
use std::fmt;

// From this library
use crate::core::device::Usage;
use crate::probe::Probe;
use crate::probe::ProbeError;

bitflags! {
    /// Static descriptor flags.
    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    pub(crate) struct IdFlags: u32 {
        /// The format coexists with other signatures on the same device
        /// without ambiguity (e.g. overlay hints); compatible during a
        /// safe-probe.
        const TOLERANT = 1 << 0;
    }
}

/// A magic signature: a fixed byte sequence at a known location.
///
/// The absolute location of the signature is
/// `(kboff + (sboff >> 10)) << 10` plus `sboff & 0x3ff`, i.e. `kboff`
/// kibibytes plus `sboff` bytes.
#[derive(Debug)]
pub(crate) struct IdMag {
    pub(crate) magic: &'static [u8],
    pub(crate) kboff: u64,
    pub(crate) sboff: u16,
}

/// A magic signature found on the device.
#[derive(Clone, Debug)]
pub(crate) struct MagicMatch {
    /// Offset of the signature within the probing window.
    pub(crate) offset: u64,
    pub(crate) magic: &'static [u8],
}

/// Outcome of a single probe function.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum ProbeOutcome {
    /// The descriptor matched; its values were emitted.
    Found,
    /// The descriptor does not apply to the device.
    NothingDetected,
}

pub(crate) type ProbeFn =
    fn(&mut Probe, Option<&MagicMatch>) -> Result<ProbeOutcome, ProbeError>;

/// A static format descriptor: one on-disk format the library can identify.
pub(crate) struct IdInfo {
    pub(crate) name: &'static str,
    pub(crate) usage: Usage,
    pub(crate) flags: IdFlags,
    pub(crate) magics: &'static [IdMag],
    pub(crate) probe_fn: ProbeFn,
}

impl fmt::Debug for IdInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdInfo")
            .field("name", &self.name)
            .field("usage", &self.usage)
            .field("flags", &self.flags)
            .field("magics", &self.magics)
            .finish()
    }
}
