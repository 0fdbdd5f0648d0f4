// Copyright (c) 2023 Nick Piaddo
// SPDX-License-Identifier: Apache-2.0 OR MIT

// From dependency library

// From standard library

// From this library
use crate::probe::chain_driver;
use crate::probe::ChainKind;
use crate::probe::Topology;

/// Per-probe state of one probing domain.
#[derive(Debug)]
pub(crate) struct Chain {
    pub(crate) enabled: bool,
    /// Driver-specific content-selection bits.
    pub(crate) flags: u32,
    /// One flag per descriptor in the driver; `true` means skip.
    pub(crate) filter: Option<Vec<bool>>,
    /// Cursor within the driver's descriptor list, −1 means "before first".
    pub(crate) idx: i32,
    /// Set while a binary-result request is in flight; decoders then bypass
    /// tag emission.
    pub(crate) binary: bool,
    pub(crate) data: Option<ChainData>,
}

/// Opaque binary result owned by a driver.
#[derive(Clone, Copy, Debug)]
pub(crate) enum ChainData {
    Topology(Topology),
}

impl Chain {
    pub(crate) fn new(kind: ChainKind) -> Chain {
        let driver = chain_driver::driver_for(kind);

        Self {
            enabled: driver.default_enabled(),
            flags: driver.default_flags(),
            filter: None,
            idx: -1,
            binary: false,
            data: None,
        }
    }

    pub(crate) fn reset_position(&mut self) {
        self.idx = -1;
    }

    /// Returns `true` when the descriptor at `index` is excluded by the
    /// chain filter.
    pub(crate) fn filter_skips(&self, index: usize) -> bool {
        match &self.filter {
            Some(filter) => filter.get(index).copied().unwrap_or(false),
            None => false,
        }
    }
}
