// Copyright (c) 2023 Nick Piaddo
// SPDX-License-Identifier: Apache-2.0 OR MIT

// From dependency library

// From standard library
use std::fmt;

// From this library
use crate::probe::ChainKind;

/// A single `NAME=value` pair collected during a probing pass.
///
/// Names come from the static decoder catalogue; values are owned byte
/// buffers. Most values are printable strings, `SBMAGIC`/`PTMAGIC` are raw
/// magic bytes.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProbeValue {
    name: &'static str,
    data: Vec<u8>,
    pub(crate) chain: ChainKind,
}

impl ProbeValue {
    pub(crate) fn new(name: &'static str, data: Vec<u8>, chain: ChainKind) -> ProbeValue {
        Self { name, data, chain }
    }

    /// Returns this value's name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns this value's raw data.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Views this value's data as a UTF-8 `str`, or `None` when the data is
    /// not valid UTF-8 (e.g. raw magic bytes).
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.data).ok()
    }
}

impl fmt::Display for ProbeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, String::from_utf8_lossy(&self.data))
    }
}
