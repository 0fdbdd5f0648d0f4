// Copyright (c) 2023 Nick Piaddo
// SPDX-License-Identifier: Apache-2.0 OR MIT

// From dependency library
use enum_iterator::Sequence;

// From standard library
use std::fmt;

// From this library

/// Probing domain.
///
/// The declaration order is the order in which chains are visited during a
/// probing pass.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Sequence)]
pub enum ChainKind {
    /// File system superblock search functions.
    Superblocks,
    /// Device topology extraction.
    Topology,
    /// Partition table search functions.
    Partitions,
}

impl ChainKind {
    /// View this `ChainKind` as a UTF-8 `str`.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Superblocks => "superblocks",
            Self::Topology => "topology",
            Self::Partitions => "partitions",
        }
    }

    pub(crate) fn index(&self) -> usize {
        match self {
            Self::Superblocks => 0,
            Self::Topology => 1,
            Self::Partitions => 2,
        }
    }

    pub(crate) fn from_index(index: usize) -> Option<ChainKind> {
        match index {
            0 => Some(Self::Superblocks),
            1 => Some(Self::Topology),
            2 => Some(Self::Partitions),
            _ => None,
        }
    }
}

impl fmt::Display for ChainKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
