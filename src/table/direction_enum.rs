// Copyright (c) 2023 Nick Piaddo
// SPDX-License-Identifier: Apache-2.0 OR MIT

// From dependency library

// From standard library
use std::fmt;

// From this library

/// Search/iteration direction in a [`Table`](crate::table::Table).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Direction {
    /// From top to bottom.
    Forward,
    /// From bottom to top.
    Backward,
}

impl Direction {
    /// View this `Direction` as a UTF-8 `str`.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Forward => "forward",
            Self::Backward => "backward",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
