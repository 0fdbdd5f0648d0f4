// Copyright (c) 2023 Nick Piaddo
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Low-level API to probe block devices.
//!
//! ----
//! # Table of Contents
//! 1. [Description](#description)
//! 2. [Overview](#overview)
//!
//! ## Description
//!
//! The `probe` module offers fine-grained tools from three categories to collect, analyse, and
//! eventually alter data about block devices:
//! - `superblocks`: for file system properties,
//! - `partitions`: for partition description,
//! - `topology`: for sector size, optimal I/O size, device capabilities, etc.
//!
//! The `Probe` struct is the main entry-point of this module. It centralizes all module functionalities.
//!
//! ## Overview
//!
//! A `Probe` reads data primarily from a block device assigned to it at construction. This
//! block device can be, for example:
//! - a whole disk (e.g.  `/dev/sda`)
//! - a disk partition (e.g. `/dev/sda1`)
//! - or an image file.
//!
//! To gather information, a `Probe` tries to identify any disk topology, file system, or partition
//! present on a block device. For each category mentioned, a `Probe` uses a chain of search
//! functions to detect and collect relevant data; search functions are tried in succession until
//! one matches.
//!
//! For example, to determine which file system a disk uses, a `Probe` will try to find a unique
//! identifier (magic number) in the device `superblocks`. If a magic number matches one in the
//! list of supported file systems, the `Probe` will use a specialised function to extract the
//! file system properties requested by the user (e.g. `LABEL`, `UUID`, etc.). If asked, the
//! `Probe` will then automatically switch to searching data for the other categories, i.e.
//! `partitions` and `topology`, applying the same process.
//!
//! Results are collected as `NAME=value` pairs ([`ProbeValue`]); within one probing pass every
//! `NAME` is unique. [`Probe::do_probe`] walks the chains stepwise, one search function per
//! call; [`Probe::do_safeprobe`] performs an exhaustive pass and reports an ambivalent outcome
//! when several mutually-exclusive signatures coexist on the device.

// From dependency library

// From standard library

// From this library
pub use chain_kind_enum::ChainKind;
pub use filter_enum::Filter;
pub use fs_property_enum::FsProperty;
pub use partition_scanning_option_enum::PartitionScanningOption;
pub use probe_builder_error_enum::ProbeBuilderError;
pub use probe_builder_struct::ProbeBuilder;
pub use probe_error_enum::ProbeError;
pub use probe_struct::Probe;
pub use probe_value_struct::ProbeValue;
pub use scan_result_enum::ScanResult;
pub use topology_struct::Topology;

pub(crate) use buffer_pool_struct::BufferPool;
pub(crate) use chain_struct::{Chain, ChainData};
pub(crate) use id_info_struct::{IdFlags, IdInfo, IdMag, MagicMatch, ProbeOutcome};
pub(crate) use probe_builder_struct::PrbBuilder;

pub(crate) mod chain_driver;

mod buffer_pool_struct;
mod chain_kind_enum;
mod chain_struct;
mod filter_enum;
mod fs_property_enum;
mod id_info_struct;
mod partition_scanning_option_enum;
mod probe_builder_error_enum;
mod probe_builder_struct;
mod probe_error_enum;
mod probe_struct;
mod probe_value_struct;
mod scan_result_enum;
mod topology_struct;
