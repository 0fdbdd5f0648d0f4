// Copyright (c) 2023 Nick Piaddo
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! # Table of Contents
//! 1. [Description](#description)
//! 2. [API structure](#api-structure)
//! 3. [Debugging](#debugging)
//!
//! ## Description
//!
//! The `rsdevid` library identifies disks (block devices), the file systems they use to
//! store content, as well as extracting additional information such as:
//! - File system labels,
//! - Volume names,
//! - Unique identifiers,
//! - Serial numbers,
//! - etc.
//!
//! `rsdevid` presents the data it gathers as key/value pairs (tags), where the keys can be for
//! example a device's `LABEL`, `UUID`, file system `TYPE`, etc.
//!
//! It also models system mount tables (fstab, mtab, kernel mountinfo) as ordered entry
//! lists with `mount(8)`-compatible lookups, mount-tree reconstruction, de-duplication,
//! and bind-mount/subvolume reasoning.
//!
//! ## API structure
//!
//! `rsdevid`'s API is divided into the following modules:
//! - [`probe`]: the low-level probing engine. A [`Probe`](probe::Probe) scans a block
//!   device, a character device, or an image file through three chains of search
//!   functions (`superblocks`, `topology`, `partitions`) and collects `NAME=value`
//!   results.
//! - [`table`]: the mount-table model. A [`Table`](table::Table) holds
//!   [`FsEntry`](table::FsEntry) values and supports lookup by source, target, tag or
//!   device number, parent/child tree walks over mountinfo IDs, and mount-status
//!   reasoning.
//! - [`cache`]: a high-level handle pairing an in-memory device list with the persisted
//!   tag cache location.
//! - [`config`]: the `blkid.conf` configuration model.
//! - [`core`]: shared vocabulary types ([`Tag`](core::device::Tag),
//!   [`Label`](core::device::Label), [`Uuid`](core::device::Uuid), ...).
//!
//! ```no_run
//! use rsdevid::probe::{FsProperty, Probe};
//!
//! fn main() -> rsdevid::Result<()> {
//!     let mut probe = Probe::builder()
//!         .scan_device("/dev/vda1")
//!         .collect_fs_properties(vec![
//!             FsProperty::Type,
//!             FsProperty::Label,
//!             FsProperty::Uuid,
//!         ])
//!         .build()?;
//!
//!     while probe.do_probe()?.found() {
//!         for value in probe.values() {
//!             println!("{}", value);
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Debugging
//!
//! `rsdevid` logs debug messages through the
//! [log](https://crates.io/crates/log) lightweight logging *facade*; executables have
//! to install a logger implementation compatible with the facade (e.g.
//! [`env_logger`](https://docs.rs/env_logger/*/env_logger/)) to produce log output.

pub use error::*;

pub mod cache;
pub mod config;
pub mod core;
pub mod probe;
pub mod table;

mod error;

pub(crate) mod partitions;
pub(crate) mod superblocks;
pub(crate) mod topology;
