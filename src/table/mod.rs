// Copyright (c) 2023 Nick Piaddo
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Mount-table model: entries from fstab, mtab or mountinfo, with
//! `mount(8)`-compatible lookups, tree reconstruction, de-duplication and
//! mount-status reasoning.

// From dependency library

// From standard library

// From this library
pub use direction_enum::Direction;
pub use fs_entry_struct::FsEntry;
pub use fs_entry_struct::Source;
pub use path_cache_struct::PathCache;
pub use table_iter_struct::TableIter;
pub use table_struct::Table;
pub use table_struct::UniqFlags;

mod direction_enum;
mod fs_entry_struct;
mod path_cache_struct;
mod table_iter_struct;
mod table_struct;
