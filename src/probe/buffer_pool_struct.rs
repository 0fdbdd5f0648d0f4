// Copyright (c) 2023 Nick Piaddo
// SPDX-License-Identifier: Apache-2.0 OR MIT

// From dependency library

// From standard library
use std::fs::File;
use std::io;
use std::os::unix::fs::FileExt;
use std::os::unix::io::AsRawFd;
use std::sync::Arc;

// From this library
use crate::probe::ProbeError;

// Signature probing heavily reads the begin and end of a device, so ~2MiB
// from both ends is mapped at once to reduce the number of syscalls and
// buffers. Random accesses somewhere in the middle of the device use 1MiB
// regions.
const MMAP_BEGIN_SIZE: u64 = 2 * 1024 * 1024;
const MMAP_END_SIZE: u64 = 2 * 1024 * 1024;
const MMAP_MID_SIZE: u64 = 1024 * 1024;

/// Demand-loaded, coalescing read cache over a device file.
///
/// Resident regions live until [`BufferPool::reset`] or drop; there is no
/// eviction, signature probing touches a bounded, mostly clustered address
/// set.
#[derive(Debug)]
pub(crate) struct BufferPool {
    file: Arc<File>,
    // character devices can not be memory mapped
    mmap_wanted: bool,
    window_offset: u64,
    window_size: u64,
    mmap_granularity: u64,
    buffers: Vec<ResidentBuffer>,
}

#[derive(Debug)]
struct ResidentBuffer {
    offset: u64,
    len: u64,
    data: BufferData,
}

#[derive(Debug)]
enum BufferData {
    Mapped(*mut u8),
    Heap(Vec<u8>),
}

impl ResidentBuffer {
    fn bytes(&self) -> &[u8] {
        match &self.data {
            BufferData::Mapped(ptr) => unsafe {
                std::slice::from_raw_parts(*ptr, self.len as usize)
            },
            BufferData::Heap(data) => data,
        }
    }
}

impl Drop for ResidentBuffer {
    fn drop(&mut self) {
        if let BufferData::Mapped(ptr) = self.data {
            unsafe {
                libc::munmap(ptr as *mut libc::c_void, self.len as libc::size_t);
            }
        }
    }
}

impl BufferPool {
    pub(crate) fn new(
        file: Arc<File>,
        mmap_wanted: bool,
        window_offset: u64,
        window_size: u64,
    ) -> BufferPool {
        Self {
            file,
            mmap_wanted,
            window_offset,
            window_size,
            mmap_granularity: 0,
            buffers: Vec::new(),
        }
    }

    /// Releases every resident region.
    pub(crate) fn reset(&mut self) {
        if !self.buffers.is_empty() {
            log::debug!(
                "BufferPool::reset releasing {} resident buffer(s)",
                self.buffers.len()
            );
        }

        self.buffers.clear();
    }

    /// Returns the `len` bytes at absolute offset `real_off`, loading a new
    /// resident region on a miss.
    ///
    /// `Ok(None)` means the request is not applicable (empty request, or
    /// outside the probing window); an I/O failure is an error.
    pub(crate) fn acquire(
        &mut self,
        real_off: u64,
        len: u64,
    ) -> Result<Option<Vec<u8>>, ProbeError> {
        if self.window_size == 0 {
            return Err(ProbeError::InvalidWindow(
                "probing window is empty".to_owned(),
            ));
        }

        if len == 0 || self.window_offset + self.window_size < real_off + len {
            log::debug!("BufferPool::acquire request out of probing window, ignored");
            return Ok(None);
        }

        // try regions already resident in memory
        let found = self
            .buffers
            .iter()
            .position(|b| b.offset <= real_off && real_off + len <= b.offset + b.len);

        let index = match found {
            Some(index) => {
                let b = &self.buffers[index];
                log::debug!(
                    "BufferPool::acquire reuse region [offset={}, len={}] for [offset={}, len={}]",
                    b.offset,
                    b.len,
                    real_off,
                    len
                );
                index
            }
            None => {
                let buffer = if self.mmap_wanted {
                    self.mmap_buffer(real_off, len)?
                } else {
                    match self.read_buffer(real_off, len)? {
                        Some(buffer) => buffer,
                        None => return Ok(None),
                    }
                };

                self.buffers.push(buffer);
                self.buffers.len() - 1
            }
        };

        let buffer = &self.buffers[index];
        let start = (real_off - buffer.offset) as usize;

        Ok(Some(buffer.bytes()[start..start + len as usize].to_vec()))
    }

    fn page_align(&self, offset: u64) -> u64 {
        offset & !(self.mmap_granularity - 1)
    }

    fn mmap_buffer(&mut self, real_off: u64, len: u64) -> Result<ResidentBuffer, ProbeError> {
        if self.mmap_granularity == 0 {
            self.mmap_granularity = unsafe { libc::sysconf(libc::_SC_PAGESIZE) } as u64;
        }

        let window_end = self.window_offset + self.window_size;

        let (map_off, map_len) = if real_off == 0 || real_off + len < MMAP_BEGIN_SIZE {
            // begin of the device
            let map_len = MMAP_BEGIN_SIZE.min(window_end).max(real_off + len);
            (0, map_len)
        } else if window_end > MMAP_END_SIZE && real_off > window_end - MMAP_END_SIZE {
            // end of the device
            let map_off = self.page_align(window_end - MMAP_END_SIZE);
            (map_off, window_end - map_off)
        } else {
            // middle of the device
            let map_off = self.page_align(real_off);
            let min_len = real_off + len - map_off;
            let mut map_len = min_len.max(MMAP_MID_SIZE);

            if map_off + map_len > window_end {
                map_len = window_end - map_off;
            }
            (map_off, map_len)
        };

        debug_assert!(map_off <= real_off);
        debug_assert!(map_off + map_len >= real_off + len);

        let ptr = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                map_len as libc::size_t,
                libc::PROT_READ,
                libc::MAP_SHARED,
                self.file.as_raw_fd(),
                map_off as libc::off_t,
            )
        };

        if ptr == libc::MAP_FAILED {
            let err = io::Error::last_os_error();
            log::debug!("BufferPool::mmap_buffer mmap failed: {}", err);
            return Err(ProbeError::IoError(err));
        }

        log::debug!(
            "BufferPool::mmap_buffer mapped [offset={}, len={}]",
            map_off,
            map_len
        );

        Ok(ResidentBuffer {
            offset: map_off,
            len: map_len,
            data: BufferData::Mapped(ptr as *mut u8),
        })
    }

    fn read_buffer(
        &mut self,
        real_off: u64,
        len: u64,
    ) -> Result<Option<ResidentBuffer>, ProbeError> {
        let mut data = vec![0u8; len as usize];

        match self.file.read_exact_at(&mut data, real_off) {
            Ok(()) => {}
            // a short read inside the window means the descriptor does not
            // apply, not an I/O failure
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                log::debug!("BufferPool::read_buffer short read at offset {}", real_off);
                return Ok(None);
            }
            Err(e) => return Err(ProbeError::IoError(e)),
        }

        log::debug!(
            "BufferPool::read_buffer read [offset={}, len={}]",
            real_off,
            len
        );

        Ok(Some(ResidentBuffer {
            offset: real_off,
            len,
            data: BufferData::Heap(data),
        }))
    }

    #[cfg(test)]
    pub(crate) fn resident_count(&self) -> usize {
        self.buffers.len()
    }
}

#[cfg(test)]
#[allow(unused_imports)]
mod tests {
    use super::*;
    use pretty_assertions::{assert_eq, assert_ne};
    use std::io::Write;

    fn scratch_file(len: usize) -> (tempfile::TempDir, Arc<File>) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scratch.img");

        let mut file = File::create(&path).unwrap();
        let data: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
        file.write_all(&data).unwrap();

        (dir, Arc::new(File::open(&path).unwrap()))
    }

    #[test]
    fn buffer_pool_returns_the_requested_bytes() {
        let (_dir, file) = scratch_file(8192);
        let mut pool = BufferPool::new(file, true, 0, 8192);

        let bytes = pool.acquire(1024, 16).unwrap().unwrap();
        let expected: Vec<u8> = (1024..1040).map(|i| (i % 251) as u8).collect();

        assert_eq!(bytes, expected);
    }

    #[test]
    fn buffer_pool_reuses_a_resident_region_for_overlapping_requests() {
        let (_dir, file) = scratch_file(8192);
        let mut pool = BufferPool::new(file, true, 0, 8192);

        pool.acquire(0, 512).unwrap().unwrap();
        pool.acquire(256, 512).unwrap().unwrap();
        pool.acquire(0, 512).unwrap().unwrap();

        assert_eq!(pool.resident_count(), 1);
    }

    #[test]
    fn buffer_pool_rejects_an_empty_probing_window() {
        let (_dir, file) = scratch_file(512);
        let mut pool = BufferPool::new(file, true, 0, 0);

        assert!(pool.acquire(0, 16).is_err());
    }

    #[test]
    fn buffer_pool_ignores_an_empty_request() {
        let (_dir, file) = scratch_file(512);
        let mut pool = BufferPool::new(file, true, 0, 512);

        let actual = pool.acquire(0, 0).unwrap();

        assert_eq!(actual, None);
    }

    #[test]
    fn buffer_pool_ignores_a_request_beyond_the_window() {
        let (_dir, file) = scratch_file(4096);
        let mut pool = BufferPool::new(file, true, 0, 1024);

        let actual = pool.acquire(1020, 8).unwrap();

        assert_eq!(actual, None);
    }

    #[test]
    fn buffer_pool_reads_character_style_without_mapping() {
        let (_dir, file) = scratch_file(4096);
        let mut pool = BufferPool::new(file, false, 0, 4096);

        let bytes = pool.acquire(100, 8).unwrap().unwrap();
        let expected: Vec<u8> = (100..108).map(|i| (i % 251) as u8).collect();

        assert_eq!(bytes, expected);
    }
}
