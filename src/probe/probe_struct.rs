// Copyright (c) 2023 Nick Piaddo
// SPDX-License-Identifier: Apache-2.0 OR MIT

// From dependency library
use bitflags::bitflags;

// From standard library
use std::cell::RefCell;
use std::fs::File;
use std::fs::OpenOptions;
use std::os::unix::fs::FileExt;
use std::os::unix::fs::FileTypeExt;
use std::os::unix::fs::MetadataExt;
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::AsRawFd;
use std::path::Path;
use std::rc::Rc;
use std::sync::Arc;

// From this library
use crate::config::Config;
use crate::core::device::Usage;
use crate::core::device::Uuid;
use crate::core::utils::misc;
use crate::probe::chain_driver;
use crate::probe::BufferPool;
use crate::probe::Chain;
use crate::probe::ChainData;
use crate::probe::ChainKind;
use crate::probe::Filter;
use crate::probe::FsProperty;
use crate::probe::PartitionScanningOption;
use crate::probe::ProbeBuilder;
use crate::probe::ProbeError;
use crate::probe::ProbeOutcome;
use crate::probe::ProbeValue;
use crate::probe::PrbBuilder;
use crate::probe::ScanResult;
use crate::probe::Topology;

const BLKGETSIZE64: libc::c_ulong = 0x8008_1272;
const BLKSSZGET: libc::c_ulong = 0x1268;
const CDROM_GET_CAPABILITY: libc::c_ulong = 0x5331;

const DEFAULT_SECTOR_SIZE: u32 = 512;

// devices at most this big get the tiny treatment (floppies etc.)
const TINY_DEVICE_SIZE: u64 = 1440 * 1024;

bitflags! {
    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    pub(crate) struct ProbeFlags: u32 {
        /// The device file was opened by the library, not supplied by the caller.
        const PRIVATE_FD = 1 << 1;
        /// Window no larger than 1440 KiB on a non-character device.
        const TINY_DEV = 1 << 2;
        /// The whole-disk device answers the CDROM capability query.
        const CDROM_DEV = 1 << 3;
        /// All probing is suppressed (e.g. private LVM volumes).
        const NOSCAN_DEV = 1 << 4;
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum DeviceKind {
    Block,
    Character,
    Regular,
}

/// Region a previously-identified superblock is known to overwrite.
#[derive(Debug)]
struct Wiper {
    offset: u64,
    size: u64,
    chain: ChainKind,
}

/// Back-reference from a cloned probe to its parent's buffer pool.
#[derive(Debug)]
struct ParentLink {
    pool: Rc<RefCell<BufferPool>>,
    offset: u64,
    size: u64,
    devno: u64,
}

/// Low-level device probe.
///
/// A `Probe` owns a probing window over a block device, character device, or
/// regular file, and drives the three probing chains (`superblocks`,
/// `topology`, `partitions`) over it. See the [`probe`](crate::probe) module
/// overview.
#[derive(Debug)]
pub struct Probe {
    file: Arc<File>,
    read_write: bool,
    kind: DeviceKind,
    offset: u64,
    size: u64,
    devno: u64,
    disk_devno: u64,
    block_sector_size: u32,
    flags: ProbeFlags,
    /// Transient flags scoped to one probing pass. Unused bits are
    /// preserved so new scoped flags can be added.
    prob_flags: u32,
    chains: [Chain; 3],
    cur_chain: Option<ChainKind>,
    values: Vec<ProbeValue>,
    buffers: Rc<RefCell<BufferPool>>,
    wiper: Option<Wiper>,
    disk_probe: Option<Box<Probe>>,
    parent: Option<ParentLink>,
    config: Option<Arc<Config>>,
}

fn ioctl_u64(fd: libc::c_int, request: libc::c_ulong) -> std::io::Result<u64> {
    let mut value: u64 = 0;
    match unsafe { libc::ioctl(fd, request, &mut value) } {
        r if r < 0 => Err(std::io::Error::last_os_error()),
        _ => Ok(value),
    }
}

fn ioctl_c_int(fd: libc::c_int, request: libc::c_ulong) -> std::io::Result<libc::c_int> {
    let mut value: libc::c_int = 0;
    match unsafe { libc::ioctl(fd, request, &mut value) } {
        r if r < 0 => Err(std::io::Error::last_os_error()),
        _ => Ok(value),
    }
}

impl Probe {
    /// Creates a [`ProbeBuilder`] to configure and construct a new `Probe`
    /// instance.
    pub fn builder() -> ProbeBuilder {
        log::debug!("Probe::builder creating new `ProbeBuilder` instance");

        PrbBuilder::builder()
    }

    fn open_device(path: &Path, read_write: bool) -> Result<File, ProbeError> {
        OpenOptions::new()
            .read(true)
            .write(read_write)
            .custom_flags(libc::O_CLOEXEC)
            .open(path)
            .map_err(|e| {
                ProbeError::Creation(format!("failed to open device {:?}: {}", path, e))
            })
    }

    pub(crate) fn new_read_only<T>(path: T, segment: (u64, u64)) -> Result<Probe, ProbeError>
    where
        T: AsRef<Path>,
    {
        let file = Self::open_device(path.as_ref(), false)?;
        let mut probe = Self::with_device(file, segment, false)?;
        probe.flags |= ProbeFlags::PRIVATE_FD;

        Ok(probe)
    }

    pub(crate) fn new_read_write<T>(path: T, segment: (u64, u64)) -> Result<Probe, ProbeError>
    where
        T: AsRef<Path>,
    {
        let file = Self::open_device(path.as_ref(), true)?;
        let mut probe = Self::with_device(file, segment, true)?;
        probe.flags |= ProbeFlags::PRIVATE_FD;

        Ok(probe)
    }

    pub(crate) fn new_from_file(file: File, segment: (u64, u64)) -> Result<Probe, ProbeError> {
        Self::with_device(file, segment, false)
    }

    pub(crate) fn new_from_file_read_write(
        file: File,
        segment: (u64, u64),
    ) -> Result<Probe, ProbeError> {
        Self::with_device(file, segment, true)
    }

    /// Assigns the device to the probe: captures file mode and device
    /// numbers, discovers the device size, validates the probing window,
    /// and derives the tiny/cdrom/no-scan flags.
    fn with_device(
        file: File,
        (offset, size): (u64, u64),
        read_write: bool,
    ) -> Result<Probe, ProbeError> {
        let metadata = file
            .metadata()
            .map_err(|e| ProbeError::Creation(format!("failed to stat device: {}", e)))?;

        let file_type = metadata.file_type();
        let kind = if file_type.is_block_device() {
            DeviceKind::Block
        } else if file_type.is_char_device() {
            DeviceKind::Character
        } else if file_type.is_file() {
            DeviceKind::Regular
        } else {
            return Err(ProbeError::Creation(
                "device is not a block device, character device, or regular file".to_owned(),
            ));
        };

        let devno = match kind {
            DeviceKind::Block | DeviceKind::Character => metadata.rdev(),
            DeviceKind::Regular => 0,
        };

        let device_size = match kind {
            DeviceKind::Block => ioctl_u64(file.as_raw_fd(), BLKGETSIZE64)
                .map_err(|e| ProbeError::Creation(format!("failed to get device size: {}", e)))?,
            // UBI devices are char
            DeviceKind::Character => 1,
            DeviceKind::Regular => metadata.len(),
        };

        let size = match size {
            // only an offset specified, probe up to the device end
            0 if offset != 0 => device_size.saturating_sub(offset),
            0 => device_size,
            size => size,
        };

        if offset + size > device_size {
            return Err(ProbeError::InvalidWindow(format!(
                "area specified by offset ({}) and size ({}) is bigger than device ({})",
                offset, size, device_size
            )));
        }

        let mut flags = ProbeFlags::empty();

        if size <= TINY_DEVICE_SIZE && kind != DeviceKind::Character {
            flags |= ProbeFlags::TINY_DEV;
        }

        let mut disk_devno = 0;
        if kind == DeviceKind::Block {
            if misc::device_number_is_lvm_private(devno) {
                log::debug!("Probe::with_device ignoring private LVM device");
                flags |= ProbeFlags::NOSCAN_DEV;
            } else {
                disk_devno = misc::whole_disk_device_number(devno).unwrap_or(0);

                if !flags.contains(ProbeFlags::TINY_DEV)
                    && disk_devno == devno
                    && ioctl_c_int(file.as_raw_fd(), CDROM_GET_CAPABILITY).is_ok()
                {
                    flags |= ProbeFlags::CDROM_DEV;
                }
            }
        }

        // signature probing is random access, disable read-ahead
        unsafe {
            libc::posix_fadvise(file.as_raw_fd(), 0, 0, libc::POSIX_FADV_RANDOM);
        }

        let file = Arc::new(file);
        let buffers = BufferPool::new(
            Arc::clone(&file),
            kind != DeviceKind::Character,
            offset,
            size,
        );

        log::debug!(
            "Probe::with_device ready for low-probing, offset={}, size={}",
            offset,
            size
        );

        Ok(Self {
            file,
            read_write,
            kind,
            offset,
            size,
            devno,
            disk_devno,
            block_sector_size: 0,
            flags,
            prob_flags: 0,
            chains: [
                Chain::new(ChainKind::Superblocks),
                Chain::new(ChainKind::Topology),
                Chain::new(ChainKind::Partitions),
            ],
            cur_chain: None,
            values: Vec::new(),
            buffers: Rc::new(RefCell::new(buffers)),
            wiper: None,
            disk_probe: None,
            parent: None,
            config: None,
        })
    }

    /// Clones this probe. The clone shares the device handle, window and
    /// configuration, but starts with fresh chains, values and buffers; when
    /// its window lies within this probe's window, buffer requests are
    /// served from this probe's pool.
    pub fn clone_probe(&self) -> Probe {
        log::debug!("Probe::clone_probe allocating a probe clone");

        let buffers = BufferPool::new(
            Arc::clone(&self.file),
            self.kind != DeviceKind::Character,
            self.offset,
            self.size,
        );

        let mut clone = Probe {
            file: Arc::clone(&self.file),
            read_write: self.read_write,
            kind: self.kind,
            offset: self.offset,
            size: self.size,
            devno: self.devno,
            disk_devno: self.disk_devno,
            block_sector_size: self.block_sector_size,
            flags: self.flags & !ProbeFlags::PRIVATE_FD,
            prob_flags: 0,
            chains: [
                Chain::new(ChainKind::Superblocks),
                Chain::new(ChainKind::Topology),
                Chain::new(ChainKind::Partitions),
            ],
            cur_chain: None,
            values: Vec::new(),
            buffers: Rc::new(RefCell::new(buffers)),
            wiper: None,
            disk_probe: None,
            parent: Some(ParentLink {
                pool: Rc::clone(&self.buffers),
                offset: self.offset,
                size: self.size,
                devno: self.devno,
            }),
            config: None,
        };

        if let Some(config) = &self.config {
            // attaching the configuration re-installs the probe-off filter
            let _ = clone.set_config(Arc::clone(config));
        }

        clone
    }

    /// Attaches a [`Config`] to this probe. The configuration's `PROBE_OFF`
    /// names immediately install a NOT-IN type filter on the superblocks
    /// chain.
    pub fn set_config(&mut self, config: Arc<Config>) -> Result<(), ProbeError> {
        if !config.probe_off().is_empty() {
            self.filter_types(ChainKind::Superblocks, Filter::Out, config.probe_off())?;
        }
        self.config = Some(config);

        Ok(())
    }

    //------------------------------------------------------------------
    // Device properties
    //------------------------------------------------------------------

    /// Device number of the assigned device (0 for regular files).
    pub fn device_number(&self) -> u64 {
        self.devno
    }

    /// Device number of the whole disk containing the assigned device,
    /// queried lazily (0 for regular files).
    pub fn whole_disk_device_number(&mut self) -> u64 {
        if self.disk_devno == 0 && self.devno != 0 {
            self.disk_devno = misc::whole_disk_device_number(self.devno).unwrap_or(0);
        }

        self.disk_devno
    }

    /// Returns `true` when the assigned device is a whole disk, not a
    /// partition.
    pub fn is_whole_disk(&mut self) -> bool {
        let devno = self.devno;
        devno != 0 && self.whole_disk_device_number() == devno
    }

    /// Begin of the probing window, in bytes.
    pub fn device_offset(&self) -> u64 {
        self.offset
    }

    /// Size of the probing window, in bytes.
    pub fn device_size(&self) -> u64 {
        self.size
    }

    /// Size of the probing window, in 512-byte sectors.
    pub fn device_sectors(&self) -> u64 {
        self.size >> 9
    }

    /// Logical sector size of the device (`BLKSSZGET`, default 512),
    /// queried lazily.
    pub fn sector_size(&mut self) -> u32 {
        if self.block_sector_size != 0 {
            return self.block_sector_size;
        }

        self.block_sector_size = match self.kind {
            DeviceKind::Block => ioctl_c_int(self.file.as_raw_fd(), BLKSSZGET)
                .map(|v| v as u32)
                .unwrap_or(DEFAULT_SECTOR_SIZE),
            _ => DEFAULT_SECTOR_SIZE,
        };

        self.block_sector_size
    }

    /// Overrides the logical sector size used by probing functions.
    pub fn set_sector_size(&mut self, bytes_per_sector: u32) -> Result<(), ProbeError> {
        if bytes_per_sector == 0 {
            return Err(ProbeError::Config(
                "sector size can not be zero".to_owned(),
            ));
        }

        self.block_sector_size = bytes_per_sector;
        Ok(())
    }

    /// Small devices need a special care.
    pub fn is_tiny(&self) -> bool {
        self.flags.contains(ProbeFlags::TINY_DEV)
    }

    /// CDROMs may fail when probed for RAID (last sector problem).
    pub fn is_cdrom(&self) -> bool {
        self.flags.contains(ProbeFlags::CDROM_DEV)
    }

    pub(crate) fn is_block_device(&self) -> bool {
        self.kind == DeviceKind::Block
    }

    pub(crate) fn raw_fd(&self) -> libc::c_int {
        self.file.as_raw_fd()
    }

    /// Probe referring to the whole disk containing the assigned partition
    /// device, opened lazily. `None` when the device already is a whole
    /// disk, or a regular file.
    pub(crate) fn whole_disk_probe(&mut self) -> Option<&mut Probe> {
        if self.is_whole_disk() {
            return None;
        }

        let disk_devno = self.whole_disk_device_number();
        if disk_devno == 0 {
            return None;
        }

        if let Some(disk_probe) = &self.disk_probe {
            if disk_probe.devno != disk_devno {
                // disk prober for another disk, close it
                self.disk_probe = None;
            }
        }

        if self.disk_probe.is_none() {
            let path = misc::device_path_from_number(disk_devno)?;
            log::debug!("Probe::whole_disk_probe allocating a wholedisk probe");

            let mut probe = Self::new_read_only(path, (0, 0)).ok()?;
            if let Some(config) = &self.config {
                let _ = probe.set_config(Arc::clone(config));
            }
            self.disk_probe = Some(Box::new(probe));
        }

        self.disk_probe.as_deref_mut()
    }

    //------------------------------------------------------------------
    // Buffers
    //------------------------------------------------------------------

    /// Returns the `len` bytes at `off` within the probing window.
    ///
    /// `Ok(None)` means the request lies outside the window or is empty
    /// ("not applicable"); I/O failures are errors. A cloned probe whose
    /// window is enclosed by its parent's draws from the parent's pool.
    pub(crate) fn get_buffer(&mut self, off: u64, len: u64) -> Result<Option<Vec<u8>>, ProbeError> {
        if self.size == 0 {
            return Err(ProbeError::InvalidWindow(
                "probing window is empty".to_owned(),
            ));
        }

        let real_off = self.offset + off;

        if len == 0 || self.offset + self.size < real_off + len {
            log::debug!("Probe::get_buffer request out of probing area, ignored");
            return Ok(None);
        }

        if let Some(parent) = &self.parent {
            if parent.devno == self.devno
                && parent.offset <= self.offset
                && parent.offset + parent.size >= self.offset + self.size
            {
                // cloned prober pointing into the same area as the parent,
                // use the parent's buffers
                return parent.pool.borrow_mut().acquire(real_off, len);
            }
        }

        self.buffers.borrow_mut().acquire(real_off, len)
    }

    pub(crate) fn reset_buffers(&mut self) {
        self.buffers.borrow_mut().reset();
    }

    //------------------------------------------------------------------
    // Chains and filters
    //------------------------------------------------------------------

    pub(crate) fn chain(&self, kind: ChainKind) -> &Chain {
        &self.chains[kind.index()]
    }

    pub(crate) fn chain_mut(&mut self, kind: ChainKind) -> &mut Chain {
        &mut self.chains[kind.index()]
    }

    pub(crate) fn set_chain_data(&mut self, kind: ChainKind, data: ChainData) {
        self.chain_mut(kind).data = Some(data);
    }

    /// Activates file system search functions.
    pub fn enable_chain_superblocks(&mut self) -> Result<(), ProbeError> {
        self.chain_mut(ChainKind::Superblocks).enabled = true;
        Ok(())
    }

    /// Deactivates file system search functions.
    pub fn disable_chain_superblocks(&mut self) -> Result<(), ProbeError> {
        self.chain_mut(ChainKind::Superblocks).enabled = false;
        Ok(())
    }

    /// Activates partition search functions.
    pub fn enable_chain_partitions(&mut self) -> Result<(), ProbeError> {
        self.chain_mut(ChainKind::Partitions).enabled = true;
        Ok(())
    }

    /// Deactivates partition search functions.
    pub fn disable_chain_partitions(&mut self) -> Result<(), ProbeError> {
        self.chain_mut(ChainKind::Partitions).enabled = false;
        Ok(())
    }

    /// Activates device topology search functions.
    pub fn enable_chain_topology(&mut self) -> Result<(), ProbeError> {
        self.chain_mut(ChainKind::Topology).enabled = true;
        Ok(())
    }

    /// Deactivates device topology search functions.
    pub fn disable_chain_topology(&mut self) -> Result<(), ProbeError> {
        self.chain_mut(ChainKind::Topology).enabled = false;
        Ok(())
    }

    /// Sets the list of file system properties to collect.
    pub fn collect_fs_properties(&mut self, properties: &[FsProperty]) -> Result<(), ProbeError> {
        let mut flags = 0u32;
        for property in properties {
            let bits: u32 = (*property).into();
            flags |= bits;
        }

        self.chain_mut(ChainKind::Superblocks).flags = flags;
        Ok(())
    }

    /// Sets optional scanning criteria for partition search functions.
    pub fn set_partitions_scanning_options(
        &mut self,
        options: &[PartitionScanningOption],
    ) -> Result<(), ProbeError> {
        let mut flags = 0u32;
        for option in options {
            let bits: u32 = (*option).into();
            flags |= bits;
        }

        self.chain_mut(ChainKind::Partitions).flags = flags;
        Ok(())
    }

    pub(crate) fn sb_flag(&self, property: FsProperty) -> bool {
        let bits: u32 = property.into();
        self.chain(ChainKind::Superblocks).flags & bits != 0
    }

    pub(crate) fn pt_flag(&self, option: PartitionScanningOption) -> bool {
        let bits: u32 = option.into();
        self.chain(ChainKind::Partitions).flags & bits != 0
    }

    /// Returns the chain's properly initialized filter. Touching the filter
    /// always resets the probing position; probing restarts from scratch.
    fn prepare_filter(&mut self, kind: ChainKind, create: bool) -> Option<&mut Vec<bool>> {
        self.chain_mut(kind).reset_position();
        self.cur_chain = None;

        let driver = chain_driver::driver_for(kind);
        if !driver.has_filter() {
            return None;
        }

        let n = driver.id_infos().len();
        let chain = self.chain_mut(kind);

        if chain.filter.is_none() {
            if !create {
                return None;
            }
            chain.filter = Some(vec![false; n]);
        } else if let Some(filter) = &mut chain.filter {
            // a filter is always handed out zeroed
            filter.iter_mut().for_each(|b| *b = false);
        }

        chain.filter.as_mut()
    }

    pub(crate) fn filter_types<T>(
        &mut self,
        kind: ChainKind,
        flag: Filter,
        names: &[T],
    ) -> Result<(), ProbeError>
    where
        T: AsRef<str>,
    {
        let infos = chain_driver::driver_for(kind).id_infos();

        let filter = self.prepare_filter(kind, true).ok_or_else(|| {
            ProbeError::Config(format!("chain {} does not support filtering", kind))
        })?;

        for (i, id) in infos.iter().enumerate() {
            let has = names.iter().any(|name| name.as_ref() == id.name);
            match flag {
                Filter::In if !has => filter[i] = true,
                Filter::Out if has => filter[i] = true,
                _ => {}
            }
        }

        log::debug!("Probe::filter_types {}: new probing type-filter initialized", kind);
        Ok(())
    }

    fn filter_usages(
        &mut self,
        kind: ChainKind,
        flag: Filter,
        usages: &[Usage],
    ) -> Result<(), ProbeError> {
        let infos = chain_driver::driver_for(kind).id_infos();

        let filter = self.prepare_filter(kind, true).ok_or_else(|| {
            ProbeError::Config(format!("chain {} does not support filtering", kind))
        })?;

        for (i, id) in infos.iter().enumerate() {
            let has = usages.contains(&id.usage);
            match flag {
                Filter::In if !has => filter[i] = true,
                Filter::Out if has => filter[i] = true,
                _ => {}
            }
        }

        Ok(())
    }

    fn invert_filter(&mut self, kind: ChainKind) -> Result<(), ProbeError> {
        self.chain_mut(kind).reset_position();
        self.cur_chain = None;

        let chain = self.chain_mut(kind);
        match &mut chain.filter {
            Some(filter) => {
                filter.iter_mut().for_each(|b| *b = !*b);
                log::debug!("Probe::invert_filter probing filter inverted");
                Ok(())
            }
            None => Err(ProbeError::Config(format!(
                "chain {} has no filter to invert",
                kind
            ))),
        }
    }

    fn reset_filter(&mut self, kind: ChainKind) -> Result<(), ProbeError> {
        let _ = self.prepare_filter(kind, false);
        Ok(())
    }

    /// Specifies which file systems to search for/exclude when scanning.
    pub fn scan_superblocks_for_file_systems<T>(
        &mut self,
        criterion: Filter,
        fs_types: &[T],
    ) -> Result<(), ProbeError>
    where
        T: AsRef<str>,
    {
        self.filter_types(ChainKind::Superblocks, criterion, fs_types)
    }

    /// Limits file system scanning to superblocks with particular
    /// [`Usage`] flags.
    pub fn scan_superblocks_with_usage_flags(
        &mut self,
        criterion: Filter,
        usages: &[Usage],
    ) -> Result<(), ProbeError> {
        self.filter_usages(ChainKind::Superblocks, criterion, usages)
    }

    /// Specifies which partition table types to search for/exclude when
    /// scanning.
    pub fn scan_partitions_for_partition_tables<T>(
        &mut self,
        criterion: Filter,
        pt_types: &[T],
    ) -> Result<(), ProbeError>
    where
        T: AsRef<str>,
    {
        self.filter_types(ChainKind::Partitions, criterion, pt_types)
    }

    /// Inverts the superblocks chain filter.
    pub fn invert_superblocks_filter(&mut self) -> Result<(), ProbeError> {
        self.invert_filter(ChainKind::Superblocks)
    }

    /// Removes the superblocks chain filter.
    pub fn reset_superblocks_filter(&mut self) -> Result<(), ProbeError> {
        self.reset_filter(ChainKind::Superblocks)
    }

    /// Inverts the partitions chain filter.
    pub fn invert_partitions_filter(&mut self) -> Result<(), ProbeError> {
        self.invert_filter(ChainKind::Partitions)
    }

    /// Removes the partitions chain filter.
    pub fn reset_partitions_filter(&mut self) -> Result<(), ProbeError> {
        self.reset_filter(ChainKind::Partitions)
    }

    //------------------------------------------------------------------
    // Values
    //------------------------------------------------------------------

    /// Number of values in the probing result.
    pub fn numof_values(&self) -> usize {
        self.values.len()
    }

    /// Returns the value at `index`, in emission order.
    pub fn get_value(&self, index: usize) -> Option<&ProbeValue> {
        self.values.get(index)
    }

    /// Returns the value named `name`.
    pub fn lookup_value(&self, name: &str) -> Option<&ProbeValue> {
        self.values.iter().find(|v| v.name() == name)
    }

    /// Returns `true` if `name` exists in the probing result.
    pub fn has_value(&self, name: &str) -> bool {
        self.lookup_value(name).is_some()
    }

    /// Iterates over the probing result in emission order.
    pub fn values(&self) -> impl Iterator<Item = &ProbeValue> {
        self.values.iter()
    }

    pub(crate) fn set_value(&mut self, name: &'static str, data: Vec<u8>) -> Result<(), ProbeError> {
        let chain = self
            .cur_chain
            .ok_or_else(|| ProbeError::Search("no chain is being probed".to_owned()))?;

        if self.chain(chain).binary {
            // binary-result requests bypass tag emission
            return Ok(());
        }

        log::debug!("Probe::set_value assigning {} [{}]", name, chain);
        self.values.push(ProbeValue::new(name, data, chain));

        Ok(())
    }

    pub(crate) fn set_value_str(&mut self, name: &'static str, value: &str) -> Result<(), ProbeError> {
        self.set_value(name, value.as_bytes().to_vec())
    }

    pub(crate) fn set_value_u64(&mut self, name: &'static str, value: u64) -> Result<(), ProbeError> {
        self.set_value(name, value.to_string().into_bytes())
    }

    pub(crate) fn chain_reset_values(&mut self, kind: ChainKind) {
        log::debug!("Probe::chain_reset_values resetting {} values", kind);
        self.values.retain(|v| v.chain != kind);
    }

    pub(crate) fn take_chain_values(&mut self, kind: ChainKind) -> Vec<ProbeValue> {
        let mut taken = Vec::new();
        let mut kept = Vec::new();

        for value in self.values.drain(..) {
            if value.chain == kind {
                taken.push(value);
            } else {
                kept.push(value);
            }
        }

        self.values = kept;
        taken
    }

    pub(crate) fn append_values(&mut self, values: Vec<ProbeValue>) {
        self.values.extend(values);
    }

    fn reset_values(&mut self) {
        self.values.clear();
    }

    //------------------------------------------------------------------
    // Gated emission helpers used by decoders
    //------------------------------------------------------------------

    pub(crate) fn set_fs_type(&mut self, fs_type: &str) -> Result<(), ProbeError> {
        if self.sb_flag(FsProperty::Type) {
            self.set_value_str("TYPE", fs_type)?;
        }
        Ok(())
    }

    pub(crate) fn set_sec_type(&mut self, sec_type: &str) -> Result<(), ProbeError> {
        if self.sb_flag(FsProperty::SecondType) {
            self.set_value_str("SEC_TYPE", sec_type)?;
        }
        Ok(())
    }

    pub(crate) fn set_usage(&mut self, usage: Usage) -> Result<(), ProbeError> {
        if self.sb_flag(FsProperty::Usage) {
            self.set_value_str("USAGE", usage.as_str())?;
        }
        Ok(())
    }

    pub(crate) fn set_label(&mut self, label: &[u8]) -> Result<(), ProbeError> {
        self.set_label_named("LABEL", label)
    }

    pub(crate) fn set_label_named(
        &mut self,
        name: &'static str,
        label: &[u8],
    ) -> Result<(), ProbeError> {
        if self.sb_flag(FsProperty::Label) {
            // labels live in fixed-size fields, padded with NULs or spaces
            let end = label
                .iter()
                .rposition(|&b| b != 0 && b != b' ')
                .map(|p| p + 1)
                .unwrap_or(0);

            if end > 0 {
                self.set_value(name, label[..end].to_vec())?;
            }
        }
        Ok(())
    }

    pub(crate) fn set_uuid(&mut self, uuid: &[u8; 16]) -> Result<(), ProbeError> {
        self.set_uuid_named("UUID", uuid)
    }

    pub(crate) fn set_uuid_named(
        &mut self,
        name: &'static str,
        uuid: &[u8; 16],
    ) -> Result<(), ProbeError> {
        if self.sb_flag(FsProperty::Uuid) && !Uuid::is_empty_uuid(uuid) {
            self.set_value_str(name, Uuid::from_bytes(uuid).as_str())?;
        }
        Ok(())
    }

    pub(crate) fn set_uuid_str(&mut self, name: &'static str, uuid: &str) -> Result<(), ProbeError> {
        if self.sb_flag(FsProperty::Uuid) && !uuid.is_empty() {
            self.set_value_str(name, uuid)?;
        }
        Ok(())
    }

    pub(crate) fn set_version(&mut self, version: &str) -> Result<(), ProbeError> {
        if self.sb_flag(FsProperty::Version) {
            self.set_value_str("VERSION", version)?;
        }
        Ok(())
    }

    pub(crate) fn set_block_size(&mut self, block_size: u64) -> Result<(), ProbeError> {
        self.set_value_u64("BLOCK_SIZE", block_size)
    }

    pub(crate) fn set_fs_size(&mut self, fs_size: u64) -> Result<(), ProbeError> {
        if self.sb_flag(FsProperty::FsInfo) {
            self.set_value_u64("FSSIZE", fs_size)?;
        }
        Ok(())
    }

    /// Emits the magic string and its offset for the current chain, when
    /// requested by the chain flags.
    pub(crate) fn set_magic(&mut self, offset: u64, magic: &[u8]) -> Result<(), ProbeError> {
        let Some(kind) = self.cur_chain else {
            return Ok(());
        };

        if magic.is_empty() || self.chain(kind).binary {
            return Ok(());
        }

        match kind {
            ChainKind::Superblocks if self.sb_flag(FsProperty::Magic) => {
                self.set_value("SBMAGIC", magic.to_vec())?;
                self.set_value_u64("SBMAGIC_OFFSET", offset)?;
            }
            ChainKind::Partitions if self.pt_flag(PartitionScanningOption::Magic) => {
                self.set_value("PTMAGIC", magic.to_vec())?;
                self.set_value_u64("PTMAGIC_OFFSET", offset)?;
            }
            _ => {}
        }

        Ok(())
    }

    /// Checks a decoder checksum. Mismatches are rejected unless the
    /// bad-checksum flag upgrades them to acceptance with a `SBBADCSUM=1`
    /// tag attached.
    pub(crate) fn verify_csum(&mut self, csum: u64, expected: u64) -> Result<bool, ProbeError> {
        if csum == expected {
            return Ok(true);
        }

        log::debug!(
            "Probe::verify_csum incorrect checksum, got {:#x}, expected {:#x}",
            csum,
            expected
        );

        if self.cur_chain == Some(ChainKind::Superblocks) && self.sb_flag(FsProperty::BadChecksum) {
            self.set_value_str("SBBADCSUM", "1")?;
            return Ok(true);
        }

        Ok(false)
    }

    //------------------------------------------------------------------
    // Wiper heuristic
    //------------------------------------------------------------------

    /// Records the region the just-detected superblock is known to wipe
    /// (e.g. `pvcreate` zeroes 8 KiB at the begin of the device). A zero
    /// `size` clears the record. Only one wipe is tracked per probe.
    pub(crate) fn set_wiper(&mut self, offset: u64, size: u64) {
        if size == 0 {
            self.wiper = None;
            return;
        }

        let Some(kind) = self.cur_chain else {
            return;
        };
        if self.chain(kind).idx < 0 {
            return;
        }

        log::debug!(
            "Probe::set_wiper wiper set to {} offset={} size={}",
            kind,
            offset,
            size
        );

        self.wiper = Some(Wiper {
            offset,
            size,
            chain: kind,
        });
    }

    /// Returns the chain that recorded a wipe covering the `(offset, size)`
    /// region.
    fn is_wiped(&self, offset: u64, size: u64) -> Option<ChainKind> {
        match &self.wiper {
            Some(w) if size != 0 && w.offset <= offset && offset + size <= w.offset + w.size => {
                Some(w.chain)
            }
            _ => None,
        }
    }

    /// Consults the wiper before a later-chain decoder emits a signature:
    /// a signature found inside the recorded wiped region was overwritten
    /// by the formatter of the earlier superblock, so it is stale. Returns
    /// `true` when the caller must discard its match; the wiper record is
    /// cleared.
    pub(crate) fn use_wiper(&mut self, offset: u64, size: u64) -> bool {
        if let Some(chain) = self.is_wiped(offset, size) {
            log::debug!(
                "Probe::use_wiper stale signature inside area wiped by {}, ignored",
                chain
            );
            self.wiper = None;
            return true;
        }

        false
    }

    //------------------------------------------------------------------
    // Pass orchestration
    //------------------------------------------------------------------

    fn probe_start(&mut self) {
        log::debug!("Probe::probe_start start probe");
        self.cur_chain = None;
        self.prob_flags = 0;
        self.wiper = None;
    }

    fn probe_end(&mut self) {
        log::debug!("Probe::probe_end end probe");
        self.cur_chain = None;
        self.prob_flags = 0;
        self.wiper = None;
    }

    /// Calls probing functions in all enabled chains, storing the result
    /// from only one probing function per call. Call in a loop to collect
    /// results from all probing functions in all chains; the collected
    /// values accumulate until [`Probe::reset_probe`].
    pub fn do_probe(&mut self) -> Result<ScanResult, ProbeError> {
        if self.flags.contains(ProbeFlags::NOSCAN_DEV) {
            return Ok(ScanResult::NoProperties);
        }

        loop {
            let kind = match self.cur_chain {
                None => {
                    self.probe_start();
                    self.cur_chain = Some(ChainKind::Superblocks);
                    ChainKind::Superblocks
                }
                Some(kind) => {
                    let (enabled, idx) = {
                        let chain = self.chain(kind);
                        (chain.enabled, chain.idx)
                    };
                    let nidinfos = chain_driver::driver_for(kind).id_infos().len() as i32;

                    // move to the next chain only when the current chain is
                    // disabled, at its end, or bailed out right at the start
                    if !enabled || idx + 1 == nidinfos || idx == -1 {
                        match ChainKind::from_index(kind.index() + 1) {
                            Some(next) => {
                                self.cur_chain = Some(next);
                                next
                            }
                            None => {
                                // all chains already probed
                                self.probe_end();
                                return Ok(ScanResult::NoProperties);
                            }
                        }
                    } else {
                        kind
                    }
                }
            };

            self.chain_mut(kind).binary = false;

            log::debug!(
                "Probe::do_probe chain probe {} {} (idx={})",
                kind,
                if self.chain(kind).enabled {
                    "ENABLED"
                } else {
                    "DISABLED"
                },
                self.chain(kind).idx
            );

            if !self.chain(kind).enabled {
                continue;
            }

            match chain_driver::driver_for(kind).probe(self)? {
                ProbeOutcome::Found => return Ok(ScanResult::FoundProperties),
                ProbeOutcome::NothingDetected => continue,
            }
        }
    }

    /// Gathers probing results from all enabled chains and checks for
    /// ambivalent results (e.g. more file systems on the device).
    pub fn do_safeprobe(&mut self) -> Result<ScanResult, ProbeError> {
        if self.flags.contains(ProbeFlags::NOSCAN_DEV) {
            return Ok(ScanResult::NoProperties);
        }

        self.probe_start();
        self.reset_values();

        let mut count = 0;
        let mut ambivalent = false;

        for kind in enum_iterator::all::<ChainKind>() {
            self.cur_chain = Some(kind);
            self.chain_mut(kind).binary = false;

            log::debug!(
                "Probe::do_safeprobe chain safeprobe {} {}",
                kind,
                if self.chain(kind).enabled {
                    "ENABLED"
                } else {
                    "DISABLED"
                }
            );

            if !self.chain(kind).enabled {
                continue;
            }

            self.chain_mut(kind).reset_position();

            let rc = chain_driver::driver_for(kind).safeprobe(self);

            self.chain_mut(kind).reset_position();

            match rc {
                Err(e) => {
                    self.probe_end();
                    return Err(e);
                }
                Ok(chain_driver::SafeOutcome::Ambivalent) => {
                    ambivalent = true;
                    break;
                }
                Ok(chain_driver::SafeOutcome::Found) => count += 1,
                Ok(chain_driver::SafeOutcome::NothingDetected) => {}
            }
        }

        self.probe_end();

        if ambivalent {
            Ok(ScanResult::ConflictingValues)
        } else if count > 0 {
            Ok(ScanResult::FoundProperties)
        } else {
            Ok(ScanResult::NoProperties)
        }
    }

    /// Gathers probing results from all enabled chains, without checking
    /// for collisions between them.
    pub fn do_fullprobe(&mut self) -> Result<ScanResult, ProbeError> {
        if self.flags.contains(ProbeFlags::NOSCAN_DEV) {
            return Ok(ScanResult::NoProperties);
        }

        self.probe_start();
        self.reset_values();

        let mut count = 0;

        for kind in enum_iterator::all::<ChainKind>() {
            self.cur_chain = Some(kind);
            self.chain_mut(kind).binary = false;

            log::debug!(
                "Probe::do_fullprobe chain fullprobe {} {}",
                kind,
                if self.chain(kind).enabled {
                    "ENABLED"
                } else {
                    "DISABLED"
                }
            );

            if !self.chain(kind).enabled {
                continue;
            }

            self.chain_mut(kind).reset_position();

            let rc = chain_driver::driver_for(kind).probe(self);

            self.chain_mut(kind).reset_position();

            match rc {
                Err(e) => {
                    self.probe_end();
                    return Err(e);
                }
                Ok(ProbeOutcome::Found) => count += 1,
                Ok(ProbeOutcome::NothingDetected) => {}
            }
        }

        self.probe_end();

        if count > 0 {
            Ok(ScanResult::FoundProperties)
        } else {
            Ok(ScanResult::NoProperties)
        }
    }

    /// Erases the signature detected by the last probing step by writing
    /// zeros over its magic string, then moves the prober one step back so
    /// the next [`Probe::do_probe`] re-examines the same slot (needed for
    /// backup superblocks). In dry-run mode the device is left untouched.
    pub fn do_wipe(&mut self, dryrun: bool) -> Result<(), ProbeError> {
        let kind = self
            .cur_chain
            .ok_or_else(|| ProbeError::Search("no chain is being probed".to_owned()))?;

        let (offset_name, magic_name) = match kind {
            ChainKind::Superblocks => ("SBMAGIC_OFFSET", "SBMAGIC"),
            ChainKind::Partitions => ("PTMAGIC_OFFSET", "PTMAGIC"),
            _ => return Ok(()),
        };

        let offset: u64 = match self
            .lookup_value(offset_name)
            .and_then(|v| v.as_str())
            .and_then(|s| s.parse().ok())
        {
            Some(offset) => offset,
            None => return Ok(()),
        };

        let len = match self.lookup_value(magic_name) {
            Some(magic) => magic.as_bytes().len(),
            None => return Ok(()),
        };

        if len == 0 {
            return Ok(());
        }

        log::debug!(
            "Probe::do_wipe [offset={:#x} ({}), len={}, chain={}, dryrun={}]",
            offset,
            offset,
            len,
            kind,
            dryrun
        );

        if dryrun {
            return Ok(());
        }

        if !self.read_write {
            return Err(ProbeError::IoWrite(
                "can not wipe a signature on a read-only device".to_owned(),
            ));
        }

        let zeros = vec![0u8; len];
        self.file
            .write_all_at(&zeros, self.offset + offset)
            .map_err(|e| ProbeError::IoWrite(format!("failed to wipe signature: {}", e)))?;
        self.file
            .sync_all()
            .map_err(|e| ProbeError::IoWrite(format!("failed to sync device: {}", e)))?;

        self.step_back()
    }

    /// Moves the probing pointer one step back, so the previously used
    /// probing function is called again by the next [`Probe::do_probe`].
    /// Also invalidates resident buffers: signatures may have just been
    /// erased.
    pub fn step_back(&mut self) -> Result<(), ProbeError> {
        let kind = self
            .cur_chain
            .ok_or_else(|| ProbeError::Search("no chain is being probed".to_owned()))?;

        self.reset_buffers();

        // the stepped-back result describes content that may just have been
        // modified, drop it
        self.chain_reset_values(kind);

        {
            let chain = self.chain_mut(kind);
            if chain.idx >= 0 {
                chain.idx -= 1;
                log::debug!(
                    "Probe::step_back moving {} chain index to {}",
                    kind,
                    chain.idx
                );
            }
        }

        if self.chain(kind).idx == -1 {
            // do_probe() moves to the next chain when the index of the
            // current chain is -1, so retreat to the previous chain
            self.cur_chain = match kind.index() {
                0 => None,
                i => ChainKind::from_index(i - 1),
            };
            log::debug!("Probe::step_back moving to previous chain");
        }

        Ok(())
    }

    /// Zeroizes probing results and resets the current probing position.
    /// Keeps the assigned device, probing filters and resident buffers.
    pub fn reset_probe(&mut self) {
        self.reset_values();
        self.wiper = None;
        self.cur_chain = None;

        for chain in &mut self.chains {
            chain.reset_position();
        }
    }

    /// Collects device topology information through the binary interface,
    /// independently of the current probing status.
    pub fn topology(&mut self) -> Result<Option<Topology>, ProbeError> {
        let org_chain = self.cur_chain;
        let org_prob_flags = self.prob_flags;

        self.cur_chain = Some(ChainKind::Topology);
        self.prob_flags = 0;

        {
            let chain = self.chain_mut(ChainKind::Topology);
            chain.binary = true;
            chain.reset_position();
        }

        let rc = chain_driver::driver_for(ChainKind::Topology).probe(self);

        {
            let chain = self.chain_mut(ChainKind::Topology);
            chain.binary = false;
            chain.reset_position();
        }

        self.cur_chain = org_chain;
        self.prob_flags = org_prob_flags;

        match rc? {
            ProbeOutcome::Found => match self.chain(ChainKind::Topology).data {
                Some(ChainData::Topology(topology)) => Ok(Some(topology)),
                None => Ok(None),
            },
            ProbeOutcome::NothingDetected => Ok(None),
        }
    }
}
