// Copyright (c) 2023 Nick Piaddo
// SPDX-License-Identifier: Apache-2.0 OR MIT

// From dependency library

// From standard library
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

// From this library
use crate::cache::CacheError;
use crate::cache::Device;
use crate::config::{self, Config};
use crate::core::device::Tag;
use crate::core::utils::misc;

/// In-memory list of known block devices, paired with the location of the
/// persisted tag cache.
///
/// The cache file location is resolved in order from the `BLKID_FILE`
/// environment variable, the configuration's `CACHE_FILE` entry, then the
/// built-in default (`/run/blkid/blkid.tab` when `/run/blkid` exists,
/// `/etc/blkid.tab` otherwise).
#[derive(Debug)]
pub struct Cache {
    filename: PathBuf,
    devices: Vec<Device>,
    config: Option<Arc<Config>>,
}

impl Cache {
    /// Creates a `Cache` using the default cache-file location.
    pub fn new() -> Result<Cache, CacheError> {
        let config = Arc::new(Config::load()?);

        Ok(Self {
            filename: Self::resolve_filename(Some(&config)),
            devices: Vec::new(),
            config: Some(config),
        })
    }

    /// Creates a `Cache` reading/writing the cache file at `path`.
    pub fn with_cache_file<T>(path: T) -> Cache
    where
        T: Into<PathBuf>,
    {
        Self {
            filename: path.into(),
            devices: Vec::new(),
            config: None,
        }
    }

    /// Creates a `Cache` reusing an already loaded [`Config`].
    pub fn for_config(config: Arc<Config>) -> Cache {
        Self {
            filename: Self::resolve_filename(Some(&config)),
            devices: Vec::new(),
            config: Some(config),
        }
    }

    fn resolve_filename(config: Option<&Arc<Config>>) -> PathBuf {
        if let Some(filename) = misc::safe_getenv("BLKID_FILE") {
            return PathBuf::from(filename);
        }

        match config {
            Some(config) => config.cache_file().to_path_buf(),
            None => config::default_cache_file(),
        }
    }

    /// Location of the persisted tag cache.
    pub fn filename(&self) -> &Path {
        &self.filename
    }

    /// The configuration this cache was created with, if any.
    pub fn config(&self) -> Option<&Arc<Config>> {
        self.config.as_ref()
    }

    /// Number of devices in the cache.
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    /// Returns `true` when the cache holds no device.
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Iterates over the cached devices, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Device> {
        self.devices.iter()
    }

    /// Adds a device entry, replacing a previous entry with the same name.
    pub fn add_device(&mut self, device: Device) {
        log::debug!("Cache::add_device adding entry {:?}", device.name());

        self.devices.retain(|d| d.name() != device.name());
        self.devices.push(device);
    }

    /// Returns the cached device named `name`.
    pub fn lookup_device_by_name<T>(&self, name: T) -> Option<&Device>
    where
        T: AsRef<Path>,
    {
        let name = name.as_ref();
        self.devices.iter().find(|d| d.name() == name)
    }

    /// Returns the first cached device carrying `tag`.
    pub fn find_device_with_tag(&self, tag: &Tag) -> Option<&Device> {
        self.devices.iter().find(|d| d.has_tag(tag))
    }

    /// Removes garbage (non-existing devices) from the cache. Returns the
    /// number of removed entries.
    pub fn garbage_collect(&mut self) -> usize {
        let before = self.devices.len();

        self.devices.retain(|d| {
            let exists = d.name().exists();
            if !exists {
                log::debug!("Cache::garbage_collect freeing {:?}", d.name());
            }
            exists
        });

        before - self.devices.len()
    }
}

#[cfg(test)]
#[allow(unused_imports)]
mod tests {
    use super::*;
    use crate::core::device::TagName;
    use pretty_assertions::{assert_eq, assert_ne};

    #[test]
    fn cache_finds_a_device_by_tag() {
        let mut cache = Cache::with_cache_file("/tmp/blkid.tab");

        let mut device = Device::new("/dev/vda1", 0);
        device.add_tag(Tag::new(TagName::Label, "rootfs"));
        cache.add_device(device);

        let tag = Tag::new(TagName::Label, "rootfs");
        let found = cache.find_device_with_tag(&tag).unwrap();

        assert_eq!(found.name(), Path::new("/dev/vda1"));
    }

    #[test]
    fn cache_garbage_collects_vanished_devices() {
        let mut cache = Cache::with_cache_file("/tmp/blkid.tab");
        cache.add_device(Device::new("/nonexistent/device", 0));

        let removed = cache.garbage_collect();

        assert_eq!(removed, 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn cache_replaces_an_entry_with_the_same_name() {
        let mut cache = Cache::with_cache_file("/tmp/blkid.tab");
        cache.add_device(Device::new("/dev/vda1", 1));
        cache.add_device(Device::new("/dev/vda1", 2));

        assert_eq!(cache.len(), 1);
    }
}
