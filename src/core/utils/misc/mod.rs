// Copyright (c) 2023 Nick Piaddo
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Miscellaneous helper functions (device numbers, `sysfs` queries, environment).

// From dependency library

// From standard library
use std::ffi::OsString;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

// From this library

/// Reads an environment variable, unless the program runs in an unsafe
/// environment (i.e. with set-uid or set-gid privileges), in which case the
/// variable is ignored.
pub(crate) fn safe_getenv(name: &str) -> Option<OsString> {
    let insecure = unsafe {
        libc::getuid() != libc::geteuid() || libc::getgid() != libc::getegid()
    };

    if insecure {
        log::debug!("misc::safe_getenv ignoring {:?} in unsafe environment", name);
        return None;
    }

    std::env::var_os(name)
}

fn sysfs_block_dir(device_number: u64) -> PathBuf {
    let major = unsafe { libc::major(device_number) };
    let minor = unsafe { libc::minor(device_number) };

    PathBuf::from(format!("/sys/dev/block/{}:{}", major, minor))
}

/// Returns the pathname to the block device with a given device number.
pub fn device_path_from_number(device_number: u64) -> Option<PathBuf> {
    let link = sysfs_block_dir(device_number);
    let resolved = fs::canonicalize(&link).ok()?;
    let name = resolved.file_name()?;

    let path = PathBuf::from("/dev").join(name);
    log::debug!(
        "misc::device_path_from_number found device path {:?} from device number {:?}",
        path,
        device_number
    );

    path.exists().then_some(path)
}

/// Returns the device number of the whole disk containing the device
/// `device_number` refers to. For a whole disk device, this is the device
/// number itself.
pub fn whole_disk_device_number(device_number: u64) -> Option<u64> {
    let dir = sysfs_block_dir(device_number);

    // a whole disk has no `partition` attribute
    let dir = if dir.join("partition").exists() {
        fs::canonicalize(&dir).ok()?.parent()?.to_path_buf()
    } else {
        dir
    };

    let dev = fs::read_to_string(dir.join("dev")).ok()?;
    let (major, minor) = dev.trim().split_once(':')?;
    let major: u64 = major.parse().ok()?;
    let minor: u64 = minor.parse().ok()?;

    Some(unsafe { libc::makedev(major as _, minor as _) })
}

/// Returns the first sector of a partition device on its whole disk, from
/// the `sysfs` `start` attribute. `None` for whole disks and regular files.
pub fn partition_start_sector(device_number: u64) -> Option<u64> {
    let start = fs::read_to_string(sysfs_block_dir(device_number).join("start")).ok()?;

    start.trim().parse().ok()
}

/// Returns `true` when the loop device at `loop_path` is backed by the file
/// `backing`, at `offset` when one is given.
pub fn loop_is_backed_by(loop_path: &Path, backing: &Path, offset: Option<u64>) -> bool {
    let Some(name) = loop_path.file_name() else {
        return false;
    };

    let loop_dir = Path::new("/sys/block").join(name).join("loop");

    let backed = fs::read_to_string(loop_dir.join("backing_file"))
        .map(|f| Path::new(f.trim()) == backing)
        .unwrap_or(false);

    if !backed {
        return false;
    }

    match offset {
        Some(offset) => fs::read_to_string(loop_dir.join("offset"))
            .ok()
            .and_then(|o| o.trim().parse::<u64>().ok())
            .map(|o| o == offset)
            .unwrap_or(false),
        None => true,
    }
}

/// Returns `true` when the device is a private device-mapper volume used
/// internally by LVM (e.g. `pvmove`, snapshot or raid-image subvolumes);
/// such devices are not supposed to be scanned.
pub fn device_number_is_lvm_private(device_number: u64) -> bool {
    let uuid_path = sysfs_block_dir(device_number).join("dm/uuid");

    match fs::read_to_string(uuid_path) {
        Ok(uuid) => {
            let uuid = uuid.trim();
            uuid.starts_with("LVM-") && uuid.ends_with("-private")
        }
        Err(_) => false,
    }
}
