// Copyright (c) 2023 Nick Piaddo
// SPDX-License-Identifier: Apache-2.0 OR MIT

// From dependency library

// From standard library

// From this library
use crate::core::device::Usage;
use crate::core::utils::bytes;
use crate::probe::IdFlags;
use crate::probe::IdInfo;
use crate::probe::IdMag;
use crate::probe::MagicMatch;
use crate::probe::Probe;
use crate::probe::ProbeError;
use crate::probe::ProbeOutcome;

// the magic sits 10 bytes before the end of the first memory page; one
// entry per supported page size (4 KiB, 8 KiB, 16 KiB, 64 KiB)
pub(super) static SWAP_ID_INFO: IdInfo = IdInfo {
    name: "swap",
    usage: Usage::Other,
    flags: IdFlags::empty(),
    magics: &[
        IdMag {
            magic: b"SWAPSPACE2",
            kboff: 3,
            sboff: 0x3f6,
        },
        IdMag {
            magic: b"SWAP-SPACE",
            kboff: 3,
            sboff: 0x3f6,
        },
        IdMag {
            magic: b"SWAPSPACE2",
            kboff: 7,
            sboff: 0x3f6,
        },
        IdMag {
            magic: b"SWAPSPACE2",
            kboff: 15,
            sboff: 0x3f6,
        },
        IdMag {
            magic: b"SWAPSPACE2",
            kboff: 63,
            sboff: 0x3f6,
        },
    ],
    probe_fn: probe_swap,
};

fn probe_swap(pr: &mut Probe, mag: Option<&MagicMatch>) -> Result<ProbeOutcome, ProbeError> {
    let mag = match mag {
        Some(mag) => mag,
        None => return Ok(ProbeOutcome::NothingDetected),
    };

    if mag.magic == b"SWAP-SPACE" {
        // v0 swap area, no header beyond the magic
        return Ok(ProbeOutcome::Found);
    }

    // the v1 header follows the 1 KiB boot-block shadow
    let buf = match pr.get_buffer(1024, 44)? {
        Some(buf) => buf,
        None => return Ok(ProbeOutcome::NothingDetected),
    };

    let version = bytes::u32_le(&buf, 0);
    let last_page = bytes::u32_le(&buf, 4);

    if version != 1 || last_page == 0 {
        return Ok(ProbeOutcome::NothingDetected);
    }

    let mut uuid = [0u8; 16];
    uuid.copy_from_slice(&buf[12..28]);

    pr.set_version("1")?;
    pr.set_uuid(&uuid)?;
    pr.set_label(&buf[28..44])?;

    Ok(ProbeOutcome::Found)
}
