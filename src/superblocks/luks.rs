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

pub(super) static LUKS_ID_INFO: IdInfo = IdInfo {
    name: "crypto_LUKS",
    usage: Usage::Crypto,
    flags: IdFlags::empty(),
    magics: &[IdMag {
        magic: b"LUKS\xba\xbe",
        kboff: 0,
        sboff: 0,
    }],
    probe_fn: probe_luks,
};

fn nul_terminated(buf: &[u8]) -> &[u8] {
    match buf.iter().position(|&b| b == 0) {
        Some(end) => &buf[..end],
        None => buf,
    }
}

fn probe_luks(pr: &mut Probe, _mag: Option<&MagicMatch>) -> Result<ProbeOutcome, ProbeError> {
    let buf = match pr.get_buffer(0, 512)? {
        Some(buf) => buf,
        None => return Ok(ProbeOutcome::NothingDetected),
    };

    let version = bytes::u16_be(&buf, 6);
    if version != 1 && version != 2 {
        return Ok(ProbeOutcome::NothingDetected);
    }

    // both header versions store the UUID as a string at the same offset
    let uuid = nul_terminated(&buf[168..208]);
    if let Ok(uuid) = std::str::from_utf8(uuid) {
        pr.set_uuid_str("UUID", uuid)?;
    }

    if version == 2 {
        pr.set_label(nul_terminated(&buf[24..72]))?;
    }

    pr.set_version(&version.to_string())?;

    Ok(ProbeOutcome::Found)
}
