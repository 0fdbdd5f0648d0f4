// Copyright (c) 2023 Nick Piaddo
// SPDX-License-Identifier: Apache-2.0 OR MIT

// From dependency library

// From standard library

// From this library
use crate::core::utils::bytes;
use crate::core::device::Usage;
use crate::probe::IdFlags;
use crate::probe::IdInfo;
use crate::probe::IdMag;
use crate::probe::MagicMatch;
use crate::probe::Probe;
use crate::probe::ProbeError;
use crate::probe::ProbeOutcome;

// the label sector may be any of the first four sectors; the type magic
// "LVM2 001" sits 24 bytes into the label header
pub(super) static LVM2_ID_INFO: IdInfo = IdInfo {
    name: "LVM2_member",
    usage: Usage::Raid,
    flags: IdFlags::empty(),
    magics: &[
        IdMag {
            magic: b"LVM2 001",
            kboff: 0,
            sboff: 0x018,
        },
        IdMag {
            magic: b"LVM2 001",
            kboff: 0,
            sboff: 0x218,
        },
        IdMag {
            magic: b"LVM2 001",
            kboff: 1,
            sboff: 0x018,
        },
        IdMag {
            magic: b"LVM2 001",
            kboff: 1,
            sboff: 0x218,
        },
    ],
    probe_fn: probe_lvm2,
};

/// Renders a 32-character LVM PV identifier in the
/// `xxxxxx-xxxx-xxxx-xxxx-xxxx-xxxx-xxxxxx` grouping.
fn format_pv_uuid(uuid: &[u8]) -> Option<String> {
    if uuid.len() != 32 || !uuid.iter().all(|b| b.is_ascii_alphanumeric()) {
        return None;
    }

    let s = std::str::from_utf8(uuid).ok()?;
    let groups = [
        &s[0..6],
        &s[6..10],
        &s[10..14],
        &s[14..18],
        &s[18..22],
        &s[22..26],
        &s[26..32],
    ];

    Some(groups.join("-"))
}

fn probe_lvm2(pr: &mut Probe, mag: Option<&MagicMatch>) -> Result<ProbeOutcome, ProbeError> {
    let mag = match mag {
        Some(mag) => mag,
        None => return Ok(ProbeOutcome::NothingDetected),
    };

    // the type magic is 24 bytes into the label header
    let label_offset = mag.offset - 24;

    let buf = match pr.get_buffer(label_offset, 512)? {
        Some(buf) => buf,
        None => return Ok(ProbeOutcome::NothingDetected),
    };

    if &buf[0..8] != b"LABELONE" {
        return Ok(ProbeOutcome::NothingDetected);
    }

    // the PV header holds the identifier
    let pv_header_offset = bytes::u32_le(&buf, 20) as usize;
    if pv_header_offset + 32 > buf.len() {
        return Ok(ProbeOutcome::NothingDetected);
    }

    if let Some(uuid) = format_pv_uuid(&buf[pv_header_offset..pv_header_offset + 32]) {
        pr.set_uuid_str("UUID", &uuid)?;
    }

    // pvcreate zeroes the first 8 KiB of the device
    pr.set_wiper(0, 8 * 1024);

    Ok(ProbeOutcome::Found)
}

#[cfg(test)]
#[allow(unused_imports)]
mod tests {
    use super::*;
    use pretty_assertions::{assert_eq, assert_ne};

    #[test]
    fn lvm_formats_a_pv_identifier_with_the_lvm_grouping() {
        let uuid = b"0123456789abcdefghijklmnopqrstuv";

        let actual = format_pv_uuid(uuid).unwrap();
        let expected = "012345-6789-abcd-efgh-ijkl-mnop-qrstuv";

        assert_eq!(actual, expected);
    }

    #[test]
    fn lvm_rejects_a_non_alphanumeric_pv_identifier() {
        let uuid = [0u8; 32];

        assert_eq!(format_pv_uuid(&uuid), None);
    }
}
