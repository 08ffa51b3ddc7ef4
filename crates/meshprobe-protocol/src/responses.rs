//! Classifiers and decoders for inbound packets.
//!
//! Every function here takes one complete packet as delivered by the
//! transport. A decoder returns `None` both for packets of a different kind
//! and for packets of the right kind that are malformed; only the latter is
//! logged. This lets a dispatcher probe several decoders against the same
//! packet without treating "wrong kind" as an error.

use log::warn;

use crate::constants::*;
use crate::types::{Contact, PacketType, TraceResponse};

/// Classify a packet by its leading tag. Returns `None` for an empty packet
/// or a tag outside the firmware contract.
pub fn packet_type(frame: &[u8]) -> Option<PacketType> {
    frame.first().and_then(|&b| PacketType::from_byte(b))
}

fn has_tag(frame: &[u8], tag: PacketType) -> bool {
    frame.first() == Some(&tag.byte())
}

/// Check for the start-of-contact-list sentinel.
pub fn is_contact_start(frame: &[u8]) -> bool {
    has_tag(frame, PacketType::ContactStart)
}

/// Check for the end-of-contact-list sentinel.
pub fn is_contact_end(frame: &[u8]) -> bool {
    has_tag(frame, PacketType::ContactEnd)
}

/// Check for an acknowledgement push.
pub fn is_ack(frame: &[u8]) -> bool {
    has_tag(frame, PacketType::Ack)
}

/// Check for a device-reported error.
pub fn is_error(frame: &[u8]) -> bool {
    has_tag(frame, PacketType::Error)
}

/// Decode a `CONTACT` packet.
///
/// Layout: tag, then 64 bytes of ASCII-hex pubkey, then an optional
/// null-terminated UTF-8 name. A missing or empty name is replaced with
/// `"Unknown-"` plus the pubkey prefix, so names are never empty.
pub fn decode_contact(frame: &[u8]) -> Option<Contact> {
    if !has_tag(frame, PacketType::Contact) {
        return None;
    }
    if frame.len() < CONTACT_MIN_LEN {
        warn!("contact packet too short: {} bytes", frame.len());
        return None;
    }

    let pubkey = String::from_utf8_lossy(&frame[1..CONTACT_MIN_LEN]).to_string();
    let prefix: String = pubkey.chars().take(PREFIX_LEN).collect();

    // Name: remaining bytes up to the first null, or to the end.
    let name_bytes = &frame[CONTACT_MIN_LEN..];
    let name_end = name_bytes
        .iter()
        .position(|&b| b == 0)
        .unwrap_or(name_bytes.len());
    let name = String::from_utf8_lossy(&name_bytes[..name_end]).to_string();

    let name = if name.is_empty() {
        format!("Unknown-{}", prefix)
    } else {
        name
    };

    Some(Contact {
        pubkey,
        name,
        prefix,
    })
}

/// Decode a `TRACE_ROUTE` packet.
///
/// Layout: tag, hop count (u8), rssi (i16 LE), noise floor (i16 LE),
/// timestamp (u32 LE). Trailing bytes beyond the first 10 are ignored for
/// forward compatibility.
pub fn decode_trace_response(frame: &[u8]) -> Option<TraceResponse> {
    if !has_tag(frame, PacketType::TraceRoute) {
        return None;
    }
    if frame.len() < TRACE_ROUTE_MIN_LEN {
        warn!("trace route packet too short: {} bytes", frame.len());
        return None;
    }

    let hop_count = frame[1];
    let rssi = i16::from_le_bytes([frame[2], frame[3]]);
    let noise_floor = i16::from_le_bytes([frame[4], frame[5]]);
    let timestamp = u32::from_le_bytes([frame[6], frame[7], frame[8], frame[9]]);

    Some(TraceResponse {
        hop_count,
        rssi,
        noise_floor,
        timestamp,
    })
}
