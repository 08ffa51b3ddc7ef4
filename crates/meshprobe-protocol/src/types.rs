//! Common types used in the protocol.

use crate::constants::*;
use crate::error::ProtocolError;

/// Packet type tags used on the companion BLE link.
///
/// Byte 0 of every packet is one of these tags. The numbering is a versioned
/// firmware contract; values below 0x80 are request/response codes, values
/// from 0x80 up are pushed by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PacketType {
    /// Generic OK response.
    Ok = 0x00,
    /// Device rejected a request.
    Error = 0x01,
    /// Start-of-contact-list sentinel.
    ContactStart = 0x02,
    /// A single contact entry.
    Contact = 0x03,
    /// End-of-contact-list sentinel.
    ContactEnd = 0x04,
    /// Direct message received.
    ContactMsgRecv = 0x05,
    /// Channel message received.
    ChannelMsgRecv = 0x06,
    /// Self info response.
    SelfInfo = 0x07,
    /// Fetch a queued message.
    GetMsg = 0x08,
    /// Send a direct message.
    SendMsg = 0x09,
    /// Send a channel message.
    SendChanMsg = 0x0A,
    /// Request the contact list.
    GetContacts = 0x0B,
    /// Add a contact.
    AddContact = 0x0C,
    /// Remove a contact.
    RemoveContact = 0x0D,
    /// Set the device name.
    SetName = 0x0E,
    /// Set the device coordinates.
    SetCoords = 0x0F,
    /// Trace the route to a target node.
    Trace = 0x10,
    /// Set radio TX power.
    SetTxPower = 0x11,
    /// Set channel labels.
    SetChanLabels = 0x12,
    /// Get channel labels.
    GetChanLabels = 0x13,
    /// Channel labels response.
    ChanLabels = 0x14,
    /// Binary sub-request.
    BinaryReq = 0x32,
    /// Factory reset.
    FactoryReset = 0x33,
    /// Advertisement received (push).
    Advertisement = 0x80,
    /// Path to a contact changed (push).
    PathUpdate = 0x81,
    /// Acknowledgement (push).
    Ack = 0x82,
    /// Messages waiting in the offline queue (push).
    MessagesWaiting = 0x83,
    /// Node report (push).
    NodeReport = 0x84,
    /// Trace route result (push).
    TraceRoute = 0x85,
    /// Telemetry report (push).
    TelemetryReport = 0x86,
    /// Neighbor info (push).
    NeighborInfo = 0x87,
    /// Position update (push).
    PositionUpdate = 0x88,
    /// Channel reception ratio (push).
    ChannelReceptionRatio = 0x89,
    /// Short-form contact list (push).
    ShortContactList = 0x8A,
    /// Network statistics (push).
    NetworkStats = 0x8B,
    /// Custom variables (push).
    CustomVars = 0x8C,
    /// Device info (push).
    GetDeviceInfo = 0x8D,
}

impl PacketType {
    /// Look up a tag by its wire value. Returns `None` for bytes the
    /// firmware contract does not define.
    pub fn from_byte(byte: u8) -> Option<PacketType> {
        let tag = match byte {
            0x00 => PacketType::Ok,
            0x01 => PacketType::Error,
            0x02 => PacketType::ContactStart,
            0x03 => PacketType::Contact,
            0x04 => PacketType::ContactEnd,
            0x05 => PacketType::ContactMsgRecv,
            0x06 => PacketType::ChannelMsgRecv,
            0x07 => PacketType::SelfInfo,
            0x08 => PacketType::GetMsg,
            0x09 => PacketType::SendMsg,
            0x0A => PacketType::SendChanMsg,
            0x0B => PacketType::GetContacts,
            0x0C => PacketType::AddContact,
            0x0D => PacketType::RemoveContact,
            0x0E => PacketType::SetName,
            0x0F => PacketType::SetCoords,
            0x10 => PacketType::Trace,
            0x11 => PacketType::SetTxPower,
            0x12 => PacketType::SetChanLabels,
            0x13 => PacketType::GetChanLabels,
            0x14 => PacketType::ChanLabels,
            0x32 => PacketType::BinaryReq,
            0x33 => PacketType::FactoryReset,
            0x80 => PacketType::Advertisement,
            0x81 => PacketType::PathUpdate,
            0x82 => PacketType::Ack,
            0x83 => PacketType::MessagesWaiting,
            0x84 => PacketType::NodeReport,
            0x85 => PacketType::TraceRoute,
            0x86 => PacketType::TelemetryReport,
            0x87 => PacketType::NeighborInfo,
            0x88 => PacketType::PositionUpdate,
            0x89 => PacketType::ChannelReceptionRatio,
            0x8A => PacketType::ShortContactList,
            0x8B => PacketType::NetworkStats,
            0x8C => PacketType::CustomVars,
            0x8D => PacketType::GetDeviceInfo,
            _ => return None,
        };
        Some(tag)
    }

    /// Get the wire value for this tag.
    pub fn byte(self) -> u8 {
        self as u8
    }
}

/// A validated 64-character hex public key.
///
/// The device addresses nodes by the ASCII-hex rendering of their 32-byte
/// public key, so this type stores the text form. Construction checks the
/// length and encoding; encoders can then take the key verbatim without
/// re-validating.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PublicKeyHex(String);

impl PublicKeyHex {
    /// Create a validated key from a hex string.
    pub fn new(key: impl Into<String>) -> Result<Self, ProtocolError> {
        let key = key.into();
        if key.len() != PUBKEY_HEX_LEN {
            return Err(ProtocolError::InvalidKeyLength {
                expected: PUBKEY_HEX_LEN,
                actual: key.len(),
            });
        }
        if hex::decode(&key).is_err() {
            return Err(ProtocolError::InvalidKeyEncoding);
        }
        Ok(PublicKeyHex(key))
    }

    /// Get the key text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Get the 2-character prefix used as a short identifier.
    pub fn prefix(&self) -> &str {
        &self.0[..PREFIX_LEN]
    }
}

impl std::str::FromStr for PublicKeyHex {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PublicKeyHex::new(s)
    }
}

impl std::fmt::Display for PublicKeyHex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PublicKeyHex {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A contact known to the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contact {
    /// Full 64-character hex public key.
    pub pubkey: String,
    /// Display name. Never empty; a placeholder is synthesized when the
    /// device sends no name.
    pub name: String,
    /// First 2 characters of the pubkey.
    pub prefix: String,
}

/// Result of a trace request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceResponse {
    /// Number of relay hops the response traversed. Zero means a direct
    /// link.
    pub hop_count: u8,
    /// Received signal strength in dBm.
    pub rssi: i16,
    /// Background noise in dBm.
    pub noise_floor: i16,
    /// Device timestamp (unix seconds).
    pub timestamp: u32,
}

impl TraceResponse {
    /// Signal-to-noise ratio in dB.
    pub fn snr(&self) -> i32 {
        i32::from(self.rssi) - i32::from(self.noise_floor)
    }
}
