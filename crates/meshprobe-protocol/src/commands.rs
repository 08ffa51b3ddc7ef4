//! Requests that can be sent to the device.

use crate::types::PacketType;

/// Requests the app can send to the device.
#[derive(Debug, Clone)]
pub enum Command {
    /// Request the full contact list. The device answers with a
    /// `CONTACT_START` / `CONTACT`* / `CONTACT_END` sequence.
    GetContacts,

    /// Trace the route to a target node. The device answers with a single
    /// `TRACE_ROUTE` packet (or `ERROR`).
    Trace {
        /// Target public key as a 64-character hex string. Encoded verbatim;
        /// validation is the caller's job (see [`crate::PublicKeyHex`]).
        target: String,
    },
}

impl Command {
    /// Get the packet tag for this request.
    pub fn code(&self) -> u8 {
        match self {
            Command::GetContacts => PacketType::GetContacts.byte(),
            Command::Trace { .. } => PacketType::Trace.byte(),
        }
    }

    /// Encode the request to wire bytes.
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Command::GetContacts => vec![PacketType::GetContacts.byte()],

            Command::Trace { target } => {
                let mut buf = Vec::with_capacity(1 + target.len());
                buf.push(PacketType::Trace.byte());
                buf.extend_from_slice(target.as_bytes());
                buf
            }
        }
    }
}
