//! MeshCore Companion BLE Protocol
//!
//! This crate provides types and utilities for talking to a MeshCore radio
//! over its BLE serial bridge. The protocol is message-framed: the transport
//! delivers one complete packet per notification, and every packet starts
//! with a one-byte type tag.
//!
//! # Protocol Overview
//!
//! Packets are either:
//!
//! - **Requests** (app → device): Start with a request tag such as
//!   `GET_CONTACTS` (0x0B) or `TRACE` (0x10)
//! - **Responses / push notifications** (device → app): Start with a response
//!   tag such as `CONTACT` (0x03), `TRACE_ROUTE` (0x85), or `ERROR` (0x01)
//!
//! Decoders in this crate never fail loudly for a packet of a *different*
//! kind: they return `None` so a dispatcher can probe several decoders
//! against the same inbound packet.
//!
//! # Example
//!
//! ```rust,ignore
//! use meshprobe_protocol::{responses, Command};
//!
//! // Build a request
//! let frame = Command::GetContacts.encode();
//!
//! // Probe an inbound packet
//! if let Some(contact) = responses::decode_contact(&received) {
//!     println!("contact {} ({})", contact.name, contact.prefix);
//! }
//! ```

mod commands;
mod constants;
mod error;
pub mod responses;
mod types;

pub use commands::*;
pub use constants::*;
pub use error::*;
pub use types::*;
