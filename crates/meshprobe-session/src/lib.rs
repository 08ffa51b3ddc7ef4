//! Connection session and transaction correlator for MeshCore companion
//! devices.
//!
//! This crate turns a push-based stream of inbound protocol packets into
//! awaitable, timeout-bound request/response and request/stream
//! transactions. The pieces:
//!
//! - [`FrameTransport`]: the boundary to whatever owns the physical link.
//!   One channel of inbound packets, one channel of outbound writes.
//! - the transaction correlator (internal): routes each inbound packet to
//!   the transactions awaiting it and guarantees each settles exactly once.
//! - [`Connection`]: the facade. Holds link status, owns the single
//!   inbound subscription, and exposes `fetch_contacts` and
//!   `perform_trace`.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::str::FromStr;
//! use meshprobe_protocol::{PublicKeyHex, COMMAND_TIMEOUT, TRACE_TIMEOUT};
//! use meshprobe_session::{Connection, DeviceIdentity, FrameTransport};
//!
//! let (transport, endpoint) = FrameTransport::pair(64);
//! // ... hand `endpoint` to the BLE adapter ...
//!
//! let conn = Connection::open(transport, DeviceIdentity {
//!     id: "AA:BB:CC:DD:EE:FF".into(),
//!     name: Some("MeshCore-1234".into()),
//! })?;
//!
//! let contacts = conn.fetch_contacts(COMMAND_TIMEOUT).await?;
//! let target = PublicKeyHex::from_str(&contacts[0].pubkey)?;
//! let trace = conn.perform_trace(&target, TRACE_TIMEOUT).await?;
//! println!("rssi {} dBm, snr {} dB", trace.rssi, trace.snr());
//! ```

mod correlator;
mod error;
mod session;
mod transport;

pub use correlator::TransactionFamily;
pub use error::SessionError;
pub use session::{Connection, ConnectionStatus, DeviceIdentity};
pub use transport::{DeviceEndpoint, FrameTransport, DEFAULT_FRAME_CAPACITY};
