//! Session error types.

use thiserror::Error;

use crate::correlator::TransactionFamily;

/// Errors surfaced by session operations.
///
/// Each failure class is a distinct variant so callers can tell a timeout
/// from a device rejection from a hop-count policy failure and decide
/// whether a retry makes sense.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// An operation was started while not connected. Fails immediately,
    /// never waits for a timeout.
    #[error("not connected to a device")]
    NotConnected,

    /// No qualifying response arrived before the deadline.
    #[error("timed out waiting for a response")]
    Timeout,

    /// The device answered with an ERROR packet.
    #[error("device rejected the request")]
    DeviceError,

    /// The device answered the trace, but the route is not a direct link.
    #[error("not a direct connection ({hops} hops)")]
    NotDirect {
        /// Hop count the device reported.
        hops: u8,
    },

    /// A transaction of the same family is already in flight. The protocol
    /// has no correlation IDs, so concurrent same-family requests cannot be
    /// told apart and are refused outright.
    #[error("a {family} transaction is already in flight")]
    Busy {
        /// Family of the transaction that was refused.
        family: TransactionFamily,
    },

    /// The connection was closed while the transaction was pending.
    #[error("connection closed: {reason}")]
    ConnectionClosed {
        /// Why the connection went away.
        reason: String,
    },

    /// Writing to the transport failed.
    #[error("transport write failed: {0}")]
    Transport(String),
}
