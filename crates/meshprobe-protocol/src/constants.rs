//! Protocol constants
//!
//! These constants define the packet tags, field sizes, and timing values
//! used on the MeshCore companion BLE link. The tag values are part of the
//! firmware contract and must match the device exactly.

use std::time::Duration;

// ============================================================================
// Sizes
// ============================================================================

/// Length of a public key as it appears on the wire: 32 bytes of key
/// material rendered as ASCII hex.
pub const PUBKEY_HEX_LEN: usize = 64;
/// Number of leading pubkey characters used as a short identifier.
pub const PREFIX_LEN: usize = 2;
/// Minimum length of a CONTACT packet: tag + pubkey.
pub const CONTACT_MIN_LEN: usize = 1 + PUBKEY_HEX_LEN;
/// Minimum length of a TRACE_ROUTE packet: tag + hop count + rssi +
/// noise floor + timestamp.
pub const TRACE_ROUTE_MIN_LEN: usize = 10;

// ============================================================================
// Policy
// ============================================================================

/// Maximum hop count accepted for a trace result. The survey tool only
/// measures direct links, so anything above zero is rejected.
pub const MAX_HOPS: u8 = 0;

// ============================================================================
// Timeouts
// ============================================================================

/// Default deadline for a trace request.
pub const TRACE_TIMEOUT: Duration = Duration::from_secs(5);
/// Default deadline for general commands (contact fetch, etc.).
pub const COMMAND_TIMEOUT: Duration = Duration::from_secs(3);
/// Deadline for BLE link establishment (collaborator concern).
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);
/// Duration of a BLE discovery scan (collaborator concern).
pub const SCAN_TIMEOUT: Duration = Duration::from_secs(10);

// ============================================================================
// Discovery
// ============================================================================

/// Advertised-name prefix of MeshCore peripherals. Discovery is the
/// transport layer's job, but the filter is part of this contract.
pub const DEVICE_NAME_PREFIX: &str = "MeshCore";

/// Check whether an advertised BLE name identifies a MeshCore peripheral.
pub fn is_meshcore_device_name(name: &str) -> bool {
    name.starts_with(DEVICE_NAME_PREFIX)
}
