//! Transport port boundary.
//!
//! The session does not talk to BLE directly. Whatever owns the physical
//! link (a BLE central, a serial bridge, a test harness) hands the session a
//! [`FrameTransport`]: one channel delivering complete inbound packets in
//! receipt order, and one channel accepting outbound packets for writing.
//! Closure of either side is how link loss reaches the session.

use tokio::sync::mpsc;

/// Default channel capacity for a transport pair.
pub const DEFAULT_FRAME_CAPACITY: usize = 64;

/// The session side of a point-to-point frame link.
///
/// Each value on `frames` is exactly one protocol packet; the transport is
/// responsible for any reassembly below this boundary. When the link goes
/// down the owner drops its endpoints: the session then sees `frames` close
/// and writes fail instead of hanging.
#[derive(Debug)]
pub struct FrameTransport {
    /// Inbound packets, in receipt order.
    pub(crate) frames: mpsc::Receiver<Vec<u8>>,
    /// Outbound packets to be written to the device.
    pub(crate) writer: mpsc::Sender<Vec<u8>>,
}

/// The device side of a transport pair, used by link adapters and tests.
#[derive(Debug)]
pub struct DeviceEndpoint {
    /// Deliver an inbound packet to the session.
    pub frames: mpsc::Sender<Vec<u8>>,
    /// Packets the session wrote, in write order.
    pub writes: mpsc::Receiver<Vec<u8>>,
}

impl FrameTransport {
    /// Build a transport from existing channel endpoints.
    pub fn new(frames: mpsc::Receiver<Vec<u8>>, writer: mpsc::Sender<Vec<u8>>) -> Self {
        FrameTransport { frames, writer }
    }

    /// Create a connected transport/device pair.
    pub fn pair(capacity: usize) -> (FrameTransport, DeviceEndpoint) {
        let (frame_tx, frame_rx) = mpsc::channel(capacity);
        let (write_tx, write_rx) = mpsc::channel(capacity);

        let transport = FrameTransport {
            frames: frame_rx,
            writer: write_tx,
        };
        let endpoint = DeviceEndpoint {
            frames: frame_tx,
            writes: write_rx,
        };
        (transport, endpoint)
    }

    /// Check whether the write side of the link is already gone.
    pub fn is_closed(&self) -> bool {
        self.writer.is_closed()
    }
}
