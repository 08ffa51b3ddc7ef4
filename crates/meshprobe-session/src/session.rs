//! Connection session facade.
//!
//! One [`Connection`] wraps one connected transport: it owns the single
//! inbound-frame subscription, the transaction correlator, and the link
//! status, and exposes the two protocol operations the survey tool needs.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use meshprobe_protocol::{Command, Contact, PublicKeyHex, TraceResponse};

use crate::correlator::{Correlator, TransactionHandle};
use crate::error::SessionError;
use crate::transport::FrameTransport;

/// Link lifecycle state. Mirrors the physical link, not transaction state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// No link.
    Disconnected,
    /// Link establishment in progress.
    Connecting,
    /// Link up; operations may be started.
    Connected,
    /// The link failed or was lost.
    Error,
}

/// Identity of the peripheral behind a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    /// Transport-level device id (BLE address or similar).
    pub id: String,
    /// Advertised name, if the peripheral had one.
    pub name: Option<String>,
}

/// A session against one connected MeshCore peripheral.
///
/// Operations that await a reply suspend the caller only; inbound packets
/// keep flowing to the correlator while any number of transactions are
/// pending. The protocol itself carries no correlation IDs, so two
/// same-kind requests cannot be distinguished on the wire: a second request
/// of a kind already in flight is refused with [`SessionError::Busy`], and
/// callers should serialize requests of the same kind.
pub struct Connection {
    status: Arc<RwLock<ConnectionStatus>>,
    identity: RwLock<Option<DeviceIdentity>>,
    correlator: Arc<Correlator>,
    writer: mpsc::Sender<Vec<u8>>,
    pump: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection").finish_non_exhaustive()
    }
}

impl Connection {
    /// Open a session over a connected transport.
    ///
    /// Subscribes to inbound frames (exactly one subscription for the life
    /// of the connection) and moves to `Connected`. Fails if the link is
    /// already down; the caller may retry `open` with a fresh transport
    /// after a failure or loss.
    ///
    /// Must be called from within a tokio runtime.
    pub fn open(
        transport: FrameTransport,
        identity: DeviceIdentity,
    ) -> Result<Connection, SessionError> {
        if transport.is_closed() {
            return Err(SessionError::Transport("link is down".to_string()));
        }

        let status = Arc::new(RwLock::new(ConnectionStatus::Connecting));
        let correlator = Arc::new(Correlator::new());
        let FrameTransport { mut frames, writer } = transport;

        *status.write() = ConnectionStatus::Connected;
        debug!(device = %identity.id, "session opened");

        let pump = tokio::spawn({
            let status = Arc::clone(&status);
            let correlator = Arc::clone(&correlator);
            async move {
                while let Some(frame) = frames.recv().await {
                    trace!(len = frame.len(), "inbound frame");
                    correlator.dispatch(&frame);
                }
                // Inbound channel closed underneath us: the link is gone.
                warn!("transport link lost");
                let mut status = status.write();
                if *status == ConnectionStatus::Connected {
                    *status = ConnectionStatus::Error;
                }
                drop(status);
                correlator.cancel_all("link lost");
            }
        });

        Ok(Connection {
            status,
            identity: RwLock::new(Some(identity)),
            correlator,
            writer,
            pump: Mutex::new(Some(pump)),
        })
    }

    /// Current link status.
    pub fn status(&self) -> ConnectionStatus {
        *self.status.read()
    }

    /// Identity of the connected peripheral, while connected.
    pub fn identity(&self) -> Option<DeviceIdentity> {
        self.identity.read().clone()
    }

    /// Close the session: stop the frame subscription, fail every pending
    /// transaction, clear the device identity. Safe to call repeatedly; a
    /// second call is a no-op beyond the status transition.
    pub fn close(&self) {
        if let Some(pump) = self.pump.lock().take() {
            pump.abort();
            self.correlator.cancel_all("connection closed");
            debug!("session closed");
        }
        *self.status.write() = ConnectionStatus::Disconnected;
        *self.identity.write() = None;
    }

    /// Fetch the device's contact list.
    ///
    /// Streams `CONTACT` packets between the `CONTACT_START` and
    /// `CONTACT_END` sentinels into a list, in arrival order, duplicates
    /// included. Corrupt individual entries are skipped.
    pub async fn fetch_contacts(&self, timeout: Duration) -> Result<Vec<Contact>, SessionError> {
        self.ensure_connected()?;
        let handle = self.correlator.begin_contacts()?;
        self.run_transaction(handle, Command::GetContacts.encode(), timeout)
            .await
    }

    /// Trace the route to a target node and require a direct link.
    ///
    /// Resolves only when the device reports a route with zero hops. A
    /// well-formed answer over more hops fails with
    /// [`SessionError::NotDirect`], distinct from a timeout or a device
    /// error: the device did answer, the route just is not usable here.
    pub async fn perform_trace(
        &self,
        target: &PublicKeyHex,
        timeout: Duration,
    ) -> Result<TraceResponse, SessionError> {
        self.ensure_connected()?;
        let handle = self.correlator.begin_trace()?;
        let frame = Command::Trace {
            target: target.as_str().to_string(),
        }
        .encode();
        self.run_transaction(handle, frame, timeout).await
    }

    fn ensure_connected(&self) -> Result<(), SessionError> {
        if self.status() == ConnectionStatus::Connected {
            Ok(())
        } else {
            Err(SessionError::NotConnected)
        }
    }

    /// Write the request frame and await settlement. The transaction is
    /// registered before the write, so a reply arriving between the write
    /// and the await cannot be missed.
    async fn run_transaction<T>(
        &self,
        mut handle: TransactionHandle<T>,
        frame: Vec<u8>,
        timeout: Duration,
    ) -> Result<T, SessionError> {
        if let Err(err) = self.write_frame(frame).await {
            self.correlator.abandon(handle.id);
            return Err(err);
        }

        match tokio::time::timeout(timeout, &mut handle.settled).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(SessionError::ConnectionClosed {
                reason: "session dropped".to_string(),
            }),
            Err(_) => {
                self.correlator.abandon(handle.id);
                // A settlement that raced the deadline still counts.
                match handle.settled.try_recv() {
                    Ok(result) => result,
                    Err(_) => {
                        debug!(id = handle.id, "transaction timed out");
                        Err(SessionError::Timeout)
                    }
                }
            }
        }
    }

    async fn write_frame(&self, frame: Vec<u8>) -> Result<(), SessionError> {
        trace!(len = frame.len(), "writing frame");
        if self.writer.send(frame).await.is_err() {
            // Write channel gone means the link is gone.
            let mut status = self.status.write();
            if *status == ConnectionStatus::Connected {
                *status = ConnectionStatus::Error;
            }
            return Err(SessionError::Transport("link is down".to_string()));
        }
        Ok(())
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if let Some(pump) = self.pump.lock().take() {
            pump.abort();
        }
    }
}
