//! Transaction correlator.
//!
//! The companion protocol has no correlation IDs: a reply is identified only
//! by its packet tag. The correlator owns the set of in-flight transactions
//! for one connection and routes every inbound packet to the transactions
//! still waiting on it. Each transaction settles exactly once, through a
//! oneshot channel that is consumed the moment the matching terminal packet
//! arrives; a settled or abandoned transaction is removed from the arena, so
//! later packets cannot touch it.
//!
//! Because same-family transactions would be indistinguishable on the wire,
//! at most one transaction per family may be pending at a time; a second
//! `begin` of the same family is refused with [`SessionError::Busy`].

use std::collections::BTreeMap;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::debug;

use meshprobe_protocol::{responses, Contact, TraceResponse, MAX_HOPS};

use crate::error::SessionError;

/// Protocol families a transaction can belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionFamily {
    /// Streamed contact-list fetch (`CONTACT_START` .. `CONTACT_END`).
    Contacts,
    /// Single-response trace (`TRACE_ROUTE` or `ERROR`).
    Trace,
}

impl std::fmt::Display for TransactionFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionFamily::Contacts => write!(f, "contact-list"),
            TransactionFamily::Trace => write!(f, "trace"),
        }
    }
}

/// Caller's end of a registered transaction.
///
/// The receiver resolves when the transaction settles; the id lets the
/// caller abandon the registration if its own deadline fires first.
#[derive(Debug)]
pub(crate) struct TransactionHandle<T> {
    pub(crate) id: u64,
    pub(crate) settled: oneshot::Receiver<Result<T, SessionError>>,
}

/// One in-flight transaction, tagged by protocol shape.
enum Pending {
    /// Awaiting a single `TRACE_ROUTE` (or `ERROR`).
    Trace {
        settle: oneshot::Sender<Result<TraceResponse, SessionError>>,
    },
    /// Accumulating a streamed contact list.
    Contacts {
        /// Set once `CONTACT_START` has been seen; `CONTACT` packets before
        /// the sentinel are unrelated traffic and are ignored.
        started: bool,
        collected: Vec<Contact>,
        settle: oneshot::Sender<Result<Vec<Contact>, SessionError>>,
    },
}

/// What became of a pending transaction after seeing one packet.
enum Offer {
    /// Still pending; hand the (possibly updated) state back.
    Keep(Pending),
    /// Terminal packet consumed; the settlement has been sent.
    Settled,
}

impl Pending {
    fn family(&self) -> TransactionFamily {
        match self {
            Pending::Trace { .. } => TransactionFamily::Trace,
            Pending::Contacts { .. } => TransactionFamily::Contacts,
        }
    }

    /// Offer one inbound packet to this transaction.
    ///
    /// Packets of unrelated kinds leave the transaction pending. The hop
    /// count policy is enforced here: a well-formed `TRACE_ROUTE` above
    /// [`MAX_HOPS`] settles the trace as a failure, not a success.
    fn offer(self, frame: &[u8]) -> Offer {
        match self {
            Pending::Trace { settle } => {
                if let Some(resp) = responses::decode_trace_response(frame) {
                    let result = if resp.hop_count > MAX_HOPS {
                        Err(SessionError::NotDirect {
                            hops: resp.hop_count,
                        })
                    } else {
                        Ok(resp)
                    };
                    let _ = settle.send(result);
                    return Offer::Settled;
                }
                if responses::is_error(frame) {
                    let _ = settle.send(Err(SessionError::DeviceError));
                    return Offer::Settled;
                }
                Offer::Keep(Pending::Trace { settle })
            }

            Pending::Contacts {
                mut started,
                mut collected,
                settle,
            } => {
                if responses::is_contact_start(frame) {
                    started = true;
                } else if responses::is_contact_end(frame) {
                    let _ = settle.send(Ok(collected));
                    return Offer::Settled;
                } else if started {
                    // Malformed CONTACT packets decode to None and are
                    // skipped; one corrupt record must not void the list.
                    if let Some(contact) = responses::decode_contact(frame) {
                        collected.push(contact);
                    }
                }
                Offer::Keep(Pending::Contacts {
                    started,
                    collected,
                    settle,
                })
            }
        }
    }

    /// Settle as failed.
    fn fail(self, err: SessionError) {
        match self {
            Pending::Trace { settle } => {
                let _ = settle.send(Err(err));
            }
            Pending::Contacts { settle, .. } => {
                let _ = settle.send(Err(err));
            }
        }
    }
}

#[derive(Default)]
struct Arena {
    next_id: u64,
    pending: BTreeMap<u64, Pending>,
}

/// Registry of in-flight transactions for one connection.
#[derive(Default)]
pub(crate) struct Correlator {
    arena: Mutex<Arena>,
}

impl Correlator {
    pub fn new() -> Self {
        Correlator::default()
    }

    /// Register a single-response trace transaction.
    pub fn begin_trace(&self) -> Result<TransactionHandle<TraceResponse>, SessionError> {
        let (tx, rx) = oneshot::channel();
        let id = self.register(Pending::Trace { settle: tx })?;
        Ok(TransactionHandle { id, settled: rx })
    }

    /// Register a streamed contact-list transaction.
    pub fn begin_contacts(&self) -> Result<TransactionHandle<Vec<Contact>>, SessionError> {
        let (tx, rx) = oneshot::channel();
        let id = self.register(Pending::Contacts {
            started: false,
            collected: Vec::new(),
            settle: tx,
        })?;
        Ok(TransactionHandle { id, settled: rx })
    }

    fn register(&self, pending: Pending) -> Result<u64, SessionError> {
        let family = pending.family();
        let mut arena = self.arena.lock();
        if arena.pending.values().any(|p| p.family() == family) {
            return Err(SessionError::Busy { family });
        }
        let id = arena.next_id;
        arena.next_id += 1;
        arena.pending.insert(id, pending);
        debug!(id, %family, "transaction registered");
        Ok(id)
    }

    /// Route one inbound packet to every pending transaction, in
    /// registration order. Called once per packet from the frame pump.
    pub fn dispatch(&self, frame: &[u8]) {
        let mut arena = self.arena.lock();
        let ids: Vec<u64> = arena.pending.keys().copied().collect();
        for id in ids {
            let Some(pending) = arena.pending.remove(&id) else {
                continue;
            };
            match pending.offer(frame) {
                Offer::Keep(pending) => {
                    arena.pending.insert(id, pending);
                }
                Offer::Settled => {
                    debug!(id, "transaction settled");
                }
            }
        }
    }

    /// Drop a registration whose caller gave up on it. A packet arriving
    /// later for this id has no effect.
    pub fn abandon(&self, id: u64) {
        if self.arena.lock().pending.remove(&id).is_some() {
            debug!(id, "transaction abandoned");
        }
    }

    /// Fail every pending transaction with the same reason and clear the
    /// registry. Used on close and link loss.
    pub fn cancel_all(&self, reason: &str) {
        let drained = std::mem::take(&mut self.arena.lock().pending);
        for (id, pending) in drained {
            debug!(id, reason, "cancelling pending transaction");
            pending.fail(SessionError::ConnectionClosed {
                reason: reason.to_string(),
            });
        }
    }

    /// Number of transactions currently pending.
    pub fn pending_count(&self) -> usize {
        self.arena.lock().pending.len()
    }
}
