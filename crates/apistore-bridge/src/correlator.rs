//! Request correlation.
//!
//! The correlator hands out ids for outbound calls and keeps one pending
//! entry per id until the matching reply, a rejection, or a deadline
//! removes it. Replies may arrive in any order; the id map routes each to
//! its own caller.

use crate::error::{BridgeError, BridgeResult};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, warn};

type ReplySender = oneshot::Sender<BridgeResult<Value>>;

/// What [`Correlator::fail_all`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailAllOutcome {
    /// The single pending request was rejected.
    Rejected(u64),
    /// Nothing was rejected; this many requests are still pending.
    LeftPending(usize),
}

/// Caller-facing handle for one pending request.
#[derive(Debug)]
pub struct PendingReply {
    id: u64,
    rx: oneshot::Receiver<BridgeResult<Value>>,
}

impl PendingReply {
    /// Id this handle waits on.
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Future for PendingReply {
    type Output = BridgeResult<Value>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(Ok(outcome)) => Poll::Ready(outcome),
            Poll::Ready(Err(_)) => Poll::Ready(Err(BridgeError::ChannelClosed)),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Maps reply ids back to the callers awaiting them.
pub struct Correlator {
    next_id: AtomicU64,
    pending: Mutex<HashMap<u64, ReplySender>>,
}

impl Correlator {
    /// Create a correlator whose first id is 1.
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Fresh id, strictly increasing within this correlator.
    pub fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Create a pending entry for `id` and return the handle that completes with its reply.
    pub fn register(&self, id: u64) -> BridgeResult<PendingReply> {
        let mut pending = self.pending.lock();
        if pending.contains_key(&id) {
            warn!(id, "Refusing to register an id that is already pending");
            return Err(BridgeError::DuplicateId(id));
        }

        let (tx, rx) = oneshot::channel();
        pending.insert(id, tx);
        Ok(PendingReply { id, rx })
    }

    /// Fulfil the request with `value`. Unknown ids are logged and ignored.
    pub fn resolve(&self, id: u64, value: Value) -> bool {
        self.complete(id, Ok(value))
    }

    /// Fail the request with `error`. Unknown ids are logged and ignored.
    pub fn reject(&self, id: u64, error: BridgeError) -> bool {
        self.complete(id, Err(error))
    }

    /// Reject the request with [`BridgeError::Timeout`] and drop its entry.
    pub fn expire(&self, id: u64, after: Duration) -> bool {
        let after_ms = u64::try_from(after.as_millis()).unwrap_or(u64::MAX);
        self.complete(id, Err(BridgeError::Timeout { id, after_ms }))
    }

    /// Drop the entry without completing it.
    ///
    /// Used when the envelope never left, so the caller already has an error.
    pub fn forget(&self, id: u64) -> bool {
        self.pending.lock().remove(&id).is_some()
    }

    /// Channel-level fault with no id to attribute it to.
    ///
    /// With exactly one pending request it gets `error`. With none or several,
    /// nothing is rejected and the callers' deadlines decide.
    pub fn fail_all(&self, error: BridgeError) -> FailAllOutcome {
        let sender = {
            let mut pending = self.pending.lock();
            if pending.len() != 1 {
                let count = pending.len();
                warn!(
                    pending = count,
                    error = %error,
                    "Transport fault cannot be attributed, leaving requests pending"
                );
                return FailAllOutcome::LeftPending(count);
            }
            let only = pending.drain().next();
            only
        };

        match sender {
            Some((id, tx)) => {
                warn!(id, error = %error, "Rejecting the only pending request after transport fault");
                let _ = tx.send(Err(error));
                FailAllOutcome::Rejected(id)
            }
            None => FailAllOutcome::LeftPending(0),
        }
    }

    /// Reject every pending request, e.g. when the connection is closed.
    pub fn reject_all(&self, error: impl Fn() -> BridgeError) -> usize {
        let drained: Vec<(u64, ReplySender)> = self.pending.lock().drain().collect();
        let count = drained.len();
        for (id, tx) in drained {
            debug!(id, "Rejecting pending request");
            let _ = tx.send(Err(error()));
        }
        count
    }

    /// Number of requests awaiting a reply.
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    /// Whether `id` is awaiting a reply.
    pub fn is_pending(&self, id: u64) -> bool {
        self.pending.lock().contains_key(&id)
    }

    fn complete(&self, id: u64, outcome: BridgeResult<Value>) -> bool {
        let sender = self.pending.lock().remove(&id);

        match sender {
            Some(tx) => {
                if tx.send(outcome).is_err() {
                    debug!(id, "Caller went away before its reply arrived");
                }
                true
            }
            None => {
                warn!(id, error = %BridgeError::StaleReply(id), "Ignoring reply");
                false
            }
        }
    }
}

impl Default for Correlator {
    fn default() -> Self {
        Self::new()
    }
}
