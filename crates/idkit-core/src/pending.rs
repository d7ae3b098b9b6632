//! Single-slot registry for operations completed by an external callback.
//!
//! A redirect flow starts in one call and finishes from a disconnected
//! callback. The registry bridges the two: `begin` installs a one-shot
//! awaiter keyed by a correlation id, and `resolve` completes it when the
//! callback arrives. At most one operation is ever pending per slot; a new
//! `begin` first resolves the old operation with a cancellation so nothing
//! is silently lost.

use idkit_types::{ApiError, ApiResult};
use std::sync::Mutex;
use tokio::sync::oneshot;
use tracing::debug;

struct PendingOperation<T> {
    correlation_id: String,
    tx: oneshot::Sender<ApiResult<T>>,
}

/// At most one externally-completed operation in flight per slot.
pub struct PendingOperations<T> {
    slot: Mutex<Option<PendingOperation<T>>>,
    /// Slot name, only used in log lines.
    name: &'static str,
}

impl<T> PendingOperations<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            slot: Mutex::new(None),
            name,
        }
    }

    /// Install a new pending operation and return its awaiter.
    ///
    /// Any prior operation in the slot is resolved with a `Cancelled` failure
    /// before the new one is installed.
    pub fn begin(&self, correlation_id: impl Into<String>) -> oneshot::Receiver<ApiResult<T>> {
        let correlation_id = correlation_id.into();
        let mut guard = self.slot.lock().expect("lock poisoned");
        if let Some(old) = guard.take() {
            debug!(
                slot = self.name,
                correlation_id = %old.correlation_id,
                "superseding pending operation"
            );
            let _ = old
                .tx
                .send(Err(ApiError::Cancelled("superseded by new operation".to_string())));
        }
        let (tx, rx) = oneshot::channel();
        *guard = Some(PendingOperation { correlation_id, tx });
        rx
    }

    /// Resolve the current operation, if any, and clear the slot.
    ///
    /// Resolving an empty slot is a logged no-op: the callback may
    /// legitimately arrive after cancellation.
    pub fn resolve(&self, result: ApiResult<T>) {
        match self.slot.lock().expect("lock poisoned").take() {
            Some(op) => {
                if op.tx.send(result).is_err() {
                    debug!(
                        slot = self.name,
                        correlation_id = %op.correlation_id,
                        "awaiter dropped before resolution"
                    );
                }
            }
            None => {
                debug!(slot = self.name, "resolve with no pending operation, ignoring");
            }
        }
    }

    /// Resolve only if the given correlation id still owns the slot.
    pub fn resolve_for(&self, correlation_id: &str, result: ApiResult<T>) {
        let mut guard = self.slot.lock().expect("lock poisoned");
        match guard.as_ref() {
            Some(op) if op.correlation_id == correlation_id => {
                let op = guard.take().expect("slot checked above");
                if op.tx.send(result).is_err() {
                    debug!(
                        slot = self.name,
                        correlation_id = correlation_id,
                        "awaiter dropped before resolution"
                    );
                }
            }
            _ => {
                debug!(
                    slot = self.name,
                    correlation_id = correlation_id,
                    "stale resolve for superseded operation, ignoring"
                );
            }
        }
    }

    /// Caller-driven cancellation, semantically a supersede without a successor.
    pub fn cancel(&self, reason: &str) {
        self.resolve(Err(ApiError::Cancelled(reason.to_string())));
    }

    /// Correlation id of the pending operation, if one exists.
    pub fn current_id(&self) -> Option<String> {
        self.slot
            .lock()
            .expect("lock poisoned")
            .as_ref()
            .map(|op| op.correlation_id.clone())
    }
}
