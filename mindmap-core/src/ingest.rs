//! Summary Ingestion Adapter.
//!
//! Normalizes the cumulative snapshots of one in-flight summarization
//! exchange into a single queryable [`ExtractionState`] and notifies
//! dependents on every accepted change. Each arriving snapshot is the whole
//! extraction so far, not a delta, so the latest accepted one is always the
//! most complete. Delivery order is not taken on faith: snapshots carry a
//! sequence number and anything at or below the last accepted seq is
//! rejected as stale.

use std::sync::Mutex;

use tokio::sync::watch;
use tracing::warn;

use crate::error::{MindMapError, Result};
use crate::extraction::{ExtractionPhase, ExtractionSnapshot, ExtractionState};

const SEQ_TERMINAL: u64 = u64::MAX;

struct AdapterInner {
    last_seq: u64,
    state: ExtractionState,
}

/// Owns the extraction state for one exchange, from first partial snapshot
/// to completion or failure. Writes are serialized internally, so the
/// adapter can be shared with the exchange driver behind an `Arc`.
pub struct IngestionAdapter {
    inner: Mutex<AdapterInner>,
    tx: watch::Sender<ExtractionState>,
}

impl IngestionAdapter {
    pub fn new() -> Self {
        let state = ExtractionState::default();
        let (tx, _rx) = watch::channel(state.clone());
        Self {
            inner: Mutex::new(AdapterInner { last_seq: 0, state }),
            tx,
        }
    }

    /// Apply one cumulative partial snapshot. `seq` must be strictly greater
    /// than the last accepted sequence number; late, duplicate, or
    /// post-terminal deliveries are rejected.
    pub fn apply(&self, seq: u64, snapshot: ExtractionSnapshot) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if seq <= inner.last_seq {
            warn!(seq, last = inner.last_seq, "rejecting stale snapshot");
            return Err(MindMapError::StaleSnapshot {
                last: inner.last_seq,
                got: seq,
            });
        }
        inner.last_seq = seq;
        inner.state = ExtractionState::streaming(snapshot);
        self.tx.send_replace(inner.state.clone());
        Ok(())
    }

    /// Terminate the exchange with its final snapshot. The snapshot must
    /// pass schema validation; on failure the partial state is discarded
    /// and the error propagated — a snapshot that failed validation is
    /// never rendered, not even partially.
    pub fn complete(&self, seq: u64, snapshot: ExtractionSnapshot) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if seq <= inner.last_seq {
            return Err(MindMapError::StaleSnapshot {
                last: inner.last_seq,
                got: seq,
            });
        }
        inner.last_seq = SEQ_TERMINAL;

        if let Err(e) = snapshot.validate() {
            inner.state = failed_state();
            self.tx.send_replace(inner.state.clone());
            return Err(e);
        }

        inner.state = ExtractionState::complete(snapshot);
        self.tx.send_replace(inner.state.clone());
        Ok(())
    }

    /// Record an upstream failure, discarding whatever partial state was
    /// held so far.
    pub fn fail(&self, reason: &str) {
        warn!(reason, "extraction failed, discarding partial state");
        let mut inner = self.inner.lock().unwrap();
        inner.last_seq = SEQ_TERMINAL;
        inner.state = failed_state();
        self.tx.send_replace(inner.state.clone());
    }

    /// Latest normalized extraction state.
    pub fn current(&self) -> ExtractionState {
        self.inner.lock().unwrap().state.clone()
    }

    pub fn phase(&self) -> ExtractionPhase {
        self.inner.lock().unwrap().state.phase
    }

    /// Receiver notified on every accepted change.
    pub fn subscribe(&self) -> watch::Receiver<ExtractionState> {
        self.tx.subscribe()
    }
}

impl Default for IngestionAdapter {
    fn default() -> Self {
        Self::new()
    }
}

fn failed_state() -> ExtractionState {
    ExtractionState {
        snapshot: ExtractionSnapshot::default(),
        phase: ExtractionPhase::Failed,
    }
}
