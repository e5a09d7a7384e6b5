//! Per-participant history of decoded positions.
//!
//! Decoding always reports into a [`PositionRegistry`]; which retention policy
//! applies is up to the registry the caller passes in.
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use once_cell::sync::Lazy;

use crate::record::ParticipantPosition;

/// Sink for positions produced by [`ParticipantPosition::decode`].
///
/// Implementations are shared between decoding threads, so every method takes
/// `&self` and must synchronize internally.
pub trait PositionRegistry: Send + Sync {
    /// Append `position` to the history of `mpid`.
    fn record(&self, mpid: &str, position: ParticipantPosition);

    /// Retained positions for `mpid` in decode order. Empty if never seen.
    fn history(&self, mpid: &str) -> Vec<ParticipantPosition>;

    /// Most recently recorded position for `mpid`.
    fn latest(&self, mpid: &str) -> Option<ParticipantPosition> {
        self.history(mpid).pop()
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    // Inserts are single pushes, a panic elsewhere cannot leave a torn entry.
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

static GLOBAL: Lazy<ParticipantRegistry> = Lazy::new(ParticipantRegistry::new);

/// Unbounded, append-only registry. Entries are never removed.
#[derive(Debug, Default)]
pub struct ParticipantRegistry {
    inner: Mutex<HashMap<String, Vec<ParticipantPosition>>>,
}

impl ParticipantRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide instance, created empty on first use.
    pub fn global() -> &'static ParticipantRegistry {
        &GLOBAL
    }

    /// Every MPID seen so far, sorted.
    pub fn participants(&self) -> Vec<String> {
        let mut ids: Vec<String> = lock(&self.inner).keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Number of distinct participants.
    pub fn len(&self) -> usize {
        lock(&self.inner).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.inner).is_empty()
    }

    /// Number of positions across all participants.
    pub fn total_positions(&self) -> usize {
        lock(&self.inner).values().map(Vec::len).sum()
    }
}

impl PositionRegistry for ParticipantRegistry {
    fn record(&self, mpid: &str, position: ParticipantPosition) {
        lock(&self.inner).entry(mpid.to_string()).or_default().push(position);
    }

    fn history(&self, mpid: &str) -> Vec<ParticipantPosition> {
        lock(&self.inner).get(mpid).cloned().unwrap_or_default()
    }

    fn latest(&self, mpid: &str) -> Option<ParticipantPosition> {
        lock(&self.inner).get(mpid).and_then(|h| h.last().cloned())
    }
}

/// Keeps only the `capacity` most recent positions per participant.
#[derive(Debug)]
pub struct BoundedRegistry {
    capacity: usize,
    inner: Mutex<HashMap<String, VecDeque<ParticipantPosition>>>,
}

impl BoundedRegistry {
    /// A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        Self { capacity: capacity.max(1), inner: Mutex::new(HashMap::new()) }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl PositionRegistry for BoundedRegistry {
    fn record(&self, mpid: &str, position: ParticipantPosition) {
        let mut map = lock(&self.inner);
        let ring = map.entry(mpid.to_string()).or_default();
        if ring.len() == self.capacity {
            ring.pop_front();
        }
        ring.push_back(position);
    }

    fn history(&self, mpid: &str) -> Vec<ParticipantPosition> {
        lock(&self.inner).get(mpid).map(|r| r.iter().cloned().collect()).unwrap_or_default()
    }

    fn latest(&self, mpid: &str) -> Option<ParticipantPosition> {
        lock(&self.inner).get(mpid).and_then(|r| r.back().cloned())
    }
}
