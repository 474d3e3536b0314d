//! Asynchronous analysis query cache.
//!
//! Owns the set of cache entries and the bookkeeping for in-flight
//! requests. The rules it enforces:
//!
//! - **At most one in-flight request per key.** Re-deriving a key whose
//!   entry is pending joins the existing request instead of issuing a
//!   duplicate call.
//! - **Freshness window.** A settled entry younger than the window is
//!   reused without a new call, even on explicit re-request; older entries
//!   refetch.
//! - **Failures retry only on explicit request.** No background retry loop
//!   against a potentially slow engine.
//! - **Late completions are recorded, never trusted.** Whether a completion
//!   may be rendered is the caller's decision, made by comparing against
//!   the currently derived key at resolution time.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::analysis::key::RequestKey;
use crate::analysis::AnalysisPayload;
use crate::error::BackendError;

/// Lifecycle of one cached query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStatus {
    Pending,
    Settled,
    Failed,
}

/// One query's cached state.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: RequestKey,
    pub status: EntryStatus,
    pub payload: Option<AnalysisPayload>,
    pub error: Option<BackendError>,
    pub issued_at: Instant,
    pub settled_at: Option<Instant>,
}

impl CacheEntry {
    fn pending(key: RequestKey) -> Self {
        Self {
            key,
            status: EntryStatus::Pending,
            payload: None,
            error: None,
            issued_at: Instant::now(),
            settled_at: None,
        }
    }
}

/// What the caller should do after asking for a key.
#[derive(Debug, Clone)]
pub enum BeginOutcome {
    /// A settled entry inside the freshness window; use it, issue nothing.
    Fresh(AnalysisPayload),
    /// The key is already being fetched; wait for that completion.
    InFlight,
    /// A pending entry was created; the caller must issue the fetch.
    Issue,
}

/// Entry store keyed by [`RequestKey`].
#[derive(Debug)]
pub struct AnalysisCache {
    entries: HashMap<RequestKey, CacheEntry>,
    freshness_window: Duration,
}

impl AnalysisCache {
    pub fn new(freshness_window: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            freshness_window,
        }
    }

    /// Ask for `key`, creating a pending entry when a fetch is needed.
    pub fn begin(&mut self, key: &RequestKey) -> BeginOutcome {
        if let Some(entry) = self.entries.get(key) {
            match entry.status {
                EntryStatus::Pending => return BeginOutcome::InFlight,
                EntryStatus::Settled => {
                    let fresh = entry
                        .settled_at
                        .is_some_and(|at| at.elapsed() < self.freshness_window);
                    if fresh {
                        if let Some(payload) = &entry.payload {
                            return BeginOutcome::Fresh(payload.clone());
                        }
                    }
                    // Stale: fall through and refetch.
                }
                EntryStatus::Failed => {
                    // Explicit re-request is the retry path.
                }
            }
        }
        self.entries
            .insert(key.clone(), CacheEntry::pending(key.clone()));
        BeginOutcome::Issue
    }

    /// Record a completion.
    ///
    /// An entry invalidated while its fetch was in flight is re-created as
    /// settled so the payload can still be reused if the same key recurs.
    pub fn settle(&mut self, key: &RequestKey, outcome: Result<AnalysisPayload, BackendError>) {
        let entry = self
            .entries
            .entry(key.clone())
            .or_insert_with(|| CacheEntry::pending(key.clone()));
        entry.settled_at = Some(Instant::now());
        match outcome {
            Ok(payload) => {
                entry.status = EntryStatus::Settled;
                entry.payload = Some(payload);
                entry.error = None;
            }
            Err(error) => {
                entry.status = EntryStatus::Failed;
                entry.payload = None;
                entry.error = Some(error);
            }
        }
    }

    pub fn get(&self, key: &RequestKey) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    /// Drop every entry matching the predicate; returns how many were
    /// dropped. Used when the position or parameters move on, so superseded
    /// in-flight entries do not accumulate.
    pub fn invalidate<F>(&mut self, predicate: F) -> usize
    where
        F: Fn(&RequestKey) -> bool,
    {
        let before = self.entries.len();
        self.entries.retain(|key, _| !predicate(key));
        before - self.entries.len()
    }

    pub fn pending_count(&self) -> usize {
        self.entries
            .values()
            .filter(|entry| entry.status == EntryStatus::Pending)
            .count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
