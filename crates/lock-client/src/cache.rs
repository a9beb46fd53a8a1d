//! Read cache of lock status.
//!
//! Holds only what the last `is_record_locked_by_other` call said, per
//! entity. It never records "I hold this lock": ownership is only ever
//! decided by the lock service, so acquire and release always go to it.

use std::collections::HashMap;

use crm_core::locking::{EntityRef, LockHolder, LockStatus};
use crm_core::types::Timestamp;
use tokio::sync::{broadcast, RwLock};

/// What the client currently believes about an entity's lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockState {
    /// Never fetched, or invalidated by an acquire/release since.
    Unknown,
    /// Another user holds an unexpired lock.
    LockedByOther {
        holder: Option<LockHolder>,
        locked_at: Option<Timestamp>,
        expires_at: Option<Timestamp>,
    },
    /// Unlocked, or locked by the caller.
    Available,
}

impl LockState {
    pub fn from_status(status: LockStatus) -> Self {
        if status.locked {
            LockState::LockedByOther {
                holder: status.locked_by,
                locked_at: status.locked_at,
                expires_at: status.expires_at,
            }
        } else {
            LockState::Available
        }
    }

    /// Treat a lock whose `expires_at` has passed as gone.
    pub fn settle(self, now: Timestamp) -> Self {
        match self {
            LockState::LockedByOther {
                expires_at: Some(expires_at),
                ..
            } if expires_at <= now => LockState::Available,
            other => other,
        }
    }

    pub fn is_locked_by_other(&self) -> bool {
        matches!(self, LockState::LockedByOther { .. })
    }
}

/// A lock state plus how it was obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockObservation {
    pub state: LockState,
    /// When the lock service last answered for this entity.
    pub observed_at: Option<Timestamp>,
    /// `true` when the lock service could not be reached and this is the
    /// last known answer.
    pub stale: bool,
}

impl LockObservation {
    pub fn unknown() -> Self {
        Self {
            state: LockState::Unknown,
            observed_at: None,
            stale: false,
        }
    }

    pub fn fresh(state: LockState, observed_at: Timestamp) -> Self {
        Self {
            state,
            observed_at: Some(observed_at),
            stale: false,
        }
    }

    /// This observation re-served after a failed refresh at `now`.
    pub fn into_stale(self, now: Timestamp) -> Self {
        Self {
            state: self.state.settle(now),
            observed_at: self.observed_at,
            stale: true,
        }
    }
}

/// Entities a cache holds before the oldest observation is evicted.
pub const DEFAULT_CACHE_CAPACITY: usize = 1024;

/// Invalidations buffered per watcher before it falls behind and simply
/// refreshes.
const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// Per-entity lock observations, shared by a client and its watchers.
///
/// Bounded: storing a new entity into a full cache evicts the entry observed
/// longest ago. Every invalidation is also broadcast so running
/// [`LockWatcher`](crate::LockWatcher)s re-check instead of republishing a
/// view the caller just changed.
#[derive(Debug)]
pub struct LockStatusCache {
    entries: RwLock<HashMap<EntityRef, LockObservation>>,
    capacity: usize,
    changes: broadcast::Sender<EntityRef>,
}

impl Default for LockStatusCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }
}

impl LockStatusCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// A cache holding at most `capacity` entities (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            entries: RwLock::new(HashMap::new()),
            capacity: capacity.max(1),
            changes,
        }
    }

    pub async fn get(&self, entity: &EntityRef) -> Option<LockObservation> {
        self.entries.read().await.get(entity).cloned()
    }

    pub async fn store(&self, entity: EntityRef, observation: LockObservation) {
        let mut entries = self.entries.write().await;
        if !entries.contains_key(&entity) && entries.len() >= self.capacity {
            let oldest = entries
                .iter()
                .min_by_key(|(_, cached)| cached.observed_at)
                .map(|(key, _)| key.clone());
            if let Some(oldest) = oldest {
                entries.remove(&oldest);
                tracing::debug!(entity = %oldest, "Lock status cache full, evicted oldest entry");
            }
        }
        entries.insert(entity, observation);
    }

    /// Forget the entity so the next read reflects the lock service again,
    /// and tell watchers of it to re-check. Returns `true` if something was
    /// cached.
    pub async fn invalidate(&self, entity: &EntityRef) -> bool {
        let removed = self.entries.write().await.remove(entity).is_some();
        // No receivers just means nobody is watching.
        let _ = self.changes.send(entity.clone());
        removed
    }

    /// Entities invalidated from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<EntityRef> {
        self.changes.subscribe()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
