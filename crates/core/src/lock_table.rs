//! In-memory lock arbitration.
//!
//! [`LockTable`] holds at most one record per [`EntityRef`] and decides every
//! acquire / release / status question against an explicit `now`, so callers
//! own the clock. A record whose `expires_at` has passed is treated as absent
//! by every operation; [`LockTable::purge_expired`] only reclaims memory.

use std::collections::HashMap;

use crate::error::CoreError;
use crate::locking::{validate_lock_duration, EntityRef, LockHolder, LockStatus, RecordLock};
use crate::types::{Timestamp, UserId};

/// Exclusive, expiring locks keyed by entity.
#[derive(Debug, Default)]
pub struct LockTable {
    locks: HashMap<EntityRef, RecordLock>,
}

impl LockTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Try to take the lock on `entity` for `holder`.
    ///
    /// Returns `Ok(true)` when the entity was free, its lock had expired, or
    /// `holder` already held it (the expiry is then pushed out; `locked_at`
    /// is kept). Returns `Ok(false)` when another identity holds an unexpired
    /// lock.
    pub fn acquire(
        &mut self,
        entity: &EntityRef,
        holder: &LockHolder,
        duration_minutes: i64,
        now: Timestamp,
    ) -> Result<bool, CoreError> {
        entity.validate().map_err(CoreError::Validation)?;
        validate_lock_duration(duration_minutes).map_err(CoreError::Validation)?;

        let expires_at = now + chrono::Duration::minutes(duration_minutes);

        if let Some(existing) = self.locks.get_mut(entity) {
            if !existing.is_expired(now) {
                if existing.locked_by.id != holder.id {
                    return Ok(false);
                }
                existing.locked_by = holder.clone();
                existing.expires_at = expires_at;
                return Ok(true);
            }
        }

        self.locks.insert(
            entity.clone(),
            RecordLock {
                entity_type: entity.entity_type.clone(),
                entity_id: entity.entity_id.clone(),
                locked_by: holder.clone(),
                locked_at: now,
                expires_at,
            },
        );
        Ok(true)
    }

    /// Release `entity` if `holder_id` holds an unexpired lock on it.
    ///
    /// Returns `Ok(false)` for a missing lock, an expired lock, or a lock held
    /// by someone else.
    pub fn release(
        &mut self,
        entity: &EntityRef,
        holder_id: UserId,
        now: Timestamp,
    ) -> Result<bool, CoreError> {
        entity.validate().map_err(CoreError::Validation)?;

        let Some(existing) = self.locks.get(entity) else {
            return Ok(false);
        };
        if existing.is_expired(now) {
            self.locks.remove(entity);
            return Ok(false);
        }
        if existing.locked_by.id != holder_id {
            return Ok(false);
        }
        self.locks.remove(entity);
        Ok(true)
    }

    /// Drop the lock on `entity` whoever holds it. Returns `true` if an
    /// unexpired lock was removed.
    pub fn force_release(&mut self, entity: &EntityRef, now: Timestamp) -> Result<bool, CoreError> {
        entity.validate().map_err(CoreError::Validation)?;

        Ok(self
            .locks
            .remove(entity)
            .is_some_and(|lock| !lock.is_expired(now)))
    }

    /// Lock status of `entity` as seen by `caller`.
    ///
    /// A lock held by `caller` reads as unlocked: the caller is free to edit.
    pub fn locked_by_other(
        &self,
        entity: &EntityRef,
        caller: UserId,
        now: Timestamp,
    ) -> Result<LockStatus, CoreError> {
        entity.validate().map_err(CoreError::Validation)?;

        Ok(match self.get_active(entity, now) {
            Some(lock) if lock.locked_by.id != caller => LockStatus::held_by(lock),
            _ => LockStatus::unlocked(),
        })
    }

    /// The unexpired lock on `entity`, if any.
    pub fn get_active(&self, entity: &EntityRef, now: Timestamp) -> Option<&RecordLock> {
        self.locks.get(entity).filter(|lock| !lock.is_expired(now))
    }

    /// All unexpired locks, soonest expiry first.
    pub fn active_locks(&self, now: Timestamp) -> Vec<RecordLock> {
        let mut locks: Vec<RecordLock> = self
            .locks
            .values()
            .filter(|lock| !lock.is_expired(now))
            .cloned()
            .collect();
        locks.sort_by(|a, b| {
            a.expires_at
                .cmp(&b.expires_at)
                .then_with(|| a.entity_type.cmp(&b.entity_type))
                .then_with(|| a.entity_id.cmp(&b.entity_id))
        });
        locks
    }

    pub fn active_count(&self, now: Timestamp) -> usize {
        self.locks.values().filter(|lock| !lock.is_expired(now)).count()
    }

    /// Remove expired records. Returns the number removed.
    pub fn purge_expired(&mut self, now: Timestamp) -> usize {
        let before = self.locks.len();
        self.locks.retain(|_, lock| !lock.is_expired(now));
        before - self.locks.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::{Duration, TimeZone, Utc};
    use uuid::Uuid;

    fn t0() -> Timestamp {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()
    }

    fn holder(name: &str) -> LockHolder {
        LockHolder {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
        }
    }

    fn lead(id: &str) -> EntityRef {
        EntityRef::new("lead", id)
    }

    #[test]
    fn test_acquire_free_entity() {
        let mut table = LockTable::new();
        let alice = holder("Alice");

        assert!(table.acquire(&lead("1"), &alice, 15, t0()).unwrap());

        let lock = table.get_active(&lead("1"), t0()).unwrap();
        assert_eq!(lock.locked_by, alice);
        assert_eq!(lock.locked_at, t0());
        assert_eq!(lock.expires_at, t0() + Duration::minutes(15));
    }

    #[test]
    fn test_second_identity_is_refused_before_expiry() {
        let mut table = LockTable::new();
        let alice = holder("Alice");
        let bob = holder("Bob");

        assert!(table.acquire(&lead("1"), &alice, 15, t0()).unwrap());
        assert!(!table
            .acquire(&lead("1"), &bob, 15, t0() + Duration::minutes(14))
            .unwrap());

        let lock = table.get_active(&lead("1"), t0()).unwrap();
        assert_eq!(lock.locked_by.id, alice.id);
    }

    #[test]
    fn test_reacquire_by_holder_refreshes_expiry() {
        let mut table = LockTable::new();
        let alice = holder("Alice");
        let later = t0() + Duration::minutes(10);

        table.acquire(&lead("1"), &alice, 15, t0()).unwrap();
        assert!(table.acquire(&lead("1"), &alice, 15, later).unwrap());

        let lock = table.get_active(&lead("1"), later).unwrap();
        assert_eq!(lock.locked_at, t0());
        assert_eq!(lock.expires_at, later + Duration::minutes(15));
    }

    #[test]
    fn test_expired_lock_transfers_to_new_identity() {
        let mut table = LockTable::new();
        let alice = holder("Alice");
        let bob = holder("Bob");
        let after_expiry = t0() + Duration::minutes(15);

        table.acquire(&lead("1"), &alice, 15, t0()).unwrap();
        assert!(table.acquire(&lead("1"), &bob, 15, after_expiry).unwrap());

        let lock = table.get_active(&lead("1"), after_expiry).unwrap();
        assert_eq!(lock.locked_by.id, bob.id);
        assert_eq!(lock.locked_at, after_expiry);
    }

    #[test]
    fn test_release_by_holder_frees_entity() {
        let mut table = LockTable::new();
        let alice = holder("Alice");
        let bob = holder("Bob");

        table.acquire(&lead("1"), &alice, 15, t0()).unwrap();
        assert!(table.release(&lead("1"), alice.id, t0()).unwrap());
        assert!(table.acquire(&lead("1"), &bob, 15, t0()).unwrap());
    }

    #[test]
    fn test_release_not_held_returns_false() {
        let mut table = LockTable::new();
        let alice = holder("Alice");
        let bob = holder("Bob");

        assert!(!table.release(&lead("1"), alice.id, t0()).unwrap());

        table.acquire(&lead("1"), &alice, 15, t0()).unwrap();
        assert!(!table.release(&lead("1"), bob.id, t0()).unwrap());
        assert!(table.get_active(&lead("1"), t0()).is_some());
    }

    #[test]
    fn test_release_of_expired_lock_returns_false() {
        let mut table = LockTable::new();
        let alice = holder("Alice");

        table.acquire(&lead("1"), &alice, 1, t0()).unwrap();
        assert!(!table
            .release(&lead("1"), alice.id, t0() + Duration::minutes(2))
            .unwrap());
    }

    #[test]
    fn test_status_for_holder_reads_unlocked() {
        let mut table = LockTable::new();
        let alice = holder("Alice");

        table.acquire(&lead("1"), &alice, 15, t0()).unwrap();
        let status = table.locked_by_other(&lead("1"), alice.id, t0()).unwrap();
        assert_eq!(status, LockStatus::unlocked());
    }

    #[test]
    fn test_status_for_other_identity_reports_holder() {
        let mut table = LockTable::new();
        let alice = holder("Alice");
        let bob = holder("Bob");

        table.acquire(&lead("1"), &alice, 15, t0()).unwrap();
        let status = table.locked_by_other(&lead("1"), bob.id, t0()).unwrap();
        assert!(status.locked);
        assert_eq!(status.locked_by, Some(alice));
        assert_eq!(status.locked_at, Some(t0()));
        assert_eq!(status.expires_at, Some(t0() + Duration::minutes(15)));
    }

    #[test]
    fn test_status_of_never_locked_entity() {
        let table = LockTable::new();
        let status = table.locked_by_other(&lead("404"), Uuid::new_v4(), t0()).unwrap();
        assert_eq!(status, LockStatus::unlocked());
    }

    #[test]
    fn test_status_of_expired_lock_reads_unlocked() {
        let mut table = LockTable::new();
        let alice = holder("Alice");

        table.acquire(&lead("1"), &alice, 15, t0()).unwrap();
        let status = table
            .locked_by_other(&lead("1"), Uuid::new_v4(), t0() + Duration::minutes(16))
            .unwrap();
        assert!(!status.locked);
    }

    #[test]
    fn test_locks_are_scoped_by_entity_type() {
        let mut table = LockTable::new();
        let alice = holder("Alice");
        let bob = holder("Bob");

        table.acquire(&lead("1"), &alice, 15, t0()).unwrap();
        assert!(table
            .acquire(&EntityRef::new("opportunity", "1"), &bob, 15, t0())
            .unwrap());
        assert_eq!(table.active_count(t0()), 2);
    }

    #[test]
    fn test_force_release_ignores_holder() {
        let mut table = LockTable::new();
        let alice = holder("Alice");

        table.acquire(&lead("1"), &alice, 15, t0()).unwrap();
        assert!(table.force_release(&lead("1"), t0()).unwrap());
        assert!(!table.force_release(&lead("1"), t0()).unwrap());
    }

    #[test]
    fn test_purge_only_drops_expired_records() {
        let mut table = LockTable::new();
        let alice = holder("Alice");

        table.acquire(&lead("1"), &alice, 1, t0()).unwrap();
        table.acquire(&lead("2"), &alice, 30, t0()).unwrap();

        let purged = table.purge_expired(t0() + Duration::minutes(5));
        assert_eq!(purged, 1);
        assert_eq!(table.active_locks(t0() + Duration::minutes(5)).len(), 1);
    }

    #[test]
    fn test_active_locks_sorted_by_expiry() {
        let mut table = LockTable::new();
        let alice = holder("Alice");

        table.acquire(&lead("slow"), &alice, 60, t0()).unwrap();
        table.acquire(&lead("fast"), &alice, 5, t0()).unwrap();

        let ids: Vec<_> = table
            .active_locks(t0())
            .into_iter()
            .map(|lock| lock.entity_id)
            .collect();
        assert_eq!(ids, vec!["fast", "slow"]);
    }

    #[test]
    fn test_invalid_input_is_a_validation_error() {
        let mut table = LockTable::new();
        let alice = holder("Alice");

        assert_matches!(
            table.acquire(&EntityRef::new("invoice", "1"), &alice, 15, t0()),
            Err(CoreError::Validation(_))
        );
        assert_matches!(
            table.acquire(&lead("1"), &alice, 0, t0()),
            Err(CoreError::Validation(_))
        );
        assert_matches!(
            table.release(&lead(""), alice.id, t0()),
            Err(CoreError::Validation(_))
        );
    }
}
