//! Shared, async-safe wrapper around [`LockTable`].
//!
//! Every call reads the store's clock once and runs the whole decision under
//! a single mutex guard, so concurrent acquires for the same entity are
//! serialized and exactly one of them wins.

use crm_core::error::CoreError;
use crm_core::lock_table::LockTable;
use crm_core::locking::{EntityRef, LockHolder, LockStatus, RecordLock};
use crm_core::types::{system_clock, Clock, UserId};
use tokio::sync::Mutex;

pub struct LockStore {
    table: Mutex<LockTable>,
    clock: Clock,
}

impl LockStore {
    /// Create an empty store driven by the system clock.
    pub fn new() -> Self {
        Self::with_clock(system_clock())
    }

    /// Create an empty store driven by a custom clock.
    pub fn with_clock(clock: Clock) -> Self {
        Self {
            table: Mutex::new(LockTable::new()),
            clock,
        }
    }

    pub async fn acquire(
        &self,
        entity: &EntityRef,
        holder: &LockHolder,
        duration_minutes: i64,
    ) -> Result<bool, CoreError> {
        let now = (self.clock)();
        self.table
            .lock()
            .await
            .acquire(entity, holder, duration_minutes, now)
    }

    pub async fn release(&self, entity: &EntityRef, holder_id: UserId) -> Result<bool, CoreError> {
        let now = (self.clock)();
        self.table.lock().await.release(entity, holder_id, now)
    }

    pub async fn force_release(&self, entity: &EntityRef) -> Result<bool, CoreError> {
        let now = (self.clock)();
        self.table.lock().await.force_release(entity, now)
    }

    pub async fn locked_by_other(
        &self,
        entity: &EntityRef,
        caller: UserId,
    ) -> Result<LockStatus, CoreError> {
        let now = (self.clock)();
        self.table.lock().await.locked_by_other(entity, caller, now)
    }

    pub async fn active_locks(&self) -> Vec<RecordLock> {
        let now = (self.clock)();
        self.table.lock().await.active_locks(now)
    }

    pub async fn active_count(&self) -> usize {
        let now = (self.clock)();
        self.table.lock().await.active_count(now)
    }

    /// Drop expired records. Returns the number removed.
    pub async fn purge_expired(&self) -> usize {
        let now = (self.clock)();
        self.table.lock().await.purge_expired(now)
    }
}

impl Default for LockStore {
    fn default() -> Self {
        Self::new()
    }
}
