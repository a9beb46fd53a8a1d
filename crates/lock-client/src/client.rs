//! [`LockClient`]: acquire, release, and check record locks.

use std::sync::Arc;
use std::time::Duration;

use crm_core::locking::{
    validate_lock_duration, EntityRef, DEFAULT_LOCK_DURATION_MINS, LOCK_POLL_INTERVAL_SECS,
};
use crm_core::types::{system_clock, Clock};
use tokio::sync::broadcast;

use crate::backend::{HttpLockBackend, LockBackend};
use crate::cache::{LockObservation, LockState, LockStatusCache};
use crate::config::ClientConfig;
use crate::error::LockClientError;
use crate::lease::EditLease;
use crate::watcher::LockWatcher;

/// Mediates between edit-mode transitions and the lock service.
///
/// Cheap to clone; clones share the backend and the status cache. The
/// client never decides ownership itself: a `false` from acquire is the
/// only concurrency signal, and callers branch on it.
pub struct LockClient<B = HttpLockBackend> {
    backend: Arc<B>,
    cache: Arc<LockStatusCache>,
    clock: Clock,
    poll_interval: Duration,
    default_duration_mins: i64,
}

impl<B> Clone for LockClient<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            cache: Arc::clone(&self.cache),
            clock: Arc::clone(&self.clock),
            poll_interval: self.poll_interval,
            default_duration_mins: self.default_duration_mins,
        }
    }
}

impl LockClient<HttpLockBackend> {
    /// Build an HTTP client from configuration.
    pub fn from_config(config: ClientConfig) -> Result<Self, LockClientError> {
        let backend = HttpLockBackend::new(&config)?;
        Ok(Self::with_backend(backend)
            .with_poll_interval(config.poll_interval)
            .with_default_duration(config.default_lock_duration_mins))
    }
}

impl<B: LockBackend + 'static> LockClient<B> {
    /// Wrap a backend with protocol defaults (30 s polling, 15 min locks).
    pub fn with_backend(backend: B) -> Self {
        Self {
            backend: Arc::new(backend),
            cache: Arc::new(LockStatusCache::new()),
            clock: system_clock(),
            poll_interval: Duration::from_secs(LOCK_POLL_INTERVAL_SECS),
            default_duration_mins: DEFAULT_LOCK_DURATION_MINS,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_default_duration(mut self, minutes: i64) -> Self {
        self.default_duration_mins = minutes;
        self
    }

    /// Clock used to stamp observations and to age out cached locks.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Ask the lock service for the lock on an entity.
    ///
    /// `Ok(false)` means another user holds it; that is a normal outcome,
    /// not an error. On `Ok(true)` the cached status for the entity is
    /// invalidated.
    pub async fn acquire(
        &self,
        entity_type: &str,
        entity_id: &str,
        duration_minutes: i64,
    ) -> Result<bool, LockClientError> {
        let entity = EntityRef::new(entity_type, entity_id);
        self.acquire_entity(&entity, duration_minutes).await
    }

    /// [`acquire`](Self::acquire) with the configured default duration.
    pub async fn acquire_default(
        &self,
        entity_type: &str,
        entity_id: &str,
    ) -> Result<bool, LockClientError> {
        self.acquire(entity_type, entity_id, self.default_duration_mins)
            .await
    }

    /// Release the caller's lock on an entity.
    ///
    /// `Ok(false)` means the caller held no active lock; the end state is the
    /// same either way.
    pub async fn release(
        &self,
        entity_type: &str,
        entity_id: &str,
    ) -> Result<bool, LockClientError> {
        let entity = EntityRef::new(entity_type, entity_id);
        self.release_entity(&entity).await
    }

    /// Ask whether someone else holds the lock on an entity.
    ///
    /// If the lock service cannot be reached, the last known answer is
    /// returned with `stale: true`. The transport error only propagates when
    /// there is no earlier answer to fall back on.
    pub async fn check_lock(
        &self,
        entity_type: &str,
        entity_id: &str,
    ) -> Result<LockObservation, LockClientError> {
        let entity = EntityRef::new(entity_type, entity_id);
        entity.validate().map_err(LockClientError::Validation)?;
        self.check_entity(&entity).await
    }

    /// The cached state for an entity, without contacting the lock service.
    pub async fn cached_state(&self, entity_type: &str, entity_id: &str) -> LockState {
        let entity = EntityRef::new(entity_type, entity_id);
        match self.cache.get(&entity).await {
            Some(observation) => observation.state.settle((self.clock)()),
            None => LockState::Unknown,
        }
    }

    /// Start polling lock status for an entity every poll interval, and
    /// right away whenever this client acquires or releases it.
    ///
    /// Polling stops when the returned watcher is dropped. Outside a tokio
    /// runtime this returns [`LockClientError::NoRuntime`].
    pub fn watch(&self, entity_type: &str, entity_id: &str) -> Result<LockWatcher, LockClientError> {
        let entity = EntityRef::new(entity_type, entity_id);
        entity.validate().map_err(LockClientError::Validation)?;
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|_| LockClientError::NoRuntime("a lock watcher"))?;
        Ok(LockWatcher::spawn(
            &runtime,
            self.clone(),
            entity,
            self.poll_interval,
        ))
    }

    /// Acquire with the default duration and wrap a granted lock in an
    /// [`EditLease`]. `Ok(None)` means another user holds the lock.
    pub async fn begin_edit(
        &self,
        entity_type: &str,
        entity_id: &str,
    ) -> Result<Option<EditLease<B>>, LockClientError> {
        let entity = EntityRef::new(entity_type, entity_id);
        if !self
            .acquire_entity(&entity, self.default_duration_mins)
            .await?
        {
            return Ok(None);
        }
        Ok(Some(EditLease::new(self.clone(), entity)))
    }

    // ---- entity-level operations, shared with watchers and leases ----

    /// Entities this client invalidates (after a granted acquire or a
    /// release) from now on.
    pub(crate) fn local_changes(&self) -> broadcast::Receiver<EntityRef> {
        self.cache.subscribe()
    }

    pub(crate) async fn acquire_entity(
        &self,
        entity: &EntityRef,
        duration_minutes: i64,
    ) -> Result<bool, LockClientError> {
        entity.validate().map_err(LockClientError::Validation)?;
        validate_lock_duration(duration_minutes).map_err(LockClientError::Validation)?;

        let acquired = self
            .backend
            .acquire_record_lock(entity, duration_minutes)
            .await
            .inspect_err(|e| {
                tracing::error!(entity = %entity, error = %e, "Lock acquire failed");
            })?;

        if acquired {
            self.cache.invalidate(entity).await;
            tracing::info!(entity = %entity, duration_mins = duration_minutes, "Lock acquired");
        } else {
            tracing::debug!(entity = %entity, "Lock held by another user");
        }
        Ok(acquired)
    }

    pub(crate) async fn release_entity(&self, entity: &EntityRef) -> Result<bool, LockClientError> {
        entity.validate().map_err(LockClientError::Validation)?;

        let released = self
            .backend
            .release_record_lock(entity)
            .await
            .inspect_err(|e| {
                tracing::error!(entity = %entity, error = %e, "Lock release failed");
            })?;

        if released {
            self.cache.invalidate(entity).await;
            tracing::info!(entity = %entity, "Lock released");
        } else {
            tracing::debug!(entity = %entity, "No active lock held to release");
        }
        Ok(released)
    }

    pub(crate) async fn check_entity(
        &self,
        entity: &EntityRef,
    ) -> Result<LockObservation, LockClientError> {
        match self.backend.is_record_locked_by_other(entity).await {
            Ok(status) => {
                let observation =
                    LockObservation::fresh(LockState::from_status(status), (self.clock)());
                self.cache.store(entity.clone(), observation.clone()).await;
                Ok(observation)
            }
            Err(err) if err.is_transport() => match self.cache.get(entity).await {
                Some(last) => {
                    tracing::warn!(
                        entity = %entity,
                        error = %err,
                        "Lock status unavailable, serving last known value"
                    );
                    Ok(last.into_stale((self.clock)()))
                }
                None => {
                    tracing::error!(entity = %entity, error = %err, "Lock status check failed");
                    Err(err)
                }
            },
            Err(err) => {
                tracing::error!(entity = %entity, error = %err, "Lock status check failed");
                Err(err)
            }
        }
    }
}
