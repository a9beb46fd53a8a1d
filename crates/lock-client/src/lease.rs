//! [`EditLease`]: a granted lock scoped to one edit session.

use crm_core::locking::EntityRef;

use crate::backend::LockBackend;
use crate::client::LockClient;
use crate::error::LockClientError;

/// A lock the caller was granted by [`LockClient::begin_edit`].
///
/// Call [`finish`](Self::finish) when leaving edit mode. A lease dropped
/// without `finish` spawns a best-effort release on the current tokio
/// runtime; with no runtime the lock simply runs out at its expiry.
pub struct EditLease<B: LockBackend + 'static> {
    client: LockClient<B>,
    entity: EntityRef,
    finished: bool,
}

impl<B: LockBackend + 'static> EditLease<B> {
    pub(crate) fn new(client: LockClient<B>, entity: EntityRef) -> Self {
        Self {
            client,
            entity,
            finished: false,
        }
    }

    pub fn entity(&self) -> &EntityRef {
        &self.entity
    }

    /// Re-acquire to push the expiry out by `duration_minutes`.
    ///
    /// `Ok(false)` means the lock lapsed and someone else took it; the edit
    /// session should stop.
    pub async fn renew(&self, duration_minutes: i64) -> Result<bool, LockClientError> {
        self.client
            .acquire_entity(&self.entity, duration_minutes)
            .await
    }

    /// Release the lock and end the lease.
    pub async fn finish(mut self) -> Result<bool, LockClientError> {
        self.finished = true;
        self.client.release_entity(&self.entity).await
    }
}

impl<B: LockBackend + 'static> Drop for EditLease<B> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(
                entity = %self.entity,
                "Edit lease dropped outside a runtime, lock will expire on its own"
            );
            return;
        };

        let client = self.client.clone();
        let entity = self.entity.clone();
        runtime.spawn(async move {
            if let Err(e) = client.release_entity(&entity).await {
                tracing::warn!(entity = %entity, error = %e, "Release of dropped edit lease failed");
            }
        });
    }
}
