//! Polling observer of one entity's lock status.
//!
//! Status can be up to one poll interval old for changes made by other
//! users; changes made through the same client trigger an immediate
//! re-check. Polling is tied to the [`LockWatcher`]'s lifetime.

use std::time::Duration;

use crm_core::locking::EntityRef;
use tokio::runtime::Handle;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::backend::LockBackend;
use crate::cache::LockObservation;
use crate::client::LockClient;

/// Re-checks an entity's lock status every poll interval and publishes each
/// answer. Dropping the watcher stops the polling task.
pub struct LockWatcher {
    entity: EntityRef,
    receiver: watch::Receiver<LockObservation>,
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl LockWatcher {
    pub(crate) fn spawn<B: LockBackend + 'static>(
        runtime: &Handle,
        client: LockClient<B>,
        entity: EntityRef,
        interval: Duration,
    ) -> Self {
        let (sender, receiver) = watch::channel(LockObservation::unknown());
        let cancel = CancellationToken::new();
        // Subscribe before spawning so no local change is missed.
        let changes = client.local_changes();

        let handle = runtime.spawn(poll(
            client,
            entity.clone(),
            interval,
            changes,
            sender,
            cancel.clone(),
        ));

        Self {
            entity,
            receiver,
            cancel,
            handle: Some(handle),
        }
    }

    pub fn entity(&self) -> &EntityRef {
        &self.entity
    }

    /// The most recently published observation.
    pub fn current(&self) -> LockObservation {
        self.receiver.borrow().clone()
    }

    /// Wait for the next published observation. Returns `None` once polling
    /// has stopped.
    pub async fn changed(&mut self) -> Option<LockObservation> {
        self.receiver.changed().await.ok()?;
        Some(self.receiver.borrow_and_update().clone())
    }

    /// Another receiver for the same stream, e.g. for a second view of the
    /// same record. Receivers do not keep polling alive on their own.
    pub fn subscribe(&self) -> watch::Receiver<LockObservation> {
        self.receiver.clone()
    }

    /// Stop polling and wait for the task to finish.
    pub async fn stop(mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for LockWatcher {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn poll<B: LockBackend + 'static>(
    client: LockClient<B>,
    entity: EntityRef,
    interval: Duration,
    mut changes: broadcast::Receiver<EntityRef>,
    sender: watch::Sender<LockObservation>,
    cancel: CancellationToken,
) {
    tracing::debug!(entity = %entity, interval_secs = interval.as_secs(), "Lock watch started");

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            change = changes.recv() => match change {
                Ok(changed) if changed != entity => continue,
                Ok(_) | Err(RecvError::Lagged(_)) => {
                    tracing::debug!(entity = %entity, "Lock changed by this client, re-checking");
                    ticker.reset();
                }
                Err(RecvError::Closed) => break,
            },
            _ = ticker.tick() => {}
        }

        match client.check_entity(&entity).await {
            Ok(observation) => {
                sender.send_replace(observation);
            }
            Err(e) => {
                tracing::warn!(entity = %entity, error = %e, "Lock watch refresh failed");
            }
        }
    }

    tracing::debug!(entity = %entity, "Lock watch stopped");
}
