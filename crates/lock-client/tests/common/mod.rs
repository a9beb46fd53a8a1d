//! In-process lock service for client tests.
//!
//! [`FakeLockService`] runs the real [`LockTable`] against a clock the test
//! controls. Each [`FakeBackend`] is one signed-in identity talking to it,
//! the way two browser tabs share one backend.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use crm_core::lock_table::LockTable;
use crm_core::locking::{EntityRef, LockHolder, LockStatus};
use crm_core::types::{Clock, Timestamp};
use crm_lock_client::{LockBackend, LockClient, LockClientError};
use uuid::Uuid;

pub struct FakeLockService {
    table: Mutex<LockTable>,
    now: Mutex<Timestamp>,
    offline: AtomicBool,
    acquire_calls: AtomicUsize,
}

impl FakeLockService {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            table: Mutex::new(LockTable::new()),
            now: Mutex::new(Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()),
            offline: AtomicBool::new(false),
            acquire_calls: AtomicUsize::new(0),
        })
    }

    pub fn now(&self) -> Timestamp {
        *self.now.lock().unwrap()
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock().unwrap() += by;
    }

    /// Make every call fail as if the network were down.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn acquire_calls(&self) -> usize {
        self.acquire_calls.load(Ordering::SeqCst)
    }

    /// The service's clock, for clients that should age cached locks on
    /// the same timeline.
    pub fn clock(self: &Arc<Self>) -> Clock {
        let service = Arc::clone(self);
        Arc::new(move || service.now())
    }

    /// A client signed in as a fresh identity.
    pub fn client(self: &Arc<Self>, name: &str) -> LockClient<FakeBackend> {
        LockClient::with_backend(self.backend(name)).with_clock(self.clock())
    }

    pub fn backend(self: &Arc<Self>, name: &str) -> FakeBackend {
        FakeBackend {
            service: Arc::clone(self),
            identity: LockHolder {
                id: Uuid::new_v4(),
                name: name.to_string(),
                email: format!("{}@example.com", name.to_lowercase()),
            },
            revoked: false,
        }
    }

    fn check_online(&self) -> Result<(), LockClientError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(transport_error());
        }
        Ok(())
    }
}

pub struct FakeBackend {
    service: Arc<FakeLockService>,
    pub identity: LockHolder,
    revoked: bool,
}

impl FakeBackend {
    /// The same identity with a credential the service rejects.
    pub fn revoked(mut self) -> Self {
        self.revoked = true;
        self
    }

    fn authorize(&self) -> Result<(), LockClientError> {
        self.service.check_online()?;
        if self.revoked {
            return Err(LockClientError::Unauthorized(
                r#"{"error":"Invalid or expired token","code":"UNAUTHORIZED"}"#.into(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl LockBackend for FakeBackend {
    async fn acquire_record_lock(
        &self,
        entity: &EntityRef,
        lock_duration_minutes: i64,
    ) -> Result<bool, LockClientError> {
        self.authorize()?;
        self.service.acquire_calls.fetch_add(1, Ordering::SeqCst);
        let now = self.service.now();
        self.service
            .table
            .lock()
            .unwrap()
            .acquire(entity, &self.identity, lock_duration_minutes, now)
            .map_err(|e| LockClientError::Backend {
                status: 400,
                body: e.to_string(),
            })
    }

    async fn release_record_lock(&self, entity: &EntityRef) -> Result<bool, LockClientError> {
        self.authorize()?;
        let now = self.service.now();
        self.service
            .table
            .lock()
            .unwrap()
            .release(entity, self.identity.id, now)
            .map_err(|e| LockClientError::Backend {
                status: 400,
                body: e.to_string(),
            })
    }

    async fn is_record_locked_by_other(
        &self,
        entity: &EntityRef,
    ) -> Result<LockStatus, LockClientError> {
        self.authorize()?;
        let now = self.service.now();
        self.service
            .table
            .lock()
            .unwrap()
            .locked_by_other(entity, self.identity.id, now)
            .map_err(|e| LockClientError::Backend {
                status: 400,
                body: e.to_string(),
            })
    }
}

/// A genuine `reqwest::Error`, produced without touching the network.
pub fn transport_error() -> LockClientError {
    let err = reqwest::Client::new()
        .get("not a url")
        .build()
        .expect_err("an unparsable URL must fail to build");
    LockClientError::Transport(err)
}
