//! The RPC seam between the lock client and the lock service.
//!
//! [`LockBackend`] is the three procedures and nothing more; the service
//! decides ownership and expiry. [`HttpLockBackend`] calls them over HTTP
//! with [`reqwest`], attaching the bearer credential on every call.

use async_trait::async_trait;
use crm_core::locking::{rpc, AcquireLockParams, EntityRef, LockStatus};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::ClientConfig;
use crate::error::LockClientError;

/// The lock service's procedure surface.
#[async_trait]
pub trait LockBackend: Send + Sync {
    /// `true` if the caller now holds the lock.
    async fn acquire_record_lock(
        &self,
        entity: &EntityRef,
        lock_duration_minutes: i64,
    ) -> Result<bool, LockClientError>;

    /// `true` if the caller's lock was released.
    async fn release_record_lock(&self, entity: &EntityRef) -> Result<bool, LockClientError>;

    /// Whether someone other than the caller holds an unexpired lock.
    async fn is_record_locked_by_other(
        &self,
        entity: &EntityRef,
    ) -> Result<LockStatus, LockClientError>;
}

/// HTTP client for the lock procedures under `{backend_url}/rest/v1/rpc/`.
pub struct HttpLockBackend {
    client: reqwest::Client,
    rpc_url: String,
    access_token: String,
}

impl HttpLockBackend {
    /// Create a backend from client configuration.
    pub fn new(config: &ClientConfig) -> Result<Self, LockClientError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self::with_client(client, config))
    }

    /// Create a backend reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, config: &ClientConfig) -> Self {
        Self {
            client,
            rpc_url: format!("{}/rest/v1/rpc", config.backend_url),
            access_token: config.access_token.clone(),
        }
    }

    async fn call<B, T>(&self, function: &str, body: &B) -> Result<T, LockClientError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let response = self
            .client
            .post(format!("{}/{function}", self.rpc_url))
            .bearer_auth(&self.access_token)
            .json(body)
            .send()
            .await?;

        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }

    /// Map non-2xx responses onto [`LockClientError`].
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, LockClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());

        Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => LockClientError::Unauthorized(body),
            _ => LockClientError::Backend {
                status: status.as_u16(),
                body,
            },
        })
    }
}

#[async_trait]
impl LockBackend for HttpLockBackend {
    async fn acquire_record_lock(
        &self,
        entity: &EntityRef,
        lock_duration_minutes: i64,
    ) -> Result<bool, LockClientError> {
        let params = AcquireLockParams {
            entity_type: entity.entity_type.clone(),
            entity_id: entity.entity_id.clone(),
            lock_duration_minutes,
        };
        self.call(rpc::ACQUIRE_RECORD_LOCK, &params).await
    }

    async fn release_record_lock(&self, entity: &EntityRef) -> Result<bool, LockClientError> {
        self.call(rpc::RELEASE_RECORD_LOCK, entity).await
    }

    async fn is_record_locked_by_other(
        &self,
        entity: &EntityRef,
    ) -> Result<LockStatus, LockClientError> {
        self.call(rpc::IS_RECORD_LOCKED_BY_OTHER, entity).await
    }
}
