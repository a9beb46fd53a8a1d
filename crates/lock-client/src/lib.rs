//! Client side of the CRM record-locking protocol.
//!
//! The lock service is the only authority on who holds a lock. This crate
//! calls its three procedures through the [`LockBackend`] seam, keeps a
//! short-lived, explicitly invalidated cache of lock status for rendering,
//! and polls status for as long as a [`LockWatcher`] is alive.
//!
//! ```ignore
//! let client = LockClient::from_config(ClientConfig::from_env()?)?;
//! if let Some(lease) = client.begin_edit("lead", "42").await? {
//!     // ... edit ...
//!     lease.finish().await?;
//! } else {
//!     // show "being edited by someone else"
//! }
//! ```

pub mod backend;
pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod lease;
pub mod watcher;

pub use backend::{HttpLockBackend, LockBackend};
pub use cache::{LockObservation, LockState};
pub use client::LockClient;
pub use config::ClientConfig;
pub use error::LockClientError;
pub use lease::EditLease;
pub use watcher::LockWatcher;
