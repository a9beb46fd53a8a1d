//! Domain types shared by the CRM lock service and the lock client.
//!
//! This crate has no internal dependencies so both the HTTP service and the
//! client library can agree on entity types, lock durations, wire shapes and
//! the arbitration rules in [`lock_table`].

pub mod error;
pub mod lock_table;
pub mod locking;
pub mod roles;
pub mod types;
