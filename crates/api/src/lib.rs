//! CRM lock service library.
//!
//! Exposes the building blocks (config, state, error handling, routes, the
//! lock store and its purge task) so integration tests and the binary
//! entrypoint can both access them.

pub mod auth;
pub mod background;
pub mod config;
pub mod error;
pub mod handlers;
pub mod lock_store;
pub mod middleware;
pub mod response;
pub mod router;
pub mod routes;
pub mod state;
