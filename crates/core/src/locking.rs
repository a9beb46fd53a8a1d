//! Record-locking constants, wire types, and validation.
//!
//! This module lives in `core` so that the lock service, its background
//! purge task, and the lock client all reference the same lock durations,
//! entity types, and RPC payload shapes.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{Timestamp, UserId};

// ---------------------------------------------------------------------------
// Lock duration constants
// ---------------------------------------------------------------------------

/// Default lock duration in minutes (15 minutes).
pub const DEFAULT_LOCK_DURATION_MINS: i64 = 15;

/// Maximum allowed lock duration in minutes (4 hours).
pub const MAX_LOCK_DURATION_MINS: i64 = 240;

/// Minimum lock duration in minutes (1 minute).
pub const MIN_LOCK_DURATION_MINS: i64 = 1;

/// How often lock observers re-check lock status (in seconds).
pub const LOCK_POLL_INTERVAL_SECS: u64 = 30;

/// How often the service drops expired lock records (in seconds).
pub const LOCK_PURGE_INTERVAL_SECS: u64 = 60;

/// Longest accepted entity id.
pub const MAX_ENTITY_ID_LEN: usize = 128;

// ---------------------------------------------------------------------------
// Entity types (the records that can be locked for editing)
// ---------------------------------------------------------------------------

/// Known entity types for record locking.
pub mod entity_types {
    pub const LEAD: &str = "lead";
    pub const OPPORTUNITY: &str = "opportunity";
    pub const CONTACT: &str = "contact";
    pub const ACCOUNT: &str = "account";
    pub const TASK: &str = "task";
    pub const MEETING: &str = "meeting";
}

/// The set of all lockable entity types.
pub const VALID_ENTITY_TYPES: &[&str] = &[
    entity_types::LEAD,
    entity_types::OPPORTUNITY,
    entity_types::CONTACT,
    entity_types::ACCOUNT,
    entity_types::TASK,
    entity_types::MEETING,
];

/// Returns `true` if the given entity type can be locked.
pub fn is_valid_entity_type(entity_type: &str) -> bool {
    VALID_ENTITY_TYPES.contains(&entity_type)
}

// ---------------------------------------------------------------------------
// RPC function names
// ---------------------------------------------------------------------------

/// Names of the backend procedures, as they appear under `/rest/v1/rpc/`.
pub mod rpc {
    pub const ACQUIRE_RECORD_LOCK: &str = "acquire_record_lock";
    pub const RELEASE_RECORD_LOCK: &str = "release_record_lock";
    pub const IS_RECORD_LOCKED_BY_OTHER: &str = "is_record_locked_by_other";
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// Identifies a lockable record. Also the request body for release and
/// lock-status RPCs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    pub entity_type: String,
    pub entity_id: String,
}

impl EntityRef {
    pub fn new(entity_type: impl Into<String>, entity_id: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            entity_id: entity_id.into(),
        }
    }

    /// Validate the type and id. See [`validate_entity_ref`].
    pub fn validate(&self) -> Result<(), String> {
        validate_entity_ref(&self.entity_type, &self.entity_id)
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.entity_type, self.entity_id)
    }
}

/// Request body for `acquire_record_lock`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcquireLockParams {
    pub entity_type: String,
    pub entity_id: String,
    #[serde(default = "default_lock_duration")]
    pub lock_duration_minutes: i64,
}

fn default_lock_duration() -> i64 {
    DEFAULT_LOCK_DURATION_MINS
}

impl AcquireLockParams {
    pub fn entity(&self) -> EntityRef {
        EntityRef::new(self.entity_type.clone(), self.entity_id.clone())
    }
}

/// Identity of the user holding a lock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockHolder {
    pub id: UserId,
    pub name: String,
    pub email: String,
}

/// A lock record as stored by the lock service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordLock {
    pub entity_type: String,
    pub entity_id: String,
    pub locked_by: LockHolder,
    pub locked_at: Timestamp,
    pub expires_at: Timestamp,
}

impl RecordLock {
    /// A lock stops being valid the instant `expires_at` is reached.
    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.expires_at <= now
    }
}

/// Response of `is_record_locked_by_other`.
///
/// `locked` is `true` only when another identity holds an unexpired lock; the
/// optional fields are present exactly in that case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockStatus {
    pub locked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locked_by: Option<LockHolder>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locked_at: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<Timestamp>,
}

impl LockStatus {
    pub fn unlocked() -> Self {
        Self {
            locked: false,
            locked_by: None,
            locked_at: None,
            expires_at: None,
        }
    }

    pub fn held_by(lock: &RecordLock) -> Self {
        Self {
            locked: true,
            locked_by: Some(lock.locked_by.clone()),
            locked_at: Some(lock.locked_at),
            expires_at: Some(lock.expires_at),
        }
    }
}

// ---------------------------------------------------------------------------
// Validation helpers
// ---------------------------------------------------------------------------

/// Validate a lock duration in minutes. Returns `Ok(())` or an error message.
pub fn validate_lock_duration(minutes: i64) -> Result<(), String> {
    if minutes < MIN_LOCK_DURATION_MINS {
        return Err(format!(
            "Lock duration must be at least {MIN_LOCK_DURATION_MINS} minute(s), got {minutes}"
        ));
    }
    if minutes > MAX_LOCK_DURATION_MINS {
        return Err(format!(
            "Lock duration must be at most {MAX_LOCK_DURATION_MINS} minutes, got {minutes}"
        ));
    }
    Ok(())
}

/// Validate that both entity_type and entity_id are acceptable.
pub fn validate_entity_ref(entity_type: &str, entity_id: &str) -> Result<(), String> {
    if !is_valid_entity_type(entity_type) {
        return Err(format!(
            "Invalid entity_type '{entity_type}'. Must be one of: {}",
            VALID_ENTITY_TYPES.join(", ")
        ));
    }
    if entity_id.trim().is_empty() {
        return Err("entity_id must not be empty".to_string());
    }
    if entity_id.trim() != entity_id {
        return Err(format!(
            "entity_id must not have surrounding whitespace, got '{entity_id}'"
        ));
    }
    let id_chars = entity_id.chars().count();
    if id_chars > MAX_ENTITY_ID_LEN {
        return Err(format!(
            "entity_id must be at most {MAX_ENTITY_ID_LEN} characters, got {id_chars}"
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
