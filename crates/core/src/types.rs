use std::sync::Arc;

/// User identities are the auth provider's subject UUIDs.
pub type UserId = uuid::Uuid;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Source of "now" for expiry decisions. Swappable so tests can move time.
pub type Clock = Arc<dyn Fn() -> Timestamp + Send + Sync>;

/// A [`Clock`] reading the system time.
pub fn system_clock() -> Clock {
    Arc::new(chrono::Utc::now)
}
