use chrono::{DateTime, Utc};

/// Source of the current time
///
/// Expiration checks go through this port so tests can pin the time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}
