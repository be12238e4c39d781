//! Timestamp helpers for the database layer.
//!
//! We store timestamps as `INTEGER` Unix epoch milliseconds (UTC) in SQLite.

use std::time::Duration;

use chrono::Utc;

/// Current time as Unix epoch milliseconds (UTC).
#[inline]
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Expiry timestamp for an entry written now with the given TTL.
///
/// Saturates instead of overflowing for absurdly large TTLs.
#[inline]
pub fn expiry_ms(ttl: Duration) -> i64 {
    let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
    now_ms().saturating_add(ttl_ms)
}
