//! Freshness decision for cached records

use std::time::Duration;

use chrono::{DateTime, Utc};

/// Whether a record captured at `captured_at` is still usable under `window`.
///
/// A missing timestamp (no record) is never fresh.
pub fn is_fresh(captured_at: Option<DateTime<Utc>>, window: Duration) -> bool {
    is_fresh_at(captured_at, window, Utc::now())
}

/// [`is_fresh`] against an explicit clock. Fresh iff `now - captured_at < window`.
pub fn is_fresh_at(
    captured_at: Option<DateTime<Utc>>,
    window: Duration,
    now: DateTime<Utc>,
) -> bool {
    let Some(captured_at) = captured_at else {
        return false;
    };
    let Ok(window) = chrono::Duration::from_std(window) else {
        // Window too large to represent: everything captured is fresh
        return true;
    };
    now.signed_duration_since(captured_at) < window
}
