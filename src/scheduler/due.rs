//! Due-check evaluation

use chrono::{DateTime, Duration, Utc};

use crate::storage::Target;

/// Earliest instant at which the target should be checked again
///
/// `None` means the target has never been checked and is due immediately.
pub fn next_check_at(target: &Target) -> Option<DateTime<Utc>> {
    target
        .last_check
        .map(|last| last + Duration::seconds(i64::from(target.interval_secs)))
}

/// Whether the target must be fetched on a tick that started at `now`
///
/// Does not validate the interval: a zero interval is due on every tick,
/// which is why stores reject it on creation.
pub fn is_due(target: &Target, now: DateTime<Utc>) -> bool {
    match next_check_at(target) {
        None => true,
        Some(threshold) => now >= threshold,
    }
}
