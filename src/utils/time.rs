use chrono::{DateTime, Utc};
use std::time::Instant;

pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Whole milliseconds since `started`, saturating instead of wrapping.
pub fn elapsed_millis(started: Instant) -> i64 {
    i64::try_from(started.elapsed().as_millis()).unwrap_or(i64::MAX)
}
