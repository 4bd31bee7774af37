use crate::foundation::constants::{NANOS_PER_SECOND, TEST_NOW_NANOS_ENV_VAR};
use std::time::{SystemTime, UNIX_EPOCH};

fn wall_clock_nanos() -> u64 {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(since_epoch) => since_epoch.as_secs().saturating_mul(NANOS_PER_SECOND).saturating_add(u64::from(since_epoch.subsec_nanos())),
        Err(_) => 0,
    }
}

/// Nanoseconds since the UNIX epoch. `ACCORD_TEST_NOW_NANOS` pins the clock when it parses.
pub fn now_nanos() -> u64 {
    std::env::var(TEST_NOW_NANOS_ENV_VAR).ok().and_then(|value| value.trim().parse().ok()).unwrap_or_else(wall_clock_nanos)
}
