// Clock Port (for testability)

use std::sync::atomic::{AtomicI64, Ordering};

/// Clock interface; repositories stamp created_at/updated_at through this,
/// so tests can pin time deterministically.
pub trait Clock: Send + Sync {
    /// Current time in milliseconds since epoch.
    fn now_millis(&self) -> i64;
}

/// System clock (production).
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Deterministic clock for tests: every reading advances by one
/// millisecond, so creation timestamps are strictly increasing.
pub struct FixedClock {
    now: AtomicI64,
}

impl FixedClock {
    pub fn starting_at(millis: i64) -> Self {
        Self {
            now: AtomicI64::new(millis),
        }
    }
}

impl Clock for FixedClock {
    fn now_millis(&self) -> i64 {
        self.now.fetch_add(1, Ordering::SeqCst)
    }
}
