//! Injectable time source.
//!
//! Registries and the state machine take a clock at construction so tests
//! can pin timestamps instead of reading ambient time.

use chrono::{DateTime, Utc};
use std::sync::Arc;

/// A source of UTC timestamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock pinned to a fixed instant, for tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Shorthand for the default shared clock.
pub fn system_clock() -> Arc<dyn Clock> {
    Arc::new(SystemClock)
}
