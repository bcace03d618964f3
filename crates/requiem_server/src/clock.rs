//! Wall-clock time for the death authority.
//!
//! Deadlines are stored as absolute [`EpochMillis`] and remaining time is
//! always derived at read time as `deadline - now`.

use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use bevy_ecs::prelude::*;

/// Milliseconds since the Unix epoch.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Debug)]
pub struct EpochMillis(pub i64);

impl EpochMillis {
    /// Returns this timestamp moved `duration` into the future. Saturates
    /// instead of overflowing.
    pub fn after(self, duration: Duration) -> Self {
        let millis = i64::try_from(duration.as_millis()).unwrap_or(i64::MAX);
        Self(self.0.saturating_add(millis))
    }

    /// Signed milliseconds from `earlier` to `self`. Negative if `self` is
    /// before `earlier`.
    pub fn millis_since(self, earlier: EpochMillis) -> i64 {
        self.0.saturating_sub(earlier.0)
    }
}

impl fmt::Display for EpochMillis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

/// A source of wall-clock time.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> EpochMillis;
}

/// Reads the operating system clock.
#[derive(Copy, Clone, Default, Debug)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> EpochMillis {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX));

        EpochMillis(millis)
    }
}

/// A clock that only moves when told to. Clones share the same time.
#[derive(Clone, Default, Debug)]
pub struct ManualClock {
    millis: Arc<AtomicI64>,
}

impl ManualClock {
    pub fn new(start: EpochMillis) -> Self {
        Self {
            millis: Arc::new(AtomicI64::new(start.0)),
        }
    }

    pub fn set(&self, now: EpochMillis) {
        self.millis.store(now.0, Ordering::SeqCst);
    }

    pub fn advance(&self, by: Duration) {
        let by = i64::try_from(by.as_millis()).unwrap_or(i64::MAX);
        self.millis.fetch_add(by, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> EpochMillis {
        EpochMillis(self.millis.load(Ordering::SeqCst))
    }
}

/// The clock used by the death authority.
#[derive(Resource, Clone)]
pub struct ServerClock(Arc<dyn Clock>);

impl ServerClock {
    pub fn new(clock: impl Clock) -> Self {
        Self(Arc::new(clock))
    }

    pub fn now(&self) -> EpochMillis {
        self.0.now()
    }
}

impl Default for ServerClock {
    fn default() -> Self {
        Self::new(SystemClock)
    }
}

impl fmt::Debug for ServerClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ServerClock").field(&self.now()).finish()
    }
}
