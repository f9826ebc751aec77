use crate::domain::clock::Clock;
use chrono::{Duration, NaiveDateTime};
use std::sync::{Arc, RwLock};

/// A clock that only moves when told to.
///
/// Used by the replay CLI (each command carries its own instant) and by
/// tests that need to sit exactly on a window boundary.
#[derive(Clone)]
pub struct ManualClock {
    now: Arc<RwLock<NaiveDateTime>>,
}

impl ManualClock {
    pub fn new(now: NaiveDateTime) -> Self {
        Self {
            now: Arc::new(RwLock::new(now)),
        }
    }

    pub fn set(&self, now: NaiveDateTime) {
        *self.now.write().expect("clock lock poisoned") = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.write().expect("clock lock poisoned");
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> NaiveDateTime {
        *self.now.read().expect("clock lock poisoned")
    }
}
