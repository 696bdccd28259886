//! Calendar and sleep abstraction
//!
//! The engine reads "today" to place its first window and sleeps between
//! batches as deliberate backpressure. Both go through [`Clock`] so tests
//! can run a multi-year scan instantly and on a fixed date.

use chrono::{Local, NaiveDate};
use std::sync::Mutex;
use std::time::Duration;

pub trait Clock: Send + Sync {
    /// Current local calendar date
    fn today(&self) -> NaiveDate;

    /// Block the caller for `duration`
    fn sleep(&self, duration: Duration);
}

/// Wall-clock implementation backed by the OS
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }

    fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}

/// Fixed-date clock that records sleeps instead of blocking
#[derive(Debug)]
pub struct ManualClock {
    today: NaiveDate,
    slept: Mutex<Vec<Duration>>,
}

impl ManualClock {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            today,
            slept: Mutex::new(Vec::new()),
        }
    }

    /// Every sleep requested so far, in order
    pub fn sleeps(&self) -> Vec<Duration> {
        self.slept.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Sum of all requested sleeps
    pub fn total_slept(&self) -> Duration {
        self.sleeps().iter().sum()
    }
}

impl Clock for ManualClock {
    fn today(&self) -> NaiveDate {
        self.today
    }

    fn sleep(&self, duration: Duration) {
        if let Ok(mut slept) = self.slept.lock() {
            slept.push(duration);
        }
    }
}
