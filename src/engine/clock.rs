//! Calendar day source
//!
//! Daily cap keys are namespaced by the local calendar date. The formatted
//! date is cached behind a lock and refreshed when the clock reports a new
//! day.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::NaiveDate;

/// Source of the current calendar date
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Local wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        chrono::Local::now().date_naive()
    }
}

/// Settable clock for tests
#[cfg(any(test, feature = "test-utils"))]
#[derive(Debug)]
pub struct FixedClock {
    date: Mutex<NaiveDate>,
}

#[cfg(any(test, feature = "test-utils"))]
impl FixedClock {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date: Mutex::new(date),
        }
    }

    pub fn set(&self, date: NaiveDate) {
        *self.date.lock().unwrap_or_else(PoisonError::into_inner) = date;
    }

    pub fn advance_days(&self, days: u64) {
        let mut date = self.date.lock().unwrap_or_else(PoisonError::into_inner);
        *date = *date + chrono::Days::new(days);
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        *self.date.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Lock-protected cache of today's `YYYY-MM-DD` string
pub struct TodayCache {
    clock: Arc<dyn Clock>,
    cached: Mutex<Option<(NaiveDate, String)>>,
}

impl TodayCache {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            cached: Mutex::new(None),
        }
    }

    /// Today's date string
    ///
    /// The clock is consulted and the cache refreshed under one lock, so
    /// concurrent callers never see a half-updated value.
    pub fn today_string(&self) -> String {
        let mut cached = self.cached.lock().unwrap_or_else(PoisonError::into_inner);
        let today = self.clock.today();

        match cached.as_ref() {
            Some((date, formatted)) if *date == today => formatted.clone(),
            _ => {
                let formatted = today.format("%Y-%m-%d").to_string();
                *cached = Some((today, formatted.clone()));
                formatted
            }
        }
    }
}
