//! Date window used to bound a single search

use chrono::NaiveDate;
use std::fmt;

/// Mailbox-scoped message identifier (IMAP UID)
pub type Uid = u32;

/// Half-open date range `[start, end)` searched in one round-trip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Window {
    pub start: NaiveDate,
    /// Exclusive upper bound
    pub end: NaiveDate,
}

impl Window {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Number of days covered by the window
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    /// Whether a message dated `date` falls inside the window
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date < self.end
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_window_is_half_open() {
        let window = Window::new(date(2024, 1, 1), date(2024, 1, 31));
        assert_eq!(window.days(), 30);
        assert!(window.contains(date(2024, 1, 1)));
        assert!(window.contains(date(2024, 1, 30)));
        assert!(!window.contains(date(2024, 1, 31)));
        assert!(!window.contains(date(2023, 12, 31)));
    }

    #[test]
    fn test_window_display() {
        let window = Window::new(date(2024, 1, 1), date(2024, 2, 1));
        assert_eq!(window.to_string(), "2024-01-01..2024-02-01");
    }
}
