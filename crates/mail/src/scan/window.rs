//! Backward-moving date windows
//!
//! [`WindowScanner::generate`] yields contiguous windows walking from a
//! given end date towards a hard stop. The sequence holds no state beyond
//! its cursor; changing the span means building a new sequence from the
//! boundary already reached.

use chrono::{Days, NaiveDate};
use std::iter::FusedIterator;

use crate::models::Window;

pub struct WindowScanner;

impl WindowScanner {
    /// Lazily produce windows of `span_days` ending at `end_exclusive`,
    /// then moving backward.
    ///
    /// The earliest window is clamped to start at `hard_stop`. The sequence
    /// ends after `max_windows` windows or once `hard_stop` is reached.
    pub fn generate(
        end_exclusive: NaiveDate,
        span_days: u32,
        hard_stop: NaiveDate,
        max_windows: u32,
    ) -> Windows {
        Windows {
            next_end: end_exclusive,
            span: Days::new(u64::from(span_days.max(1))),
            hard_stop,
            remaining: max_windows,
        }
    }
}

/// Iterator returned by [`WindowScanner::generate`]
#[derive(Debug, Clone)]
pub struct Windows {
    next_end: NaiveDate,
    span: Days,
    hard_stop: NaiveDate,
    remaining: u32,
}

impl Windows {
    /// The end of the next window to be produced
    pub fn boundary(&self) -> NaiveDate {
        self.next_end
    }
}

impl Iterator for Windows {
    type Item = Window;

    fn next(&mut self) -> Option<Window> {
        if self.remaining == 0 || self.next_end <= self.hard_stop {
            return None;
        }
        let start = self
            .next_end
            .checked_sub_days(self.span)
            .map_or(self.hard_stop, |start| start.max(self.hard_stop));
        let window = Window::new(start, self.next_end);
        self.next_end = start;
        self.remaining -= 1;
        Some(window)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.remaining == 0 || self.next_end <= self.hard_stop {
            (0, Some(0))
        } else {
            (1, Some(self.remaining as usize))
        }
    }
}

impl FusedIterator for Windows {}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_windows_are_contiguous() {
        let windows: Vec<_> =
            WindowScanner::generate(date(2024, 6, 1), 30, date(2020, 1, 1), 20).collect();

        assert_eq!(windows.len(), 20);
        assert_eq!(windows[0].end, date(2024, 6, 1));
        for pair in windows.windows(2) {
            assert_eq!(pair[1].end, pair[0].start);
            assert_eq!(pair[0].days(), 30);
        }
    }

    #[test]
    fn test_clamped_at_hard_stop() {
        let hard_stop = date(2024, 1, 1);
        let windows: Vec<_> =
            WindowScanner::generate(date(2024, 3, 1), 25, hard_stop, 100).collect();

        // 60 days: 25 + 25 + 10
        assert_eq!(windows.len(), 3);
        assert_eq!(windows[2].start, hard_stop);
        assert_eq!(windows[2].days(), 10);
        assert!(windows.iter().all(|w| w.start >= hard_stop));
    }

    #[test]
    fn test_never_exceeds_max_windows() {
        for max in [0, 1, 5, 17] {
            let count = WindowScanner::generate(date(2024, 1, 1), 1, date(1970, 1, 1), max).count();
            assert_eq!(count, max as usize);
        }
    }

    #[test]
    fn test_empty_when_end_at_hard_stop() {
        let stop = date(2024, 1, 1);
        assert_eq!(WindowScanner::generate(stop, 30, stop, 10).count(), 0);
        assert_eq!(WindowScanner::generate(date(2023, 1, 1), 30, stop, 10).count(), 0);
    }

    #[test]
    fn test_restart_from_boundary_with_wider_span() {
        let stop = date(2000, 1, 1);
        let mut narrow = WindowScanner::generate(date(2024, 1, 31), 10, stop, 100);
        let first = narrow.next().unwrap();
        assert_eq!(narrow.boundary(), first.start);

        let mut wide = WindowScanner::generate(first.start, 20, stop, 100);
        let next = wide.next().unwrap();
        assert_eq!(next.end, first.start);
        assert_eq!(next.days(), 20);
    }

    #[test]
    fn test_zero_span_treated_as_one_day() {
        let windows: Vec<_> =
            WindowScanner::generate(date(2024, 1, 3), 0, date(2024, 1, 1), 10).collect();
        assert_eq!(windows.len(), 2);
        assert!(windows.iter().all(|w| w.days() == 1));
    }

    #[test]
    fn test_terminates_near_min_date() {
        let windows: Vec<_> =
            WindowScanner::generate(NaiveDate::MIN + Days::new(5), 30, NaiveDate::MIN, 10).collect();
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].start, NaiveDate::MIN);
    }
}
