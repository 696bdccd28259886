//! Per-mailbox scan bookkeeping

use crate::config::PurgeOptions;

/// Windows that must be processed before an all-empty scan may abort
const MIN_WINDOWS_BEFORE_BLIND_ABORT: u32 = 5;

/// What to do after a window came back empty
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyWindowAction {
    /// Restart the window sequence with a wider span
    Grow { from: u32, to: u32 },
    /// Treat the mailbox as exhausted for this run
    Abort,
    Continue,
}

/// Transient state of one windowed scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanState {
    pub current_span_days: u32,
    pub empty_streak: u32,
    pub non_empty_seen_once: bool,
    pub total_seen: u64,
    pub total_deleted: u64,
    pub windows_processed: u32,
    /// Batches that still failed after retries
    pub failed_batches: u32,
}

impl ScanState {
    pub fn new(span_days: u32) -> Self {
        Self {
            current_span_days: span_days.max(1),
            empty_streak: 0,
            non_empty_seen_once: false,
            total_seen: 0,
            total_deleted: 0,
            windows_processed: 0,
            failed_batches: 0,
        }
    }

    /// Account for a searched window that matched `count` messages
    pub fn record_window(&mut self, count: usize) {
        self.windows_processed += 1;
        self.total_seen += count as u64;
        if count == 0 {
            self.empty_streak += 1;
        } else {
            self.non_empty_seen_once = true;
            self.empty_streak = 0;
        }
    }

    /// Decide between growing the span and aborting after an empty window.
    ///
    /// Growth wins while the span is below its cap. Once capped (or with
    /// growth disabled) the scan aborts, but only after mail has been seen
    /// or enough windows were scanned to trust the silence.
    pub fn after_empty_window(&mut self, options: &PurgeOptions) -> EmptyWindowAction {
        if self.empty_streak < options.max_empty_windows {
            return EmptyWindowAction::Continue;
        }

        if options.adaptive_windows {
            let grown = self
                .current_span_days
                .saturating_mul(2)
                .min(options.max_window_days);
            if grown > self.current_span_days {
                let from = self.current_span_days;
                self.current_span_days = grown;
                self.empty_streak = 0;
                return EmptyWindowAction::Grow { from, to: grown };
            }
        }

        let scanned_enough = self.windows_processed
            >= options.max_empty_windows.max(MIN_WINDOWS_BEFORE_BLIND_ABORT);
        if self.non_empty_seen_once || scanned_enough {
            EmptyWindowAction::Abort
        } else {
            EmptyWindowAction::Continue
        }
    }

    /// Windows left in the per-mailbox budget
    pub fn remaining_budget(&self, options: &PurgeOptions) -> u32 {
        options.max_windows.saturating_sub(self.windows_processed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(adaptive: bool, max_empty: u32) -> PurgeOptions {
        PurgeOptions {
            adaptive_windows: adaptive,
            max_empty_windows: max_empty,
            window_days: 30,
            max_window_days: 365,
            ..Default::default()
        }
    }

    fn empty_windows(state: &mut ScanState, options: &PurgeOptions, n: u32) -> Vec<EmptyWindowAction> {
        (0..n)
            .map(|_| {
                state.record_window(0);
                state.after_empty_window(options)
            })
            .collect()
    }

    #[test]
    fn test_non_empty_resets_streak() {
        let mut state = ScanState::new(30);
        state.record_window(0);
        state.record_window(0);
        assert_eq!(state.empty_streak, 2);

        state.record_window(4);
        assert_eq!(state.empty_streak, 0);
        assert!(state.non_empty_seen_once);
        assert_eq!(state.total_seen, 4);
        assert_eq!(state.windows_processed, 3);
    }

    #[test]
    fn test_adaptive_growth_doubles_and_resets() {
        let options = options(true, 3);
        let mut state = ScanState::new(30);

        let actions = empty_windows(&mut state, &options, 3);
        assert_eq!(
            actions,
            vec![
                EmptyWindowAction::Continue,
                EmptyWindowAction::Continue,
                EmptyWindowAction::Grow { from: 30, to: 60 },
            ]
        );
        assert_eq!(state.current_span_days, 60);
        assert_eq!(state.empty_streak, 0);
    }

    #[test]
    fn test_growth_is_capped_then_aborts() {
        let options = PurgeOptions {
            max_window_days: 100,
            ..options(true, 2)
        };
        let mut state = ScanState::new(30);
        state.record_window(7);

        let actions = empty_windows(&mut state, &options, 8);
        assert_eq!(actions[1], EmptyWindowAction::Grow { from: 30, to: 60 });
        assert_eq!(actions[3], EmptyWindowAction::Grow { from: 60, to: 100 });
        assert_eq!(actions[5], EmptyWindowAction::Abort);
        assert_eq!(state.current_span_days, 100);
    }

    #[test]
    fn test_span_never_shrinks() {
        let options = options(true, 1);
        let mut state = ScanState::new(30);
        let mut last = state.current_span_days;
        for count in [0, 3, 0, 0, 9, 0, 0, 0, 0, 0, 0] {
            state.record_window(count);
            if count == 0 {
                state.after_empty_window(&options);
            }
            assert!(state.current_span_days >= last);
            last = state.current_span_days;
        }
    }

    #[test]
    fn test_abort_after_mail_seen_without_growth() {
        let options = options(false, 3);
        let mut state = ScanState::new(30);
        state.record_window(12);

        let actions = empty_windows(&mut state, &options, 3);
        assert_eq!(actions[2], EmptyWindowAction::Abort);
    }

    #[test]
    fn test_no_blind_abort_before_enough_windows() {
        // Never seen mail: needs max(5, max_empty) windows before aborting
        let options = options(false, 3);
        let mut state = ScanState::new(30);

        let actions = empty_windows(&mut state, &options, 5);
        assert_eq!(actions[2], EmptyWindowAction::Continue);
        assert_eq!(actions[3], EmptyWindowAction::Continue);
        assert_eq!(actions[4], EmptyWindowAction::Abort);
    }

    #[test]
    fn test_remaining_budget() {
        let options = PurgeOptions {
            max_windows: 4,
            ..Default::default()
        };
        let mut state = ScanState::new(30);
        state.record_window(0);
        state.record_window(3);
        assert_eq!(state.remaining_budget(&options), 2);
        state.record_window(0);
        state.record_window(0);
        state.record_window(0);
        assert_eq!(state.remaining_budget(&options), 0);
    }
}
