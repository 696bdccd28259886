//! Per-mailbox deletion state machine
//!
//! ```text
//! INIT ──exists == 0──────────────────────────────▶ DONE
//!   ├──exists <= min_messages──▶ FAST_PATH ───────▶ DONE
//!   └──otherwise──▶ SCANNING: { SEARCH_WINDOW → DELETE_BATCH* → RECHECK } ▶ DONE
//! ```
//!
//! Every remote call goes through the [`RetryExecutor`]. A batch that still
//! fails after retries is logged and skipped, and a window whose search
//! still fails counts as empty. Only failing to open the mailbox skips it
//! entirely.

use chrono::{Datelike, Days, NaiveDate};
use log::{debug, info, warn};
use std::sync::Arc;

use super::progress::{ProgressReporter, ProgressUpdate};
use super::state::{EmptyWindowAction, ScanState};
use super::window::WindowScanner;
use crate::cancel::CancellationToken;
use crate::clock::Clock;
use crate::config::PurgeOptions;
use crate::models::{Mailbox, Uid};
use crate::retry::{RetryExecutor, RetryFailure};
use crate::session::{MailSession, SearchCriteria};

/// Earliest year a scan may reach back to
const EPOCH_YEAR: i32 = 1970;

/// How a mailbox scan ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanStatus {
    /// Could not be opened (virtual parent, permission denied, ...)
    Skipped,
    /// Opened with zero messages
    Empty,
    /// Handled in a single pass
    FastPath,
    /// A recheck found no messages left
    Drained,
    /// Too many consecutive empty windows
    Aborted,
    /// Hard stop or window budget reached
    Exhausted,
    Cancelled,
}

/// Which strategy an opened mailbox gets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    FastPath,
    Windowed,
}

/// Fast path for mailboxes with at most `min_messages` messages
pub fn choose_strategy(exists: u32, min_messages: u32) -> Strategy {
    if exists <= min_messages {
        Strategy::FastPath
    } else {
        Strategy::Windowed
    }
}

/// First day that may be scanned: Jan 1st, `years_back` years before `today`
pub fn hard_stop(today: NaiveDate, years_back: u32) -> NaiveDate {
    let year = today
        .year()
        .saturating_sub(i32::try_from(years_back).unwrap_or(i32::MAX))
        .max(EPOCH_YEAR);
    NaiveDate::from_ymd_opt(year, 1, 1).unwrap_or(NaiveDate::MIN)
}

/// Result of purging one mailbox
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailboxReport {
    pub mailbox: String,
    pub seen: u64,
    pub deleted: u64,
    pub windows: u32,
    pub failed_batches: u32,
    pub status: ScanStatus,
}

impl MailboxReport {
    fn new(mailbox: &str, status: ScanStatus) -> Self {
        Self {
            mailbox: mailbox.to_string(),
            seen: 0,
            deleted: 0,
            windows: 0,
            failed_batches: 0,
            status,
        }
    }

    fn from_state(mailbox: &str, state: &ScanState, status: ScanStatus) -> Self {
        Self {
            mailbox: mailbox.to_string(),
            seen: state.total_seen,
            deleted: state.total_deleted,
            windows: state.windows_processed,
            failed_batches: state.failed_batches,
            status,
        }
    }
}

/// Outcome of deleting a list of UIDs batch by batch
#[derive(Debug, Default)]
struct BatchOutcome {
    deleted: u64,
    failed: u32,
    cancelled: bool,
}

/// Scans and deletes messages from one mailbox at a time
pub struct DeletionEngine {
    options: PurgeOptions,
    retry: RetryExecutor,
    clock: Arc<dyn Clock>,
    cancel: CancellationToken,
}

impl DeletionEngine {
    pub fn new(options: PurgeOptions, clock: Arc<dyn Clock>, cancel: CancellationToken) -> Self {
        let retry = RetryExecutor::new(options.retry.clone(), clock.clone());
        Self {
            options,
            retry,
            clock,
            cancel,
        }
    }

    pub fn options(&self) -> &PurgeOptions {
        &self.options
    }

    /// Run the state machine for `mailbox` and close it before returning
    pub fn purge_mailbox(
        &self,
        session: &mut dyn MailSession,
        mailbox: &Mailbox,
        progress: &mut ProgressReporter,
    ) -> MailboxReport {
        let name = mailbox.name.as_str();

        // INIT: a single read-only probe; failure means not selectable
        let exists = match self.retry.once("open", || session.open(name, true)) {
            Ok(exists) => exists,
            Err(failure) => {
                info!(
                    "[skip] {} is not selectable{}: {}",
                    name,
                    if mailbox.selectable { "" } else { " (virtual parent)" },
                    failure.message
                );
                return MailboxReport::new(name, ScanStatus::Skipped);
            }
        };

        progress.start(name, Some(exists));

        let report = if exists == 0 {
            debug!("{} is empty", name);
            MailboxReport::new(name, ScanStatus::Empty)
        } else {
            match choose_strategy(exists, self.options.min_messages) {
                Strategy::FastPath => self.fast_path(session, name, exists, progress),
                Strategy::Windowed => self.scan_windows(session, name, progress),
            }
        };

        if report.status != ScanStatus::Skipped {
            if let Err(failure) = self.retry.run("close", || session.close()) {
                warn!("Could not close {}: {}", name, failure);
            }
        }
        progress.end();

        info!(
            "[done] {} → status {:?}, seen {}, deleted {}, windows {}",
            name, report.status, report.seen, report.deleted, report.windows
        );
        report
    }

    /// FAST_PATH: search everything and delete in batches
    fn fast_path(
        &self,
        session: &mut dyn MailSession,
        name: &str,
        exists: u32,
        progress: &mut ProgressReporter,
    ) -> MailboxReport {
        let mut report = MailboxReport::new(name, ScanStatus::FastPath);
        report.seen = u64::from(exists);

        if !self.options.is_destructive() {
            info!(
                "[fast-skip] {} → {} messages (<= {})",
                name, exists, self.options.min_messages
            );
            return report;
        }

        info!("[fast-delete] {} → deleting {} messages", name, exists);
        if let Err(failure) = self.retry.run("open", || session.open(name, false)) {
            warn!("[skip] Could not open {} read-write: {}", name, failure);
            return MailboxReport::new(name, ScanStatus::Skipped);
        }

        let uids = match self.retry.run("search", || session.search(&SearchCriteria::All)) {
            Ok(uids) => uids,
            Err(failure) => {
                warn!("Search of {} failed, leaving it for the next run: {}", name, failure);
                return report;
            }
        };

        let outcome = self.delete_in_batches(session, name, &uids, progress);
        report.deleted = outcome.deleted;
        report.failed_batches = outcome.failed;
        if outcome.cancelled {
            report.status = ScanStatus::Cancelled;
        }
        report
    }

    /// SCANNING: walk backward through date windows
    fn scan_windows(
        &self,
        session: &mut dyn MailSession,
        name: &str,
        progress: &mut ProgressReporter,
    ) -> MailboxReport {
        let options = &self.options;
        let destructive = options.is_destructive();

        if let Err(failure) = self.retry.run("open", || session.open(name, !destructive)) {
            warn!("[skip] Could not reopen {}: {}", name, failure);
            return MailboxReport::new(name, ScanStatus::Skipped);
        }

        let today = self.clock.today();
        // Tomorrow, so that today's mail falls in the first window
        let end_exclusive = today.checked_add_days(Days::new(1)).unwrap_or(today);
        let hard_stop = hard_stop(today, options.max_years_back);

        let mut state = ScanState::new(options.window_days);
        let mut windows = WindowScanner::generate(
            end_exclusive,
            state.current_span_days,
            hard_stop,
            options.max_windows,
        );
        let mut status = ScanStatus::Exhausted;

        loop {
            if self.cancel.is_cancelled() {
                warn!("Stop requested; quitting {}", name);
                status = ScanStatus::Cancelled;
                break;
            }
            let Some(window) = windows.next() else {
                debug!("{} reached {} or its window budget", name, hard_stop);
                break;
            };

            let criteria = SearchCriteria::DateRange(window);
            let uids = match self.retry.run("search", || session.search(&criteria)) {
                Ok(uids) => uids,
                Err(failure) => {
                    warn!(
                        "Search of {} in {} failed, counting it as empty: {}",
                        window, name, failure
                    );
                    Vec::new()
                }
            };

            state.record_window(uids.len());
            progress.update(ProgressUpdate::window(uids.len()), true);
            debug!("{} window {} → {} messages", name, window, uids.len());

            if uids.is_empty() {
                match state.after_empty_window(options) {
                    EmptyWindowAction::Grow { from, to } => {
                        info!(
                            "[adapt] {} → {} empty windows; increasing window {}→{} days",
                            name, options.max_empty_windows, from, to
                        );
                        windows = WindowScanner::generate(
                            windows.boundary(),
                            to,
                            hard_stop,
                            state.remaining_budget(options),
                        );
                    }
                    EmptyWindowAction::Abort => {
                        info!(
                            "[abort] {} → {} empty windows in a row, stopping scan",
                            name, state.empty_streak
                        );
                        status = ScanStatus::Aborted;
                        break;
                    }
                    EmptyWindowAction::Continue => {}
                }
                continue;
            }

            if !destructive {
                continue;
            }

            let outcome = self.delete_in_batches(session, name, &uids, progress);
            state.total_deleted += outcome.deleted;
            state.failed_batches += outcome.failed;
            if outcome.cancelled {
                status = ScanStatus::Cancelled;
                break;
            }

            // RECHECK: stop as soon as the mailbox is empty
            match self.retry.run("recheck", || session.open(name, false)) {
                Ok(remaining) => {
                    progress.update(ProgressUpdate::remaining(remaining), true);
                    if remaining == 0 {
                        info!("{} is empty, stopping scan", name);
                        status = ScanStatus::Drained;
                        break;
                    }
                }
                Err(failure) => warn!("Could not recheck {}: {}", name, failure),
            }
        }

        MailboxReport::from_state(name, &state, status)
    }

    /// DELETE_BATCH*: flag and expunge `uids` in fixed-size batches.
    ///
    /// Cancellation is checked before each batch; a batch in flight always
    /// runs to completion or failure.
    fn delete_in_batches(
        &self,
        session: &mut dyn MailSession,
        name: &str,
        uids: &[Uid],
        progress: &mut ProgressReporter,
    ) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();

        for batch in uids.chunks(self.options.batch_size.max(1)) {
            if self.cancel.is_cancelled() {
                warn!("Stop requested mid-mailbox {}", name);
                outcome.cancelled = true;
                break;
            }

            match self.delete_batch(session, batch) {
                Ok(()) => {
                    outcome.deleted += batch.len() as u64;
                    progress.update(ProgressUpdate::deleted(batch.len()), true);
                    self.clock.sleep(self.options.pause());
                }
                Err(failure) => {
                    warn!(
                        "Batch of {} in {} failed, moving on: {}",
                        batch.len(),
                        name,
                        failure
                    );
                    outcome.failed += 1;
                    self.retry.cool_down();
                }
            }
        }

        outcome
    }

    fn delete_batch(
        &self,
        session: &mut dyn MailSession,
        batch: &[Uid],
    ) -> Result<(), RetryFailure> {
        self.retry.run("mark deleted", || session.mark_deleted(batch))?;
        self.retry.run("expunge", || session.expunge())?;
        Ok(())
    }
}
