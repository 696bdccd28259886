//! Run orchestration: discover mailboxes, then purge them one by one
//!
//! Mailboxes are processed strictly sequentially over a single session.
//! A mailbox that fails never stops the run; only configuration problems
//! and a failed LIST do.

use log::{info, warn};
use std::sync::Arc;
use std::time::Instant;

use crate::cancel::CancellationToken;
use crate::clock::Clock;
use crate::config::PurgeOptions;
use crate::discovery::{MailboxFilter, discover};
use crate::error::{ConfigError, PurgeError};
use crate::models::{Mailbox, MailboxKind};
use crate::retry::RetryExecutor;
use crate::scan::{DeletionEngine, MailboxReport, ProgressReporter, ScanStatus};
use crate::session::MailSession;

/// Totals of a complete run
#[derive(Debug, Default, Clone)]
pub struct PurgeSummary {
    /// One report per mailbox attempted, in processing order
    pub mailboxes: Vec<MailboxReport>,
    pub total_seen: u64,
    pub total_deleted: u64,
    /// Mailboxes that could not be opened
    pub skipped: usize,
    /// Whether the run stopped early on a cancellation request
    pub cancelled: bool,
    pub duration_ms: u64,
}

impl PurgeSummary {
    fn record(&mut self, report: MailboxReport) {
        self.total_seen += report.seen;
        self.total_deleted += report.deleted;
        if report.status == ScanStatus::Skipped {
            self.skipped += 1;
        }
        if report.status == ScanStatus::Cancelled {
            self.cancelled = true;
        }
        self.mailboxes.push(report);
    }
}

/// One line of a folder listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderReport {
    pub name: String,
    pub kind: MailboxKind,
    /// Message count, or `None` if the folder could not be opened
    pub exists: Option<u32>,
}

/// Drives discovery and the deletion engine over one session
pub struct Purger {
    engine: DeletionEngine,
    filter: MailboxFilter,
    retry: RetryExecutor,
    clock: Arc<dyn Clock>,
    cancel: CancellationToken,
}

impl Purger {
    /// Create a purger, refusing invalid or unconfirmed destructive options
    pub fn new(
        options: PurgeOptions,
        clock: Arc<dyn Clock>,
        cancel: CancellationToken,
    ) -> Result<Self, ConfigError> {
        options.validate()?;
        Ok(Self {
            filter: MailboxFilter::from_options(&options),
            retry: RetryExecutor::new(options.retry.clone(), clock.clone()),
            engine: DeletionEngine::new(options, clock.clone(), cancel.clone()),
            clock,
            cancel,
        })
    }

    pub fn options(&self) -> &PurgeOptions {
        self.engine.options()
    }

    /// List, classify, filter and order the session's mailboxes
    pub fn discover(&self, session: &mut dyn MailSession) -> Result<Vec<Mailbox>, PurgeError> {
        let listing = self
            .retry
            .run("list", || session.list_mailboxes())
            .map_err(PurgeError::ListMailboxes)?;
        Ok(discover(&listing, &self.filter))
    }

    /// Purge every discovered mailbox in order
    pub fn run(
        &self,
        session: &mut dyn MailSession,
        progress: &mut ProgressReporter,
    ) -> Result<PurgeSummary, PurgeError> {
        let start = Instant::now();
        let mut summary = PurgeSummary::default();

        let mailboxes = self.discover(session)?;
        if mailboxes.is_empty() {
            warn!("No matching folders.");
        }

        for (i, mailbox) in mailboxes.iter().enumerate() {
            if self.cancel.is_cancelled() {
                warn!("Stop requested; halting before {}", mailbox.name);
                summary.cancelled = true;
                break;
            }
            if i > 0 {
                self.clock.sleep(self.options().mailbox_pause());
            }

            info!("Processing mailbox: {} (kind={})", mailbox.name, mailbox.kind);
            let report = self.engine.purge_mailbox(session, mailbox, progress);
            summary.record(report);
        }

        summary.duration_ms = start.elapsed().as_millis() as u64;
        if self.options().is_destructive() {
            info!("[complete] Deleted {} messages.", summary.total_deleted);
        } else {
            info!("[dry-run complete] Total messages seen: {}", summary.total_seen);
        }
        Ok(summary)
    }

    /// Discovered mailboxes with their message counts, without touching mail
    pub fn list_folders(
        &self,
        session: &mut dyn MailSession,
    ) -> Result<Vec<FolderReport>, PurgeError> {
        let mailboxes = self.discover(session)?;
        let mut folders = Vec::with_capacity(mailboxes.len());

        for mailbox in mailboxes {
            let exists = self
                .retry
                .once("open", || session.open(&mailbox.name, true))
                .ok();
            if exists.is_some() {
                if let Err(failure) = self.retry.run("close", || session.close()) {
                    warn!("Could not close {}: {}", mailbox.name, failure);
                }
            }
            folders.push(FolderReport {
                name: mailbox.name,
                kind: mailbox.kind,
                exists,
            });
        }

        Ok(folders)
    }
}
