//! Mail crate - Bulk mailbox purging over IMAP
//!
//! This crate provides the purge engine and everything around it:
//! - Domain models (Mailbox, Window)
//! - The `MailSession` abstraction with IMAP and in-memory backends
//! - Mailbox discovery, filtering and ordering
//! - Bounded retry with exponential backoff
//! - The adaptive backward time-windowed deletion scanner
//! - Run orchestration over a single session
//!
//! Everything here is synchronous; callers wanting async wrap a run in a
//! blocking task.

pub mod cancel;
pub mod clock;
pub mod config;
pub mod discovery;
pub mod error;
pub mod models;
pub mod purge;
pub mod retry;
pub mod scan;
pub mod session;
pub mod transport;

pub use cancel::CancellationToken;
pub use clock::{Clock, ManualClock, SystemClock};
pub use crate::config::{ImapAccount, ImapAuth, ImapCredentials, PartialCredentials, PurgeOptions, RetryPolicy};
pub use discovery::{MailboxFilter, discover, mailbox_rank};
pub use error::{ConfigError, PurgeError};
pub use models::{Mailbox, MailboxKind, RawMailbox, Uid, Window};
pub use purge::{FolderReport, PurgeSummary, Purger};
pub use retry::{RetryExecutor, RetryFailure};
pub use scan::{
    DeletionEngine, LogProgressSink, MailboxReport, ProgressReporter, ProgressSink, ProgressSnapshot,
    ScanStatus, WindowScanner,
};
pub use session::{FailureKind, InMemorySession, MailSession, MemoryMailbox, SearchCriteria, SessionError, SessionOp};
pub use transport::ImapSession;
