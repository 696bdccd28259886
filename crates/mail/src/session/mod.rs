//! Remote mail session abstraction
//!
//! The purge core only ever talks to the server through [`MailSession`].
//! The real implementation lives in [`crate::transport`]; [`InMemorySession`]
//! backs tests and simulations.

mod memory;

pub use memory::{InMemorySession, MemoryMailbox, SessionOp};

use chrono::NaiveDate;
use std::fmt;

use crate::models::{RawMailbox, Uid, Window};

/// Whether a failed call is worth repeating
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Timeouts, dropped connections, I/O errors and NO/BAD replies
    Transient,
    /// Anything a retry cannot fix (TLS, auth, unparseable responses)
    Fatal,
}

/// Error returned by a single remote operation
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("operation timed out")]
    Timeout,

    #[error("connection lost")]
    ConnectionLost,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Server answered with a negative status (NO/BAD)
    #[error("server rejected command: {0}")]
    Rejected(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("TLS error: {0}")]
    Tls(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    /// An operation that needs a selected mailbox was called without one
    #[error("no mailbox is open")]
    NoMailbox,
}

impl SessionError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Timeout | Self::ConnectionLost | Self::Io(_) | Self::Rejected(_) => {
                FailureKind::Transient
            }
            Self::Protocol(_) | Self::Tls(_) | Self::Auth(_) | Self::NoMailbox => {
                FailureKind::Fatal
            }
        }
    }

    pub fn is_transient(&self) -> bool {
        self.kind() == FailureKind::Transient
    }
}

/// Search criteria understood by [`MailSession::search`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchCriteria {
    All,
    /// Messages dated on/after `start` and before `end`
    DateRange(Window),
}

impl SearchCriteria {
    /// Render as an IMAP SEARCH query string
    pub fn to_imap_query(&self) -> String {
        match self {
            Self::All => "ALL".to_string(),
            Self::DateRange(window) => format!(
                "SINCE {} BEFORE {}",
                imap_date(window.start),
                imap_date(window.end)
            ),
        }
    }
}

impl fmt::Display for SearchCriteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_imap_query())
    }
}

/// Format a date the way IMAP SEARCH expects it (e.g. `01-Jan-2024`)
pub fn imap_date(date: NaiveDate) -> String {
    date.format("%d-%b-%Y").to_string()
}

/// Join UIDs into a single comma-delimited sequence set
pub fn uid_set(uids: &[Uid]) -> String {
    uids.iter()
        .map(|uid| uid.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Operations the purge core needs from a remote mail session
///
/// Exactly one mailbox is open at a time. Every call blocks until the
/// server answers or the transport times out.
pub trait MailSession {
    /// Open a mailbox and return its EXISTS count
    fn open(&mut self, mailbox: &str, read_only: bool) -> Result<u32, SessionError>;

    /// Search the open mailbox, returning UIDs in ascending order
    fn search(&mut self, criteria: &SearchCriteria) -> Result<Vec<Uid>, SessionError>;

    /// Flag a batch of UIDs in the open mailbox as `\Deleted`
    fn mark_deleted(&mut self, uids: &[Uid]) -> Result<(), SessionError>;

    /// Permanently remove every flagged message in the open mailbox
    fn expunge(&mut self) -> Result<(), SessionError>;

    /// Release the open mailbox
    fn close(&mut self) -> Result<(), SessionError>;

    /// End the session
    fn logout(&mut self) -> Result<(), SessionError>;

    /// Enumerate mailboxes with their attribute flags
    fn list_mailboxes(&mut self) -> Result<Vec<RawMailbox>, SessionError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_imap_date_format() {
        assert_eq!(imap_date(date(2024, 3, 5)), "05-Mar-2024");
        assert_eq!(imap_date(date(1999, 12, 31)), "31-Dec-1999");
    }

    #[test]
    fn test_search_query() {
        assert_eq!(SearchCriteria::All.to_imap_query(), "ALL");

        let window = Window::new(date(2024, 1, 1), date(2024, 1, 31));
        assert_eq!(
            SearchCriteria::DateRange(window).to_imap_query(),
            "SINCE 01-Jan-2024 BEFORE 31-Jan-2024"
        );
    }

    #[test]
    fn test_uid_set() {
        assert_eq!(uid_set(&[1, 5, 42]), "1,5,42");
        assert_eq!(uid_set(&[7]), "7");
        assert_eq!(uid_set(&[]), "");
    }

    #[test]
    fn test_error_classification() {
        assert!(SessionError::Timeout.is_transient());
        assert!(SessionError::ConnectionLost.is_transient());
        assert!(SessionError::Rejected("NO [UNAVAILABLE]".into()).is_transient());
        assert!(
            SessionError::Io(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe"))
                .is_transient()
        );
        assert_eq!(SessionError::Auth("bad password".into()).kind(), FailureKind::Fatal);
        assert_eq!(SessionError::Protocol("garbage".into()).kind(), FailureKind::Fatal);
    }
}
