//! Run-level error types

use crate::retry::RetryFailure;
use crate::session::SessionError;

/// A configuration problem detected before any remote interaction
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("destructive run requires explicit confirmation (--i-understand-this-deletes-mail)")]
    MissingConfirmation,

    #[error("missing credentials: {0}")]
    MissingCredentials(String),

    #[error("invalid window specification: {0}")]
    InvalidWindow(String),

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// Failure that ends a whole run rather than a single mailbox
#[derive(Debug, thiserror::Error)]
pub enum PurgeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("could not connect to {host}: {source}")]
    Connect {
        host: String,
        #[source]
        source: SessionError,
    },

    #[error("could not list mailboxes: {0}")]
    ListMailboxes(RetryFailure),
}
