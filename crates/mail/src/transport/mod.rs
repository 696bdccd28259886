//! IMAP over implicit TLS
//!
//! Implements [`MailSession`](crate::session::MailSession) on top of the
//! synchronous `imap` crate. Timeouts are set once on the socket and
//! surface as [`SessionError::Timeout`](crate::session::SessionError).

mod auth;
mod client;

pub use auth::XOAuth2;
pub use client::ImapSession;
