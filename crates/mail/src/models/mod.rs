//! Domain models for mailbox purging

mod mailbox;
mod window;

pub use mailbox::{Mailbox, MailboxKind, RawMailbox, attributes};
pub use window::{Uid, Window};
