//! Mailbox discovery: classify, filter and order a LIST response

use std::collections::HashSet;

use crate::config::PurgeOptions;
use crate::models::{Mailbox, MailboxKind, RawMailbox};

/// Gmail's namespace root, which never holds messages itself
const GMAIL_NAMESPACE: &str = "[gmail]";

/// Name filters applied to the listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MailboxFilter {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    /// Keep only inbox and All Mail style mailboxes
    pub only_important: bool,
}

impl MailboxFilter {
    pub fn from_options(options: &PurgeOptions) -> Self {
        Self {
            include: options.include.clone(),
            exclude: options.exclude.clone(),
            only_important: options.only_important,
        }
    }

    /// Whether a mailbox with this name passes the include/exclude filters
    pub fn matches(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        let hit = |pattern: &String| name.contains(&pattern.to_lowercase());

        if !self.include.is_empty() && !self.include.iter().any(hit) {
            return false;
        }
        !self.exclude.iter().any(hit)
    }
}

/// Get the processing rank for a mailbox (lower = earlier).
///
/// Inbox first, then All Mail, other folders, Trash and finally Spam.
/// Name-based inbox detection wins over any special-use flag.
pub fn mailbox_rank(mailbox: &Mailbox) -> u8 {
    if mailbox.is_inbox() {
        return 0;
    }
    if mailbox.is_all_mail() {
        return 1;
    }
    match mailbox.kind {
        MailboxKind::Normal | MailboxKind::All => 2,
        MailboxKind::Trash => 3,
        MailboxKind::Spam => 4,
    }
}

/// Turn a raw LIST response into the ordered list of mailboxes to purge.
///
/// # Arguments
/// * `listing` - Mailboxes as returned by the server
/// * `filter` - Include/exclude filters and the important-only switch
///
/// # Returns
/// De-duplicated mailboxes, stably sorted by [`mailbox_rank`]
pub fn discover(listing: &[RawMailbox], filter: &MailboxFilter) -> Vec<Mailbox> {
    let mut seen = HashSet::new();
    let mut mailboxes: Vec<Mailbox> = listing
        .iter()
        .filter(|raw| filter.matches(&raw.name))
        .filter(|raw| !raw.name.trim().eq_ignore_ascii_case(GMAIL_NAMESPACE))
        .map(Mailbox::from)
        .filter(|mailbox| !filter.only_important || mailbox.is_inbox() || mailbox.is_all_mail())
        .filter(|mailbox| seen.insert(mailbox.name.clone()))
        .collect();

    mailboxes.sort_by_key(mailbox_rank);
    mailboxes
}
