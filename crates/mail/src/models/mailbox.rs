//! Mailbox model representing a remote IMAP folder

use serde::{Deserialize, Serialize};
use std::fmt;

/// Server-advertised special-use attributes that classify a mailbox
pub mod attributes {
    pub const ALL: &str = "\\All";
    pub const TRASH: &str = "\\Trash";
    pub const JUNK: &str = "\\Junk";
    pub const SPAM: &str = "\\Spam";
    pub const NOSELECT: &str = "\\Noselect";
}

/// Role a mailbox plays on the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MailboxKind {
    #[default]
    Normal,
    /// Aggregate of every message (e.g. Gmail's "All Mail")
    All,
    Trash,
    Spam,
}

impl MailboxKind {
    /// Derive the kind from the attribute flags returned by LIST.
    ///
    /// The first special-use flag found wins; attribute matching is
    /// case-insensitive since servers differ in capitalisation.
    pub fn from_attributes<S: AsRef<str>>(flags: &[S]) -> Self {
        flags
            .iter()
            .find_map(|flag| {
                let flag = flag.as_ref();
                if flag.eq_ignore_ascii_case(attributes::ALL) {
                    Some(Self::All)
                } else if flag.eq_ignore_ascii_case(attributes::TRASH) {
                    Some(Self::Trash)
                } else if flag.eq_ignore_ascii_case(attributes::JUNK)
                    || flag.eq_ignore_ascii_case(attributes::SPAM)
                {
                    Some(Self::Spam)
                } else {
                    None
                }
            })
            .unwrap_or_default()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::All => "all",
            Self::Trash => "trash",
            Self::Spam => "spam",
        }
    }
}

impl fmt::Display for MailboxKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of a raw LIST response, before classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMailbox {
    /// Full mailbox name as the server reports it (e.g. "[Gmail]/Trash")
    pub name: String,
    /// Hierarchy delimiter, if the server reports one
    pub delimiter: Option<String>,
    /// Attribute flags such as `\Noselect` or `\Trash`
    pub attributes: Vec<String>,
}

impl RawMailbox {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            delimiter: Some("/".to_string()),
            attributes: Vec::new(),
        }
    }

    /// Builder method to add an attribute flag
    pub fn with_attribute(mut self, flag: impl Into<String>) -> Self {
        self.attributes.push(flag.into());
        self
    }

    fn has_attribute(&self, flag: &str) -> bool {
        self.attributes.iter().any(|a| a.eq_ignore_ascii_case(flag))
    }
}

/// A classified mailbox, ready to be purged
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Mailbox {
    pub name: String,
    pub kind: MailboxKind,
    /// False when the server advertised `\Noselect`. Advisory only: the
    /// engine still attempts to open it and skips on failure.
    pub selectable: bool,
}

impl Mailbox {
    /// Create a selectable mailbox of the given kind
    pub fn new(name: impl Into<String>, kind: MailboxKind) -> Self {
        Self {
            name: name.into(),
            kind,
            selectable: true,
        }
    }

    /// Whether the name looks like an inbox ("INBOX", "Work/Inbox", ...)
    pub fn is_inbox(&self) -> bool {
        self.name.to_lowercase().contains("inbox")
    }

    /// Whether this is the aggregate mailbox, by flag or by its usual name
    pub fn is_all_mail(&self) -> bool {
        self.kind == MailboxKind::All || self.name.to_lowercase().contains("all mail")
    }
}

impl From<&RawMailbox> for Mailbox {
    fn from(raw: &RawMailbox) -> Self {
        Self {
            name: raw.name.clone(),
            kind: MailboxKind::from_attributes(&raw.attributes),
            selectable: !raw.has_attribute(attributes::NOSELECT),
        }
    }
}
