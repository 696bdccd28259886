//! In-memory session implementation
//!
//! Simulates an IMAP server holding dated messages. Used by the test
//! suites to drive the purge engine without a network, with hooks for
//! injecting transient failures and observing every call made.

use chrono::NaiveDate;
use std::collections::{HashMap, VecDeque};

use super::{MailSession, SearchCriteria, SessionError};
use crate::models::{RawMailbox, Uid, attributes};

/// Remote operation kinds, used to inject failures and count calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionOp {
    Open,
    Search,
    MarkDeleted,
    Expunge,
    Close,
    Logout,
    List,
}

#[derive(Debug, Clone)]
struct MemoryMessage {
    uid: Uid,
    date: NaiveDate,
    deleted: bool,
}

/// A simulated mailbox and its messages
#[derive(Debug, Clone)]
pub struct MemoryMailbox {
    name: String,
    attributes: Vec<String>,
    selectable: bool,
    messages: Vec<MemoryMessage>,
    next_uid: Uid,
}

impl MemoryMailbox {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            selectable: true,
            messages: Vec::new(),
            next_uid: 1,
        }
    }

    /// Builder method to add a LIST attribute such as `\Trash`
    pub fn with_attribute(mut self, flag: impl Into<String>) -> Self {
        self.attributes.push(flag.into());
        self
    }

    /// Builder method marking the mailbox as a virtual parent that
    /// refuses to be opened
    pub fn not_selectable(mut self) -> Self {
        self.selectable = false;
        self.attributes.push(attributes::NOSELECT.to_string());
        self
    }

    /// Builder method to add one message per date
    pub fn with_messages(mut self, dates: impl IntoIterator<Item = NaiveDate>) -> Self {
        for date in dates {
            self.messages.push(MemoryMessage {
                uid: self.next_uid,
                date,
                deleted: false,
            });
            self.next_uid += 1;
        }
        self
    }

    /// Builder method to add `count` messages on the same date
    pub fn with_messages_on(self, date: NaiveDate, count: usize) -> Self {
        self.with_messages(std::iter::repeat_n(date, count))
    }

    fn remaining(&self) -> usize {
        self.messages.len()
    }

    fn purge_flagged(&mut self) {
        self.messages.retain(|m| !m.deleted);
    }
}

type Hook = Box<dyn FnMut() + Send>;

/// In-memory implementation of [`MailSession`]
pub struct InMemorySession {
    mailboxes: Vec<MemoryMailbox>,
    /// Index of the open mailbox and whether it was opened read-only
    open: Option<(usize, bool)>,
    logged_out: bool,
    failures: HashMap<SessionOp, VecDeque<SessionError>>,
    hooks: HashMap<SessionOp, Hook>,
    calls: Vec<SessionOp>,
    searches: Vec<SearchCriteria>,
}

impl Default for InMemorySession {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemorySession {
    /// Create a session with no mailboxes
    pub fn new() -> Self {
        Self {
            mailboxes: Vec::new(),
            open: None,
            logged_out: false,
            failures: HashMap::new(),
            hooks: HashMap::new(),
            calls: Vec::new(),
            searches: Vec::new(),
        }
    }

    /// Builder method to add a mailbox; LIST returns them in insertion order
    pub fn with_mailbox(mut self, mailbox: MemoryMailbox) -> Self {
        self.mailboxes.push(mailbox);
        self
    }

    /// Make the next call of `op` fail with `error`. Queued failures are
    /// consumed in order, one per call.
    pub fn fail_next(&mut self, op: SessionOp, error: SessionError) {
        self.failures.entry(op).or_default().push_back(error);
    }

    /// Run `hook` after every successful call of `op`
    pub fn on_success(&mut self, op: SessionOp, hook: impl FnMut() + Send + 'static) {
        self.hooks.insert(op, Box::new(hook));
    }

    /// Number of times `op` was attempted, failures included
    pub fn call_count(&self, op: SessionOp) -> usize {
        self.calls.iter().filter(|c| **c == op).count()
    }

    /// Every search issued, in order
    pub fn searches(&self) -> &[SearchCriteria] {
        &self.searches
    }

    /// Messages still present (flagged or not) in the named mailbox
    pub fn remaining(&self, name: &str) -> Option<usize> {
        self.find(name).map(|i| self.mailboxes[i].remaining())
    }

    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }

    pub fn is_logged_out(&self) -> bool {
        self.logged_out
    }

    fn find(&self, name: &str) -> Option<usize> {
        self.mailboxes.iter().position(|m| m.name == name)
    }

    /// Record the call and pop an injected failure, if any
    fn begin(&mut self, op: SessionOp) -> Result<(), SessionError> {
        self.calls.push(op);
        if self.logged_out {
            return Err(SessionError::ConnectionLost);
        }
        match self.failures.get_mut(&op).and_then(|q| q.pop_front()) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn finish(&mut self, op: SessionOp) {
        if let Some(hook) = self.hooks.get_mut(&op) {
            hook();
        }
    }

    fn selected(&mut self) -> Result<(&mut MemoryMailbox, bool), SessionError> {
        let (idx, read_only) = self.open.ok_or(SessionError::NoMailbox)?;
        Ok((&mut self.mailboxes[idx], read_only))
    }
}

impl MailSession for InMemorySession {
    fn open(&mut self, mailbox: &str, read_only: bool) -> Result<u32, SessionError> {
        self.begin(SessionOp::Open)?;
        // Selecting a new mailbox deselects the current one, as in IMAP
        self.open = None;
        let idx = self
            .find(mailbox)
            .ok_or_else(|| SessionError::Rejected(format!("[NONEXISTENT] {mailbox}")))?;
        if !self.mailboxes[idx].selectable {
            return Err(SessionError::Rejected(format!(
                "[NONEXISTENT] {mailbox} is not selectable"
            )));
        }
        self.open = Some((idx, read_only));
        let exists = self.mailboxes[idx].remaining() as u32;
        self.finish(SessionOp::Open);
        Ok(exists)
    }

    fn search(&mut self, criteria: &SearchCriteria) -> Result<Vec<Uid>, SessionError> {
        self.begin(SessionOp::Search)?;
        self.searches.push(*criteria);
        let (mailbox, _) = self.selected()?;
        let uids = mailbox
            .messages
            .iter()
            .filter(|m| match criteria {
                SearchCriteria::All => true,
                SearchCriteria::DateRange(window) => window.contains(m.date),
            })
            .map(|m| m.uid)
            .collect();
        self.finish(SessionOp::Search);
        Ok(uids)
    }

    fn mark_deleted(&mut self, uids: &[Uid]) -> Result<(), SessionError> {
        self.begin(SessionOp::MarkDeleted)?;
        let (mailbox, read_only) = self.selected()?;
        if read_only {
            return Err(SessionError::Rejected("mailbox is read-only".to_string()));
        }
        for message in mailbox.messages.iter_mut() {
            if uids.contains(&message.uid) {
                message.deleted = true;
            }
        }
        self.finish(SessionOp::MarkDeleted);
        Ok(())
    }

    fn expunge(&mut self) -> Result<(), SessionError> {
        self.begin(SessionOp::Expunge)?;
        let (mailbox, read_only) = self.selected()?;
        if read_only {
            return Err(SessionError::Rejected("mailbox is read-only".to_string()));
        }
        mailbox.purge_flagged();
        self.finish(SessionOp::Expunge);
        Ok(())
    }

    fn close(&mut self) -> Result<(), SessionError> {
        self.begin(SessionOp::Close)?;
        let (mailbox, read_only) = self.selected()?;
        // CLOSE on a read-write mailbox silently expunges flagged messages
        if !read_only {
            mailbox.purge_flagged();
        }
        self.open = None;
        self.finish(SessionOp::Close);
        Ok(())
    }

    fn logout(&mut self) -> Result<(), SessionError> {
        self.begin(SessionOp::Logout)?;
        self.open = None;
        self.logged_out = true;
        self.finish(SessionOp::Logout);
        Ok(())
    }

    fn list_mailboxes(&mut self) -> Result<Vec<RawMailbox>, SessionError> {
        self.begin(SessionOp::List)?;
        let listing = self
            .mailboxes
            .iter()
            .map(|m| RawMailbox {
                name: m.name.clone(),
                delimiter: Some("/".to_string()),
                attributes: m.attributes.clone(),
            })
            .collect();
        self.finish(SessionOp::List);
        Ok(listing)
    }
}
