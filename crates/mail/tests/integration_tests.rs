//! Integration tests for the mail crate
//!
//! These tests drive complete purge runs against the in-memory session.

use chrono::{Days, NaiveDate};
use mail::{
    CancellationToken, ConfigError, InMemorySession, MailSession, ManualClock, MemoryMailbox,
    ProgressReporter, PurgeOptions, Purger, RetryPolicy, ScanStatus, SearchCriteria, SessionError,
    SessionOp,
};
use std::sync::Arc;
use std::time::Duration;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn today() -> NaiveDate {
    date(2025, 6, 15)
}

/// Helper producing `per_day` messages on each of `days` days from `first`
fn daily(first: NaiveDate, days: u64, per_day: usize) -> Vec<NaiveDate> {
    (0..days)
        .flat_map(|offset| std::iter::repeat_n(first + Days::new(offset), per_day))
        .collect()
}

fn destructive() -> PurgeOptions {
    PurgeOptions {
        dry_run: false,
        confirm_destructive: true,
        ..Default::default()
    }
}

fn purger(options: PurgeOptions) -> (Purger, Arc<ManualClock>, CancellationToken) {
    let clock = Arc::new(ManualClock::new(today()));
    let cancel = CancellationToken::new();
    let purger = Purger::new(options, clock.clone(), cancel.clone()).unwrap();
    (purger, clock, cancel)
}

fn run(purger: &Purger, session: &mut InMemorySession) -> mail::PurgeSummary {
    purger
        .run(session, &mut ProgressReporter::disabled())
        .unwrap()
}

fn date_ranges(session: &InMemorySession) -> Vec<mail::Window> {
    session
        .searches()
        .iter()
        .filter_map(|criteria| match criteria {
            SearchCriteria::DateRange(window) => Some(*window),
            SearchCriteria::All => None,
        })
        .collect()
}

#[test]
fn test_small_mailbox_takes_fast_path() {
    let (purger, _, _) = purger(destructive());
    let mut session = InMemorySession::new()
        .with_mailbox(MemoryMailbox::new("INBOX").with_messages_on(date(2021, 3, 4), 10));

    let summary = run(&purger, &mut session);
    let report = &summary.mailboxes[0];

    assert_eq!(report.status, ScanStatus::FastPath);
    assert_eq!((report.seen, report.deleted), (10, 10));
    assert_eq!(session.searches(), &[SearchCriteria::All]);
    assert_eq!(session.call_count(SessionOp::MarkDeleted), 1);
    assert_eq!(session.remaining("INBOX"), Some(0));
}

#[test]
fn test_fast_path_boundary() {
    for (count, fast) in [(50, true), (51, false)] {
        let (purger, _, _) = purger(destructive());
        let mut session = InMemorySession::new()
            .with_mailbox(MemoryMailbox::new("INBOX").with_messages_on(today(), count));

        let summary = run(&purger, &mut session);
        assert_eq!(summary.mailboxes[0].status == ScanStatus::FastPath, fast);
        assert_eq!(session.searches()[0] == SearchCriteria::All, fast);
        assert_eq!(session.remaining("INBOX"), Some(0));
    }
}

#[test]
fn test_large_mailbox_with_gap_widens_and_drains() {
    // 2,000 recent messages, a two-year gap, then 3,000 older ones
    let mut dates = daily(date(2025, 4, 27), 50, 40);
    dates.extend(daily(date(2023, 1, 1), 60, 50));
    let (purger, _, _) = purger(destructive());
    let mut session =
        InMemorySession::new().with_mailbox(MemoryMailbox::new("INBOX").with_messages(dates));

    let summary = run(&purger, &mut session);
    let report = &summary.mailboxes[0];

    assert_eq!(report.status, ScanStatus::Drained);
    assert_eq!(report.deleted, 5_000);
    assert_eq!(report.seen, 5_000);
    assert_eq!(session.remaining("INBOX"), Some(0));

    let windows = date_ranges(&session);
    assert_eq!(windows[0].end, date(2025, 6, 16));
    assert_eq!(windows[0].days(), 30);
    assert!(windows.iter().any(|w| w.days() == 60));
    // Spans never shrink and the scan stopped well before the hard stop
    assert!(windows.windows(2).all(|pair| pair[1].days() >= pair[0].days()));
    assert!(windows.iter().all(|w| w.start > date(1995, 1, 1)));
    // Contiguous across the restart
    assert!(windows.windows(2).all(|pair| pair[1].end == pair[0].start));
}

#[test]
fn test_cancel_mid_batch_keeps_partial_counts() {
    let mut dates = daily(date(2025, 6, 1), 10, 20);
    dates.extend(daily(date(2024, 1, 1), 1, 5));
    let (purger, _, cancel) = purger(destructive());
    let mut session =
        InMemorySession::new().with_mailbox(MemoryMailbox::new("INBOX").with_messages(dates));

    let token = cancel.clone();
    session.on_success(SessionOp::MarkDeleted, move || token.cancel());

    let summary = run(&purger, &mut session);
    let report = &summary.mailboxes[0];

    // The in-flight batch completes (flag and expunge), nothing after it
    assert_eq!(report.status, ScanStatus::Cancelled);
    assert_eq!((report.seen, report.deleted), (200, 50));
    assert_eq!(session.call_count(SessionOp::MarkDeleted), 1);
    assert_eq!(session.call_count(SessionOp::Expunge), 1);
    assert_eq!(session.searches().len(), 1);
    assert_eq!(session.remaining("INBOX"), Some(155));
    assert!(summary.cancelled);
}

#[test]
fn test_dry_run_is_idempotent() {
    let mut dates = daily(date(2025, 5, 1), 30, 3);
    dates.extend(daily(date(2024, 11, 1), 10, 2));
    let (purger, _, _) = purger(PurgeOptions::default());
    let mut session =
        InMemorySession::new().with_mailbox(MemoryMailbox::new("INBOX").with_messages(dates));

    let first = run(&purger, &mut session);
    let second = run(&purger, &mut session);

    assert_eq!(first.total_seen, 110);
    assert_eq!(first.total_seen, second.total_seen);
    assert_eq!(first.total_deleted, 0);
    assert_eq!(session.remaining("INBOX"), Some(110));
    assert_eq!(session.call_count(SessionOp::MarkDeleted), 0);
}

#[test]
fn test_stops_once_mailbox_is_empty() {
    let (purger, _, _) = purger(destructive());
    let mut session = InMemorySession::new()
        .with_mailbox(MemoryMailbox::new("INBOX").with_messages_on(today(), 60));

    let summary = run(&purger, &mut session);

    assert_eq!(summary.mailboxes[0].status, ScanStatus::Drained);
    assert_eq!(summary.mailboxes[0].windows, 1);
    assert_eq!(session.searches().len(), 1);
}

#[test]
fn test_empty_streak_aborts_without_growth() {
    let mut dates = daily(today(), 1, 60);
    dates.extend(daily(date(2024, 11, 1), 1, 10));
    let (purger, _, _) = purger(PurgeOptions {
        adaptive_windows: false,
        max_empty_windows: 3,
        ..destructive()
    });
    let mut session =
        InMemorySession::new().with_mailbox(MemoryMailbox::new("INBOX").with_messages(dates));

    let summary = run(&purger, &mut session);
    let report = &summary.mailboxes[0];

    assert_eq!(report.status, ScanStatus::Aborted);
    assert_eq!(report.deleted, 60);
    assert_eq!(report.windows, 4);
    // Mail beyond the point reached is left for the next run
    assert_eq!(session.remaining("INBOX"), Some(10));
}

#[test]
fn test_window_budget_spans_growth_restarts() {
    let (purger, _, _) = purger(PurgeOptions {
        max_windows: 8,
        max_empty_windows: 3,
        ..Default::default()
    });
    let mut session = InMemorySession::new()
        .with_mailbox(MemoryMailbox::new("INBOX").with_messages_on(today(), 60));

    let summary = run(&purger, &mut session);
    let report = &summary.mailboxes[0];

    assert_eq!(report.status, ScanStatus::Exhausted);
    assert_eq!(report.windows, 8);
    assert_eq!(session.searches().len(), 8);

    // 30 → 60 after window 4, 60 → 120 after window 7
    let spans: Vec<_> = date_ranges(&session).iter().map(|w| w.days()).collect();
    assert_eq!(spans, vec![30, 30, 30, 30, 60, 60, 60, 120]);
}

#[test]
fn test_scan_ends_at_hard_stop() {
    let (purger, _, _) = purger(PurgeOptions {
        max_years_back: 1,
        adaptive_windows: false,
        max_empty_windows: 100,
        ..Default::default()
    });
    let mut session = InMemorySession::new()
        .with_mailbox(MemoryMailbox::new("INBOX").with_messages_on(today(), 60));

    let summary = run(&purger, &mut session);
    let report = &summary.mailboxes[0];

    // 2024-01-01 to 2025-06-16 is 532 days: 17 full windows plus 22 days
    let windows = date_ranges(&session);
    assert_eq!(report.status, ScanStatus::Exhausted);
    assert_eq!(report.windows, 18);
    assert_eq!(windows.len(), 18);
    let last = windows[windows.len() - 1];
    assert_eq!(last.start, date(2024, 1, 1));
    assert_eq!(last.days(), 22);
}

#[test]
fn test_persistent_search_failure_aborts() {
    let (purger, clock, _) = purger(destructive());
    let mut session = InMemorySession::new()
        .with_mailbox(MemoryMailbox::new("INBOX").with_messages_on(today(), 60));
    for _ in 0..1_000 {
        session.fail_next(SessionOp::Search, SessionError::ConnectionLost);
    }

    let summary = run(&purger, &mut session);
    let report = &summary.mailboxes[0];

    // Failed searches count as empty windows: growth to 365 days after 10,
    // 20, 30 and 40 windows, then abort at 50 instead of using up 2,000
    assert_eq!(report.status, ScanStatus::Aborted);
    assert_eq!(report.windows, 50);
    assert_eq!(session.call_count(SessionOp::Search), 300);
    assert_eq!(session.remaining("INBOX"), Some(60));
    assert!(clock.total_slept() < Duration::from_secs(3_600));
}

#[test]
fn test_transient_failures_are_retried() {
    let (purger, clock, _) = purger(destructive());
    let mut session = InMemorySession::new()
        .with_mailbox(MemoryMailbox::new("INBOX").with_messages_on(today(), 80));
    session.fail_next(SessionOp::Search, SessionError::Timeout);
    session.fail_next(SessionOp::Search, SessionError::ConnectionLost);
    session.fail_next(SessionOp::Expunge, SessionError::Rejected("NO [UNAVAILABLE]".into()));

    let summary = run(&purger, &mut session);

    assert_eq!(summary.total_deleted, 80);
    assert_eq!(session.remaining("INBOX"), Some(0));
    let sleeps = clock.sleeps();
    assert!(sleeps.contains(&Duration::from_millis(800)));
    assert!(sleeps.contains(&Duration::from_millis(1_850)));
}

#[test]
fn test_retries_exhausted_skip_batch_only() {
    let (purger, _, _) = purger(PurgeOptions {
        retry: RetryPolicy::none(),
        ..destructive()
    });
    let mut session = InMemorySession::new()
        .with_mailbox(MemoryMailbox::new("INBOX").with_messages_on(date(2022, 2, 2), 30))
        .with_mailbox(MemoryMailbox::new("Work").with_messages_on(date(2022, 2, 2), 5));
    session.fail_next(SessionOp::Expunge, SessionError::Timeout);

    let summary = run(&purger, &mut session);

    // Flags set by the failed batch are expunged on close
    assert_eq!(summary.mailboxes[0].failed_batches, 1);
    assert_eq!(summary.mailboxes[0].deleted, 0);
    assert_eq!(session.remaining("INBOX"), Some(0));
    assert_eq!(summary.mailboxes[1].deleted, 5);
}

#[test]
fn test_discovery_order_and_skips() {
    let (purger, _, _) = purger(PurgeOptions::default());
    let mut session = InMemorySession::new()
        .with_mailbox(MemoryMailbox::new("[Gmail]").not_selectable())
        .with_mailbox(MemoryMailbox::new("[Gmail]/Spam").with_attribute("\\Junk"))
        .with_mailbox(MemoryMailbox::new("[Gmail]/Trash").with_attribute("\\Trash"))
        .with_mailbox(MemoryMailbox::new("Labels").not_selectable())
        .with_mailbox(MemoryMailbox::new("[Gmail]/All Mail").with_attribute("\\All"))
        .with_mailbox(MemoryMailbox::new("INBOX").with_messages_on(today(), 3));

    let mailboxes = purger.discover(&mut session).unwrap();
    let names: Vec<_> = mailboxes.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["INBOX", "[Gmail]/All Mail", "Labels", "[Gmail]/Trash", "[Gmail]/Spam"]
    );

    let summary = run(&purger, &mut session);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.mailboxes[2].status, ScanStatus::Skipped);
    assert_eq!(summary.mailboxes[4].status, ScanStatus::Empty);
    assert_eq!(summary.total_seen, 3);
}

#[test]
fn test_unconfirmed_destructive_run_refused() {
    let options = PurgeOptions {
        dry_run: false,
        ..Default::default()
    };
    let result = Purger::new(
        options,
        Arc::new(ManualClock::new(today())),
        CancellationToken::new(),
    );
    assert!(matches!(result, Err(ConfigError::MissingConfirmation)));
}

#[test]
fn test_logout_ends_session() {
    let (purger, _, _) = purger(PurgeOptions::default());
    let mut session = InMemorySession::new()
        .with_mailbox(MemoryMailbox::new("INBOX").with_messages_on(today(), 2));

    run(&purger, &mut session);
    session.logout().unwrap();

    assert!(session.is_logged_out());
    assert!(matches!(
        session.open("INBOX", true),
        Err(SessionError::ConnectionLost)
    ));
}
