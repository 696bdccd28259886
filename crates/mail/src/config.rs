//! Configuration for purge runs
//!
//! [`PurgeOptions`] carries every tunable of the scan and is loaded from
//! `~/.config/mailpurge/mailpurge.json` when present, then overridden by
//! the command line. [`ImapCredentials`] are resolved (in order of
//! priority) from:
//! 1. Explicit values (command-line flags)
//! 2. JSON file (~/.config/mailpurge/credentials.json)
//! 3. Environment variables

use anyhow::Result;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;

/// Options filename in the mailpurge config directory
pub const OPTIONS_FILE: &str = "mailpurge.json";

/// Credentials filename in the mailpurge config directory
const CREDENTIALS_FILE: &str = "credentials.json";

/// Retry and backoff settings applied to every remote call
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    pub base_delay_ms: u64,
    /// Linear term added per attempt on top of the exponential delay
    pub jitter_ms: u64,
    /// Extra pause after a batch still fails once retries are exhausted
    pub failure_cooldown_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay_ms: 800,
            jitter_ms: 250,
            failure_cooldown_ms: 5_000,
        }
    }
}

impl RetryPolicy {
    /// Policy that never retries and never waits
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay_ms: 0,
            jitter_ms: 0,
            failure_cooldown_ms: 0,
        }
    }

    /// Backoff before retry number `attempt` (0-based):
    /// `base * 2^attempt + jitter * attempt`
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponential = self
            .base_delay_ms
            .saturating_mul(1u64.checked_shl(attempt).unwrap_or(u64::MAX));
        let linear = self.jitter_ms.saturating_mul(u64::from(attempt));
        Duration::from_millis(exponential.saturating_add(linear))
    }

    pub fn failure_cooldown(&self) -> Duration {
        Duration::from_millis(self.failure_cooldown_ms)
    }
}

/// Every tunable of a purge run
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PurgeOptions {
    /// UIDs flagged and expunged per round-trip
    pub batch_size: usize,
    /// Courtesy pause between batches
    pub pause_ms: u64,
    /// Pause between mailboxes (never shorter than 500 ms)
    pub mailbox_pause_ms: u64,
    /// Mailboxes with at most this many messages take the fast path
    pub min_messages: u32,
    /// Initial window span in days
    pub window_days: u32,
    /// Double the span after an empty streak instead of aborting
    pub adaptive_windows: bool,
    /// Upper cap for adaptive growth
    pub max_window_days: u32,
    /// Consecutive empty windows that trigger growth or abort
    pub max_empty_windows: u32,
    /// Window budget per mailbox, across span changes
    pub max_windows: u32,
    /// History older than Jan 1st of (this year - N) is never scanned
    pub max_years_back: u32,
    pub dry_run: bool,
    /// Must be set for any run with `dry_run == false`
    pub confirm_destructive: bool,
    pub progress: bool,
    pub progress_interval_ms: u64,
    /// Case-insensitive name substrings; if non-empty a mailbox must match one
    pub include: Vec<String>,
    /// Case-insensitive name substrings; any match drops the mailbox
    pub exclude: Vec<String>,
    /// Only process Inbox and All Mail style mailboxes
    pub only_important: bool,
    pub retry: RetryPolicy,
}

impl Default for PurgeOptions {
    fn default() -> Self {
        Self {
            batch_size: 50,
            pause_ms: 500,
            mailbox_pause_ms: 500,
            min_messages: 50,
            window_days: 30,
            adaptive_windows: true,
            max_window_days: 365,
            max_empty_windows: 10,
            max_windows: 2000,
            max_years_back: 30,
            dry_run: true,
            confirm_destructive: false,
            progress: true,
            progress_interval_ms: 500,
            include: Vec::new(),
            exclude: Vec::new(),
            only_important: false,
            retry: RetryPolicy::default(),
        }
    }
}

impl PurgeOptions {
    /// Load options from the config directory, falling back to defaults
    /// when no file exists
    pub fn load() -> Result<Self> {
        Ok(config::load_json_if_exists::<Self>(OPTIONS_FILE)?.unwrap_or_default())
    }

    /// Load options from a specific JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        config::load_json_file(path)
    }

    /// Reject configurations that must not reach the server
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "batch_size",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.window_days == 0 {
            return Err(ConfigError::InvalidWindow(
                "window_days must be at least 1".to_string(),
            ));
        }
        if self.max_window_days < self.window_days {
            return Err(ConfigError::InvalidWindow(format!(
                "max_window_days ({}) is smaller than window_days ({})",
                self.max_window_days, self.window_days
            )));
        }
        if self.max_empty_windows == 0 {
            return Err(ConfigError::InvalidWindow(
                "max_empty_windows must be at least 1".to_string(),
            ));
        }
        if self.max_windows == 0 {
            return Err(ConfigError::InvalidWindow(
                "max_windows must be at least 1".to_string(),
            ));
        }
        if self.max_years_back == 0 {
            return Err(ConfigError::InvalidWindow(
                "max_years_back must be at least 1".to_string(),
            ));
        }
        if !self.dry_run && !self.confirm_destructive {
            return Err(ConfigError::MissingConfirmation);
        }
        Ok(())
    }

    /// Whether this run actually deletes mail
    pub fn is_destructive(&self) -> bool {
        !self.dry_run && self.confirm_destructive
    }

    pub fn pause(&self) -> Duration {
        Duration::from_millis(self.pause_ms)
    }

    pub fn mailbox_pause(&self) -> Duration {
        Duration::from_millis(self.mailbox_pause_ms.max(500))
    }

    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }
}

/// How to authenticate the IMAP session
#[derive(Clone, PartialEq, Eq)]
pub enum ImapAuth {
    Password(String),
    /// OAuth2 access token for the XOAUTH2 SASL mechanism
    XOAuth2(String),
}

impl fmt::Debug for ImapAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Password(_) => f.write_str("Password(<redacted>)"),
            Self::XOAuth2(_) => f.write_str("XOAuth2(<redacted>)"),
        }
    }
}

/// Resolved login credentials
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImapCredentials {
    pub user: String,
    pub auth: ImapAuth,
}

/// Credentials as found in one source; any field may be missing
#[derive(Debug, Default, Clone, Deserialize)]
pub struct PartialCredentials {
    pub user: Option<String>,
    pub password: Option<String>,
    pub xoauth2_token: Option<String>,
}

impl PartialCredentials {
    /// Fill fields missing from `self` with those from `other`
    pub fn or(self, other: PartialCredentials) -> Self {
        Self {
            user: self.user.or(other.user),
            password: self.password.or(other.password),
            xoauth2_token: self.xoauth2_token.or(other.xoauth2_token),
        }
    }

    /// Read `MAILPURGE_USER`, `MAILPURGE_PASSWORD` and
    /// `MAILPURGE_XOAUTH2_TOKEN` through `lookup`
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());
        Self {
            user: get("MAILPURGE_USER"),
            password: get("MAILPURGE_PASSWORD"),
            xoauth2_token: get("MAILPURGE_XOAUTH2_TOKEN"),
        }
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Parse credentials from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Turn into usable credentials. An XOAUTH2 token wins over a password.
    pub fn into_credentials(self) -> Result<ImapCredentials, ConfigError> {
        let user = self
            .user
            .ok_or_else(|| ConfigError::MissingCredentials("no user given".to_string()))?;
        let auth = match (self.xoauth2_token, self.password) {
            (Some(token), _) => ImapAuth::XOAuth2(token),
            (None, Some(password)) => ImapAuth::Password(password),
            (None, None) => {
                return Err(ConfigError::MissingCredentials(format!(
                    "password or XOAUTH2 token required for {user}"
                )));
            }
        };
        Ok(ImapCredentials { user, auth })
    }
}

impl ImapCredentials {
    /// Resolve credentials from explicit values, then the credentials
    /// file, then the environment
    pub fn resolve(explicit: PartialCredentials) -> Result<Self> {
        let from_file: Option<PartialCredentials> = config::load_json_if_exists(CREDENTIALS_FILE)?;
        let merged = explicit
            .or(from_file.unwrap_or_default())
            .or(PartialCredentials::from_env());
        Ok(merged.into_credentials()?)
    }

    /// Get the default credentials file path (~/.config/mailpurge/credentials.json)
    pub fn default_credentials_path() -> Option<PathBuf> {
        config::config_path(CREDENTIALS_FILE)
    }
}

/// Where and how to connect
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImapAccount {
    pub host: String,
    pub port: u16,
    pub credentials: ImapCredentials,
    /// Applied to connect, read and write on the socket
    pub timeout: Duration,
}

impl ImapAccount {
    pub const DEFAULT_HOST: &'static str = "imap.gmail.com";
    pub const DEFAULT_PORT: u16 = 993;
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

    /// Account on the default host (Gmail over implicit TLS)
    pub fn new(credentials: ImapCredentials) -> Self {
        Self {
            host: Self::DEFAULT_HOST.to_string(),
            port: Self::DEFAULT_PORT,
            credentials,
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }
}
