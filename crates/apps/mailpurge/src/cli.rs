//! Command-line surface

use clap::Parser;
use clap::builder::BoolishValueParser;
use mail::{ImapAccount, ImapCredentials, PartialCredentials, PurgeOptions};
use std::path::PathBuf;
use std::time::Duration;

/// Delete mail over IMAP, newest to oldest, in small batches
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Account to log in as
    #[arg(long, help_heading = "Auth")]
    pub user: Option<String>,

    /// App password
    #[arg(long, help_heading = "Auth")]
    pub password: Option<String>,

    /// OAuth2 access token; takes precedence over a password
    #[arg(long = "xoauth2-access-token", help_heading = "Auth")]
    pub xoauth2_token: Option<String>,

    #[arg(long, default_value = ImapAccount::DEFAULT_HOST)]
    pub server: String,

    #[arg(long, default_value_t = ImapAccount::DEFAULT_PORT)]
    pub port: u16,

    /// Socket timeout in seconds
    #[arg(long, default_value = "60", value_parser = parse_seconds)]
    pub timeout: Duration,

    #[arg(long, help_heading = "Performance")]
    pub batch_size: Option<usize>,

    /// Seconds to sleep between batches
    #[arg(long, value_parser = parse_seconds, help_heading = "Performance")]
    pub pause: Option<Duration>,

    /// Mailboxes with at most this many messages are purged in one pass
    #[arg(long, help_heading = "Performance")]
    pub min_messages: Option<u32>,

    #[arg(long, help_heading = "Performance")]
    pub max_empty_windows: Option<u32>,

    #[arg(long, help_heading = "Performance")]
    pub max_windows: Option<u32>,

    #[arg(long, help_heading = "Performance")]
    pub max_years_back: Option<u32>,

    /// Only report what would be deleted (default: true)
    #[arg(long, value_parser = BoolishValueParser::new(), help_heading = "Performance")]
    pub dry_run: Option<bool>,

    /// Required for any run with --dry-run false
    #[arg(long, help_heading = "Performance")]
    pub i_understand_this_deletes_mail: bool,

    /// Initial days per window
    #[arg(long, help_heading = "Windowing")]
    pub window_days: Option<u32>,

    /// Double the window size after repeated empty windows instead of aborting
    #[arg(long, value_parser = BoolishValueParser::new(), help_heading = "Windowing")]
    pub adaptive_windows: Option<bool>,

    /// Upper cap for adaptive window size
    #[arg(long, help_heading = "Windowing")]
    pub max_window_days: Option<u32>,

    /// Only process mailboxes whose name contains this (repeatable)
    #[arg(long, help_heading = "Mailbox Filtering")]
    pub include: Vec<String>,

    /// Skip mailboxes whose name contains this (repeatable)
    #[arg(long, help_heading = "Mailbox Filtering")]
    pub exclude: Vec<String>,

    /// Only process Inbox + All Mail (ignore other labels)
    #[arg(long, value_parser = BoolishValueParser::new(), help_heading = "Mailbox Filtering")]
    pub only_important: Option<bool>,

    #[arg(long, value_parser = BoolishValueParser::new(), help_heading = "Progress")]
    pub progress: Option<bool>,

    /// Minimum seconds between progress lines
    #[arg(long, value_parser = parse_seconds, help_heading = "Progress")]
    pub progress_interval: Option<Duration>,

    /// Print folders with message counts and exit
    #[arg(long)]
    pub list_folders: bool,

    /// Options file (default: ~/.config/mailpurge/mailpurge.json)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// More output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only warnings and errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

/// Parse a non-negative number of seconds, fractions allowed
fn parse_seconds(value: &str) -> Result<Duration, String> {
    let secs: f64 = value
        .parse()
        .map_err(|_| format!("`{value}` is not a number of seconds"))?;
    Duration::try_from_secs_f64(secs).map_err(|_| format!("`{value}` is not a valid duration"))
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl Args {
    /// Default log filter for env_logger
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            return "warn";
        }
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }

    /// Override file-loaded options with whatever was given on the command line
    pub fn apply_to(&self, options: &mut PurgeOptions) {
        if let Some(v) = self.batch_size {
            options.batch_size = v;
        }
        if let Some(v) = self.pause {
            options.pause_ms = millis(v);
            options.mailbox_pause_ms = millis(v);
        }
        if let Some(v) = self.min_messages {
            options.min_messages = v;
        }
        if let Some(v) = self.max_empty_windows {
            options.max_empty_windows = v;
        }
        if let Some(v) = self.max_windows {
            options.max_windows = v;
        }
        if let Some(v) = self.max_years_back {
            options.max_years_back = v;
        }
        if let Some(v) = self.dry_run {
            options.dry_run = v;
        }
        if self.i_understand_this_deletes_mail {
            options.confirm_destructive = true;
        }
        if let Some(v) = self.window_days {
            options.window_days = v;
        }
        if let Some(v) = self.adaptive_windows {
            options.adaptive_windows = v;
        }
        if let Some(v) = self.max_window_days {
            options.max_window_days = v;
        }
        if !self.include.is_empty() {
            options.include = self.include.clone();
        }
        if !self.exclude.is_empty() {
            options.exclude = self.exclude.clone();
        }
        if let Some(v) = self.only_important {
            options.only_important = v;
        }
        if let Some(v) = self.progress {
            options.progress = v;
        }
        if let Some(v) = self.progress_interval {
            options.progress_interval_ms = millis(v);
        }
    }

    /// Credentials given explicitly on the command line
    pub fn credentials(&self) -> PartialCredentials {
        PartialCredentials {
            user: self.user.clone(),
            password: self.password.clone(),
            xoauth2_token: self.xoauth2_token.clone(),
        }
    }

    pub fn account(&self, credentials: ImapCredentials) -> ImapAccount {
        ImapAccount {
            host: self.server.clone(),
            port: self.port,
            credentials,
            timeout: self.timeout,
        }
    }
}
