//! mailpurge - Bulk IMAP mailbox purger
//!
//! Connects to one account, discovers its mailboxes and deletes mail from
//! each, newest to oldest, in small rate-limited batches. Dry-run unless
//! told otherwise.

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info, warn};
use mail::{
    CancellationToken, ConfigError, ImapAccount, ImapCredentials, ImapSession, LogProgressSink,
    MailSession, ProgressReporter, PurgeError, PurgeOptions, Purger, SystemClock,
};
use std::process::ExitCode;
use std::sync::Arc;

mod cli;

use cli::Args;

/// Exit code for configuration and usage errors
const EXIT_USAGE: u8 = 2;

/// Waits for a shutdown signal (SIGINT or SIGTERM)
async fn wait_for_shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigint =
            signal(SignalKind::interrupt()).context("Failed to install SIGINT handler")?;
        let mut sigterm =
            signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;

        tokio::select! {
            _ = sigint.recv() => info!("Received SIGINT"),
            _ = sigterm.recv() => info!("Received SIGTERM"),
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .context("Failed to listen for shutdown signal")?;
        info!("Received Ctrl+C");
    }

    Ok(())
}

/// Load options from `--config` or the config directory, then apply CLI flags
fn load_options(args: &Args) -> Result<PurgeOptions> {
    let mut options = match &args.config {
        Some(path) => {
            info!("Loading options from: {}", path.display());
            PurgeOptions::from_file(path)
                .with_context(|| format!("Failed to load options from {}", path.display()))?
        }
        None => PurgeOptions::load().context("Failed to load options")?,
    };
    args.apply_to(&mut options);
    Ok(options)
}

/// Blocking part of the run: connect, purge (or list), log out
fn purge(
    account: ImapAccount,
    options: PurgeOptions,
    cancel: CancellationToken,
    list_folders: bool,
) -> Result<()> {
    let purger = Purger::new(options, Arc::new(SystemClock), cancel)?;

    info!("Connecting to {}:{} as {}", account.host, account.port, account.credentials.user);
    let mut session = ImapSession::connect(&account).map_err(|source| PurgeError::Connect {
        host: account.host.clone(),
        source,
    })?;

    let result = if list_folders {
        print_folders(&purger, &mut session)
    } else {
        let options = purger.options();
        let mut progress = ProgressReporter::new(
            options.progress,
            options.progress_interval(),
            Box::new(LogProgressSink),
        );
        purger
            .run(&mut session, &mut progress)
            .map(|summary| {
                if summary.cancelled {
                    warn!(
                        "Stopped early after {} mailbox(es); counts are partial",
                        summary.mailboxes.len()
                    );
                }
            })
            .map_err(anyhow::Error::from)
    };

    if let Err(e) = session.logout() {
        warn!("Logout failed: {}", e);
    }
    result
}

fn print_folders(purger: &Purger, session: &mut ImapSession) -> Result<()> {
    let folders = purger.list_folders(session)?;

    println!("\n[Folder list + message counts]\n");
    for folder in folders {
        let (count, state) = match folder.exists {
            Some(count) => (count, "selectable"),
            None => (0, "NON-SELECTABLE"),
        };
        println!(
            "{:40}  {:8}  {:16}  kind={}",
            folder.name, count, state, folder.kind
        );
    }
    Ok(())
}

async fn run(args: Args) -> Result<ExitCode> {
    let options = load_options(&args)?;
    if let Err(e) = options.validate() {
        error!("{}", e);
        return Ok(ExitCode::from(EXIT_USAGE));
    }

    let credentials = match ImapCredentials::resolve(args.credentials()) {
        Ok(credentials) => credentials,
        Err(e) if e.downcast_ref::<ConfigError>().is_some() => {
            error!("{}", e);
            if let Some(path) = ImapCredentials::default_credentials_path() {
                error!(
                    "Pass --user with --password or --xoauth2-access-token, place them in {}, \
                     or set MAILPURGE_USER and MAILPURGE_PASSWORD / MAILPURGE_XOAUTH2_TOKEN",
                    path.display()
                );
            }
            return Ok(ExitCode::from(EXIT_USAGE));
        }
        Err(e) => return Err(e),
    };
    let account = args.account(credentials);

    if !options.dry_run {
        warn!("Destructive run: messages will be permanently deleted");
    }

    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        match wait_for_shutdown_signal().await {
            Ok(()) => {
                warn!("Stop requested; finishing the current batch");
                signal_token.cancel();
            }
            Err(e) => warn!("Signal handling unavailable: {:#}", e),
        }
    });

    let list_folders = args.list_folders;
    tokio::task::spawn_blocking(move || purge(account, options, cancel, list_folders))
        .await
        .context("Purge task failed")??;

    Ok(ExitCode::SUCCESS)
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(args.log_level()))
        .format_timestamp_millis()
        .init();

    // Bootstrap config directory
    if let Err(e) = config::init() {
        warn!("Failed to initialize config directory: {}", e);
    }

    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
