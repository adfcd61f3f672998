//! Run one full signup sync: scan, record, report.
//!
//! This example wires the pipeline to real transports: the configured IMAP
//! mailbox, a CSV ledger under `./growth-track` and the account's SMTP
//! relay. New signups are appended to the ledger and, when anything new was
//! recorded, the refreshed export is emailed to the report recipient.
//! Operational events are appended to `logs/signup-sync.log`, one timestamped
//! line per operation, warning or error.
//!
//! # Usage
//!
//! ```bash
//! export SIGNUP_SYNC_ACCOUNT="signups@yourdomain.org"
//! export SIGNUP_SYNC_PASSWORD="your-app-password"
//! export SIGNUP_SYNC_RECIPIENT="reports@yourdomain.org"
//! # Set log level (trace, debug, info, warn, error)
//! export RUST_LOG=signup_sync=debug
//!
//! cargo run --example weekly_run
//! ```
//!
//! For Gmail, you'll need to use an [App Password](https://support.google.com/accounts/answer/185833).

use std::env;

use signup_sync::{CsvLedger, ImapMailbox, SignupPipeline, SmtpDispatcher, SyncConfig};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> signup_sync::Result<()> {
    dotenvy::dotenv().ok();

    // Audit log: appended to ./logs/signup-sync.log, never rotated.
    // Use RUST_LOG to control log levels, e.g. RUST_LOG=signup_sync=debug
    // The guard flushes buffered lines on drop; keep it alive for the run.
    std::fs::create_dir_all("logs").expect("create log directory");
    let audit = tracing_appender::rolling::never("logs", "signup-sync.log");
    let (writer, _guard) = tracing_appender::non_blocking(audit);
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("signup_sync=info")),
        )
        .with_writer(writer)
        .with_ansi(false)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(true)
        .init();

    let account =
        env::var("SIGNUP_SYNC_ACCOUNT").expect("SIGNUP_SYNC_ACCOUNT environment variable required");
    let password = env::var("SIGNUP_SYNC_PASSWORD")
        .expect("SIGNUP_SYNC_PASSWORD environment variable required");
    let recipient = env::var("SIGNUP_SYNC_RECIPIENT")
        .expect("SIGNUP_SYNC_RECIPIENT environment variable required");

    // Build configuration - IMAP and SMTP hosts are derived from the
    // account domain unless set explicitly
    let config = SyncConfig::builder()
        .account(&account)
        .password(password)
        .report_recipient(recipient)
        .build()?;

    println!("Connecting to mailbox for {}...", account);

    let mailbox = ImapMailbox::connect(&config).await?;
    let ledger = CsvLedger::new("./growth-track");
    let dispatcher = SmtpDispatcher::new(&config)?;

    let mut pipeline = SignupPipeline::new(config, mailbox, ledger, dispatcher);
    let outcome = pipeline.run().await;

    // Log out on both paths; a failed run still releases the session
    let (mut mailbox, _, _) = pipeline.into_parts();
    if let Err(err) = mailbox.logout().await {
        tracing::warn!(error = %err, "logout failed");
    }

    match outcome {
        Ok(summary) => {
            println!("Scanned {} notification(s)", summary.scanned);
            println!("  recorded:           {}", summary.accepted);
            println!("  already recorded:   {}", summary.duplicates);
            println!("  failed:             {}", summary.failed);
            if summary.report_sent {
                println!("Report sent.");
            } else {
                println!("Nothing new recorded, report skipped.");
            }
            Ok(())
        }
        Err(err) => {
            tracing::error!(error = %err, category = %err.category(), "sync run failed");
            eprintln!("Sync run failed: {err}");
            Err(err)
        }
    }
}
