//! # signup-sync
//!
//! Batch pipeline that turns signup-form notification emails into rows of a
//! tabular ledger and mails out the updated export.
//!
//! Each run of the pipeline:
//! - Scans the mailbox for unread notifications from the last week, trying
//!   the configured subject lines in order
//! - Extracts the registrant's name, phone and email from the notification
//!   body, substituting a placeholder for anything missing
//! - Appends one row per new signup to a ledger table, skipping signups that
//!   are already recorded
//! - Marks every processed notification as read
//! - Emails the refreshed table export to the report recipient, but only
//!   when the run recorded something new
//!
//! The mailbox, ledger and report transports are traits ([`Mailbox`],
//! [`Ledger`], [`Dispatcher`]), so any of them can be swapped out. The crate
//! ships an IMAP mailbox, a CSV-on-disk ledger and an SMTP dispatcher.
//!
//! ## Features
//!
//! - **`observability`**: Enables OpenTelemetry integration for distributed
//!   tracing. Without this feature, tracing spans are still emitted but
//!   require no OTEL dependencies.
//!
//! ## Quick Start
//!
//! ```no_run
//! use signup_sync::{CsvLedger, ImapMailbox, SignupPipeline, SmtpDispatcher, SyncConfig};
//!
//! # async fn example() -> signup_sync::Result<()> {
//! // Configure the run
//! let config = SyncConfig::builder()
//!     .account("signups@example.org")
//!     .password("app-password")  // Use an app-specific password for Gmail
//!     .report_recipient("reports@example.org")
//!     .build()?;
//!
//! // Wire the pipeline to real transports
//! let mailbox = ImapMailbox::connect(&config).await?;
//! let ledger = CsvLedger::new("./growth-track");
//! let dispatcher = SmtpDispatcher::new(&config)?;
//!
//! let mut pipeline = SignupPipeline::new(config, mailbox, ledger, dispatcher);
//! let summary = pipeline.run().await?;
//! println!("recorded {} of {} scanned", summary.accepted, summary.scanned);
//!
//! // Clean up
//! let (mut mailbox, _, _) = pipeline.into_parts();
//! mailbox.logout().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! All errors implement `std::error::Error` and provide context. Use
//! [`Error::scope`] to tell a failure that poisons the whole run apart from
//! one that only loses a single message:
//!
//! ```
//! use signup_sync::{Error, FailureScope};
//!
//! fn handle_error(error: &Error) {
//!     match error.scope() {
//!         FailureScope::Message => println!("Message skipped, run continues: {error}"),
//!         FailureScope::Run => println!("Run aborted: {error}"),
//!     }
//! }
//! ```
//!
//! The pipeline applies the same rule itself: message-scoped failures are
//! logged and counted in [`RunSummary::failed`], run-scoped failures abort.
//!
//! ## Observability
//!
//! The crate uses `tracing` for instrumentation. All major operations emit
//! spans with structured fields suitable for distributed tracing.
//!
//! ### Span Naming Convention
//!
//! - `SignupPipeline::run` - One full pipeline run
//! - `SignupPipeline::process_message` - Handling of a single notification
//! - `ImapMailbox::connect` - Mailbox connection
//! - `ImapMailbox::list_unread` - Unread-message search
//! - `SmtpDispatcher::send` - Report delivery
//! - `connection::establish_tls` - TLS connection
//!
//! ### Standard Fields
//!
//! - `account` - Mailbox account (masked in production)
//! - `imap_host` - IMAP server hostname
//! - `folder` / `table` - Ledger destination
//! - `message` - Mailbox message identifier
//! - `recipient` - Report recipient
//!
//! Enable the `observability` feature for OpenTelemetry integration.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Public modules
pub mod config;
pub mod error;
pub mod extract;
pub mod ledger;
pub mod mailbox;
pub mod pipeline;
pub mod record;
pub mod report;

// Internal modules
mod connection;
mod csv;
mod csv_store;
mod dedup;
mod imap;
mod scanner;
mod smtp;

#[cfg(test)]
mod testkit;

// Re-exports for ergonomic API
pub use config::{MailboxTimeouts, SyncConfig, SyncConfigBuilder};
pub use csv_store::CsvLedger;
pub use error::{Error, ErrorCategory, FailureScope, Result};
pub use imap::ImapMailbox;
pub use ledger::{ExportFormat, FolderId, Ledger, LedgerTarget, TableId, TableStyle};
pub use mailbox::{FetchedMessage, Mailbox, MessageId};
pub use pipeline::{RunSummary, SignupPipeline};
pub use record::SignupRecord;
pub use report::{Dispatcher, MessageReceipt, OutgoingReport, ReportAttachment};
pub use smtp::SmtpDispatcher;
