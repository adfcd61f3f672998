//! The signup pipeline: scan, extract, dedup, record, report.
//!
//! [`SignupPipeline`] owns the three collaborators (mailbox, ledger, report
//! dispatcher) and drives one batch run end to end. A run is a straight pass:
//! find unread notifications, process each one, and send the weekly report
//! if anything new was recorded.
//!
//! # Failure handling
//!
//! Per-message failures are contained: the message is logged, counted in
//! [`RunSummary::failed`] and skipped, and the loop moves on. Failures with
//! [`FailureScope::Run`](crate::FailureScope::Run) (the unread search, the
//! report path) abort the run and propagate to the caller.

use crate::config::SyncConfig;
use crate::dedup::is_duplicate;
use crate::error::{FailureScope, Result};
use crate::extract::{decode_body, extract_fields};
use crate::ledger::{resolve_target, Ledger, LedgerTarget};
use crate::mailbox::{Mailbox, MessageId};
use crate::record::{registration_date, SignupRecord};
use crate::report::{dispatch_report, Dispatcher};
use crate::scanner::find_unread_signups;
use chrono::Utc;
use tracing::{debug, error, info, instrument, warn};

/// Counters describing what one run did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Unread notifications the scan turned up.
    pub scanned: usize,
    /// New rows appended to the table.
    pub accepted: usize,
    /// Notifications skipped because an identical row already existed.
    pub duplicates: usize,
    /// Notifications skipped because processing them failed.
    pub failed: usize,
    /// Messages that were processed but could not be marked as read.
    pub mark_read_failures: usize,
    /// Whether the report went out (it does iff `accepted > 0`).
    pub report_sent: bool,
}

/// Batch pipeline transcribing signup notifications into a ledger table.
///
/// Create with [`SignupPipeline::new`], then call [`run`](Self::run) once per
/// scheduled sync. The pipeline is generic over its collaborators so tests
/// can swap in-memory fakes for the IMAP/CSV/SMTP implementations.
///
/// # Example
///
/// ```no_run
/// use signup_sync::{CsvLedger, ImapMailbox, SignupPipeline, SmtpDispatcher, SyncConfig};
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let config = SyncConfig::builder()
///     .account("signups@example.org")
///     .password("app-password")
///     .report_recipient("reports@example.org")
///     .build()?;
///
/// let mailbox = ImapMailbox::connect(&config).await?;
/// let ledger = CsvLedger::new("./growth-track");
/// let dispatcher = SmtpDispatcher::new(&config)?;
///
/// let mut pipeline = SignupPipeline::new(config, mailbox, ledger, dispatcher);
/// let summary = pipeline.run().await?;
/// println!("accepted {} new signups", summary.accepted);
/// # Ok(())
/// # }
/// ```
pub struct SignupPipeline<M, L, D> {
    config: SyncConfig,
    mailbox: M,
    ledger: L,
    dispatcher: D,
    /// Resolved once per run and reused for every write.
    target: Option<LedgerTarget>,
}

impl<M, L, D> std::fmt::Debug for SignupPipeline<M, L, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignupPipeline")
            .field("config", &self.config)
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

impl<M, L, D> SignupPipeline<M, L, D>
where
    M: Mailbox,
    L: Ledger,
    D: Dispatcher,
{
    /// Creates a pipeline over the given collaborators.
    #[must_use]
    pub fn new(config: SyncConfig, mailbox: M, ledger: L, dispatcher: D) -> Self {
        Self {
            config,
            mailbox,
            ledger,
            dispatcher,
            target: None,
        }
    }

    /// Takes the collaborators back out, for teardown such as a mailbox
    /// logout after the run.
    #[must_use]
    pub fn into_parts(self) -> (M, L, D) {
        (self.mailbox, self.ledger, self.dispatcher)
    }

    /// Runs one full sync pass.
    ///
    /// Scans for unread notifications in the configured window, processes
    /// each one (extract, dedup, append, mark read), and dispatches the
    /// report when at least one new row was recorded.
    ///
    /// # Errors
    ///
    /// Returns the first error whose scope is the whole run: a failed unread
    /// search, a failed export or report send. Per-message failures are
    /// counted in the summary instead.
    #[instrument(
        name = "SignupPipeline::run",
        skip(self),
        fields(
            folder = %self.config.folder_name,
            table = %self.config.table_title,
            lookback_days = self.config.lookback_days
        )
    )]
    pub async fn run(&mut self) -> Result<RunSummary> {
        let now = Utc::now();
        let since = self.config.window_start(now);
        let mut summary = RunSummary::default();

        let ids = find_unread_signups(&mut self.mailbox, &self.config.subjects, since).await?;
        summary.scanned = ids.len();
        info!(count = ids.len(), since = %since, "scan complete");

        for id in &ids {
            match self.process_message(id, &mut summary).await {
                Ok(()) => {}
                Err(err) if err.scope() == FailureScope::Message => {
                    error!(
                        message = %id,
                        error = %err,
                        category = %err.category(),
                        "message failed, skipping"
                    );
                    summary.failed += 1;
                }
                Err(err) => return Err(err),
            }
        }

        if summary.accepted > 0 {
            let target = self.ensure_target().await?;
            dispatch_report(
                &mut self.ledger,
                &mut self.dispatcher,
                &target.table,
                &self.config,
                since,
                now,
            )
            .await?;
            summary.report_sent = true;
        } else {
            debug!("nothing new recorded, skipping report");
        }

        info!(
            scanned = summary.scanned,
            accepted = summary.accepted,
            duplicates = summary.duplicates,
            failed = summary.failed,
            mark_read_failures = summary.mark_read_failures,
            report_sent = summary.report_sent,
            "run complete"
        );
        Ok(summary)
    }

    /// Handles one notification end to end.
    ///
    /// Ordering matters here: the row is appended (or judged a duplicate)
    /// before the message is marked read, so an append failure leaves the
    /// message unread and the next run retries it. A mark-read failure after
    /// a successful append is only logged; the row stays.
    #[instrument(
        name = "SignupPipeline::process_message",
        skip_all,
        fields(message = %id)
    )]
    async fn process_message(&mut self, id: &MessageId, summary: &mut RunSummary) -> Result<()> {
        let message = self.mailbox.fetch(id).await?;

        let body = match decode_body(&message.raw) {
            Ok(body) => body,
            Err(err) => {
                warn!(error = %err, "could not decode message body, recording placeholders");
                String::new()
            }
        };

        let fields = extract_fields(&body);
        let missing = fields.missing();
        if !missing.is_empty() {
            warn!(missing = ?missing, "notification is missing fields");
        }

        let record = SignupRecord::from_fields(
            registration_date(message.received_at_ms),
            fields.full_name,
            fields.phone,
            fields.email,
        );

        let target = self.ensure_target().await?;
        let rows = self.ledger.read_all_rows(&target.table).await?;

        if is_duplicate(&record, &rows) {
            info!(name = %record.full_name, "duplicate signup, nothing appended");
            summary.duplicates += 1;
        } else {
            self.ledger.append_row(&target.table, &record.as_row()).await?;
            info!(name = %record.full_name, "signup recorded");
            summary.accepted += 1;
        }

        if let Err(err) = self.mailbox.mark_read(id).await {
            warn!(error = %err, "could not mark message as read");
            summary.mark_read_failures += 1;
        }

        Ok(())
    }

    /// Returns the destination folder and table, resolving them on first use.
    ///
    /// The resolution is called before every write but cached, so one run
    /// hits the store's folder/table lookups at most once.
    async fn ensure_target(&mut self) -> Result<LedgerTarget> {
        if let Some(target) = &self.target {
            return Ok(target.clone());
        }
        let target = resolve_target(
            &mut self.ledger,
            &self.config.folder_name,
            &self.config.table_title,
            &self.config.style,
        )
        .await?;
        self.target = Some(target.clone());
        Ok(target)
    }
}
