//! Report dispatch: export the ledger table and mail it as an attachment.
//!
//! The export bytes are staged through a temporary spool file whose removal
//! is tied to a [`TempPath`] guard, so the file is gone after dispatch on
//! every exit path, send failures included. Callers gate dispatch on the run
//! having accepted at least one record; a run that recorded nothing sends
//! nothing.

use crate::config::SyncConfig;
use crate::error::{Error, Result};
use crate::ledger::{ExportFormat, Ledger, TableId};
use crate::record;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::Path;
use tempfile::{NamedTempFile, TempPath};
use tracing::{debug, info, instrument, warn};

/// A file attached to an outgoing report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportAttachment {
    /// Filename shown to the recipient.
    pub filename: String,
    /// MIME type of the content.
    pub content_type: String,
    /// The attachment bytes.
    pub bytes: Vec<u8>,
}

/// One outgoing report message, transport-agnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingReport {
    /// Sender address.
    pub from: String,
    /// Recipient address.
    pub to: String,
    /// Subject line.
    pub subject: String,
    /// Plain-text body.
    pub body: String,
    /// The exported table.
    pub attachment: ReportAttachment,
}

/// Acknowledgement returned by a dispatcher after a successful send.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageReceipt {
    /// Transport-specific message identifier, when the transport reports one.
    pub transport_id: Option<String>,
}

/// Outbound message transport.
///
/// Implementations report failures as
/// [`Error::ReportSend`](crate::Error::ReportSend). The crate ships an SMTP
/// implementation ([`SmtpDispatcher`](crate::SmtpDispatcher)).
#[async_trait]
pub trait Dispatcher: Send + Sync {
    /// Sends one report message with its attachment.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ReportSend`](crate::Error::ReportSend) when the
    /// message cannot be built or delivered.
    async fn send(&mut self, report: &OutgoingReport) -> Result<MessageReceipt>;
}

/// Staged export artifact on disk, removed when dropped.
struct ExportSpool {
    path: TempPath,
}

impl ExportSpool {
    /// Writes the export bytes to a fresh temporary file under `dir`.
    async fn write(dir: &Path, bytes: &[u8]) -> Result<Self> {
        let file = NamedTempFile::new_in(dir).map_err(|source| Error::ExportFile { source })?;
        let path = file.into_temp_path();
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|source| Error::ExportFile { source })?;
        debug!(path = %path.display(), "staged export spool file");
        Ok(Self { path })
    }

    /// Reads the staged bytes back for attaching.
    async fn read(&self) -> Result<Vec<u8>> {
        tokio::fs::read(&self.path)
            .await
            .map_err(|source| Error::ExportFile { source })
    }

    fn path(&self) -> &Path {
        &self.path
    }

    /// Removes the spool file, surfacing removal problems as a warning only.
    fn discard(self) {
        let ExportSpool { path } = self;
        if let Err(err) = path.close() {
            warn!(error = %err, "could not remove export spool file");
        }
    }
}

/// Exports the table and sends it as an attachment to the configured
/// recipient.
///
/// The attachment is named after the table title with the format's
/// extension; the body names the reporting window. The spool file is removed
/// before returning, whether the send succeeded or not.
///
/// # Errors
///
/// Returns [`Error::TableExport`](crate::Error::TableExport),
/// [`Error::ExportFile`](crate::Error::ExportFile) or
/// [`Error::ReportSend`](crate::Error::ReportSend); all of them end the run.
#[instrument(skip(ledger, dispatcher, config), fields(table = %table))]
pub async fn dispatch_report<L, D>(
    ledger: &mut L,
    dispatcher: &mut D,
    table: &TableId,
    config: &SyncConfig,
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
) -> Result<MessageReceipt>
where
    L: Ledger + ?Sized,
    D: Dispatcher + ?Sized,
{
    let spool_dir = std::env::temp_dir();
    dispatch_spooled(
        ledger,
        dispatcher,
        table,
        config,
        window_start,
        window_end,
        &spool_dir,
    )
    .await
}

/// Dispatch with the spool staged under `spool_dir`.
async fn dispatch_spooled<L, D>(
    ledger: &mut L,
    dispatcher: &mut D,
    table: &TableId,
    config: &SyncConfig,
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
    spool_dir: &Path,
) -> Result<MessageReceipt>
where
    L: Ledger + ?Sized,
    D: Dispatcher + ?Sized,
{
    let format = ExportFormat::Csv;
    let bytes = ledger.export_as(table, format).await?;

    let spool = ExportSpool::write(spool_dir, &bytes).await?;
    let staged = spool.read().await?;
    debug!(path = %spool.path().display(), size = staged.len(), "export ready to attach");

    let report = OutgoingReport {
        from: config.report_from().to_string(),
        to: config.report_recipient().to_string(),
        subject: config.report_subject.clone(),
        body: report_body(&config.table_title, window_start, window_end),
        attachment: ReportAttachment {
            filename: format!("{}.{}", config.table_title, format.extension()),
            content_type: format.content_type().to_owned(),
            bytes: staged,
        },
    };

    let receipt = dispatcher.send(&report).await?;
    info!(recipient = %report.to, "report dispatched");

    spool.discard();
    Ok(receipt)
}

/// Body text naming the trailing reporting window.
fn report_body(table_title: &str, window_start: DateTime<Utc>, window_end: DateTime<Utc>) -> String {
    format!(
        "Attached is the {table_title} export covering {} to {}.",
        record::format_date(window_start),
        record::format_date(window_end),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SyncConfig;
    use crate::testkit::{FakeDispatcher, FakeLedger};
    use chrono::TimeZone;
    use tempfile::tempdir;

    fn config() -> SyncConfig {
        SyncConfig::builder()
            .account("signups@example.org")
            .password("secret")
            .report_recipient("reports@example.org")
            .build()
            .unwrap()
    }

    fn window() -> (DateTime<Utc>, DateTime<Utc>) {
        (
            Utc.with_ymd_and_hms(2025, 5, 26, 9, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 6, 2, 9, 0, 0).unwrap(),
        )
    }

    fn staged_count(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    #[tokio::test]
    async fn test_dispatch_attaches_exported_table() {
        let ledger = FakeLedger::default();
        let folder = ledger.seed_folder("Growth Track");
        let table = ledger.seed_table(&folder, "Growth Track Signups");
        ledger.seed_row(
            &table,
            &["June 1, 2025", "Ana Petrova", "+27 82 555 0101", "ana@example.org"],
        );
        let dispatcher = FakeDispatcher::default();
        let (start, end) = window();

        let mut ledger_handle = ledger.clone();
        let mut dispatcher_handle = dispatcher.clone();
        let receipt =
            dispatch_report(&mut ledger_handle, &mut dispatcher_handle, &table, &config(), start, end)
                .await
                .unwrap();

        assert_eq!(ledger.export_calls(), 1);
        assert_eq!(receipt.transport_id.as_deref(), Some("fake-1"));
        let sent = dispatcher.sent();
        assert_eq!(sent.len(), 1);

        let report = &sent[0];
        assert_eq!(report.from, "signups@example.org");
        assert_eq!(report.to, "reports@example.org");
        assert_eq!(report.attachment.filename, "Growth Track Signups.csv");
        assert_eq!(report.attachment.content_type, "text/csv");

        // Attachment carries exactly what the ledger exported
        let exported = ledger.export_bytes(&table);
        assert_eq!(report.attachment.bytes, exported);
    }

    #[tokio::test]
    async fn test_body_names_the_reporting_window() {
        let ledger = FakeLedger::default();
        let folder = ledger.seed_folder("Growth Track");
        let table = ledger.seed_table(&folder, "Growth Track Signups");
        let dispatcher = FakeDispatcher::default();
        let (start, end) = window();

        let mut ledger_handle = ledger.clone();
        let mut dispatcher_handle = dispatcher.clone();
        dispatch_report(&mut ledger_handle, &mut dispatcher_handle, &table, &config(), start, end)
            .await
            .unwrap();

        let body = &dispatcher.sent()[0].body;
        assert!(body.contains("May 26, 2025"), "body was: {body}");
        assert!(body.contains("June 2, 2025"), "body was: {body}");
    }

    #[tokio::test]
    async fn test_send_failure_surfaces_as_report_send() {
        let ledger = FakeLedger::default();
        let folder = ledger.seed_folder("Growth Track");
        let table = ledger.seed_table(&folder, "Growth Track Signups");
        let dispatcher = FakeDispatcher::default();
        dispatcher.fail_sends();
        let (start, end) = window();

        let mut ledger_handle = ledger.clone();
        let mut dispatcher_handle = dispatcher.clone();
        let result =
            dispatch_report(&mut ledger_handle, &mut dispatcher_handle, &table, &config(), start, end)
                .await;

        assert!(matches!(result, Err(Error::ReportSend { .. })));
    }

    #[tokio::test]
    async fn test_dispatch_leaves_no_spool_behind() {
        let staging = tempdir().unwrap();
        let ledger = FakeLedger::default();
        let folder = ledger.seed_folder("Growth Track");
        let table = ledger.seed_table(&folder, "Growth Track Signups");
        let dispatcher = FakeDispatcher::default();
        let (start, end) = window();

        let mut ledger_handle = ledger.clone();
        let mut dispatcher_handle = dispatcher.clone();
        dispatch_spooled(
            &mut ledger_handle,
            &mut dispatcher_handle,
            &table,
            &config(),
            start,
            end,
            staging.path(),
        )
        .await
        .unwrap();

        assert_eq!(dispatcher.sent_count(), 1);
        assert_eq!(staged_count(staging.path()), 0);
    }

    #[tokio::test]
    async fn test_failed_send_still_removes_the_spool() {
        let staging = tempdir().unwrap();
        let ledger = FakeLedger::default();
        let folder = ledger.seed_folder("Growth Track");
        let table = ledger.seed_table(&folder, "Growth Track Signups");
        let dispatcher = FakeDispatcher::default();
        dispatcher.fail_sends();
        let (start, end) = window();

        let mut ledger_handle = ledger.clone();
        let mut dispatcher_handle = dispatcher.clone();
        let result = dispatch_spooled(
            &mut ledger_handle,
            &mut dispatcher_handle,
            &table,
            &config(),
            start,
            end,
            staging.path(),
        )
        .await;

        assert!(matches!(result, Err(Error::ReportSend { .. })));
        assert_eq!(
            staged_count(staging.path()),
            0,
            "spool file left behind after a failed send"
        );
    }

    #[tokio::test]
    async fn test_spool_file_is_removed_when_dropped() {
        let staging = tempdir().unwrap();
        let spool = ExportSpool::write(staging.path(), b"a,b,c\n").await.unwrap();
        let path = spool.path().to_path_buf();
        assert!(path.exists());

        drop(spool);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_spool_file_is_removed_on_discard() {
        let staging = tempdir().unwrap();
        let spool = ExportSpool::write(staging.path(), b"a,b,c\n").await.unwrap();
        let path = spool.path().to_path_buf();
        assert_eq!(spool.read().await.unwrap(), b"a,b,c\n");

        spool.discard();
        assert!(!path.exists());
    }
}
