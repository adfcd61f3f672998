//! In-memory fakes for exercising the pipeline without live servers.
//!
//! Each fake is a cloneable handle over shared state: a test keeps one handle
//! for seeding and inspection and passes a clone to the code under test.
//! Failure injection is per-fake via `fail_*` switches, and every injected
//! error carries the same taxonomy variant a real transport would produce.

use crate::error::{Error, Result, SourceError};
use crate::ledger::{ExportFormat, FolderId, Ledger, TableId, TableStyle};
use crate::mailbox::{FetchedMessage, Mailbox, MessageId};
use crate::record::COLUMNS;
use crate::report::{Dispatcher, MessageReceipt, OutgoingReport};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};

fn injected() -> SourceError {
    std::io::Error::other("injected failure").into()
}

/// Builds a raw single-part HTML notification like the upstream form sends.
///
/// `None` fields are left out of the table entirely.
pub(crate) fn notification_raw(
    full_name: Option<&str>,
    phone: Option<&str>,
    email: Option<&str>,
) -> Vec<u8> {
    let mut rows = String::new();
    if let Some(name) = full_name {
        rows.push_str(&format!("<tr><td>Full Name:</td><td>{name}</td></tr>"));
    }
    if let Some(phone) = phone {
        rows.push_str(&format!("<tr><td>Phone:</td><td>{phone}</td></tr>"));
    }
    if let Some(email) = email {
        rows.push_str(&format!("<tr><td>Email:</td><td>{email}</td></tr>"));
    }
    format!(
        "From: forms@example.org\r\n\
         To: signups@example.org\r\n\
         Subject: Growth Track Signup\r\n\
         Content-Type: text/html; charset=utf-8\r\n\
         \r\n\
         <table>{rows}</table>\r\n"
    )
    .into_bytes()
}

// ─────────────────────────────────────────────────────────────────────────────
// Fake mailbox
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug)]
struct StoredMessage {
    id: MessageId,
    subject: String,
    raw: Vec<u8>,
    received_at_ms: i64,
    unread: bool,
}

#[derive(Debug, Default)]
struct MailboxState {
    messages: Vec<StoredMessage>,
    searches: Vec<String>,
    fail_searches: bool,
    fail_fetch: Option<MessageId>,
    fail_mark: Option<MessageId>,
}

/// In-memory [`Mailbox`] with injectable failures.
#[derive(Debug, Clone, Default)]
pub(crate) struct FakeMailbox {
    state: Arc<Mutex<MailboxState>>,
}

impl FakeMailbox {
    /// Adds one unread message and returns its identifier.
    pub(crate) fn add_message(
        &self,
        subject: &str,
        raw: Vec<u8>,
        received_at_ms: i64,
    ) -> MessageId {
        let mut state = self.state.lock().expect("mailbox state poisoned");
        let id = MessageId::new((state.messages.len() + 1).to_string());
        state.messages.push(StoredMessage {
            id: id.clone(),
            subject: subject.to_owned(),
            raw,
            received_at_ms,
            unread: true,
        });
        id
    }

    /// Every subject pattern searched so far, in call order.
    pub(crate) fn searches(&self) -> Vec<String> {
        self.state
            .lock()
            .expect("mailbox state poisoned")
            .searches
            .clone()
    }

    /// Makes every subsequent search fail.
    pub(crate) fn fail_searches(&self) {
        self.state.lock().expect("mailbox state poisoned").fail_searches = true;
    }

    /// Makes fetching this one message fail.
    pub(crate) fn fail_fetch_for(&self, id: &MessageId) {
        self.state.lock().expect("mailbox state poisoned").fail_fetch = Some(id.clone());
    }

    /// Makes marking this one message as read fail.
    pub(crate) fn fail_mark_for(&self, id: &MessageId) {
        self.state.lock().expect("mailbox state poisoned").fail_mark = Some(id.clone());
    }

    /// Whether the message still carries the unread flag.
    pub(crate) fn is_unread(&self, id: &MessageId) -> bool {
        self.state
            .lock()
            .expect("mailbox state poisoned")
            .messages
            .iter()
            .find(|m| &m.id == id)
            .map(|m| m.unread)
            .expect("unknown message id")
    }
}

#[async_trait]
impl Mailbox for FakeMailbox {
    async fn list_unread(&mut self, subject: &str, since: DateTime<Utc>) -> Result<Vec<MessageId>> {
        let mut state = self.state.lock().expect("mailbox state poisoned");
        state.searches.push(subject.to_owned());
        if state.fail_searches {
            return Err(Error::MailboxSearch {
                pattern: subject.to_owned(),
                source: injected(),
            });
        }
        let since_ms = since.timestamp_millis();
        Ok(state
            .messages
            .iter()
            .filter(|m| m.unread && m.received_at_ms >= since_ms && m.subject.contains(subject))
            .map(|m| m.id.clone())
            .collect())
    }

    async fn fetch(&mut self, id: &MessageId) -> Result<FetchedMessage> {
        let state = self.state.lock().expect("mailbox state poisoned");
        if state.fail_fetch.as_ref() == Some(id) {
            return Err(Error::MessageFetch {
                id: id.to_string(),
                source: injected(),
            });
        }
        state
            .messages
            .iter()
            .find(|m| &m.id == id)
            .map(|m| FetchedMessage {
                id: m.id.clone(),
                raw: m.raw.clone(),
                received_at_ms: m.received_at_ms,
            })
            .ok_or_else(|| Error::MessageFetch {
                id: id.to_string(),
                source: injected(),
            })
    }

    async fn mark_read(&mut self, id: &MessageId) -> Result<()> {
        let mut state = self.state.lock().expect("mailbox state poisoned");
        if state.fail_mark.as_ref() == Some(id) {
            return Err(Error::MarkRead {
                id: id.to_string(),
                source: injected(),
            });
        }
        match state.messages.iter_mut().find(|m| &m.id == id) {
            Some(message) => {
                message.unread = false;
                Ok(())
            }
            None => Err(Error::MarkRead {
                id: id.to_string(),
                source: injected(),
            }),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Fake ledger
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug)]
struct FakeTable {
    id: TableId,
    folder: FolderId,
    title: String,
    rows: Vec<Vec<String>>,
}

#[derive(Debug, Default)]
struct LedgerState {
    folders: Vec<(FolderId, String)>,
    tables: Vec<FakeTable>,
    folder_creates: usize,
    table_creates: usize,
    find_folder_calls: usize,
    export_calls: usize,
    fail_appends: bool,
}

impl LedgerState {
    fn add_folder(&mut self, name: &str) -> FolderId {
        let id = FolderId::new(format!("folder-{}", self.folders.len() + 1));
        self.folders.push((id.clone(), name.to_owned()));
        id
    }

    fn add_table(&mut self, folder: &FolderId, title: &str, header: &[&str]) -> TableId {
        let id = TableId::new(format!("table-{}", self.tables.len() + 1));
        self.tables.push(FakeTable {
            id: id.clone(),
            folder: folder.clone(),
            title: title.to_owned(),
            rows: vec![header.iter().map(|&cell| cell.to_owned()).collect()],
        });
        id
    }

    fn table_mut(&mut self, table: &TableId) -> Option<&mut FakeTable> {
        self.tables.iter_mut().find(|t| &t.id == table)
    }

    fn table(&self, table: &TableId) -> Option<&FakeTable> {
        self.tables.iter().find(|t| &t.id == table)
    }
}

fn render_export(rows: &[Vec<String>]) -> Vec<u8> {
    let mut out = String::new();
    for row in rows {
        out.push_str(&row.join(","));
        out.push('\n');
    }
    out.into_bytes()
}

/// In-memory [`Ledger`] with call counters and injectable append failures.
#[derive(Debug, Clone, Default)]
pub(crate) struct FakeLedger {
    state: Arc<Mutex<LedgerState>>,
}

impl FakeLedger {
    /// Adds a folder without counting it as a pipeline-driven create.
    pub(crate) fn seed_folder(&self, name: &str) -> FolderId {
        self.state
            .lock()
            .expect("ledger state poisoned")
            .add_folder(name)
    }

    /// Adds a table (header row included) without counting it as a create.
    pub(crate) fn seed_table(&self, folder: &FolderId, title: &str) -> TableId {
        self.state
            .lock()
            .expect("ledger state poisoned")
            .add_table(folder, title, &COLUMNS)
    }

    /// Appends a pre-existing data row to a seeded table.
    pub(crate) fn seed_row(&self, table: &TableId, row: &[&str]) {
        let mut state = self.state.lock().expect("ledger state poisoned");
        state
            .table_mut(table)
            .expect("unknown table id")
            .rows
            .push(row.iter().map(|&cell| cell.to_owned()).collect());
    }

    /// Makes every subsequent append fail.
    pub(crate) fn fail_appends(&self) {
        self.state.lock().expect("ledger state poisoned").fail_appends = true;
    }

    /// How many folders the code under test created.
    pub(crate) fn folder_creates(&self) -> usize {
        self.state.lock().expect("ledger state poisoned").folder_creates
    }

    /// How many tables the code under test created.
    pub(crate) fn table_creates(&self) -> usize {
        self.state.lock().expect("ledger state poisoned").table_creates
    }

    /// How many folder lookups the code under test issued.
    pub(crate) fn find_folder_calls(&self) -> usize {
        self.state.lock().expect("ledger state poisoned").find_folder_calls
    }

    /// How many exports the code under test requested.
    pub(crate) fn export_calls(&self) -> usize {
        self.state.lock().expect("ledger state poisoned").export_calls
    }

    /// Current contents of a table, header row first.
    pub(crate) fn rows(&self, table: &TableId) -> Vec<Vec<String>> {
        self.state
            .lock()
            .expect("ledger state poisoned")
            .table(table)
            .expect("unknown table id")
            .rows
            .clone()
    }

    /// Looks a table up by title, across folders.
    pub(crate) fn table_by_title(&self, title: &str) -> Option<TableId> {
        self.state
            .lock()
            .expect("ledger state poisoned")
            .tables
            .iter()
            .find(|t| t.title == title)
            .map(|t| t.id.clone())
    }

    /// What an export of the table would contain, without counting a call.
    pub(crate) fn export_bytes(&self, table: &TableId) -> Vec<u8> {
        let state = self.state.lock().expect("ledger state poisoned");
        render_export(&state.table(table).expect("unknown table id").rows)
    }
}

#[async_trait]
impl Ledger for FakeLedger {
    async fn find_folder(&mut self, name: &str) -> Result<Option<FolderId>> {
        let mut state = self.state.lock().expect("ledger state poisoned");
        state.find_folder_calls += 1;
        Ok(state
            .folders
            .iter()
            .find(|(_, folder_name)| folder_name == name)
            .map(|(id, _)| id.clone()))
    }

    async fn create_folder(&mut self, name: &str) -> Result<FolderId> {
        let mut state = self.state.lock().expect("ledger state poisoned");
        state.folder_creates += 1;
        Ok(state.add_folder(name))
    }

    async fn find_table(&mut self, folder: &FolderId, title: &str) -> Result<Option<TableId>> {
        let state = self.state.lock().expect("ledger state poisoned");
        Ok(state
            .tables
            .iter()
            .find(|t| &t.folder == folder && t.title == title)
            .map(|t| t.id.clone()))
    }

    async fn create_table(
        &mut self,
        folder: &FolderId,
        title: &str,
        header: &[&str],
        _style: &TableStyle,
    ) -> Result<TableId> {
        let mut state = self.state.lock().expect("ledger state poisoned");
        state.table_creates += 1;
        Ok(state.add_table(folder, title, header))
    }

    async fn read_all_rows(&mut self, table: &TableId) -> Result<Vec<Vec<String>>> {
        let state = self.state.lock().expect("ledger state poisoned");
        state
            .table(table)
            .map(|t| t.rows.clone())
            .ok_or_else(|| Error::RowsRead {
                table: table.to_string(),
                source: injected(),
            })
    }

    async fn append_row(&mut self, table: &TableId, row: &[String]) -> Result<()> {
        let mut state = self.state.lock().expect("ledger state poisoned");
        if state.fail_appends {
            return Err(Error::RowAppend {
                table: table.to_string(),
                source: injected(),
            });
        }
        match state.table_mut(table) {
            Some(t) => {
                t.rows.push(row.to_vec());
                Ok(())
            }
            None => Err(Error::RowAppend {
                table: table.to_string(),
                source: injected(),
            }),
        }
    }

    async fn export_as(&mut self, table: &TableId, _format: ExportFormat) -> Result<Vec<u8>> {
        let mut state = self.state.lock().expect("ledger state poisoned");
        state.export_calls += 1;
        state
            .table(table)
            .map(|t| render_export(&t.rows))
            .ok_or_else(|| Error::TableExport {
                table: table.to_string(),
                source: injected(),
            })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Fake dispatcher
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct DispatcherState {
    sent: Vec<OutgoingReport>,
    fail_sends: bool,
}

/// In-memory [`Dispatcher`] capturing every sent report.
#[derive(Debug, Clone, Default)]
pub(crate) struct FakeDispatcher {
    state: Arc<Mutex<DispatcherState>>,
}

impl FakeDispatcher {
    /// Every report sent so far, in call order.
    pub(crate) fn sent(&self) -> Vec<OutgoingReport> {
        self.state
            .lock()
            .expect("dispatcher state poisoned")
            .sent
            .clone()
    }

    /// How many reports were sent.
    pub(crate) fn sent_count(&self) -> usize {
        self.state.lock().expect("dispatcher state poisoned").sent.len()
    }

    /// Makes every subsequent send fail.
    pub(crate) fn fail_sends(&self) {
        self.state.lock().expect("dispatcher state poisoned").fail_sends = true;
    }
}

#[async_trait]
impl Dispatcher for FakeDispatcher {
    async fn send(&mut self, report: &OutgoingReport) -> Result<MessageReceipt> {
        let mut state = self.state.lock().expect("dispatcher state poisoned");
        if state.fail_sends {
            return Err(Error::ReportSend {
                recipient: report.to.clone(),
                source: injected(),
            });
        }
        state.sent.push(report.clone());
        Ok(MessageReceipt {
            transport_id: Some(format!("fake-{}", state.sent.len())),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[tokio::test]
    async fn test_fake_mailbox_round_trip() {
        let mailbox = FakeMailbox::default();
        let received = Utc.with_ymd_and_hms(2025, 6, 2, 12, 0, 0).unwrap();
        let id = mailbox.add_message(
            "Growth Track Signup",
            notification_raw(Some("Ana"), None, None),
            received.timestamp_millis(),
        );

        let mut handle = mailbox.clone();
        let since = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        assert_eq!(
            handle.list_unread("Growth Track Signup", since).await.unwrap(),
            vec![id.clone()]
        );

        let fetched = handle.fetch(&id).await.unwrap();
        assert_eq!(fetched.received_at_ms, received.timestamp_millis());

        handle.mark_read(&id).await.unwrap();
        assert!(!mailbox.is_unread(&id));
        assert!(handle
            .list_unread("Growth Track Signup", since)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_fake_ledger_seeds_do_not_count_as_creates() {
        let ledger = FakeLedger::default();
        let folder = ledger.seed_folder("Growth Track");
        let table = ledger.seed_table(&folder, "Growth Track Signups");
        ledger.seed_row(&table, &["June 1, 2025", "Ana", "123", "ana@example.org"]);

        assert_eq!(ledger.folder_creates(), 0);
        assert_eq!(ledger.table_creates(), 0);
        assert_eq!(ledger.rows(&table).len(), 2);

        let mut handle = ledger.clone();
        assert_eq!(
            handle.find_folder("Growth Track").await.unwrap(),
            Some(folder)
        );
        assert_eq!(ledger.find_folder_calls(), 1);
    }

    #[test]
    fn test_notification_raw_omits_absent_fields() {
        let raw = String::from_utf8(notification_raw(Some("Ana"), None, Some("a@b.c"))).unwrap();
        assert!(raw.contains("Full Name:"));
        assert!(!raw.contains("Phone:"));
        assert!(raw.contains("Email:"));
    }
}
