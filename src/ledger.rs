//! Tabular-store collaborator contract and destination resolution.
//!
//! Accepted signups accumulate in one titled table inside one named folder.
//! The [`Ledger`] trait abstracts the store transport; [`resolve_target`]
//! implements the find-or-create protocol that turns a folder name and table
//! title into stable identifiers. The crate ships a filesystem CSV
//! implementation ([`CsvLedger`](crate::CsvLedger)).

use crate::error::Result;
use crate::record::COLUMNS;
use async_trait::async_trait;
use tracing::{debug, instrument};

/// Opaque identifier for a resolved folder.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FolderId(String);

impl FolderId {
    /// Wraps a store-provided identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for FolderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque identifier for a resolved table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableId(String);

impl TableId {
    /// Wraps a store-provided identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TableId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Presentation hints applied when a table is first created.
///
/// Stores that cannot represent styling (plain CSV files, for one) accept the
/// style and ignore it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableStyle {
    /// Render the header row in bold.
    pub header_bold: bool,
    /// Center the header cells.
    pub header_centered: bool,
    /// Shade the header row background.
    pub header_shaded: bool,
    /// Fixed width applied to every column, in display units.
    pub column_width: u32,
    /// Rows to pre-provision so appends never hit a capacity edge.
    pub row_capacity: u32,
}

impl Default for TableStyle {
    fn default() -> Self {
        Self {
            header_bold: true,
            header_centered: true,
            header_shaded: true,
            column_width: 150,
            row_capacity: 1000,
        }
    }
}

/// Formats a table can be exported to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ExportFormat {
    /// RFC 4180 comma-separated values.
    Csv,
}

impl ExportFormat {
    /// Conventional file extension, without the dot.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
        }
    }

    /// MIME type for attachments.
    #[must_use]
    pub fn content_type(self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv",
        }
    }
}

/// A fully resolved destination: the folder and the table inside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerTarget {
    /// The containing folder.
    pub folder: FolderId,
    /// The signups table.
    pub table: TableId,
}

/// Access to the tabular store where signups accumulate.
///
/// Implementations report failures through the matching [`Error`] variants
/// ([`FolderLookup`], [`FolderCreate`], [`TableLookup`], [`TableCreate`],
/// [`RowsRead`], [`RowAppend`], [`TableExport`]); the pipeline's
/// skip-or-abort decisions depend on them.
///
/// [`Error`]: crate::Error
/// [`FolderLookup`]: crate::Error::FolderLookup
/// [`FolderCreate`]: crate::Error::FolderCreate
/// [`TableLookup`]: crate::Error::TableLookup
/// [`TableCreate`]: crate::Error::TableCreate
/// [`RowsRead`]: crate::Error::RowsRead
/// [`RowAppend`]: crate::Error::RowAppend
/// [`TableExport`]: crate::Error::TableExport
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Looks up a folder by exact name. `Ok(None)` means it does not exist.
    async fn find_folder(&mut self, name: &str) -> Result<Option<FolderId>>;

    /// Creates a folder with the given name.
    async fn create_folder(&mut self, name: &str) -> Result<FolderId>;

    /// Looks up a table by exact title within a folder.
    async fn find_table(&mut self, folder: &FolderId, title: &str) -> Result<Option<TableId>>;

    /// Creates a table in the folder with a header row and styling applied.
    async fn create_table(
        &mut self,
        folder: &FolderId,
        title: &str,
        header: &[&str],
        style: &TableStyle,
    ) -> Result<TableId>;

    /// Reads every row currently in the table, the header row included.
    async fn read_all_rows(&mut self, table: &TableId) -> Result<Vec<Vec<String>>>;

    /// Appends one row at the end of the table.
    async fn append_row(&mut self, table: &TableId, row: &[String]) -> Result<()>;

    /// Exports the whole table in the requested format.
    async fn export_as(&mut self, table: &TableId, format: ExportFormat) -> Result<Vec<u8>>;
}

/// Resolves the destination folder and table, creating either only if absent.
///
/// New tables are created with the standard signup header
/// ([`COLUMNS`](crate::record::COLUMNS)) and the given style. Running this
/// twice always yields the same identifiers; it never creates duplicates.
/// Callers cache the result so one run resolves at most once.
///
/// # Errors
///
/// Propagates the underlying [`Ledger`] errors.
#[instrument(skip(ledger, style), fields(folder = %folder_name, table = %table_title))]
pub async fn resolve_target<L>(
    ledger: &mut L,
    folder_name: &str,
    table_title: &str,
    style: &TableStyle,
) -> Result<LedgerTarget>
where
    L: Ledger + ?Sized,
{
    let folder = match ledger.find_folder(folder_name).await? {
        Some(folder) => {
            debug!(folder = %folder, "reusing existing folder");
            folder
        }
        None => {
            let folder = ledger.create_folder(folder_name).await?;
            debug!(folder = %folder, "created folder");
            folder
        }
    };

    let table = match ledger.find_table(&folder, table_title).await? {
        Some(table) => {
            debug!(table = %table, "reusing existing table");
            table
        }
        None => {
            let table = ledger.create_table(&folder, table_title, &COLUMNS, style).await?;
            debug!(table = %table, "created table with header row");
            table
        }
    };

    Ok(LedgerTarget { folder, table })
}
