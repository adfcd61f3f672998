//! Filesystem-backed [`Ledger`] keeping each table as a CSV file.
//!
//! A folder is a directory under the store root and a table is a
//! `<title>.csv` file inside it; the identifiers handed back are the paths
//! themselves. Styling hints cannot be expressed in plain CSV, so the store
//! accepts them and ignores them.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument};

use crate::csv;
use crate::error::{Error, Result};
use crate::ledger::{ExportFormat, FolderId, Ledger, TableId, TableStyle};

/// Ledger implementation that records signups in CSV files on disk.
///
/// # Example
///
/// ```no_run
/// use signup_sync::{CsvLedger, Ledger};
///
/// # async fn run() -> signup_sync::Result<()> {
/// let mut ledger = CsvLedger::new("./growth-track");
/// let folder = ledger.create_folder("Growth Track").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct CsvLedger {
    root: PathBuf,
}

impl CsvLedger {
    /// Creates a store rooted at the given directory.
    ///
    /// The directory does not need to exist yet; it is created together with
    /// the first folder.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn folder_path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    fn table_path(folder: &FolderId, title: &str) -> PathBuf {
        Path::new(folder.as_str()).join(format!("{title}.csv"))
    }
}

#[async_trait]
impl Ledger for CsvLedger {
    async fn find_folder(&mut self, name: &str) -> Result<Option<FolderId>> {
        let path = self.folder_path(name);
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_dir() => Ok(Some(FolderId::new(path.display().to_string()))),
            Ok(_) => Ok(None),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(Error::FolderLookup {
                name: name.to_owned(),
                source: Box::new(err),
            }),
        }
    }

    #[instrument(name = "CsvLedger::create_folder", skip(self))]
    async fn create_folder(&mut self, name: &str) -> Result<FolderId> {
        let path = self.folder_path(name);
        tokio::fs::create_dir_all(&path)
            .await
            .map_err(|err| Error::FolderCreate {
                name: name.to_owned(),
                source: Box::new(err),
            })?;
        debug!(path = %path.display(), "created ledger folder");
        Ok(FolderId::new(path.display().to_string()))
    }

    async fn find_table(&mut self, folder: &FolderId, title: &str) -> Result<Option<TableId>> {
        let path = Self::table_path(folder, title);
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Ok(Some(TableId::new(path.display().to_string()))),
            Ok(_) => Ok(None),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(Error::TableLookup {
                title: title.to_owned(),
                source: Box::new(err),
            }),
        }
    }

    #[instrument(name = "CsvLedger::create_table", skip(self, header, _style))]
    async fn create_table(
        &mut self,
        folder: &FolderId,
        title: &str,
        header: &[&str],
        _style: &TableStyle,
    ) -> Result<TableId> {
        let path = Self::table_path(folder, title);
        tokio::fs::write(&path, csv::encode_row(header))
            .await
            .map_err(|err| Error::TableCreate {
                title: title.to_owned(),
                source: Box::new(err),
            })?;
        debug!(path = %path.display(), "created ledger table");
        Ok(TableId::new(path.display().to_string()))
    }

    async fn read_all_rows(&mut self, table: &TableId) -> Result<Vec<Vec<String>>> {
        let text = tokio::fs::read_to_string(table.as_str())
            .await
            .map_err(|err| Error::RowsRead {
                table: table.to_string(),
                source: Box::new(err),
            })?;
        Ok(csv::parse(&text))
    }

    async fn append_row(&mut self, table: &TableId, row: &[String]) -> Result<()> {
        let map_err = |err: std::io::Error| Error::RowAppend {
            table: table.to_string(),
            source: Box::new(err),
        };
        let mut file = tokio::fs::OpenOptions::new()
            .append(true)
            .open(table.as_str())
            .await
            .map_err(map_err)?;
        file.write_all(csv::encode_row(row).as_bytes())
            .await
            .map_err(map_err)?;
        Ok(())
    }

    async fn export_as(&mut self, table: &TableId, format: ExportFormat) -> Result<Vec<u8>> {
        match format {
            ExportFormat::Csv => {
                tokio::fs::read(table.as_str())
                    .await
                    .map_err(|err| Error::TableExport {
                        table: table.to_string(),
                        source: Box::new(err),
                    })
            }
        }
    }
}
