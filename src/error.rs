//! Error types for the signup-sync crate.
//!
//! All errors implement [`std::error::Error`] and carry context about which
//! collaborator call went wrong. Errors are classified by blast radius (see
//! [`Error::scope`]) so the pipeline can tell "abort the run" apart from
//! "skip this message and keep going".

use thiserror::Error;

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed error type used as the `#[source]` across collaborator seams.
///
/// Adapters (IMAP, SMTP, filesystem, ...) wrap their native error types into
/// this so the pipeline-facing taxonomy stays transport-agnostic.
pub type SourceError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while running the signup pipeline.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    // ─────────────────────────────────────────────────────────────────────────
    // Configuration / validation errors (abort the run)
    // ─────────────────────────────────────────────────────────────────────────
    /// Invalid email address in the configuration.
    #[error("invalid email address: {address}")]
    InvalidAddress {
        /// The address that failed validation.
        address: String,
    },

    /// Invalid configuration provided.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// Description of the configuration error.
        message: String,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Mailbox seam (connect/scan abort the run; per-message calls skip the
    // message)
    // ─────────────────────────────────────────────────────────────────────────
    /// Failed to connect or authenticate to the mailbox.
    #[error("failed to connect to mailbox at {target}")]
    MailboxConnect {
        /// The mailbox endpoint that failed.
        target: String,
        /// The underlying transport error.
        #[source]
        source: SourceError,
    },

    /// Unread-message search failed.
    #[error("mailbox search failed for subject '{pattern}'")]
    MailboxSearch {
        /// The subject pattern being searched.
        pattern: String,
        /// The underlying transport error.
        #[source]
        source: SourceError,
    },

    /// Fetching one message's content failed.
    #[error("failed to fetch message {id}")]
    MessageFetch {
        /// The message identifier.
        id: String,
        /// The underlying transport error.
        #[source]
        source: SourceError,
    },

    /// Flipping a message's unread flag failed.
    #[error("failed to mark message {id} as read")]
    MarkRead {
        /// The message identifier.
        id: String,
        /// The underlying transport error.
        #[source]
        source: SourceError,
    },

    /// Closing the mailbox session failed.
    #[error("failed to log out of the mailbox")]
    MailboxLogout {
        /// The underlying transport error.
        #[source]
        source: SourceError,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Tabular store seam (all called inside the per-message loop)
    // ─────────────────────────────────────────────────────────────────────────
    /// Folder lookup failed.
    #[error("failed to look up folder '{name}'")]
    FolderLookup {
        /// The folder name.
        name: String,
        /// The underlying store error.
        #[source]
        source: SourceError,
    },

    /// Folder creation failed.
    #[error("failed to create folder '{name}'")]
    FolderCreate {
        /// The folder name.
        name: String,
        /// The underlying store error.
        #[source]
        source: SourceError,
    },

    /// Table lookup failed.
    #[error("failed to look up table '{title}'")]
    TableLookup {
        /// The table title.
        title: String,
        /// The underlying store error.
        #[source]
        source: SourceError,
    },

    /// Table creation failed.
    #[error("failed to create table '{title}'")]
    TableCreate {
        /// The table title.
        title: String,
        /// The underlying store error.
        #[source]
        source: SourceError,
    },

    /// Reading the stored rows failed.
    #[error("failed to read rows from table {table}")]
    RowsRead {
        /// The table identifier.
        table: String,
        /// The underlying store error.
        #[source]
        source: SourceError,
    },

    /// Appending a row failed.
    #[error("failed to append row to table {table}")]
    RowAppend {
        /// The table identifier.
        table: String,
        /// The underlying store error.
        #[source]
        source: SourceError,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Report dispatch (runs once, after the loop; failures end the run)
    // ─────────────────────────────────────────────────────────────────────────
    /// Exporting the table failed.
    #[error("failed to export table {table}")]
    TableExport {
        /// The table identifier.
        table: String,
        /// The underlying store error.
        #[source]
        source: SourceError,
    },

    /// Writing or reading the temporary export file failed.
    #[error("failed to stage the export file")]
    ExportFile {
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Sending the report message failed.
    #[error("failed to send report to {recipient}")]
    ReportSend {
        /// The report recipient.
        recipient: String,
        /// The underlying dispatch error.
        #[source]
        source: SourceError,
    },
}

/// How much of the run an error takes down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureScope {
    /// The whole run aborts (scanner, report, configuration).
    Run,
    /// Only the current message is skipped; the loop continues.
    Message,
}

impl Error {
    /// Returns whether this error aborts the run or only the current message.
    ///
    /// The processing loop catches [`FailureScope::Message`] errors, logs
    /// them, and moves on to the next message; everything else propagates.
    ///
    /// ```
    /// use signup_sync::{Error, FailureScope};
    ///
    /// let err = Error::InvalidConfig { message: "missing recipient".into() };
    /// assert_eq!(err.scope(), FailureScope::Run);
    /// ```
    #[must_use]
    pub fn scope(&self) -> FailureScope {
        match self {
            // Scanner/global failures and the report path abort the run.
            Error::InvalidAddress { .. }
            | Error::InvalidConfig { .. }
            | Error::MailboxConnect { .. }
            | Error::MailboxSearch { .. }
            | Error::MailboxLogout { .. }
            | Error::TableExport { .. }
            | Error::ExportFile { .. }
            | Error::ReportSend { .. } => FailureScope::Run,

            // Everything inside the per-message loop skips just that message.
            Error::MessageFetch { .. }
            | Error::MarkRead { .. }
            | Error::FolderLookup { .. }
            | Error::FolderCreate { .. }
            | Error::TableLookup { .. }
            | Error::TableCreate { .. }
            | Error::RowsRead { .. }
            | Error::RowAppend { .. } => FailureScope::Message,
        }
    }

    /// Returns the error category for metrics/logging purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::InvalidAddress { .. } | Error::InvalidConfig { .. } => {
                ErrorCategory::Configuration
            }

            Error::MailboxConnect { .. }
            | Error::MailboxSearch { .. }
            | Error::MessageFetch { .. }
            | Error::MarkRead { .. }
            | Error::MailboxLogout { .. } => ErrorCategory::Mailbox,

            Error::FolderLookup { .. }
            | Error::FolderCreate { .. }
            | Error::TableLookup { .. }
            | Error::TableCreate { .. }
            | Error::RowsRead { .. }
            | Error::RowAppend { .. }
            | Error::TableExport { .. } => ErrorCategory::Store,

            Error::ExportFile { .. } => ErrorCategory::Io,

            Error::ReportSend { .. } => ErrorCategory::Report,
        }
    }
}

/// Error categories for metrics and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Configuration or validation errors.
    Configuration,
    /// Mailbox transport errors.
    Mailbox,
    /// Tabular store errors.
    Store,
    /// Report dispatch errors.
    Report,
    /// Local I/O errors.
    Io,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Configuration => write!(f, "configuration"),
            ErrorCategory::Mailbox => write!(f, "mailbox"),
            ErrorCategory::Store => write!(f, "store"),
            ErrorCategory::Report => write!(f, "report"),
            ErrorCategory::Io => write!(f, "io"),
        }
    }
}

impl std::fmt::Display for FailureScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureScope::Run => write!(f, "run"),
            FailureScope::Message => write!(f, "message"),
        }
    }
}
