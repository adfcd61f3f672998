//! Configuration for a signup sync run.
//!
//! Use [`SyncConfigBuilder`] to create a configuration with sensible defaults:
//!
//! ```
//! use signup_sync::SyncConfig;
//!
//! let config = SyncConfig::builder()
//!     .account("signups@example.org")
//!     .password("app-password")
//!     .report_recipient("reports@example.org")
//!     .build()
//!     .expect("valid config");
//! ```

use crate::error::{Error, Result};
use crate::ledger::TableStyle;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use email_address::EmailAddress;
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;

/// Configuration for one sync run: mailbox account, scan window, ledger
/// destination and report delivery.
///
/// Create using [`SyncConfig::builder()`].
///
/// Note: The `password` field is stored as a [`SecretString`] to prevent
/// accidental logging of sensitive credentials. Addresses are stored as
/// validated [`EmailAddress`] values.
#[derive(Clone)]
pub struct SyncConfig {
    /// Mailbox account (used for login, host discovery and as report sender).
    account: EmailAddress,
    /// Account password or app-specific password (protected from accidental logging).
    password: SecretString,
    /// Where the weekly report goes.
    report_recipient: EmailAddress,
    /// Explicit report sender, when it differs from the account.
    report_from: Option<EmailAddress>,
    /// IMAP server hostname (derived from the account domain if not set).
    pub imap_host: Option<String>,
    /// IMAP server port (default: 993 for IMAPS).
    pub imap_port: u16,
    /// SMTP server hostname (derived from the account domain if not set).
    pub smtp_host: Option<String>,
    /// SMTP server port (default: 465 for implicit TLS).
    pub smtp_port: u16,
    /// Subject line of the report message.
    pub report_subject: String,
    /// Subject patterns to scan for, tried in order.
    pub subjects: Vec<String>,
    /// How many days back the scan window reaches.
    pub lookback_days: u32,
    /// Ledger folder holding the signup table.
    pub folder_name: String,
    /// Title of the signup table.
    pub table_title: String,
    /// Presentation applied when the table has to be created.
    pub style: TableStyle,
    /// Timeout configuration.
    pub timeouts: MailboxTimeouts,
}

impl std::fmt::Debug for SyncConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncConfig")
            .field("account", &self.account.as_str())
            .field("password", &"[REDACTED]")
            .field("report_recipient", &self.report_recipient.as_str())
            .field("report_from", &self.report_from.as_ref().map(EmailAddress::as_str))
            .field("imap_host", &self.imap_host)
            .field("imap_port", &self.imap_port)
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("report_subject", &self.report_subject)
            .field("subjects", &self.subjects)
            .field("lookback_days", &self.lookback_days)
            .field("folder_name", &self.folder_name)
            .field("table_title", &self.table_title)
            .field("style", &self.style)
            .field("timeouts", &self.timeouts)
            .finish()
    }
}

impl SyncConfig {
    /// Returns the account address as a string slice.
    #[must_use]
    pub fn account(&self) -> &str {
        self.account.as_str()
    }

    /// Returns the password as a string slice.
    ///
    /// Use this method when you need to pass the password to authentication.
    /// The password is intentionally not directly accessible to prevent accidental logging.
    #[must_use]
    pub fn password(&self) -> &str {
        self.password.expose_secret()
    }

    /// Returns the report recipient address as a string slice.
    #[must_use]
    pub fn report_recipient(&self) -> &str {
        self.report_recipient.as_str()
    }

    /// Returns the report sender address, falling back to the account.
    #[must_use]
    pub fn report_from(&self) -> &str {
        self.report_from
            .as_ref()
            .unwrap_or(&self.account)
            .as_str()
    }
}

/// Timeout configuration for mailbox operations.
#[derive(Debug, Clone)]
pub struct MailboxTimeouts {
    /// Timeout for establishing TCP/TLS connection.
    pub connect: Duration,
    /// Timeout for IMAP authentication.
    pub auth: Duration,
    /// Timeout for selecting a mailbox.
    pub select: Duration,
    /// Timeout for searching unread messages.
    pub search: Duration,
    /// Timeout for fetching message content.
    pub fetch: Duration,
    /// Timeout for flag updates.
    pub store: Duration,
    /// Timeout for logout operation.
    pub logout: Duration,
}

impl Default for MailboxTimeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(30),
            auth: Duration::from_secs(30),
            select: Duration::from_secs(10),
            search: Duration::from_secs(10),
            fetch: Duration::from_secs(30),
            store: Duration::from_secs(10),
            logout: Duration::from_secs(5),
        }
    }
}

impl SyncConfig {
    /// Creates a new configuration builder.
    ///
    /// # Example
    ///
    /// ```
    /// use signup_sync::SyncConfig;
    ///
    /// let config = SyncConfig::builder()
    ///     .account("signups@example.org")
    ///     .password("app-password")
    ///     .report_recipient("reports@example.org")
    ///     .build()
    ///     .expect("valid config");
    /// ```
    #[must_use]
    pub fn builder() -> SyncConfigBuilder {
        SyncConfigBuilder::default()
    }

    /// Returns the effective IMAP host.
    ///
    /// Resolution order: explicit [`SyncConfigBuilder::imap_host`] setting,
    /// the documented host for well-known providers, then `imap.{domain}`
    /// derived from the account address.
    #[must_use]
    pub fn effective_imap_host(&self) -> String {
        if let Some(host) = &self.imap_host {
            return host.clone();
        }
        let domain = self.account.domain().to_lowercase();
        match well_known_hosts(&domain) {
            Some((imap, _)) => imap.to_owned(),
            None => format!("imap.{domain}"),
        }
    }

    /// Returns the effective SMTP host.
    ///
    /// Resolution order: explicit [`SyncConfigBuilder::smtp_host`] setting,
    /// the documented host for well-known providers, then `smtp.{domain}`
    /// derived from the account address.
    #[must_use]
    pub fn effective_smtp_host(&self) -> String {
        if let Some(host) = &self.smtp_host {
            return host.clone();
        }
        let domain = self.account.domain().to_lowercase();
        match well_known_hosts(&domain) {
            Some((_, smtp)) => smtp.to_owned(),
            None => format!("smtp.{domain}"),
        }
    }

    /// Returns the full IMAP server address as "host:port".
    #[must_use]
    pub fn imap_server_address(&self) -> String {
        format!("{}:{}", self.effective_imap_host(), self.imap_port)
    }

    /// Returns the start of the scan window relative to `now`.
    #[must_use]
    pub fn window_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - ChronoDuration::days(i64::from(self.lookback_days))
    }
}

/// Documented (IMAP, SMTP) hosts for common providers whose servers do not
/// all follow the `imap.{domain}` / `smtp.{domain}` pattern. Expects a
/// lowercased domain.
fn well_known_hosts(domain: &str) -> Option<(&'static str, &'static str)> {
    match domain {
        "gmail.com" => Some(("imap.gmail.com", "smtp.gmail.com")),
        "outlook.com" | "hotmail.com" | "live.com" => {
            Some(("imap-mail.outlook.com", "smtp-mail.outlook.com"))
        }
        "yahoo.com" => Some(("imap.mail.yahoo.com", "smtp.mail.yahoo.com")),
        "icloud.com" | "me.com" | "mac.com" => Some(("imap.mail.me.com", "smtp.mail.me.com")),
        _ => None,
    }
}

/// Validates an email address format.
///
/// Returns the validated `EmailAddress` if valid, or an error if invalid.
fn validate_address(address: &str) -> Result<EmailAddress> {
    EmailAddress::parse_with_options(address, email_address::Options::default()).map_err(|_| {
        Error::InvalidAddress {
            address: address.to_string(),
        }
    })
}

/// Builder for [`SyncConfig`].
#[derive(Debug, Default)]
pub struct SyncConfigBuilder {
    account: Option<String>,
    password: Option<String>,
    report_recipient: Option<String>,
    report_from: Option<String>,
    imap_host: Option<String>,
    imap_port: Option<u16>,
    smtp_host: Option<String>,
    smtp_port: Option<u16>,
    report_subject: Option<String>,
    subjects: Option<Vec<String>>,
    lookback_days: Option<u32>,
    folder_name: Option<String>,
    table_title: Option<String>,
    style: Option<TableStyle>,
    timeouts: Option<MailboxTimeouts>,
}

impl SyncConfigBuilder {
    /// Sets the mailbox account address (required).
    ///
    /// The domain is used to derive IMAP and SMTP hosts if not explicitly set.
    #[must_use]
    pub fn account(mut self, account: impl Into<String>) -> Self {
        self.account = Some(account.into());
        self
    }

    /// Sets the password (required).
    ///
    /// For Gmail/Outlook, use an app-specific password.
    #[must_use]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Sets the report recipient address (required).
    #[must_use]
    pub fn report_recipient(mut self, recipient: impl Into<String>) -> Self {
        self.report_recipient = Some(recipient.into());
        self
    }

    /// Sets an explicit report sender address.
    ///
    /// If not set, the report is sent from the account address.
    #[must_use]
    pub fn report_from(mut self, from: impl Into<String>) -> Self {
        self.report_from = Some(from.into());
        self
    }

    /// Sets the IMAP server hostname explicitly.
    ///
    /// If not set, the host is derived from the account domain.
    #[must_use]
    pub fn imap_host(mut self, host: impl Into<String>) -> Self {
        self.imap_host = Some(host.into());
        self
    }

    /// Sets the IMAP server port.
    ///
    /// Default is 993 (IMAPS with TLS).
    #[must_use]
    pub fn imap_port(mut self, port: u16) -> Self {
        self.imap_port = Some(port);
        self
    }

    /// Sets the SMTP server hostname explicitly.
    ///
    /// If not set, the host is derived from the account domain.
    #[must_use]
    pub fn smtp_host(mut self, host: impl Into<String>) -> Self {
        self.smtp_host = Some(host.into());
        self
    }

    /// Sets the SMTP server port.
    ///
    /// Default is 465 (implicit TLS). Any other port uses STARTTLS.
    #[must_use]
    pub fn smtp_port(mut self, port: u16) -> Self {
        self.smtp_port = Some(port);
        self
    }

    /// Sets the subject line of the report message.
    #[must_use]
    pub fn report_subject(mut self, subject: impl Into<String>) -> Self {
        self.report_subject = Some(subject.into());
        self
    }

    /// Sets the subject patterns to scan for, tried in order.
    ///
    /// The scan stops at the first pattern that matches any message.
    #[must_use]
    pub fn subjects<I, S>(mut self, subjects: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.subjects = Some(subjects.into_iter().map(Into::into).collect());
        self
    }

    /// Sets how many days back the scan window reaches.
    ///
    /// Default is 7.
    #[must_use]
    pub fn lookback_days(mut self, days: u32) -> Self {
        self.lookback_days = Some(days);
        self
    }

    /// Sets the ledger folder holding the signup table.
    #[must_use]
    pub fn folder_name(mut self, name: impl Into<String>) -> Self {
        self.folder_name = Some(name.into());
        self
    }

    /// Sets the title of the signup table.
    #[must_use]
    pub fn table_title(mut self, title: impl Into<String>) -> Self {
        self.table_title = Some(title.into());
        self
    }

    /// Sets the presentation applied when the table has to be created.
    #[must_use]
    pub fn style(mut self, style: TableStyle) -> Self {
        self.style = Some(style);
        self
    }

    /// Sets timeout configuration.
    #[must_use]
    pub fn timeouts(mut self, timeouts: MailboxTimeouts) -> Self {
        self.timeouts = Some(timeouts);
        self
    }

    /// Sets the connection timeout.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts
            .get_or_insert_with(MailboxTimeouts::default)
            .connect = timeout;
        self
    }

    /// Sets the message fetch timeout.
    #[must_use]
    pub fn fetch_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts
            .get_or_insert_with(MailboxTimeouts::default)
            .fetch = timeout;
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if required fields are missing or invalid.
    pub fn build(self) -> Result<SyncConfig> {
        let account_raw = self.account.ok_or_else(|| Error::InvalidConfig {
            message: "account is required".into(),
        })?;
        let account = validate_address(&account_raw)?;

        let password_raw = self.password.ok_or_else(|| Error::InvalidConfig {
            message: "password is required".into(),
        })?;

        let recipient_raw = self.report_recipient.ok_or_else(|| Error::InvalidConfig {
            message: "report_recipient is required".into(),
        })?;
        let report_recipient = validate_address(&recipient_raw)?;

        let report_from = self
            .report_from
            .as_deref()
            .map(validate_address)
            .transpose()?;

        let subjects = self.subjects.unwrap_or_else(|| {
            vec![
                "Growth Track Signup".to_string(),
                "Growth Track Sign Up Form".to_string(),
            ]
        });
        if subjects.is_empty() {
            return Err(Error::InvalidConfig {
                message: "at least one subject pattern is required".into(),
            });
        }

        let lookback_days = self.lookback_days.unwrap_or(7);
        if lookback_days == 0 {
            return Err(Error::InvalidConfig {
                message: "lookback_days must be at least 1".into(),
            });
        }

        let folder_name = self
            .folder_name
            .unwrap_or_else(|| "Growth Track".to_string());
        if folder_name.is_empty() {
            return Err(Error::InvalidConfig {
                message: "folder_name must not be empty".into(),
            });
        }

        let table_title = self
            .table_title
            .unwrap_or_else(|| "Growth Track Signups".to_string());
        if table_title.is_empty() {
            return Err(Error::InvalidConfig {
                message: "table_title must not be empty".into(),
            });
        }

        Ok(SyncConfig {
            account,
            password: SecretString::from(password_raw),
            report_recipient,
            report_from,
            imap_host: self.imap_host,
            imap_port: self.imap_port.unwrap_or(993),
            smtp_host: self.smtp_host,
            smtp_port: self.smtp_port.unwrap_or(465),
            report_subject: self
                .report_subject
                .unwrap_or_else(|| "Growth Track Signups Weekly Report".to_string()),
            subjects,
            lookback_days,
            folder_name,
            table_title,
            style: self.style.unwrap_or_default(),
            timeouts: self.timeouts.unwrap_or_default(),
        })
    }
}
