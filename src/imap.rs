//! IMAP implementation of the [`Mailbox`] contract.
//!
//! One [`ImapMailbox`] wraps a single authenticated session over TLS with
//! INBOX selected. Every protocol call is wrapped in the configured
//! [`MailboxTimeouts`]; failures surface as the crate's mailbox error
//! variants with this module's [`ImapError`] as their source.
//!
//! Fetches use `BODY.PEEK[]` so reading a message never flips its unread
//! flag; only [`mark_read`](Mailbox::mark_read) does, via an explicit
//! `+FLAGS (\Seen)` store.

use crate::config::{MailboxTimeouts, SyncConfig};
use crate::connection::{establish_tls_connection, ConnectError, TlsStream};
use crate::error::{Error, Result};
use crate::mailbox::{FetchedMessage, Mailbox, MessageId};
use async_imap::Session;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, instrument};

type ImapSession = Session<TlsStream>;

/// IMAP transport failures, boxed into the crate error at the seam.
#[derive(Debug, thiserror::Error)]
pub(crate) enum ImapError {
    /// Could not reach the server.
    #[error(transparent)]
    Connect(#[from] ConnectError),

    /// LOGIN was rejected.
    #[error("IMAP login failed for {account}")]
    Login {
        account: String,
        #[source]
        source: async_imap::error::Error,
    },

    /// SELECT failed.
    #[error("failed to select mailbox '{mailbox}'")]
    Select {
        mailbox: String,
        #[source]
        source: async_imap::error::Error,
    },

    /// NOOP failed.
    #[error("IMAP NOOP command failed")]
    Noop {
        #[source]
        source: async_imap::error::Error,
    },

    /// UID SEARCH failed.
    #[error("IMAP search failed")]
    Search {
        #[source]
        source: async_imap::error::Error,
    },

    /// UID FETCH failed.
    #[error("IMAP fetch failed for UID {uid}")]
    Fetch {
        uid: String,
        #[source]
        source: async_imap::error::Error,
    },

    /// The server returned no message for a UID it previously listed.
    #[error("no message returned for UID {uid}")]
    MissingMessage { uid: String },

    /// The fetch response carried no body section.
    #[error("message {uid} has no body")]
    MissingBody { uid: String },

    /// The fetch response carried no INTERNALDATE.
    #[error("message {uid} has no internal date")]
    MissingDate { uid: String },

    /// UID STORE failed.
    #[error("IMAP store failed for UID {uid}")]
    Store {
        uid: String,
        #[source]
        source: async_imap::error::Error,
    },

    /// LOGOUT failed.
    #[error("IMAP logout failed")]
    Logout {
        #[source]
        source: async_imap::error::Error,
    },

    /// An operation exceeded its configured timeout.
    #[error("{operation} timed out after {timeout:?}")]
    Timeout {
        operation: &'static str,
        timeout: Duration,
    },

    /// The identifier did not come from this transport.
    #[error("message identifier '{id}' is not an IMAP UID")]
    BadId { id: String },
}

/// IMAP-backed [`Mailbox`] over a TLS session.
///
/// Create with [`connect`](Self::connect); call [`logout`](Self::logout)
/// when the run is done.
pub struct ImapMailbox {
    session: Box<ImapSession>,
    timeouts: MailboxTimeouts,
    target: String,
}

impl ImapMailbox {
    /// Connects to the IMAP server, authenticates and selects INBOX.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MailboxConnect`] when the connection, login or
    /// mailbox selection fails or times out.
    #[instrument(
        name = "ImapMailbox::connect",
        skip_all,
        fields(
            account = %config.account(),
            imap_host = %config.effective_imap_host()
        )
    )]
    pub async fn connect(config: &SyncConfig) -> Result<Self> {
        let target = config.imap_server_address();
        let session = Self::open_session(config, &target).await.map_err(|source| {
            Error::MailboxConnect {
                target: target.clone(),
                source: Box::new(source),
            }
        })?;

        debug!("session ready");
        Ok(Self {
            session: Box::new(session),
            timeouts: config.timeouts.clone(),
            target,
        })
    }

    /// Ends the session.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MailboxLogout`] when the server rejects the logout
    /// or the operation times out.
    #[instrument(name = "ImapMailbox::logout", skip(self))]
    pub async fn logout(&mut self) -> Result<()> {
        let logout_timeout = self.timeouts.logout;
        timeout(logout_timeout, self.session.logout())
            .await
            .map_err(|_| ImapError::Timeout {
                operation: "logout",
                timeout: logout_timeout,
            })
            .and_then(|result| result.map_err(|source| ImapError::Logout { source }))
            .map_err(|source| Error::MailboxLogout {
                source: Box::new(source),
            })
    }

    async fn open_session(config: &SyncConfig, target: &str) -> std::result::Result<ImapSession, ImapError> {
        let timeouts = &config.timeouts;
        let imap_host = config.effective_imap_host();

        let tls_stream = timeout(
            timeouts.connect,
            establish_tls_connection(&imap_host, target),
        )
        .await
        .map_err(|_| ImapError::Timeout {
            operation: "connect",
            timeout: timeouts.connect,
        })??;

        let client = async_imap::Client::new(tls_stream);
        let mut session = timeout(
            timeouts.auth,
            client.login(config.account(), config.password()),
        )
        .await
        .map_err(|_| ImapError::Timeout {
            operation: "login",
            timeout: timeouts.auth,
        })?
        .map_err(|e| ImapError::Login {
            account: config.account().to_string(),
            source: e.0,
        })?;

        timeout(timeouts.select, session.select("INBOX"))
            .await
            .map_err(|_| ImapError::Timeout {
                operation: "select",
                timeout: timeouts.select,
            })?
            .map_err(|source| ImapError::Select {
                mailbox: "INBOX".to_string(),
                source,
            })?;

        Ok(session)
    }

    async fn search_uids(&mut self, query: &str) -> std::result::Result<Vec<u32>, ImapError> {
        let search_timeout = self.timeouts.search;

        // NOOP first so the search sees the server's latest state
        timeout(search_timeout, self.session.noop())
            .await
            .map_err(|_| ImapError::Timeout {
                operation: "noop",
                timeout: search_timeout,
            })?
            .map_err(|source| ImapError::Noop { source })?;

        let uids = timeout(search_timeout, self.session.uid_search(query))
            .await
            .map_err(|_| ImapError::Timeout {
                operation: "search",
                timeout: search_timeout,
            })?
            .map_err(|source| ImapError::Search { source })?;

        let mut uids: Vec<u32> = uids.into_iter().collect();
        uids.sort_unstable();
        debug!(count = uids.len(), "search complete");
        Ok(uids)
    }

    async fn fetch_message(&mut self, id: &MessageId) -> std::result::Result<FetchedMessage, ImapError> {
        let uid = parse_uid(id)?.to_string();
        let fetch_timeout = self.timeouts.fetch;

        let mut stream = timeout(
            fetch_timeout,
            self.session.uid_fetch(&uid, "(BODY.PEEK[] INTERNALDATE)"),
        )
        .await
        .map_err(|_| ImapError::Timeout {
            operation: "fetch",
            timeout: fetch_timeout,
        })?
        .map_err(|source| ImapError::Fetch {
            uid: uid.clone(),
            source,
        })?;

        // Drain the whole response stream; the first item is our message
        let mut found = None;
        while let Some(item) = stream.next().await {
            let message = item.map_err(|source| ImapError::Fetch {
                uid: uid.clone(),
                source,
            })?;
            if found.is_none() {
                found = Some(to_fetched(&uid, id, &message)?);
            }
        }

        found.ok_or(ImapError::MissingMessage { uid })
    }

    async fn store_seen(&mut self, id: &MessageId) -> std::result::Result<(), ImapError> {
        let uid = parse_uid(id)?.to_string();
        let store_timeout = self.timeouts.store;

        let mut stream = timeout(
            store_timeout,
            self.session.uid_store(&uid, "+FLAGS (\\Seen)"),
        )
        .await
        .map_err(|_| ImapError::Timeout {
            operation: "store",
            timeout: store_timeout,
        })?
        .map_err(|source| ImapError::Store {
            uid: uid.clone(),
            source,
        })?;

        // The server answers with updated FETCH lines; drain them
        while let Some(item) = stream.next().await {
            item.map_err(|source| ImapError::Store {
                uid: uid.clone(),
                source,
            })?;
        }
        Ok(())
    }
}

#[async_trait]
impl Mailbox for ImapMailbox {
    #[instrument(
        name = "ImapMailbox::list_unread",
        skip_all,
        fields(subject = %subject, since = %since)
    )]
    async fn list_unread(&mut self, subject: &str, since: DateTime<Utc>) -> Result<Vec<MessageId>> {
        let query = search_query(subject, since);
        let uids = self
            .search_uids(&query)
            .await
            .map_err(|source| Error::MailboxSearch {
                pattern: subject.to_owned(),
                source: Box::new(source),
            })?;
        Ok(uids.into_iter().map(MessageId::from).collect())
    }

    #[instrument(name = "ImapMailbox::fetch", skip_all, fields(message = %id))]
    async fn fetch(&mut self, id: &MessageId) -> Result<FetchedMessage> {
        self.fetch_message(id)
            .await
            .map_err(|source| Error::MessageFetch {
                id: id.to_string(),
                source: Box::new(source),
            })
    }

    #[instrument(name = "ImapMailbox::mark_read", skip_all, fields(message = %id))]
    async fn mark_read(&mut self, id: &MessageId) -> Result<()> {
        self.store_seen(id)
            .await
            .map_err(|source| Error::MarkRead {
                id: id.to_string(),
                source: Box::new(source),
            })
    }
}

impl std::fmt::Debug for ImapMailbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImapMailbox")
            .field("target", &self.target)
            .field("timeouts", &self.timeouts)
            .finish_non_exhaustive()
    }
}

/// Builds the UNSEEN search query for one subject pattern.
///
/// IMAP `SEARCH` wants the date as `DD-Mon-YYYY` and the subject as a quoted
/// string, so quotes and backslashes in the pattern are escaped.
fn search_query(subject: &str, since: DateTime<Utc>) -> String {
    let date = since.date_naive().format("%d-%b-%Y");
    format!("UNSEEN SINCE {date} SUBJECT \"{}\"", escape_quoted(subject))
}

fn escape_quoted(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

fn parse_uid(id: &MessageId) -> std::result::Result<u32, ImapError> {
    id.as_str().parse().map_err(|_| ImapError::BadId {
        id: id.to_string(),
    })
}

fn to_fetched(
    uid: &str,
    id: &MessageId,
    message: &async_imap::types::Fetch,
) -> std::result::Result<FetchedMessage, ImapError> {
    let raw = message
        .body()
        .ok_or_else(|| ImapError::MissingBody {
            uid: uid.to_owned(),
        })?
        .to_vec();
    let received = message.internal_date().ok_or_else(|| ImapError::MissingDate {
        uid: uid.to_owned(),
    })?;
    Ok(FetchedMessage {
        id: id.clone(),
        raw,
        received_at_ms: received.timestamp_millis(),
    })
}
