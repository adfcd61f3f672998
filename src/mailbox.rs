//! Mailbox collaborator contract.
//!
//! The pipeline talks to the mailbox through the [`Mailbox`] trait: search
//! for unread notifications, fetch one message's raw content, and flip the
//! unread flag off once a message has been handled. The crate ships an IMAP
//! implementation ([`ImapMailbox`](crate::ImapMailbox)); tests use in-memory
//! fakes.

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Opaque identifier for one message, stable within a single run.
///
/// For IMAP transports this is the decimal UID; other transports may use any
/// string the server hands out.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageId(String);

impl MessageId {
    /// Wraps a transport-provided identifier.
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

impl From<u32> for MessageId {
    fn from(uid: u32) -> Self {
        Self(uid.to_string())
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One message's content as returned by [`Mailbox::fetch`].
#[derive(Debug, Clone)]
pub struct FetchedMessage {
    /// The identifier this content belongs to.
    pub id: MessageId,
    /// Full RFC 2822 message, headers included.
    pub raw: Vec<u8>,
    /// Receipt timestamp as reported by the mailbox, epoch milliseconds.
    pub received_at_ms: i64,
}

/// Read/mutate access to the monitored mailbox.
///
/// Implementations report failures through the matching [`Error`] variants:
/// [`MailboxSearch`] for searches, [`MessageFetch`] for fetches, [`MarkRead`]
/// for flag updates. The pipeline relies on those variants to decide whether
/// a failure aborts the run or only skips the current message.
///
/// [`Error`]: crate::Error
/// [`MailboxSearch`]: crate::Error::MailboxSearch
/// [`MessageFetch`]: crate::Error::MessageFetch
/// [`MarkRead`]: crate::Error::MarkRead
#[async_trait]
pub trait Mailbox: Send + Sync {
    /// Lists unread messages whose subject matches `subject`, restricted to
    /// messages received on or after `since`.
    ///
    /// Subject matching follows the transport's convention (IMAP `SUBJECT`
    /// is a substring match). Returns an empty list when nothing matches.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MailboxSearch`](crate::Error::MailboxSearch) on
    /// transport failure.
    async fn list_unread(&mut self, subject: &str, since: DateTime<Utc>) -> Result<Vec<MessageId>>;

    /// Fetches one message's full content and receipt timestamp.
    ///
    /// Fetching must not change the message's unread state; only
    /// [`mark_read`](Self::mark_read) does that.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MessageFetch`](crate::Error::MessageFetch) on
    /// transport failure or when the identifier is unknown.
    async fn fetch(&mut self, id: &MessageId) -> Result<FetchedMessage>;

    /// Marks a message as read so later runs skip it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MarkRead`](crate::Error::MarkRead) on transport
    /// failure.
    async fn mark_read(&mut self, id: &MessageId) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_id_from_uid() {
        let id = MessageId::from(42u32);
        assert_eq!(id.as_str(), "42");
        assert_eq!(id.to_string(), "42");
    }

    #[test]
    fn test_message_id_equality() {
        assert_eq!(MessageId::new("7"), MessageId::from(7u32));
        assert_ne!(MessageId::new("7"), MessageId::new("8"));
    }
}
