//! Unread-notification discovery.
//!
//! The upstream form's displayed subject changed over time, so the scanner
//! carries an ordered list of subject patterns: the current text first, then
//! legacy variants. Patterns are tried in order and the first one that yields
//! any unread messages wins; later patterns are not queried. An empty result
//! from every pattern is a normal outcome, not an error.

use crate::error::Result;
use crate::mailbox::{Mailbox, MessageId};
use chrono::{DateTime, Utc};
use tracing::{debug, instrument};

/// Finds unread registration notifications received on or after `since`.
///
/// Queries the mailbox once per subject pattern, in the order given, and
/// returns the first non-empty result. Returns an empty list when no pattern
/// matches anything.
///
/// # Errors
///
/// Any search failure is returned immediately; the scanner does not retry or
/// fall through to the next pattern on transport errors, since a failing
/// mailbox would fail for every pattern alike.
#[instrument(skip(mailbox, subjects), fields(patterns = subjects.len(), since = %since))]
pub async fn find_unread_signups<M>(
    mailbox: &mut M,
    subjects: &[String],
    since: DateTime<Utc>,
) -> Result<Vec<MessageId>>
where
    M: Mailbox + ?Sized,
{
    for subject in subjects {
        let ids = mailbox.list_unread(subject, since).await?;
        if !ids.is_empty() {
            debug!(subject = %subject, count = ids.len(), "subject pattern matched");
            return Ok(ids);
        }
        debug!(subject = %subject, "no unread messages for subject pattern");
    }

    Ok(Vec::new())
}
