//! Signup records and registration-date derivation.
//!
//! A [`SignupRecord`] is the normalized form of one registration notification:
//! the three form fields plus a human-readable registration date derived from
//! the message's receipt timestamp.

use chrono::{DateTime, FixedOffset, Utc};
use once_cell::sync::Lazy;

/// Placeholder stored when a form field is absent from the notification.
pub const NOT_PROVIDED: &str = "Not provided";

/// Column order used by ledger tables and exports.
pub const COLUMNS: [&str; 4] = ["Registration Date", "Full Name", "Phone", "Email"];

/// Registrations are dated in Africa/Johannesburg time. The zone is a fixed
/// +02:00 offset with no daylight saving, so a `FixedOffset` is exact.
static REGISTRATION_ZONE: Lazy<FixedOffset> =
    Lazy::new(|| FixedOffset::east_opt(2 * 3600).expect("valid offset"));

/// Formats an instant as a human-readable date in the registration zone.
///
/// Renders `"Month D, YYYY"` with no zero-padding on the day, e.g.
/// `"March 5, 2025"`. The rendering is fixed to Africa/Johannesburg wall
/// clock regardless of the host timezone, so output is stable across
/// deployment environments.
#[must_use]
pub fn format_date(at: DateTime<Utc>) -> String {
    at.with_timezone(&*REGISTRATION_ZONE)
        .format("%B %-d, %Y")
        .to_string()
}

/// Formats a receipt timestamp (epoch milliseconds) as a registration date.
///
/// Two messages received either side of local midnight get different dates
/// even when only seconds apart. Timestamps outside the representable range
/// fall back to the Unix epoch.
///
/// ```
/// use signup_sync::record::registration_date;
///
/// // 2025-01-15T22:30:00Z is already January 16 in Johannesburg
/// assert_eq!(registration_date(1_736_980_200_000), "January 16, 2025");
/// ```
#[must_use]
pub fn registration_date(received_at_ms: i64) -> String {
    format_date(DateTime::from_timestamp_millis(received_at_ms).unwrap_or(DateTime::UNIX_EPOCH))
}

/// One accepted registration, ready to be appended to the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SignupRecord {
    /// Human-readable date the notification was received.
    pub registration_date: String,
    /// Registrant's full name, or [`NOT_PROVIDED`].
    pub full_name: String,
    /// Registrant's phone number, or [`NOT_PROVIDED`].
    pub phone: String,
    /// Registrant's email address, or [`NOT_PROVIDED`].
    pub email: String,
}

impl SignupRecord {
    /// Builds a record from extracted form fields.
    ///
    /// Any field the extractor could not find is stored as [`NOT_PROVIDED`]
    /// rather than left empty, so the ledger never contains blank cells.
    #[must_use]
    pub fn from_fields(
        registration_date: String,
        full_name: Option<String>,
        phone: Option<String>,
        email: Option<String>,
    ) -> Self {
        let or_placeholder = |field: Option<String>| field.unwrap_or_else(|| NOT_PROVIDED.to_owned());
        Self {
            registration_date,
            full_name: or_placeholder(full_name),
            phone: or_placeholder(phone),
            email: or_placeholder(email),
        }
    }

    /// The record as a ledger row, in [`COLUMNS`] order.
    #[must_use]
    pub fn as_row(&self) -> [String; 4] {
        [
            self.registration_date.clone(),
            self.full_name.clone(),
            self.phone.clone(),
            self.email.clone(),
        ]
    }

    /// The identity used for duplicate detection: name, phone, email.
    ///
    /// The registration date is not part of the identity; the same person
    /// signing up again on a later date is still a duplicate.
    #[must_use]
    pub fn identity(&self) -> (&str, &str, &str) {
        (&self.full_name, &self.phone, &self.email)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_get_placeholder() {
        let record = SignupRecord::from_fields(
            "June 1, 2025".into(),
            Some("Thabo Mokoena".into()),
            None,
            None,
        );
        assert_eq!(record.full_name, "Thabo Mokoena");
        assert_eq!(record.phone, NOT_PROVIDED);
        assert_eq!(record.email, NOT_PROVIDED);
    }

    #[test]
    fn test_present_fields_kept_verbatim() {
        let record = SignupRecord::from_fields(
            "June 1, 2025".into(),
            Some("Thabo Mokoena".into()),
            Some("+27 82 555 0101".into()),
            Some("thabo@example.org".into()),
        );
        assert_eq!(
            record.as_row(),
            [
                "June 1, 2025".to_owned(),
                "Thabo Mokoena".to_owned(),
                "+27 82 555 0101".to_owned(),
                "thabo@example.org".to_owned(),
            ]
        );
    }

    #[test]
    fn test_registration_date_formats_in_johannesburg_time() {
        // 2025-03-05T10:00:00Z -> 12:00 local, single-digit day unpadded
        assert_eq!(registration_date(1_741_168_800_000), "March 5, 2025");
    }

    #[test]
    fn test_registration_date_rolls_over_local_midnight() {
        // 2025-01-15T21:59:59Z is still January 15 at +02:00...
        assert_eq!(registration_date(1_736_978_399_000), "January 15, 2025");
        // ...but 22:00:00Z is January 16
        assert_eq!(registration_date(1_736_978_400_000), "January 16, 2025");
    }

    #[test]
    fn test_out_of_range_timestamp_falls_back_to_epoch() {
        assert_eq!(registration_date(i64::MAX), "January 1, 1970");
    }

    #[test]
    fn test_identity_excludes_date() {
        let a = SignupRecord::from_fields(
            "June 1, 2025".into(),
            Some("Ana".into()),
            Some("123".into()),
            Some("ana@example.org".into()),
        );
        let b = SignupRecord::from_fields(
            "June 8, 2025".into(),
            Some("Ana".into()),
            Some("123".into()),
            Some("ana@example.org".into()),
        );
        assert_eq!(a.identity(), b.identity());
    }
}
