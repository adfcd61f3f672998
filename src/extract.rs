//! Field extraction from registration-notification bodies.
//!
//! Notification emails carry the submitted form as an HTML table of two-cell
//! rows: a label cell (`Full Name:`, `Phone:`, `Email:`) immediately followed
//! by a value cell. This module decodes the message body and pulls those three
//! values out with one independent pattern per field.
//!
//! # Example
//!
//! ```
//! use signup_sync::extract::extract_fields;
//!
//! let body = "<tr><td>Full Name:</td><td> Ana Petrova </td></tr>\
//!             <tr><td>Email:</td><td>ana@example.org</td></tr>";
//! let fields = extract_fields(body);
//! assert_eq!(fields.full_name.as_deref(), Some("Ana Petrova"));
//! assert_eq!(fields.phone, None); // no Phone: row in this body
//! assert_eq!(fields.email.as_deref(), Some("ana@example.org"));
//! ```

use mailparse::MailParseError;
use once_cell::sync::Lazy;
use regex::Regex;

/// Label text for the name field, as rendered by the form notification.
const FULL_NAME_LABEL: &str = "Full Name:";
/// Label text for the phone field.
const PHONE_LABEL: &str = "Phone:";
/// Label text for the email field.
const EMAIL_LABEL: &str = "Email:";

static FULL_NAME: Lazy<FieldPattern> = Lazy::new(|| FieldPattern::for_label(FULL_NAME_LABEL));
static PHONE: Lazy<FieldPattern> = Lazy::new(|| FieldPattern::for_label(PHONE_LABEL));
static EMAIL: Lazy<FieldPattern> = Lazy::new(|| FieldPattern::for_label(EMAIL_LABEL));

/// Pattern for one labeled value in a two-cell table row.
///
/// Matches `label</td> ... <td ...>value`, case-insensitively, capturing the
/// value up to the next markup boundary (`<`). Tolerates whitespace between
/// the cells and attributes on the value cell.
///
/// # Example
///
/// ```
/// use signup_sync::extract::FieldPattern;
///
/// let pattern = FieldPattern::for_label("Phone:");
/// let row = r#"<td>PHONE:</td>  <td style="padding:4px"> +27 82 555 0101 </td>"#;
/// assert_eq!(pattern.capture(row), Some("+27 82 555 0101"));
/// ```
#[derive(Debug, Clone)]
pub struct FieldPattern {
    regex: Regex,
    label: String,
}

impl FieldPattern {
    /// Builds the pattern for a given label cell text.
    ///
    /// The label is matched literally (it is escaped before compilation), so
    /// any text is accepted.
    #[must_use]
    pub fn for_label(label: &str) -> Self {
        let pattern = format!(
            r"(?i){}\s*</td>\s*<td[^>]*>\s*([^<]*)",
            regex::escape(label)
        );
        Self {
            regex: Regex::new(&pattern).expect("valid regex"),
            label: label.to_owned(),
        }
    }

    /// Captures the field value from `text`, trimmed of surrounding
    /// whitespace.
    ///
    /// Returns `None` when the row is absent or its value cell is empty after
    /// trimming; "present but blank" and "missing" are the same outcome.
    #[must_use]
    pub fn capture<'t>(&self, text: &'t str) -> Option<&'t str> {
        self.regex
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim())
            .filter(|value| !value.is_empty())
    }

    /// The label cell text this pattern looks for.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }
}

/// The three form fields as found in one body. `None` marks a field whose row
/// was missing or blank; the sentinel substitution happens later, at
/// [`SignupRecord`](crate::record::SignupRecord) construction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedFields {
    /// Value of the `Full Name:` row, if present.
    pub full_name: Option<String>,
    /// Value of the `Phone:` row, if present.
    pub phone: Option<String>,
    /// Value of the `Email:` row, if present.
    pub email: Option<String>,
}

impl ExtractedFields {
    /// Names of the fields that did not match, for data-quality warnings.
    #[must_use]
    pub fn missing(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.full_name.is_none() {
            missing.push("full_name");
        }
        if self.phone.is_none() {
            missing.push("phone");
        }
        if self.email.is_none() {
            missing.push("email");
        }
        missing
    }
}

/// Runs all three field patterns against a decoded body.
///
/// The patterns are independent: a missing `Phone:` row has no effect on how
/// the name and email rows are matched.
#[must_use]
pub fn extract_fields(text: &str) -> ExtractedFields {
    ExtractedFields {
        full_name: FULL_NAME.capture(text).map(str::to_owned),
        phone: PHONE.capture(text).map(str::to_owned),
        email: EMAIL.capture(text).map(str::to_owned),
    }
}

/// Decodes a raw RFC 2822 message into body text.
///
/// For multipart messages the first subpart's body is used; otherwise the
/// top-level body. Transfer encoding (base64, quoted-printable) and charset
/// are resolved by `mailparse`.
///
/// # Errors
///
/// Returns an error if the raw bytes cannot be parsed as a message or the
/// body cannot be decoded. Callers treat this as "nothing extractable", not
/// as a fatal condition.
pub fn decode_body(raw: &[u8]) -> Result<String, MailParseError> {
    let parsed = mailparse::parse_mail(raw)?;
    match parsed.subparts.first() {
        Some(first) => first.get_body(),
        None => parsed.get_body(),
    }
}
