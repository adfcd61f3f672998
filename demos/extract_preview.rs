//! Preview what the pipeline would record for one notification message.
//!
//! Feeds a raw message through the same decoding and field-extraction steps
//! the pipeline uses and prints the resulting ledger row. Point it at a
//! saved message export to check a live form layout:
//!
//! ```bash
//! cargo run --example extract_preview -- path/to/message.eml
//! ```
//!
//! Without an argument it runs against a built-in sample notification.

use std::env;

use signup_sync::extract::{decode_body, extract_fields};
use signup_sync::record::{registration_date, SignupRecord, COLUMNS};

const SAMPLE: &[u8] = b"From: forms@example.org\r\n\
To: signups@example.org\r\n\
Subject: Growth Track Signup\r\n\
Content-Type: text/html; charset=utf-8\r\n\
\r\n\
<html><body><table>\r\n\
<tr><td>Full Name:</td><td>Ana Petrova</td></tr>\r\n\
<tr><td>Phone:</td><td>+27 82 555 0101</td></tr>\r\n\
<tr><td>Email:</td><td>ana@example.org</td></tr>\r\n\
</table></body></html>\r\n";

fn main() {
    let raw = match env::args().nth(1) {
        Some(path) => std::fs::read(&path).expect("readable message file"),
        None => {
            println!("No file given, using the built-in sample.\n");
            SAMPLE.to_vec()
        }
    };

    let body = decode_body(&raw).expect("decodable message body");
    let fields = extract_fields(&body);

    let missing = fields.missing();
    if missing.is_empty() {
        println!("All fields matched.");
    } else {
        println!("Missing fields (will be recorded as placeholders): {missing:?}");
    }

    // Date the row the way a run happening right now would
    let received_at_ms = chrono::Utc::now().timestamp_millis();
    let record = SignupRecord::from_fields(
        registration_date(received_at_ms),
        fields.full_name,
        fields.phone,
        fields.email,
    );

    println!("\nLedger row:");
    for (column, value) in COLUMNS.iter().zip(record.as_row()) {
        println!("  {column:<18} {value}");
    }
}
