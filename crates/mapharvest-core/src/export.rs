//! CSV export of an accumulated record sequence.
//!
//! The column set and order are fixed; hosts render the same eight columns
//! the dashboard table shows. Every field is quoted and embedded quotes are
//! doubled, so values containing commas, quotes, or newlines survive a
//! round trip through any conforming CSV reader.

use chrono::{DateTime, Utc};

use crate::record::BusinessRecord;

/// Fixed export header, in column order.
pub const CSV_HEADERS: [&str; 8] = [
    "Name", "Category", "Address", "Phone", "Website", "Rating", "Reviews", "Hours",
];

/// Encodes records as a CSV table with the fixed 8-column header.
///
/// Missing fields render as empty quoted strings. Rows are joined with `\n`
/// and the output carries no trailing newline.
#[must_use]
pub fn encode_csv(records: &[BusinessRecord]) -> String {
    let mut lines = Vec::with_capacity(records.len() + 1);
    lines.push(CSV_HEADERS.join(","));

    for record in records {
        let fields = [
            &record.name,
            &record.category,
            &record.address,
            &record.phone,
            &record.website,
            &record.rating,
            &record.reviews,
            &record.hours,
        ];
        let row = fields
            .iter()
            .map(|f| quote_field(f))
            .collect::<Vec<_>>()
            .join(",");
        lines.push(row);
    }

    lines.join("\n")
}

/// Builds the timestamped filename offered for a CSV download,
/// e.g. `mapharvest_2026-08-07T12-34-56-789Z.csv`.
///
/// The timestamp is ISO-8601 UTC with `:` and `.` replaced by `-` so the
/// name is valid on every filesystem.
#[must_use]
pub fn export_filename(now: DateTime<Utc>) -> String {
    format!("mapharvest_{}.csv", now.format("%Y-%m-%dT%H-%M-%S-%3fZ"))
}

/// Wraps a field in double quotes, doubling any embedded quote characters.
fn quote_field(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}
