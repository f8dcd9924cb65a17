//! CSV export of the result store.
//!
//! One file per export under `<dir>/<category>/`, named after the category,
//! region and local timestamp. Quoting follows RFC 4180.

use crate::error::ExportError;
use chrono::NaiveDateTime;
use mapscout_core::BusinessRecord;
use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};

/// Column titles, in output order.
pub const HEADER: [&str; 9] = [
    "#", "Name", "Address", "Phone", "Rating", "Reviews", "Status", "Email", "Website",
];

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Make a label safe for a path component: trimmed, spaces to `_`, `/` to `-`.
pub fn clean_label(label: &str) -> String {
    label.trim().replace(' ', "_").replace('/', "-")
}

/// `<dir>/<category>/<category>-<region>-<timestamp>.csv`
pub fn export_path(dir: &Path, category: &str, region: &str, at: NaiveDateTime) -> PathBuf {
    let category = clean_label(category);
    let region = clean_label(region);
    let file = format!("{category}-{region}-{}.csv", at.format(TIMESTAMP_FORMAT));
    dir.join(&category).join(file)
}

fn quote(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

fn push_row<'a>(out: &mut String, fields: impl IntoIterator<Item = &'a str>) {
    let line = fields
        .into_iter()
        .map(quote)
        .collect::<Vec<_>>()
        .join(",");
    out.push_str(&line);
    out.push_str("\r\n");
}

fn cell(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or_default()
}

/// Render records as CSV text with a header row and 1-based index column.
pub fn render_csv(records: &[BusinessRecord]) -> String {
    let mut out = String::new();
    push_row(&mut out, HEADER);

    for (i, record) in records.iter().enumerate() {
        let index = (i + 1).to_string();
        push_row(
            &mut out,
            [
                index.as_str(),
                record.name.as_str(),
                cell(&record.address),
                cell(&record.phone),
                cell(&record.rating),
                cell(&record.review_count),
                cell(&record.open_status),
                cell(&record.email),
                cell(&record.website),
            ],
        );
    }
    out
}

/// Write `records` to a new CSV file and return its path.
///
/// # Errors
/// [`ExportError::NoResults`] when `records` is empty (no file is created),
/// [`ExportError::Io`] when the directory or file cannot be written.
pub fn export_records(
    dir: &Path,
    category: &str,
    region: &str,
    records: &[BusinessRecord],
    at: NaiveDateTime,
) -> Result<PathBuf, ExportError> {
    if records.is_empty() {
        return Err(ExportError::NoResults);
    }

    let path = export_path(dir, category, region, at);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| ExportError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    fs::write(&path, render_csv(records)).map_err(|source| ExportError::Io {
        path: path.clone(),
        source,
    })?;

    tracing::info!("Exported {} records to {}", records.len(), path.display());
    Ok(path)
}
