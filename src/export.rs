//! CSV export of fetched reviews.
//!
//! The nested `author` object of each review is lifted into top-level
//! `author_*` columns. The column set is the union of all keys, in order of
//! first appearance. Output starts with a UTF-8 byte-order mark so spreadsheet
//! applications pick the right encoding.

use std::collections::HashSet;

use serde_json::Value;
use tracing::debug;

use crate::error::ExportError;
use crate::models::{FetchKey, Review};

pub const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

const AUTHOR_KEY: &str = "author";

/// Lift the `author` object into `author_`-prefixed top-level keys
pub fn flatten_review(mut review: Review) -> Review {
    match review.get(AUTHOR_KEY) {
        Some(Value::Object(_)) | Some(Value::Null) => {}
        _ => return review,
    }

    if let Some(Value::Object(author)) = review.shift_remove(AUTHOR_KEY) {
        for (key, value) in author {
            review.insert(format!("{}_{}", AUTHOR_KEY, key), value);
        }
    }

    review
}

/// Union of keys across `rows`, in first-seen order
fn collect_columns(rows: &[Review]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut columns = Vec::new();

    for row in rows {
        for key in row.keys() {
            if seen.insert(key.as_str()) {
                columns.push(key.clone());
            }
        }
    }

    columns
}

fn render_cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Serialize reviews to BOM-prefixed CSV bytes.
///
/// Returns `Ok(None)` when there is nothing to export.
pub fn export_csv(reviews: &[Review]) -> Result<Option<Vec<u8>>, ExportError> {
    if reviews.is_empty() {
        return Ok(None);
    }

    let rows: Vec<Review> = reviews.iter().cloned().map(flatten_review).collect();
    let columns = collect_columns(&rows);

    let mut buffer = Vec::with_capacity(UTF8_BOM.len() + rows.len() * 256);
    buffer.extend_from_slice(UTF8_BOM);

    let mut writer = csv::Writer::from_writer(buffer);
    writer.write_record(&columns)?;

    for row in &rows {
        writer.write_record(columns.iter().map(|column| render_cell(row.get(column))))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| ExportError::Flush(e.error().to_string()))?;

    debug!(
        rows = rows.len(),
        columns = columns.len(),
        bytes = bytes.len(),
        "Exported reviews to CSV"
    );

    Ok(Some(bytes))
}

/// File name that distinguishes exports made with different parameters
pub fn export_file_name(key: &FetchKey) -> String {
    format!(
        "steam_reviews_{}_{}_{}p.csv",
        key.app_id, key.language, key.max_pages
    )
}
