//! Local JSON dataset files, used in place of a Domo export.

use std::fs;
use std::path::Path;

use serde_json::Value;
use stoactl_core::leasing::RawRow;

use crate::error::{DomoError, Result};

/// Load a dataset from a JSON file holding an array of row objects (or a
/// single object). Non-object array elements are skipped.
pub fn load_local_json(path: &Path) -> Result<Vec<RawRow>> {
    let content = fs::read_to_string(path)?;
    let context = path.display().to_string();
    let value: Value = serde_json::from_str(&content).map_err(|e| DomoError::json(&context, e))?;

    match value {
        Value::Array(items) => {
            let total = items.len();
            let rows: Vec<RawRow> = items
                .into_iter()
                .filter_map(|item| match item {
                    Value::Object(map) => Some(map),
                    _ => None,
                })
                .collect();
            if rows.len() < total {
                tracing::warn!(
                    path = %context,
                    skipped = total - rows.len(),
                    "skipped non-object rows"
                );
            }
            Ok(rows)
        }
        Value::Object(map) => Ok(vec![map]),
        _ => Err(DomoError::Payload(format!(
            "{context}: expected a JSON array of objects"
        ))),
    }
}
