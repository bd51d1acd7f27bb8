//! Wire contract of `POST /api/leasing/sync`, shared by the push client
//! and the server.

use serde::{Deserialize, Serialize};

/// `true` on the first chunk of a dataset; the server truncates before inserting.
pub const HEADER_FIRST_CHUNK: &str = "x-leasing-sync-first-chunk";
/// `true` on the last chunk; the server records the sync log entry.
pub const HEADER_LAST_CHUNK: &str = "x-leasing-sync-last-chunk";
/// Total rows across all chunks, sent with the last chunk.
pub const HEADER_TOTAL_ROWS: &str = "x-leasing-sync-total-rows";
/// `data_hash` of the full dataset, sent with the last chunk.
pub const HEADER_DATA_HASH: &str = "x-leasing-sync-data-hash";

/// Rows per request when pushing a large dataset.
pub const CHUNK_ROWS: usize = 5000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncedDataset {
    pub dataset: String,
    pub rows: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedDataset {
    pub dataset: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncIssue {
    pub dataset: String,
    pub message: String,
}

/// Outcome of one or more sync requests
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub success: bool,
    #[serde(default)]
    pub synced: Vec<SyncedDataset>,
    #[serde(default)]
    pub skipped: Vec<SkippedDataset>,
    #[serde(default)]
    pub errors: Option<Vec<SyncIssue>>,
}

impl SyncReport {
    pub fn new() -> Self {
        Self {
            success: true,
            ..Self::default()
        }
    }

    pub fn synced(&mut self, dataset: impl Into<String>, rows: usize, chunk: Option<String>) {
        self.synced.push(SyncedDataset {
            dataset: dataset.into(),
            rows,
            chunk,
        });
    }

    pub fn skipped(&mut self, dataset: impl Into<String>, reason: impl Into<String>) {
        self.skipped.push(SkippedDataset {
            dataset: dataset.into(),
            reason: reason.into(),
        });
    }

    pub fn error(&mut self, dataset: impl Into<String>, message: impl Into<String>) {
        self.errors.get_or_insert_with(Vec::new).push(SyncIssue {
            dataset: dataset.into(),
            message: message.into(),
        });
        self.success = false;
    }

    /// Fold another report into this one.
    pub fn merge(&mut self, other: SyncReport) {
        self.synced.extend(other.synced);
        self.skipped.extend(other.skipped);
        if let Some(errors) = other.errors {
            for issue in errors {
                self.error(issue.dataset, issue.message);
            }
        }
    }

    pub fn has_errors(&self) -> bool {
        self.errors.as_ref().is_some_and(|e| !e.is_empty())
    }
}

/// One request's slice of a chunked upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkPlan {
    pub index: usize,
    pub count: usize,
    pub start: usize,
    pub end: usize,
}

impl ChunkPlan {
    pub fn is_first(&self) -> bool {
        self.index == 0
    }

    pub fn is_last(&self) -> bool {
        self.index + 1 == self.count
    }

    /// `"2/5"`, as reported back in `SyncedDataset::chunk`.
    pub fn label(&self) -> String {
        format!("{}/{}", self.index + 1, self.count)
    }
}

/// Split `total` rows into chunks of at most `chunk_rows`.
pub fn plan_chunks(total: usize, chunk_rows: usize) -> Vec<ChunkPlan> {
    let size = chunk_rows.max(1);
    let count = total.div_ceil(size);
    (0..count)
        .map(|index| ChunkPlan {
            index,
            count,
            start: index * size,
            end: ((index + 1) * size).min(total),
        })
        .collect()
}

/// Parse a `true`/`false` chunk header value.
pub fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunks_cover_every_row_once() {
        let plan = plan_chunks(12_001, 5000);
        assert_eq!(plan.len(), 3);
        assert_eq!((plan[0].start, plan[0].end), (0, 5000));
        assert_eq!((plan[2].start, plan[2].end), (10_000, 12_001));
        assert!(plan[0].is_first() && !plan[0].is_last());
        assert!(plan[2].is_last());
        assert_eq!(plan[1].label(), "2/3");

        let covered: usize = plan.iter().map(|c| c.end - c.start).sum();
        assert_eq!(covered, 12_001);
    }

    #[test]
    fn exact_multiple_and_empty() {
        assert_eq!(plan_chunks(10_000, 5000).len(), 2);
        assert!(plan_chunks(0, 5000).is_empty());
        let single = plan_chunks(3, 5000);
        assert!(single[0].is_first() && single[0].is_last());
    }

    #[test]
    fn report_merge_tracks_failure() {
        let mut a = SyncReport::new();
        a.synced("leasing", 10, None);

        let mut b = SyncReport::new();
        b.skipped("pricing", "unchanged");
        b.error("units", "boom");

        a.merge(b);
        assert!(!a.success);
        assert!(a.has_errors());
        assert_eq!(a.synced.len(), 1);
        assert_eq!(a.skipped.len(), 1);
    }

    #[test]
    fn report_serializes_null_errors_when_clean() {
        let report = SyncReport::new();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["success"], true);
        assert!(json["errors"].is_null());
    }

    #[test]
    fn flags() {
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag("false"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }
}
