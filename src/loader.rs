//! Snapshot sources and the in-memory store built from them.
//!
//! A [`SnapshotSource`] yields the full, ordered list of raw records in one
//! call. The [`SnapshotStore`] keeps that list and answers timestamp lookups;
//! the replay side only ever sees the timestamps.
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::LoadError;
use crate::record::RawSnapshot;

pub trait SnapshotSource {
    /// Read every snapshot, in capture order.
    fn load_all(&self) -> Result<Vec<RawSnapshot>, LoadError>;
}

/// A capture file: newline-delimited JSON objects, or a single JSON array of
/// the same objects.
#[derive(Debug, Clone)]
pub struct NdjsonFile {
    path: PathBuf,
}

impl NdjsonFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SnapshotSource for NdjsonFile {
    fn load_all(&self) -> Result<Vec<RawSnapshot>, LoadError> {
        let text = std::fs::read_to_string(&self.path).map_err(|source| LoadError::Io {
            path: self.path.clone(),
            source,
        })?;
        let records = parse_snapshots(&text)?;
        info!(path = ?self.path, records = records.len(), "loaded snapshots");
        Ok(records)
    }
}

impl SnapshotSource for Vec<RawSnapshot> {
    fn load_all(&self) -> Result<Vec<RawSnapshot>, LoadError> {
        Ok(self.clone())
    }
}

/// Parse capture text. Blank lines are skipped; line numbers in errors are
/// 1-based.
pub fn parse_snapshots(text: &str) -> Result<Vec<RawSnapshot>, LoadError> {
    let body = text.trim_start();
    if body.starts_with('[') {
        return serde_json::from_str(body).map_err(LoadError::Array);
    }
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| serde_json::from_str(line).map_err(|source| LoadError::Parse { line: i + 1, source }))
        .collect()
}

/// Loaded snapshots plus a lookup by timestamp.
#[derive(Debug, Default, Clone)]
pub struct SnapshotStore {
    records: Vec<RawSnapshot>,
    by_time: HashMap<String, usize>,
}

impl SnapshotStore {
    pub fn new(records: Vec<RawSnapshot>) -> Self {
        let mut by_time = HashMap::with_capacity(records.len());
        for (idx, rec) in records.iter().enumerate() {
            if by_time.contains_key(rec.time()) {
                // first record keeps the key
                warn!(time = rec.time(), index = idx, "duplicate snapshot timestamp");
                continue;
            }
            by_time.insert(rec.time().to_string(), idx);
        }
        Self { records, by_time }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[RawSnapshot] {
        &self.records
    }

    /// Timestamps in capture order; handed to the scheduler by value.
    pub fn timestamps(&self) -> Vec<String> {
        self.records.iter().map(|r| r.time().to_string()).collect()
    }

    /// `None` when no record carries `time`.
    pub fn by_timestamp(&self, time: &str) -> Option<&RawSnapshot> {
        self.by_time.get(time).map(|&idx| &self.records[idx])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book::OrderLevel;

    fn canonical(time: &str, bid: f64) -> RawSnapshot {
        RawSnapshot::Canonical {
            time: time.into(),
            bids: vec![OrderLevel { price: bid, size: 1.0 }],
            asks: vec![],
        }
    }

    #[test]
    fn ndjson_lines_parse_in_order() {
        let text = "{\"time\":\"00:00:00\",\"Bid1\":1,\"Bid1Size\":2}\n\n{\"time\":\"00:00:01\",\"bids\":[{\"price\":1,\"size\":1}]}\n";
        let recs = parse_snapshots(text).unwrap();
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[0].time(), "00:00:00");
        assert!(matches!(recs[1], RawSnapshot::Canonical { .. }));
    }

    #[test]
    fn json_array_is_accepted() {
        let text = " [{\"time\":\"a\"},{\"time\":\"b\",\"Ask1\":3,\"Ask1Size\":1}]";
        let recs = parse_snapshots(text).unwrap();
        assert_eq!(recs.iter().map(|r| r.time()).collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn malformed_line_reports_its_number() {
        let text = "{\"time\":\"a\"}\nnot json\n";
        match parse_snapshots(text) {
            Err(LoadError::Parse { line, .. }) => assert_eq!(line, 2),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn empty_text_is_an_empty_capture() {
        assert!(parse_snapshots("").unwrap().is_empty());
        assert!(parse_snapshots("\n  \n").unwrap().is_empty());
    }

    #[test]
    fn lookup_by_timestamp_and_miss() {
        let store = SnapshotStore::new(vec![canonical("a", 1.0), canonical("b", 2.0)]);
        assert_eq!(store.timestamps(), vec!["a".to_string(), "b".to_string()]);
        assert_eq!(store.by_timestamp("b"), Some(&canonical("b", 2.0)));
        assert_eq!(store.by_timestamp("zzz"), None);
    }

    #[test]
    fn duplicate_timestamp_resolves_to_first_record() {
        let store = SnapshotStore::new(vec![canonical("a", 1.0), canonical("a", 2.0)]);
        assert_eq!(store.len(), 2);
        assert_eq!(store.by_timestamp("a"), Some(&canonical("a", 1.0)));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let src = NdjsonFile::new("/definitely/not/here.ndjson");
        assert!(matches!(src.load_all(), Err(LoadError::Io { .. })));
    }
}
