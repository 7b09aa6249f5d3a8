//! Core data models used throughout subtopic.
//!
//! These types represent the items, comments, and records that flow from
//! the forum connector through filtering and normalization into a
//! [`Dataset`], and the [`TopicSummary`] values produced by labeling.

use serde::Serialize;

use crate::error::{IngestError, Result};
use crate::sort::SortMode;

/// Reserved topic id for documents the topic model could not assign.
pub const OUTLIER_TOPIC: i64 = -1;

/// Label given to outlier documents and to topics without a summary.
pub const OUTLIER_LABEL: &str = "Outlier";

/// A validated request for one bounded, sorted read of a subreddit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub source: String,
    pub sort: SortMode,
    pub limit: usize,
}

impl FetchRequest {
    /// Build a request from user-facing strings.
    ///
    /// Fails with [`IngestError::Validation`] for an unknown sort mode, a
    /// zero limit, or an empty source name.
    pub fn new(source: &str, sort: &str, limit: usize) -> Result<Self> {
        let sort: SortMode = sort.parse()?;
        Self::with_sort(source, sort, limit)
    }

    pub fn with_sort(source: &str, sort: SortMode, limit: usize) -> Result<Self> {
        let source = source.trim().trim_start_matches("r/").to_string();
        if source.is_empty() {
            return Err(IngestError::Validation(
                "source identifier must not be empty".to_string(),
            ));
        }
        if limit == 0 {
            return Err(IngestError::Validation(
                "requested item count must be > 0".to_string(),
            ));
        }
        Ok(Self {
            source,
            sort,
            limit,
        })
    }
}

/// An item as returned by the source connector, before filtering.
///
/// Comments are not carried here; they are resolved lazily through the
/// connector so that skipped items never cost a round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawItem {
    pub id: String,
    pub title: String,
    pub body: Option<String>,
    pub pinned: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub body: String,
    pub pinned: bool,
}

/// One node of a resolved comment listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommentNode {
    Comment(Comment),
    /// Placeholder for replies that were not expanded.
    More { count: u64 },
}

/// A filtered, normalized item. Field names serialize lower-cased.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedRecord {
    pub title: String,
    #[serde(rename = "post text")]
    pub post_text: String,
    pub id: String,
    pub comments: Vec<String>,
}

/// Ordered records in source listing order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Dataset {
    records: Vec<NormalizedRecord>,
}

impl Dataset {
    pub fn new(records: Vec<NormalizedRecord>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[NormalizedRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, NormalizedRecord> {
        self.records.iter()
    }

    pub fn into_records(self) -> Vec<NormalizedRecord> {
        self.records
    }
}

impl<'a> IntoIterator for &'a Dataset {
    type Item = &'a NormalizedRecord;
    type IntoIter = std::slice::Iter<'a, NormalizedRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// LLM-generated label for one topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopicSummary {
    pub topic_id: i64,
    pub name: String,
    pub description: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_rejects_unknown_sort() {
        let err = FetchRequest::new("rust", "biweekly", 10).unwrap_err();
        assert!(matches!(err, IngestError::Validation(_)));
    }

    #[test]
    fn request_rejects_zero_limit() {
        let err = FetchRequest::new("rust", "hot", 0).unwrap_err();
        assert!(matches!(err, IngestError::Validation(_)));
    }

    #[test]
    fn request_strips_subreddit_prefix() {
        let req = FetchRequest::new("r/television", "week", 5).unwrap();
        assert_eq!(req.source, "television");
        assert_eq!(req.sort, SortMode::TopWeek);
    }

    #[test]
    fn record_serializes_lowercase_columns() {
        let record = NormalizedRecord {
            title: "t".into(),
            post_text: String::new(),
            id: "abc".into(),
            comments: vec!["c".into()],
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["post text"], "");
        assert_eq!(json["id"], "abc");
        assert_eq!(json["comments"][0], "c");
    }
}
