//! Derived columns on top of a fetched [`Dataset`].
//!
//! Enrichment never touches the dataset itself; it produces a new
//! [`EnrichedDataset`] whose records carry the cleaned corpus text, the
//! assigned topic id, and the topic name.

use std::collections::BTreeMap;

use anyhow::{bail, Result};
use serde::Serialize;

use crate::models::{Dataset, NormalizedRecord, TopicSummary, OUTLIER_LABEL, OUTLIER_TOPIC};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnrichedRecord {
    #[serde(flatten)]
    pub record: NormalizedRecord,
    pub text: String,
    pub topic: i64,
    #[serde(rename = "topic name")]
    pub topic_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct EnrichedDataset {
    records: Vec<EnrichedRecord>,
}

impl EnrichedDataset {
    pub fn records(&self) -> &[EnrichedRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Record counts per topic name, largest first. Ties keep first
    /// appearance order.
    pub fn topic_counts(&self) -> Vec<(String, usize)> {
        let mut counts: Vec<(String, usize)> = Vec::new();
        for r in &self.records {
            match counts.iter_mut().find(|(name, _)| *name == r.topic_name) {
                Some((_, n)) => *n += 1,
                None => counts.push((r.topic_name.clone(), 1)),
            }
        }
        counts.sort_by(|a, b| b.1.cmp(&a.1));
        counts
    }

    /// First record of each topic name, in first appearance order.
    pub fn first_per_topic(&self) -> Vec<&EnrichedRecord> {
        let mut seen: Vec<&str> = Vec::new();
        let mut firsts = Vec::new();
        for r in &self.records {
            if !seen.contains(&r.topic_name.as_str()) {
                seen.push(&r.topic_name);
                firsts.push(r);
            }
        }
        firsts
    }
}

/// Display name for `topic`: the summary name, or `"Outlier"` for the
/// outlier id and for ids without a summary.
pub fn topic_name(topic: i64, summaries: &BTreeMap<i64, TopicSummary>) -> String {
    if topic == OUTLIER_TOPIC {
        return OUTLIER_LABEL.to_string();
    }
    summaries
        .get(&topic)
        .map(|s| s.name.clone())
        .unwrap_or_else(|| OUTLIER_LABEL.to_string())
}

/// Join a dataset with its corpus texts, topic ids, and summaries.
///
/// `texts` and `topics` must be parallel to the dataset.
pub fn enrich(
    dataset: &Dataset,
    texts: &[String],
    topics: &[i64],
    summaries: &BTreeMap<i64, TopicSummary>,
) -> Result<EnrichedDataset> {
    if texts.len() != dataset.len() || topics.len() != dataset.len() {
        bail!(
            "enrichment columns do not match dataset: {} records, {} texts, {} topics",
            dataset.len(),
            texts.len(),
            topics.len()
        );
    }

    let records = dataset
        .iter()
        .zip(texts)
        .zip(topics)
        .map(|((record, text), &topic)| EnrichedRecord {
            record: record.clone(),
            text: text.clone(),
            topic,
            topic_name: topic_name(topic, summaries),
        })
        .collect();

    Ok(EnrichedDataset { records })
}

/// All documents of each non-outlier topic, keyed in the order topics
/// first appear.
pub fn sample_documents(texts: &[String], topics: &[i64]) -> Vec<(i64, Vec<String>)> {
    let mut samples: Vec<(i64, Vec<String>)> = Vec::new();
    for (text, &topic) in texts.iter().zip(topics) {
        if topic == OUTLIER_TOPIC {
            continue;
        }
        match samples.iter_mut().find(|(id, _)| *id == topic) {
            Some((_, docs)) => docs.push(text.clone()),
            None => samples.push((topic, vec![text.clone()])),
        }
    }
    samples
}
