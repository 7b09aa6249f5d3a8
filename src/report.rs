//! Plain-text reports and JSON export of an analysis run.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::enrich::EnrichedDataset;
use crate::models::{Dataset, TopicSummary};

const RULE_WIDTH: usize = 80;

pub fn write_topic_summaries(
    out: &mut dyn Write,
    summaries: &BTreeMap<i64, TopicSummary>,
) -> std::io::Result<()> {
    writeln!(out, "LLM-Generated Topic Summaries:")?;
    writeln!(out, "{}", "=".repeat(RULE_WIDTH))?;
    for (topic_id, summary) in summaries {
        writeln!(out, "Topic {}: {}", topic_id, summary.name)?;
        writeln!(out, "Description: {}", summary.description)?;
        writeln!(out, "{}", "-".repeat(RULE_WIDTH))?;
    }
    Ok(())
}

pub fn write_topic_counts(out: &mut dyn Write, enriched: &EnrichedDataset) -> std::io::Result<()> {
    writeln!(out, "{:<40} POSTS", "TOPIC")?;
    for (name, count) in enriched.topic_counts() {
        writeln!(out, "{:<40} {}", name, count)?;
    }
    Ok(())
}

pub fn write_samples_by_topic(
    out: &mut dyn Write,
    enriched: &EnrichedDataset,
) -> std::io::Result<()> {
    writeln!(out, "Sample Posts by Topic:")?;
    for record in enriched.first_per_topic() {
        writeln!(out, "{}: {}", record.topic_name, record.record.title)?;
    }
    Ok(())
}

/// One line per record: id, comment count, title.
pub fn write_dataset(out: &mut dyn Write, dataset: &Dataset) -> std::io::Result<()> {
    writeln!(out, "{:<10} {:>8}  TITLE", "ID", "COMMENTS")?;
    for record in dataset {
        writeln!(
            out,
            "{:<10} {:>8}  {}",
            record.id,
            record.comments.len(),
            record.title
        )?;
    }
    Ok(())
}

#[derive(Serialize)]
struct AnalysisExport<'a> {
    subreddit: &'a str,
    sort: &'a str,
    model: &'a str,
    generated_at: DateTime<Utc>,
    summaries: Vec<&'a TopicSummary>,
    records: &'a EnrichedDataset,
}

/// Metadata stored alongside an exported run.
pub struct ExportMeta<'a> {
    pub subreddit: &'a str,
    pub sort: &'a str,
    pub model: &'a str,
}

/// Export an enriched run as pretty JSON to `path`, creating parent
/// directories as needed.
pub fn export_json(
    meta: &ExportMeta<'_>,
    enriched: &EnrichedDataset,
    summaries: &BTreeMap<i64, TopicSummary>,
    path: &Path,
) -> Result<()> {
    let data = AnalysisExport {
        subreddit: meta.subreddit,
        sort: meta.sort,
        model: meta.model,
        generated_at: Utc::now(),
        summaries: summaries.values().collect(),
        records: enriched,
    };
    let json = serde_json::to_string_pretty(&data)?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }
    std::fs::write(path, &json).with_context(|| format!("Failed to write {}", path.display()))?;
    tracing::info!(
        records = enriched.len(),
        topics = summaries.len(),
        path = %path.display(),
        "exported analysis"
    );
    Ok(())
}
