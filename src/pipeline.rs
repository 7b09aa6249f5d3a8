//! Analysis run orchestration.
//!
//! Coordinates the full flow: request validation → fetch → corpus
//! preprocessing → topic model → labeling → enrichment → reports. The
//! network-free half ([`analyze`]) is separate from the command entry
//! points so it can be driven with stub models and chat clients.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

use crate::chat::{ChatClient, OllamaChat, REFERENCE_MODELS};
use crate::config::Config;
use crate::connector_reddit::{RedditConnector, RedditCredentials};
use crate::enrich::{enrich, sample_documents, EnrichedDataset};
use crate::fetch::{fetch_with_progress, FetchOptions};
use crate::label::{label_with_progress, LabelOptions};
use crate::models::{Dataset, FetchRequest, TopicSummary};
use crate::preprocess::{create_corpus, TextPreprocessor};
use crate::progress::{ProgressEvent, ProgressReporter};
use crate::report;
use crate::sort::SortMode;
use crate::topic_model::{KeywordTopicModel, TopicAssignments, TopicModel};

/// Everything produced by one analysis run.
#[derive(Debug, Clone)]
pub struct AnalysisRun {
    pub dataset: Dataset,
    pub assignments: TopicAssignments,
    pub summaries: BTreeMap<i64, TopicSummary>,
    pub enriched: EnrichedDataset,
}

/// Cluster and label an already fetched dataset.
pub fn analyze(
    dataset: Dataset,
    preprocessor: &TextPreprocessor,
    model: &dyn TopicModel,
    chat: &dyn ChatClient,
    opts: &LabelOptions,
    progress: &dyn ProgressReporter,
) -> Result<AnalysisRun> {
    progress.report(ProgressEvent::Stage {
        name: "preprocessing".to_string(),
    });
    let texts: Vec<String> = dataset
        .iter()
        .map(|record| preprocessor.preprocess(&create_corpus(record)))
        .collect();

    progress.report(ProgressEvent::Stage {
        name: "clustering".to_string(),
    });
    let assignments = model.fit_transform(&texts).context("topic model failed")?;
    if assignments.topics.len() != texts.len() {
        anyhow::bail!(
            "topic model returned {} assignments for {} documents",
            assignments.topics.len(),
            texts.len()
        );
    }

    progress.report(ProgressEvent::Stage {
        name: "labeling".to_string(),
    });
    let samples = sample_documents(&texts, &assignments.topics);
    let summaries = label_with_progress(
        &assignments.term_lists(),
        &samples,
        chat,
        opts,
        progress,
    )?;

    let enriched = enrich(&dataset, &texts, &assignments.topics, &summaries)?;

    Ok(AnalysisRun {
        dataset,
        assignments,
        summaries,
        enriched,
    })
}

/// Validate the user's input into a [`FetchRequest`], applying config
/// defaults for anything not given.
pub fn build_request(
    config: &Config,
    subreddit: &str,
    sort: Option<&str>,
    limit: Option<usize>,
) -> Result<FetchRequest> {
    let sort = match sort {
        Some(s) => s.parse::<SortMode>()?,
        None => config.default_sort(),
    };
    let limit = limit.unwrap_or(config.fetch.default_limit);
    Ok(FetchRequest::with_sort(subreddit, sort, limit)?)
}

/// Open an authenticated Reddit session from environment credentials.
pub fn connect(config: &Config) -> Result<RedditConnector> {
    let creds = RedditCredentials::from_env()?;
    Ok(RedditConnector::connect(&config.source, &creds)?)
}

/// `subtopic fetch`: ingestion only.
pub fn run_fetch(
    config: &Config,
    subreddit: &str,
    sort: Option<&str>,
    limit: Option<usize>,
    json: bool,
    progress: &dyn ProgressReporter,
) -> Result<()> {
    let request = build_request(config, subreddit, sort, limit)?;
    let connector = connect(config)?;
    let dataset = fetch_with_progress(
        &connector,
        &request,
        &FetchOptions::from(&config.fetch),
        progress,
    )?;

    if json {
        println!("{}", serde_json::to_string_pretty(&dataset)?);
    } else {
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        report::write_dataset(&mut out, &dataset)?;
        writeln!(
            out,
            "fetched {} of {} requested posts from r/{} ({})",
            dataset.len(),
            request.limit,
            request.source,
            request.sort
        )?;
    }
    Ok(())
}

/// `subtopic analyze`: the full run.
pub fn run_analyze(
    config: &Config,
    subreddit: &str,
    sort: Option<&str>,
    limit: Option<usize>,
    model: Option<&str>,
    output: Option<&Path>,
    progress: &dyn ProgressReporter,
) -> Result<()> {
    let request = build_request(config, subreddit, sort, limit)?;
    let preprocessor = TextPreprocessor::new(&config.preprocess)?;
    let topic_model = KeywordTopicModel::from(&config.topics);
    let chat = match model {
        Some(m) => OllamaChat::with_model(&config.llm, m)?,
        None => OllamaChat::new(&config.llm)?,
    };

    let connector = connect(config)?;
    let dataset = fetch_with_progress(
        &connector,
        &request,
        &FetchOptions::from(&config.fetch),
        progress,
    )?;
    tracing::info!(posts = dataset.len(), subreddit = %request.source, "fetched posts");

    let run = analyze(
        dataset,
        &preprocessor,
        &topic_model,
        &chat,
        &LabelOptions {
            max_examples: config.labeling.max_examples,
        },
        progress,
    )?;

    if let Some(path) = output {
        let meta = report::ExportMeta {
            subreddit: &request.source,
            sort: request.sort.as_str(),
            model: chat.model_name(),
        };
        report::export_json(&meta, &run.enriched, &run.summaries, path)?;
    }

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    writeln!(
        out,
        "analyzed {} posts from r/{} ({})\n",
        run.dataset.len(),
        request.source,
        request.sort
    )?;
    report::write_topic_summaries(&mut out, &run.summaries)?;
    writeln!(out)?;
    report::write_topic_counts(&mut out, &run.enriched)?;
    writeln!(out)?;
    report::write_samples_by_topic(&mut out, &run.enriched)?;
    Ok(())
}

/// `subtopic check`: verify credentials by opening a session.
pub fn run_check(config: &Config) -> Result<()> {
    connect(config).context("Reddit authentication failed")?;
    println!("{:<16} OK", "reddit");
    println!("{:<16} {}", "llm", config.llm.url);
    println!("{:<16} {}", "model", config.llm.model);
    println!("{:<16} {}", "known models", REFERENCE_MODELS.join(", "));
    Ok(())
}
