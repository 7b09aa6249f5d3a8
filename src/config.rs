use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::sort::SortMode;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub labeling: LabelingConfig,
    #[serde(default)]
    pub topics: TopicsConfig,
    #[serde(default)]
    pub preprocess: PreprocessConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourceConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_token_url")]
    pub token_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_source_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            token_url: default_token_url(),
            user_agent: default_user_agent(),
            timeout_secs: default_source_timeout(),
            page_size: default_page_size(),
        }
    }
}

fn default_base_url() -> String {
    "https://oauth.reddit.com".to_string()
}
fn default_token_url() -> String {
    "https://www.reddit.com/api/v1/access_token".to_string()
}
fn default_user_agent() -> String {
    "SubTopicClustering:V1.0".to_string()
}
fn default_source_timeout() -> u64 {
    30
}
fn default_page_size() -> usize {
    100
}

#[derive(Debug, Deserialize, Clone)]
pub struct FetchConfig {
    #[serde(default = "default_sort")]
    pub default_sort: String,
    #[serde(default = "default_limit")]
    pub default_limit: usize,
    #[serde(default = "default_comment_cap")]
    pub comment_cap: usize,
    #[serde(default = "default_comment_fetch_limit")]
    pub comment_fetch_limit: usize,
    #[serde(default = "default_overfetch")]
    pub overfetch_multiplier: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            default_sort: default_sort(),
            default_limit: default_limit(),
            comment_cap: default_comment_cap(),
            comment_fetch_limit: default_comment_fetch_limit(),
            overfetch_multiplier: default_overfetch(),
        }
    }
}

fn default_sort() -> String {
    "month".to_string()
}
fn default_limit() -> usize {
    100
}
fn default_comment_cap() -> usize {
    10
}
fn default_comment_fetch_limit() -> usize {
    15
}
fn default_overfetch() -> usize {
    2
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    #[serde(default = "default_llm_url")]
    pub url: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub max_retries: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            url: default_llm_url(),
            model: default_llm_model(),
            timeout_secs: default_llm_timeout(),
            max_retries: 0,
        }
    }
}

fn default_llm_url() -> String {
    "http://localhost:11434".to_string()
}
fn default_llm_model() -> String {
    "llama3.2:latest".to_string()
}
fn default_llm_timeout() -> u64 {
    120
}

#[derive(Debug, Deserialize, Clone)]
pub struct LabelingConfig {
    #[serde(default = "default_max_examples")]
    pub max_examples: usize,
}

impl Default for LabelingConfig {
    fn default() -> Self {
        Self {
            max_examples: default_max_examples(),
        }
    }
}

fn default_max_examples() -> usize {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct TopicsConfig {
    #[serde(default = "default_nr_topics")]
    pub nr_topics: usize,
    #[serde(default = "default_min_topic_size")]
    pub min_topic_size: usize,
    #[serde(default = "default_top_n_words")]
    pub top_n_words: usize,
}

impl Default for TopicsConfig {
    fn default() -> Self {
        Self {
            nr_topics: default_nr_topics(),
            min_topic_size: default_min_topic_size(),
            top_n_words: default_top_n_words(),
        }
    }
}

fn default_nr_topics() -> usize {
    10
}
fn default_min_topic_size() -> usize {
    8
}
fn default_top_n_words() -> usize {
    6
}

#[derive(Debug, Deserialize, Clone)]
pub struct PreprocessConfig {
    #[serde(default = "default_extra_stopwords")]
    pub extra_stopwords: Vec<String>,
    #[serde(default = "default_min_token_len")]
    pub min_token_len: usize,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            extra_stopwords: default_extra_stopwords(),
            min_token_len: default_min_token_len(),
        }
    }
}

fn default_extra_stopwords() -> Vec<String> {
    ["reddit", "subreddit", "mod", "op", "http", "https"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
fn default_min_token_len() -> usize {
    3
}

impl Config {
    /// Built-in defaults, used when no config file is present.
    pub fn minimal() -> Self {
        Self::default()
    }

    pub fn default_sort(&self) -> SortMode {
        self.fetch.default_sort.parse().unwrap_or(SortMode::TopMonth)
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

/// Load `path` if it exists, otherwise fall back to [`Config::minimal`].
pub fn load_or_default(path: &Path) -> Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        tracing::debug!(path = %path.display(), "config file not found, using defaults");
        Ok(Config::minimal())
    }
}

fn validate(config: &Config) -> Result<()> {
    // Validate fetch
    if config.fetch.comment_cap == 0 {
        anyhow::bail!("fetch.comment_cap must be > 0");
    }
    if config.fetch.overfetch_multiplier < 1 {
        anyhow::bail!("fetch.overfetch_multiplier must be >= 1");
    }
    if config.fetch.default_limit == 0 {
        anyhow::bail!("fetch.default_limit must be > 0");
    }
    config
        .fetch
        .default_sort
        .parse::<SortMode>()
        .map_err(|e| anyhow::anyhow!("fetch.default_sort: {}", e))?;

    // Validate source
    if !(1..=100).contains(&config.source.page_size) {
        anyhow::bail!("source.page_size must be in [1, 100]");
    }

    // Validate labeling and topics
    if config.labeling.max_examples == 0 {
        anyhow::bail!("labeling.max_examples must be > 0");
    }
    if config.topics.top_n_words == 0 {
        anyhow::bail!("topics.top_n_words must be > 0");
    }
    if config.llm.model.trim().is_empty() {
        anyhow::bail!("llm.model must not be empty");
    }

    Ok(())
}
