//! Topic labeling.
//!
//! For each non-outlier topic a bounded prompt (ranked terms plus at most
//! `max_examples` sample documents) is sent to the chat model once. The
//! reply is expected to carry a `Name:` line and a `Description:` line;
//! when either is missing the topic gets a synthetic label instead, so
//! every requested topic id always receives a [`TopicSummary`].

use std::collections::{BTreeMap, HashSet};

use anyhow::{Context, Result};

use crate::chat::ChatClient;
use crate::models::{TopicSummary, OUTLIER_TOPIC};
use crate::progress::{NoProgress, ProgressEvent, ProgressReporter};

const NAME_PREFIX: &str = "Name:";
const DESCRIPTION_PREFIX: &str = "Description:";

/// Sample documents per topic, in the order topics first appear.
pub type TopicSamples = Vec<(i64, Vec<String>)>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelOptions {
    pub max_examples: usize,
}

impl Default for LabelOptions {
    fn default() -> Self {
        Self { max_examples: 5 }
    }
}

/// Label every non-outlier topic present in `terms` or `samples`.
///
/// Topics are labeled in `samples` order, followed by any topic that only
/// has a term list. Malformed replies fall back to a synthetic label; only
/// a failed chat call is an error.
pub fn label(
    terms: &BTreeMap<i64, Vec<String>>,
    samples: &[(i64, Vec<String>)],
    chat: &dyn ChatClient,
    opts: &LabelOptions,
) -> Result<BTreeMap<i64, TopicSummary>> {
    label_with_progress(terms, samples, chat, opts, &NoProgress)
}

pub fn label_with_progress(
    terms: &BTreeMap<i64, Vec<String>>,
    samples: &[(i64, Vec<String>)],
    chat: &dyn ChatClient,
    opts: &LabelOptions,
    progress: &dyn ProgressReporter,
) -> Result<BTreeMap<i64, TopicSummary>> {
    let order = topic_order(terms, samples);
    let total = order.len() as u64;
    let no_docs: Vec<String> = Vec::new();
    let no_terms: Vec<String> = Vec::new();

    let mut summaries = BTreeMap::new();
    for (n, topic_id) in order.into_iter().enumerate() {
        let topic_terms = terms.get(&topic_id).unwrap_or(&no_terms);
        let docs = samples
            .iter()
            .find(|(id, _)| *id == topic_id)
            .map(|(_, docs)| docs)
            .unwrap_or(&no_docs);

        let prompt = build_prompt(topic_terms, docs, opts.max_examples);
        tracing::debug!(topic_id, model = chat.model_name(), prompt_len = prompt.len(), "labeling topic");
        let reply = chat
            .chat(&prompt)
            .with_context(|| format!("chat call failed for topic {}", topic_id))?;

        let summary = summarize(topic_id, &reply);
        summaries.insert(topic_id, summary);
        progress.report(ProgressEvent::Labeling {
            n: n as u64 + 1,
            total,
        });
    }

    Ok(summaries)
}

fn topic_order(terms: &BTreeMap<i64, Vec<String>>, samples: &[(i64, Vec<String>)]) -> Vec<i64> {
    let mut seen = HashSet::new();
    samples
        .iter()
        .map(|(id, _)| *id)
        .chain(terms.keys().copied())
        .filter(|id| *id != OUTLIER_TOPIC && seen.insert(*id))
        .collect()
}

/// Build the prompt for one topic. At most `max_examples` documents are
/// included regardless of cluster size.
pub fn build_prompt(terms: &[String], docs: &[String], max_examples: usize) -> String {
    let terms_str = terms.join(", ");
    let examples: Vec<&str> = docs.iter().take(max_examples).map(String::as_str).collect();
    let docs_str = if examples.is_empty() {
        String::new()
    } else {
        format!("\n- {}", examples.join("\n- "))
    };

    format!(
        "I have a cluster of documents from a subreddit on a related topic.\n\
         \n\
         The key terms for this topic are: {terms_str}\n\
         \n\
         Here are some example documents in this cluster:\n\
         {docs_str}\n\
         \n\
         Based on these terms and examples, please provide:\n\
         1. A concise, descriptive name for this topic (max 5 words)\n\
         2. A brief one-sentence description of what this topic represents\n\
         \n\
         Format your response as:\n\
         {NAME_PREFIX} [topic name]\n\
         {DESCRIPTION_PREFIX} [brief description]\n"
    )
}

/// Find the first `Name:` and first `Description:` line of a reply.
///
/// Returns `None` unless both are present.
pub fn parse_reply(reply: &str) -> Option<(String, String)> {
    let mut name = None;
    let mut description = None;
    for line in reply.lines() {
        if name.is_none() {
            if let Some(rest) = line.strip_prefix(NAME_PREFIX) {
                name = Some(rest.trim().to_string());
                continue;
            }
        }
        if description.is_none() {
            if let Some(rest) = line.strip_prefix(DESCRIPTION_PREFIX) {
                description = Some(rest.trim().to_string());
            }
        }
    }
    name.zip(description)
}

/// Parse `reply` into a summary, falling back to `"Topic <id>"` and the
/// trimmed raw reply.
pub fn summarize(topic_id: i64, reply: &str) -> TopicSummary {
    match parse_reply(reply) {
        Some((name, description)) => TopicSummary {
            topic_id,
            name,
            description,
        },
        None => {
            tracing::warn!(topic_id, "reply missing Name/Description lines, using fallback label");
            TopicSummary {
                topic_id,
                name: format!("Topic {}", topic_id),
                description: reply.trim().to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn terms(ids: &[i64]) -> BTreeMap<i64, Vec<String>> {
        ids.iter()
            .map(|&id| (id, vec![format!("term{}", id), "shared".to_string()]))
            .collect()
    }

    #[test]
    fn parses_well_formed_reply() {
        let summary = summarize(
            3,
            "Name: Budget Deals\nDescription: Posts about holiday discounts",
        );
        assert_eq!(summary.name, "Budget Deals");
        assert_eq!(summary.description, "Posts about holiday discounts");
        assert_eq!(summary.topic_id, 3);
    }

    #[test]
    fn reply_with_preamble_still_parses() {
        let reply = "Sure! Here you go.\n\nName:   Space News  \nDescription: Launches and landers.\nName: Ignored";
        assert_eq!(
            parse_reply(reply),
            Some(("Space News".to_string(), "Launches and landers.".to_string()))
        );
    }

    #[test]
    fn falls_back_when_prefixes_missing() {
        let summary = summarize(7, "  I cannot summarize this.\n");
        assert_eq!(summary.name, "Topic 7");
        assert_eq!(summary.description, "I cannot summarize this.");
    }

    #[test]
    fn falls_back_when_only_name_present() {
        let summary = summarize(1, "Name: Half");
        assert_eq!(summary.name, "Topic 1");
        assert_eq!(summary.description, "Name: Half");
    }

    #[test]
    fn indented_prefix_does_not_count() {
        assert_eq!(parse_reply("  Name: X\n  Description: Y"), None);
    }

    #[test]
    fn prompt_is_bounded_to_max_examples() {
        let docs: Vec<String> = (0..20).map(|i| format!("doc{}", i)).collect();
        let prompt = build_prompt(&["a".into(), "b".into()], &docs, 5);
        assert!(prompt.contains("The key terms for this topic are: a, b"));
        assert!(prompt.contains("- doc4"));
        assert!(!prompt.contains("doc5"));
        assert!(prompt.contains("Name: [topic name]"));
    }

    #[test]
    fn every_topic_gets_a_summary_regardless_of_reply_shape() {
        let calls = RefCell::new(0);
        let chat = |_: &str| -> Result<String> {
            *calls.borrow_mut() += 1;
            Ok(if *calls.borrow() % 2 == 0 {
                "garbage".to_string()
            } else {
                "Name: Good\nDescription: Fine".to_string()
            })
        };
        let samples = vec![(2, vec!["x".to_string()]), (0, vec![]), (OUTLIER_TOPIC, vec![])];
        let out = label(&terms(&[0, 1, 2]), &samples, &chat, &LabelOptions::default()).unwrap();
        assert_eq!(out.keys().copied().collect::<Vec<_>>(), vec![0, 1, 2]);
        assert_eq!(*calls.borrow(), 3);
    }

    #[test]
    fn outlier_topic_is_never_labeled() {
        let chat = |_: &str| -> Result<String> { Ok("Name: A\nDescription: B".to_string()) };
        let out = label(&terms(&[OUTLIER_TOPIC, 4]), &[], &chat, &LabelOptions::default()).unwrap();
        assert!(!out.contains_key(&OUTLIER_TOPIC));
        assert!(out.contains_key(&4));
    }

    #[test]
    fn chat_failure_is_an_error() {
        let chat = |_: &str| -> Result<String> { anyhow::bail!("connection refused") };
        let err = label(&terms(&[0]), &[], &chat, &LabelOptions::default()).unwrap_err();
        assert!(err.to_string().contains("topic 0"));
    }
}
