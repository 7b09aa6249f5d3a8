//! Topic model seam.
//!
//! The pipeline only needs one thing from a topic model: given N
//! documents, return N topic ids plus a ranked term list per topic. Any
//! clustering engine can sit behind [`TopicModel`]. [`KeywordTopicModel`]
//! is the built-in default and needs no model downloads.

use std::collections::{BTreeMap, HashMap, HashSet};

use anyhow::Result;

use crate::config::TopicsConfig;
use crate::models::OUTLIER_TOPIC;

/// Output of [`TopicModel::fit_transform`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TopicAssignments {
    /// One topic id per input document, in input order.
    pub topics: Vec<i64>,
    /// Ranked `(term, weight)` pairs per non-outlier topic.
    pub terms: BTreeMap<i64, Vec<(String, f32)>>,
}

impl TopicAssignments {
    /// Term names of `topic`, best first.
    pub fn term_names(&self, topic: i64) -> Vec<String> {
        self.terms
            .get(&topic)
            .map(|terms| terms.iter().map(|(t, _)| t.clone()).collect())
            .unwrap_or_default()
    }

    /// Term names for every topic.
    pub fn term_lists(&self) -> BTreeMap<i64, Vec<String>> {
        self.terms
            .keys()
            .map(|&topic| (topic, self.term_names(topic)))
            .collect()
    }
}

pub trait TopicModel {
    fn fit_transform(&self, docs: &[String]) -> Result<TopicAssignments>;
}

/// Groups documents by their dominant high-frequency term.
///
/// Up to `nr_topics` anchor terms are chosen by document frequency (a term
/// must occur in at least two documents). Each document joins the anchor
/// it mentions most often; documents without an anchor, and clusters
/// smaller than `min_topic_size`, become outliers. Surviving topics are
/// numbered from 0 by descending size.
#[derive(Debug, Clone)]
pub struct KeywordTopicModel {
    pub nr_topics: usize,
    pub min_topic_size: usize,
    pub top_n_words: usize,
}

impl From<&TopicsConfig> for KeywordTopicModel {
    fn from(config: &TopicsConfig) -> Self {
        Self {
            nr_topics: config.nr_topics,
            min_topic_size: config.min_topic_size,
            top_n_words: config.top_n_words,
        }
    }
}

impl TopicModel for KeywordTopicModel {
    fn fit_transform(&self, docs: &[String]) -> Result<TopicAssignments> {
        let tokenized: Vec<Vec<&str>> = docs.iter().map(|d| d.split_whitespace().collect()).collect();

        let mut doc_freq: HashMap<&str, usize> = HashMap::new();
        for tokens in &tokenized {
            let unique: HashSet<&str> = tokens.iter().copied().collect();
            for term in unique {
                *doc_freq.entry(term).or_default() += 1;
            }
        }

        let mut candidates: Vec<(&str, usize)> =
            doc_freq.iter().filter(|(_, df)| **df >= 2).map(|(&t, &df)| (t, df)).collect();
        candidates.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        let anchors: Vec<&str> = candidates
            .into_iter()
            .take(self.nr_topics)
            .map(|(t, _)| t)
            .collect();

        // Provisional cluster = anchor index.
        let provisional: Vec<Option<usize>> = tokenized
            .iter()
            .map(|tokens| {
                let mut best: Option<(usize, usize)> = None;
                for (idx, anchor) in anchors.iter().enumerate() {
                    let tf = tokens.iter().filter(|t| *t == anchor).count();
                    if tf > 0 && best.map_or(true, |(_, b)| tf > b) {
                        best = Some((idx, tf));
                    }
                }
                best.map(|(idx, _)| idx)
            })
            .collect();

        let mut sizes: Vec<usize> = vec![0; anchors.len()];
        for idx in provisional.iter().flatten() {
            sizes[*idx] += 1;
        }

        let mut surviving: Vec<usize> = (0..anchors.len())
            .filter(|&idx| sizes[idx] > 0 && sizes[idx] >= self.min_topic_size)
            .collect();
        surviving.sort_by(|&a, &b| sizes[b].cmp(&sizes[a]).then_with(|| a.cmp(&b)));
        let renumber: HashMap<usize, i64> = surviving
            .iter()
            .enumerate()
            .map(|(new_id, &anchor_idx)| (anchor_idx, new_id as i64))
            .collect();

        let topics: Vec<i64> = provisional
            .iter()
            .map(|p| {
                p.and_then(|idx| renumber.get(&idx).copied())
                    .unwrap_or(OUTLIER_TOPIC)
            })
            .collect();

        let mut terms = BTreeMap::new();
        for &topic in renumber.values() {
            let mut counts: HashMap<&str, usize> = HashMap::new();
            let mut total = 0usize;
            for (tokens, _) in tokenized.iter().zip(&topics).filter(|(_, t)| **t == topic) {
                for &term in tokens {
                    *counts.entry(term).or_default() += 1;
                    total += 1;
                }
            }
            let mut ranked: Vec<(&str, usize)> = counts.into_iter().collect();
            ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
            let list = ranked
                .into_iter()
                .take(self.top_n_words)
                .map(|(t, c)| (t.to_string(), c as f32 / total.max(1) as f32))
                .collect();
            terms.insert(topic, list);
        }

        tracing::info!(
            documents = docs.len(),
            topics = terms.len(),
            outliers = topics.iter().filter(|&&t| t == OUTLIER_TOPIC).count(),
            "topic model fitted"
        );

        Ok(TopicAssignments { topics, terms })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(min_topic_size: usize) -> KeywordTopicModel {
        KeywordTopicModel {
            nr_topics: 10,
            min_topic_size,
            top_n_words: 3,
        }
    }

    fn docs(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn groups_documents_by_shared_anchor() {
        let docs = docs(&[
            "budget deal holiday",
            "budget discount sale",
            "budget coupon",
            "movie trailer",
            "movie review",
        ]);
        let out = model(2).fit_transform(&docs).unwrap();
        assert_eq!(out.topics.len(), 5);
        assert_eq!(&out.topics[..3], &[0, 0, 0]);
        assert_eq!(&out.topics[3..], &[1, 1]);
        assert_eq!(out.term_names(0)[0], "budget");
        assert_eq!(out.term_names(1)[0], "movie");
    }

    #[test]
    fn small_clusters_become_outliers() {
        let docs = docs(&["alpha beta", "alpha gamma", "alpha delta", "zeta eta", "zeta theta"]);
        let out = model(3).fit_transform(&docs).unwrap();
        assert_eq!(out.topics, vec![0, 0, 0, OUTLIER_TOPIC, OUTLIER_TOPIC]);
        assert!(!out.terms.contains_key(&OUTLIER_TOPIC));
        assert_eq!(out.terms.len(), 1);
    }

    #[test]
    fn unique_documents_are_outliers() {
        let docs = docs(&["one", "two", ""]);
        let out = model(1).fit_transform(&docs).unwrap();
        assert!(out.topics.iter().all(|&t| t == OUTLIER_TOPIC));
        assert!(out.terms.is_empty());
    }

    #[test]
    fn term_lists_are_bounded() {
        let docs = docs(&["game one two three four", "game five six seven eight"]);
        let out = model(1).fit_transform(&docs).unwrap();
        assert!(out.term_lists().values().all(|terms| terms.len() <= 3));
    }
}
