//! Corpus construction and text cleanup ahead of topic modeling.
//!
//! [`create_corpus`] flattens a record into one string; a
//! [`TextPreprocessor`] then normalizes it into space-separated tokens. The
//! preprocessor owns its stopword set and is built once per run, so tests
//! can substitute their own vocabulary.

use std::collections::HashSet;

use anyhow::Result;
use regex::Regex;

use crate::config::PreprocessConfig;
use crate::models::NormalizedRecord;

/// English stopwords.
pub const ENGLISH_STOPWORDS: &[&str] = &[
    "i", "me", "my", "myself", "we", "our", "ours", "ourselves", "you", "your", "yours",
    "yourself", "yourselves", "he", "him", "his", "himself", "she", "her", "hers", "herself",
    "it", "its", "itself", "they", "them", "their", "theirs", "themselves", "what", "which",
    "who", "whom", "this", "that", "these", "those", "am", "is", "are", "was", "were", "be",
    "been", "being", "have", "has", "had", "having", "do", "does", "did", "doing", "a", "an",
    "the", "and", "but", "if", "or", "because", "as", "until", "while", "of", "at", "by",
    "for", "with", "about", "against", "between", "into", "through", "during", "before",
    "after", "above", "below", "to", "from", "up", "down", "in", "out", "on", "off", "over",
    "under", "again", "further", "then", "once", "here", "there", "when", "where", "why",
    "how", "all", "any", "both", "each", "few", "more", "most", "other", "some", "such", "no",
    "nor", "not", "only", "own", "same", "so", "than", "too", "very", "can", "will", "just",
    "don", "should", "now", "would", "could", "also", "get", "got", "like", "one", "really",
];

const CONTRACTIONS: &[(&str, &str)] = &[
    ("won't", "will not"),
    ("can't", "cannot"),
    ("shan't", "shall not"),
    ("ain't", "is not"),
    ("let's", "let us"),
    ("y'all", "you all"),
];

const IRREGULAR_PLURALS: &[(&str, &str)] = &[
    ("men", "man"),
    ("women", "woman"),
    ("children", "child"),
    ("feet", "foot"),
    ("teeth", "tooth"),
    ("mice", "mouse"),
    ("geese", "goose"),
];

/// Longest emoji sequence (ZWJ families, flags with tags) in code points.
const MAX_EMOJI_CHARS: usize = 10;

/// Combine title, post text and comments into one document.
pub fn create_corpus(record: &NormalizedRecord) -> String {
    std::iter::once(record.title.as_str())
        .chain(std::iter::once(record.post_text.as_str()))
        .chain(record.comments.iter().map(String::as_str))
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

pub struct TextPreprocessor {
    stopwords: HashSet<String>,
    min_token_len: usize,
    emphasis: Regex,
    link: Regex,
    contraction_suffix: Regex,
    non_word: Regex,
}

impl TextPreprocessor {
    pub fn new(config: &PreprocessConfig) -> Result<Self> {
        let stopwords = ENGLISH_STOPWORDS
            .iter()
            .map(|s| s.to_string())
            .chain(config.extra_stopwords.iter().map(|s| s.to_lowercase()))
            .collect();
        Self::with_stopwords(stopwords, config.min_token_len)
    }

    /// Build with an explicit stopword vocabulary.
    pub fn with_stopwords(stopwords: HashSet<String>, min_token_len: usize) -> Result<Self> {
        Ok(Self {
            stopwords,
            min_token_len,
            emphasis: Regex::new(r"\*{1,3}|_{1,3}|~{2}")?,
            link: Regex::new(r"\[(.*?)\]\(.*?\)")?,
            contraction_suffix: Regex::new(r"(?i)\b(\w+)(n't|'re|'ll|'ve|'m|'d|'s)\b")?,
            non_word: Regex::new(r"\W")?,
        })
    }

    /// Full cleanup: markdown, emoji, contractions, case, punctuation,
    /// stopwords, short tokens, and plural reduction.
    pub fn preprocess(&self, text: &str) -> String {
        let text = self.clean_markdown(text);
        let text = demojize(&text);
        let text = self.expand_contractions(&text);
        let lowered = text.to_lowercase();
        let spaced = self.non_word.replace_all(&lowered, " ");
        spaced
            .split_whitespace()
            .filter(|w| w.chars().count() >= self.min_token_len && !self.stopwords.contains(*w))
            .map(lemmatize)
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn clean_markdown(&self, text: &str) -> String {
        let text = self.emphasis.replace_all(text, "");
        self.link.replace_all(&text, "$1").into_owned()
    }

    pub fn expand_contractions(&self, text: &str) -> String {
        let mut text = text.replace('\u{2019}', "'");
        for (short, long) in CONTRACTIONS {
            text = replace_ignore_case(&text, short, long);
        }
        self.contraction_suffix
            .replace_all(&text, |caps: &regex::Captures| {
                let stem = &caps[1];
                let expansion = match caps[2].to_lowercase().as_str() {
                    "n't" => "not",
                    "'re" => "are",
                    "'ll" => "will",
                    "'ve" => "have",
                    "'m" => "am",
                    "'d" => "would",
                    _ => "is",
                };
                format!("{} {}", stem, expansion)
            })
            .into_owned()
    }
}

/// Replace each emoji with its name, underscore-joined and padded with
/// spaces, so it survives as a token: `"I love 🍕"` becomes
/// `"I love  pizza "`.
pub fn demojize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(c) = rest.chars().next() {
        let matched = if c.is_ascii() { None } else { longest_emoji(rest) };
        match matched {
            Some((emoji, len)) => {
                out.push(' ');
                out.push_str(&emoji.name().replace(' ', "_"));
                out.push(' ');
                rest = &rest[len..];
            }
            None => {
                out.push(c);
                rest = &rest[c.len_utf8()..];
            }
        }
    }
    out
}

/// Longest emoji sequence at the start of `text`, with its byte length.
fn longest_emoji(text: &str) -> Option<(&'static emojis::Emoji, usize)> {
    let ends: Vec<usize> = text
        .char_indices()
        .skip(1)
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .take(MAX_EMOJI_CHARS)
        .collect();
    ends.into_iter()
        .rev()
        .find_map(|end| emojis::get(&text[..end]).map(|emoji| (emoji, end)))
}

fn replace_ignore_case(text: &str, needle: &str, replacement: &str) -> String {
    let lower = text.to_lowercase();
    if !lower.contains(needle) || lower.len() != text.len() {
        return text.replace(needle, replacement);
    }
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for (idx, _) in lower.match_indices(needle) {
        out.push_str(&text[last..idx]);
        out.push_str(replacement);
        last = idx + needle.len();
    }
    out.push_str(&text[last..]);
    out
}

/// Reduce a lower-case noun to its singular form.
pub fn lemmatize(word: &str) -> String {
    if let Some((_, singular)) = IRREGULAR_PLURALS.iter().find(|(p, _)| *p == word) {
        return singular.to_string();
    }
    let len = word.len();
    if len > 4 && word.ends_with("ies") {
        return format!("{}y", &word[..len - 3]);
    }
    if word.ends_with("sses")
        || word.ends_with("xes")
        || word.ends_with("ches")
        || word.ends_with("shes")
    {
        return word[..len - 2].to_string();
    }
    if len > 3
        && word.ends_with('s')
        && !word.ends_with("ss")
        && !word.ends_with("us")
        && !word.ends_with("is")
    {
        return word[..len - 1].to_string();
    }
    word.to_string()
}
