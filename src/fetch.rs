//! Paginated fetch, item filtering, and dataset assembly.
//!
//! ```text
//! FetchRequest ─▶ SortMode::resolve ─▶ ContentSource::listing (× overfetch)
//!                                            │  one item at a time
//!                                            ▼
//!                              skip pinned ─▶ resolve comments ─▶ normalize
//!                                            │
//!                                            ▼
//!                              Dataset (stop at requested count)
//! ```
//!
//! A failure resolving one item's comments degrades that item to an empty
//! comment list; listing and authentication failures abort the fetch.

use crate::config::FetchConfig;
use crate::connector::ContentSource;
use crate::error::{IngestError, Result};
use crate::models::{CommentNode, Dataset, FetchRequest, NormalizedRecord, RawItem};
use crate::progress::{NoProgress, ProgressEvent, ProgressReporter};

/// Tunables for a fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOptions {
    /// Maximum comments kept per record.
    pub comment_cap: usize,
    /// Comments requested per item before filtering.
    pub comment_fetch_limit: usize,
    /// Listing limit as a multiple of the requested count.
    pub overfetch_multiplier: usize,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            comment_cap: 10,
            comment_fetch_limit: 15,
            overfetch_multiplier: 2,
        }
    }
}

impl From<&FetchConfig> for FetchOptions {
    fn from(config: &FetchConfig) -> Self {
        Self {
            comment_cap: config.comment_cap,
            comment_fetch_limit: config.comment_fetch_limit.max(config.comment_cap),
            overfetch_multiplier: config.overfetch_multiplier,
        }
    }
}

/// Fetch up to `request.limit` eligible records from `source`.
pub fn fetch<S>(source: &S, request: &FetchRequest, opts: &FetchOptions) -> Result<Dataset>
where
    S: ContentSource + ?Sized,
{
    fetch_with_progress(source, request, opts, &NoProgress)
}

/// Like [`fetch`], reporting accumulated record counts to `progress`.
///
/// The returned dataset holds `min(request.limit, eligible items in the
/// listing)` records in listing order. A short result is not an error.
pub fn fetch_with_progress<S>(
    source: &S,
    request: &FetchRequest,
    opts: &FetchOptions,
    progress: &dyn ProgressReporter,
) -> Result<Dataset>
where
    S: ContentSource + ?Sized,
{
    if request.limit == 0 {
        return Err(IngestError::Validation(
            "requested item count must be > 0".to_string(),
        ));
    }

    let query = request.sort.resolve(request.limit, opts.overfetch_multiplier);
    tracing::info!(
        connector = source.name(),
        subreddit = %request.source,
        sort = %request.sort,
        requested = request.limit,
        listing_limit = query.limit,
        "fetching listing"
    );

    let mut records: Vec<NormalizedRecord> = Vec::with_capacity(request.limit);
    let mut skipped_pinned = 0usize;
    let mut degraded = 0usize;

    for item in source.listing(&request.source, &query)? {
        let item = item?;
        if item.pinned {
            skipped_pinned += 1;
            tracing::debug!(id = %item.id, "skipping pinned item");
            continue;
        }

        let comments = match source.comments(&item, opts.comment_fetch_limit) {
            Ok(nodes) => select_comments(nodes, opts.comment_cap),
            Err(e) if e.is_transient() => {
                degraded += 1;
                tracing::warn!(id = %item.id, error = %e, "comment resolution failed, keeping item without comments");
                Vec::new()
            }
            Err(e) => return Err(e),
        };

        records.push(normalize(item, comments));
        progress.report(ProgressEvent::Fetching {
            source: request.source.clone(),
            n: records.len() as u64,
            target: request.limit as u64,
        });

        if records.len() >= request.limit {
            break;
        }
    }

    if records.len() < request.limit {
        tracing::info!(
            fetched = records.len(),
            requested = request.limit,
            "listing exhausted before requested count"
        );
    }
    tracing::info!(
        fetched = records.len(),
        skipped_pinned,
        degraded,
        "fetch complete"
    );

    Ok(Dataset::new(records))
}

/// Keep the first `cap` non-pinned comments in source order, dropping
/// continuation markers.
pub fn select_comments(nodes: Vec<CommentNode>, cap: usize) -> Vec<String> {
    nodes
        .into_iter()
        .filter_map(|node| match node {
            CommentNode::Comment(c) if !c.pinned => Some(c.body),
            _ => None,
        })
        .take(cap)
        .collect()
}

/// Map a raw item onto the fixed record schema. Missing post text becomes
/// an empty string.
pub fn normalize(item: RawItem, comments: Vec<String>) -> NormalizedRecord {
    NormalizedRecord {
        title: item.title,
        post_text: item.body.unwrap_or_default(),
        id: item.id,
        comments,
    }
}
