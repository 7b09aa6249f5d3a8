//! The seam between the ingestion pipeline and a forum API.
//!
//! A [`ContentSource`] serves two kinds of read: a lazily paged listing of
//! items, and the top-level comments of one item. The built-in
//! implementation is [`RedditConnector`](crate::connector_reddit::RedditConnector);
//! tests substitute in-memory sources.
//!
//! # Example
//!
//! ```rust
//! use subtopic::connector::{ContentSource, ItemStream};
//! use subtopic::error::Result;
//! use subtopic::models::{CommentNode, RawItem};
//! use subtopic::sort::ListingQuery;
//!
//! struct Empty;
//!
//! impl ContentSource for Empty {
//!     fn name(&self) -> &str { "empty" }
//!
//!     fn listing(&self, _source: &str, _query: &ListingQuery) -> Result<ItemStream<'_>> {
//!         Ok(Box::new(std::iter::empty()))
//!     }
//!
//!     fn comments(&self, _item: &RawItem, _limit: usize) -> Result<Vec<CommentNode>> {
//!         Ok(vec![])
//!     }
//! }
//! ```

use crate::error::Result;
use crate::models::{CommentNode, RawItem};
use crate::sort::ListingQuery;

/// Items of a listing, yielded one at a time. A page is only requested
/// when the consumer pulls past the previous one.
pub type ItemStream<'a> = Box<dyn Iterator<Item = Result<RawItem>> + 'a>;

pub trait ContentSource {
    /// Short identifier used in logs and progress output.
    fn name(&self) -> &str;

    /// Open a listing of `source` (a subreddit name) with the resolved
    /// sort parameters. At most `query.limit` items are yielded.
    fn listing(&self, source: &str, query: &ListingQuery) -> Result<ItemStream<'_>>;

    /// Resolve the top-level comments of `item` in source order, asking
    /// for at most `limit`. Continuation markers are returned as
    /// [`CommentNode::More`] and never expanded.
    fn comments(&self, item: &RawItem, limit: usize) -> Result<Vec<CommentNode>>;
}
