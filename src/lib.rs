//! # subtopic
//!
//! Ingest posts and comments from a subreddit, cluster them into latent
//! topics, and label each topic with a name and description from an LLM.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────┐   ┌─────────────┐   ┌──────────┐
//! │  Connector  │──▶│ Fetch/Filter │──▶│ Topic model │──▶│  Labels  │
//! │   Reddit    │   │   Dataset    │   │  (clusters) │   │  (LLM)   │
//! └─────────────┘   └──────────────┘   └─────────────┘   └────┬─────┘
//!                                                             ▼
//!                                                        ┌──────────┐
//!                                                        │  Enrich  │
//!                                                        │ + report │
//!                                                        └──────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`sort`] | Sort mode vocabulary and listing parameters |
//! | [`connector`] | Content source trait |
//! | [`connector_reddit`] | Reddit OAuth connector |
//! | [`fetch`] | Paginated fetch, filtering, and dataset assembly |
//! | [`preprocess`] | Corpus construction and text cleanup |
//! | [`topic_model`] | Topic model trait and built-in keyword model |
//! | [`chat`] | LLM chat client abstraction (Ollama) |
//! | [`label`] | Topic labeling with fallback parsing |
//! | [`enrich`] | Topic columns on top of a dataset |
//! | [`report`] | Text reports and JSON export |
//! | [`pipeline`] | Command orchestration |

pub mod chat;
pub mod config;
pub mod connector;
pub mod connector_reddit;
pub mod enrich;
pub mod error;
pub mod fetch;
pub mod label;
pub mod logging;
pub mod models;
pub mod pipeline;
pub mod preprocess;
pub mod progress;
pub mod report;
pub mod sort;
pub mod topic_model;
