//! Research interest matching.
//!
//! Researcher profiles carry a handful of topical keywords. A catalog build
//! embeds every keyword once and persists the vectors; at query time the
//! requester's keywords are embedded and every profile is scored by how many
//! of those interests it covers, with the matching terms kept as the explanation.
//!
//! ```no_run
//! use std::sync::Arc;
//! use research_matcher::catalog::{load_profile_source, CatalogStore};
//! use research_matcher::embeddings::engine::EmbeddingEngine;
//! use research_matcher::matching::RankingService;
//!
//! # fn main() -> anyhow::Result<()> {
//! let provider = Arc::new(EmbeddingEngine::load_default()?);
//! let store = CatalogStore::new(provider.clone(), "catalog.db");
//! store.build(&load_profile_source("profiles.json".as_ref())?)?;
//!
//! let catalog = store.load()?;
//! let query = vec!["machine learning".to_string(), "robotics".to_string()];
//! for result in RankingService::new(provider).rank(&query, &catalog, 0.3)?.iter().take(5) {
//!     println!("{} {:.3} {:?}", result.name, result.similarity_score, result.matched_interests);
//! }
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod config;
pub mod embeddings;
pub mod error;
pub mod extraction;
pub mod host;
pub mod logging;
pub mod matching;
pub mod native_messaging;
pub mod paths;
pub mod protocol;

#[cfg(test)]
mod test_support;

pub use catalog::{Catalog, CatalogStore, Profile, RawProfile};
pub use embeddings::{EmbeddingError, EmbeddingProvider};
pub use error::{MatcherError, Result};
pub use matching::{MatchResult, RankingService};
