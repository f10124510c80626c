// catalog/ - The researcher catalog: typed profiles, the loaded snapshot, and
// the SQLite-backed store that builds and loads it.

pub mod profile;
pub mod store;

use std::sync::Arc;

use serde::Serialize;

pub use profile::{load_profile_source, parse_profiles, Profile, RawProfile};
pub use store::{load_catalog, CatalogStore};

use crate::embeddings::EmbeddingProvider;
use crate::error::{MatcherError, Result};

/// Facts recorded alongside the profiles when a catalog is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogMeta {
    pub schema_version: u32,
    pub model_name: String,
    pub dimensions: usize,
    pub built_at: String,
}

/// An immutable, positionally ordered set of profiles.
///
/// Cloning is cheap and shares the profile storage, so a rank call holding a
/// clone keeps seeing the same profiles after the store is rebuilt.
#[derive(Debug, Clone)]
pub struct Catalog {
    meta: CatalogMeta,
    profiles: Arc<[Profile]>,
}

impl Catalog {
    /// Every profile must carry exactly one `meta.dimensions`-wide vector per keyword.
    pub fn new(meta: CatalogMeta, profiles: Vec<Profile>) -> Result<Self> {
        for (position, profile) in profiles.iter().enumerate() {
            if profile.embedding_matrix.len() != profile.keywords.len() {
                return Err(MatcherError::InvalidProfile(format!(
                    "profile #{position} ({}) has {} keywords but {} embeddings",
                    profile.name,
                    profile.keywords.len(),
                    profile.embedding_matrix.len()
                )));
            }
            if let Some(bad) = profile.embedding_matrix.iter().find(|v| v.len() != meta.dimensions) {
                return Err(MatcherError::InvalidProfile(format!(
                    "profile #{position} ({}) has a {}-dim embedding, catalog is {}-dim",
                    profile.name,
                    bad.len(),
                    meta.dimensions
                )));
            }
        }

        Ok(Self {
            meta,
            profiles: profiles.into(),
        })
    }

    pub fn meta(&self) -> &CatalogMeta {
        &self.meta
    }

    pub fn profiles(&self) -> &[Profile] {
        &self.profiles
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Query vectors are only comparable with catalog vectors from the same model.
    pub fn ensure_compatible(&self, provider: &dyn EmbeddingProvider) -> Result<()> {
        if self.meta.model_name != provider.model_name() || self.meta.dimensions != provider.dimensions() {
            return Err(MatcherError::IncompatibleCatalog {
                catalog_model: self.meta.model_name.clone(),
                catalog_dims: self.meta.dimensions,
                provider_model: provider.model_name().to_string(),
                provider_dims: provider.dimensions(),
            });
        }
        Ok(())
    }
}
