// error.rs - Error taxonomy for the matching core.
//
// Every failure the core can raise has its own variant so the host can report a
// distinct `errorKind` instead of a generic message.

use std::path::PathBuf;

use thiserror::Error;

use crate::embeddings::EmbeddingError;

pub type Result<T, E = MatcherError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum MatcherError {
    #[error("embedding provider failed: {0}")]
    EmbeddingFailure(#[from] EmbeddingError),

    #[error("catalog not found at {}", path.display())]
    CatalogNotFound { path: PathBuf },

    #[error("catalog at {} is corrupt: {reason}", path.display())]
    CatalogCorrupt { path: PathBuf, reason: String },

    #[error("catalog build failed: {reason}")]
    CatalogBuildError {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("keyword extraction failed: {0}")]
    KeywordExtractionFailure(String),

    #[error("invalid profile: {0}")]
    InvalidProfile(String),

    #[error(
        "catalog was built with {catalog_model} ({catalog_dims} dims) but the provider is {provider_model} ({provider_dims} dims)"
    )]
    IncompatibleCatalog {
        catalog_model: String,
        catalog_dims: usize,
        provider_model: String,
        provider_dims: usize,
    },

    #[error("threshold must be in (0, 1), got {0}")]
    InvalidThreshold(f32),
}

impl MatcherError {
    /// Stable identifier reported to callers alongside the message.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::EmbeddingFailure(_) => "EmbeddingFailure",
            Self::CatalogNotFound { .. } => "CatalogNotFound",
            Self::CatalogCorrupt { .. } => "CatalogCorrupt",
            Self::CatalogBuildError { .. } => "CatalogBuildError",
            Self::KeywordExtractionFailure(_) => "KeywordExtractionFailure",
            Self::InvalidProfile(_) => "InvalidProfile",
            Self::IncompatibleCatalog { .. } => "IncompatibleCatalog",
            Self::InvalidThreshold(_) => "InvalidThreshold",
        }
    }

    pub(crate) fn build<E>(reason: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::CatalogBuildError {
            reason: reason.into(),
            source: Some(Box::new(source)),
        }
    }

    pub(crate) fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::CatalogCorrupt {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
