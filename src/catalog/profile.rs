// profile.rs - Researcher profile records.
//
// `RawProfile` is what the harvester hands us; `Profile` is the same record
// once its keywords have been embedded during a catalog build.

use std::path::Path;

use serde::Deserialize;

use crate::embeddings::Embedding;
use crate::error::{MatcherError, Result};

/// A harvested profile record. Field names written by the scraper
/// (`prof_name`, `prof_keywords`, ...) are accepted as aliases; anything else is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawProfile {
    #[serde(alias = "prof_name")]
    pub name: String,
    #[serde(alias = "prof_keywords")]
    pub keywords: Vec<String>,
    #[serde(alias = "prof_email")]
    pub email: String,
    #[serde(alias = "prof_dpt")]
    pub department: String,
}

impl RawProfile {
    /// Trim identity fields and keywords; blank keywords are dropped, order is kept.
    pub(crate) fn validated(&self, position: usize) -> Result<RawProfile> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(MatcherError::InvalidProfile(format!("profile #{position} has an empty name")));
        }

        Ok(RawProfile {
            name: name.to_string(),
            keywords: self
                .keywords
                .iter()
                .map(|k| k.trim())
                .filter(|k| !k.is_empty())
                .map(str::to_string)
                .collect(),
            email: self.email.trim().to_string(),
            department: self.department.trim().to_string(),
        })
    }
}

/// A catalog entry: identity, declared keywords, and one embedding per keyword.
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub name: String,
    pub email: String,
    pub department: String,
    pub keywords: Vec<String>,
    pub embedding_matrix: Vec<Embedding>,
}

impl Profile {
    pub(crate) fn from_raw(raw: RawProfile, embedding_matrix: Vec<Embedding>) -> Self {
        Self {
            name: raw.name,
            email: raw.email,
            department: raw.department,
            keywords: raw.keywords,
            embedding_matrix,
        }
    }

    /// A profile without keywords (or embeddings) can never match anything.
    pub fn is_matchable(&self) -> bool {
        !self.keywords.is_empty() && !self.embedding_matrix.is_empty()
    }
}

/// Parse a JSON array of raw profile records.
pub fn parse_profiles(json: &str) -> Result<Vec<RawProfile>> {
    serde_json::from_str(json).map_err(|e| MatcherError::InvalidProfile(e.to_string()))
}

/// Read the harvester's JSON output from disk.
pub fn load_profile_source(path: &Path) -> Result<Vec<RawProfile>> {
    let json = std::fs::read_to_string(path)
        .map_err(|e| MatcherError::InvalidProfile(format!("read {}: {e}", path.display())))?;
    let profiles: Vec<RawProfile> = serde_json::from_str(&json)
        .map_err(|e| MatcherError::InvalidProfile(format!("{}: {e}", path.display())))?;
    log::info!("Loaded {} raw profiles from {}", profiles.len(), path.display());
    Ok(profiles)
}
