// ranking.rs - Rank every catalog profile against a query.
//
// The query is embedded once; each profile reuses its precomputed matrix. The
// full catalog is always scored and returned; callers slice their own top-k.

use std::sync::Arc;

use serde::Serialize;

use super::similarity::score_profile;
use crate::catalog::{Catalog, Profile};
use crate::embeddings::{embed_checked, EmbeddingProvider};
use crate::error::{MatcherError, Result};
use crate::extraction::{extract_normalized, ExtractionPolicy, KeywordExtractor};

/// One ranked profile with its score and the interests that produced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    pub name: String,
    pub email: String,
    pub department: String,
    pub keywords: Vec<String>,
    pub similarity_score: f64,
    pub matched_interests: Vec<String>,
}

impl MatchResult {
    fn new(profile: &Profile, similarity_score: f64, matched_interests: Vec<String>) -> Self {
        Self {
            name: profile.name.clone(),
            email: profile.email.clone(),
            department: profile.department.clone(),
            keywords: profile.keywords.clone(),
            similarity_score,
            matched_interests,
        }
    }
}

pub struct RankingService {
    provider: Arc<dyn EmbeddingProvider>,
}

impl RankingService {
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self { provider }
    }

    /// Score every profile in `catalog`, best first. Ties keep catalog order.
    ///
    /// An empty query returns an empty list without calling the provider.
    pub fn rank(&self, query_keywords: &[String], catalog: &Catalog, threshold: f32) -> Result<Vec<MatchResult>> {
        if query_keywords.is_empty() {
            log::debug!("Empty query, nothing to rank");
            return Ok(Vec::new());
        }
        if !(threshold > 0.0 && threshold < 1.0) {
            return Err(MatcherError::InvalidThreshold(threshold));
        }
        catalog.ensure_compatible(self.provider.as_ref())?;

        let query_embeddings = embed_checked(self.provider.as_ref(), query_keywords)?;

        let mut results: Vec<MatchResult> = catalog
            .profiles()
            .iter()
            .map(|profile| {
                let m = score_profile(query_keywords, &query_embeddings, profile, threshold);
                MatchResult::new(profile, m.score, m.matched_interests)
            })
            .collect();

        // sort_by is stable, so equal scores stay in catalog order.
        results.sort_by(|a, b| b.similarity_score.total_cmp(&a.similarity_score));

        log::info!(
            "Ranked {} profiles for {} query keywords (threshold={}), best={:.5}",
            results.len(),
            query_keywords.len(),
            threshold,
            results.first().map(|r| r.similarity_score).unwrap_or(0.0)
        );
        Ok(results)
    }

    /// Extract keywords from `document_text`, then rank.
    pub fn rank_document(
        &self,
        extractor: &dyn KeywordExtractor,
        document_text: &str,
        catalog: &Catalog,
        threshold: f32,
        policy: ExtractionPolicy,
    ) -> Result<Vec<MatchResult>> {
        let keywords = match extract_normalized(extractor, document_text) {
            Ok(keywords) => keywords,
            Err(e @ MatcherError::KeywordExtractionFailure(_)) if policy == ExtractionPolicy::DegradeToEmpty => {
                log::warn!("Keyword extraction failed, ranking an empty query: {}", e);
                Vec::new()
            }
            Err(e) => return Err(e),
        };
        log::info!("Extracted {} keywords from document", keywords.len());
        self.rank(&keywords, catalog, threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogMeta, CatalogStore, RawProfile};
    use crate::extraction::DelimitedKeywords;
    use crate::test_support::{research_provider, FailingProvider, FixedProvider};

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn raw(name: &str, keywords: &[&str]) -> RawProfile {
        RawProfile {
            name: name.to_string(),
            keywords: strings(keywords),
            email: String::new(),
            department: "csd".to_string(),
        }
    }

    /// Builds through the real store so ranking sees exactly what `load` returns.
    fn build_catalog(provider: Arc<FixedProvider>, profiles: &[RawProfile]) -> (tempfile::TempDir, Catalog) {
        let dir = tempfile::tempdir().unwrap();
        let store = CatalogStore::new(provider, dir.path().join("catalog.db"));
        store.build(profiles).unwrap();
        let catalog = store.load().unwrap();
        (dir, catalog)
    }

    fn research_catalog() -> (Arc<FixedProvider>, tempfile::TempDir, Catalog) {
        let provider = Arc::new(research_provider());
        let (dir, catalog) = build_catalog(
            provider.clone(),
            &[
                raw("Chef", &["cooking", "pastry"]),
                raw("Roboticist", &["robotics", "robot control"]),
                raw("Nobody", &[]),
                raw("Learner", &["machine learning", "deep learning"]),
                raw("Generalist", &["machine learning", "robotics"]),
            ],
        );
        (provider, dir, catalog)
    }

    #[test]
    fn test_rank_returns_every_profile_sorted() {
        let (provider, _dir, catalog) = research_catalog();
        let service = RankingService::new(provider);

        let results = service
            .rank(&strings(&["machine learning", "robotics"]), &catalog, 0.3)
            .unwrap();

        assert_eq!(results.len(), catalog.len());
        assert!(results.windows(2).all(|w| w[0].similarity_score >= w[1].similarity_score));
        assert_eq!(results[0].name, "Generalist");
        assert_eq!(results[0].similarity_score, 1.0);
    }

    #[test]
    fn test_rank_embeds_query_once() {
        let (provider, _dir, catalog) = research_catalog();
        let before = provider.calls();
        RankingService::new(provider.clone())
            .rank(&strings(&["robotics", "cooking"]), &catalog, 0.3)
            .unwrap();
        assert_eq!(provider.calls(), before + 1);
    }

    #[test]
    fn test_rank_empty_query_is_empty() {
        let (provider, _dir, catalog) = research_catalog();
        let before = provider.calls();
        let service = RankingService::new(provider.clone());
        assert!(service.rank(&[], &catalog, 0.3).unwrap().is_empty());
        // Any threshold, even one rank would otherwise reject.
        assert!(service.rank(&[], &catalog, 7.0).unwrap().is_empty());
        assert_eq!(provider.calls(), before);
    }

    #[test]
    fn test_empty_profile_scores_zero() {
        let (provider, _dir, catalog) = research_catalog();
        let results = RankingService::new(provider)
            .rank(&strings(&["machine learning", "robotics", "cooking"]), &catalog, 0.3)
            .unwrap();
        let nobody = results.iter().find(|r| r.name == "Nobody").unwrap();
        assert_eq!(nobody.similarity_score, 0.0);
        assert!(nobody.matched_interests.is_empty());
    }

    #[test]
    fn test_ties_keep_catalog_order() {
        let (provider, _dir, catalog) = research_catalog();
        let results = RankingService::new(provider)
            .rank(&strings(&["cooking"]), &catalog, 0.3)
            .unwrap();
        let zero_names: Vec<&str> = results
            .iter()
            .filter(|r| r.similarity_score == 0.0)
            .map(|r| r.name.as_str())
            .collect();
        assert_eq!(zero_names, vec!["Roboticist", "Nobody", "Learner", "Generalist"]);
        assert_eq!(results[0].name, "Chef");
    }

    #[test]
    fn test_query_order_does_not_change_scores() {
        let (provider, _dir, catalog) = research_catalog();
        let service = RankingService::new(provider);

        let scores = |query: &[&str]| -> Vec<(String, f64)> {
            let mut out: Vec<(String, f64)> = service
                .rank(&strings(query), &catalog, 0.3)
                .unwrap()
                .into_iter()
                .map(|r| (r.name, r.similarity_score))
                .collect();
            out.sort_by(|a, b| a.0.cmp(&b.0));
            out
        };

        assert_eq!(
            scores(&["machine learning", "robotics", "cooking"]),
            scores(&["cooking", "machine learning", "robotics"])
        );
    }

    #[test]
    fn test_profile_keyword_order_does_not_change_score() {
        let provider = Arc::new(research_provider());
        let (_d1, forward) = build_catalog(provider.clone(), &[raw("P", &["robotics", "deep learning"])]);
        let (_d2, reversed) = build_catalog(provider.clone(), &[raw("P", &["deep learning", "robotics"])]);

        let service = RankingService::new(provider);
        let query = strings(&["machine learning", "robot control"]);
        let a = service.rank(&query, &forward, 0.3).unwrap();
        let b = service.rank(&query, &reversed, 0.3).unwrap();
        assert_eq!(a[0].similarity_score, b[0].similarity_score);
    }

    #[test]
    fn test_duplicate_query_keywords_change_score() {
        // "ml" matches "machine learning" perfectly; "robotics" matches nothing in this profile.
        let provider = Arc::new(research_provider());
        let (_dir, catalog) = build_catalog(provider.clone(), &[raw("P", &["machine learning", "cooking"])]);
        let service = RankingService::new(provider);

        let once = service.rank(&strings(&["ml", "robotics"]), &catalog, 0.3).unwrap();
        let twice = service.rank(&strings(&["ml", "ml", "robotics"]), &catalog, 0.3).unwrap();

        // 1.0 / 2 vs (1.0 + 1.0) / 3
        assert_eq!(once[0].similarity_score, 0.5);
        assert_eq!(twice[0].similarity_score, 0.66667);
    }

    #[test]
    fn test_matched_interest_prefers_specific_profile_term() {
        let provider = Arc::new(research_provider());
        let (_dir, catalog) = build_catalog(provider.clone(), &[raw("P", &["artificial intelligence research"])]);
        let results = RankingService::new(provider)
            .rank(&strings(&["ai"]), &catalog, 0.3)
            .unwrap();
        assert_eq!(results[0].matched_interests, vec!["artificial intelligence research"]);
    }

    #[test]
    fn test_worked_example_through_rank() {
        // Vectors chosen so that the four pairwise similarities are
        // 0.95 / 0.05 / 0.10 / 0.02.
        let p0 = vec![0.95, 0.10, (1.0f32 - 0.95 * 0.95 - 0.10 * 0.10).sqrt()];
        let p1 = vec![0.05, 0.02, (1.0f32 - 0.05 * 0.05 - 0.02 * 0.02).sqrt()];
        let provider = Arc::new(
            FixedProvider::new(3)
                .with("machine learning", &[1.0, 0.0, 0.0])
                .with("robotics", &[0.0, 1.0, 0.0]),
        );

        // Profile vectors differ from the query vectors for the same text, so
        // the catalog is assembled by hand rather than built with the provider.
        let meta = CatalogMeta {
            schema_version: crate::config::SCHEMA_VERSION,
            model_name: "fixed-test".to_string(),
            dimensions: 3,
            built_at: "2026-01-01T00:00:00+00:00".to_string(),
        };
        let profile = Profile {
            name: "P".to_string(),
            email: String::new(),
            department: String::new(),
            keywords: strings(&["machine learning", "cooking"]),
            embedding_matrix: vec![p0, p1],
        };
        let catalog = Catalog::new(meta, vec![profile]).unwrap();

        let results = RankingService::new(provider.clone())
            .rank(&strings(&["machine learning", "robotics"]), &catalog, 0.3)
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].similarity_score, 0.475);
        assert_eq!(results[0].matched_interests, vec!["machine learning"]);
        assert_eq!(provider.calls(), 1);
    }

    #[test]
    fn test_provider_failure_fails_whole_rank() {
        let (_provider, _dir, catalog) = research_catalog();
        // Same model name and dims as the catalog, but offline.
        struct Offline;
        impl EmbeddingProvider for Offline {
            fn embed(&self, texts: &[String]) -> std::result::Result<Vec<crate::embeddings::Embedding>, crate::embeddings::EmbeddingError> {
                FailingProvider.embed(texts)
            }
            fn model_name(&self) -> &str {
                "fixed-test"
            }
            fn dimensions(&self) -> usize {
                3
            }
        }

        let err = RankingService::new(Arc::new(Offline))
            .rank(&strings(&["robotics"]), &catalog, 0.3)
            .unwrap_err();
        assert_eq!(err.kind(), "EmbeddingFailure");
    }

    #[test]
    fn test_invalid_threshold_is_rejected() {
        let (provider, _dir, catalog) = research_catalog();
        let service = RankingService::new(provider);
        for threshold in [0.0, 1.0, -0.2, f32::NAN] {
            let err = service.rank(&strings(&["robotics"]), &catalog, threshold).unwrap_err();
            assert_eq!(err.kind(), "InvalidThreshold");
        }
    }

    #[test]
    fn test_incompatible_catalog_is_rejected() {
        let (_provider, _dir, catalog) = research_catalog();
        let other = Arc::new(FixedProvider::new(4));
        let err = RankingService::new(other)
            .rank(&strings(&["robotics"]), &catalog, 0.3)
            .unwrap_err();
        assert_eq!(err.kind(), "IncompatibleCatalog");
    }

    #[test]
    fn test_loaded_snapshot_survives_rebuild() {
        let provider = Arc::new(research_provider());
        let dir = tempfile::tempdir().unwrap();
        let store = CatalogStore::new(provider.clone(), dir.path().join("catalog.db"));
        store.build(&[raw("Old Robotics", &["robotics"])]).unwrap();
        let snapshot = store.load().unwrap();

        store.build(&[raw("New Chef", &["cooking"]), raw("New Learner", &["ml"])]).unwrap();

        let service = RankingService::new(provider);
        let query = strings(&["robotics"]);
        let old = service.rank(&query, &snapshot, 0.3).unwrap();
        assert_eq!(old.len(), 1);
        assert_eq!(old[0].name, "Old Robotics");
        assert_eq!(old[0].similarity_score, 1.0);

        let fresh = service.rank(&query, &store.load().unwrap(), 0.3).unwrap();
        assert_eq!(fresh.len(), 2);
    }

    #[test]
    fn test_concurrent_ranks_share_snapshot() {
        let (provider, _dir, catalog) = research_catalog();
        let service = RankingService::new(provider);
        let expected = service.rank(&strings(&["robotics"]), &catalog, 0.3).unwrap();

        std::thread::scope(|s| {
            let handles: Vec<_> = (0..4)
                .map(|_| s.spawn(|| service.rank(&strings(&["robotics"]), &catalog, 0.3).unwrap()))
                .collect();
            for h in handles {
                assert_eq!(h.join().unwrap(), expected);
            }
        });
    }

    #[test]
    fn test_rank_document_policies() {
        struct Broken;
        impl KeywordExtractor for Broken {
            fn extract_keywords(&self, _document_text: &str) -> Result<Vec<String>> {
                Err(MatcherError::KeywordExtractionFailure("quota exceeded".into()))
            }
        }

        let (provider, _dir, catalog) = research_catalog();
        let service = RankingService::new(provider);

        let err = service
            .rank_document(&Broken, "cv text", &catalog, 0.3, ExtractionPolicy::Propagate)
            .unwrap_err();
        assert_eq!(err.kind(), "KeywordExtractionFailure");

        let degraded = service
            .rank_document(&Broken, "cv text", &catalog, 0.3, ExtractionPolicy::DegradeToEmpty)
            .unwrap();
        assert!(degraded.is_empty());

        let ranked = service
            .rank_document(&DelimitedKeywords, "Robotics, Cooking", &catalog, 0.3, ExtractionPolicy::Propagate)
            .unwrap();
        assert_eq!(ranked.len(), catalog.len());
    }

    #[test]
    fn test_match_result_serializes_camel_case() {
        let (provider, _dir, catalog) = research_catalog();
        let results = RankingService::new(provider)
            .rank(&strings(&["robotics"]), &catalog, 0.3)
            .unwrap();
        let json = serde_json::to_value(&results[0]).unwrap();
        assert_eq!(json["name"], "Roboticist");
        assert!(json.get("similarityScore").is_some());
        assert!(json.get("matchedInterests").is_some());
    }
}
