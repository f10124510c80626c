// similarity.rs - Keyword-set similarity between a query and one profile.
//
// 1. Q×K cosine matrix (dot products; both sides are unit-norm)
// 2. Matched interests: every pair at or above threshold contributes the more
//    specific keyword (more words; ties go to the query side)
// 3. Score: per query keyword take its best profile match; maxima above the
//    threshold are summed and divided by ALL Q query keywords, so unmatched
//    query interests pull the score down

use crate::catalog::Profile;
use crate::config;
use crate::embeddings::text_prep::word_count;
use crate::embeddings::Embedding;

/// Score and explanation for one profile.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileMatch {
    pub score: f64,
    pub matched_interests: Vec<String>,
}

impl ProfileMatch {
    pub fn none() -> Self {
        Self {
            score: 0.0,
            matched_interests: Vec::new(),
        }
    }
}

/// `sim[i][j]` = dot(query[i], profile[j]).
pub fn cosine_matrix(query: &[Embedding], profile: &[Embedding]) -> Vec<Vec<f32>> {
    query
        .iter()
        .map(|q| profile.iter().map(|p| dot(q, p)).collect())
        .collect()
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// The keyword with more words wins; on a tie the query keyword is kept.
pub fn more_specific<'a>(query_keyword: &'a str, profile_keyword: &'a str) -> &'a str {
    if word_count(query_keyword) >= word_count(profile_keyword) {
        query_keyword
    } else {
        profile_keyword
    }
}

pub fn round_score(score: f64) -> f64 {
    let scale = 10f64.powi(config::matching::SCORE_DECIMALS);
    (score * scale).round() / scale
}

/// Score a precomputed similarity matrix.
///
/// `sims` has one row per query keyword and one column per profile keyword.
pub fn evaluate(sims: &[Vec<f32>], query_keywords: &[String], profile_keywords: &[String], threshold: f32) -> ProfileMatch {
    if query_keywords.is_empty() || profile_keywords.is_empty() {
        return ProfileMatch::none();
    }

    let mut matched_interests: Vec<String> = Vec::new();
    let mut qualifying_sum = 0.0f64;

    for (query_keyword, row) in query_keywords.iter().zip(sims) {
        for (profile_keyword, &sim) in profile_keywords.iter().zip(row) {
            if sim >= threshold {
                let term = more_specific(query_keyword, profile_keyword);
                if !matched_interests.iter().any(|m| m == term) {
                    matched_interests.push(term.to_string());
                }
            }
        }

        let best = row.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        if best > threshold {
            qualifying_sum += f64::from(best);
        }
    }

    ProfileMatch {
        score: round_score(qualifying_sum / query_keywords.len() as f64),
        matched_interests,
    }
}

/// Score one profile against already-embedded query keywords.
///
/// Profiles without keywords or embeddings score 0 without any computation.
pub fn score_profile(
    query_keywords: &[String],
    query_embeddings: &[Embedding],
    profile: &Profile,
    threshold: f32,
) -> ProfileMatch {
    if !profile.is_matchable() {
        return ProfileMatch::none();
    }
    debug_assert_eq!(
        profile.embedding_matrix.len(),
        profile.keywords.len(),
        "profile {} has misaligned keywords and embeddings",
        profile.name
    );

    let sims = cosine_matrix(query_embeddings, &profile.embedding_matrix);
    evaluate(&sims, query_keywords, &profile.keywords, threshold)
}
