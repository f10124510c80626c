// extraction.rs - Seam for turning document text into query keywords.
//
// Real extraction (an LLM call, a PDF pipeline, ...) lives outside this crate.
// Implementations report failures as `KeywordExtractionFailure`; whether that
// fails the request or degrades to an empty query is the caller's choice.

use crate::embeddings::text_prep::normalize_keywords;
use crate::error::Result;

pub trait KeywordExtractor: Send + Sync {
    /// Ordered keywords for `document_text`. May be empty.
    fn extract_keywords(&self, document_text: &str) -> Result<Vec<String>>;
}

/// What `rank_document` does when extraction fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExtractionPolicy {
    #[default]
    Propagate,
    /// Log the failure and rank as if no keywords were found.
    DegradeToEmpty,
}

/// Run `extractor` and normalize its output (trimmed, lowercase, no blanks).
pub fn extract_normalized(extractor: &dyn KeywordExtractor, document_text: &str) -> Result<Vec<String>> {
    let raw = extractor.extract_keywords(document_text)?;
    Ok(normalize_keywords(&raw))
}

/// Treats the text as a delimited interest list ("nlp, robotics; hci").
///
/// Used by the host for typed-in interests where no external extractor is involved.
#[derive(Debug, Clone, Copy, Default)]
pub struct DelimitedKeywords;

impl KeywordExtractor for DelimitedKeywords {
    fn extract_keywords(&self, document_text: &str) -> Result<Vec<String>> {
        Ok(normalize_keywords(
            &document_text.split([',', ';', '\n']).collect::<Vec<_>>(),
        ))
    }
}
