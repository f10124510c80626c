// test_support.rs - Deterministic embedding doubles for unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::embeddings::{Embedding, EmbeddingError, EmbeddingProvider};

/// Returns a fixed vector per known text; unknown text is an inference error.
pub struct FixedProvider {
    dims: usize,
    vectors: HashMap<String, Embedding>,
    calls: AtomicUsize,
}

impl FixedProvider {
    pub fn new(dims: usize) -> Self {
        Self {
            dims,
            vectors: HashMap::new(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with(mut self, text: &str, vector: &[f32]) -> Self {
        assert_eq!(vector.len(), self.dims, "fixture vector for {text:?} has wrong dims");
        self.vectors.insert(text.to_string(), vector.to_vec());
        self
    }

    /// Number of `embed` calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl EmbeddingProvider for FixedProvider {
    fn embed(&self, texts: &[String]) -> Result<Vec<Embedding>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        texts
            .iter()
            .map(|t| {
                self.vectors
                    .get(t)
                    .cloned()
                    .ok_or_else(|| EmbeddingError::Inference(format!("no fixture vector for {t:?}")))
            })
            .collect()
    }

    fn model_name(&self) -> &str {
        "fixed-test"
    }

    fn dimensions(&self) -> usize {
        self.dims
    }
}

/// Always unavailable.
pub struct FailingProvider;

impl EmbeddingProvider for FailingProvider {
    fn embed(&self, _texts: &[String]) -> Result<Vec<Embedding>, EmbeddingError> {
        Err(EmbeddingError::Unavailable("provider offline".into()))
    }

    fn model_name(&self) -> &str {
        "fixed-test"
    }

    fn dimensions(&self) -> usize {
        3
    }
}

/// Unit vector in the plane at `degrees` from the x axis, padded to 3 dims.
pub fn unit3(degrees: f32) -> [f32; 3] {
    let r = degrees.to_radians();
    [r.cos(), r.sin(), 0.0]
}

/// Provider over a small research vocabulary in 3 dims.
///
/// "machine learning", "ml" and "deep learning" point the same way;
/// "robotics" and "robot control" are close; "cooking" is orthogonal to both.
pub fn research_provider() -> FixedProvider {
    FixedProvider::new(3)
        .with("machine learning", &[1.0, 0.0, 0.0])
        .with("ml", &[1.0, 0.0, 0.0])
        .with("deep learning", &unit3(20.0))
        .with("robotics", &[0.0, 1.0, 0.0])
        .with("robot control", &unit3(80.0))
        .with("cooking", &[0.0, 0.0, 1.0])
        .with("pastry", &[0.0, 0.0, 1.0])
        .with("ai", &unit3(10.0))
        .with("artificial intelligence research", &unit3(15.0))
}
