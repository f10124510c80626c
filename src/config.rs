// IMPORTANT:
// Keep ALL numeric values centralized here (repo rule: no hardcoded numeric values scattered around).

// NOTE: HOST_VERSION must stay in sync with the `version` field in Cargo.toml.
pub const HOST_VERSION: &str = "0.1.0";

/// Catalog schema version: bump ONLY when the artifact layout or the embedding
/// model changes. A catalog with a different version must be rebuilt.
pub const SCHEMA_VERSION: u32 = 1;

pub mod paths {
    /// Overrides the data directory (catalog, logs, cached model).
    pub const HOME_ENV: &str = "RESEARCH_MATCHER_HOME";
    pub const DATA_DIR_REL: &str = ".research_matcher";
}

pub mod logging {
    pub const LOG_DIR_NAME: &str = "logs";
    pub const LOG_FILE_NAME: &str = "research_matcher.log";

    pub const LOG_ROTATE_SIZE_BYTES: u64 = 10 * 1024 * 1024;
    pub const LOG_ROTATE_KEEP_FILES: usize = 5;
}

pub mod native_messaging {
    pub const MAX_MESSAGE_SIZE_BYTES: u32 = 16 * 1024 * 1024;
}

pub mod embedding {
    pub const EMBEDDING_DIMS: usize = 384;
    pub const EMBEDDING_MODEL_NAME: &str = "all-MiniLM-L6-v2";

    // Max word-piece tokens for all-MiniLM-L6-v2 (model context limit is 256).
    pub const MAX_TOKENS: usize = 256;

    // Keywords are short phrases; anything longer is cut before tokenizing.
    pub const MAX_KEYWORD_WORDS: usize = 64;

    // Model download URL base (lazy download on first use).
    pub const MODEL_CDN_BASE: &str =
        "https://huggingface.co/sentence-transformers/all-MiniLM-L6-v2/resolve/main";

    pub const DOWNLOAD_TIMEOUT_SECS: u64 = 90;

    // SHA256 hashes for integrity verification
    pub const MODEL_SAFETENSORS_SHA256: &str =
        "53aa51172d142c89d9012cce15ae4d6cc0ca6895895114379cacb4fab128d9db";
    pub const TOKENIZER_JSON_SHA256: &str =
        "be50c3628f2bf5bb5e3a7f17b1f74611b2561a3a27eeab05e5aa30f411572037";
    pub const CONFIG_JSON_SHA256: &str =
        "953f9c0d463486b10a6871cc2fd59f223b2c70184f49815e7efbcab5d8908b41";

    /// Pre-provisioned model directory; skips download when set.
    pub const MODEL_DIR_ENV: &str = "RESEARCH_MATCHER_MODEL_DIR";
    // Cached model directory (relative to the data directory)
    pub const MODEL_DIR_REL: &str = "models/all-MiniLM-L6-v2";
}

pub mod matching {
    /// Minimum pairwise cosine similarity for two keywords to count as a match.
    pub const DEFAULT_THRESHOLD: f32 = 0.3;

    /// Scores are rounded to this many decimal places.
    pub const SCORE_DECIMALS: i32 = 5;

    /// How many results the host returns when the caller gives no `topK`.
    pub const DEFAULT_TOP_K: usize = 5;
}

pub mod catalog {
    pub const CATALOG_FILE_NAME: &str = "catalog.db";

    // A build is written to `<file>.<random>.tmp` first, then renamed over the live artifact.
    pub const STAGED_SUFFIX: &str = ".tmp";

    pub const PRAGMA_BUSY_TIMEOUT_MS: i64 = 2000;
}
