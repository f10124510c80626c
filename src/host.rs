// host.rs - Request handlers for the stdio host.
//
// The host is the composition root: it owns the one embedding provider (created
// on first use) and the currently loaded catalog snapshot.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use serde_json::Value;

use crate::catalog::{load_catalog, load_profile_source, Catalog, CatalogStore};
use crate::config;
use crate::embeddings::engine::EmbeddingEngine;
use crate::embeddings::text_prep::normalize_keywords;
use crate::embeddings::{EmbeddingError, EmbeddingProvider};
use crate::error::MatcherError;
use crate::extraction::{DelimitedKeywords, ExtractionPolicy};
use crate::matching::RankingService;
use crate::paths;
use crate::protocol::{ResponseErr, ResponseOk};

pub type ProviderFactory = Box<dyn Fn() -> Result<Arc<dyn EmbeddingProvider>, EmbeddingError> + Send>;

pub struct HostState {
    provider_factory: ProviderFactory,
    provider: Option<Arc<dyn EmbeddingProvider>>,
    catalog: Option<Catalog>,
    catalog_path: Option<PathBuf>,
}

impl HostState {
    /// Host backed by the local candle model.
    pub fn new() -> Self {
        Self::with_provider_factory(Box::new(|| -> Result<Arc<dyn EmbeddingProvider>, EmbeddingError> {
            let engine = EmbeddingEngine::load_default()?;
            Ok(Arc::new(engine) as Arc<dyn EmbeddingProvider>)
        }))
    }

    pub fn with_provider_factory(provider_factory: ProviderFactory) -> Self {
        Self {
            provider_factory,
            provider: None,
            catalog: None,
            catalog_path: None,
        }
    }

    fn provider(&mut self) -> Result<Arc<dyn EmbeddingProvider>, MatcherError> {
        if let Some(p) = &self.provider {
            return Ok(p.clone());
        }
        log::info!("Initializing embedding provider");
        let p = (self.provider_factory)()?;
        log::info!("Embedding provider ready: {} ({} dims)", p.model_name(), p.dimensions());
        self.provider = Some(p.clone());
        Ok(p)
    }

    fn resolve_catalog_path(&self, params: &Value) -> anyhow::Result<PathBuf> {
        if let Some(p) = params.get("catalogPath").and_then(|v| v.as_str()) {
            return Ok(PathBuf::from(p));
        }
        if let Some(p) = &self.catalog_path {
            return Ok(p.clone());
        }
        paths::default_catalog_path()
    }

    /// The loaded snapshot, loading from the default location on first use.
    fn catalog(&mut self) -> anyhow::Result<Catalog> {
        if let Some(c) = &self.catalog {
            return Ok(c.clone());
        }
        let path = self.resolve_catalog_path(&Value::Null)?;
        let catalog = load_catalog(&path)?;
        self.catalog_path = Some(path);
        self.catalog = Some(catalog.clone());
        Ok(catalog)
    }
}

impl Default for HostState {
    fn default() -> Self {
        Self::new()
    }
}

pub fn handle_request(state: &mut HostState, method: &str, msg_id: &str, params: &Value) -> anyhow::Result<Value> {
    match method {
        "hello" => handle_hello(state, msg_id, params),
        "buildCatalog" => handle_build_catalog(state, msg_id, params),
        "loadCatalog" => handle_load_catalog(state, msg_id, params),
        "rank" => handle_rank(state, msg_id, params),
        "stats" => handle_stats(state, msg_id),
        _ => Ok(serde_json::json!({ "id": msg_id, "error": format!("Unknown method: {method}"), "errorKind": "UnknownMethod" })),
    }
}

/// Error response; core errors keep their distinct kind.
pub fn error_response(msg_id: &str, e: &anyhow::Error) -> Value {
    let error_kind = e
        .downcast_ref::<MatcherError>()
        .map(MatcherError::kind)
        .unwrap_or("HostError");
    serde_json::to_value(ResponseErr {
        id: msg_id.to_string(),
        error: format!("{e:#}"),
        error_kind: error_kind.to_string(),
    })
    .unwrap_or_else(|_| serde_json::json!({ "id": msg_id, "error": format!("{e:#}") }))
}

fn ok(msg_id: &str, result: Value) -> anyhow::Result<Value> {
    Ok(serde_json::to_value(ResponseOk {
        id: msg_id.to_string(),
        result,
    })?)
}

fn handle_hello(state: &HostState, msg_id: &str, params: &Value) -> anyhow::Result<Value> {
    let client_version = params.get("clientVersion").and_then(|v| v.as_str()).unwrap_or("unknown");
    log::info!(
        "Hello from client version {}, responding with host version {}",
        client_version,
        config::HOST_VERSION
    );

    ok(
        msg_id,
        serde_json::json!({
            "type": "hello-response",
            "hostVersion": config::HOST_VERSION,
            "schemaVersion": config::SCHEMA_VERSION,
            "modelName": config::embedding::EMBEDDING_MODEL_NAME,
            "catalogLoaded": state.catalog.is_some(),
            "clientVersion": client_version
        }),
    )
}

fn handle_build_catalog(state: &mut HostState, msg_id: &str, params: &Value) -> anyhow::Result<Value> {
    let profiles_path = params
        .get("profilesPath")
        .and_then(|v| v.as_str())
        .context("Missing required parameters: profilesPath")?;
    let catalog_path = state.resolve_catalog_path(params)?;

    let raw_profiles = load_profile_source(&PathBuf::from(profiles_path))?;
    let provider = state.provider()?;
    let store = CatalogStore::new(provider, &catalog_path);
    store.build(&raw_profiles)?;

    // Serve the persisted artifact, not the in-memory build result.
    let catalog = store.load()?;
    let profiles = catalog.len();
    state.catalog = Some(catalog);
    state.catalog_path = Some(catalog_path.clone());

    ok(
        msg_id,
        serde_json::json!({
            "ok": true,
            "profiles": profiles,
            "catalogPath": catalog_path.to_string_lossy()
        }),
    )
}

fn handle_load_catalog(state: &mut HostState, msg_id: &str, params: &Value) -> anyhow::Result<Value> {
    let catalog_path = state.resolve_catalog_path(params)?;
    let catalog = load_catalog(&catalog_path)?;
    let profiles = catalog.len();
    let meta = serde_json::to_value(catalog.meta())?;
    state.catalog = Some(catalog);
    state.catalog_path = Some(catalog_path.clone());

    ok(
        msg_id,
        serde_json::json!({
            "ok": true,
            "profiles": profiles,
            "catalogPath": catalog_path.to_string_lossy(),
            "meta": meta
        }),
    )
}

fn handle_rank(state: &mut HostState, msg_id: &str, params: &Value) -> anyhow::Result<Value> {
    let threshold = match params.get("threshold") {
        None | Some(Value::Null) => config::matching::DEFAULT_THRESHOLD,
        Some(v) => v
            .as_f64()
            .map(|t| t as f32)
            .with_context(|| format!("threshold must be a number, got {v}"))?,
    };
    let top_k = match params.get("topK") {
        None | Some(Value::Null) => config::matching::DEFAULT_TOP_K,
        Some(v) => v
            .as_u64()
            .map(|k| k as usize)
            .with_context(|| format!("topK must be a non-negative integer, got {v}"))?,
    };

    let catalog = state.catalog()?;
    let service = RankingService::new(state.provider()?);

    let (query, mut results) = if let Some(keywords) = params.get("keywords").and_then(|v| v.as_array()) {
        let raw: Vec<&str> = keywords.iter().filter_map(|v| v.as_str()).collect();
        let query = normalize_keywords(&raw);
        let results = service.rank(&query, &catalog, threshold)?;
        (Value::from(query), results)
    } else if let Some(text) = params.get("text").and_then(|v| v.as_str()) {
        let results = service.rank_document(&DelimitedKeywords, text, &catalog, threshold, ExtractionPolicy::Propagate)?;
        (Value::from(text), results)
    } else {
        anyhow::bail!("Missing required parameters: keywords or text");
    };

    let total = results.len();
    if top_k > 0 {
        results.truncate(top_k);
    }
    log::info!("Returning {} of {} ranked profiles", results.len(), total);

    ok(
        msg_id,
        serde_json::json!({
            "query": query,
            "threshold": threshold,
            "totalProfiles": total,
            "results": serde_json::to_value(&results)?
        }),
    )
}

fn handle_stats(state: &HostState, msg_id: &str) -> anyhow::Result<Value> {
    let Some(catalog) = &state.catalog else {
        return ok(msg_id, serde_json::json!({ "catalogLoaded": false }));
    };

    let matchable = catalog.profiles().iter().filter(|p| p.is_matchable()).count();
    let keywords: usize = catalog.profiles().iter().map(|p| p.keywords.len()).sum();
    ok(
        msg_id,
        serde_json::json!({
            "catalogLoaded": true,
            "catalogPath": state.catalog_path.as_ref().map(|p| p.to_string_lossy().into_owned()),
            "profiles": catalog.len(),
            "matchableProfiles": matchable,
            "keywords": keywords,
            "meta": serde_json::to_value(catalog.meta())?
        }),
    )
}
