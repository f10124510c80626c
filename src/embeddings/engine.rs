// engine.rs - Candle BERT embedding engine with attention-mask-aware mean pooling.
//
// Loads all-MiniLM-L6-v2 from safetensors, generates 384-dim sentence embeddings.
// Uses mean pooling over non-padding tokens (not naive average, not CLS token),
// then L2 normalization, so dot products are cosine similarities.

use std::path::Path;

use anyhow::{bail, Context};
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use tokenizers::Tokenizer;

use super::text_prep::prepare_keyword_text;
use super::{Embedding, EmbeddingError, EmbeddingProvider};
use crate::config;

/// The embedding engine holds the loaded model and tokenizer.
pub struct EmbeddingEngine {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
}

impl EmbeddingEngine {
    /// Load the model from a local directory containing model.safetensors,
    /// tokenizer.json, and config.json.
    pub fn load(model_dir: &Path) -> anyhow::Result<Self> {
        let device = Device::Cpu;

        let config_path = model_dir.join("config.json");
        let config_str = std::fs::read_to_string(&config_path)
            .with_context(|| format!("read {}", config_path.display()))?;
        let config: BertConfig = serde_json::from_str(&config_str)
            .with_context(|| format!("parse {}", config_path.display()))?;

        log::info!(
            "Loading embedding model: hidden_size={}, layers={}, heads={}",
            config.hidden_size,
            config.num_hidden_layers,
            config.num_attention_heads,
        );

        if config.hidden_size != config::embedding::EMBEDDING_DIMS {
            bail!(
                "model hidden_size {} does not match expected {} dims",
                config.hidden_size,
                config::embedding::EMBEDDING_DIMS
            );
        }

        let weights_path = model_dir.join("model.safetensors");
        // SAFETY: the weights file is owned by this process's data dir and not mutated while mapped.
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[weights_path.clone()], DType::F32, &device)
                .with_context(|| format!("load weights from {}", weights_path.display()))?
        };

        let model = BertModel::load(vb, &config).context("load BERT model")?;

        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow::anyhow!("load tokenizer: {e}"))?;

        log::info!("Embedding model loaded successfully (dims={})", config.hidden_size);

        Ok(Self {
            model,
            tokenizer,
            device,
        })
    }

    /// Download (if needed) and load the default model.
    pub fn load_default() -> Result<Self, EmbeddingError> {
        let model_dir = super::download::ensure_model_files()
            .map_err(|e| EmbeddingError::Unavailable(format!("{e:#}")))?;
        Self::load(&model_dir).map_err(|e| EmbeddingError::Unavailable(format!("{e:#}")))
    }

    /// Generate a sentence embedding for one keyword.
    fn embed_one(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        let text = prepare_keyword_text(text);
        if text.is_empty() {
            return Ok(vec![0.0; config::embedding::EMBEDDING_DIMS]);
        }

        let encoding = self
            .tokenizer
            .encode(text.as_str(), true)
            .map_err(|e| anyhow::anyhow!("tokenize: {e}"))?;

        let token_ids = encoding.get_ids();
        let attention_mask = encoding.get_attention_mask();

        let len = token_ids.len().min(config::embedding::MAX_TOKENS);
        let token_ids = &token_ids[..len];
        let attention_mask = &attention_mask[..len];

        // [1, seq_len]
        let token_ids_t = Tensor::new(
            token_ids.iter().map(|&id| id as i64).collect::<Vec<_>>().as_slice(),
            &self.device,
        )?
        .unsqueeze(0)?;

        let attention_mask_t = Tensor::new(
            attention_mask.iter().map(|&m| m as i64).collect::<Vec<_>>().as_slice(),
            &self.device,
        )?
        .unsqueeze(0)?;

        let token_type_ids = token_ids_t.zeros_like()?;

        // [1, seq_len, hidden_size]
        let output = self
            .model
            .forward(&token_ids_t, &token_type_ids, Some(&attention_mask_t))?;

        let embedding = mean_pooling(&output, &attention_mask_t)?;
        let embedding = l2_normalize(&embedding)?;

        let emb_vec: Vec<f32> = embedding.squeeze(0)?.to_vec1()?;

        if emb_vec.len() != config::embedding::EMBEDDING_DIMS {
            bail!(
                "unexpected embedding dims: got {}, expected {}",
                emb_vec.len(),
                config::embedding::EMBEDDING_DIMS
            );
        }

        Ok(emb_vec)
    }
}

impl EmbeddingProvider for EmbeddingEngine {
    fn embed(&self, texts: &[String]) -> Result<Vec<Embedding>, EmbeddingError> {
        // One at a time: keyword batches are small and candle batching with
        // variable lengths needs padding bookkeeping we don't need.
        texts
            .iter()
            .map(|t| {
                self.embed_one(t)
                    .map_err(|e| EmbeddingError::Inference(format!("{e:#}")))
            })
            .collect()
    }

    fn model_name(&self) -> &str {
        config::embedding::EMBEDDING_MODEL_NAME
    }

    fn dimensions(&self) -> usize {
        config::embedding::EMBEDDING_DIMS
    }
}

/// Attention-mask-aware mean pooling.
///
/// input_embeds: [batch, seq_len, hidden_size]
/// attention_mask: [batch, seq_len] (1 for real tokens, 0 for padding)
/// output: [batch, hidden_size]
fn mean_pooling(input_embeds: &Tensor, attention_mask: &Tensor) -> anyhow::Result<Tensor> {
    // [batch, seq_len] → [batch, seq_len, hidden]
    let mask_expanded = attention_mask
        .to_dtype(DType::F32)?
        .unsqueeze(2)?
        .broadcast_as(input_embeds.shape())?;

    let sum_embeddings = (input_embeds * &mask_expanded)?.sum(1)?;

    // Clamp to avoid div by zero
    let sum_mask = mask_expanded.sum(1)?.clamp(1e-9, f64::MAX)?;

    Ok((sum_embeddings / sum_mask)?)
}

/// L2 normalize a tensor along the last dimension.
fn l2_normalize(tensor: &Tensor) -> anyhow::Result<Tensor> {
    let norm = tensor.sqr()?.sum_keepdim(1)?.sqrt()?;
    let norm = norm.clamp(1e-12, f64::MAX)?;
    Ok(tensor.broadcast_div(&norm)?)
}
