//! Candle-based sentence embedder
//!
//! Runs a BERT sentence-embedding model locally: hf-hub download, forward
//! pass, attention-mask mean pooling, L2 normalization. No external API
//! calls at inference time.

use crate::embedder::Embedder;
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config};
use hf_hub::api::sync::ApiBuilder;
use maillens_core::{Error, Result};
use tokenizers::Tokenizer;
use tracing::info;

/// Sentence embedder backed by a Candle BERT model.
pub struct CandleEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    dimension: usize,
    model_name: String,
}

impl CandleEmbedder {
    /// Load a sentence-transformers model from the Hugging Face Hub.
    ///
    /// Weights are cached under `HF_HOME` (or `~/.cache/huggingface`); the
    /// first call downloads them. Any failure here is an
    /// [`Error::Embedding`] — callers recover by running in heuristic mode.
    pub fn new(model_name: &str) -> Result<Self> {
        let device = Device::cuda_if_available(0)
            .map_err(|e| Error::embedding(format!("Device setup failed: {e}")))?;

        let cache_dir = std::env::var("HF_HOME")
            .or_else(|_| std::env::var("HOME").map(|home| format!("{home}/.cache/huggingface")))
            .unwrap_or_else(|_| "/tmp/huggingface".to_string());

        let api = ApiBuilder::new()
            .with_cache_dir(cache_dir.into())
            .build()
            .map_err(|e| Error::embedding(format!("HF API initialization failed: {e}")))?;
        let repo = api.model(model_name.to_string());

        let config_filename = repo
            .get("config.json")
            .map_err(|e| Error::embedding(format!("Config download failed: {e}")))?;
        let config_str = std::fs::read_to_string(config_filename)?;
        let config: Config = serde_json::from_str(&config_str)
            .map_err(|e| Error::embedding(format!("Config parse failed: {e}")))?;

        let weights_filename = repo
            .get("model.safetensors")
            .map_err(|e| Error::embedding(format!("Weights download failed: {e}")))?;
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[weights_filename], DType::F32, &device)
                .map_err(|e| Error::embedding(format!("VarBuilder creation failed: {e}")))?
        };

        let model = BertModel::load(vb, &config)
            .map_err(|e| Error::embedding(format!("Model load failed: {e}")))?;

        let tokenizer_filename = repo
            .get("tokenizer.json")
            .map_err(|e| Error::embedding(format!("Tokenizer download failed: {e}")))?;
        let tokenizer = Tokenizer::from_file(tokenizer_filename)
            .map_err(|e| Error::embedding(format!("Tokenizer load failed: {e}")))?;

        let dimension = config.hidden_size;
        info!(model = model_name, dimension, "Loaded embedding model");

        Ok(Self {
            model,
            tokenizer,
            device,
            dimension,
            model_name: model_name.to_string(),
        })
    }

    /// Mean-pool token embeddings, weighting by the attention mask so
    /// padding tokens do not contribute.
    fn mean_pool(&self, embeddings: &Tensor, attention_mask: &Tensor) -> Result<Tensor> {
        let mask_expanded = attention_mask
            .unsqueeze(2)
            .and_then(|m| m.expand(embeddings.shape()))
            .and_then(|m| m.to_dtype(embeddings.dtype()))
            .map_err(|e| Error::embedding(e.to_string()))?;

        let sum_embeddings = embeddings
            .mul(&mask_expanded)
            .and_then(|m| m.sum(1))
            .map_err(|e| Error::embedding(e.to_string()))?;

        let sum_mask = mask_expanded
            .sum(1)
            .map_err(|e| Error::embedding(e.to_string()))?;

        sum_embeddings
            .div(&sum_mask)
            .map_err(|e| Error::embedding(e.to_string()))
    }
}

impl Embedder for CandleEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| Error::embedding(format!("Tokenization failed: {e}")))?;

        let token_ids = encoding.get_ids();
        let attention_mask = encoding.get_attention_mask();

        let token_ids = Tensor::new(token_ids, &self.device)
            .and_then(|t| t.unsqueeze(0))
            .map_err(|e| Error::embedding(format!("Tensor creation failed: {e}")))?;
        let attention_mask = Tensor::new(attention_mask, &self.device)
            .and_then(|t| t.unsqueeze(0))
            .map_err(|e| Error::embedding(e.to_string()))?;
        let token_type_ids = token_ids
            .zeros_like()
            .map_err(|e| Error::embedding(e.to_string()))?;

        let embeddings = self
            .model
            .forward(&token_ids, &token_type_ids, Some(&attention_mask))
            .map_err(|e| Error::embedding(format!("Model forward failed: {e}")))?;

        let pooled = self.mean_pool(&embeddings, &attention_mask)?;

        // L2 normalize so downstream cosine reduces to a dot product
        let norm = pooled
            .sqr()
            .and_then(|t| t.sum_all())
            .and_then(|t| t.sqrt())
            .and_then(|t| t.to_scalar::<f32>())
            .map_err(|e| Error::embedding(e.to_string()))?;
        let normalized = pooled
            .affine((1.0 / norm.max(f32::EPSILON)) as f64, 0.0)
            .map_err(|e| Error::embedding(e.to_string()))?;

        normalized
            .squeeze(0)
            .and_then(|t| t.to_vec1())
            .map_err(|e| Error::embedding(e.to_string()))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        &self.model_name
    }
}
