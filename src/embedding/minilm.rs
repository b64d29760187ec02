//! Local sentence embeddings with all-MiniLM-L6-v2.
//!
//! A six-layer BERT encoder run on CPU with candle, followed by mean pooling
//! and L2 normalisation (the sentence-transformers recipe for this model).
//! Weights are read from a safetensors file and the tokenizer from the
//! Hugging Face `tokenizer.json`.

use super::Embedder;
use crate::error::{Result, SvarError};
use async_trait::async_trait;
use candle_core::{DType, Device, Module, Tensor, D};
use candle_nn::{Linear, VarBuilder};
use std::path::Path;
use std::sync::Arc;
use tokenizers::{Tokenizer, TruncationParams};
use tracing::{debug, info, instrument};

/// Output size of all-MiniLM-L6-v2.
pub const MINILM_DIMENSIONS: usize = 384;

/// Sequence length the model was trained with; longer inputs are truncated.
const MAX_SEQ_LEN: usize = 256;

struct MiniLmConfig {
    hidden_size: usize,
    intermediate_size: usize,
    num_attention_heads: usize,
    num_hidden_layers: usize,
    vocab_size: usize,
    max_position_embeddings: usize,
    type_vocab_size: usize,
    layer_norm_eps: f64,
}

impl MiniLmConfig {
    fn all_minilm_l6_v2() -> Self {
        Self {
            hidden_size: MINILM_DIMENSIONS,
            intermediate_size: 1536,
            num_attention_heads: 12,
            num_hidden_layers: 6,
            vocab_size: 30522,
            max_position_embeddings: 512,
            type_vocab_size: 2,
            layer_norm_eps: 1e-12,
        }
    }

    fn head_dim(&self) -> usize {
        self.hidden_size / self.num_attention_heads
    }
}

struct LayerNorm {
    weight: Tensor,
    bias: Tensor,
    eps: f64,
}

impl LayerNorm {
    fn load(vb: VarBuilder, size: usize, eps: f64) -> candle_core::Result<Self> {
        Ok(Self {
            weight: vb.get(size, "weight")?,
            bias: vb.get(size, "bias")?,
            eps,
        })
    }

    fn forward(&self, x: &Tensor) -> candle_core::Result<Tensor> {
        let mean = x.mean_keepdim(D::Minus1)?;
        let centered = x.broadcast_sub(&mean)?;
        let var = centered.sqr()?.mean_keepdim(D::Minus1)?;
        let normed = centered.broadcast_div(&(var + self.eps)?.sqrt()?)?;
        normed.broadcast_mul(&self.weight)?.broadcast_add(&self.bias)
    }
}

struct SelfAttention {
    query: Linear,
    key: Linear,
    value: Linear,
    output: Linear,
    norm: LayerNorm,
    num_heads: usize,
    head_dim: usize,
}

impl SelfAttention {
    fn load(vb: VarBuilder, config: &MiniLmConfig) -> candle_core::Result<Self> {
        let h = config.hidden_size;
        let vb = vb.pp("attention");

        Ok(Self {
            query: candle_nn::linear(h, h, vb.pp("self").pp("query"))?,
            key: candle_nn::linear(h, h, vb.pp("self").pp("key"))?,
            value: candle_nn::linear(h, h, vb.pp("self").pp("value"))?,
            output: candle_nn::linear(h, h, vb.pp("output").pp("dense"))?,
            norm: LayerNorm::load(vb.pp("output").pp("LayerNorm"), h, config.layer_norm_eps)?,
            num_heads: config.num_attention_heads,
            head_dim: config.head_dim(),
        })
    }

    fn split_heads(&self, x: &Tensor, batch: usize, seq_len: usize) -> candle_core::Result<Tensor> {
        x.reshape((batch, seq_len, self.num_heads, self.head_dim))?
            .transpose(1, 2)?
            .contiguous()
    }

    fn forward(&self, x: &Tensor) -> candle_core::Result<Tensor> {
        let (batch, seq_len, _) = x.dims3()?;

        let q = self.split_heads(&self.query.forward(x)?, batch, seq_len)?;
        let k = self.split_heads(&self.key.forward(x)?, batch, seq_len)?;
        let v = self.split_heads(&self.value.forward(x)?, batch, seq_len)?;

        let scale = 1.0 / (self.head_dim as f64).sqrt();
        let weights = q.matmul(&k.t()?)?.affine(scale, 0.0)?;
        let weights = candle_nn::ops::softmax(&weights, D::Minus1)?;

        let context = weights
            .matmul(&v)?
            .transpose(1, 2)?
            .contiguous()?
            .reshape((batch, seq_len, self.num_heads * self.head_dim))?;

        // Residual, then post-norm.
        let out = self.output.forward(&context)?;
        self.norm.forward(&(x + out)?)
    }
}

struct FeedForward {
    up: Linear,
    down: Linear,
    norm: LayerNorm,
}

impl FeedForward {
    fn load(vb: VarBuilder, config: &MiniLmConfig) -> candle_core::Result<Self> {
        Ok(Self {
            up: candle_nn::linear(
                config.hidden_size,
                config.intermediate_size,
                vb.pp("intermediate").pp("dense"),
            )?,
            down: candle_nn::linear(
                config.intermediate_size,
                config.hidden_size,
                vb.pp("output").pp("dense"),
            )?,
            norm: LayerNorm::load(
                vb.pp("output").pp("LayerNorm"),
                config.hidden_size,
                config.layer_norm_eps,
            )?,
        })
    }

    fn forward(&self, x: &Tensor) -> candle_core::Result<Tensor> {
        let h = self.down.forward(&self.up.forward(x)?.gelu_erf()?)?;
        self.norm.forward(&(x + h)?)
    }
}

struct EncoderLayer {
    attention: SelfAttention,
    ffn: FeedForward,
}

impl EncoderLayer {
    fn forward(&self, x: &Tensor) -> candle_core::Result<Tensor> {
        self.ffn.forward(&self.attention.forward(x)?)
    }
}

struct MiniLmModel {
    word_embeddings: Tensor,
    position_embeddings: Tensor,
    token_type_embeddings: Tensor,
    embedding_norm: LayerNorm,
    layers: Vec<EncoderLayer>,
}

impl MiniLmModel {
    fn load(path: &Path, device: &Device) -> candle_core::Result<Self> {
        let config = MiniLmConfig::all_minilm_l6_v2();

        // SAFETY: the weights file is opened read-only and not modified while mapped.
        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&[path], DType::F32, device)? };

        let emb = vb.pp("embeddings");
        let word_embeddings = emb
            .pp("word_embeddings")
            .get((config.vocab_size, config.hidden_size), "weight")?;
        let position_embeddings = emb
            .pp("position_embeddings")
            .get((config.max_position_embeddings, config.hidden_size), "weight")?;
        let token_type_embeddings = emb
            .pp("token_type_embeddings")
            .get((config.type_vocab_size, config.hidden_size), "weight")?;
        let embedding_norm =
            LayerNorm::load(emb.pp("LayerNorm"), config.hidden_size, config.layer_norm_eps)?;

        let layers = (0..config.num_hidden_layers)
            .map(|i| -> candle_core::Result<EncoderLayer> {
                let vb = vb.pp("encoder").pp("layer").pp(i.to_string());
                Ok(EncoderLayer {
                    attention: SelfAttention::load(vb.clone(), &config)?,
                    ffn: FeedForward::load(vb, &config)?,
                })
            })
            .collect::<candle_core::Result<Vec<_>>>()?;

        Ok(Self {
            word_embeddings,
            position_embeddings,
            token_type_embeddings,
            embedding_norm,
            layers,
        })
    }

    fn forward(&self, token_ids: &[u32]) -> candle_core::Result<Vec<f32>> {
        let device = self.word_embeddings.device();
        let seq_len = token_ids.len();

        let ids = Tensor::new(token_ids, device)?;
        let positions: Vec<u32> = (0..seq_len as u32).collect();
        let positions = Tensor::new(positions.as_slice(), device)?;
        let token_types = Tensor::zeros(seq_len, DType::U32, device)?;

        let embedded = ((self.word_embeddings.index_select(&ids, 0)?
            + self.position_embeddings.index_select(&positions, 0)?)?
            + self.token_type_embeddings.index_select(&token_types, 0)?)?;

        let mut hidden = self.embedding_norm.forward(&embedded)?.unsqueeze(0)?;
        for layer in &self.layers {
            hidden = layer.forward(&hidden)?;
        }

        // Mean pooling over tokens, then L2 normalise.
        let pooled = hidden.mean(1)?.squeeze(0)?;
        let norm: f32 = pooled.sqr()?.sum_all()?.sqrt()?.to_scalar()?;
        let pooled = if norm > 0.0 {
            pooled.affine(1.0 / norm as f64, 0.0)?
        } else {
            pooled
        };

        pooled.to_vec1::<f32>()
    }
}

struct Inner {
    model: MiniLmModel,
    tokenizer: Tokenizer,
}

impl Inner {
    fn encode(&self, text: &str) -> Result<Vec<f32>> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| SvarError::Query(format!("Tokenization failed: {}", e)))?;

        self.model
            .forward(encoding.get_ids())
            .map_err(|e| SvarError::Query(format!("MiniLM inference failed: {}", e)))
    }
}

/// Local all-MiniLM-L6-v2 embedder.
#[derive(Clone)]
pub struct MiniLmEmbedder {
    inner: Arc<Inner>,
}

impl MiniLmEmbedder {
    /// Load weights and tokenizer from disk.
    #[instrument]
    pub fn load(model_path: &Path, tokenizer_path: &Path) -> Result<Self> {
        for path in [model_path, tokenizer_path] {
            if !path.exists() {
                return Err(SvarError::ModelUnavailable(format!(
                    "{} not found. Download all-MiniLM-L6-v2 (model.safetensors and tokenizer.json) and point embedding.model_path / embedding.tokenizer_path at them.",
                    path.display()
                )));
            }
        }

        let model = MiniLmModel::load(model_path, &Device::Cpu)
            .map_err(|e| SvarError::ModelUnavailable(format!("Failed to load weights: {}", e)))?;

        let mut tokenizer = Tokenizer::from_file(tokenizer_path)
            .map_err(|e| SvarError::ModelUnavailable(format!("Failed to load tokenizer: {}", e)))?;
        tokenizer.with_padding(None);
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: MAX_SEQ_LEN,
                ..Default::default()
            }))
            .map_err(|e| SvarError::ModelUnavailable(format!("Invalid tokenizer config: {}", e)))?;

        info!("Loaded all-MiniLM-L6-v2 from {:?}", model_path);

        Ok(Self {
            inner: Arc::new(Inner { model, tokenizer }),
        })
    }
}

#[async_trait]
impl Embedder for MiniLmEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let inner = self.inner.clone();
        let text = text.to_string();
        tokio::task::spawn_blocking(move || inner.encode(&text))
            .await
            .map_err(|e| SvarError::Query(format!("Embedding task failed: {}", e)))?
    }

    #[instrument(skip(self, texts), fields(count = texts.len()))]
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let inner = self.inner.clone();
        let texts = texts.to_vec();
        let embeddings = tokio::task::spawn_blocking(move || {
            texts.iter().map(|t| inner.encode(t)).collect::<Result<Vec<_>>>()
        })
        .await
        .map_err(|e| SvarError::Query(format!("Embedding task failed: {}", e)))??;

        debug!("Generated {} embeddings", embeddings.len());
        Ok(embeddings)
    }

    fn dimensions(&self) -> usize {
        MINILM_DIMENSIONS
    }
}
