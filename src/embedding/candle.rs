//! Local embeddings using Candle (sentence-transformers compatible)
//!
//! The default review model, `sentence-transformers/all-MiniLM-L6-v2`, is a
//! BERT encoder: mean pooling over the attention mask, then L2 normalization.

use std::path::PathBuf;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig, DTYPE};
use hf_hub::{api::sync::Api, Repo, RepoType};
use tokenizers::{PaddingParams, Tokenizer, TruncationParams};
use tracing::info;

/// Rows per forward pass
const FORWARD_BATCH: usize = 32;

/// Local embedding provider using Candle
pub struct CandleEmbedding {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    dimensions: usize,
}

struct ModelFiles {
    config: PathBuf,
    tokenizer: PathBuf,
    weights: PathBuf,
}

impl ModelFiles {
    fn from_dir(dir: &str) -> Self {
        let base = PathBuf::from(dir);
        Self {
            config: base.join("config.json"),
            tokenizer: base.join("tokenizer.json"),
            weights: base.join("model.safetensors"),
        }
    }

    fn from_hub(model_name: &str) -> anyhow::Result<Self> {
        let api = Api::new()?;
        let repo = api.repo(Repo::new(model_name.to_string(), RepoType::Model));
        Ok(Self {
            config: repo.get("config.json")?,
            tokenizer: repo.get("tokenizer.json")?,
            weights: repo
                .get("model.safetensors")
                .or_else(|_| repo.get("pytorch_model.bin"))?,
        })
    }
}

impl CandleEmbedding {
    /// Load a BERT-family model from a local directory or the HuggingFace Hub.
    ///
    /// With `use_gpu` the first CUDA device is used when the crate was built
    /// with the `cuda` feature and a device is present; otherwise the CPU.
    pub fn new(
        model_name: String,
        model_path: Option<String>,
        use_gpu: bool,
        token_limit: usize,
    ) -> anyhow::Result<Self> {
        info!("Loading local embedding model: {}", model_name);

        let device = if use_gpu {
            Device::cuda_if_available(0)?
        } else {
            Device::Cpu
        };

        let files = match model_path.as_deref() {
            Some(dir) => ModelFiles::from_dir(dir),
            None => ModelFiles::from_hub(&model_name)?,
        };

        let config: BertConfig = serde_json::from_str(&std::fs::read_to_string(&files.config)?)?;

        let mut tokenizer = Tokenizer::from_file(&files.tokenizer)
            .map_err(|e| anyhow::anyhow!("Failed to load tokenizer: {}", e))?;
        tokenizer.with_padding(Some(PaddingParams::default()));
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: token_limit,
                ..TruncationParams::default()
            }))
            .map_err(|e| anyhow::anyhow!("Failed to configure truncation: {}", e))?;

        let is_safetensors = files.weights.extension().is_some_and(|e| e == "safetensors");
        let vb = if is_safetensors {
            // SAFETY: the weights file is not modified while mapped
            unsafe { VarBuilder::from_mmaped_safetensors(&[files.weights], DTYPE, &device)? }
        } else {
            VarBuilder::from_pth(files.weights, DTYPE, &device)?
        };
        let model = BertModel::load(vb, &config)?;

        info!("Loaded model: {} dims on {:?}", config.hidden_size, device);

        Ok(Self {
            model,
            tokenizer,
            device,
            dimensions: config.hidden_size,
        })
    }

    /// Get embedding dimensions
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Compute embeddings for texts
    pub fn embed(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for batch in texts.chunks(FORWARD_BATCH) {
            out.extend(self.forward(batch)?);
        }
        Ok(out)
    }

    fn forward(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| anyhow::anyhow!("Tokenization failed: {}", e))?;

        let stack = |field: fn(&tokenizers::Encoding) -> &[u32]| -> anyhow::Result<Tensor> {
            let rows = encodings
                .iter()
                .map(|e| Tensor::new(field(e), &self.device))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Tensor::stack(&rows, 0)?)
        };

        let input_ids = stack(|e| e.get_ids())?;
        let type_ids = stack(|e| e.get_type_ids())?;
        let mask = stack(|e| e.get_attention_mask())?;

        let hidden = self.model.forward(&input_ids, &type_ids, Some(&mask))?;

        // Mean over real tokens only
        let mask = mask.to_dtype(hidden.dtype())?.unsqueeze(2)?;
        let summed = hidden.broadcast_mul(&mask)?.sum(1)?;
        let counts = mask.sum(1)?.clamp(1e-9, f64::INFINITY)?;
        let pooled = summed.broadcast_div(&counts)?;

        let norms = pooled.sqr()?.sum_keepdim(1)?.sqrt()?.clamp(1e-12, f64::INFINITY)?;
        let normalized = pooled.broadcast_div(&norms)?.to_dtype(DType::F32)?;

        Ok(normalized.to_vec2::<f32>()?)
    }
}
