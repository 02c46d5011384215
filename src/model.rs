//! Causal language models.

use crate::device::parse_dtype;
use crate::error::{Error, Result};
use crate::hub::ModelFiles;
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::llama::{Cache, Config, Llama, LlamaConfig, LlamaEosToks};
use tracing::info;

/// A model that produces next-token logits for a growing sequence.
///
/// Callers feed the whole prompt first at position 0, then one token at a
/// time at the running position; implementations keep whatever cache they
/// need between calls until [`CausalLm::reset`].
pub trait CausalLm {
    /// Run `tokens` starting at sequence position `position` and return the
    /// logits of the last position as `f32`.
    fn forward(&mut self, tokens: &[u32], position: usize) -> Result<Vec<f32>>;

    /// End-of-sequence ids declared by the model config.
    fn eos_token_ids(&self) -> Vec<u32>;

    /// Longest sequence the model accepts.
    fn max_sequence_length(&self) -> usize;

    /// Drop cached state so the next call starts a new sequence.
    fn reset(&mut self) -> Result<()>;
}

/// Llama-architecture model running on candle.
pub struct LlamaModel {
    model: Llama,
    cache: Cache,
    config: Config,
    dtype: DType,
    device: Device,
}

impl LlamaModel {
    /// Build the model from hub files, memory-mapping the safetensors weights.
    pub fn load(files: &ModelFiles, dtype: &str, device: &Device) -> Result<Self> {
        let dtype = parse_dtype(dtype)?;
        let raw = std::fs::read(&files.config)?;
        let llama_config: LlamaConfig = serde_json::from_slice(&raw)
            .map_err(|e| Error::ModelLoad(format!("config.json: {}", e)))?;
        let config = llama_config.into_config(false);

        info!(
            model_id = %files.model_id,
            layers = config.num_hidden_layers,
            vocab_size = config.vocab_size,
            ?dtype,
            "loading weights"
        );
        // SAFETY: the weight files are not modified while mapped
        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&files.weights, dtype, device) }
            .map_err(|e| Error::ModelLoad(e.to_string()))?;
        let model = Llama::load(vb, &config).map_err(|e| Error::ModelLoad(e.to_string()))?;
        let cache = Cache::new(true, dtype, &config, device)?;

        Ok(Self {
            model,
            cache,
            config,
            dtype,
            device: device.clone(),
        })
    }
}

impl CausalLm for LlamaModel {
    fn forward(&mut self, tokens: &[u32], position: usize) -> Result<Vec<f32>> {
        let input = Tensor::new(tokens, &self.device)?.unsqueeze(0)?;
        let logits = self.model.forward(&input, position, &mut self.cache)?;
        let logits = logits.squeeze(0)?.to_dtype(DType::F32)?;
        Ok(logits.to_vec1::<f32>()?)
    }

    fn eos_token_ids(&self) -> Vec<u32> {
        match &self.config.eos_token_id {
            Some(LlamaEosToks::Single(id)) => vec![*id],
            Some(LlamaEosToks::Multiple(ids)) => ids.clone(),
            None => Vec::new(),
        }
    }

    fn max_sequence_length(&self) -> usize {
        self.config.max_position_embeddings
    }

    fn reset(&mut self) -> Result<()> {
        self.cache = Cache::new(true, self.dtype, &self.config, &self.device)?;
        Ok(())
    }
}
