//! # promptgen
//!
//! Continue a text prompt with a pretrained causal language model.
//!
//! The tokenizer and weights are resolved from the Hugging Face hub under one
//! model id, the weights run on candle (CUDA or Metal when available, CPU
//! otherwise), and the decoded sequence, prompt included, is returned as a
//! string. A remote completion endpoint can stand in for the local model.

pub mod config;
pub mod device;
pub mod error;
pub mod generation;
pub mod hub;
pub mod model;
pub mod remote;
pub mod sampler;
pub mod tokenizer;

pub use config::Settings;
pub use error::{Error, Result};
pub use generation::{Generation, Generator};
pub use hub::ModelFiles;
pub use model::{CausalLm, LlamaModel};
pub use remote::RemoteBackend;
pub use sampler::Sampler;
pub use tokenizer::PromptTokenizer;

/// Resolve, download and load the model and tokenizer named by `settings`.
///
/// This is the one-time, blocking part of a run. The returned generator can
/// continue any number of prompts.
///
/// # Example
/// ```no_run
/// use promptgen::{load_generator, Settings};
///
/// let settings = Settings::default();
/// let mut generator = load_generator(&settings).unwrap();
/// let generation = generator.generate("日本の首都は").unwrap();
/// println!("{}", generation.text);
/// ```
pub fn load_generator(settings: &Settings) -> Result<Generator<LlamaModel>> {
    settings.validate()?;

    let files = ModelFiles::resolve(&settings.model_name, &settings.revision)?;
    let device = device::select_device(settings.force_cpu)?;
    let tokenizer = PromptTokenizer::from_file(&files.tokenizer)?;
    let model = LlamaModel::load(&files, &settings.dtype, &device)?;
    let sampler = Sampler::new(settings.temperature, settings.top_p, settings.seed);

    Ok(Generator::new(model, tokenizer, sampler, settings.max_new_tokens))
}
