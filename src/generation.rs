//! Autoregressive generation.

use crate::error::{Error, Result};
use crate::model::CausalLm;
use crate::sampler::Sampler;
use crate::tokenizer::PromptTokenizer;
use tracing::{debug, info};

/// Outcome of one generation run.
#[derive(Debug, Clone, PartialEq)]
pub struct Generation {
    /// Decoded prompt plus continuation, special tokens removed
    pub text: String,
    /// Number of tokens the prompt encoded to
    pub prompt_tokens: usize,
    /// Number of tokens produced after the prompt
    pub new_tokens: usize,
}

/// A loaded model/tokenizer pair ready to continue prompts.
pub struct Generator<M: CausalLm> {
    model: M,
    tokenizer: PromptTokenizer,
    sampler: Sampler,
    max_new_tokens: usize,
    eos_token_ids: Vec<u32>,
}

impl<M: CausalLm> Generator<M> {
    /// Pair a model with its tokenizer.
    ///
    /// End-of-sequence ids come from the model config, falling back to the
    /// tokenizer's vocabulary when the config declares none.
    pub fn new(model: M, tokenizer: PromptTokenizer, sampler: Sampler, max_new_tokens: usize) -> Self {
        let mut eos_token_ids = model.eos_token_ids();
        if eos_token_ids.is_empty() {
            eos_token_ids.extend(tokenizer.eos_token_id());
        }

        Self {
            model,
            tokenizer,
            sampler,
            max_new_tokens,
            eos_token_ids,
        }
    }

    /// Continue `prompt` by at most `max_new_tokens` tokens.
    ///
    /// The returned text is the decoding of the full sequence, so it starts
    /// with the prompt as the tokenizer round-trips it.
    pub fn generate(&mut self, prompt: &str) -> Result<Generation> {
        let mut tokens = self.tokenizer.encode(prompt)?;
        if tokens.is_empty() {
            return Err(Error::InvalidArgument("prompt encoded to no tokens".to_string()));
        }
        let prompt_tokens = tokens.len();

        let max_len = self.model.max_sequence_length();
        if prompt_tokens >= max_len {
            return Err(Error::InvalidArgument(format!(
                "prompt is {} tokens, model accepts at most {}",
                prompt_tokens, max_len
            )));
        }
        let budget = self.max_new_tokens.min(max_len - prompt_tokens);

        self.model.reset()?;
        info!(prompt_tokens, budget, "generating");

        let mut position = 0;
        for step in 0..budget {
            // Prompt goes in whole; afterwards only the newest token
            let context = if step == 0 { &tokens[..] } else { &tokens[tokens.len() - 1..] };
            let mut logits = self.model.forward(context, position)?;
            position += context.len();

            let next = self.sampler.sample(&mut logits)?;
            tokens.push(next);

            if self.eos_token_ids.contains(&next) {
                debug!(step, "end of sequence");
                break;
            }
        }

        let new_tokens = tokens.len() - prompt_tokens;
        let text = self.tokenizer.decode(&tokens)?;
        info!(new_tokens, "generation finished");

        Ok(Generation {
            text,
            prompt_tokens,
            new_tokens,
        })
    }

    /// Configured new-token budget.
    pub fn max_new_tokens(&self) -> usize {
        self.max_new_tokens
    }
}
