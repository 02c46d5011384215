//! Text <-> token id conversion backed by a hub `tokenizer.json`.

use crate::error::{Error, Result};
use std::path::Path;
use tracing::debug;

/// End-of-sequence markers tried, in order, when the model config names none.
const EOS_CANDIDATES: [&str; 3] = ["</s>", "<|endoftext|>", "<eos>"];

/// Tokenizer for prompts and generated sequences.
pub struct PromptTokenizer {
    inner: tokenizers::Tokenizer,
}

impl PromptTokenizer {
    /// Load a tokenizer from a `tokenizer.json` file.
    pub fn from_file<P: AsRef<Path>>(tokenizer_path: P) -> Result<Self> {
        let inner = tokenizers::Tokenizer::from_file(tokenizer_path.as_ref())
            .map_err(|e| Error::Tokenizer(e.to_string()))?;
        debug!(vocab_size = inner.get_vocab_size(true), "tokenizer loaded");
        Ok(Self { inner })
    }

    /// Encode text, adding the special tokens the tokenizer's template asks
    /// for (typically BOS).
    pub fn encode(&self, text: &str) -> Result<Vec<u32>> {
        let encoding = self
            .inner
            .encode(text, true)
            .map_err(|e| Error::Tokenizer(e.to_string()))?;
        Ok(encoding.get_ids().to_vec())
    }

    /// Decode ids back to text with special tokens removed.
    pub fn decode(&self, tokens: &[u32]) -> Result<String> {
        self.inner
            .decode(tokens, true)
            .map_err(|e| Error::Tokenizer(e.to_string()))
    }

    /// Id of the first known end-of-sequence token in the vocabulary.
    pub fn eos_token_id(&self) -> Option<u32> {
        EOS_CANDIDATES
            .iter()
            .find_map(|token| self.inner.token_to_id(token))
    }
}

impl From<tokenizers::Tokenizer> for PromptTokenizer {
    fn from(inner: tokenizers::Tokenizer) -> Self {
        Self { inner }
    }
}

/// A word-level tokenizer that prepends `<s>`, for tests that need a real
/// `tokenizers::Tokenizer` without network access.
#[cfg(test)]
pub(crate) fn word_level_fixture() -> PromptTokenizer {
    use std::str::FromStr;

    let json = r#"{
        "version": "1.0",
        "truncation": null,
        "padding": null,
        "added_tokens": [
            {"id": 0, "content": "<unk>", "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true},
            {"id": 1, "content": "<s>", "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true},
            {"id": 2, "content": "</s>", "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true}
        ],
        "normalizer": null,
        "pre_tokenizer": {"type": "Whitespace"},
        "post_processor": {
            "type": "TemplateProcessing",
            "single": [
                {"SpecialToken": {"id": "<s>", "type_id": 0}},
                {"Sequence": {"id": "A", "type_id": 0}}
            ],
            "pair": [
                {"SpecialToken": {"id": "<s>", "type_id": 0}},
                {"Sequence": {"id": "A", "type_id": 0}},
                {"Sequence": {"id": "B", "type_id": 1}}
            ],
            "special_tokens": {
                "<s>": {"id": "<s>", "ids": [1], "tokens": ["<s>"]}
            }
        },
        "decoder": null,
        "model": {
            "type": "WordLevel",
            "vocab": {
                "<unk>": 0, "<s>": 1, "</s>": 2,
                "hello": 3, "world": 4, "the": 5, "cat": 6, "sat": 7
            },
            "unk_token": "<unk>"
        }
    }"#;

    let inner = tokenizers::Tokenizer::from_str(json).expect("fixture tokenizer json");
    PromptTokenizer::from(inner)
}
