//! Model hub resolution.
//!
//! Tokenizer, model config and weights are all fetched from one repository,
//! so the tokenizer always matches the model it is paired with. Files are
//! cached locally by `hf-hub`; a second run does not touch the network.

use crate::error::{Error, Result};
use hf_hub::api::sync::{Api, ApiRepo};
use hf_hub::{Cache, Repo, RepoType};
use std::collections::BTreeSet;
use std::path::PathBuf;
use tracing::{debug, info};

const TOKENIZER_FILE: &str = "tokenizer.json";
const CONFIG_FILE: &str = "config.json";
const SHARD_INDEX_FILE: &str = "model.safetensors.index.json";
const SINGLE_WEIGHTS_FILE: &str = "model.safetensors";

/// Local paths of everything needed to build a model and its tokenizer.
#[derive(Debug, Clone)]
pub struct ModelFiles {
    /// Hub identifier the files were resolved from
    pub model_id: String,
    /// `tokenizer.json`
    pub tokenizer: PathBuf,
    /// `config.json`
    pub config: PathBuf,
    /// Safetensors weight files, one or more shards
    pub weights: Vec<PathBuf>,
}

impl ModelFiles {
    /// Resolve (downloading when needed) the files of `model_id` at `revision`.
    pub fn resolve(model_id: &str, revision: &str) -> Result<Self> {
        info!(model_id, revision, "resolving model files");
        let target = Repo::with_revision(
            model_id.to_string(),
            RepoType::Model,
            revision.to_string(),
        );
        let api = Api::new()?;
        let repo = api.repo(target.clone());

        let tokenizer = repo.get(TOKENIZER_FILE)?;
        let config = repo.get(CONFIG_FILE)?;
        let weights = resolve_weights(&repo, &target)?;
        debug!(shards = weights.len(), "weights resolved");

        Ok(Self {
            model_id: model_id.to_string(),
            tokenizer,
            config,
            weights,
        })
    }
}

/// How a repository stores its safetensors weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeightsLayout {
    /// `model.safetensors.index.json` plus the shards it lists
    Sharded,
    /// A single `model.safetensors`
    Single,
}

/// Pick the layout from a repository file listing.
pub fn weights_layout<'a, I>(filenames: I) -> Result<WeightsLayout>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut single = false;
    for name in filenames {
        if name == SHARD_INDEX_FILE {
            return Ok(WeightsLayout::Sharded);
        }
        single |= name == SINGLE_WEIGHTS_FILE;
    }
    if single {
        Ok(WeightsLayout::Single)
    } else {
        Err(Error::Hub(format!(
            "repository has neither {} nor {}",
            SHARD_INDEX_FILE, SINGLE_WEIGHTS_FILE
        )))
    }
}

/// The layout is read from the local cache when an earlier run fetched the
/// weights, otherwise from the repository listing.
fn resolve_weights(repo: &ApiRepo, target: &Repo) -> Result<Vec<PathBuf>> {
    let cached = Cache::default().repo(target.clone());
    let layout = if cached.get(SHARD_INDEX_FILE).is_some() {
        WeightsLayout::Sharded
    } else if cached.get(SINGLE_WEIGHTS_FILE).is_some() {
        WeightsLayout::Single
    } else {
        let info = repo.info()?;
        weights_layout(info.siblings.iter().map(|s| s.rfilename.as_str()))?
    };
    debug!(?layout, "weights layout");

    match layout {
        WeightsLayout::Sharded => {
            let index_path = repo.get(SHARD_INDEX_FILE)?;
            let index: serde_json::Value = serde_json::from_slice(&std::fs::read(index_path)?)?;
            shard_names(&index)?
                .iter()
                .map(|name| repo.get(name).map_err(Error::from))
                .collect()
        }
        WeightsLayout::Single => Ok(vec![repo.get(SINGLE_WEIGHTS_FILE)?]),
    }
}

/// Distinct shard file names listed in a safetensors index, in sorted order.
pub fn shard_names(index: &serde_json::Value) -> Result<Vec<String>> {
    let weight_map = index
        .get("weight_map")
        .and_then(|m| m.as_object())
        .ok_or_else(|| Error::Hub("shard index has no weight_map".to_string()))?;

    let mut names = BTreeSet::new();
    for value in weight_map.values() {
        let name = value
            .as_str()
            .ok_or_else(|| Error::Hub(format!("weight_map entry is not a file name: {}", value)))?;
        names.insert(name.to_string());
    }

    if names.is_empty() {
        return Err(Error::Hub("shard index lists no files".to_string()));
    }
    Ok(names.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_shard_names_dedup_and_sort() {
        let index = json!({
            "metadata": { "total_size": 13476839424u64 },
            "weight_map": {
                "model.layers.0.mlp.up_proj.weight": "model-00002-of-00002.safetensors",
                "model.embed_tokens.weight": "model-00001-of-00002.safetensors",
                "lm_head.weight": "model-00002-of-00002.safetensors"
            }
        });

        let names = shard_names(&index).unwrap();
        assert_eq!(
            names,
            vec![
                "model-00001-of-00002.safetensors".to_string(),
                "model-00002-of-00002.safetensors".to_string(),
            ]
        );
    }

    #[test]
    fn test_layout_prefers_index() {
        let files = [
            "config.json",
            "model-00001-of-00002.safetensors",
            "model.safetensors.index.json",
            "model.safetensors",
        ];
        assert_eq!(weights_layout(files).unwrap(), WeightsLayout::Sharded);
    }

    #[test]
    fn test_layout_single_file() {
        let files = ["config.json", "tokenizer.json", "model.safetensors"];
        assert_eq!(weights_layout(files).unwrap(), WeightsLayout::Single);
    }

    #[test]
    fn test_layout_without_safetensors() {
        let files = ["config.json", "pytorch_model-00001-of-00002.bin", "pytorch_model.bin.index.json"];
        match weights_layout(files) {
            Err(Error::Hub(msg)) => assert!(msg.contains("model.safetensors")),
            other => panic!("expected hub error, got {:?}", other),
        }
    }

    #[test]
    fn test_shard_names_missing_map() {
        let index = json!({ "metadata": {} });
        assert!(matches!(shard_names(&index), Err(Error::Hub(_))));
    }

    #[test]
    fn test_shard_names_empty_map() {
        let index = json!({ "weight_map": {} });
        assert!(shard_names(&index).is_err());
    }

    #[test]
    fn test_shard_names_non_string_entry() {
        let index = json!({ "weight_map": { "lm_head.weight": 3 } });
        assert!(shard_names(&index).is_err());
    }
}
