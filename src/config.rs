//! Run settings.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

/// Pretrained model used for both the tokenizer and the weights.
pub const DEFAULT_MODEL_NAME: &str = "rinna/youri-7b";

/// Hub revision used when none is configured.
pub const DEFAULT_REVISION: &str = "main";

/// Token budget for a single generation.
pub const DEFAULT_MAX_NEW_TOKENS: usize = 128;

/// Where `local_framework = "ollama"` sends prompts when no endpoint is set.
pub const DEFAULT_OLLAMA_ENDPOINT: &str = "http://localhost:11434/api/generate";

/// Accepted `local_framework` values. "python" names the in-process hub
/// pipeline, which candle runs here.
const LOCAL_FRAMEWORKS: [&str; 3] = ["candle", "python", "ollama"];

/// Settings for one generation run.
///
/// Every field has a default, so a settings file only needs the keys it
/// overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Hub identifier shared by tokenizer and model
    pub model_name: String,

    /// Hub revision (branch, tag or commit)
    pub revision: String,

    /// Maximum number of tokens generated after the prompt
    #[serde(alias = "max_tokens")]
    pub max_new_tokens: usize,

    /// Weight dtype: "f16", "bf16" or "f32"
    pub dtype: String,

    /// Sampling temperature (0.0 = greedy)
    pub temperature: f32,

    /// Top-p (nucleus) threshold, used when temperature > 0
    pub top_p: f32,

    /// Sampler seed
    pub seed: u64,

    /// Run the model locally; when false the prompt goes to `endpoint`
    pub use_local_model: bool,

    /// Local runner: in-process ("candle", "python") or a local Ollama server
    pub local_framework: Option<String>,

    /// Remote completion endpoint
    pub endpoint: Option<String>,

    /// Use the OpenAI completion request/response shape
    pub openai_compatible: bool,

    /// Bearer token for the remote endpoint
    pub api_key: Option<String>,

    /// Skip accelerator detection and run on the CPU
    pub force_cpu: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            model_name: DEFAULT_MODEL_NAME.to_string(),
            revision: DEFAULT_REVISION.to_string(),
            max_new_tokens: DEFAULT_MAX_NEW_TOKENS,
            dtype: "f16".to_string(),
            temperature: 0.0,
            top_p: 0.9,
            seed: 299_792_458,
            use_local_model: true,
            local_framework: None,
            endpoint: None,
            openai_compatible: false,
            api_key: None,
            force_cpu: false,
        }
    }
}

impl Settings {
    /// Load settings from a JSON file, writing the defaults there first if the
    /// file does not exist yet.
    ///
    /// The result is not validated; callers apply their overrides first and
    /// then call [`Settings::validate`].
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            info!(path = %path.display(), "settings file not found, writing defaults");
            let defaults = serde_json::to_string_pretty(&Settings::default())?;
            fs::write(path, defaults)?;
        }

        let data = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    /// Local run handed to an Ollama server.
    pub fn uses_ollama(&self) -> bool {
        self.use_local_model && self.local_framework.as_deref() == Some("ollama")
    }

    /// The model runs in this process on candle.
    pub fn runs_in_process(&self) -> bool {
        self.use_local_model && !self.uses_ollama()
    }

    /// Endpoint prompts are sent to, if the run is not in-process.
    pub fn remote_endpoint(&self) -> Option<String> {
        if self.uses_ollama() {
            Some(
                self.endpoint
                    .clone()
                    .unwrap_or_else(|| DEFAULT_OLLAMA_ENDPOINT.to_string()),
            )
        } else if self.use_local_model {
            None
        } else {
            self.endpoint.clone()
        }
    }

    /// Validate the settings for consistency
    pub fn validate(&self) -> Result<()> {
        if self.model_name.trim().is_empty() {
            return Err(Error::InvalidConfig("model_name must not be empty".to_string()));
        }
        if self.revision.trim().is_empty() {
            return Err(Error::InvalidConfig("revision must not be empty".to_string()));
        }
        if self.max_new_tokens == 0 {
            return Err(Error::InvalidConfig("max_new_tokens must be > 0".to_string()));
        }
        if !self.temperature.is_finite() || self.temperature < 0.0 {
            return Err(Error::InvalidConfig("temperature must be >= 0".to_string()));
        }
        if !(0.0..=1.0).contains(&self.top_p) {
            return Err(Error::InvalidConfig("top_p must be within [0, 1]".to_string()));
        }
        if !matches!(self.dtype.as_str(), "f16" | "bf16" | "f32") {
            return Err(Error::InvalidConfig(format!("unsupported dtype {}", self.dtype)));
        }
        if let Some(framework) = &self.local_framework {
            if !LOCAL_FRAMEWORKS.contains(&framework.as_str()) {
                return Err(Error::InvalidConfig(format!(
                    "unsupported local_framework {}",
                    framework
                )));
            }
        }
        if !self.use_local_model && self.endpoint.is_none() {
            return Err(Error::InvalidConfig(
                "endpoint is required when use_local_model is false".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_are_valid() {
        let settings = Settings::default();

        assert!(settings.validate().is_ok());
        assert_eq!(settings.model_name, DEFAULT_MODEL_NAME);
        assert_eq!(settings.max_new_tokens, 128);
        assert!(settings.use_local_model);
    }

    #[test]
    fn test_invalid_settings() {
        let mut settings = Settings::default();
        settings.max_new_tokens = 0; // Invalid
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.model_name = "  ".to_string();
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.temperature = -0.1;
        assert!(settings.validate().is_err());
        settings.temperature = f32::NAN;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.local_framework = Some("vllm".to_string());
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.top_p = 1.5;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.dtype = "int8".to_string();
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.use_local_model = false;
        assert!(settings.validate().is_err());
        settings.endpoint = Some("http://localhost:11434/api/generate".to_string());
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_load_creates_default_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");

        let settings = Settings::load_or_create(&path).unwrap();

        assert!(path.exists());
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "max_new_tokens": 32, "temperature": 0.7 }"#).unwrap();

        let settings = Settings::load_or_create(&path).unwrap();

        assert_eq!(settings.max_new_tokens, 32);
        assert_eq!(settings.temperature, 0.7);
        assert_eq!(settings.model_name, DEFAULT_MODEL_NAME);
    }

    #[test]
    fn test_legacy_default_config_runs_in_process() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{
                "model_name": "rinna/nekomata-7b",
                "endpoint": null,
                "use_local_model": true,
                "local_framework": "python",
                "openai_compatible": false,
                "max_tokens": 128,
                "api_key": null
            }"#,
        )
        .unwrap();

        let settings = Settings::load_or_create(&path).unwrap();

        assert!(settings.validate().is_ok());
        assert_eq!(settings.model_name, "rinna/nekomata-7b");
        assert_eq!(settings.max_new_tokens, 128);
        assert!(settings.runs_in_process());
        assert_eq!(settings.remote_endpoint(), None);
    }

    #[test]
    fn test_local_ollama_uses_default_endpoint() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{
                "model_name": "llama3",
                "endpoint": null,
                "use_local_model": true,
                "local_framework": "ollama",
                "openai_compatible": false,
                "max_tokens": 64,
                "api_key": null
            }"#,
        )
        .unwrap();

        let settings = Settings::load_or_create(&path).unwrap();

        assert!(settings.validate().is_ok());
        assert_eq!(settings.max_new_tokens, 64);
        assert!(settings.uses_ollama());
        assert!(!settings.runs_in_process());
        assert_eq!(
            settings.remote_endpoint().as_deref(),
            Some(DEFAULT_OLLAMA_ENDPOINT)
        );
    }

    #[test]
    fn test_load_does_not_validate() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "top_p": 3.0 }"#).unwrap();

        let settings = Settings::load_or_create(&path).unwrap();

        assert_eq!(settings.top_p, 3.0);
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_malformed_file_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(matches!(
            Settings::load_or_create(&path),
            Err(Error::InvalidConfig(_))
        ));
    }
}
