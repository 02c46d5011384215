//! Error types for the promptgen crate.

use std::fmt;

/// Result type alias for operations that can fail.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for every stage of a generation run.
#[derive(Debug)]
pub enum Error {
    /// I/O errors (config files, weight files)
    Io(std::io::Error),

    /// Invalid run settings
    InvalidConfig(String),

    /// Tokenizer loading, encoding or decoding errors
    Tokenizer(String),

    /// Model construction or weight loading errors
    ModelLoad(String),

    /// Model hub resolution or download errors
    Hub(String),

    /// Runtime inference errors
    Inference(String),

    /// Remote completion endpoint errors
    Remote(String),

    /// Invalid arguments or parameters
    InvalidArgument(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(err) => write!(f, "I/O error: {}", err),
            Error::InvalidConfig(msg) => write!(f, "Invalid configuration: {}", msg),
            Error::Tokenizer(msg) => write!(f, "Tokenizer error: {}", msg),
            Error::ModelLoad(msg) => write!(f, "Model loading error: {}", msg),
            Error::Hub(msg) => write!(f, "Model hub error: {}", msg),
            Error::Inference(msg) => write!(f, "Inference error: {}", msg),
            Error::Remote(msg) => write!(f, "Remote backend error: {}", msg),
            Error::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Inference(err.to_string())
    }
}

impl From<candle_core::Error> for Error {
    fn from(err: candle_core::Error) -> Self {
        Error::Inference(err.to_string())
    }
}

impl From<hf_hub::api::sync::ApiError> for Error {
    fn from(err: hf_hub::api::sync::ApiError) -> Self {
        Error::Hub(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::InvalidConfig(err.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Remote(err.to_string())
    }
}
