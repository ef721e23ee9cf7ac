use shared::domain::CorrelationKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PredictionError {
    #[error("{0}")]
    Transport(#[source] reqwest::Error),
    #[error("{message}")]
    Rejected { status: u16, message: String },
    #[error("invalid prediction response: {0}")]
    Decode(#[source] reqwest::Error),
}

#[derive(Debug, Error)]
pub enum ImageLoadError {
    #[error("failed to fetch {kind} correlation matrix: {source}")]
    Transport {
        kind: CorrelationKind,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to fetch {kind} correlation matrix: HTTP {status}")]
    Status { kind: CorrelationKind, status: u16 },
    #[error("{kind} correlation matrix response was empty")]
    Empty { kind: CorrelationKind },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid server url '{url}': {reason}")]
    InvalidServerUrl { url: String, reason: String },
}

/// User-visible outcome of a failed prediction. Replaces any prior result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct RequestError {
    pub message: String,
}

impl RequestError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<&PredictionError> for RequestError {
    fn from(value: &PredictionError) -> Self {
        Self::new(value.to_string())
    }
}
