//! HTTP access to the prediction backend.

use async_trait::async_trait;
use reqwest::Client;
use shared::{
    domain::CorrelationKind,
    error::ApiErrorBody,
    protocol::{FeatureSnapshot, HealthResponse, PredictionResult},
};
use tracing::debug;
use url::Url;

use crate::{
    config::normalize_server_url,
    error::{ConfigError, ImageLoadError, PredictionError},
};

#[async_trait]
pub trait DiagnosisBackend: Send + Sync {
    async fn predict(&self, snapshot: &FeatureSnapshot)
        -> Result<PredictionResult, PredictionError>;
    async fn fetch_correlation(&self, kind: CorrelationKind) -> Result<Vec<u8>, ImageLoadError>;
}

pub struct HttpBackend {
    http: Client,
    base_url: Url,
    predict_url: Url,
    correlation_urls: [Url; 4],
}

impl HttpBackend {
    pub fn new(server_url: &str) -> Result<Self, ConfigError> {
        Self::with_client(Client::new(), server_url)
    }

    pub fn with_client(http: Client, server_url: &str) -> Result<Self, ConfigError> {
        let base_url = normalize_server_url(server_url)?;
        let join = |path: &str| {
            base_url
                .join(path)
                .map_err(|err| ConfigError::InvalidServerUrl {
                    url: server_url.to_string(),
                    reason: err.to_string(),
                })
        };
        let predict_url = join("predict")?;
        let correlation_urls = [
            join(&CorrelationKind::Global.path())?,
            join(&CorrelationKind::Mean.path())?,
            join(&CorrelationKind::Worst.path())?,
            join(&CorrelationKind::Error.path())?,
        ];
        Ok(Self {
            http,
            base_url,
            predict_url,
            correlation_urls,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn correlation_url(&self, kind: CorrelationKind) -> &Url {
        &self.correlation_urls[kind.index()]
    }

    /// Probe the backend root route and return its status message.
    pub async fn health(&self) -> Result<String, reqwest::Error> {
        let response: HealthResponse = self
            .http
            .get(self.base_url.clone())
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(response.message)
    }
}

#[async_trait]
impl DiagnosisBackend for HttpBackend {
    async fn predict(
        &self,
        snapshot: &FeatureSnapshot,
    ) -> Result<PredictionResult, PredictionError> {
        let response = self
            .http
            .post(self.predict_url.clone())
            .json(snapshot)
            .send()
            .await
            .map_err(PredictionError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            let message = match response.json::<ApiErrorBody>().await {
                Ok(body) => body.into_message(),
                Err(err) => {
                    debug!("prediction error body unreadable: {err}");
                    ApiErrorBody { error: None }.into_message()
                }
            };
            return Err(PredictionError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        response.json().await.map_err(PredictionError::Decode)
    }

    async fn fetch_correlation(&self, kind: CorrelationKind) -> Result<Vec<u8>, ImageLoadError> {
        let response = self
            .http
            .get(self.correlation_url(kind).clone())
            .send()
            .await
            .map_err(|source| ImageLoadError::Transport { kind, source })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ImageLoadError::Status {
                kind,
                status: status.as_u16(),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|source| ImageLoadError::Transport { kind, source })?;
        if bytes.is_empty() {
            return Err(ImageLoadError::Empty { kind });
        }
        Ok(bytes.to_vec())
    }
}
