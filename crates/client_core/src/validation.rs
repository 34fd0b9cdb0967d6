use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use shared::protocol::{ValidateScanRequest, ValidateScanResponse};
use tracing::debug;
use url::Url;

use crate::error::ValidationError;

pub const VALIDATE_PATH: &str = "api/qr/validate";

#[async_trait]
pub trait ScanValidator: Send + Sync {
    async fn validate(
        &self,
        request: &ValidateScanRequest,
    ) -> Result<ValidateScanResponse, ValidationError>;
}

/// Used when no backend is configured; every scan takes the transport fallback.
pub struct MissingScanValidator;

#[async_trait]
impl ScanValidator for MissingScanValidator {
    async fn validate(
        &self,
        _request: &ValidateScanRequest,
    ) -> Result<ValidateScanResponse, ValidationError> {
        Err(ValidationError::Transport(
            "validation endpoint is unavailable".to_string(),
        ))
    }
}

pub(crate) fn endpoint_url(server_url: &str, path: &str) -> Result<Url> {
    let mut base = Url::parse(server_url.trim())
        .with_context(|| format!("invalid server url '{server_url}'"))?;
    if !matches!(base.scheme(), "http" | "https") {
        return Err(anyhow!("server_url must start with http:// or https://"));
    }
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join(path)
        .with_context(|| format!("failed to build endpoint '{path}' from '{server_url}'"))
}

pub struct HttpScanValidator {
    http: Client,
    endpoint: Url,
    auth_token: Option<String>,
}

impl HttpScanValidator {
    pub fn new(server_url: &str, auth_token: Option<String>) -> Result<Self> {
        Self::with_client(Client::new(), server_url, auth_token)
    }

    pub fn with_client(http: Client, server_url: &str, auth_token: Option<String>) -> Result<Self> {
        Ok(Self {
            http,
            endpoint: endpoint_url(server_url, VALIDATE_PATH)?,
            auth_token,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl ScanValidator for HttpScanValidator {
    async fn validate(
        &self,
        request: &ValidateScanRequest,
    ) -> Result<ValidateScanResponse, ValidationError> {
        let mut builder = self.http.post(self.endpoint.clone()).json(request);
        if let Some(token) = &self.auth_token {
            builder = builder.bearer_auth(token);
        }
        let response = builder.send().await?;

        // Rejections arrive with 4xx statuses but still carry the JSON envelope.
        let status = response.status();
        let body = response.bytes().await?;
        debug!(%status, bytes = body.len(), permit_id = %request.permit_id, "validate: response received");
        serde_json::from_slice::<ValidateScanResponse>(&body)
            .map_err(|err| ValidationError::Decode(format!("status {status}: {err}")))
    }
}

#[cfg(test)]
#[path = "tests/validation_tests.rs"]
mod tests;
