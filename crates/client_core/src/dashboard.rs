use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::info;
use url::Url;

use crate::{types::ScanRecord, validation::endpoint_url};

pub const LIVE_FEED_PUSH_PATH: &str = "api/dashboard/live-feed/push";
pub const DEFAULT_PUSH_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardUpdate {
    pub record: ScanRecord,
    /// The backend's scan log when validation returned one, otherwise a
    /// locally built `ScanLog`.
    pub scan_log: Value,
}

/// Fire-and-forget sink for newly logged scans.
#[async_trait]
pub trait DashboardNotifier: Send + Sync {
    async fn push(&self, update: &DashboardUpdate) -> Result<()>;
}

pub struct LoggingDashboard;

#[async_trait]
impl DashboardNotifier for LoggingDashboard {
    async fn push(&self, update: &DashboardUpdate) -> Result<()> {
        info!(
            record_id = update.record.id,
            permit_id = %update.record.qr_data,
            gate = %update.record.gate,
            scan_log = %update.scan_log,
            "dashboard: notified with scan log"
        );
        Ok(())
    }
}

pub struct HttpDashboardNotifier {
    http: Client,
    endpoint: Url,
    auth_token: Option<String>,
}

impl HttpDashboardNotifier {
    pub fn new(server_url: &str, auth_token: Option<String>) -> Result<Self> {
        Self::with_timeout(server_url, auth_token, DEFAULT_PUSH_TIMEOUT)
    }

    /// Pushes are spawned without a caller waiting on them, so each request
    /// is bounded by `timeout`.
    pub fn with_timeout(
        server_url: &str,
        auth_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build live feed client")?;
        Ok(Self {
            http,
            endpoint: endpoint_url(server_url, LIVE_FEED_PUSH_PATH)?,
            auth_token,
        })
    }
}

#[async_trait]
impl DashboardNotifier for HttpDashboardNotifier {
    async fn push(&self, update: &DashboardUpdate) -> Result<()> {
        let mut builder = self.http.post(self.endpoint.clone()).json(&update.scan_log);
        if let Some(token) = &self.auth_token {
            builder = builder.bearer_auth(token);
        }
        builder
            .send()
            .await
            .with_context(|| format!("failed to reach live feed at {}", self.endpoint))?
            .error_for_status()?;
        Ok(())
    }
}
