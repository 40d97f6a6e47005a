pub mod format;
pub mod models;

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use reqwest::Client;
use tracing::{debug, error, info, warn};

use crate::{
    config::JobConfig,
    db::models::{SensorReading, Severity},
    severity,
};

use self::models::{ChatRequest, ChatResponse};

/// Model used for every completion request.
pub const MODEL: &str = "mistralai/mistral-small-3.1-24b-instruct:free";
const APP_TITLE: &str = "AgroBot Soil Analysis";

// ---------------------------------------------------------------------------
// SoilSnapshot
// ---------------------------------------------------------------------------

/// The readings handed to the advisor. Any field may be missing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SoilSnapshot {
    pub soil_moisture: Option<f64>,
    pub soil_temperature: Option<f64>,
    pub soil_humidity: Option<f64>,
    pub soil_ph: Option<f64>,
    pub timestamp: Option<DateTime<Utc>>,
}

impl SoilSnapshot {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub fn severity(&self) -> Severity {
        severity::determine_severity(
            self.soil_moisture,
            self.soil_temperature,
            self.soil_humidity,
            self.soil_ph,
        )
    }
}

impl From<&SensorReading> for SoilSnapshot {
    fn from(r: &SensorReading) -> Self {
        Self {
            soil_moisture: Some(r.soil_moisture),
            soil_temperature: Some(r.soil_temperature),
            soil_humidity: Some(r.soil_humidity),
            soil_ph: Some(r.soil_ph),
            timestamp: Some(r.timestamp),
        }
    }
}

/// A formatted recommendation and the locally computed severity.
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    pub recommendation: String,
    pub severity: Severity,
}

// ---------------------------------------------------------------------------
// AdvisorClient
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct AdvisorClient {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    http: Client,
    endpoint: String,
    api_key: String,
    referer: Option<String>,
}

impl AdvisorClient {
    pub fn new(config: &JobConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                http: Client::new(),
                endpoint: config.llm_api_url.clone(),
                api_key: config.llm_api_key.clone(),
                referer: config.llm_referer.clone(),
            }),
        }
    }

    /// Send `prompt` as a single user message and return the first choice's
    /// text. `Ok(None)` means the provider answered without any choices.
    ///
    /// One attempt only; the client's default timeout applies.
    pub async fn complete(&self, prompt: &str) -> Result<Option<String>> {
        debug!(endpoint = %self.inner.endpoint, model = MODEL, "Requesting completion");

        let mut request = self
            .inner
            .http
            .post(&self.inner.endpoint)
            .bearer_auth(&self.inner.api_key)
            .header("X-Title", APP_TITLE)
            .json(&ChatRequest::user(MODEL, prompt));
        if let Some(referer) = &self.inner.referer {
            request = request.header("HTTP-Referer", referer);
        }

        let resp = request
            .send()
            .await
            .context("completion request failed")?
            .error_for_status()
            .context("completion endpoint returned error status")?
            .json::<ChatResponse>()
            .await
            .context("failed to deserialize completion response")?;

        Ok(resp.first_text())
    }

    /// Turn a snapshot into a formatted recommendation plus severity.
    ///
    /// Returns `None` without any network traffic when there is nothing to
    /// analyze, and `None` (after logging) when the completion call fails.
    pub async fn analyze(&self, snapshot: Option<&SoilSnapshot>) -> Option<Analysis> {
        let snapshot = match snapshot {
            Some(s) if !s.is_empty() => s,
            _ => {
                info!("No soil data to analyze");
                return None;
            }
        };

        let prompt = format::build_prompt(snapshot);
        let raw = match self.complete(&prompt).await {
            Ok(Some(text)) => text,
            Ok(None) => {
                warn!("Completion response contained no choices");
                return None;
            }
            Err(e) => {
                error!(error = %format!("{e:#}"), "Error generating AI recommendation");
                return None;
            }
        };

        let cleaned = format::clean_format(&raw);
        Some(Analysis {
            recommendation: format::extract_summary(&cleaned),
            severity: snapshot.severity(),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
