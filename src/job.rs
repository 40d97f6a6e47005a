use anyhow::{Context, Result};
use chrono::Local;
use reqwest::Client;
use serde::Serialize;
use tracing::{error, info};

use crate::{
    advisor::{AdvisorClient, Analysis, SoilSnapshot},
    config::JobConfig,
    db::{models::Severity, DynStore, Store},
};

/// How a single job run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The store holds no sensor readings yet.
    NoReading,
    /// The completion call failed or returned nothing usable.
    NoRecommendation,
    /// The recommendation was generated but the API rejected or never got it.
    SubmitFailed(Analysis),
    Submitted(Analysis),
}

#[derive(Debug, Serialize)]
struct SubmitBody<'a> {
    recommendation: &'a str,
    severity: Severity,
}

/// Reads the latest reading, asks the advisor for a recommendation and posts
/// it to the API service. Runs once per process invocation.
pub struct RecommendationJob {
    store: DynStore,
    advisor: AdvisorClient,
    http: Client,
    recommendations_url: String,
}

impl RecommendationJob {
    pub fn new(store: DynStore, config: &JobConfig) -> Self {
        Self {
            store,
            advisor: AdvisorClient::new(config),
            http: Client::new(),
            recommendations_url: config.recommendations_url.clone(),
        }
    }

    /// Only store failures are returned as errors; every other failure is
    /// logged and reported through [`Outcome`].
    pub async fn run_once(&self) -> Result<Outcome> {
        info!(
            "Running maize soil analyzer @ {}",
            Local::now().format("%Y-%m-%d %H:%M:%S")
        );

        let Some(reading) = self
            .store
            .latest_sensor_reading()
            .await
            .context("failed to read the latest sensor reading")?
        else {
            info!("No data. Exiting.");
            return Ok(Outcome::NoReading);
        };
        info!(id = %reading.id, timestamp = %reading.timestamp, "Analyzing latest sensor reading");

        let snapshot = SoilSnapshot::from(&reading);
        let Some(analysis) = self.advisor.analyze(Some(&snapshot)).await else {
            error!("AI failed to generate recommendation.");
            return Ok(Outcome::NoRecommendation);
        };

        info!(severity = %analysis.severity, "Severity: {}\n{}", analysis.severity, analysis.recommendation);

        match self.submit(&analysis).await {
            Ok(()) => {
                info!("Recommendation sent successfully.");
                Ok(Outcome::Submitted(analysis))
            }
            Err(e) => {
                error!(error = %format!("{e:#}"), "Error sending recommendation");
                Ok(Outcome::SubmitFailed(analysis))
            }
        }
    }

    async fn submit(&self, analysis: &Analysis) -> Result<()> {
        let body = SubmitBody {
            recommendation: &analysis.recommendation,
            severity: analysis.severity,
        };

        self.http
            .post(&self.recommendations_url)
            .json(&body)
            .send()
            .await
            .context("recommendation submission failed")?
            .error_for_status()
            .context("recommendations endpoint returned error status")?;

        Ok(())
    }
}
