//! One run of the recommendation job.
//!
//! Reads the newest sensor reading from the store, asks the completion API
//! for advice, scores severity locally and posts the result to the API
//! service. Meant to be started by cron or a scheduler; it never loops.

use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use soil_advisor::{
    config::JobConfig,
    db::{self, PgStore},
    job::{Outcome, RecommendationJob},
};

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = JobConfig::from_env()?;
    let pool = db::create_pool(&config.store).await?;

    let job = RecommendationJob::new(Arc::new(PgStore::new(pool.clone())), &config);
    let outcome = job.run_once().await;
    pool.close().await;

    match outcome? {
        Outcome::Submitted(analysis) => {
            info!(severity = %analysis.severity, "Job finished");
        }
        other => {
            info!(outcome = ?other, "Job finished without submitting");
        }
    }

    Ok(())
}
