pub mod models;

#[cfg(test)]
pub mod memory;

use std::{str::FromStr, sync::Arc};

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::PgPool;

use crate::config::StoreConfig;

use self::models::{NewRecommendation, NewSensorReading, Recommendation, SensorReading};

/// Connect to the hosted store and verify the connection is usable.
///
/// The access key from `STORE_KEY` overrides any password embedded in the URL.
pub async fn create_pool(store: &StoreConfig) -> Result<PgPool> {
    let options = PgConnectOptions::from_str(&store.url)
        .context("STORE_URL is not a valid Postgres connection URL")?
        .password(&store.key);

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect_with(options)
        .await
        .context("failed to connect to the store")?;

    sqlx::query("SELECT 1")
        .execute(&pool)
        .await
        .context("store connection check failed")?;

    Ok(pool)
}

pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Persistence operations used by the HTTP handlers and the recommendation job.
///
/// Every listing is ordered newest first by `timestamp`.
#[async_trait]
pub trait Store: Send + Sync {
    async fn insert_sensor_reading(&self, reading: &NewSensorReading) -> Result<SensorReading>;

    async fn recent_sensor_readings(&self, limit: i64) -> Result<Vec<SensorReading>>;

    async fn latest_sensor_reading(&self) -> Result<Option<SensorReading>>;

    async fn insert_recommendation(&self, rec: &NewRecommendation) -> Result<Recommendation>;

    async fn recommendations(&self) -> Result<Vec<Recommendation>>;
}

pub type DynStore = Arc<dyn Store>;

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn insert_sensor_reading(&self, reading: &NewSensorReading) -> Result<SensorReading> {
        let row = sqlx::query_as::<_, SensorReading>(
            r#"
            INSERT INTO sensor_data
                (soil_moisture, soil_temperature, soil_humidity, soil_ph, "timestamp")
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, soil_moisture, soil_temperature, soil_humidity, soil_ph, "timestamp"
            "#,
        )
        .bind(reading.soil_moisture)
        .bind(reading.soil_temperature)
        .bind(reading.soil_humidity)
        .bind(reading.soil_ph)
        .bind(reading.timestamp)
        .fetch_one(&self.pool)
        .await
        .context("insert into sensor_data failed")?;

        Ok(row)
    }

    async fn recent_sensor_readings(&self, limit: i64) -> Result<Vec<SensorReading>> {
        let rows = sqlx::query_as::<_, SensorReading>(
            r#"
            SELECT id, soil_moisture, soil_temperature, soil_humidity, soil_ph, "timestamp"
            FROM sensor_data
            ORDER BY "timestamp" DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("select from sensor_data failed")?;

        Ok(rows)
    }

    async fn latest_sensor_reading(&self) -> Result<Option<SensorReading>> {
        Ok(self.recent_sensor_readings(1).await?.into_iter().next())
    }

    async fn insert_recommendation(&self, rec: &NewRecommendation) -> Result<Recommendation> {
        let row = sqlx::query_as::<_, Recommendation>(
            r#"
            INSERT INTO recommendations (recommendation, severity, "timestamp")
            VALUES ($1, $2, $3)
            RETURNING id, recommendation, severity, "timestamp"
            "#,
        )
        .bind(&rec.recommendation)
        .bind(rec.severity)
        .bind(rec.timestamp)
        .fetch_one(&self.pool)
        .await
        .context("insert into recommendations failed")?;

        Ok(row)
    }

    async fn recommendations(&self) -> Result<Vec<Recommendation>> {
        let rows = sqlx::query_as::<_, Recommendation>(
            r#"
            SELECT id, recommendation, severity, "timestamp"
            FROM recommendations
            ORDER BY "timestamp" DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("select from recommendations failed")?;

        Ok(rows)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
