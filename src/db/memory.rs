use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    models::{NewRecommendation, NewSensorReading, Recommendation, SensorReading},
    Store,
};

/// In-memory [`Store`] for tests. Cheap to clone; clones share the same rows.
#[derive(Clone, Default)]
pub struct MemoryStore {
    sensor_data: Arc<RwLock<Vec<SensorReading>>>,
    recommendations: Arc<RwLock<Vec<Recommendation>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn sensor_data_len(&self) -> usize {
        self.sensor_data.read().await.len()
    }

    pub async fn recommendations_len(&self) -> usize {
        self.recommendations.read().await.len()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_sensor_reading(&self, reading: &NewSensorReading) -> Result<SensorReading> {
        let row = SensorReading {
            id: Uuid::new_v4(),
            soil_moisture: reading.soil_moisture,
            soil_temperature: reading.soil_temperature,
            soil_humidity: reading.soil_humidity,
            soil_ph: reading.soil_ph,
            timestamp: reading.timestamp,
        };
        self.sensor_data.write().await.push(row.clone());
        Ok(row)
    }

    async fn recent_sensor_readings(&self, limit: i64) -> Result<Vec<SensorReading>> {
        let mut rows = self.sensor_data.read().await.clone();
        rows.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        rows.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(rows)
    }

    async fn latest_sensor_reading(&self) -> Result<Option<SensorReading>> {
        Ok(self.recent_sensor_readings(1).await?.into_iter().next())
    }

    async fn insert_recommendation(&self, rec: &NewRecommendation) -> Result<Recommendation> {
        let row = Recommendation {
            id: Uuid::new_v4(),
            recommendation: rec.recommendation.clone(),
            severity: rec.severity,
            timestamp: rec.timestamp,
        };
        self.recommendations.write().await.push(row.clone());
        Ok(row)
    }

    async fn recommendations(&self) -> Result<Vec<Recommendation>> {
        let mut rows = self.recommendations.read().await.clone();
        rows.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(rows)
    }
}
