use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;
use uuid::Uuid;

use super::errors::AppError;
use crate::db::models::{Recommendation, SensorReading, Severity};

// ---------------------------------------------------------------------------
// Read models
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SensorReadingDto {
    pub id: Uuid,
    /// Percent
    pub soil_moisture: f64,
    /// Degrees Celsius
    pub soil_temperature: f64,
    /// Relative humidity percentage
    pub soil_humidity: f64,
    pub soil_ph: f64,
    pub timestamp: DateTime<Utc>,
}

impl From<SensorReading> for SensorReadingDto {
    fn from(r: SensorReading) -> Self {
        Self {
            id: r.id,
            soil_moisture: r.soil_moisture,
            soil_temperature: r.soil_temperature,
            soil_humidity: r.soil_humidity,
            soil_ph: r.soil_ph,
            timestamp: r.timestamp,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RecommendationDto {
    pub id: Uuid,
    pub recommendation: String,
    pub severity: Severity,
    pub timestamp: DateTime<Utc>,
}

impl From<Recommendation> for RecommendationDto {
    fn from(r: Recommendation) -> Self {
        Self {
            id: r.id,
            recommendation: r.recommendation,
            severity: r.severity,
            timestamp: r.timestamp,
        }
    }
}

// ---------------------------------------------------------------------------
// Write models
//
// Bodies are read as loose JSON and validated by hand: numeric fields accept
// numbers or numeric strings, and missing fields are reported all at once.
// ---------------------------------------------------------------------------

/// Request body for `POST /api/sensor_data`.
///
/// The short keys `moisture`, `temperature`, `humidity` and `ph` are accepted
/// as aliases.
#[derive(Debug, Clone, PartialEq, ToSchema)]
pub struct SensorDataRequest {
    pub soil_moisture: f64,
    pub soil_temperature: f64,
    pub soil_humidity: f64,
    /// Drawn uniformly from [6.5, 7.5] when omitted.
    pub soil_ph: Option<f64>,
}

const SENSOR_FIELDS: [(&str, &str); 3] = [
    ("soil_moisture", "moisture"),
    ("soil_temperature", "temperature"),
    ("soil_humidity", "humidity"),
];

const NOT_NUMERIC: &str = "Invalid data format (values must be numbers)";

impl SensorDataRequest {
    pub fn from_json(body: &Value) -> Result<Self, AppError> {
        let obj = non_empty_object(body)?;

        let missing: Vec<&'static str> = SENSOR_FIELDS
            .iter()
            .filter(|(name, alias)| field(obj, name, alias).is_none())
            .map(|(name, _)| *name)
            .collect();
        if !missing.is_empty() {
            return Err(AppError::MissingFields(missing));
        }

        let number = |name: &str, alias: &str| {
            field(obj, name, alias)
                .and_then(as_number)
                .ok_or(AppError::InvalidFormat(NOT_NUMERIC))
        };

        let soil_ph = match field(obj, "soil_ph", "ph") {
            None | Some(Value::Null) => None,
            Some(v) => Some(as_number(v).ok_or(AppError::InvalidFormat(NOT_NUMERIC))?),
        };

        Ok(Self {
            soil_moisture: number("soil_moisture", "moisture")?,
            soil_temperature: number("soil_temperature", "temperature")?,
            soil_humidity: number("soil_humidity", "humidity")?,
            soil_ph,
        })
    }
}

/// Request body for `POST /api/recommendations`.
#[derive(Debug, Clone, PartialEq, ToSchema)]
pub struct RecommendationRequest {
    pub recommendation: String,
    /// One of `low`, `medium`, `high`; case-insensitive.
    pub severity: String,
}

impl RecommendationRequest {
    pub fn from_json(body: &Value) -> Result<Self, AppError> {
        let obj = non_empty_object(body)?;

        let missing: Vec<&'static str> = ["recommendation", "severity"]
            .into_iter()
            .filter(|name| !obj.contains_key(*name))
            .collect();
        if !missing.is_empty() {
            return Err(AppError::MissingFields(missing));
        }

        Ok(Self {
            recommendation: as_text(&obj["recommendation"]),
            severity: as_text(&obj["severity"]),
        })
    }

    pub fn severity(&self) -> Result<Severity, AppError> {
        let normalized = self.severity.to_lowercase();
        normalized
            .parse()
            .map_err(|_| AppError::InvalidSeverity(normalized))
    }
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SensorDataCreated {
    pub message: String,
    pub id: Uuid,
    /// The pH that was stored.
    pub soil_ph: f64,
    /// Present only when the caller omitted `soil_ph`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_soil_ph: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RecommendationCreated {
    pub message: String,
    pub id: Uuid,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn non_empty_object(body: &Value) -> Result<&Map<String, Value>, AppError> {
    match body.as_object() {
        Some(obj) if !obj.is_empty() => Ok(obj),
        _ => Err(AppError::NoData),
    }
}

fn field<'a>(obj: &'a Map<String, Value>, name: &str, alias: &str) -> Option<&'a Value> {
    obj.get(name).or_else(|| obj.get(alias))
}

fn as_number(v: &Value) -> Option<f64> {
    let n = match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

fn as_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
