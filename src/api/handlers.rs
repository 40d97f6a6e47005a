use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use rand::Rng;
use serde_json::Value;
use tracing::{info, warn};
use utoipa::OpenApi;

use super::{
    dto::{
        ErrorBody, RecommendationCreated, RecommendationDto, RecommendationRequest,
        SensorDataCreated, SensorDataRequest, SensorReadingDto,
    },
    errors::AppError,
    AppState,
};
use crate::db::{
    models::{NewRecommendation, NewSensorReading, Severity},
    Store,
};

/// Maximum rows returned by `GET /api/sensor_data`.
pub const SENSOR_DATA_LIMIT: i64 = 50;

/// Bounds of the uniform draw used when a reading arrives without a pH.
pub const FALLBACK_PH_MIN: f64 = 6.5;
pub const FALLBACK_PH_MAX: f64 = 7.5;

fn synthesize_ph() -> f64 {
    rand::rng().random_range(FALLBACK_PH_MIN..=FALLBACK_PH_MAX)
}

/// Unwrap a JSON body, treating any rejection as "no data".
fn json_body(body: Result<Json<Value>, JsonRejection>) -> Result<Value, AppError> {
    match body {
        Ok(Json(value)) => Ok(value),
        Err(rejection) => {
            warn!(reason = %rejection.body_text(), "No JSON data received");
            Err(AppError::NoData)
        }
    }
}

// ---------------------------------------------------------------------------
// Sensor data
// ---------------------------------------------------------------------------

/// Store one soil reading. The server assigns the timestamp and, when the
/// caller omits `soil_ph`, a pH drawn uniformly from [6.5, 7.5].
#[utoipa::path(
    post,
    path = "/api/sensor_data",
    request_body = SensorDataRequest,
    responses(
        (status = 201, description = "Reading stored", body = SensorDataCreated),
        (status = 400, description = "Missing or non-numeric fields", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody),
    ),
    tag = "sensor_data"
)]
pub async fn create_sensor_data(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<SensorDataCreated>), AppError> {
    let req = SensorDataRequest::from_json(&json_body(body)?)?;

    let generated_soil_ph = req.soil_ph.is_none().then(synthesize_ph);
    let soil_ph = req.soil_ph.or(generated_soil_ph).unwrap_or_default();

    let row = state
        .store
        .insert_sensor_reading(&NewSensorReading {
            soil_moisture: req.soil_moisture,
            soil_temperature: req.soil_temperature,
            soil_humidity: req.soil_humidity,
            soil_ph,
            timestamp: Utc::now(),
        })
        .await?;

    info!(id = %row.id, soil_ph, generated = generated_soil_ph.is_some(), "Data inserted");

    Ok((
        StatusCode::CREATED,
        Json(SensorDataCreated {
            message: "Data received and stored successfully".to_owned(),
            id: row.id,
            soil_ph,
            generated_soil_ph,
        }),
    ))
}

/// The 50 most recent readings, newest first.
#[utoipa::path(
    get,
    path = "/api/sensor_data",
    responses(
        (status = 200, description = "Recent sensor readings", body = Vec<SensorReadingDto>),
        (status = 500, description = "Internal server error", body = ErrorBody),
    ),
    tag = "sensor_data"
)]
pub async fn list_sensor_data(
    State(state): State<AppState>,
) -> Result<Json<Vec<SensorReadingDto>>, AppError> {
    let rows = state.store.recent_sensor_readings(SENSOR_DATA_LIMIT).await?;
    info!(count = rows.len(), "Retrieved sensor data");
    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

// ---------------------------------------------------------------------------
// Recommendations
// ---------------------------------------------------------------------------

#[utoipa::path(
    post,
    path = "/api/recommendations",
    request_body = RecommendationRequest,
    responses(
        (status = 201, description = "Recommendation stored", body = RecommendationCreated),
        (status = 400, description = "Missing fields or invalid severity", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody),
    ),
    tag = "recommendations"
)]
pub async fn create_recommendation(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<RecommendationCreated>), AppError> {
    let req = RecommendationRequest::from_json(&json_body(body)?)?;
    let severity: Severity = req.severity()?;

    let row = state
        .store
        .insert_recommendation(&NewRecommendation {
            recommendation: req.recommendation,
            severity,
            timestamp: Utc::now(),
        })
        .await?;

    info!(id = %row.id, severity = %row.severity, "Recommendation inserted");

    Ok((
        StatusCode::CREATED,
        Json(RecommendationCreated {
            message: "Recommendation received and stored successfully".to_owned(),
            id: row.id,
        }),
    ))
}

/// Every stored recommendation, newest first.
#[utoipa::path(
    get,
    path = "/api/recommendations",
    responses(
        (status = 200, description = "All recommendations", body = Vec<RecommendationDto>),
        (status = 500, description = "Internal server error", body = ErrorBody),
    ),
    tag = "recommendations"
)]
pub async fn list_recommendations(
    State(state): State<AppState>,
) -> Result<Json<Vec<RecommendationDto>>, AppError> {
    let rows = state.store.recommendations().await?;
    info!(count = rows.len(), "Retrieved recommendations");
    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

// ---------------------------------------------------------------------------
// System
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/",
    responses((status = 200, description = "Welcome banner", body = String)),
    tag = "system"
)]
pub async fn index() -> &'static str {
    "Welcome to the Soil Sensor Monitoring API!"
}

/// Returns `200 OK` with `{"status":"ok"}` when the server is running.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy"),
    ),
    tag = "system"
)]
pub async fn health() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({ "status": "ok" }))
}

// ---------------------------------------------------------------------------
// OpenAPI spec
// ---------------------------------------------------------------------------

#[derive(OpenApi)]
#[openapi(
    paths(
        create_sensor_data,
        list_sensor_data,
        create_recommendation,
        list_recommendations,
        index,
        health
    ),
    components(schemas(
        SensorReadingDto,
        SensorDataRequest,
        SensorDataCreated,
        RecommendationDto,
        RecommendationRequest,
        RecommendationCreated,
        ErrorBody,
        Severity
    )),
    tags(
        (name = "sensor_data",     description = "Soil sensor readings"),
        (name = "recommendations", description = "Agronomic recommendations"),
        (name = "system",          description = "System endpoints"),
    ),
    info(
        title = "Soil Advisor API",
        version = "0.1.0",
        description = "REST API for soil sensor readings and maize recommendations"
    )
)]
pub struct ApiDoc;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use chrono::{Duration, Utc};
    use serde_json::{json, Value};

    use crate::{
        api::{router, AppState},
        db::{
            memory::MemoryStore,
            models::{NewRecommendation, NewSensorReading, Recommendation, SensorReading, Severity},
            Store,
        },
    };

    fn test_server(store: impl Store + 'static) -> TestServer {
        TestServer::new(router(AppState::new(store))).unwrap()
    }

    async fn insert_reading(store: &MemoryStore, moisture: f64, minutes_ago: i64) {
        store
            .insert_sensor_reading(&NewSensorReading {
                soil_moisture: moisture,
                soil_temperature: 20.0,
                soil_humidity: 55.0,
                soil_ph: 6.9,
                timestamp: Utc::now() - Duration::minutes(minutes_ago),
            })
            .await
            .unwrap();
    }

    async fn insert_recommendation(store: &MemoryStore, text: &str, minutes_ago: i64) {
        store
            .insert_recommendation(&NewRecommendation {
                recommendation: text.to_owned(),
                severity: Severity::Low,
                timestamp: Utc::now() - Duration::minutes(minutes_ago),
            })
            .await
            .unwrap();
    }

    fn timestamps(body: &[Value]) -> Vec<chrono::DateTime<Utc>> {
        body.iter()
            .map(|r| r["timestamp"].as_str().unwrap().parse().unwrap())
            .collect()
    }

    /// A store whose every operation fails, as if the database were down.
    struct BrokenStore;

    #[async_trait]
    impl Store for BrokenStore {
        async fn insert_sensor_reading(&self, _: &NewSensorReading) -> Result<SensorReading> {
            Err(anyhow!("connection refused"))
        }
        async fn recent_sensor_readings(&self, _: i64) -> Result<Vec<SensorReading>> {
            Err(anyhow!("connection refused"))
        }
        async fn latest_sensor_reading(&self) -> Result<Option<SensorReading>> {
            Err(anyhow!("connection refused"))
        }
        async fn insert_recommendation(&self, _: &NewRecommendation) -> Result<Recommendation> {
            Err(anyhow!("connection refused"))
        }
        async fn recommendations(&self) -> Result<Vec<Recommendation>> {
            Err(anyhow!("connection refused"))
        }
    }

    // -----------------------------------------------------------------------
    // POST /api/sensor_data
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn sensor_data_without_ph_gets_generated_ph() {
        let store = MemoryStore::new();
        let server = test_server(store.clone());

        let resp = server
            .post("/api/sensor_data")
            .json(&json!({ "moisture": 65, "temperature": 22, "humidity": 60 }))
            .await;
        resp.assert_status(StatusCode::CREATED);

        let body: Value = resp.json();
        let ph = body["generated_soil_ph"].as_f64().unwrap();
        assert!((6.5..=7.5).contains(&ph), "pH {ph} out of range");
        assert_eq!(body["soil_ph"].as_f64().unwrap(), ph);
        assert!(body["id"].as_str().is_some());

        let rows = store.recent_sensor_readings(10).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].soil_moisture, 65.0);
        assert_eq!(rows[0].soil_ph, ph);
        assert_eq!(rows[0].id.to_string(), body["id"].as_str().unwrap());
    }

    #[tokio::test]
    async fn sensor_data_keeps_supplied_ph() {
        let store = MemoryStore::new();
        let server = test_server(store.clone());

        let resp = server
            .post("/api/sensor_data")
            .json(&json!({
                "soil_moisture": "70",
                "soil_temperature": 18.5,
                "soil_humidity": 52,
                "soil_ph": 5.2,
            }))
            .await;
        resp.assert_status(StatusCode::CREATED);

        let body: Value = resp.json();
        assert_eq!(body["soil_ph"], 5.2);
        assert!(body.get("generated_soil_ph").is_none());
        assert_eq!(store.recent_sensor_readings(1).await.unwrap()[0].soil_ph, 5.2);
    }

    #[tokio::test]
    async fn sensor_data_missing_fields_is_bad_request() {
        let store = MemoryStore::new();
        let server = test_server(store.clone());

        let resp = server
            .post("/api/sensor_data")
            .json(&json!({ "soil_moisture": 65 }))
            .await;
        resp.assert_status(StatusCode::BAD_REQUEST);

        let body: Value = resp.json();
        assert_eq!(
            body["error"],
            r#"Missing fields: ["soil_temperature", "soil_humidity"]"#
        );
        assert_eq!(store.sensor_data_len().await, 0);
    }

    #[tokio::test]
    async fn sensor_data_non_numeric_is_bad_request() {
        let store = MemoryStore::new();
        let server = test_server(store.clone());

        let resp = server
            .post("/api/sensor_data")
            .json(&json!({ "soil_moisture": "damp", "soil_temperature": 20, "soil_humidity": 50 }))
            .await;
        resp.assert_status(StatusCode::BAD_REQUEST);

        let body: Value = resp.json();
        assert_eq!(body["error"], "Invalid data format (values must be numbers)");
        assert_eq!(store.sensor_data_len().await, 0);
    }

    #[tokio::test]
    async fn sensor_data_without_json_is_bad_request() {
        let server = test_server(MemoryStore::new());

        let resp = server.post("/api/sensor_data").text("moisture=65").await;
        resp.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = resp.json();
        assert_eq!(body["error"], "No data provided");

        let resp = server.post("/api/sensor_data").json(&json!({})).await;
        resp.assert_status(StatusCode::BAD_REQUEST);
    }

    // -----------------------------------------------------------------------
    // GET /api/sensor_data
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn sensor_data_empty_returns_empty_array() {
        let server = test_server(MemoryStore::new());
        let resp = server.get("/api/sensor_data").await;
        resp.assert_status_ok();
        let body: Value = resp.json();
        assert_eq!(body, json!([]));
    }

    #[tokio::test]
    async fn sensor_data_is_newest_first_and_capped_at_50() {
        let store = MemoryStore::new();
        // Interleave ages so insertion order differs from timestamp order.
        for i in 0..60 {
            let minutes_ago = if i % 2 == 0 { i } else { 120 - i };
            insert_reading(&store, 60.0 + i as f64 / 10.0, minutes_ago).await;
        }

        let server = test_server(store);
        let resp = server.get("/api/sensor_data").await;
        resp.assert_status_ok();

        let body: Vec<Value> = resp.json();
        assert_eq!(body.len(), 50);
        let ts = timestamps(&body);
        assert!(ts.windows(2).all(|w| w[0] > w[1]), "not strictly descending");
    }

    // -----------------------------------------------------------------------
    // POST /api/recommendations
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn recommendation_severity_is_normalized() {
        let store = MemoryStore::new();
        let server = test_server(store.clone());

        let resp = server
            .post("/api/recommendations")
            .json(&json!({ "recommendation": "Irrigate today.", "severity": "HIGH" }))
            .await;
        resp.assert_status(StatusCode::CREATED);

        let body: Value = resp.json();
        assert_eq!(body["message"], "Recommendation received and stored successfully");

        let rows = store.recommendations().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].severity, Severity::High);
        assert_eq!(rows[0].recommendation, "Irrigate today.");
        assert_eq!(rows[0].id.to_string(), body["id"].as_str().unwrap());
    }

    #[tokio::test]
    async fn recommendation_unknown_severity_is_rejected() {
        let store = MemoryStore::new();
        let server = test_server(store.clone());

        let resp = server
            .post("/api/recommendations")
            .json(&json!({ "recommendation": "Irrigate today.", "severity": "urgent" }))
            .await;
        resp.assert_status(StatusCode::BAD_REQUEST);

        let body: Value = resp.json();
        assert_eq!(
            body["error"],
            r#"Severity must be one of ["high", "medium", "low"]"#
        );
        assert_eq!(store.recommendations_len().await, 0);
    }

    #[tokio::test]
    async fn recommendation_missing_fields_is_bad_request() {
        let server = test_server(MemoryStore::new());

        let resp = server
            .post("/api/recommendations")
            .json(&json!({ "text": "water" }))
            .await;
        resp.assert_status(StatusCode::BAD_REQUEST);

        let body: Value = resp.json();
        assert_eq!(body["error"], r#"Missing fields: ["recommendation", "severity"]"#);
    }

    // -----------------------------------------------------------------------
    // GET /api/recommendations
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn recommendations_are_all_returned_newest_first() {
        let store = MemoryStore::new();
        for (text, minutes_ago) in [("b", 20), ("a", 30), ("d", 0), ("c", 10)] {
            insert_recommendation(&store, text, minutes_ago).await;
        }
        for i in 0..60 {
            insert_recommendation(&store, "old", 100 + i).await;
        }

        let server = test_server(store);
        let resp = server.get("/api/recommendations").await;
        resp.assert_status_ok();

        let body: Vec<Value> = resp.json();
        assert_eq!(body.len(), 64);
        let first: Vec<&str> = body[..4]
            .iter()
            .map(|r| r["recommendation"].as_str().unwrap())
            .collect();
        assert_eq!(first, ["d", "c", "b", "a"]);
        assert_eq!(body[0]["severity"], "low");
        let ts = timestamps(&body);
        assert!(ts.windows(2).all(|w| w[0] > w[1]), "not strictly descending");
    }

    // -----------------------------------------------------------------------
    // Store failures
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn store_failure_is_generic_internal_error() {
        let server = test_server(BrokenStore);

        let resp = server.get("/api/sensor_data").await;
        resp.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = resp.json();
        assert_eq!(body, json!({ "error": "Internal server error" }));

        let resp = server
            .post("/api/recommendations")
            .json(&json!({ "recommendation": "x", "severity": "low" }))
            .await;
        resp.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = resp.json();
        assert_eq!(body["error"], "Internal server error");
    }

    // -----------------------------------------------------------------------
    // System routes
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn index_returns_welcome_text() {
        let server = test_server(MemoryStore::new());
        let resp = server.get("/").await;
        resp.assert_status_ok();
        resp.assert_text("Welcome to the Soil Sensor Monitoring API!");
    }

    #[tokio::test]
    async fn health_returns_ok() {
        let server = test_server(MemoryStore::new());
        let resp = server.get("/health").await;
        resp.assert_status_ok();
        let body: Value = resp.json();
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn openapi_spec_is_served() {
        let server = test_server(MemoryStore::new());
        let resp = server.get("/api-docs/openapi.json").await;
        resp.assert_status_ok();
        let body: Value = resp.json();
        assert_eq!(body["info"]["title"], "Soil Advisor API");
        assert!(body["paths"]["/api/sensor_data"]["post"].is_object());
        assert!(body["paths"]["/api/recommendations"]["get"].is_object());
    }

    #[tokio::test]
    async fn openapi_documents_request_bodies() {
        let server = test_server(MemoryStore::new());
        let body: Value = server.get("/api-docs/openapi.json").await.json();
        let schemas = &body["components"]["schemas"];
        assert!(schemas["SensorDataRequest"]["properties"]["soil_moisture"].is_object());
        assert!(schemas["RecommendationRequest"]["properties"]["severity"].is_object());
        assert_eq!(
            body["paths"]["/api/sensor_data"]["post"]["requestBody"]["content"]["application/json"]
                ["schema"]["$ref"],
            "#/components/schemas/SensorDataRequest"
        );
    }
}
