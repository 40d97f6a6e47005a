pub mod dto;
pub mod errors;
pub mod handlers;

use std::sync::Arc;

use axum::{routing::get, Router};
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;

use crate::db::{DynStore, Store};

use handlers::ApiDoc;

/// Shared handler state: the process-wide store handle.
#[derive(Clone)]
pub struct AppState {
    pub store: DynStore,
}

impl AppState {
    pub fn new(store: impl Store + 'static) -> Self {
        Self {
            store: Arc::new(store),
        }
    }
}

pub fn router(state: AppState) -> Router {
    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .route(
            "/api/sensor_data",
            get(handlers::list_sensor_data).post(handlers::create_sensor_data),
        )
        .route(
            "/api/recommendations",
            get(handlers::list_recommendations).post(handlers::create_recommendation),
        )
        .with_state(state)
        .split_for_parts();

    router
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        .route(
            "/api-docs/openapi.json",
            get(move || async move { axum::Json(api) }),
        )
}
