//! HTTP API
//!
//! `GET /api/health`, `GET /api/classes` and `POST /api/recommend` over a
//! shared, read-only `RecommendationService`.

use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::errors::RecommendError;
use crate::request::RecommendationRequest;
use crate::service::RecommendationService;

type SharedService = Arc<RecommendationService>;

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    service: &'static str,
}

#[derive(Debug, Serialize)]
struct ClassesResponse {
    soil_types: Vec<String>,
    crop_types: Vec<String>,
    fertilizers: Vec<String>,
}

#[derive(Debug, Serialize)]
struct RecommendResponse {
    fertilizer: String,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new<S: Into<String>>(status: StatusCode, message: S) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl From<RecommendError> for ApiError {
    fn from(err: RecommendError) -> Self {
        if err.is_client_error() {
            Self::new(StatusCode::UNPROCESSABLE_ENTITY, err.to_string())
        } else {
            error!("Prediction failed: {}", err);
            Self::new(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let payload = Json(ErrorResponse {
            error: self.message,
        });
        (self.status, payload).into_response()
    }
}

pub fn router(service: SharedService) -> Router {
    Router::new()
        .route("/api/health", get(handle_health))
        .route("/api/classes", get(handle_classes))
        .route("/api/recommend", post(handle_recommend))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: crate::VERSION,
        service: "khet-sahayak",
    })
}

async fn handle_classes(State(service): State<SharedService>) -> Json<ClassesResponse> {
    Json(ClassesResponse {
        soil_types: service.soil_classes().to_vec(),
        crop_types: service.crop_classes().to_vec(),
        fertilizers: service.fertilizer_classes().to_vec(),
    })
}

async fn handle_recommend(
    State(service): State<SharedService>,
    Json(request): Json<RecommendationRequest>,
) -> Result<Json<RecommendResponse>, ApiError> {
    let fertilizer = service.recommend(&request)?;
    Ok(Json(RecommendResponse { fertilizer }))
}

/// Bind and serve until Ctrl-C.
pub async fn serve(service: SharedService, addr: &str) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind HTTP listener on {addr}"))?;
    info!("Khet Sahayak listening on http://{}", addr);

    axum::serve(listener, router(service))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server terminated unexpectedly")
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received shutdown signal"),
        Err(e) => error!("Failed to listen for shutdown signal: {}", e),
    }
}
