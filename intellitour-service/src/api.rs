//! HTTP API for the IntelliTour service.
//!
//! - `POST /api/respond` turns one user message into the assistant's reply
//! - `GET /health` reports liveness and uptime

use axum::{Json, Router, extract::State, routing::{get, post}};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tower_http::trace::TraceLayer;
use tracing::info;
use uuid::Uuid;

use crate::error::{ServiceError, ServiceResult};
use crate::service::TravelAssistantService;

/// Application state
pub struct AppState {
    pub service: Arc<TravelAssistantService>,
    pub start_time: Instant,
}

/// Build the API router
pub fn router(service: Arc<TravelAssistantService>) -> Router {
    let state = Arc::new(AppState {
        service,
        start_time: Instant::now(),
    });

    let api_routes = Router::new().route("/respond", post(respond_handler));

    Router::new()
        .route("/health", get(health_handler))
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// === Conversation ===

#[derive(Debug, Deserialize)]
pub struct RespondRequest {
    pub message: String,
    pub user_id: String,
    #[serde(default)]
    pub display_name: String,
}

#[derive(Debug, Serialize)]
pub struct RespondResponse {
    pub reply: String,
}

async fn respond_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RespondRequest>,
) -> ServiceResult<Json<RespondResponse>> {
    if request.user_id.trim().is_empty() {
        return Err(ServiceError::InvalidRequest {
            message: "user_id is required".to_string(),
        });
    }

    let request_id = Uuid::new_v4();
    info!(
        request_id = %request_id,
        user_id = %request.user_id,
        message_len = request.message.len(),
        "Incoming message"
    );

    let reply = state
        .service
        .generate_response(&request.message, &request.user_id, &request.display_name)
        .await;

    info!(request_id = %request_id, reply_len = reply.len(), "Reply ready");
    Ok(Json(RespondResponse { reply }))
}

// === Health ===

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
}

async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: state.service.i18n().get("en", "health-status-healthy", None),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
    })
}
