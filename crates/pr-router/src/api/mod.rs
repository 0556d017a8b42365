//! PagerRelay HTTP API
//!
//! HTTP API endpoints for:
//! - Inbound pager messages from the decoder
//! - Health
//! - Test-traffic monitoring and on-demand health checks

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tracing::{debug, info};

use pr_common::InboundEvent;

use crate::relay::PagerRelay;

pub mod model;

use model::{HealthCheckTriggerResponse, HealthResponse, RelayMessageResponse, TestTrafficResponse};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub relay: Arc<PagerRelay>,
}

/// Create the router with all relay endpoints
pub fn create_router(relay: Arc<PagerRelay>) -> Router {
    let state = AppState { relay };

    Router::new()
        .route("/health", get(health_handler))
        .route("/api/messages", post(relay_message))
        .route("/monitoring/test-traffic", get(test_traffic_handler))
        .route("/monitoring/health-check", post(trigger_health_check))
        .with_state(state)
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "UP".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        health_check: state.relay.health_check().state(),
    })
}

async fn relay_message(
    State(state): State<AppState>,
    Json(event): Json<InboundEvent>,
) -> Json<RelayMessageResponse> {
    debug!(address = %event.address, agency = %event.agency, "Inbound pager message");
    let outcomes = state.relay.handle(&event).await;
    Json(RelayMessageResponse { outcomes })
}

async fn test_traffic_handler(State(state): State<AppState>) -> Json<TestTrafficResponse> {
    let aggregator = state.relay.test_traffic();
    Json(TestTrafficResponse {
        pending: aggregator.pending_count(),
        since: aggregator.window_start(),
        last_health_check: state.relay.health_check().last_fired(),
    })
}

async fn trigger_health_check(
    State(state): State<AppState>,
) -> (StatusCode, Json<HealthCheckTriggerResponse>) {
    match state.relay.health_check().fire() {
        Some(_) => {
            info!("Health check triggered via API");
            (
                StatusCode::ACCEPTED,
                Json(HealthCheckTriggerResponse { status: "FIRED".to_string() }),
            )
        }
        None => (
            StatusCode::CONFLICT,
            Json(HealthCheckTriggerResponse { status: "SKIPPED".to_string() }),
        ),
    }
}
