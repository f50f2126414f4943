//! API Router configuration

use super::webhook::{call_audit, call_input, health_check, inbound_call, AppState};
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Build the API router
pub fn build_router(state: AppState) -> Router {
    // Health check route (no auth required)
    let health_routes = Router::new().route("/health", get(health_check));

    // Telephony provider webhooks
    let webhook_routes = Router::new()
        .route("/webhooks/inbound-call", post(inbound_call))
        .route("/webhooks/input", post(call_input));

    // Audit trail read API
    let audit_routes = Router::new().route("/calls/:call_id/audit", get(call_audit));

    Router::new()
        .merge(health_routes)
        .merge(webhook_routes)
        .merge(audit_routes)
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
