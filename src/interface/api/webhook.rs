//! Telephony webhook handlers
//!
//! The provider posts one event per call leg: an inbound-call event when a
//! call arrives, then input events for every DTMF press or speech capture.
//! Handlers never surface internal errors; the use cases degrade to safe
//! instructions, so these endpoints always answer 200 with an instruction
//! the provider can render.

use crate::application::{CallInput, InboundRouter, IvrEngine, IvrStep};
use crate::domain::audit::{AuditRecord, AuditSink};
use crate::domain::routing::RoutingOutcome;
use crate::domain::shared::value_objects::{CallId, PhoneNumber};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub router: Arc<InboundRouter>,
    pub ivr: Arc<IvrEngine>,
    pub audit: Arc<dyn AuditSink>,
}

/// Generic API response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

/// Inbound call event payload
#[derive(Debug, Deserialize)]
pub struct InboundCallRequest {
    /// Provider-assigned call id; generated when absent
    pub call_id: Option<Uuid>,
    /// Caller number (E.164 or provider formatting)
    pub from: String,
    /// Dialed number
    pub to: String,
    /// Front-loaded speech recognition result, when the provider has one
    pub utterance: Option<String>,
}

/// Routing response: the outcome plus, for routed calls, the opening IVR
/// instruction
#[derive(Debug, Serialize)]
pub struct InboundCallResponse {
    pub call_id: Uuid,
    pub outcome: RoutingOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ivr: Option<IvrStep>,
}

/// Caller input event payload; exactly one of `digits`/`speech` is expected
#[derive(Debug, Deserialize)]
pub struct CallInputRequest {
    pub call_id: Uuid,
    pub digits: Option<String>,
    pub speech: Option<String>,
}

/// Handle an inbound call: route it, and enter the IVR when routing says so.
pub async fn inbound_call(
    State(state): State<AppState>,
    Json(request): Json<InboundCallRequest>,
) -> Json<InboundCallResponse> {
    let call_id = request
        .call_id
        .map(CallId::from_uuid)
        .unwrap_or_default();
    info!(call_id = %call_id, from = %request.from, to = %request.to, "Inbound call webhook");

    let outcome = state
        .router
        .route_call(crate::application::InboundCall {
            call_id,
            dialed_number: PhoneNumber::new(&request.to),
            caller_number: PhoneNumber::new(&request.from),
            utterance: request.utterance,
        })
        .await;

    let ivr = if outcome.enters_ivr() {
        Some(state.ivr.start_session(call_id).await)
    } else {
        None
    };

    Json(InboundCallResponse {
        call_id: call_id.as_uuid(),
        outcome,
        ivr,
    })
}

/// Handle one caller input on an active IVR session.
pub async fn call_input(
    State(state): State<AppState>,
    Json(request): Json<CallInputRequest>,
) -> Json<IvrStep> {
    let call_id = CallId::from_uuid(request.call_id);
    let input = match (request.digits, request.speech) {
        (Some(digits), _) => CallInput::Dtmf(digits),
        (None, Some(speech)) => CallInput::Speech { audio_ref: speech },
        (None, None) => CallInput::Dtmf(String::new()),
    };

    Json(state.ivr.handle_input(call_id, input).await)
}

/// Audit trail for one call, in append order.
pub async fn call_audit(
    State(state): State<AppState>,
    Path(call_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<AuditRecord>>>, StatusCode> {
    match state.audit.for_call(CallId::from_uuid(call_id)).await {
        Ok(records) => Ok(Json(ApiResponse::success(records))),
        Err(e) => Ok(Json(ApiResponse::error(e.to_string()))),
    }
}

/// Liveness probe.
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "switchyard",
    }))
}
