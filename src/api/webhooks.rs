//! Aggregator callback endpoint.
//!
//! Always answers 200 so the aggregator does not keep retrying; failures
//! are logged and reported in the body.

use axum::{body::Bytes, extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value as JsonValue};
use tracing::{error, info, warn};

use crate::api::AppState;

pub async fn moko_webhook(State(state): State<AppState>, body: Bytes) -> impl IntoResponse {
    info!(bytes = body.len(), "📥 Received aggregator callback");

    let payload: JsonValue = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            warn!(error = %e, "callback body is not valid JSON");
            return (
                StatusCode::OK,
                Json(json!({ "status": "Invalid payload ignored" })),
            );
        }
    };

    match state.reconciler.reconcile(&payload).await {
        Ok(outcome) => (StatusCode::OK, Json(outcome.acknowledgement())),
        Err(e) => {
            error!(error = %e, "callback processing failed");
            (
                StatusCode::OK,
                Json(json!({ "status": "Error logged", "error": e.to_string() })),
            )
        }
    }
}
