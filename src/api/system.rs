use axum::{
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value as JsonValue};
use std::net::SocketAddr;
use tracing::{error, info};

use crate::api::AppState;
use crate::health::{HealthState, HealthStatus};

pub const SERVICE_NAME: &str = "Africanite Payment Hub";

/// Address of the caller: first `X-Forwarded-For` hop, else the socket peer
fn client_ip(request: &Request) -> Option<String> {
    let forwarded = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());

    forwarded.or_else(|| {
        request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
    })
}

pub async fn root(request: Request) -> Json<JsonValue> {
    info!("📍 Root endpoint accessed");
    Json(json!({
        "status": "online",
        "service": SERVICE_NAME,
        "ip": client_ip(&request),
    }))
}

/// Reports the outbound public IP to whitelist with the aggregator
pub async fn check_ip(State(state): State<AppState>) -> (StatusCode, Json<JsonValue>) {
    match state.ip_lookup.outbound_ip().await {
        Ok(ip) => {
            info!(ip = %ip, "🌐 Outbound IP resolved");
            (
                StatusCode::OK,
                Json(json!({
                    "outbound_ip": ip,
                    "message": "Add this IP to the FreshPay whitelist",
                })),
            )
        }
        Err(e) => {
            error!(error = %e, "outbound IP lookup failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
        }
    }
}

pub async fn health(
    State(state): State<AppState>,
) -> Result<Json<HealthStatus>, (StatusCode, Json<HealthStatus>)> {
    info!("🏥 Health check requested");
    let health_status = state.health_checker.check_health().await;

    if health_status.status == HealthState::Unhealthy {
        error!("❌ Health check failed - service unhealthy");
        Err((StatusCode::SERVICE_UNAVAILABLE, Json(health_status)))
    } else {
        Ok(Json(health_status))
    }
}

/// Liveness probe, no dependency checks
pub async fn liveness() -> &'static str {
    "OK"
}
