use axum::{
    extract::{rejection::JsonRejection, State},
    http::HeaderMap,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use tracing::{info, warn};

use crate::api::AppState;
use crate::error::{AppError, AppErrorKind, ValidationError};
use crate::middleware::error::get_request_id_from_headers;
use crate::payments::providers::freshpay::{build_debit_request, DebitParams};
use crate::payments::types::parse_amount;
use crate::services::payment_initiation::{InitiatePaymentRequest, InitiationOutcome};

pub const WEBHOOK_PATH: &str = "/moko-webhook";
const DEBUG_REFERENCE: &str = "DEBUG123";

/// Callback URL handed to the aggregator. `PUBLIC_BASE_URL` wins; otherwise
/// it is rebuilt from the forwarded scheme and the Host header.
pub fn callback_url(public_base_url: Option<&str>, headers: &HeaderMap) -> String {
    if let Some(base) = public_base_url {
        return format!("{}{}", base.trim_end_matches('/'), WEBHOOK_PATH);
    }

    let proto = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or("http");
    let host = headers
        .get(axum::http::header::HOST)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .unwrap_or("localhost");

    format!("{}://{}{}", proto, host, WEBHOOK_PATH)
}

/// Unreadable bodies (wrong content type, bad JSON, wrong field types)
/// share the validation envelope instead of axum's plain-text rejection.
fn body_rejection(rejection: JsonRejection, request_id: Option<String>) -> AppError {
    warn!(status = %rejection.status(), error = %rejection, "request body rejected");
    AppError::new(AppErrorKind::Validation(ValidationError::Invalid {
        field: "body".to_string(),
        reason: rejection.body_text(),
    }))
    .with_request_id_opt(request_id)
}

pub async fn initiate_payment(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<InitiatePaymentRequest>, JsonRejection>,
) -> Result<Json<InitiationOutcome>, AppError> {
    let request_id = get_request_id_from_headers(&headers);
    let Json(request) = payload.map_err(|e| body_rejection(e, request_id.clone()))?;
    let callback = callback_url(state.public_base_url.as_deref(), &headers);

    info!(
        app_name = ?request.app_name,
        callback_url = %callback,
        "💳 Payment initiation requested"
    );

    state
        .initiation
        .initiate(request, &callback)
        .await
        .map(Json)
        .map_err(|e| e.with_request_id_opt(request_id))
}

#[derive(Debug, Deserialize)]
pub struct DebugPaymentRequest {
    pub phone_number: Option<String>,
    pub amount: Option<JsonValue>,
    pub currency: Option<String>,
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub email: Option<String>,
}

/// Show the debit payload that would be sent, without sending it or
/// touching the store. The merchant secret is masked.
pub async fn debug_payment(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<DebugPaymentRequest>, JsonRejection>,
) -> Result<Json<JsonValue>, AppError> {
    let request_id = get_request_id_from_headers(&headers);
    let Json(request) = payload.map_err(|e| body_rejection(e, request_id.clone()))?;

    let phone_number = request
        .phone_number
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty());
    let amount = parse_amount(request.amount.as_ref());

    let (Some(phone_number), Some(amount)) = (phone_number, amount) else {
        return Err(AppError::new(AppErrorKind::Validation(
            ValidationError::Invalid {
                field: "phone_number, amount".to_string(),
                reason: "a phone number and a positive amount are required".to_string(),
            },
        ))
        .with_request_id_opt(request_id));
    };

    let debit = build_debit_request(
        &state.freshpay,
        DebitParams {
            amount: amount.to_string(),
            currency: request.currency,
            phone_number,
            firstname: request.firstname,
            lastname: request.lastname,
            email: request.email,
            reference: DEBUG_REFERENCE.to_string(),
            callback_url: callback_url(state.public_base_url.as_deref(), &headers),
        },
    );

    Ok(Json(json!({
        "message": "This is what would be sent to FreshPay",
        "api_url": state.freshpay.api_base_url,
        "payload": debit.redacted(),
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_base_url_takes_precedence() {
        let mut headers = HeaderMap::new();
        headers.insert("host", "internal:3000".parse().unwrap());
        assert_eq!(
            callback_url(Some("https://pay.example.com/"), &headers),
            "https://pay.example.com/moko-webhook"
        );
    }

    #[test]
    fn derived_from_forwarded_proto_and_host() {
        let mut headers = HeaderMap::new();
        headers.insert("host", "hub.example.com".parse().unwrap());
        headers.insert("x-forwarded-proto", "https, http".parse().unwrap());
        assert_eq!(
            callback_url(None, &headers),
            "https://hub.example.com/moko-webhook"
        );
    }

    #[test]
    fn defaults_to_http() {
        let mut headers = HeaderMap::new();
        headers.insert("host", "127.0.0.1:3000".parse().unwrap());
        assert_eq!(
            callback_url(None, &headers),
            "http://127.0.0.1:3000/moko-webhook"
        );
    }
}
