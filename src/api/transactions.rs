use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use tracing::info;

use crate::api::AppState;
use crate::database::transaction_repository::Transaction;
use crate::error::{AppError, AppErrorKind, DomainError};
use crate::middleware::error::get_request_id_from_headers;

/// Look a transaction up by our own reference
pub async fn get_transaction(
    State(state): State<AppState>,
    Path(reference): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Transaction>, AppError> {
    let request_id = get_request_id_from_headers(&headers);
    info!(reference = %reference, "🔍 Transaction lookup requested");

    let found = state
        .store
        .find_by_reference(&reference)
        .await
        .map_err(|e| {
            AppError::from(e)
                .with_context("Failed to load transaction")
                .with_request_id_opt(request_id.clone())
        })?;

    found.map(Json).ok_or_else(|| {
        AppError::new(AppErrorKind::Domain(DomainError::TransactionNotFound { reference }))
            .with_request_id_opt(request_id)
    })
}
