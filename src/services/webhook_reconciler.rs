//! Reconciles asynchronous aggregator callbacks with stored transactions

use chrono::Utc;
use serde_json::{json, Value as JsonValue};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::database::error::DatabaseError;
use crate::database::transaction_repository::{ReferenceMatch, StatusUpdate, TransactionStore};
use crate::payments::types::PaymentState;

/// Fields pulled out of a callback body. The aggregator is inconsistent
/// about key casing, so each field has a list of accepted keys.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallbackFields {
    pub reference: Option<String>,
    pub provider_reference: Option<String>,
    pub status: Option<String>,
    pub status_description: Option<JsonValue>,
    pub amount: Option<JsonValue>,
    pub customer_number: Option<JsonValue>,
}

const REFERENCE_KEYS: &[&str] = &["Reference", "reference"];
const PROVIDER_REFERENCE_KEYS: &[&str] = &["Transaction_id", "transaction_id"];
const STATUS_KEYS: &[&str] = &["Trans_Status", "Status"];

impl CallbackFields {
    pub fn from_payload(payload: &JsonValue) -> Self {
        Self {
            reference: first_text(payload, REFERENCE_KEYS),
            provider_reference: first_text(payload, PROVIDER_REFERENCE_KEYS),
            status: first_text(payload, STATUS_KEYS),
            status_description: payload.get("Trans_Status_Description").cloned(),
            amount: payload.get("Amount").cloned(),
            customer_number: payload.get("Customer_Number").cloned(),
        }
    }
}

/// First non-empty value among `keys`, numbers rendered as text
fn first_text(payload: &JsonValue, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match payload.get(*key)? {
        JsonValue::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn is_truthy(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => false,
        JsonValue::Bool(b) => *b,
        JsonValue::String(s) => !s.is_empty(),
        JsonValue::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        JsonValue::Array(_) | JsonValue::Object(_) => true,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileOutcome {
    /// Payload carried an encrypted `data` envelope; not decrypted
    EncryptedIgnored,
    MissingReference,
    NoMatch {
        reference: Option<String>,
        provider_reference: Option<String>,
    },
    Updated {
        status: PaymentState,
        reference: Option<String>,
        /// Id of the first row touched
        transaction_id: Uuid,
        updated: usize,
    },
}

impl ReconcileOutcome {
    /// Body acknowledged back to the aggregator
    pub fn acknowledgement(&self) -> JsonValue {
        match self {
            ReconcileOutcome::EncryptedIgnored => json!({
                "status": "Received encrypted callback",
                "message": "Encrypted callbacks are acknowledged but not processed"
            }),
            ReconcileOutcome::MissingReference => {
                json!({ "status": "Missing reference or transaction_id" })
            }
            ReconcileOutcome::NoMatch {
                reference,
                provider_reference,
            } => json!({
                "status": "No matching transaction found",
                "reference": reference,
                "transaction_id": provider_reference,
            }),
            ReconcileOutcome::Updated {
                status,
                reference,
                transaction_id,
                ..
            } => json!({
                "status": "Callback processed successfully",
                "transaction_id": transaction_id,
                "transaction_status": status,
                "reference": reference,
            }),
        }
    }
}

pub struct WebhookReconciler {
    store: Arc<dyn TransactionStore>,
}

impl WebhookReconciler {
    pub fn new(store: Arc<dyn TransactionStore>) -> Self {
        Self { store }
    }

    /// Apply a callback to every transaction matching its identifiers.
    ///
    /// Store failures are returned to the caller, who still acknowledges
    /// the callback.
    pub async fn reconcile(&self, payload: &JsonValue) -> Result<ReconcileOutcome, DatabaseError> {
        if payload.get("data").is_some_and(is_truthy) {
            warn!("received encrypted callback, acknowledging without processing");
            return Ok(ReconcileOutcome::EncryptedIgnored);
        }

        let fields = CallbackFields::from_payload(payload);
        let Some(matcher) =
            ReferenceMatch::from_parts(fields.reference.clone(), fields.provider_reference.clone())
        else {
            warn!("callback carried neither a reference nor a transaction id");
            return Ok(ReconcileOutcome::MissingReference);
        };

        let status = PaymentState::from_provider_status(fields.status.as_deref());
        let update = StatusUpdate {
            status,
            provider_reference: fields.provider_reference.clone(),
            metadata: json!({
                "callback_data": payload,
                "final_status": fields.status,
                "status_description": fields.status_description,
                "amount_confirmed": fields.amount,
                "customer_number": fields.customer_number,
                "updated_at": Utc::now().to_rfc3339(),
            }),
        };

        let updated = self
            .store
            .update_matching(&matcher, &update)
            .await
            .map_err(|e| {
                error!(
                    reference = ?fields.reference,
                    provider_reference = ?fields.provider_reference,
                    error = %e,
                    "failed to apply callback"
                );
                e
            })?;

        let Some(first) = updated.first() else {
            warn!(
                reference = ?fields.reference,
                provider_reference = ?fields.provider_reference,
                "no transaction matches callback"
            );
            return Ok(ReconcileOutcome::NoMatch {
                reference: fields.reference,
                provider_reference: fields.provider_reference,
            });
        };

        info!(
            reference = ?fields.reference,
            provider_reference = ?fields.provider_reference,
            status = %status,
            rows = updated.len(),
            "callback applied"
        );

        Ok(ReconcileOutcome::Updated {
            status,
            reference: fields
                .reference
                .or_else(|| Some(first.moko_reference.clone())),
            transaction_id: first.id,
            updated: updated.len(),
        })
    }
}
