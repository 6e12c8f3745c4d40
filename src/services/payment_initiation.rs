use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::database::transaction_repository::{NewTransaction, StatusUpdate, TransactionStore};
use crate::error::{AppError, AppErrorKind, DomainError, ExternalError, ValidationError};
use crate::payments::network::mask_phone_number;
use crate::payments::providers::freshpay::{build_debit_request, DebitParams, FreshPayConfig};
use crate::payments::provider::MobileMoneyGateway;
use crate::payments::reference::generate_reference;
use crate::payments::types::{parse_amount, DebitReply, PaymentState};
use crate::payments::utils::excerpt;

/// Characters of an unparseable provider body echoed back to the caller
const RAW_RESPONSE_EXCERPT: usize = 200;
/// Characters of an unparseable provider body kept in metadata
const RAW_RESPONSE_STORED: usize = 2000;

pub const PENDING_MESSAGE: &str = "Payment initiated. Please check your phone and enter your PIN.";

/// Body of `POST /initiate-payment`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InitiatePaymentRequest {
    pub app_name: Option<String>,
    /// Callers send either a string or a numeric id
    pub user_id: Option<JsonValue>,
    pub amount: Option<JsonValue>,
    pub phone_number: Option<String>,
    pub currency: Option<String>,
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitiationOutcome {
    pub transaction_id: Uuid,
    pub reference: String,
    pub freshpay_transaction_id: Option<String>,
    pub message: String,
    pub status: PaymentState,
}

fn present(value: &Option<String>) -> Option<String> {
    value
        .as_ref()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn id_to_text(value: &Option<JsonValue>) -> Option<String> {
    match value.as_ref()? {
        JsonValue::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub struct PaymentInitiationService {
    store: Arc<dyn TransactionStore>,
    gateway: Arc<dyn MobileMoneyGateway>,
    freshpay: FreshPayConfig,
}

impl PaymentInitiationService {
    pub fn new(
        store: Arc<dyn TransactionStore>,
        gateway: Arc<dyn MobileMoneyGateway>,
        freshpay: FreshPayConfig,
    ) -> Self {
        Self {
            store,
            gateway,
            freshpay,
        }
    }

    /// Open a `PENDING` transaction and ask the aggregator to debit the
    /// customer. Any unusable aggregator answer flips the row to `FAILED`.
    pub async fn initiate(
        &self,
        request: InitiatePaymentRequest,
        callback_url: &str,
    ) -> Result<InitiationOutcome, AppError> {
        let app_name = present(&request.app_name);
        let phone_number = present(&request.phone_number);
        let amount_missing = matches!(request.amount, None | Some(JsonValue::Null));

        let mut missing = Vec::new();
        if app_name.is_none() {
            missing.push("app_name");
        }
        if amount_missing {
            missing.push("amount");
        }
        if phone_number.is_none() {
            missing.push("phone_number");
        }
        let (Some(app_name), Some(phone_number), false) = (app_name, phone_number, amount_missing)
        else {
            return Err(AppError::missing_fields(missing));
        };

        let amount = parse_amount(request.amount.as_ref()).ok_or_else(|| {
            AppError::new(AppErrorKind::Validation(ValidationError::Invalid {
                field: "amount".to_string(),
                reason: "must be a positive number".to_string(),
            }))
        })?;

        self.freshpay.ensure_ready().map_err(|e| {
            error!(error = %e, "FreshPay is not configured");
            AppError::from(e)
        })?;

        let currency =
            present(&request.currency).unwrap_or_else(|| self.freshpay.default_currency.clone());
        let reference = generate_reference();

        let transaction = self
            .store
            .insert_pending(&NewTransaction {
                app_name: app_name.clone(),
                user_id: id_to_text(&request.user_id),
                amount: amount.clone(),
                currency: currency.clone(),
                phone_number: phone_number.clone(),
                reference: reference.clone(),
            })
            .await
            .map_err(|e| {
                error!(error = %e, reference = %reference, "failed to insert transaction");
                AppError::from(e).with_context("Failed to create transaction")
            })?;

        let debit = build_debit_request(
            &self.freshpay,
            DebitParams {
                amount: amount.to_string(),
                currency: Some(currency),
                phone_number: phone_number.clone(),
                firstname: request.firstname,
                lastname: request.lastname,
                email: request.email,
                reference: reference.clone(),
                callback_url: callback_url.to_string(),
            },
        );

        info!(
            app_name = %app_name,
            reference = %reference,
            provider = self.gateway.name(),
            method = %debit.method,
            customer = %mask_phone_number(&debit.customer_number),
            "initiating mobile-money debit"
        );
        debug!(endpoint = ?self.gateway.endpoint(), payload = ?debit.redacted(), "debit payload");

        let reply = match self.gateway.request_debit(&debit).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(reference = %reference, error = %e, "aggregator unreachable");
                self.mark_failed(transaction.id, json!({ "provider_error": e.to_string() }))
                    .await;
                return Err(AppError::from(e));
            }
        };

        let parsed: Option<(JsonValue, DebitReply)> = serde_json::from_str::<JsonValue>(&reply.body)
            .ok()
            .and_then(|value| {
                serde_json::from_value::<DebitReply>(value.clone())
                    .ok()
                    .map(|reply| (value, reply))
            });

        let Some((raw, debit_reply)) = parsed else {
            warn!(
                reference = %reference,
                http_status = reply.http_status,
                "aggregator returned a malformed response"
            );
            self.mark_failed(
                transaction.id,
                json!({
                    "raw_response": excerpt(&reply.body, RAW_RESPONSE_STORED),
                    "http_status": reply.http_status,
                }),
            )
            .await;
            return Err(AppError::new(AppErrorKind::External(
                ExternalError::InvalidProviderResponse {
                    raw_excerpt: excerpt(&reply.body, RAW_RESPONSE_EXCERPT),
                },
            )));
        };

        if !debit_reply.is_accepted() {
            let reason = debit_reply
                .comment
                .clone()
                .unwrap_or_else(|| "Unknown error".to_string());
            warn!(reference = %reference, reason = %reason, "aggregator declined the debit");
            self.mark_failed(transaction.id, json!({ "freshpay_response": raw }))
                .await;
            return Err(AppError::new(AppErrorKind::Domain(
                DomainError::PaymentDeclined {
                    reason,
                    provider_status: debit_reply.status.clone(),
                },
            )));
        }

        let provider_reference = debit_reply.provider_reference();
        let accepted = StatusUpdate {
            status: PaymentState::Pending,
            provider_reference: provider_reference.clone(),
            metadata: json!({
                "freshpay_response": raw,
                "method": debit.method,
            }),
        };
        if let Err(e) = self.store.update_by_id(transaction.id, &accepted).await {
            // The debit is already in flight; the webhook can still match on our reference.
            error!(reference = %reference, error = %e, "failed to record aggregator acceptance");
        }

        info!(
            reference = %reference,
            provider_reference = ?provider_reference,
            "debit accepted, awaiting customer PIN"
        );

        Ok(InitiationOutcome {
            transaction_id: transaction.id,
            reference,
            freshpay_transaction_id: provider_reference,
            message: PENDING_MESSAGE.to_string(),
            status: PaymentState::Pending,
        })
    }

    async fn mark_failed(&self, id: Uuid, metadata: JsonValue) {
        let update = StatusUpdate {
            status: PaymentState::Failed,
            provider_reference: None,
            metadata,
        };
        if let Err(e) = self.store.update_by_id(id, &update).await {
            error!(transaction_id = %id, error = %e, "failed to mark transaction as FAILED");
        }
    }
}
