use crate::payments::error::PaymentError;
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::str::FromStr;

/// Lifecycle of a stored transaction
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentState {
    Pending,
    Success,
    Failed,
}

impl PaymentState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentState::Pending => "PENDING",
            PaymentState::Success => "SUCCESS",
            PaymentState::Failed => "FAILED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, PaymentState::Pending)
    }

    /// Map an aggregator status string onto the lifecycle.
    ///
    /// FreshPay reports `Success`/`Successful` and `Failed`/`Failure` depending
    /// on the endpoint; anything else (including a missing status) keeps the
    /// transaction pending.
    pub fn from_provider_status(status: Option<&str>) -> Self {
        match status.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("success") | Some("successful") => PaymentState::Success,
            Some("failed") | Some("failure") => PaymentState::Failed,
            _ => PaymentState::Pending,
        }
    }
}

impl std::fmt::Display for PaymentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PaymentState {
    type Err = PaymentError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_uppercase().as_str() {
            "PENDING" => Ok(PaymentState::Pending),
            "SUCCESS" => Ok(PaymentState::Success),
            "FAILED" => Ok(PaymentState::Failed),
            _ => Err(PaymentError::ValidationError {
                message: format!("unknown transaction status: {}", value),
                field: Some("status".to_string()),
            }),
        }
    }
}

/// Mobile-money operators reachable through the aggregator
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MobileMoneyOperator {
    Mpesa,
    Airtel,
    Orange,
    Afrimoney,
}

impl MobileMoneyOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            MobileMoneyOperator::Mpesa => "mpesa",
            MobileMoneyOperator::Airtel => "airtel",
            MobileMoneyOperator::Orange => "orange",
            MobileMoneyOperator::Afrimoney => "afrimoney",
        }
    }
}

impl std::fmt::Display for MobileMoneyOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Parse a caller-supplied amount, accepting both JSON numbers and strings.
///
/// Returns `None` for a missing, empty, non-numeric or non-positive amount.
pub fn parse_amount(raw: Option<&JsonValue>) -> Option<BigDecimal> {
    let text = match raw? {
        JsonValue::Number(n) => n.to_string(),
        JsonValue::String(s) => s.trim().to_string(),
        _ => return None,
    };
    let parsed = BigDecimal::from_str(&text).ok()?;
    if parsed <= BigDecimal::from(0) {
        return None;
    }
    Some(parsed)
}

/// Debit payload sent to the aggregator.
///
/// Field names (including the `merchant_secrete` spelling) are dictated by
/// the FreshPay API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DebitRequest {
    pub merchant_id: String,
    #[serde(rename = "merchant_secrete")]
    pub merchant_secret: String,
    pub amount: String,
    pub currency: String,
    pub action: String,
    pub customer_number: String,
    pub firstname: String,
    pub lastname: String,
    pub email: String,
    pub reference: String,
    pub method: MobileMoneyOperator,
    pub callback_url: String,
}

impl DebitRequest {
    /// Copy safe to log or echo back: the merchant secret is masked.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if !copy.merchant_secret.is_empty() {
            copy.merchant_secret = "********".to_string();
        }
        copy
    }
}

/// Raw synchronous reply from the aggregator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayReply {
    pub http_status: u16,
    pub body: String,
}

/// Parsed aggregator reply to a debit request
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DebitReply {
    #[serde(rename = "Status", default)]
    pub status: Option<String>,
    #[serde(rename = "Comment", default)]
    pub comment: Option<String>,
    #[serde(rename = "Transaction_id", default)]
    pub transaction_id: Option<JsonValue>,
}

impl DebitReply {
    pub fn is_accepted(&self) -> bool {
        self.status.as_deref() == Some("Success")
    }

    /// The aggregator sends its id either as a number or a string.
    pub fn provider_reference(&self) -> Option<String> {
        match self.transaction_id.as_ref()? {
            JsonValue::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            JsonValue::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}
