use crate::config::ConfigError;
use crate::payments::error::{PaymentError, PaymentResult};
use crate::payments::network::{detect_operator, normalize_customer_number};
use crate::payments::provider::MobileMoneyGateway;
use crate::payments::types::{DebitRequest, GatewayReply};
use crate::payments::utils::PaymentHttpClient;
use async_trait::async_trait;
use std::env;
use std::time::Duration;
use tracing::info;

pub const DEBIT_ACTION: &str = "debit";

#[derive(Debug, Clone)]
pub struct FreshPayConfig {
    pub merchant_id: Option<String>,
    pub merchant_secret: Option<String>,
    pub api_base_url: Option<String>,
    pub timeout_secs: u64,
    pub default_currency: String,
    pub default_firstname: String,
    pub default_lastname: String,
    pub default_email: String,
}

impl Default for FreshPayConfig {
    fn default() -> Self {
        Self {
            merchant_id: None,
            merchant_secret: None,
            api_base_url: None,
            timeout_secs: 30,
            default_currency: "USD".to_string(),
            default_firstname: "Africanite".to_string(),
            default_lastname: "Service".to_string(),
            default_email: "foma.kandy@gmail.com".to_string(),
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl FreshPayConfig {
    /// Merchant credentials are optional at start-up; initiation refuses to
    /// run without them.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            merchant_id: non_empty_var("MERCHANT_ID"),
            merchant_secret: non_empty_var("MERCHANT_SECRET"),
            api_base_url: non_empty_var("API_BASE_URL"),
            timeout_secs: env::var("FRESHPAY_TIMEOUT_SECS")
                .unwrap_or_else(|_| defaults.timeout_secs.to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("FRESHPAY_TIMEOUT_SECS".to_string()))?,
            default_currency: non_empty_var("DEFAULT_CURRENCY")
                .unwrap_or(defaults.default_currency),
            default_firstname: defaults.default_firstname,
            default_lastname: defaults.default_lastname,
            default_email: non_empty_var("DEFAULT_CUSTOMER_EMAIL")
                .unwrap_or(defaults.default_email),
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "FRESHPAY_TIMEOUT_SECS must be greater than 0".to_string(),
            ));
        }
        if let Some(url) = &self.api_base_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ConfigError::InvalidValue(
                    "API_BASE_URL must be a valid URL".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Everything needed to place a real debit
    pub fn ensure_ready(&self) -> PaymentResult<()> {
        let mut missing = Vec::new();
        if self.merchant_id.is_none() {
            missing.push("MERCHANT_ID");
        }
        if self.merchant_secret.is_none() {
            missing.push("MERCHANT_SECRET");
        }
        if self.api_base_url.is_none() {
            missing.push("API_BASE_URL");
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(PaymentError::ConfigurationError {
                message: format!("missing FreshPay settings: {}", missing.join(", ")),
            })
        }
    }
}

/// Caller-facing inputs of a debit, before defaults and normalization
#[derive(Debug, Clone, Default)]
pub struct DebitParams {
    pub amount: String,
    pub currency: Option<String>,
    pub phone_number: String,
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub email: Option<String>,
    pub reference: String,
    pub callback_url: String,
}

fn or_default(value: Option<String>, default: &str) -> String {
    value
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Assemble the aggregator payload: operator detected from the phone
/// prefix, customer number in local format, configured defaults for the
/// optional customer fields.
pub fn build_debit_request(config: &FreshPayConfig, params: DebitParams) -> DebitRequest {
    DebitRequest {
        merchant_id: config.merchant_id.clone().unwrap_or_default(),
        merchant_secret: config.merchant_secret.clone().unwrap_or_default(),
        amount: params.amount,
        currency: or_default(params.currency, &config.default_currency),
        action: DEBIT_ACTION.to_string(),
        customer_number: normalize_customer_number(&params.phone_number),
        firstname: or_default(params.firstname, &config.default_firstname),
        lastname: or_default(params.lastname, &config.default_lastname),
        email: or_default(params.email, &config.default_email),
        reference: params.reference,
        method: detect_operator(&params.phone_number),
        callback_url: params.callback_url,
    }
}

pub struct FreshPayProvider {
    config: FreshPayConfig,
    http: PaymentHttpClient,
}

impl FreshPayProvider {
    pub fn new(config: FreshPayConfig) -> PaymentResult<Self> {
        let http = PaymentHttpClient::new(Duration::from_secs(config.timeout_secs))?;
        Ok(Self { config, http })
    }
}

#[async_trait]
impl MobileMoneyGateway for FreshPayProvider {
    async fn request_debit(&self, request: &DebitRequest) -> PaymentResult<GatewayReply> {
        let url = self
            .config
            .api_base_url
            .as_deref()
            .ok_or(PaymentError::ConfigurationError {
                message: "API_BASE_URL is not set".to_string(),
            })?;

        info!(
            reference = %request.reference,
            method = %request.method,
            "sending FreshPay debit request"
        );
        let reply = self.http.post_json(url, request).await?;
        info!(
            reference = %request.reference,
            http_status = reply.http_status,
            "FreshPay answered"
        );
        Ok(reply)
    }

    fn name(&self) -> &'static str {
        "freshpay"
    }

    fn endpoint(&self) -> Option<&str> {
        self.config.api_base_url.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payments::types::MobileMoneyOperator;

    fn configured() -> FreshPayConfig {
        FreshPayConfig {
            merchant_id: Some("merchant".to_string()),
            merchant_secret: Some("secret".to_string()),
            api_base_url: Some("https://aggregator.example.com/api".to_string()),
            ..FreshPayConfig::default()
        }
    }

    #[test]
    fn builds_payload_with_defaults() {
        let request = build_debit_request(
            &configured(),
            DebitParams {
                amount: "12.5".to_string(),
                phone_number: "243972345678".to_string(),
                reference: "AFTEST".to_string(),
                callback_url: "https://hub.example.com/moko-webhook".to_string(),
                ..DebitParams::default()
            },
        );

        assert_eq!(request.merchant_id, "merchant");
        assert_eq!(request.action, "debit");
        assert_eq!(request.currency, "USD");
        assert_eq!(request.customer_number, "0972345678");
        assert_eq!(request.method, MobileMoneyOperator::Airtel);
        assert_eq!(request.firstname, "Africanite");
        assert_eq!(request.lastname, "Service");
        assert_eq!(request.email, "foma.kandy@gmail.com");
    }

    #[test]
    fn caller_values_override_defaults() {
        let request = build_debit_request(
            &configured(),
            DebitParams {
                amount: "1".to_string(),
                currency: Some("CDF".to_string()),
                phone_number: "0812345678".to_string(),
                firstname: Some("Jean".to_string()),
                lastname: Some("Mukendi".to_string()),
                email: Some("jean@example.com".to_string()),
                reference: "AFX".to_string(),
                callback_url: String::new(),
            },
        );
        assert_eq!(request.currency, "CDF");
        assert_eq!(request.firstname, "Jean");
        assert_eq!(request.email, "jean@example.com");
        assert_eq!(request.customer_number, "0812345678");
    }

    #[test]
    fn readiness_lists_missing_settings() {
        assert!(configured().ensure_ready().is_ok());

        let err = FreshPayConfig::default().ensure_ready().unwrap_err();
        let message = err.to_string();
        assert!(message.contains("MERCHANT_ID"));
        assert!(message.contains("MERCHANT_SECRET"));
        assert!(message.contains("API_BASE_URL"));
    }

    #[test]
    fn validation_rejects_bad_url_and_zero_timeout() {
        let mut config = configured();
        config.api_base_url = Some("ftp://nope".to_string());
        assert!(config.validate().is_err());

        let mut config = configured();
        config.timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[tokio::test]
    async fn provider_without_endpoint_reports_configuration_error() {
        let provider = FreshPayProvider::new(FreshPayConfig::default()).unwrap();
        let request = build_debit_request(
            &FreshPayConfig::default(),
            DebitParams {
                amount: "1".to_string(),
                phone_number: "243812345678".to_string(),
                reference: "AF1".to_string(),
                ..DebitParams::default()
            },
        );
        let result = provider.request_debit(&request).await;
        assert!(matches!(
            result,
            Err(PaymentError::ConfigurationError { .. })
        ));
        assert_eq!(provider.name(), "freshpay");
    }
}
