use crate::payments::error::{PaymentError, PaymentResult};
use crate::payments::utils::PaymentHttpClient;
use async_trait::async_trait;
use std::time::Duration;

/// Discovers the public address outbound requests leave from, which the
/// aggregator needs for its IP whitelist.
#[async_trait]
pub trait IpLookup: Send + Sync {
    async fn outbound_ip(&self) -> PaymentResult<String>;
}

/// ipify-style lookup: GET returning `{"ip": "..."}`
pub struct IpifyLookup {
    url: String,
    http: PaymentHttpClient,
}

impl IpifyLookup {
    pub fn new(url: impl Into<String>) -> PaymentResult<Self> {
        Ok(Self {
            url: url.into(),
            http: PaymentHttpClient::new(Duration::from_secs(10))?,
        })
    }
}

#[async_trait]
impl IpLookup for IpifyLookup {
    async fn outbound_ip(&self) -> PaymentResult<String> {
        let body = self.http.get_json(&self.url).await?;
        extract_ip(&body).ok_or_else(|| PaymentError::ProviderError {
            provider: "ip-lookup".to_string(),
            message: "response did not contain an ip field".to_string(),
            provider_code: None,
            retryable: false,
        })
    }
}

fn extract_ip(body: &serde_json::Value) -> Option<String> {
    body.get("ip")
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
