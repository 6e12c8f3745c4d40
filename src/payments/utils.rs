use crate::payments::error::{PaymentError, PaymentResult};
use crate::payments::types::GatewayReply;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

/// Thin reqwest wrapper shared by outbound provider calls.
///
/// Each call is a single attempt bounded by `timeout`. Any HTTP answer is
/// handed back untouched so callers can inspect the raw body.
#[derive(Clone)]
pub struct PaymentHttpClient {
    client: Client,
    timeout: Duration,
}

impl PaymentHttpClient {
    pub fn new(timeout: Duration) -> PaymentResult<Self> {
        let client =
            Client::builder()
                .timeout(timeout)
                .build()
                .map_err(|e| PaymentError::NetworkError {
                    message: format!("failed to initialize HTTP client: {}", e),
                })?;

        Ok(Self { client, timeout })
    }

    pub async fn post_json<B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
    ) -> PaymentResult<GatewayReply> {
        let resp = self
            .client
            .post(url)
            .timeout(self.timeout)
            .header("Accept", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| PaymentError::NetworkError {
                message: if e.is_timeout() {
                    format!("provider request timed out after {:?}", self.timeout)
                } else {
                    format!("provider request failed: {}", e)
                },
            })?;

        let http_status = resp.status().as_u16();
        let body = resp.text().await.map_err(|e| PaymentError::NetworkError {
            message: format!("failed to read provider response: {}", e),
        })?;
        Ok(GatewayReply { http_status, body })
    }

    pub async fn get_json(&self, url: &str) -> PaymentResult<serde_json::Value> {
        let resp = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| PaymentError::NetworkError {
                message: format!("request to {} failed: {}", url, e),
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(PaymentError::ProviderError {
                provider: "http".to_string(),
                message: format!("HTTP {} from {}", status, url),
                provider_code: Some(status.as_u16().to_string()),
                retryable: status.is_server_error(),
            });
        }

        resp.json::<serde_json::Value>()
            .await
            .map_err(|e| PaymentError::ProviderError {
                provider: "http".to_string(),
                message: format!("invalid JSON response: {}", e),
                provider_code: None,
                retryable: false,
            })
    }
}

/// First `max_chars` characters of a provider body, for error responses
pub fn excerpt(body: &str, max_chars: usize) -> String {
    body.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn excerpt_respects_char_boundaries() {
        assert_eq!(excerpt("abcdef", 3), "abc");
        assert_eq!(excerpt("éèà", 2), "éè");
        assert_eq!(excerpt("", 200), "");
    }

    #[tokio::test]
    async fn unreachable_host_is_a_network_error() {
        let client = PaymentHttpClient::new(Duration::from_millis(500)).unwrap();
        let result = client
            .post_json("http://127.0.0.1:9/debit", &serde_json::json!({}))
            .await;
        assert!(matches!(result, Err(PaymentError::NetworkError { .. })));
    }

    #[tokio::test]
    async fn dropped_connection_is_attempted_once() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let connections = Arc::new(AtomicUsize::new(0));
        let counter = connections.clone();
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                drop(socket);
            }
        });

        let client = PaymentHttpClient::new(Duration::from_secs(2)).unwrap();
        let result = client
            .post_json(&format!("http://{}/debit", addr), &serde_json::json!({}))
            .await;

        assert!(matches!(result, Err(PaymentError::NetworkError { .. })));
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(connections.load(Ordering::SeqCst), 1);
    }
}
