use crate::payments::error::PaymentResult;
use crate::payments::types::{DebitRequest, GatewayReply};
use async_trait::async_trait;

/// Synchronous debit call to a mobile-money aggregator.
///
/// Implementations return the raw HTTP answer; interpreting the body is the
/// caller's job so malformed replies can be recorded verbatim.
#[async_trait]
pub trait MobileMoneyGateway: Send + Sync {
    async fn request_debit(&self, request: &DebitRequest) -> PaymentResult<GatewayReply>;

    fn name(&self) -> &'static str;

    /// Endpoint the debit is posted to, for diagnostics
    fn endpoint(&self) -> Option<&str>;
}
