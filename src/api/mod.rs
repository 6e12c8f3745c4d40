//! HTTP surface of the payment hub

pub mod payments;
pub mod system;
pub mod transactions;
pub mod webhooks;

use axum::{
    http::{HeaderValue, Method},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tracing::warn;

use crate::config::ServerConfig;
use crate::database::transaction_repository::TransactionStore;
use crate::health::HealthChecker;
use crate::middleware::logging::{request_logging_middleware, UuidRequestId};
use crate::payments::provider::MobileMoneyGateway;
use crate::payments::providers::freshpay::FreshPayConfig;
use crate::services::ip_lookup::IpLookup;
use crate::services::payment_initiation::PaymentInitiationService;
use crate::services::webhook_reconciler::WebhookReconciler;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn TransactionStore>,
    pub initiation: Arc<PaymentInitiationService>,
    pub reconciler: Arc<WebhookReconciler>,
    pub ip_lookup: Arc<dyn IpLookup>,
    pub freshpay: FreshPayConfig,
    pub public_base_url: Option<String>,
    pub health_checker: HealthChecker,
}

impl AppState {
    pub fn new(
        store: Arc<dyn TransactionStore>,
        gateway: Arc<dyn MobileMoneyGateway>,
        ip_lookup: Arc<dyn IpLookup>,
        freshpay: FreshPayConfig,
        public_base_url: Option<String>,
    ) -> Self {
        Self {
            initiation: Arc::new(PaymentInitiationService::new(
                store.clone(),
                gateway,
                freshpay.clone(),
            )),
            reconciler: Arc::new(WebhookReconciler::new(store.clone())),
            health_checker: HealthChecker::new(store.clone(), freshpay.clone()),
            store,
            ip_lookup,
            freshpay,
            public_base_url,
        }
    }
}

/// Routes without cross-cutting layers
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(system::root))
        .route("/health", get(system::health))
        .route("/health/live", get(system::liveness))
        .route("/check-ip", get(system::check_ip))
        .route("/debug-payment", post(payments::debug_payment))
        .route("/initiate-payment", post(payments::initiate_payment))
        .route("/moko-webhook", post(webhooks::moko_webhook))
        .route("/transactions/{reference}", get(transactions::get_transaction))
        .with_state(state)
}

/// Full application: routes plus request ids, access logging and CORS
pub fn build_app(state: AppState, server: &ServerConfig) -> Router {
    router(state).layer(
        ServiceBuilder::new()
            .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
            .layer(axum::middleware::from_fn(request_logging_middleware))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(cors_layer(server)),
    )
}

fn cors_layer(server: &ServerConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    if server.allows_any_origin() {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = server
        .cors_allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    layer.allow_origin(AllowOrigin::list(origins))
}
