//! Shared fixtures: in-memory transaction store, scripted gateway and a
//! fixed IP lookup, wired into the real router.
#![allow(dead_code)]

use async_trait::async_trait;
use axum::{body::Body, http::Request, Router};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;
use uuid::Uuid;

use africanite_payment_hub::api::{router, AppState};
use africanite_payment_hub::database::error::{DatabaseError, DatabaseErrorKind};
use africanite_payment_hub::database::transaction_repository::{
    NewTransaction, ReferenceMatch, StatusUpdate, Transaction, TransactionStore,
};
use africanite_payment_hub::payments::error::{PaymentError, PaymentResult};
use africanite_payment_hub::payments::provider::MobileMoneyGateway;
use africanite_payment_hub::payments::providers::FreshPayConfig;
use africanite_payment_hub::payments::types::{DebitRequest, GatewayReply};
use africanite_payment_hub::services::ip_lookup::IpLookup;

#[derive(Default)]
pub struct InMemoryStore {
    pub rows: Mutex<Vec<Transaction>>,
    pub fail: AtomicBool,
}

impl InMemoryStore {
    pub fn failing() -> Self {
        let store = Self::default();
        store.fail.store(true, Ordering::SeqCst);
        store
    }

    pub fn snapshot(&self) -> Vec<Transaction> {
        self.rows.lock().unwrap().clone()
    }

    pub fn seed(&self, reference: &str, freshpay_ref: Option<&str>) -> Transaction {
        let now = chrono::Utc::now();
        let row = Transaction {
            id: Uuid::new_v4(),
            app_name: "shop".to_string(),
            user_id: Some("user-1".to_string()),
            amount: "10".parse().unwrap(),
            currency: "USD".to_string(),
            phone_number: "243812345678".to_string(),
            status: "PENDING".to_string(),
            moko_reference: reference.to_string(),
            freshpay_ref: freshpay_ref.map(str::to_string),
            metadata: json!({}),
            created_at: now,
            updated_at: now,
        };
        self.rows.lock().unwrap().push(row.clone());
        row
    }

    fn check(&self) -> Result<(), DatabaseError> {
        if self.fail.load(Ordering::SeqCst) {
            Err(DatabaseError::new(DatabaseErrorKind::ConnectionFailed {
                message: "connection refused".to_string(),
            }))
        } else {
            Ok(())
        }
    }
}

fn apply(row: &mut Transaction, update: &StatusUpdate) {
    row.status = update.status.as_str().to_string();
    if let Some(provider_reference) = &update.provider_reference {
        row.freshpay_ref = Some(provider_reference.clone());
    }
    if let (Some(existing), Some(incoming)) =
        (row.metadata.as_object_mut(), update.metadata.as_object())
    {
        for (key, value) in incoming {
            existing.insert(key.clone(), value.clone());
        }
    }
    row.updated_at = chrono::Utc::now();
}

#[async_trait]
impl TransactionStore for InMemoryStore {
    async fn insert_pending(&self, new: &NewTransaction) -> Result<Transaction, DatabaseError> {
        self.check()?;
        let mut rows = self.rows.lock().unwrap();
        if rows.iter().any(|r| r.moko_reference == new.reference) {
            return Err(DatabaseError::new(DatabaseErrorKind::UniqueViolation {
                constraint: Some("transactions_moko_reference_key".to_string()),
            }));
        }
        let now = chrono::Utc::now();
        let row = Transaction {
            id: Uuid::new_v4(),
            app_name: new.app_name.clone(),
            user_id: new.user_id.clone(),
            amount: new.amount.clone(),
            currency: new.currency.clone(),
            phone_number: new.phone_number.clone(),
            status: "PENDING".to_string(),
            moko_reference: new.reference.clone(),
            freshpay_ref: None,
            metadata: json!({}),
            created_at: now,
            updated_at: now,
        };
        rows.push(row.clone());
        Ok(row)
    }

    async fn update_by_id(
        &self,
        id: Uuid,
        update: &StatusUpdate,
    ) -> Result<Transaction, DatabaseError> {
        self.check()?;
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| DatabaseError::new(DatabaseErrorKind::NotFound))?;
        apply(row, update);
        Ok(row.clone())
    }

    async fn update_matching(
        &self,
        matcher: &ReferenceMatch,
        update: &StatusUpdate,
    ) -> Result<Vec<Transaction>, DatabaseError> {
        self.check()?;
        let mut rows = self.rows.lock().unwrap();
        let mut updated = Vec::new();
        for row in rows.iter_mut().filter(|r| matcher.matches(r)) {
            apply(row, update);
            updated.push(row.clone());
        }
        Ok(updated)
    }

    async fn find_by_reference(
        &self,
        reference: &str,
    ) -> Result<Option<Transaction>, DatabaseError> {
        self.check()?;
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.moko_reference == reference)
            .cloned())
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        self.check()
    }
}

/// What the fake aggregator does with a debit
#[derive(Clone)]
pub enum Script {
    Reply(u16, String),
    Unreachable,
}

pub struct ScriptedGateway {
    script: Script,
    pub sent: Mutex<Vec<DebitRequest>>,
}

impl ScriptedGateway {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn replying(body: Value) -> Self {
        Self::new(Script::Reply(200, body.to_string()))
    }
}

#[async_trait]
impl MobileMoneyGateway for ScriptedGateway {
    async fn request_debit(&self, request: &DebitRequest) -> PaymentResult<GatewayReply> {
        self.sent.lock().unwrap().push(request.clone());
        match &self.script {
            Script::Reply(http_status, body) => Ok(GatewayReply {
                http_status: *http_status,
                body: body.clone(),
            }),
            Script::Unreachable => Err(PaymentError::NetworkError {
                message: "connection refused".to_string(),
            }),
        }
    }

    fn name(&self) -> &'static str {
        "scripted"
    }

    fn endpoint(&self) -> Option<&str> {
        Some("https://aggregator.test/api")
    }
}

pub struct FixedIp(pub Option<&'static str>);

#[async_trait]
impl IpLookup for FixedIp {
    async fn outbound_ip(&self) -> PaymentResult<String> {
        self.0
            .map(str::to_string)
            .ok_or_else(|| PaymentError::NetworkError {
                message: "lookup unreachable".to_string(),
            })
    }
}

pub fn configured_freshpay() -> FreshPayConfig {
    FreshPayConfig {
        merchant_id: Some("merchant-1".to_string()),
        merchant_secret: Some("top-secret".to_string()),
        api_base_url: Some("https://aggregator.test/api".to_string()),
        ..FreshPayConfig::default()
    }
}

pub fn test_app_with(
    store: Arc<InMemoryStore>,
    gateway: Arc<ScriptedGateway>,
    freshpay: FreshPayConfig,
) -> Router {
    router(AppState::new(
        store,
        gateway,
        Arc::new(FixedIp(Some("198.51.100.20"))),
        freshpay,
        Some("https://hub.test".to_string()),
    ))
}

pub fn test_app(store: Arc<InMemoryStore>, gateway: Arc<ScriptedGateway>) -> Router {
    test_app_with(store, gateway, configured_freshpay())
}

pub fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn send(app: Router, request: Request<Body>) -> (u16, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status().as_u16();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}
