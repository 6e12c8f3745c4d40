use crate::database::error::DatabaseError;
use crate::payments::types::PaymentState;
use async_trait::async_trait;
use serde::Serialize;
use sqlx::{types::BigDecimal, FromRow, PgPool};
use std::str::FromStr;
use uuid::Uuid;

const TRANSACTION_COLUMNS: &str = "id, app_name, user_id, amount, currency, phone_number, status, \
     moko_reference, freshpay_ref, metadata, created_at, updated_at";

/// Transaction entity
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Transaction {
    pub id: Uuid,
    pub app_name: String,
    pub user_id: Option<String>,
    pub amount: BigDecimal,
    pub currency: String,
    pub phone_number: String,
    pub status: String,
    /// Internally generated reference sent to the aggregator
    pub moko_reference: String,
    /// Aggregator-assigned transaction id
    pub freshpay_ref: Option<String>,
    pub metadata: serde_json::Value,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl Transaction {
    pub fn state(&self) -> Option<PaymentState> {
        PaymentState::from_str(&self.status).ok()
    }
}

/// Values needed to open a transaction in `PENDING` state
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub app_name: String,
    pub user_id: Option<String>,
    pub amount: BigDecimal,
    pub currency: String,
    pub phone_number: String,
    pub reference: String,
}

/// How an inbound callback is correlated with stored transactions.
///
/// When both identifiers are known a row matches on either of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceMatch {
    Either {
        reference: String,
        provider_reference: String,
    },
    Reference(String),
    ProviderReference(String),
}

impl ReferenceMatch {
    /// Returns `None` when neither identifier is present.
    pub fn from_parts(reference: Option<String>, provider_reference: Option<String>) -> Option<Self> {
        match (reference, provider_reference) {
            (Some(reference), Some(provider_reference)) => Some(ReferenceMatch::Either {
                reference,
                provider_reference,
            }),
            (Some(reference), None) => Some(ReferenceMatch::Reference(reference)),
            (None, Some(provider_reference)) => {
                Some(ReferenceMatch::ProviderReference(provider_reference))
            }
            (None, None) => None,
        }
    }

    pub fn reference(&self) -> Option<&str> {
        match self {
            ReferenceMatch::Either { reference, .. } | ReferenceMatch::Reference(reference) => {
                Some(reference)
            }
            ReferenceMatch::ProviderReference(_) => None,
        }
    }

    pub fn provider_reference(&self) -> Option<&str> {
        match self {
            ReferenceMatch::Either {
                provider_reference, ..
            }
            | ReferenceMatch::ProviderReference(provider_reference) => Some(provider_reference),
            ReferenceMatch::Reference(_) => None,
        }
    }

    /// In-memory equivalent of the SQL predicate used by `update_matching`.
    pub fn matches(&self, transaction: &Transaction) -> bool {
        let by_reference = self
            .reference()
            .is_some_and(|r| transaction.moko_reference == r);
        let by_provider = self
            .provider_reference()
            .is_some_and(|p| transaction.freshpay_ref.as_deref() == Some(p));
        by_reference || by_provider
    }
}

/// Status change applied to one or more transactions.
///
/// `metadata` must be a JSON object; it is merged into the stored metadata.
#[derive(Debug, Clone)]
pub struct StatusUpdate {
    pub status: PaymentState,
    pub provider_reference: Option<String>,
    pub metadata: serde_json::Value,
}

/// Persistence operations the payment flows depend on
#[async_trait]
pub trait TransactionStore: Send + Sync {
    async fn insert_pending(&self, new: &NewTransaction) -> Result<Transaction, DatabaseError>;

    async fn update_by_id(
        &self,
        id: Uuid,
        update: &StatusUpdate,
    ) -> Result<Transaction, DatabaseError>;

    /// Apply `update` to every row matching `matcher`, returning the updated rows.
    async fn update_matching(
        &self,
        matcher: &ReferenceMatch,
        update: &StatusUpdate,
    ) -> Result<Vec<Transaction>, DatabaseError>;

    async fn find_by_reference(&self, reference: &str)
        -> Result<Option<Transaction>, DatabaseError>;

    async fn ping(&self) -> Result<(), DatabaseError>;
}

/// Postgres-backed transaction store
#[derive(Clone)]
pub struct TransactionRepository {
    pool: PgPool,
}

impl TransactionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TransactionStore for TransactionRepository {
    async fn insert_pending(&self, new: &NewTransaction) -> Result<Transaction, DatabaseError> {
        sqlx::query_as::<_, Transaction>(&format!(
            "INSERT INTO transactions
             (app_name, user_id, amount, currency, phone_number, status, moko_reference)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {}",
            TRANSACTION_COLUMNS
        ))
        .bind(&new.app_name)
        .bind(&new.user_id)
        .bind(&new.amount)
        .bind(&new.currency)
        .bind(&new.phone_number)
        .bind(PaymentState::Pending.as_str())
        .bind(&new.reference)
        .fetch_one(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    async fn update_by_id(
        &self,
        id: Uuid,
        update: &StatusUpdate,
    ) -> Result<Transaction, DatabaseError> {
        sqlx::query_as::<_, Transaction>(&format!(
            "UPDATE transactions
             SET status = $2,
                 freshpay_ref = COALESCE($3, freshpay_ref),
                 metadata = metadata || $4::jsonb,
                 updated_at = NOW()
             WHERE id = $1
             RETURNING {}",
            TRANSACTION_COLUMNS
        ))
        .bind(id)
        .bind(update.status.as_str())
        .bind(update.provider_reference.as_deref())
        .bind(&update.metadata)
        .fetch_one(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    async fn update_matching(
        &self,
        matcher: &ReferenceMatch,
        update: &StatusUpdate,
    ) -> Result<Vec<Transaction>, DatabaseError> {
        sqlx::query_as::<_, Transaction>(&format!(
            "UPDATE transactions
             SET status = $3,
                 freshpay_ref = COALESCE($4, freshpay_ref),
                 metadata = metadata || $5::jsonb,
                 updated_at = NOW()
             WHERE ($1::text IS NOT NULL AND moko_reference = $1)
                OR ($2::text IS NOT NULL AND freshpay_ref = $2)
             RETURNING {}",
            TRANSACTION_COLUMNS
        ))
        .bind(matcher.reference())
        .bind(matcher.provider_reference())
        .bind(update.status.as_str())
        .bind(update.provider_reference.as_deref())
        .bind(&update.metadata)
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    async fn find_by_reference(
        &self,
        reference: &str,
    ) -> Result<Option<Transaction>, DatabaseError> {
        sqlx::query_as::<_, Transaction>(&format!(
            "SELECT {} FROM transactions WHERE moko_reference = $1",
            TRANSACTION_COLUMNS
        ))
        .bind(reference)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        crate::database::health_check(&self.pool).await
    }
}
