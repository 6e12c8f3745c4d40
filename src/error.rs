//! Application error handling
//!
//! A unified error system with HTTP status mapping, user-facing messages
//! and machine-readable error codes for client handling.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Error codes for programmatic handling
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum ErrorCode {
    // Domain errors (4xx)
    #[serde(rename = "TRANSACTION_NOT_FOUND")]
    TransactionNotFound,
    #[serde(rename = "PAYMENT_DECLINED")]
    PaymentDeclined,

    // Infrastructure errors (5xx)
    #[serde(rename = "DATABASE_ERROR")]
    DatabaseError,
    #[serde(rename = "CONFIGURATION_ERROR")]
    ConfigurationError,

    // External errors
    #[serde(rename = "INVALID_PROVIDER_RESPONSE")]
    InvalidProviderResponse,
    #[serde(rename = "PAYMENT_PROVIDER_ERROR")]
    PaymentProviderError,

    // Generic
    #[serde(rename = "INTERNAL_ERROR")]
    InternalError,
    #[serde(rename = "VALIDATION_ERROR")]
    ValidationError,
}

/// Business outcomes that end a request early
#[derive(Debug, Clone)]
pub enum DomainError {
    /// No transaction carries the given internal reference
    TransactionNotFound { reference: String },
    /// Aggregator answered but refused the debit
    PaymentDeclined {
        reason: String,
        provider_status: Option<String>,
    },
}

/// Infrastructure-level errors (database, configuration)
#[derive(Debug, Clone)]
pub enum InfrastructureError {
    Database { message: String, is_retryable: bool },
    Configuration { message: String },
}

/// Errors talking to the aggregator
#[derive(Debug, Clone)]
pub enum ExternalError {
    /// The aggregator could not be reached or rejected the connection
    PaymentProvider {
        provider: String,
        message: String,
        is_retryable: bool,
    },
    /// The provider answered with something that is not JSON
    InvalidProviderResponse { raw_excerpt: String },
}

/// Input validation errors
#[derive(Debug, Clone)]
pub enum ValidationError {
    MissingFields { fields: Vec<String> },
    Invalid { field: String, reason: String },
}

/// Unified application error type
#[derive(Debug, Clone)]
pub struct AppError {
    pub kind: AppErrorKind,
    pub request_id: Option<String>,
    pub context: Option<String>,
}

#[derive(Debug, Clone)]
pub enum AppErrorKind {
    Domain(DomainError),
    Infrastructure(InfrastructureError),
    External(ExternalError),
    Validation(ValidationError),
}

impl AppError {
    pub fn new(kind: AppErrorKind) -> Self {
        Self {
            kind,
            request_id: None,
            context: None,
        }
    }

    pub fn missing_fields<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(AppErrorKind::Validation(ValidationError::MissingFields {
            fields: fields.into_iter().map(Into::into).collect(),
        }))
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(AppErrorKind::Infrastructure(
            InfrastructureError::Configuration {
                message: message.into(),
            },
        ))
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn with_request_id_opt(mut self, request_id: Option<String>) -> Self {
        if request_id.is_some() {
            self.request_id = request_id;
        }
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Map error to HTTP status code
    pub fn status_code(&self) -> u16 {
        match &self.kind {
            AppErrorKind::Domain(err) => match err {
                DomainError::TransactionNotFound { .. } => 404,
                DomainError::PaymentDeclined { .. } => 400,
            },
            AppErrorKind::Infrastructure(_) => 500,
            AppErrorKind::External(err) => match err {
                ExternalError::PaymentProvider { .. } => 502,
                ExternalError::InvalidProviderResponse { .. } => 500,
            },
            AppErrorKind::Validation(_) => 400,
        }
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> ErrorCode {
        match &self.kind {
            AppErrorKind::Domain(err) => match err {
                DomainError::TransactionNotFound { .. } => ErrorCode::TransactionNotFound,
                DomainError::PaymentDeclined { .. } => ErrorCode::PaymentDeclined,
            },
            AppErrorKind::Infrastructure(err) => match err {
                InfrastructureError::Database { .. } => ErrorCode::DatabaseError,
                InfrastructureError::Configuration { .. } => ErrorCode::ConfigurationError,
            },
            AppErrorKind::External(err) => match err {
                ExternalError::PaymentProvider { .. } => ErrorCode::PaymentProviderError,
                ExternalError::InvalidProviderResponse { .. } => {
                    ErrorCode::InvalidProviderResponse
                }
            },
            AppErrorKind::Validation(_) => ErrorCode::ValidationError,
        }
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match &self.kind {
            AppErrorKind::Domain(err) => match err {
                DomainError::TransactionNotFound { reference } => {
                    format!("Transaction '{}' not found", reference)
                }
                DomainError::PaymentDeclined { .. } => "Payment initiation failed".to_string(),
            },
            AppErrorKind::Infrastructure(err) => match err {
                InfrastructureError::Database { .. } => match &self.context {
                    Some(context) => context.clone(),
                    None => "Service temporarily unavailable. Please try again later".to_string(),
                },
                InfrastructureError::Configuration { .. } => {
                    "Server configuration error".to_string()
                }
            },
            AppErrorKind::External(err) => match err {
                ExternalError::PaymentProvider {
                    provider,
                    is_retryable,
                    ..
                } => {
                    if *is_retryable {
                        format!(
                            "Payment provider ({}) is temporarily unavailable. Please try again",
                            provider
                        )
                    } else {
                        "Payment processing failed. Please contact support".to_string()
                    }
                }
                ExternalError::InvalidProviderResponse { .. } => {
                    "Invalid response from payment provider".to_string()
                }
            },
            AppErrorKind::Validation(err) => match err {
                ValidationError::MissingFields { fields } => {
                    format!("Missing required fields: {}", fields.join(", "))
                }
                ValidationError::Invalid { field, reason } => {
                    format!("Invalid value for '{}': {}", field, reason)
                }
            },
        }
    }

    /// Extra diagnostics returned to the caller alongside the message
    pub fn details(&self) -> Option<serde_json::Value> {
        match &self.kind {
            AppErrorKind::Domain(DomainError::PaymentDeclined {
                reason,
                provider_status,
            }) => Some(serde_json::json!({
                "details": reason,
                "provider_status": provider_status,
            })),
            AppErrorKind::External(ExternalError::InvalidProviderResponse { raw_excerpt }) => {
                Some(serde_json::json!({ "raw_response": raw_excerpt }))
            }
            AppErrorKind::Validation(ValidationError::MissingFields { fields }) => {
                Some(serde_json::json!({ "missing": fields }))
            }
            _ => None,
        }
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        match &self.kind {
            AppErrorKind::Domain(_) => false,
            AppErrorKind::Infrastructure(err) => match err {
                InfrastructureError::Database { is_retryable, .. } => *is_retryable,
                InfrastructureError::Configuration { .. } => false,
            },
            AppErrorKind::External(err) => match err {
                ExternalError::PaymentProvider { is_retryable, .. } => *is_retryable,
                ExternalError::InvalidProviderResponse { .. } => false,
            },
            AppErrorKind::Validation(_) => false,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.user_message())
    }
}

impl std::error::Error for AppError {}

// From<DatabaseError> lives in database/error.rs, From<PaymentError> in payments/error.rs
