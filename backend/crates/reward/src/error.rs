//! Reward Error Types
//!
//! Ledger-specific error variants that integrate with the unified
//! `kernel::error::AppError` system.
//!
//! A duplicate commission is deliberately absent: it is an idempotent
//! success (`CommissionOutcome::AlreadyPaid`), not a failure.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use kernel::error::conversions::classify_sqlx_error;
use kernel::error::{app_error::AppError, kind::ErrorKind};
use thiserror::Error;

/// Reward-specific result type alias
pub type RewardResult<T> = Result<T, RewardError>;

#[derive(Debug, Error)]
pub enum RewardError {
    /// Negative amount, empty origin, malformed identifier
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The user id does not resolve to an account
    #[error("User not found")]
    UserNotFound,

    /// The referral code does not resolve to an account
    #[error("Referral code not found")]
    ReferralCodeNotFound,

    /// Missing or rejected bearer token
    #[error("Authentication required")]
    Unauthorized,

    /// The store rejected or failed the unit; nothing was committed
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The store could not be reached; nothing was committed
    #[error("Ledger store unavailable: {0}")]
    Unavailable(String),

    /// The unit did not finish within the configured timeout and was rolled back
    #[error("Ledger operation timed out")]
    Timeout,

    /// Broken invariant inside the service (corrupt row, bug)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl RewardError {
    /// Get the ErrorKind for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            RewardError::InvalidArgument(_) => ErrorKind::BadRequest,
            RewardError::UserNotFound | RewardError::ReferralCodeNotFound => ErrorKind::NotFound,
            RewardError::Unauthorized => ErrorKind::Unauthorized,
            RewardError::Database(e) => classify_sqlx_error(e).0,
            RewardError::Unavailable(_) | RewardError::Timeout => ErrorKind::ServiceUnavailable,
            RewardError::Internal(_) => ErrorKind::InternalServerError,
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.kind().status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Whether the caller may safely retry: the unit was rolled back in full
    pub fn is_retryable(&self) -> bool {
        match self {
            RewardError::Database(_) | RewardError::Unavailable(_) | RewardError::Timeout => {
                self.kind().is_retryable()
            }
            _ => false,
        }
    }

    /// Convert to AppError
    pub fn to_app_error(&self) -> AppError {
        let err = AppError::new(self.kind(), self.to_string());
        if self.is_retryable() {
            err.with_action("Retry the request; no partial change was applied")
        } else {
            err
        }
    }

    /// Log the error with appropriate level
    pub(crate) fn log(&self) {
        match self {
            RewardError::Database(e) => {
                tracing::error!(error = %e, "Reward database error");
            }
            RewardError::Unavailable(msg) => {
                tracing::error!(message = %msg, "Ledger store unavailable");
            }
            RewardError::Internal(msg) => {
                tracing::error!(message = %msg, "Reward internal error");
            }
            RewardError::Timeout => {
                tracing::warn!("Ledger unit timed out");
            }
            RewardError::Unauthorized => {
                tracing::warn!("Rejected bearer token");
            }
            _ => {
                tracing::debug!(error = %self, "Reward error");
            }
        }
    }
}

impl From<RewardError> for AppError {
    fn from(err: RewardError) -> Self {
        err.to_app_error()
    }
}

impl IntoResponse for RewardError {
    fn into_response(self) -> Response {
        self.log();
        self.to_app_error().into_response()
    }
}

impl From<platform::token::TokenError> for RewardError {
    fn from(_: platform::token::TokenError) -> Self {
        RewardError::Unauthorized
    }
}
