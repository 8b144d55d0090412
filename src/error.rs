//! Error types for the school library server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

/// Numeric error codes returned in every error body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Failure = 1,
    NotAuthenticated = 2,
    NotAuthorized = 3,
    DbFailure = 4,
    NoSuchData = 5,
    BookNotAvailable = 6,
    MaxBorrowsReached = 7,
    AlreadyRenewed = 8,
    AlreadyBorrowed = 9,
    NotBorrowed = 10,
    RenewalExpired = 11,
    Conflict = 12,
    BadValue = 13,
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication required: {0}")]
    Unauthenticated(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("The book {book} has already been renewed by this student")]
    AlreadyRenewed { book: String },

    #[error("The book {book} is already borrowed by this student")]
    AlreadyBorrowed { book: String },

    #[error("The book {book} is not available.{}", availability_note(.available_on))]
    OutOfStock {
        book: String,
        /// Earliest due date among the open loans of the book
        available_on: Option<DateTime<Utc>>,
    },

    #[error("Student has already borrowed {limit} books")]
    BorrowLimitReached { limit: u32 },

    #[error("Student does not have the book {book} borrowed")]
    NotBorrowed { book: String },

    #[error("The book {book} cannot be renewed anymore, it was due on {due_date}")]
    RenewalExpired {
        book: String,
        due_date: DateTime<Utc>,
    },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

fn availability_note(available_on: &Option<DateTime<Utc>>) -> String {
    match available_on {
        Some(date) => format!(
            " The earliest date it will be available is on {}.",
            date.format("%Y-%m-%d %H:%M UTC")
        ),
        None => String::new(),
    }
}

impl AppError {
    /// Status and code pair for this error
    pub fn status_and_code(&self) -> (StatusCode, ErrorCode) {
        match self {
            AppError::Unauthenticated(_) => (StatusCode::UNAUTHORIZED, ErrorCode::NotAuthenticated),
            AppError::Forbidden(_) => (StatusCode::FORBIDDEN, ErrorCode::NotAuthorized),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, ErrorCode::NoSuchData),
            AppError::AlreadyRenewed { .. } => (StatusCode::CONFLICT, ErrorCode::AlreadyRenewed),
            AppError::AlreadyBorrowed { .. } => (StatusCode::CONFLICT, ErrorCode::AlreadyBorrowed),
            AppError::OutOfStock { .. } => (StatusCode::CONFLICT, ErrorCode::BookNotAvailable),
            AppError::BorrowLimitReached { .. } => {
                (StatusCode::CONFLICT, ErrorCode::MaxBorrowsReached)
            }
            AppError::NotBorrowed { .. } => (StatusCode::CONFLICT, ErrorCode::NotBorrowed),
            AppError::RenewalExpired { .. } => (StatusCode::CONFLICT, ErrorCode::RenewalExpired),
            AppError::Conflict(_) => (StatusCode::CONFLICT, ErrorCode::Conflict),
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, ErrorCode::BadValue),
            AppError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::DbFailure),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::Failure),
        }
    }
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub code: u32,
    pub error: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                "Database error".to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(ErrorResponse {
            code: code as u32,
            error: format!("{:?}", code),
            message,
        });

        (status, body).into_response()
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.to_string())
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
