//! # Application Error Types
//!
//! Common error types used throughout the homework bot, plus structured
//! error-logging helpers shared by the handler modules.

use std::fmt;

/// General application error type for consistent error handling
#[derive(Debug, Clone, PartialEq)]
pub enum AppError {
    /// Configuration validation errors
    Config(String),
    /// Validation errors (names, emails, links, dates)
    Validation(String),
    /// Database operation errors
    Database(String),
    /// Telegram API errors
    Telegram(String),
    /// Internal application errors
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(msg) => write!(f, "[CONFIG] {}", msg),
            AppError::Validation(msg) => write!(f, "[VALIDATION] {}", msg),
            AppError::Database(msg) => write!(f, "[DATABASE] {}", msg),
            AppError::Telegram(msg) => write!(f, "[TELEGRAM] {}", msg),
            AppError::Internal(msg) => write!(f, "[INTERNAL] {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Database(err.to_string())
    }
}

impl From<teloxide::RequestError> for AppError {
    fn from(err: teloxide::RequestError) -> Self {
        AppError::Telegram(err.to_string())
    }
}

/// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;

/// Standardized error logging utilities for consistent error reporting
pub mod error_logging {
    use tracing::error;

    /// Log database operation errors with contextual information
    pub fn log_database_error(
        error: &impl std::fmt::Display,
        operation: &str,
        chat_id: Option<i64>,
    ) {
        error!(
            error = %error,
            operation = %operation,
            chat_id = ?chat_id,
            "Database operation failed"
        );
    }

    /// Log Telegram send/edit failures with the destination chat
    pub fn log_telegram_error(error: &impl std::fmt::Display, operation: &str, chat_id: i64) {
        error!(
            error = %error,
            operation = %operation,
            chat_id = %chat_id,
            "Telegram operation failed"
        );
    }

    /// Log dialogue state transition failures
    pub fn log_dialogue_error(
        error: &impl std::fmt::Display,
        state: &str,
        chat_id: i64,
    ) {
        error!(
            error = %error,
            state = %state,
            chat_id = %chat_id,
            "Dialogue state transition failed"
        );
    }

    /// Log validation errors with input context
    pub fn log_validation_error(
        error: &impl std::fmt::Display,
        operation: &str,
        chat_id: Option<i64>,
        input_type: &str,
        input_value: Option<&str>,
    ) {
        error!(
            error = %error,
            operation = %operation,
            chat_id = ?chat_id,
            input_type = %input_type,
            input_value = ?input_value.map(|v| if v.chars().count() > 100 { format!("{}...", v.chars().take(100).collect::<String>()) } else { v.to_string() }),
            "Validation failed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_category_tag() {
        let err = AppError::Validation("bad email".to_string());
        assert_eq!(format!("{}", err), "[VALIDATION] bad email");

        let err = AppError::Database("locked".to_string());
        assert_eq!(format!("{}", err), "[DATABASE] locked");
    }

    #[test]
    fn converts_from_anyhow() {
        let err: AppError = anyhow::anyhow!("boom").into();
        assert_eq!(err, AppError::Internal("boom".to_string()));
    }
}
