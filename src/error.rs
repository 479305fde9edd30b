//! Error types shared by every command.

use thiserror::Error;

/// Errors that can occur while running a POS operation.
#[derive(Debug, Error)]
pub enum AppError {
    /// An underlying SQLite error occurred.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The requested row does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Form validation failed (required fields, lengths, negative numbers).
    #[error("Invalid input: {0}")]
    Validation(String),

    /// The requested quantity exceeds the available stock.
    #[error("Insufficient stock for {product}: requested {requested}, available {available}")]
    InsufficientStock {
        product: String,
        requested: f64,
        available: f64,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// The connection mutex was poisoned by a panicking thread.
    #[error("Database lock poisoned")]
    LockPoisoned,
}

impl AppError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        AppError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }
}

impl<T> From<std::sync::PoisonError<T>> for AppError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        AppError::LockPoisoned
    }
}

pub type AppResult<T> = Result<T, AppError>;
