//! Error types for the storefront core library

use thiserror::Error;

/// Result type alias for storefront operations
pub type Result<T> = std::result::Result<T, StorefrontError>;

/// Main error type for storefront operations
#[derive(Error, Debug)]
pub enum StorefrontError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Task not found: {id}")]
    TaskNotFound { id: String },

    #[error("Source log unavailable: {path}")]
    SourceUnavailable { path: String },

    #[error("Task execution interrupted: {id}")]
    ExecutionInterrupted { id: String },

    #[error("Task execution panicked: {id}")]
    TaskPanicked { id: String },

    #[error("Product not found: {id}")]
    ProductNotFound { id: i64 },

    #[error("Order not found: {id}")]
    OrderNotFound { id: i64 },

    #[error("Product is used by existing orders: {name}")]
    ProductInUse { name: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

impl StorefrontError {
    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}
