use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReturnsError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Malformed input: bad enum value, bad pincode, missing field.
    /// Nothing is persisted.
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    /// Well-formed input rejected by business state: ineligible order,
    /// illegal cancellation, unknown webhook event.
    #[error("{0}")]
    Rejected(String),

    /// Webhook token mismatch. Raised before any lookup happens.
    #[error("Invalid webhook token")]
    Unauthorized,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ReturnsError {
    pub fn validation(msg: impl Into<String>) -> Self {
        ReturnsError::Validation(msg.into())
    }

    pub fn not_found(entity: &'static str, key: impl Into<String>) -> Self {
        ReturnsError::NotFound {
            entity,
            key: key.into(),
        }
    }

    pub fn rejected(msg: impl Into<String>) -> Self {
        ReturnsError::Rejected(msg.into())
    }
}

pub type ReturnsResult<T> = Result<T, ReturnsError>;
