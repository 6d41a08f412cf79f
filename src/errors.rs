use thiserror::Error;

#[derive(Error, Debug)]
pub enum FeeError {
    #[error("{message}")]
    Validation { message: String },

    /// server rejected a batch because some heads were already paid;
    /// the recovery path in the submission workflow branches on this
    #[error("{message} (already paid: {})", paid_heads.join(", "))]
    DuplicatePayment {
        paid_heads: Vec<String>,
        message: String,
    },

    /// opaque upstream failure, surfaced verbatim
    #[error("{message}")]
    Remote { message: String },

    #[error("invalid access code")]
    InvalidAccessCode,

    #[error("submission already in progress")]
    SubmitInProgress,

    #[error("session storage error: {message}")]
    Session { message: String },

    #[error("csv export failed: {0}")]
    Export(#[from] csv::Error),
}

impl FeeError {
    pub fn validation(message: impl Into<String>) -> Self {
        FeeError::Validation {
            message: message.into(),
        }
    }

    pub fn remote(message: impl Into<String>) -> Self {
        FeeError::Remote {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, FeeError>;
