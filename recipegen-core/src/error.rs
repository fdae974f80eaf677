use thiserror::Error;

/// Core error type for recipegen.
/// Only transport failures reach callers of a generation; decode noise,
/// empty-choice frames and the end-of-stream sentinel are absorbed by the parser.
#[derive(Debug, Error)]
pub enum RecipeGenError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("completion endpoint rejected the request: {status} {message}")]
    TransportRejected { status: u16, message: String },

    #[error("completion endpoint unavailable: {reason}")]
    TransportUnavailable { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RecipeGenError {
    /// Short, stable label used in telemetry records.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::TransportRejected { .. } => "transport_rejected",
            Self::TransportUnavailable { .. } => "transport_unavailable",
            Self::Io(_) => "io",
            Self::Other(_) => "other",
        }
    }
}

pub type CoreResult<T> = std::result::Result<T, RecipeGenError>;
