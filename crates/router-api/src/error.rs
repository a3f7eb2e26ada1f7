use thiserror::Error;

/// Failures talking to the routing or bridge service.
#[derive(Debug, Error)]
pub enum RouterError {
    /// Connection, TLS or body transfer failure.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The service answered with a non-2xx status.
    #[error("service returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// A 2xx body that does not match the expected shape.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("invalid client configuration: {0}")]
    Config(String),
}

impl RouterError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type RouterResult<T> = Result<T, RouterError>;
