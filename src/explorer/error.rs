use serde::Serialize;
use thiserror::Error;

/// Why the upstream API definitively refused a request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum RejectionKind {
    InvalidAddress,
    NotFound,
    InvalidApiKey,
    RateQuotaExhausted,
    NotVerified,
    Other,
}

impl RejectionKind {
    /// Maps the free-text `result`/`message` of a NOTOK reply onto a kind.
    pub fn from_upstream_message(message: &str) -> Self {
        let message = message.to_ascii_lowercase();
        if message.contains("invalid api key") || message.contains("missing/invalid api key") {
            RejectionKind::InvalidApiKey
        } else if message.contains("rate limit") || message.contains("max calls") {
            RejectionKind::RateQuotaExhausted
        } else if message.contains("not verified") {
            RejectionKind::NotVerified
        } else if message.contains("invalid address") {
            RejectionKind::InvalidAddress
        } else if message.contains("not found") {
            RejectionKind::NotFound
        } else {
            RejectionKind::Other
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExplorerError {
    #[error("Invalid address: {input:?}")]
    InvalidAddress { input: String },

    #[error("Upstream {endpoint} failed after {attempts} attempt(s): {message}")]
    TransientUpstream {
        endpoint: String,
        attempts: u32,
        message: String,
    },

    #[error("Upstream rejected {endpoint} ({kind:?}): {message}")]
    UpstreamRejection {
        endpoint: String,
        kind: RejectionKind,
        message: String,
    },

    #[error("Malformed upstream response: {0}")]
    MalformedResponse(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Timeout error: {0}")]
    TimeoutError(String),

    #[error("HTTP status {status}: {message}")]
    HttpStatus { status: u16, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExplorerErrorType {
    InvalidAddress,
    TransientUpstream,
    UpstreamRejection,
    MalformedResponse,
    NetworkError,
    TimeoutError,
    ServerError,
    ClientError,
}

impl ExplorerError {
    pub fn error_type(&self) -> ExplorerErrorType {
        match self {
            ExplorerError::InvalidAddress { .. } => ExplorerErrorType::InvalidAddress,
            ExplorerError::TransientUpstream { .. } => ExplorerErrorType::TransientUpstream,
            ExplorerError::UpstreamRejection { .. } => ExplorerErrorType::UpstreamRejection,
            ExplorerError::MalformedResponse(_) => ExplorerErrorType::MalformedResponse,
            ExplorerError::NetworkError(_) => ExplorerErrorType::NetworkError,
            ExplorerError::TimeoutError(_) => ExplorerErrorType::TimeoutError,
            ExplorerError::HttpStatus { status, .. } if *status == 429 || *status >= 500 => {
                ExplorerErrorType::ServerError
            }
            ExplorerError::HttpStatus { .. } => ExplorerErrorType::ClientError,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self.error_type(),
            ExplorerErrorType::NetworkError
                | ExplorerErrorType::TimeoutError
                | ExplorerErrorType::ServerError
                | ExplorerErrorType::MalformedResponse
        )
    }

    pub fn rejection_kind(&self) -> Option<RejectionKind> {
        match self {
            ExplorerError::UpstreamRejection { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ExplorerError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            ExplorerError::TimeoutError(error.to_string())
        } else if error.is_decode() {
            ExplorerError::MalformedResponse(error.to_string())
        } else if let Some(status) = error.status() {
            ExplorerError::HttpStatus {
                status: status.as_u16(),
                message: error.to_string(),
            }
        } else {
            ExplorerError::NetworkError(error.to_string())
        }
    }
}
