use std::fmt;

use axum::http::StatusCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouterErrorKind {
    InvalidConfig,
    MissingReferencePool,
    Upstream,
    Encoding,
    Cancelled,
    Internal,
}

impl RouterErrorKind {
    pub fn label(&self) -> &'static str {
        match self {
            RouterErrorKind::InvalidConfig => "invalid_config",
            RouterErrorKind::MissingReferencePool => "missing_reference_pool",
            RouterErrorKind::Upstream => "upstream",
            RouterErrorKind::Encoding => "encoding",
            RouterErrorKind::Cancelled => "cancelled",
            RouterErrorKind::Internal => "internal",
        }
    }
}

/// Failure of a routing call. "No route found" is never an error; callers get
/// `Ok(None)` for that.
#[derive(Debug)]
pub struct RouterError {
    kind: RouterErrorKind,
    message: String,
}

impl RouterError {
    pub fn invalid_config<T: Into<String>>(message: T) -> Self {
        Self {
            kind: RouterErrorKind::InvalidConfig,
            message: message.into(),
        }
    }

    pub fn missing_reference_pool<T: Into<String>>(message: T) -> Self {
        Self {
            kind: RouterErrorKind::MissingReferencePool,
            message: message.into(),
        }
    }

    pub fn upstream<T: Into<String>>(message: T) -> Self {
        Self {
            kind: RouterErrorKind::Upstream,
            message: message.into(),
        }
    }

    pub fn encoding<T: Into<String>>(message: T) -> Self {
        Self {
            kind: RouterErrorKind::Encoding,
            message: message.into(),
        }
    }

    pub fn cancelled<T: Into<String>>(message: T) -> Self {
        Self {
            kind: RouterErrorKind::Cancelled,
            message: message.into(),
        }
    }

    pub fn internal<T: Into<String>>(message: T) -> Self {
        Self {
            kind: RouterErrorKind::Internal,
            message: message.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self.kind {
            RouterErrorKind::InvalidConfig => StatusCode::BAD_REQUEST,
            RouterErrorKind::Upstream => StatusCode::BAD_GATEWAY,
            RouterErrorKind::Cancelled => StatusCode::GATEWAY_TIMEOUT,
            RouterErrorKind::MissingReferencePool
            | RouterErrorKind::Encoding
            | RouterErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn kind(&self) -> RouterErrorKind {
        self.kind
    }
}

impl fmt::Display for RouterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.label(), self.message)
    }
}

impl std::error::Error for RouterError {}

/// Failure reported by a quote source for a whole batch of routes.
#[derive(Debug)]
pub enum QuoteProviderError {
    Unavailable(String),
    Timeout(u64),
}

impl fmt::Display for QuoteProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuoteProviderError::Unavailable(reason) => write!(f, "quote source unavailable: {reason}"),
            QuoteProviderError::Timeout(ms) => write!(f, "quote batch timed out after {ms} ms"),
        }
    }
}

impl std::error::Error for QuoteProviderError {}

#[derive(Debug)]
pub enum PoolProviderError {
    Unavailable(String),
}

impl fmt::Display for PoolProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoolProviderError::Unavailable(reason) => write!(f, "pool source unavailable: {reason}"),
        }
    }
}

impl std::error::Error for PoolProviderError {}

#[derive(Debug)]
pub enum GasPriceError {
    Unavailable(String),
}

impl fmt::Display for GasPriceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GasPriceError::Unavailable(reason) => write!(f, "gas price unavailable: {reason}"),
        }
    }
}

impl std::error::Error for GasPriceError {}

impl From<PoolProviderError> for RouterError {
    fn from(err: PoolProviderError) -> Self {
        RouterError::upstream(err.to_string())
    }
}

impl From<GasPriceError> for RouterError {
    fn from(err: GasPriceError) -> Self {
        RouterError::upstream(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_kinds_to_status_codes() {
        assert_eq!(
            RouterError::invalid_config("x").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            RouterError::upstream("x").status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            RouterError::missing_reference_pool("x").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            RouterError::cancelled("x").status_code(),
            StatusCode::GATEWAY_TIMEOUT
        );
    }

    #[test]
    fn collaborator_errors_become_upstream() {
        let err: RouterError = GasPriceError::Unavailable("rpc down".to_string()).into();
        assert_eq!(err.kind(), RouterErrorKind::Upstream);
        assert_eq!(err.message(), "gas price unavailable: rpc down");
        assert_eq!(err.to_string(), "upstream: gas price unavailable: rpc down");
    }
}
