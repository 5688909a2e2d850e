//! Error taxonomy of the proxy.
//!
//! Every failure surfaced to a caller is a [`ProxyError`]. The code decides
//! the HTTP status and the `reason` of the Kubernetes-style `Status` body.

use std::fmt;

/// Well-known proxy error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum ProxyErrorCode {
    /// Malformed or incomplete record.
    Validation,
    /// Malformed request.
    #[default]
    BadRequest,
    /// The named proxy target does not exist or is unusable.
    TargetNotFound,
    /// Resource or route not found.
    NotFound,
    /// Resource with the same name already exists.
    AlreadyExists,
    /// Optimistic concurrency conflict.
    Conflict,
    /// Method not supported on the route.
    MethodNotAllowed,
    /// The vendor client rejected the credential shape.
    ClientInit,
    /// The vendor call failed.
    Transport,
    /// The vendor response is not a valid envelope.
    Decode,
    /// The envelope body is not valid base64.
    BodyDecode,
    /// The caller abandoned the request or its deadline expired.
    Cancelled,
    /// Internal error.
    Internal,
}

impl ProxyErrorCode {
    /// Short code string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "ValidationError",
            Self::BadRequest => "BadRequest",
            Self::TargetNotFound => "TargetNotFoundError",
            Self::NotFound => "NotFound",
            Self::AlreadyExists => "AlreadyExists",
            Self::Conflict => "Conflict",
            Self::MethodNotAllowed => "MethodNotAllowed",
            Self::ClientInit => "ClientInitError",
            Self::Transport => "TransportError",
            Self::Decode => "DecodeError",
            Self::BodyDecode => "BodyDecodeError",
            Self::Cancelled => "CancelledError",
            Self::Internal => "InternalError",
        }
    }

    /// Kubernetes `Status.reason` for this code.
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Validation => "Invalid",
            Self::BadRequest | Self::ClientInit => "BadRequest",
            Self::TargetNotFound | Self::NotFound => "NotFound",
            Self::AlreadyExists => "AlreadyExists",
            Self::Conflict => "Conflict",
            Self::MethodNotAllowed => "MethodNotAllowed",
            Self::Transport => "ServiceUnavailable",
            Self::Decode | Self::BodyDecode | Self::Internal => "InternalError",
            Self::Cancelled => "Timeout",
        }
    }

    /// Default HTTP status code for this error.
    #[must_use]
    pub fn default_status_code(&self) -> http::StatusCode {
        match self {
            Self::Validation => http::StatusCode::UNPROCESSABLE_ENTITY,
            Self::BadRequest | Self::ClientInit => http::StatusCode::BAD_REQUEST,
            Self::TargetNotFound | Self::NotFound => http::StatusCode::NOT_FOUND,
            Self::AlreadyExists | Self::Conflict => http::StatusCode::CONFLICT,
            Self::MethodNotAllowed => http::StatusCode::METHOD_NOT_ALLOWED,
            Self::Transport | Self::Decode | Self::BodyDecode => http::StatusCode::BAD_GATEWAY,
            Self::Cancelled => http::StatusCode::GATEWAY_TIMEOUT,
            Self::Internal => http::StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for ProxyErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A proxy error.
#[derive(Debug)]
pub struct ProxyError {
    /// The error code.
    pub code: ProxyErrorCode,
    /// A human-readable error message.
    pub message: String,
    /// The HTTP status code.
    pub status_code: http::StatusCode,
    /// The underlying source error, if any.
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for ProxyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ProxyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

impl ProxyError {
    /// Create a new `ProxyError` with a custom message.
    #[must_use]
    pub fn with_message(code: ProxyErrorCode, message: impl Into<String>) -> Self {
        Self {
            status_code: code.default_status_code(),
            message: message.into(),
            code,
            source: None,
        }
    }

    /// Set the source error.
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Kubernetes `Status.reason` for this error.
    #[must_use]
    pub fn reason(&self) -> &'static str {
        self.code.reason()
    }

    // -- Convenience constructors --

    /// Malformed or incomplete record.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::with_message(ProxyErrorCode::Validation, message)
    }

    /// Malformed request.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::with_message(ProxyErrorCode::BadRequest, message)
    }

    /// Unknown or unusable proxy target.
    #[must_use]
    pub fn target_not_found(name: &str) -> Self {
        Self::with_message(ProxyErrorCode::TargetNotFound, format!("no such cluster {name}"))
    }

    /// Resource not found.
    #[must_use]
    pub fn not_found(name: &str) -> Self {
        Self::with_message(
            ProxyErrorCode::NotFound,
            format!("saeapiservers \"{name}\" not found"),
        )
    }

    /// Route not found.
    #[must_use]
    pub fn route_not_found(path: &str) -> Self {
        Self::with_message(
            ProxyErrorCode::NotFound,
            format!("the server could not find the requested resource: {path}"),
        )
    }

    /// Resource already exists.
    #[must_use]
    pub fn already_exists(name: &str) -> Self {
        Self::with_message(
            ProxyErrorCode::AlreadyExists,
            format!("saeapiservers \"{name}\" already exists"),
        )
    }

    /// Optimistic concurrency conflict.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::with_message(ProxyErrorCode::Conflict, message)
    }

    /// Method not supported on the route.
    #[must_use]
    pub fn method_not_allowed(method: &http::Method) -> Self {
        Self::with_message(
            ProxyErrorCode::MethodNotAllowed,
            format!("method {method} is not supported"),
        )
    }

    /// Vendor client construction failed.
    #[must_use]
    pub fn client_init(message: impl Into<String>) -> Self {
        Self::with_message(ProxyErrorCode::ClientInit, message)
    }

    /// Vendor call failed.
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::with_message(ProxyErrorCode::Transport, message)
    }

    /// Vendor response envelope is malformed.
    #[must_use]
    pub fn decode(message: impl Into<String>) -> Self {
        Self::with_message(ProxyErrorCode::Decode, message)
    }

    /// Vendor response body is not valid base64.
    #[must_use]
    pub fn body_decode(message: impl Into<String>) -> Self {
        Self::with_message(ProxyErrorCode::BodyDecode, message)
    }

    /// Request cancelled or deadline exceeded.
    #[must_use]
    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::with_message(ProxyErrorCode::Cancelled, message)
    }

    /// Internal error.
    #[must_use]
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::with_message(ProxyErrorCode::Internal, message)
    }
}

/// Convenience result type for proxy operations.
pub type ProxyResult<T> = Result<T, ProxyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_map_codes_to_status() {
        assert_eq!(
            ProxyError::validation("x").status_code,
            http::StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ProxyError::target_not_found("foo").status_code,
            http::StatusCode::NOT_FOUND
        );
        assert_eq!(
            ProxyError::transport("x").status_code,
            http::StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ProxyError::cancelled("x").status_code,
            http::StatusCode::GATEWAY_TIMEOUT
        );
    }

    #[test]
    fn test_should_format_error_with_code() {
        let err = ProxyError::target_not_found("foo");
        assert_eq!(err.to_string(), "TargetNotFoundError: no such cluster foo");
        assert_eq!(err.reason(), "NotFound");
    }

    #[test]
    fn test_should_expose_source() {
        let io = std::io::Error::other("boom");
        let err = ProxyError::transport("call failed").with_source(io);
        let source = std::error::Error::source(&err).unwrap();
        assert_eq!(source.to_string(), "boom");
    }
}
