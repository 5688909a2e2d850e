//! Error types for request signing.

/// Errors that can occur while signing a request.
#[derive(Debug, thiserror::Error)]
pub enum SignError {
    /// The access key id is empty.
    #[error("Missing access key id")]
    MissingAccessKeyId,

    /// The access key secret is empty.
    #[error("Missing access key secret")]
    MissingAccessKeySecret,

    /// A computed header value is not a valid HTTP header value.
    #[error("Invalid header value for {0}")]
    InvalidHeaderValue(&'static str),
}
