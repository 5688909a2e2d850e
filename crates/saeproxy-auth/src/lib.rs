//! Alibaba Cloud ROA request signing for the SAE API server proxy.
//!
//! SAE exposes its OpenAPI in the ROA style: the request is a plain HTTP call
//! against a path pattern, authenticated by an `Authorization` header of the
//! form
//!
//! ```text
//! acs <AccessKeyId>:<Signature>
//! ```
//!
//! where `Signature = Base64(HMAC-SHA1(AccessKeySecret, StringToSign))`.
//!
//! # Modules
//!
//! - [`canonical`] - Canonicalized headers and resource construction
//! - [`credentials`] - Access key type with redacted debug output
//! - [`error`] - Signing error types
//! - [`roa`] - String-to-sign construction and request signing

pub mod canonical;
pub mod credentials;
pub mod error;
pub mod roa;

pub use credentials::AccessKey;
pub use error::SignError;
pub use roa::{SigningParams, content_md5, sign_request};
