//! Access key credentials.

use std::fmt;

use crate::error::SignError;

/// An Alibaba Cloud access key pair.
///
/// The secret is never printed; `Debug` shows only the key id.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct AccessKey {
    id: String,
    secret: String,
}

impl AccessKey {
    /// Create an access key, rejecting empty components.
    pub fn new(id: impl Into<String>, secret: impl Into<String>) -> Result<Self, SignError> {
        let id = id.into();
        let secret = secret.into();
        if id.is_empty() {
            return Err(SignError::MissingAccessKeyId);
        }
        if secret.is_empty() {
            return Err(SignError::MissingAccessKeySecret);
        }
        Ok(Self { id, secret })
    }

    /// The access key id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The access key secret.
    #[must_use]
    pub fn secret(&self) -> &str {
        &self.secret
    }
}

impl fmt::Debug for AccessKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessKey")
            .field("id", &self.id)
            .field("secret", &"<redacted>")
            .finish()
    }
}
