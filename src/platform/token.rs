use std::error::Error;
use std::fmt;

use async_trait::async_trait;

/// Error returned by token providers when the token cannot be produced.
#[derive(Debug, Clone)]
pub struct TokenError {
    message: String,
}

impl TokenError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn from_error(err: impl Error) -> Self {
        Self::new(err.to_string())
    }
}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for TokenError {}

/// Supplies the anti-forgery token attached to mutating backend calls.
///
/// The page owns the token (typically rendered into a form field or cookie); the crate
/// only asks for it right before each request.
#[async_trait]
pub trait CsrfTokenProvider: Send + Sync {
    async fn csrf_token(&self) -> Result<Option<String>, TokenError>;
}

/// Provider returning a fixed token, or none.
#[derive(Clone, Debug, Default)]
pub struct StaticCsrfToken(Option<String>);

impl StaticCsrfToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(Some(token.into()))
    }

    pub fn none() -> Self {
        Self(None)
    }
}

#[async_trait]
impl CsrfTokenProvider for StaticCsrfToken {
    async fn csrf_token(&self) -> Result<Option<String>, TokenError> {
        Ok(self.0.clone())
    }
}
