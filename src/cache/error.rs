use std::fmt::{Display, Formatter};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CacheErrorCode {
    OpenFailed,
    NetworkFailure,
    StorageFailed,
    EnumerationFailed,
    InvalidUrl,
}

impl CacheErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheErrorCode::OpenFailed => "cache/open-failed",
            CacheErrorCode::NetworkFailure => "cache/network-failure",
            CacheErrorCode::StorageFailed => "cache/storage-failed",
            CacheErrorCode::EnumerationFailed => "cache/enumeration-failed",
            CacheErrorCode::InvalidUrl => "cache/invalid-url",
        }
    }
}

#[derive(Clone, Debug)]
pub struct CacheError {
    pub code: CacheErrorCode,
    message: String,
}

impl CacheError {
    pub fn new(code: CacheErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn code_str(&self) -> &'static str {
        self.code.as_str()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for CacheError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code_str())
    }
}

impl std::error::Error for CacheError {}

pub type CacheResult<T> = Result<T, CacheError>;

pub fn open_failed(message: impl Into<String>) -> CacheError {
    CacheError::new(CacheErrorCode::OpenFailed, message)
}

pub fn network_failure(message: impl Into<String>) -> CacheError {
    CacheError::new(CacheErrorCode::NetworkFailure, message)
}

pub fn storage_failed(message: impl Into<String>) -> CacheError {
    CacheError::new(CacheErrorCode::StorageFailed, message)
}

pub fn enumeration_failed(message: impl Into<String>) -> CacheError {
    CacheError::new(CacheErrorCode::EnumerationFailed, message)
}

pub fn invalid_url(message: impl Into<String>) -> CacheError {
    CacheError::new(CacheErrorCode::InvalidUrl, message)
}
