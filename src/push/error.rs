use std::fmt::{Display, Formatter};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PushErrorCode {
    Unsupported,
    PermissionDenied,
    NetworkFailure,
    BackendRejection,
    PreconditionFailed,
    InvalidArgument,
    Internal,
}

impl PushErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PushErrorCode::Unsupported => "push/unsupported",
            PushErrorCode::PermissionDenied => "push/permission-denied",
            PushErrorCode::NetworkFailure => "push/network-failure",
            PushErrorCode::BackendRejection => "push/backend-rejection",
            PushErrorCode::PreconditionFailed => "push/precondition-failed",
            PushErrorCode::InvalidArgument => "push/invalid-argument",
            PushErrorCode::Internal => "push/internal",
        }
    }

    /// Terminal failures cannot be resolved by retrying.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PushErrorCode::Unsupported | PushErrorCode::PermissionDenied
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PushError {
    pub code: PushErrorCode,
    message: String,
}

impl PushError {
    pub fn new(code: PushErrorCode, message: impl Into<String>) -> Self {
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

impl Display for PushError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code_str())
    }
}

impl std::error::Error for PushError {}

pub type PushResult<T> = Result<T, PushError>;

pub fn unsupported(message: impl Into<String>) -> PushError {
    PushError::new(PushErrorCode::Unsupported, message)
}

pub fn permission_denied(message: impl Into<String>) -> PushError {
    PushError::new(PushErrorCode::PermissionDenied, message)
}

pub fn network_failure(message: impl Into<String>) -> PushError {
    PushError::new(PushErrorCode::NetworkFailure, message)
}

pub fn backend_rejection(message: impl Into<String>) -> PushError {
    PushError::new(PushErrorCode::BackendRejection, message)
}

pub fn precondition_failed(message: impl Into<String>) -> PushError {
    PushError::new(PushErrorCode::PreconditionFailed, message)
}

pub fn invalid_argument(message: impl Into<String>) -> PushError {
    PushError::new(PushErrorCode::InvalidArgument, message)
}

pub fn internal_error(message: impl Into<String>) -> PushError {
    PushError::new(PushErrorCode::Internal, message)
}
