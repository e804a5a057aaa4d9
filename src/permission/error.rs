use std::fmt::{Display, Formatter};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PermissionErrorCode {
    Unsupported,
    PromptFailed,
}

impl PermissionErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionErrorCode::Unsupported => "permission/unsupported",
            PermissionErrorCode::PromptFailed => "permission/prompt-failed",
        }
    }
}

#[derive(Clone, Debug)]
pub struct PermissionError {
    pub code: PermissionErrorCode,
    message: String,
}

impl PermissionError {
    pub fn new(code: PermissionErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn code_str(&self) -> &'static str {
        self.code.as_str()
    }
}

impl Display for PermissionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code_str())
    }
}

impl std::error::Error for PermissionError {}

pub type PermissionResult<T> = Result<T, PermissionError>;

pub fn unsupported(message: impl Into<String>) -> PermissionError {
    PermissionError::new(PermissionErrorCode::Unsupported, message)
}

pub fn prompt_failed(message: impl Into<String>) -> PermissionError {
    PermissionError::new(PermissionErrorCode::PromptFailed, message)
}
