use std::fmt::{Display, Formatter};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WorkerErrorCode {
    ClientNotFound,
    InvalidUrl,
    NotificationFailed,
}

impl WorkerErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerErrorCode::ClientNotFound => "worker/client-not-found",
            WorkerErrorCode::InvalidUrl => "worker/invalid-url",
            WorkerErrorCode::NotificationFailed => "worker/notification-failed",
        }
    }
}

#[derive(Clone, Debug)]
pub struct WorkerError {
    pub code: WorkerErrorCode,
    message: String,
}

impl WorkerError {
    pub fn new(code: WorkerErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn code_str(&self) -> &'static str {
        self.code.as_str()
    }
}

impl Display for WorkerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code_str())
    }
}

impl std::error::Error for WorkerError {}

pub type WorkerResult<T> = Result<T, WorkerError>;

pub fn client_not_found(id: &str) -> WorkerError {
    WorkerError::new(
        WorkerErrorCode::ClientNotFound,
        format!("No window client with id {id}"),
    )
}

pub fn invalid_url(message: impl Into<String>) -> WorkerError {
    WorkerError::new(WorkerErrorCode::InvalidUrl, message)
}

pub fn notification_failed(message: impl Into<String>) -> WorkerError {
    WorkerError::new(WorkerErrorCode::NotificationFailed, message)
}
