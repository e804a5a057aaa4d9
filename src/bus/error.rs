use std::fmt::{Display, Formatter};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BusErrorCode {
    InvalidMessage,
}

impl BusErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            BusErrorCode::InvalidMessage => "bus/invalid-message",
        }
    }
}

#[derive(Clone, Debug)]
pub struct BusError {
    pub code: BusErrorCode,
    message: String,
}

impl BusError {
    pub fn new(code: BusErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn code_str(&self) -> &'static str {
        self.code.as_str()
    }
}

impl Display for BusError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code_str())
    }
}

impl std::error::Error for BusError {}

pub type BusResult<T> = Result<T, BusError>;

pub fn invalid_message(message: impl Into<String>) -> BusError {
    BusError::new(BusErrorCode::InvalidMessage, message)
}
