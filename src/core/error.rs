use std::{error::Error, fmt::Display};

#[derive(Clone, Debug)]
pub struct SQLError {
    pub kind: ErrorKind,
    pub message: String,
}

#[allow(clippy::enum_variant_names)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Input was incomplete or violated a closed-set rule. Raised before any
    /// SQL reaches the backend.
    ValidationError,
    /// A catalog query could not be answered.
    IntrospectionError,
    /// The engine received the statement and rejected it.
    ExecutionError,
    /// BEGIN, COMMIT or ROLLBACK failed.
    TransactionError,
    ConnectionError,
    TimeoutError,
    ConfigError,
}

impl Error for SQLError {}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::ValidationError => write!(f, "Validation Error"),
            ErrorKind::IntrospectionError => write!(f, "Introspection Error"),
            ErrorKind::ExecutionError => write!(f, "Execution Error"),
            ErrorKind::TransactionError => write!(f, "Transaction Error"),
            ErrorKind::ConnectionError => write!(f, "Connection Error"),
            ErrorKind::TimeoutError => write!(f, "Timeout Error"),
            ErrorKind::ConfigError => write!(f, "Config Error"),
        }
    }
}

impl Display for SQLError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl SQLError {
    pub fn new(kind: ErrorKind, message: impl AsRef<str>) -> Self {
        Self {
            kind,
            message: message.as_ref().to_string(),
        }
    }

    pub fn validation(message: impl AsRef<str>) -> Self {
        Self::new(ErrorKind::ValidationError, message)
    }

    /// Whether the engine itself rejected the statement, as opposed to the
    /// statement never reaching it.
    pub fn is_rejection(&self) -> bool {
        self.kind == ErrorKind::ExecutionError
    }
}
