//! Error types for the scheduler crate.

use std::fmt;

/// Errors from a key-value store backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KvError {
    pub message: String,
}

impl KvError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for KvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "key-value store error: {}", self.message)
    }
}

impl std::error::Error for KvError {}

/// Errors from schedule management.
#[derive(Debug, Clone, PartialEq)]
pub enum SchedulerError {
    /// A cron expression did not parse.
    InvalidCron {
        expression: String,
        message: String,
    },
    /// No schedule exists for the given workflow trigger.
    ScheduleNotFound { key: String },
    /// The store backend failed.
    Store(KvError),
}

impl fmt::Display for SchedulerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCron {
                expression,
                message,
            } => write!(f, "invalid cron expression '{expression}': {message}"),
            Self::ScheduleNotFound { key } => write!(f, "schedule '{key}' not found"),
            Self::Store(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for SchedulerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Store(e) => Some(e),
            _ => None,
        }
    }
}

impl From<KvError> for SchedulerError {
    fn from(e: KvError) -> Self {
        Self::Store(e)
    }
}
