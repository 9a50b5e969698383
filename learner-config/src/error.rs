use thiserror::Error;

/// A configuration that is not self-consistent.
///
/// These are raised by `validate_config()` and are never recovered from.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ConfigError {
    message: String,
}

pub type ConfigResult<T = ()> = Result<T, ConfigError>;

impl ConfigError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Prefix the message with the name of the enclosing field.
    pub fn within(self, field: &str) -> Self {
        Self {
            message: format!("{}: {}", field, self.message),
        }
    }
}

/// Return a [ConfigError] from the enclosing function unless the condition holds.
#[macro_export]
macro_rules! ensure_config {
    ($cond:expr, $($arg:tt)+) => {
        if !$cond {
            return Err($crate::ConfigError::new(format!($($arg)+)));
        }
    };
}
