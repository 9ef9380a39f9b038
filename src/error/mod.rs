mod exit_codes;
#[cfg(test)]
mod tests;

pub use exit_codes::get_exit_code;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LockerError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Lock for entity {key} is not found")]
    LockNotFound { key: String },

    #[error("Illegal lock state: {0}")]
    IllegalState(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Failed to render configuration: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Failed to render report: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl LockerError {
    pub(crate) fn lock_not_found(key: &dyn std::fmt::Debug) -> Self {
        LockerError::LockNotFound {
            key: format!("{key:?}"),
        }
    }

    /// Indicates a caller bug rather than an environmental failure.
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            LockerError::InvalidArgument(_)
                | LockerError::LockNotFound { .. }
                | LockerError::IllegalState(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, LockerError>;
