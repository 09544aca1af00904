use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    #[error("Invalid duration '{input}': {message}")]
    InvalidDuration { input: String, message: String },
}

pub type Result<T, E = CoreError> = std::result::Result<T, E>;
