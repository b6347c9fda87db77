//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Core(#[from] v4_core::CoreError),

    #[error("Registry error: {0}")]
    Registry(#[from] v4_registry::RegistryError),

    #[error("Transport error: {0}")]
    Transport(#[from] v4_executor::TransportError),

    #[error("Executor error: {0}")]
    Executor(#[from] v4_executor::ExecutorError),

    #[error("Key error: {0}")]
    Key(#[from] v4_executor::KeyError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;
