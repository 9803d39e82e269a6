use std::path::PathBuf;
use thiserror::Error;

/// Exit status for configuration problems found before a run starts.
pub const EXIT_CONFIG: u8 = 100;
/// Exit status when the backup folder or run log cannot be written.
pub const EXIT_FILESYSTEM: u8 = 101;
/// Exit status for any other fatal error.
pub const EXIT_FATAL: u8 = 102;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Filesystem error at {}: {source}", .path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serde JSON error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    #[error("Mail delivery failed: {0}")]
    Mail(String),

    #[error("Command execution failed: {0}")]
    Command(String),
}

impl AppError {
    pub fn filesystem(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AppError::Filesystem {
            path: path.into(),
            source,
        }
    }

    /// Process exit status for a run aborted by this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            AppError::Config(_) | AppError::SerdeJson(_) => EXIT_CONFIG,
            AppError::Filesystem { .. } => EXIT_FILESYSTEM,
            _ => EXIT_FATAL,
        }
    }
}

impl From<lettre::address::AddressError> for AppError {
    fn from(err: lettre::address::AddressError) -> Self {
        AppError::Mail(format!("invalid address: {}", err))
    }
}

impl From<lettre::error::Error> for AppError {
    fn from(err: lettre::error::Error) -> Self {
        AppError::Mail(format!("could not build message: {}", err))
    }
}

impl From<lettre::transport::smtp::Error> for AppError {
    fn from(err: lettre::transport::smtp::Error) -> Self {
        AppError::Mail(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
