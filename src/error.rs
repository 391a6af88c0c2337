//! Crate-wide error type.
//!
//! Every variant maps to a process exit code so the `oc` binary can report
//! failures the same way regardless of which module raised them:
//!
//! - `2`: invocation / input problems (bad source name, unreadable files)
//! - `3`: no usable data after loading
//! - `4`: fit failures (optimizer did not converge, malformed arrays)

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Reference data source name not recognized.
    #[error("Bad input source '{0}' (expected 'bricaud' or 'clementson2019').")]
    UnsupportedSource(String),

    #[error("Fit failed: {0}")]
    FitFailure(String),

    #[error("Missing column '{column}' in {context}.")]
    MissingColumn { column: String, context: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("No usable data: {0}")]
    NoData(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AppError {
    pub fn fit(message: impl Into<String>) -> Self {
        Self::FitFailure(message.into())
    }

    pub fn input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            AppError::NoData(_) => 3,
            AppError::FitFailure(_) => 4,
            AppError::UnsupportedSource(_)
            | AppError::MissingColumn { .. }
            | AppError::InvalidInput(_)
            | AppError::Config(_)
            | AppError::Io { .. }
            | AppError::Csv(_)
            | AppError::Json(_) => 2,
        }
    }
}
