//! Application-level errors (wraps domain errors)

use thiserror::Error;

use crate::domain::DomainError;

/// Application errors wrap domain errors and add application-level context.
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("{0}")]
    Domain(#[from] DomainError),

    #[error("an export is already in progress")]
    ExportBusy,

    #[error("nothing to capture: chart area is {width}x{height}")]
    EmptyCapture { width: u32, height: u32 },

    #[error("capture of {width}x{height} px exceeds the {max} px edge limit")]
    CaptureTooLarge { width: u32, height: u32, max: u32 },

    #[error("script line {line}: {message}")]
    Script { line: usize, message: String },

    #[error("config error: {message}")]
    Config { message: String },

    #[error("operation failed: {context}")]
    OperationFailed {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl ApplicationError {
    /// True for rejected edits the user can recover from by trying something else.
    pub fn is_rejection(&self) -> bool {
        matches!(self, ApplicationError::Domain(_))
    }
}

/// Result type for application layer operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;
