//! Error conversion helpers for common I/O operations
//!
//! Provides extension traits for cleaner error handling with path context.

use std::io;
use std::path::Path;

use crate::application::{ApplicationError, ApplicationResult};

/// Extension trait for converting `io::Result` to `ApplicationResult` with context.
pub trait IoResultExt<T> {
    /// Add path context to an I/O error.
    ///
    /// # Example
    /// ```ignore
    /// fs.write_bytes(&target, &artifact.bytes)
    ///     .with_path_context("write export", &target)?;
    /// ```
    fn with_path_context(self, action: &str, path: &Path) -> ApplicationResult<T>;
}

impl<T> IoResultExt<T> for io::Result<T> {
    fn with_path_context(self, action: &str, path: &Path) -> ApplicationResult<T> {
        self.map_err(|e| ApplicationError::OperationFailed {
            context: format!("{}: {}", action, path.display()),
            source: Box::new(e),
        })
    }
}

/// Wrap any library error (encoders, parsers) with a short context label.
pub fn operation_failed<E>(context: impl Into<String>) -> impl FnOnce(E) -> ApplicationError
where
    E: std::error::Error + Send + Sync + 'static,
{
    let context = context.into();
    move |e| ApplicationError::OperationFailed {
        context,
        source: Box::new(e),
    }
}
