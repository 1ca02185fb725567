//! I/O boundary traits for testability
//!
//! These traits abstract external I/O and user interaction, allowing
//! services to be tested with in-memory implementations.

use std::fmt;
use std::io::{self, BufRead};
use std::path::Path;

use crate::infrastructure::error::{InfraError, InfraResult};

/// Filesystem abstraction for testability.
pub trait FileSystem: Send + Sync {
    /// Read file contents to string.
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Read raw file contents.
    fn read_bytes(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Write bytes to a file, replacing it.
    fn write_bytes(&self, path: &Path, content: &[u8]) -> io::Result<()>;

    /// Check if path is a directory.
    fn is_dir(&self, path: &Path) -> bool;

    /// Create directory and all parent directories.
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;
}

/// A destructive operation awaiting a yes/no answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmRequest {
    DeleteSubtree {
        title: String,
        /// Number of descendants removed along with the position
        subordinates: usize,
    },
    LoadTemplate {
        name: String,
    },
    Reset,
}

impl fmt::Display for ConfirmRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfirmRequest::DeleteSubtree {
                title,
                subordinates: 0,
            } => write!(f, "Delete '{}'?", title),
            ConfirmRequest::DeleteSubtree {
                title,
                subordinates,
            } => write!(
                f,
                "Delete '{}' and all {} subordinate position(s)?",
                title, subordinates
            ),
            ConfirmRequest::LoadTemplate { name } => write!(
                f,
                "Load the {} template? This clears the current chart.",
                name
            ),
            ConfirmRequest::Reset => write!(f, "Reset the chart to the default structure?"),
        }
    }
}

/// Confirmation capability for destructive edits.
pub trait Confirmer: Send + Sync {
    /// Ask the user; true means proceed.
    fn confirm(&self, request: &ConfirmRequest) -> bool;
}

// ============================================================
// REAL IMPLEMENTATIONS
// ============================================================

/// Real filesystem implementation.
#[derive(Debug, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn read_bytes(&self, path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(path)
    }

    fn write_bytes(&self, path: &Path, content: &[u8]) -> io::Result<()> {
        std::fs::write(path, content)
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        std::fs::create_dir_all(path)
    }
}

/// Interactive y/N prompt on the terminal; anything but yes declines.
#[derive(Debug, Default)]
pub struct TerminalConfirmer;

/// Read one answer line; only `y` or `yes` (any case) consents.
pub fn read_answer(input: &mut impl BufRead) -> InfraResult<bool> {
    let mut answer = String::new();
    input
        .read_line(&mut answer)
        .map_err(|e| InfraError::io("read confirmation", e))?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

impl Confirmer for TerminalConfirmer {
    fn confirm(&self, request: &ConfirmRequest) -> bool {
        crate::cli::output::prompt(&format!("{} [y/N]", request));
        match read_answer(&mut io::stdin().lock()) {
            Ok(answer) => answer,
            Err(e) => {
                tracing::warn!("{}, treating as no", e);
                false
            }
        }
    }
}

/// Fixed answer, used for `--yes` and in tests.
#[derive(Debug, Clone, Copy)]
pub struct AutoConfirmer {
    pub answer: bool,
}

impl AutoConfirmer {
    pub fn yes() -> Self {
        Self { answer: true }
    }

    pub fn no() -> Self {
        Self { answer: false }
    }
}

impl Confirmer for AutoConfirmer {
    fn confirm(&self, request: &ConfirmRequest) -> bool {
        tracing::debug!("auto-confirm ({}): {}", self.answer, request);
        self.answer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_leaf_delete_when_prompting_then_no_subordinate_count() {
        let req = ConfirmRequest::DeleteSubtree {
            title: "Safety Officer".into(),
            subordinates: 0,
        };
        assert_eq!(req.to_string(), "Delete 'Safety Officer'?");
    }

    #[test]
    fn given_subtree_delete_when_prompting_then_mentions_subordinates() {
        let req = ConfirmRequest::DeleteSubtree {
            title: "Operations Chief".into(),
            subordinates: 2,
        };
        assert!(req.to_string().contains("all 2 subordinate"));
        assert!(!AutoConfirmer::no().confirm(&req));
        assert!(AutoConfirmer::yes().confirm(&req));
    }

    #[test]
    fn given_typed_answers_when_reading_then_only_yes_consents() {
        use std::io::Cursor;
        assert!(read_answer(&mut Cursor::new("Y\n")).unwrap());
        assert!(read_answer(&mut Cursor::new(" yes \n")).unwrap());
        assert!(!read_answer(&mut Cursor::new("\n")).unwrap());
        assert!(!read_answer(&mut Cursor::new("nope\n")).unwrap());
        assert!(!read_answer(&mut Cursor::new("")).unwrap());
    }

    #[test]
    fn given_invalid_utf8_when_reading_then_io_error() {
        use std::io::Cursor;
        let err = read_answer(&mut Cursor::new(vec![0xff, 0xfe, b'\n'])).unwrap_err();
        assert!(matches!(err, InfraError::Io { .. }));
    }
}
