//! Error types for `BoxFind`

use arrayvec::ArrayString;
use thiserror::Error;

/// Maximum length of error messages
pub const MAX_ERROR_LENGTH: usize = 256;

/// Custom result type for `BoxFind` operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for `BoxFind`
///
/// # Design
/// - Configuration errors (`Open`, `Empty`, `Unresolved`) are reported before any scan starts
/// - Row-level defects never surface here; the scanner skips them
/// - Free-form messages use a fixed `MAX_ERROR_LENGTH` buffer
#[derive(Debug, Error)]
pub enum Error {
    /// IO operation failed
    #[error("Error: {0}")]
    Io(#[from] std::io::Error),

    /// Source file could not be opened
    #[error("Error: could not open source: {0}")]
    Open(#[source] std::io::Error),

    /// Source has no header line
    #[error("Error: source is empty")]
    Empty,

    /// Header has neither a combined nor a separate coordinate layout
    #[error(
        "Error: no coordinate columns found (expected RelativeLocation or separate X, Y, Z columns)"
    )]
    Unresolved,

    /// Reading the source failed part way through a scan
    #[error("Error: failed to read source: {0}")]
    Read(#[source] std::io::Error),

    /// Query text could not be parsed into a center point
    #[error("Error: invalid query: {0}")]
    Query(Box<ArrayString<MAX_ERROR_LENGTH>>),

    /// Lag was not a non-negative integer
    #[error("Error: lag must be a non-negative integer")]
    InvalidLag,

    /// A search was requested with no file open
    #[error("Error: open a file before searching")]
    NoFileOpen,

    /// History store could not be loaded or saved
    #[error("Error: history store: {0}")]
    History(Box<ArrayString<MAX_ERROR_LENGTH>>),

    /// Search worker panicked before finishing
    #[error("Error: search worker panicked")]
    WorkerPanicked,
}

/// Copy `msg` into a bounded buffer, truncating on a char boundary
fn bounded(msg: &str) -> Box<ArrayString<MAX_ERROR_LENGTH>> {
    let mut buf = ArrayString::new();
    for c in msg.chars() {
        if buf.try_push(c).is_err() {
            break;
        }
    }
    Box::new(buf)
}

impl Error {
    /// Create a new query error
    #[must_use]
    pub fn query(msg: &str) -> Self {
        Self::Query(bounded(msg))
    }

    /// Create a new history store error
    #[must_use]
    pub fn history(msg: &str) -> Self {
        Self::History(bounded(msg))
    }

    /// Whether this is a configuration error, fatal to the attempt but not the process
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(self, Self::Open(_) | Self::Empty | Self::Unresolved)
    }

    /// Get a user-friendly error message with action items
    #[must_use]
    pub fn user_message(&self) -> ArrayString<MAX_ERROR_LENGTH> {
        let tip = match self {
            Self::Io(_) | Self::Open(_) => "Check the path and file permissions and try again",
            Self::Empty => "The first line must be a comma-separated header row",
            Self::Unresolved => {
                "Add a RelativeLocation column holding 'x y z' or separate X, Y, Z columns"
            },
            Self::Read(_) => "The file may have changed or been removed during the search",
            Self::Query(_) => "Enter exactly three numbers, for example: 10 -4.5 200",
            Self::InvalidLag => "Use a whole number such as 0, 50 or 100",
            Self::NoFileOpen => "Open a CSV file first",
            Self::History(_) => "Delete or fix the history file, or pass --history-file",
            Self::WorkerPanicked => "Re-run the search; report the input file if it persists",
        };

        let mut msg = ArrayString::new();
        for c in self.to_string().chars().chain("\nTip: ".chars()).chain(tip.chars()) {
            if msg.try_push(c).is_err() {
                break;
            }
        }
        msg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_class() {
        assert!(Error::Empty.is_configuration());
        assert!(Error::Unresolved.is_configuration());
        assert!(Error::Open(std::io::Error::other("denied")).is_configuration());
        assert!(!Error::InvalidLag.is_configuration());
        assert!(!Error::Read(std::io::Error::other("gone")).is_configuration());
    }

    #[test]
    fn test_long_message_truncated() {
        let long = "é".repeat(MAX_ERROR_LENGTH);
        let Error::Query(buf) = Error::query(&long) else {
            panic!("expected query error");
        };
        assert!(buf.len() <= MAX_ERROR_LENGTH);
        assert!(buf.chars().all(|c| c == 'é'));
    }

    #[test]
    fn test_user_message_has_tip() {
        let msg = Error::Empty.user_message();
        assert!(msg.starts_with("Error: source is empty"));
        assert!(msg.contains("\nTip: "));
    }
}
