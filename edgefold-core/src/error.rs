//! Error types for edgefold

use thiserror::Error;

/// Main error type for edgefold operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A geometry record could not be decoded. `line` is 1-based and `content`
    /// holds the offending source line verbatim.
    #[error("Format error on line {line}: {message} (`{content}`)")]
    Format {
        line: usize,
        content: String,
        message: String,
    },

    #[error("Heap is empty")]
    EmptyHeap,

    #[error("Stale heap handle: slot {slot}, generation {generation}")]
    StaleHandle { slot: usize, generation: u32 },

    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

impl Error {
    /// Build a [`Error::Format`] for the given 1-based line.
    pub fn format(line: usize, content: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Format {
            line,
            content: content.into(),
            message: message.into(),
        }
    }

    /// True for the expected end-of-queue condition rather than a failure.
    pub fn is_empty_heap(&self) -> bool {
        matches!(self, Error::EmptyHeap)
    }
}

/// Result type alias for edgefold operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_error_carries_line() {
        let err = Error::format(7, "f 1 2", "face has 2 corners");
        let text = err.to_string();
        assert!(text.contains("line 7"));
        assert!(text.contains("f 1 2"));
        match err {
            Error::Format { line, content, .. } => {
                assert_eq!(line, 7);
                assert_eq!(content, "f 1 2");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_empty_heap_predicate() {
        assert!(Error::EmptyHeap.is_empty_heap());
        assert!(!Error::InvalidData("x".into()).is_empty_heap());
    }
}
