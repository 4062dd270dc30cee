//! Error types for taskmux.
//!
//! Epistemic taxonomy:
//! - B_i falsified: Expected failures (missing split file, malformed line)
//! - I^B materialized: Collaborator failures (vocabulary, tokenizer)
//! - K_i violated: Caller passed arguments that break an invariant

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for taskmux.
#[derive(Debug, Error)]
pub enum PipelineError {
    // ═══════════════════════════════════════════════════════════════════
    // B_i FALSIFIED — Belief proven wrong (expected failures)
    // ═══════════════════════════════════════════════════════════════════

    #[error("Configuration error: {0}")]
    Config(#[from] super::ConfigError),

    #[error("Parse error in {} line {line} (task {task_index}): {reason}", .path.display())]
    Parse {
        task_index: usize,
        path: PathBuf,
        line: u64,
        reason: String,
    },

    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // ═══════════════════════════════════════════════════════════════════
    // I^B MATERIALIZED — Collaborator became known-bad
    // ═══════════════════════════════════════════════════════════════════

    #[error("Tokenizer error: {0}")]
    Tokenizer(String),

    // ═══════════════════════════════════════════════════════════════════
    // K_i VIOLATED — Caller broke an invariant
    // ═══════════════════════════════════════════════════════════════════

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl PipelineError {
    /// Create an IO error with context.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// True for errors tied to a single data line rather than the whole run.
    pub fn is_line_error(&self) -> bool {
        matches!(self, Self::Parse { .. })
    }
}

/// Result type alias for taskmux.
pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_display() {
        let err = PipelineError::Parse {
            task_index: 2,
            path: PathBuf::from("data/train.tsv"),
            line: 7,
            reason: "expected 5 fields, found 3".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("data/train.tsv line 7"));
        assert!(msg.contains("task 2"));
        assert!(err.is_line_error());
    }

    #[test]
    fn test_io_error_keeps_source() {
        let err = PipelineError::io(
            "opening split file",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert_eq!(err.to_string(), "IO error: opening split file");
        assert!(std::error::Error::source(&err).is_some());
        assert!(!err.is_line_error());
    }
}
