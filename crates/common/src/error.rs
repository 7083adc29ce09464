//! Error types shared across Splice crates.

use std::path::PathBuf;

/// Top-level error type for Splice operations.
#[derive(Debug, thiserror::Error)]
pub enum SpliceError {
    #[error("Invalid clip: {message}")]
    InvalidClip { message: String },

    #[error("Invalid transition: {message}")]
    InvalidTransition { message: String },

    #[error("Fetch error: {message}")]
    Fetch { message: String },

    #[error("Transcode error: {message}")]
    Transcode { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using SpliceError.
pub type SpliceResult<T> = Result<T, SpliceError>;

impl SpliceError {
    pub fn invalid_clip(msg: impl Into<String>) -> Self {
        Self::InvalidClip {
            message: msg.into(),
        }
    }

    pub fn invalid_transition(msg: impl Into<String>) -> Self {
        Self::InvalidTransition {
            message: msg.into(),
        }
    }

    pub fn fetch(msg: impl Into<String>) -> Self {
        Self::Fetch {
            message: msg.into(),
        }
    }

    pub fn transcode(msg: impl Into<String>) -> Self {
        Self::Transcode {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Whether this error stems from invalid caller input rather than
    /// an environment or collaborator failure.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidClip { .. } | Self::InvalidTransition { .. }
        )
    }
}

/// Truncate collaborator diagnostics to at most `limit` characters,
/// respecting UTF-8 boundaries.
pub fn truncate_diagnostic(text: &str, limit: usize) -> String {
    let trimmed = text.trim();
    match trimmed.char_indices().nth(limit) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_classification() {
        assert!(SpliceError::invalid_clip("x").is_validation());
        assert!(SpliceError::invalid_transition("x").is_validation());
        assert!(!SpliceError::transcode("x").is_validation());
    }

    #[test]
    fn test_truncate_diagnostic() {
        assert_eq!(truncate_diagnostic("  short  ", 10), "short");
        assert_eq!(truncate_diagnostic("abcdefghij", 4), "abcd...");
        // Multi-byte characters are never split.
        assert_eq!(truncate_diagnostic("ééééé", 2), "éé...");
    }

    #[test]
    fn test_display_messages() {
        let err = SpliceError::invalid_transition("clip 0 -> 2 is not adjacent");
        assert_eq!(
            err.to_string(),
            "Invalid transition: clip 0 -> 2 is not adjacent"
        );
    }
}
