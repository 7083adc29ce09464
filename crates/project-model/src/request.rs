//! The export request: everything one render needs, as sent by the editor.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::clip::{Clip, Transition};
use crate::overlay::{PreviewFrame, TextOverlay};

/// A complete export request (`request.json`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRequest {
    /// Clips in any order; they are sorted by `startTime` before rendering.
    pub clips: Vec<Clip>,

    /// Sparse transitions keyed by index into the sorted clip sequence.
    #[serde(default)]
    pub transitions: Vec<Transition>,

    #[serde(default)]
    pub text_overlays: Option<Vec<TextOverlay>>,

    /// Editor surface size the overlays were authored against.
    #[serde(default)]
    pub preview_dimensions: Option<PreviewFrame>,

    pub user_id: String,

    #[serde(default)]
    pub company_id: Option<String>,

    #[serde(default)]
    pub project_name: Option<String>,
}

impl ExportRequest {
    /// A request with no transitions or overlays.
    pub fn new(user_id: impl Into<String>, clips: Vec<Clip>) -> Self {
        Self {
            clips,
            transitions: Vec::new(),
            text_overlays: None,
            preview_dimensions: None,
            user_id: user_id.into(),
            company_id: None,
            project_name: None,
        }
    }

    /// Load a request from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RequestError> {
        let path = path.as_ref().to_path_buf();
        let json = std::fs::read_to_string(&path).map_err(|e| RequestError::IoError {
            path: path.clone(),
            source: e,
        })?;
        Self::from_json(&json).map_err(|e| match e {
            RequestError::ParseError { source, .. } => RequestError::ParseError { path, source },
            other => other,
        })
    }

    /// Parse a request from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, RequestError> {
        let request: Self = serde_json::from_str(json).map_err(|e| RequestError::ParseError {
            path: PathBuf::from("<inline>"),
            source: e,
        })?;
        if request.clips.is_empty() {
            return Err(RequestError::ValidationError {
                message: "request contains no clips".to_string(),
            });
        }
        Ok(request)
    }

    /// Overlays, or an empty slice when none were sent.
    pub fn overlays(&self) -> &[TextOverlay] {
        self.text_overlays.as_deref().unwrap_or(&[])
    }

    /// Preview frame, defaulting to the editor's standard container.
    pub fn preview(&self) -> PreviewFrame {
        self.preview_dimensions
            .filter(|p| p.width > 0)
            .unwrap_or_default()
    }

    /// Project name restricted to alphanumerics, space, `-` and `_`.
    pub fn safe_project_name(&self) -> String {
        let raw = self.project_name.as_deref().unwrap_or("Exported Video");
        let safe: String = raw
            .chars()
            .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
            .collect();
        let safe = safe.trim().to_string();
        if safe.is_empty() {
            "Exported Video".to_string()
        } else {
            safe
        }
    }
}

/// Errors that can occur when loading export requests.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Parse error in {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid request: {message}")]
    ValidationError { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clip::TransitionStyle;

    const SAMPLE: &str = r#"{
        "clips": [
            { "id": "b", "sourceUrl": "b.mp4", "sourceDuration": 8, "startTime": 10, "trimStart": 0, "trimEnd": 0 },
            { "id": "a", "sourceUrl": "a.mp4", "sourceDuration": 10, "startTime": 0, "trimStart": 0, "trimEnd": 0 }
        ],
        "transitions": [ { "fromClipIndex": 0, "toClipIndex": 1, "type": "fade", "duration": 1 } ],
        "textOverlays": [ { "id": "t", "startTime": 9.5, "duration": 2, "text": "Hi" } ],
        "previewDimensions": { "width": 360, "height": 640 },
        "userId": "user-1",
        "projectName": "Summer: Reel #1!"
    }"#;

    #[test]
    fn test_request_parses() {
        let request = ExportRequest::from_json(SAMPLE).unwrap();
        assert_eq!(request.clips.len(), 2);
        assert_eq!(request.transitions[0].style, TransitionStyle::Fade);
        assert_eq!(request.overlays().len(), 1);
        assert_eq!(request.preview(), PreviewFrame::new(360, 640));
        assert!(request.company_id.is_none());
    }

    #[test]
    fn test_minimal_request_defaults() {
        let json = r#"{ "clips": [ { "id": "a", "sourceUrl": "a.mp4", "sourceDuration": 3, "startTime": 0 } ], "userId": "u" }"#;
        let request = ExportRequest::from_json(json).unwrap();
        assert!(request.transitions.is_empty());
        assert!(request.overlays().is_empty());
        assert_eq!(request.preview().width, PreviewFrame::DEFAULT_WIDTH);
        assert_eq!(request.safe_project_name(), "Exported Video");
    }

    #[test]
    fn test_empty_clip_list_rejected() {
        let json = r#"{ "clips": [], "userId": "u" }"#;
        assert!(matches!(
            ExportRequest::from_json(json),
            Err(RequestError::ValidationError { .. })
        ));
    }

    #[test]
    fn test_safe_project_name() {
        let request = ExportRequest::from_json(SAMPLE).unwrap();
        assert_eq!(request.safe_project_name(), "Summer Reel 1");
    }

    #[test]
    fn test_load_reports_path_on_parse_error() {
        let dir = std::env::temp_dir().join("splice_test_bad_request");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("request.json");
        std::fs::write(&path, "{ not json").unwrap();

        match ExportRequest::load(&path) {
            Err(RequestError::ParseError { path: reported, .. }) => assert_eq!(reported, path),
            other => panic!("expected parse error, got {other:?}"),
        }

        std::fs::remove_dir_all(&dir).ok();
    }
}
