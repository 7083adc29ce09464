pub mod check;
pub mod export;
pub mod fonts;
pub mod plan;
pub mod validate;

use std::path::{Path, PathBuf};

use splice_project_model::request::ExportRequest;

/// Load a request file with a CLI-friendly error.
pub fn load_request(path: &Path) -> anyhow::Result<ExportRequest> {
    ExportRequest::load(path).map_err(|e| anyhow::anyhow!("Failed to load request: {e}"))
}

/// `<safe project name>.mp4` in the current directory unless given.
pub fn output_path(request: &ExportRequest, output: Option<PathBuf>) -> PathBuf {
    output.unwrap_or_else(|| PathBuf::from(format!("{}.mp4", request.safe_project_name())))
}
