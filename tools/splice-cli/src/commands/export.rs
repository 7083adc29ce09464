//! Render an export request to a video file.

use std::io::Write;
use std::path::PathBuf;

use splice_common::config::AppConfig;
use splice_render_engine::export::{ExportJob, ExportProgress, Exporter, ProgressCallback};

pub async fn run(
    config: AppConfig,
    request_path: PathBuf,
    output: Option<PathBuf>,
    json: bool,
) -> anyhow::Result<()> {
    let request = super::load_request(&request_path)?;
    let output_path = super::output_path(&request, output);

    if !json {
        println!("Exporting request: {}", request_path.display());
        println!("  Clips: {}", request.clips.len());
        println!("  Transitions: {}", request.transitions.len());
        println!("  Text overlays: {}", request.overlays().len());
        println!("  Output: {}", output_path.display());
    }

    let job = ExportJob::new(request, &output_path, &config);
    let progress_cb: Option<ProgressCallback> = if json {
        None
    } else {
        Some(Box::new(|p: ExportProgress| {
            print!(
                "\r  Progress: {:>5.1}% [{:?}] step {}/{}    ",
                p.progress * 100.0,
                p.stage,
                p.steps_done,
                p.total_steps,
            );
            let _ = std::io::stdout().flush();
        }))
    };

    let outcome = Exporter::new(config).export(job, progress_cb).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else if outcome.success {
        println!("\nExport complete: {}", output_path.display());
        if let Some(size) = outcome.file_size {
            println!("  Size: {size} bytes");
        }
        if let Some(duration) = outcome.output_duration_secs {
            println!("  Duration: {duration:.3}s");
        }
        println!("  Processing time: {}ms", outcome.processing_time_ms);
    }

    if outcome.success {
        Ok(())
    } else {
        Err(anyhow::anyhow!(
            "Export failed: {}",
            outcome.error.unwrap_or_else(|| "unknown error".to_string())
        ))
    }
}
