//! Print the render plan for a request without executing it.

use std::path::PathBuf;

use splice_common::config::AppConfig;
use splice_render_engine::export::{ExportJob, Exporter};

pub fn run(
    config: AppConfig,
    request_path: PathBuf,
    output: Option<PathBuf>,
    json: bool,
) -> anyhow::Result<()> {
    let request = super::load_request(&request_path)?;
    let output_path = super::output_path(&request, output);
    let job = ExportJob::new(request, output_path, &config);

    let plan = Exporter::new(config).plan(&job)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }

    println!("Render plan for: {}", request_path.display());
    println!(
        "  Output: {} ({}x{}, {:.3}s)",
        plan.output_path.display(),
        plan.output_frame.width,
        plan.output_frame.height,
        plan.output_duration_secs
    );
    println!("  Work dir: {}", plan.work_dir.display());
    println!();
    for (i, step) in plan.steps.iter().enumerate() {
        println!("  {:>2}. [{:?}] {}", i + 1, step.stage(), step.describe());
    }
    println!(
        "\n{} step(s), {} transcoder invocation(s).",
        plan.steps.len(),
        plan.transcoder_steps()
    );

    Ok(())
}
