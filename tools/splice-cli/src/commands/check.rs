//! Check system capabilities.

use splice_common::config::AppConfig;
use splice_render_engine::export::Exporter;

pub fn run(config: AppConfig) -> anyhow::Result<()> {
    println!("Splice System Check");
    println!("{}", "=".repeat(50));

    let work_dir = config.work_dir.clone();
    let health = Exporter::new(config).health();

    let mark = |ok: bool| if ok { "[OK]  " } else { "[FAIL]" };
    println!("{} Transcoder: {}", mark(health.transcoder_available), health.transcoder);
    println!("{} Prober: ffprobe", mark(health.prober_available));

    let writable = std::fs::create_dir_all(&work_dir).is_ok();
    println!("{} Work directory: {}", mark(writable), work_dir.display());

    println!();
    if health.healthy && writable {
        println!("All required capabilities are available. Splice is ready.");
    } else {
        println!("Some required capabilities are missing. Install ffmpeg or fix the config.");
    }

    Ok(())
}
