//! Report font catalog availability.

use splice_common::config::AppConfig;
use splice_timeline_core::fonts::FontCatalog;

pub fn run(config: &AppConfig, json: bool) -> anyhow::Result<()> {
    let report = FontCatalog::standard(&config.fonts).availability();

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Font directory: {}", config.fonts.font_dir.display());
    println!("{}", "=".repeat(50));
    for font in &report {
        let status = if font.valid {
            "OK"
        } else if font.exists {
            "BAD"
        } else {
            "MISSING"
        };
        println!(
            "[{status:<7}] {:<28} {:>9} bytes  {}",
            font.name,
            font.size_bytes,
            font.path.display()
        );
    }

    let usable = report.iter().filter(|f| f.valid).count();
    println!("\n{usable}/{} font files usable.", report.len());
    Ok(())
}
