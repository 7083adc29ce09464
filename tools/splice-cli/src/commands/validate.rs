//! Validate an export request.

use std::path::PathBuf;

use splice_timeline_core::compile_timeline;
use splice_timeline_core::planner::Segment;

pub fn run(path: PathBuf) -> anyhow::Result<()> {
    println!("Validating request at: {}", path.display());

    let request = super::load_request(&path)?;
    println!("  User: {}", request.user_id);
    println!("  Project: {}", request.safe_project_name());

    let compiled = match compile_timeline(&request.clips, &request.transitions) {
        Ok(compiled) => compiled,
        Err(e) => {
            println!("\nValidation failed: {e}");
            return Err(e.into());
        }
    };

    println!("\n  Clips (playback order):");
    for (clip, spans) in compiled.timeline.clips.iter().zip(compiled.remapper.spans()) {
        println!(
            "    {:<12} editor [{:>8.3}, {:>8.3})  output [{:>8.3}, {:>8.3})  {:.3}s",
            clip.clip.id,
            spans.editor.start,
            spans.editor.end,
            spans.concat.start,
            spans.concat.end,
            clip.effective_duration
        );
    }

    println!("\n  Segments:");
    for segment in &compiled.segments {
        match segment {
            Segment::Crossfade { clips } => {
                println!("    crossfade clips {}..{}", clips.start, clips.end - 1)
            }
            Segment::HardCut { clip } => println!("    hard cut clip {clip}"),
        }
    }

    let overlays = request.overlays();
    let remapped = compiled.remap_overlays(overlays);
    if !overlays.is_empty() {
        println!("\n  Text overlays:");
        for overlay in &remapped {
            println!(
                "    {:<12} {:>8.3}s -> {:>8.3}s for {:.3}s",
                overlay.overlay.id,
                overlay.overlay.start_time,
                overlay.start,
                overlay.duration
            );
        }
        let dropped = overlays.len() - remapped.len();
        if dropped > 0 {
            println!("    ({dropped} overlay(s) dropped: unusable timing)");
        }
    }

    println!("\n  Output duration: {:.3}s", compiled.output_duration());
    println!("\nRequest is valid.");
    Ok(())
}
