//! Render plan assembly.
//!
//! Turns a compiled timeline and the fetched source files into an ordered
//! list of transcoder steps. Assembly only names files inside the job work
//! directory; nothing is executed here.

use std::path::{Path, PathBuf};

use serde::Serialize;
use splice_common::config::TranscoderConfig;
use splice_common::error::{SpliceError, SpliceResult};
use splice_timeline_core::compositor::OutputFrame;
use splice_timeline_core::planner::Segment;
use splice_timeline_core::CompiledTimeline;

use crate::export::ExportStage;

/// Name of the concat demuxer list inside the work directory.
pub const CONCAT_LIST_FILE: &str = "concat_list.txt";

/// Name of the joined, overlay-free output inside the work directory.
pub const CONCAT_OUTPUT_FILE: &str = "concat_output.mp4";

/// One unit of work in a render plan.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum RenderStep {
    /// Frame-accurate cut of one source (re-encode).
    Trim {
        clip: usize,
        input: PathBuf,
        output: PathBuf,
        start: f64,
        end: f64,
    },

    /// One crossfade run encoded through its filter graph.
    CrossfadeEncode {
        segment: usize,
        inputs: Vec<PathBuf>,
        filter: String,
        output: PathBuf,
        duration: f64,
    },

    /// Stream-copy join of segment outputs through the concat demuxer.
    ConcatCopy {
        list_file: PathBuf,
        inputs: Vec<PathBuf>,
        output: PathBuf,
    },

    /// Plain file copy, no transcoder involved.
    CopyFile { from: PathBuf, to: PathBuf },

    /// `drawtext` chain burned into the video; audio is copied.
    OverlayPass {
        input: PathBuf,
        filter: String,
        output: PathBuf,
    },
}

impl RenderStep {
    /// Export stage reported while this step runs.
    pub fn stage(&self) -> ExportStage {
        match self {
            Self::Trim { .. } => ExportStage::Trimming,
            Self::CrossfadeEncode { .. } => ExportStage::Crossfading,
            Self::ConcatCopy { .. } | Self::CopyFile { .. } => ExportStage::Concatenating,
            Self::OverlayPass { .. } => ExportStage::Overlaying,
        }
    }

    /// File written by this step.
    pub fn output(&self) -> &Path {
        match self {
            Self::Trim { output, .. }
            | Self::CrossfadeEncode { output, .. }
            | Self::ConcatCopy { output, .. }
            | Self::OverlayPass { output, .. } => output,
            Self::CopyFile { to, .. } => to,
        }
    }

    /// Transcoder arguments, `None` for steps that only copy a file.
    ///
    /// The transcoder itself supplies `-y` and its progress flags.
    pub fn transcoder_args(&self, config: &TranscoderConfig) -> Option<Vec<String>> {
        let audio_bitrate = format!("{}k", config.audio_bitrate_kbps);
        let crf = config.crf.to_string();

        let args = match self {
            Self::CopyFile { .. } => return None,
            Self::Trim {
                input,
                output,
                start,
                end,
                ..
            } => vec![
                "-i".to_string(),
                path_arg(input),
                "-ss".to_string(),
                format!("{start:.3}"),
                "-to".to_string(),
                format!("{end:.3}"),
                "-c:v".to_string(),
                "libx264".to_string(),
                "-preset".to_string(),
                config.trim_preset.clone(),
                "-crf".to_string(),
                crf,
                "-c:a".to_string(),
                "aac".to_string(),
                "-b:a".to_string(),
                audio_bitrate,
                "-avoid_negative_ts".to_string(),
                "make_zero".to_string(),
                path_arg(output),
            ],
            Self::CrossfadeEncode {
                inputs,
                filter,
                output,
                ..
            } => {
                let mut args = Vec::with_capacity(inputs.len() * 2 + 16);
                for input in inputs {
                    args.push("-i".to_string());
                    args.push(path_arg(input));
                }
                args.extend([
                    "-filter_complex".to_string(),
                    filter.clone(),
                    "-map".to_string(),
                    format!("[{}]", splice_timeline_core::xfade::VIDEO_OUT),
                    "-map".to_string(),
                    format!("[{}]", splice_timeline_core::xfade::AUDIO_OUT),
                    "-c:v".to_string(),
                    "libx264".to_string(),
                    "-preset".to_string(),
                    config.crossfade_preset.clone(),
                    "-crf".to_string(),
                    crf,
                    "-c:a".to_string(),
                    "aac".to_string(),
                    "-b:a".to_string(),
                    audio_bitrate,
                    path_arg(output),
                ]);
                args
            }
            Self::ConcatCopy {
                list_file, output, ..
            } => vec![
                "-f".to_string(),
                "concat".to_string(),
                "-safe".to_string(),
                "0".to_string(),
                "-i".to_string(),
                path_arg(list_file),
                "-c".to_string(),
                "copy".to_string(),
                path_arg(output),
            ],
            Self::OverlayPass {
                input,
                filter,
                output,
            } => vec![
                "-i".to_string(),
                path_arg(input),
                "-vf".to_string(),
                filter.clone(),
                "-c:v".to_string(),
                "libx264".to_string(),
                "-preset".to_string(),
                config.overlay_preset.clone(),
                "-crf".to_string(),
                crf,
                "-c:a".to_string(),
                "copy".to_string(),
                path_arg(output),
            ],
        };
        Some(args)
    }

    /// One-line human summary.
    pub fn describe(&self) -> String {
        match self {
            Self::Trim {
                clip, start, end, ..
            } => format!("trim clip {clip} [{start:.3}s, {end:.3}s)"),
            Self::CrossfadeEncode {
                segment,
                inputs,
                duration,
                ..
            } => format!(
                "crossfade segment {segment}: {} clips -> {duration:.3}s",
                inputs.len()
            ),
            Self::ConcatCopy { inputs, .. } => {
                format!("concat {} segments (stream copy)", inputs.len())
            }
            Self::CopyFile { from, to } => format!(
                "copy {} -> {}",
                file_label(from),
                file_label(to)
            ),
            Self::OverlayPass { filter, .. } => format!(
                "overlay pass ({} drawtext filters)",
                filter.matches("drawtext=").count()
            ),
        }
    }
}

/// Ordered steps plus the facts needed to report on them.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderPlan {
    pub work_dir: PathBuf,
    pub output_path: PathBuf,
    pub output_duration_secs: f64,
    pub output_frame: OutputFrame,
    pub steps: Vec<RenderStep>,
}

impl RenderPlan {
    /// Assemble the step list.
    ///
    /// `sources[k]` is the fetched file of the k-th clip in playback order.
    /// `overlay_chain` is the joined `drawtext` chain, `None` when no overlay
    /// survived remapping.
    pub fn assemble(
        compiled: &CompiledTimeline,
        sources: &[PathBuf],
        overlay_chain: Option<String>,
        output_frame: OutputFrame,
        work_dir: &Path,
        output_path: &Path,
    ) -> SpliceResult<Self> {
        if sources.len() != compiled.timeline.len() {
            return Err(SpliceError::config(format!(
                "render plan needs {} source files, got {}",
                compiled.timeline.len(),
                sources.len()
            )));
        }

        let mut steps = Vec::new();

        // Step 1: per-clip trims.
        let mut clip_files = Vec::with_capacity(sources.len());
        for (k, (clip, source)) in compiled.timeline.clips.iter().zip(sources).enumerate() {
            if clip.clip.needs_trim() {
                let output = work_dir.join(format!("trimmed_{k}.mp4"));
                steps.push(RenderStep::Trim {
                    clip: k,
                    input: source.clone(),
                    output: output.clone(),
                    start: clip.clip.trim_start,
                    end: clip.clip.trim_start + clip.effective_duration,
                });
                clip_files.push(output);
            } else {
                clip_files.push(source.clone());
            }
        }

        // Step 2: crossfade runs; hard cuts pass their clip file through.
        let mut segment_files = Vec::with_capacity(compiled.segments.len());
        for (s, segment) in compiled.segments.iter().enumerate() {
            match segment {
                Segment::HardCut { clip } => segment_files.push(clip_files[*clip].clone()),
                Segment::Crossfade { clips } => {
                    let graph = compiled.crossfade_graph(segment, output_frame)?.ok_or_else(|| {
                        SpliceError::invalid_transition(format!("segment {s} has no crossfade graph"))
                    })?;
                    let output = work_dir.join(format!("crossfade_{s}.mp4"));
                    steps.push(RenderStep::CrossfadeEncode {
                        segment: s,
                        inputs: clip_files[clips.clone()].to_vec(),
                        filter: graph.filter,
                        output: output.clone(),
                        duration: graph.output_duration,
                    });
                    segment_files.push(output);
                }
            }
        }

        // Step 3: join segments.
        let joined = work_dir.join(CONCAT_OUTPUT_FILE);
        match segment_files.as_slice() {
            [single] => steps.push(RenderStep::CopyFile {
                from: single.clone(),
                to: joined.clone(),
            }),
            _ => steps.push(RenderStep::ConcatCopy {
                list_file: work_dir.join(CONCAT_LIST_FILE),
                inputs: segment_files,
                output: joined.clone(),
            }),
        }

        // Step 4: overlays or straight copy to the destination.
        match overlay_chain {
            Some(filter) if !filter.is_empty() => steps.push(RenderStep::OverlayPass {
                input: joined,
                filter,
                output: output_path.to_path_buf(),
            }),
            _ => steps.push(RenderStep::CopyFile {
                from: joined,
                to: output_path.to_path_buf(),
            }),
        }

        Ok(Self {
            work_dir: work_dir.to_path_buf(),
            output_path: output_path.to_path_buf(),
            output_duration_secs: compiled.output_duration(),
            output_frame,
            steps,
        })
    }

    /// Steps that invoke the transcoder.
    pub fn transcoder_steps(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| !matches!(s, RenderStep::CopyFile { .. }))
            .count()
    }
}

/// Contents of a concat demuxer list for `entries`.
pub fn concat_list(entries: &[PathBuf]) -> String {
    entries
        .iter()
        .map(|path| format!("file '{}'\n", path.to_string_lossy().replace('\'', "'\\''")))
        .collect()
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
