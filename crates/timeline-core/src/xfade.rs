//! Filter-graph compiler for crossfade runs.
//!
//! A run of N clips becomes one `-filter_complex` expression with N-1
//! chained `xfade` (video) and `acrossfade` (audio) boundaries:
//!
//! ```text
//! [v0][v1] xfade  -> [xv1]
//! [xv1][v2] xfade -> [xv2]
//! ...
//! [xvN-2][vN-1] xfade -> [vout]
//! ```
//!
//! `xfade` needs an absolute `offset` into its first input. That input is
//! itself the output of the previous boundary, so the offset is computed
//! from an accumulator that has already subtracted every earlier overlap.
//!
//! Every input is scaled and letterboxed to the output frame first, since
//! `xfade` rejects inputs of different sizes. Inputs must still share a
//! frame rate and each must carry an audio stream.

use std::fmt::Write as _;

use serde::Serialize;
use splice_common::error::{SpliceError, SpliceResult};
use splice_project_model::clip::TransitionStyle;

use crate::compositor::OutputFrame;
use crate::planner::TransitionSpec;

/// Label of the run's final video stream.
pub const VIDEO_OUT: &str = "vout";
/// Label of the run's final audio stream.
pub const AUDIO_OUT: &str = "aout";

/// One compiled boundary of a run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CrossfadeBoundary {
    pub style: TransitionStyle,
    pub duration: f64,
    /// Start of the dissolve, measured on the run's own output clock.
    pub offset: f64,
}

/// Compiled graph for one crossfade run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrossfadeGraph {
    /// `-filter_complex` expression. Inputs are referenced as `[k:v]`/`[k:a]`
    /// for k in `0..N`, in run order.
    pub filter: String,

    /// Per-boundary offsets and durations.
    pub boundaries: Vec<CrossfadeBoundary>,

    /// Length of the run after all overlaps.
    pub output_duration: f64,
}

/// Compile a crossfade run.
///
/// `durations` are the effective durations of the run's clips in order;
/// `transitions[i]` joins clip `i` to clip `i + 1`.
pub fn compile_crossfade_run(
    durations: &[f64],
    transitions: &[TransitionSpec],
    frame: OutputFrame,
) -> SpliceResult<CrossfadeGraph> {
    if durations.len() < 2 {
        return Err(SpliceError::invalid_transition(
            "a crossfade run needs at least two clips",
        ));
    }
    if transitions.len() != durations.len() - 1 {
        return Err(SpliceError::invalid_transition(format!(
            "a run of {} clips needs {} transitions, got {}",
            durations.len(),
            durations.len() - 1,
            transitions.len()
        )));
    }

    let mut filter = String::new();
    for k in 0..durations.len() {
        if k > 0 {
            filter.push(';');
        }
        let _ = write!(
            filter,
            "[{k}:v]scale={w}:{h}:force_original_aspect_ratio=decrease,pad={w}:{h}:(ow-iw)/2:(oh-ih)/2,setsar=1,\
             settb=AVTB,format=yuv420p,setpts=PTS-STARTPTS[v{k}];[{k}:a]asetpts=PTS-STARTPTS[a{k}]",
            w = frame.width,
            h = frame.height,
        );
    }

    let last = transitions.len() - 1;
    let mut pos = durations[0];
    let mut boundaries = Vec::with_capacity(transitions.len());

    for (i, spec) in transitions.iter().enumerate() {
        let outgoing = durations[i];
        let incoming = durations[i + 1];
        if spec.duration >= outgoing.min(incoming) {
            return Err(SpliceError::invalid_transition(format!(
                "boundary {i}: {:.3}s transition does not fit between clips of {outgoing:.3}s and {incoming:.3}s",
                spec.duration
            )));
        }

        let offset = pos - spec.duration;

        let (video_in, audio_in) = if i == 0 {
            ("[v0]".to_string(), "[a0]".to_string())
        } else {
            (format!("[xv{i}]"), format!("[xa{i}]"))
        };
        let (video_out, audio_out) = if i == last {
            (format!("[{VIDEO_OUT}]"), format!("[{AUDIO_OUT}]"))
        } else {
            (format!("[xv{}]", i + 1), format!("[xa{}]", i + 1))
        };

        let _ = write!(
            filter,
            ";{video_in}[v{next}]xfade=transition={style}:duration={duration:.3}:offset={offset:.3}{video_out}\
             ;{audio_in}[a{next}]acrossfade=d={duration:.3}{audio_out}",
            next = i + 1,
            style = spec.style.xfade_name(),
            duration = spec.duration,
        );

        boundaries.push(CrossfadeBoundary {
            style: spec.style,
            duration: spec.duration,
            offset,
        });

        pos = pos + incoming - spec.duration;
    }

    tracing::debug!(
        clips = durations.len(),
        output_duration = pos,
        filter_len = filter.len(),
        "Crossfade run compiled"
    );

    Ok(CrossfadeGraph {
        filter,
        boundaries,
        output_duration: pos,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const HD: OutputFrame = OutputFrame::FALLBACK;

    fn spec(duration: f64) -> TransitionSpec {
        TransitionSpec {
            style: TransitionStyle::Fade,
            duration,
        }
    }

    #[test]
    fn test_two_clip_run() {
        let graph = compile_crossfade_run(&[10.0, 8.0], &[spec(1.0)], HD).unwrap();
        assert!((graph.output_duration - 17.0).abs() < 1e-9);
        assert!((graph.boundaries[0].offset - 9.0).abs() < 1e-9);
        assert!(graph
            .filter
            .contains("[v0][v1]xfade=transition=fade:duration=1.000:offset=9.000[vout]"));
        assert!(graph.filter.contains("[a0][a1]acrossfade=d=1.000[aout]"));
    }

    #[test]
    fn test_offsets_use_overlap_adjusted_accumulator() {
        let graph =
            compile_crossfade_run(&[5.0, 6.0, 7.0], &[spec(1.0), spec(2.0)], HD).unwrap();
        // Boundary 0 at 5 - 1; run is then 10s long, boundary 1 at 10 - 2.
        assert!((graph.boundaries[0].offset - 4.0).abs() < 1e-9);
        assert!((graph.boundaries[1].offset - 8.0).abs() < 1e-9);
        assert!((graph.output_duration - 15.0).abs() < 1e-9);
        assert!(graph.filter.contains("[v0][v1]xfade=transition=fade:duration=1.000:offset=4.000[xv1]"));
        assert!(graph.filter.contains("[xv1][v2]xfade=transition=fade:duration=2.000:offset=8.000[vout]"));
        assert!(graph.filter.contains("[xa1][a2]acrossfade=d=2.000[aout]"));
    }

    #[test]
    fn test_inputs_are_normalized() {
        let graph = compile_crossfade_run(&[3.0, 3.0], &[spec(0.5)], OutputFrame::new(1280, 720)).unwrap();
        assert!(graph.filter.starts_with(
            "[0:v]scale=1280:720:force_original_aspect_ratio=decrease,pad=1280:720:(ow-iw)/2:(oh-ih)/2,setsar=1,\
             settb=AVTB,format=yuv420p,setpts=PTS-STARTPTS[v0]"
        ));
        assert!(graph.filter.contains("[1:v]scale=1280:720:"));
        assert!(graph.filter.contains("[1:a]asetpts=PTS-STARTPTS[a1]"));
        assert!(graph.filter.ends_with(&format!("[{AUDIO_OUT}]")));
    }

    #[test]
    fn test_style_name_emitted() {
        let graph = compile_crossfade_run(
            &[3.0, 3.0],
            &[TransitionSpec {
                style: TransitionStyle::CircleOpen,
                duration: 0.5,
            }],
            HD,
        )
        .unwrap();
        assert!(graph.filter.contains("xfade=transition=circleopen:"));
    }

    #[test]
    fn test_oversized_transition_rejected() {
        assert!(matches!(
            compile_crossfade_run(&[2.0, 8.0], &[spec(2.0)], HD),
            Err(SpliceError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_mismatched_lengths_rejected() {
        assert!(compile_crossfade_run(&[2.0], &[], HD).is_err());
        assert!(compile_crossfade_run(&[2.0, 3.0, 4.0], &[spec(0.5)], HD).is_err());
    }
}
