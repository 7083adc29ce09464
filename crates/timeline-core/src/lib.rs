//! Splice Timeline Core
//!
//! Compiles an export request into the decisions the render engine executes:
//! - **Normalize:** Sort clips by author start and validate trims
//! - **Plan:** Validate transitions and split the timeline into crossfade runs and hard cuts
//! - **Xfade:** Build `xfade`/`acrossfade` filter graphs with overlap-adjusted offsets
//! - **Remap:** Move overlay times from the gapped author timeline to output time
//! - **Compose:** Lay out text overlays as `drawtext` filters at output resolution
//!
//! This crate is pure computation apart from font file probing.
//! All inputs are data; all outputs are data.

pub mod color;
pub mod compositor;
pub mod fonts;
pub mod normalize;
pub mod planner;
pub mod remap;
pub mod xfade;

pub use compositor::{DrawTextLine, OutputFrame, OverlayCompositor};
pub use fonts::{FontCatalog, FontResolver};
pub use normalize::{normalize, NormalizedTimeline};
pub use planner::{plan_segments, Segment, TransitionMap};
pub use remap::{RemappedOverlay, TimelineRemapper};
pub use xfade::{compile_crossfade_run, CrossfadeGraph};

use serde::Serialize;
use splice_common::error::SpliceResult;
use splice_project_model::clip::{Clip, Transition};
use splice_project_model::overlay::TextOverlay;

/// Everything derived from the clip list and transitions.
#[derive(Debug, Clone, Serialize)]
pub struct CompiledTimeline {
    pub timeline: NormalizedTimeline,
    pub transitions: TransitionMap,
    pub segments: Vec<Segment>,
    pub remapper: TimelineRemapper,
}

impl CompiledTimeline {
    /// Length of the rendered output.
    pub fn output_duration(&self) -> f64 {
        self.remapper.total_duration()
    }

    /// Filter graph for a crossfade segment rendered at `frame`, `None` for a hard cut.
    pub fn crossfade_graph(
        &self,
        segment: &Segment,
        frame: OutputFrame,
    ) -> SpliceResult<Option<CrossfadeGraph>> {
        let Segment::Crossfade { clips } = segment else {
            return Ok(None);
        };
        let durations: Vec<f64> = self.timeline.clips[clips.clone()]
            .iter()
            .map(|c| c.effective_duration)
            .collect();
        let specs = self.transitions.boundaries(clips);
        compile_crossfade_run(&durations, &specs, frame).map(Some)
    }

    /// Overlays in output time, unusable ones dropped.
    pub fn remap_overlays(&self, overlays: &[TextOverlay]) -> Vec<RemappedOverlay> {
        self.remapper.remap_overlays(overlays)
    }
}

/// Normalize, validate transitions, plan segments and build the remapper.
pub fn compile_timeline(clips: &[Clip], transitions: &[Transition]) -> SpliceResult<CompiledTimeline> {
    let timeline = normalize(clips)?;
    let transitions = TransitionMap::build(&timeline, transitions)?;
    let segments = plan_segments(timeline.len(), &transitions);
    let remapper = TimelineRemapper::new(&timeline, &transitions);

    tracing::debug!(
        clips = timeline.len(),
        transitions = transitions.len(),
        segments = segments.len(),
        output_duration = remapper.total_duration(),
        "Timeline compiled"
    );

    Ok(CompiledTimeline {
        timeline,
        transitions,
        segments,
        remapper,
    })
}
