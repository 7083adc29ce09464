//! Author-timeline to output-timeline remapping.
//!
//! The editor places clips at arbitrary start offsets (gaps allowed), while
//! the rendered file plays clips back to back with every transition
//! overlapping its neighbours. Overlays are authored against the former and
//! must be shown against the latter.

use serde::Serialize;
use splice_project_model::overlay::TextOverlay;

use crate::normalize::NormalizedTimeline;
use crate::planner::TransitionMap;

/// Overlays never start later than this before the end of the output.
pub const EPSILON: f64 = 0.001;

/// Half-open time interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Span {
    pub start: f64,
    pub end: f64,
}

impl Span {
    pub fn new(start: f64, duration: f64) -> Self {
        Self {
            start,
            end: start + duration,
        }
    }

    pub fn contains(&self, t: f64) -> bool {
        t >= self.start && t < self.end
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Placement of one clip on both timelines.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClipSpans {
    pub editor: Span,
    pub concat: Span,
}

/// An overlay whose visibility window is expressed in output time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RemappedOverlay {
    pub overlay: TextOverlay,
    pub start: f64,
    pub duration: f64,
}

impl RemappedOverlay {
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }
}

/// Converts author times into output times.
#[derive(Debug, Clone, Serialize)]
pub struct TimelineRemapper {
    spans: Vec<ClipSpans>,
    total_duration: f64,
}

impl TimelineRemapper {
    pub fn new(timeline: &NormalizedTimeline, transitions: &TransitionMap) -> Self {
        let mut spans = Vec::with_capacity(timeline.len());
        let mut previous_end = 0.0_f64;

        for (k, clip) in timeline.clips.iter().enumerate() {
            let concat_start = if k == 0 {
                0.0
            } else {
                let overlap = transitions.incoming(k).map(|t| t.duration).unwrap_or(0.0);
                (previous_end - overlap).max(0.0)
            };
            let concat = Span::new(concat_start, clip.effective_duration);
            spans.push(ClipSpans {
                editor: Span::new(clip.editor_start(), clip.effective_duration),
                concat,
            });
            previous_end = concat.end;
        }

        Self {
            spans,
            total_duration: previous_end,
        }
    }

    /// Per-clip spans in playback order.
    pub fn spans(&self) -> &[ClipSpans] {
        &self.spans
    }

    /// Length of the rendered output.
    pub fn total_duration(&self) -> f64 {
        self.total_duration
    }

    /// Index of the clip an author time is anchored to.
    ///
    /// A time inside a clip's editor span picks that clip (the first one when
    /// spans overlap). Times before the first clip anchor to the first clip,
    /// times after the last anchor to the last, and times inside a gap anchor
    /// to the clip that follows the gap.
    pub fn anchor_clip(&self, t: f64) -> usize {
        if let Some(idx) = self.spans.iter().position(|s| s.editor.contains(t)) {
            return idx;
        }
        self.spans
            .iter()
            .position(|s| s.editor.start > t)
            .unwrap_or(self.spans.len().saturating_sub(1))
    }

    /// Output time corresponding to author time `t`, clamped into
    /// `[0, total - EPSILON]`.
    pub fn remap_time(&self, t: f64) -> f64 {
        let Some(spans) = self.spans.get(self.anchor_clip(t)) else {
            return 0.0;
        };

        let offset_within_clip = if spans.editor.start > t && t >= self.first_editor_start() {
            // Inside a gap: show from the start of the following clip.
            0.0
        } else {
            t - spans.editor.start
        };

        let upper = (self.total_duration - EPSILON).max(0.0);
        (spans.concat.start + offset_within_clip).clamp(0.0, upper)
    }

    /// Remap an overlay's start and cap its duration at the output end.
    ///
    /// Returns `None` for overlays with a non-finite start or a duration that
    /// is not positive before or after capping.
    pub fn remap_overlay(&self, overlay: &TextOverlay) -> Option<RemappedOverlay> {
        if !overlay.start_time.is_finite() || !overlay.duration.is_finite() || overlay.duration <= 0.0 {
            tracing::warn!(
                overlay = %overlay.id,
                start = overlay.start_time,
                duration = overlay.duration,
                "Dropping overlay with unusable timing"
            );
            return None;
        }

        let start = self.remap_time(overlay.start_time);
        let duration = overlay.duration.min(self.total_duration - start);
        if duration <= 0.0 {
            tracing::warn!(overlay = %overlay.id, start, "Dropping overlay with no visible time");
            return None;
        }

        if (start - overlay.start_time).abs() > EPSILON {
            tracing::debug!(
                overlay = %overlay.id,
                editor_start = overlay.start_time,
                output_start = start,
                "Overlay remapped"
            );
        }

        Some(RemappedOverlay {
            overlay: overlay.clone(),
            start,
            duration,
        })
    }

    /// Remap every overlay, dropping unusable ones.
    pub fn remap_overlays(&self, overlays: &[TextOverlay]) -> Vec<RemappedOverlay> {
        overlays
            .iter()
            .filter_map(|overlay| self.remap_overlay(overlay))
            .collect()
    }

    fn first_editor_start(&self) -> f64 {
        self.spans.first().map(|s| s.editor.start).unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize;
    use splice_project_model::clip::{Clip, Transition, TransitionStyle};

    fn remapper(clips: &[Clip], transitions: &[Transition]) -> TimelineRemapper {
        let timeline = normalize(clips).unwrap();
        let map = TransitionMap::build(&timeline, transitions).unwrap();
        TimelineRemapper::new(&timeline, &map)
    }

    fn scenario() -> TimelineRemapper {
        remapper(
            &[
                Clip::new("a", "a.mp4", 10.0).starting_at(0.0),
                Clip::new("b", "b.mp4", 8.0).starting_at(10.0),
                Clip::new("c", "c.mp4", 12.0).starting_at(18.0),
            ],
            &[Transition::between(0, TransitionStyle::Fade, 1.0)],
        )
    }

    #[test]
    fn test_concat_spans_account_for_overlap() {
        let r = scenario();
        let starts: Vec<f64> = r.spans().iter().map(|s| s.concat.start).collect();
        assert_eq!(starts, vec![0.0, 9.0, 17.0]);
        assert!((r.total_duration() - 29.0).abs() < 1e-9);
    }

    #[test]
    fn test_remap_within_clips() {
        let r = scenario();
        assert!((r.remap_time(9.5) - 9.5).abs() < 1e-9);
        assert!((r.remap_time(11.0) - 10.0).abs() < 1e-9);
        assert!((r.remap_time(20.0) - 19.0).abs() < 1e-9);
    }

    #[test]
    fn test_gapped_timeline_closes_gaps() {
        let r = remapper(
            &[
                Clip::new("a", "a.mp4", 4.0).starting_at(0.0),
                Clip::new("b", "b.mp4", 4.0).starting_at(10.0),
            ],
            &[],
        );
        assert!((r.remap_time(12.0) - 6.0).abs() < 1e-9);
        // Inside the gap: start of the following clip.
        assert!((r.remap_time(7.0) - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_before_first_clip_never_negative() {
        let r = remapper(&[Clip::new("a", "a.mp4", 5.0).starting_at(3.0)], &[]);
        assert_eq!(r.anchor_clip(1.0), 0);
        assert_eq!(r.remap_time(1.0), 0.0);
    }

    #[test]
    fn test_after_last_clip_clamped() {
        let r = scenario();
        assert_eq!(r.anchor_clip(100.0), 2);
        assert!((r.remap_time(100.0) - (29.0 - EPSILON)).abs() < 1e-9);
    }

    #[test]
    fn test_overlay_duration_capped() {
        let r = scenario();
        let overlay = TextOverlay::new("t", "late", 28.0, 5.0);
        let remapped = r.remap_overlay(&overlay).unwrap();
        assert!((remapped.start - 27.0).abs() < 1e-9);
        assert!((remapped.end() - 29.0).abs() < 1e-9);
    }

    #[test]
    fn test_unusable_overlays_dropped() {
        let r = scenario();
        let overlays = vec![
            TextOverlay::new("zero", "x", 1.0, 0.0),
            TextOverlay::new("nan", "x", f64::NAN, 1.0),
            TextOverlay::new("ok", "x", 1.0, 1.0),
        ];
        let remapped = r.remap_overlays(&overlays);
        assert_eq!(remapped.len(), 1);
        assert_eq!(remapped[0].overlay.id, "ok");
    }
}
