//! Transition planning: which clips crossfade and which are hard cuts.
//!
//! The normalized clip sequence is partitioned into maximal runs whose
//! adjacent pairs all carry a transition ([`Segment::Crossfade`]) and single
//! clips that meet their neighbours with a straight cut
//! ([`Segment::HardCut`]).

use std::collections::BTreeMap;
use std::ops::Range;

use serde::Serialize;
use splice_common::error::{SpliceError, SpliceResult};
use splice_project_model::clip::{Transition, TransitionStyle};

use crate::normalize::NormalizedTimeline;

/// A validated transition at one clip boundary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TransitionSpec {
    pub style: TransitionStyle,
    pub duration: f64,
}

/// Validated transitions keyed by the index of the outgoing clip.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TransitionMap {
    by_from: BTreeMap<usize, TransitionSpec>,
}

impl TransitionMap {
    /// Validate `transitions` against the normalized timeline.
    ///
    /// Rejects non-adjacent or out-of-range indices, duplicate boundaries,
    /// non-positive durations, and durations that reach either adjoining
    /// clip's effective duration.
    pub fn build(timeline: &NormalizedTimeline, transitions: &[Transition]) -> SpliceResult<Self> {
        let mut by_from = BTreeMap::new();

        for transition in transitions {
            let from = transition.from_clip_index;
            let to = transition.to_clip_index;

            if !transition.is_adjacent() {
                return Err(SpliceError::invalid_transition(format!(
                    "transition {from} -> {to} does not join adjacent clips"
                )));
            }
            if from >= timeline.len() || to >= timeline.len() {
                return Err(SpliceError::invalid_transition(format!(
                    "transition {from} -> {to} references a clip past the end of the timeline ({} clips)",
                    timeline.len()
                )));
            }
            if !transition.duration.is_finite() || transition.duration <= 0.0 {
                return Err(SpliceError::invalid_transition(format!(
                    "transition {from} -> {to} has non-positive duration {}",
                    transition.duration
                )));
            }

            let limit = timeline.clips[from]
                .effective_duration
                .min(timeline.clips[to].effective_duration);
            if transition.duration >= limit {
                return Err(SpliceError::invalid_transition(format!(
                    "transition {from} -> {to} lasts {:.3}s but the shorter adjoining clip is only {limit:.3}s",
                    transition.duration
                )));
            }

            let spec = TransitionSpec {
                style: transition.style,
                duration: transition.duration,
            };
            if by_from.insert(from, spec).is_some() {
                return Err(SpliceError::invalid_transition(format!(
                    "more than one transition leaves clip {from}"
                )));
            }
        }

        Ok(Self { by_from })
    }

    /// Transition from clip `from` into `from + 1`.
    pub fn outgoing(&self, from: usize) -> Option<&TransitionSpec> {
        self.by_from.get(&from)
    }

    /// Transition into clip `to` from `to - 1`.
    pub fn incoming(&self, to: usize) -> Option<&TransitionSpec> {
        to.checked_sub(1).and_then(|from| self.outgoing(from))
    }

    pub fn len(&self) -> usize {
        self.by_from.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_from.is_empty()
    }

    /// Whether every adjacent pair of an `n`-clip timeline is transitioned.
    pub fn covers_all(&self, clip_count: usize) -> bool {
        clip_count >= 2 && (0..clip_count - 1).all(|i| self.by_from.contains_key(&i))
    }

    /// Sum of every overlap; the output is this much shorter than the
    /// hard-cut concatenation.
    pub fn total_overlap(&self) -> f64 {
        self.by_from.values().map(|t| t.duration).sum()
    }

    /// Specs for the boundaries inside `clips`, in order.
    pub fn boundaries(&self, clips: &Range<usize>) -> Vec<TransitionSpec> {
        (clips.start..clips.end.saturating_sub(1))
            .filter_map(|i| self.outgoing(i).copied())
            .collect()
    }
}

/// One piece of the playback order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Segment {
    /// Two or more clips chained by cross-dissolves; requires re-encoding.
    Crossfade { clips: Range<usize> },

    /// A single clip joined to its neighbours by stream copy.
    HardCut { clip: usize },
}

/// Partition `clip_count` clips into crossfade runs and hard cuts.
pub fn plan_segments(clip_count: usize, transitions: &TransitionMap) -> Vec<Segment> {
    if transitions.covers_all(clip_count) {
        return vec![Segment::Crossfade {
            clips: 0..clip_count,
        }];
    }

    let mut segments = Vec::new();
    let mut start = 0;
    while start < clip_count {
        let mut end = start + 1;
        while end < clip_count && transitions.outgoing(end - 1).is_some() {
            end += 1;
        }

        if end - start >= 2 {
            segments.push(Segment::Crossfade { clips: start..end });
        } else {
            segments.push(Segment::HardCut { clip: start });
        }
        start = end;
    }

    segments
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize;
    use splice_project_model::clip::Clip;

    fn timeline(durations: &[f64]) -> NormalizedTimeline {
        let mut start = 0.0;
        let clips: Vec<Clip> = durations
            .iter()
            .enumerate()
            .map(|(i, d)| {
                let clip = Clip::new(format!("c{i}"), format!("{i}.mp4"), *d).starting_at(start);
                start += d;
                clip
            })
            .collect();
        normalize(&clips).unwrap()
    }

    fn fade(from: usize, duration: f64) -> Transition {
        Transition::between(from, TransitionStyle::Fade, duration)
    }

    #[test]
    fn test_no_transitions_yields_hard_cuts() {
        let tl = timeline(&[3.0, 4.0, 5.0]);
        let map = TransitionMap::build(&tl, &[]).unwrap();
        assert_eq!(
            plan_segments(tl.len(), &map),
            vec![
                Segment::HardCut { clip: 0 },
                Segment::HardCut { clip: 1 },
                Segment::HardCut { clip: 2 },
            ]
        );
    }

    #[test]
    fn test_all_transitioned_is_single_run() {
        let tl = timeline(&[3.0, 4.0, 5.0]);
        let map = TransitionMap::build(&tl, &[fade(0, 1.0), fade(1, 1.0)]).unwrap();
        assert!(map.covers_all(3));
        assert_eq!(
            plan_segments(tl.len(), &map),
            vec![Segment::Crossfade { clips: 0..3 }]
        );
    }

    #[test]
    fn test_mixed_runs() {
        let tl = timeline(&[3.0, 4.0, 5.0, 6.0, 7.0]);
        let map = TransitionMap::build(&tl, &[fade(0, 1.0), fade(2, 0.5), fade(3, 0.5)]).unwrap();
        assert_eq!(
            plan_segments(tl.len(), &map),
            vec![
                Segment::Crossfade { clips: 0..2 },
                Segment::Crossfade { clips: 2..5 },
            ]
        );
    }

    #[test]
    fn test_trailing_hard_cut() {
        let tl = timeline(&[10.0, 8.0, 12.0]);
        let map = TransitionMap::build(&tl, &[fade(0, 1.0)]).unwrap();
        let segments = plan_segments(tl.len(), &map);
        assert_eq!(
            segments,
            vec![
                Segment::Crossfade { clips: 0..2 },
                Segment::HardCut { clip: 2 },
            ]
        );
        assert_eq!(map.boundaries(&(0..2)).len(), 1);
    }

    #[test]
    fn test_single_clip_is_hard_cut() {
        let tl = timeline(&[3.0]);
        let map = TransitionMap::build(&tl, &[]).unwrap();
        assert!(!map.covers_all(1));
        assert_eq!(plan_segments(1, &map), vec![Segment::HardCut { clip: 0 }]);
    }

    #[test]
    fn test_non_adjacent_rejected() {
        let tl = timeline(&[3.0, 4.0, 5.0]);
        let bad = Transition {
            from_clip_index: 0,
            to_clip_index: 2,
            style: TransitionStyle::Fade,
            duration: 1.0,
        };
        assert!(matches!(
            TransitionMap::build(&tl, &[bad]),
            Err(SpliceError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_out_of_range_rejected() {
        let tl = timeline(&[3.0, 4.0]);
        assert!(TransitionMap::build(&tl, &[fade(1, 1.0)]).is_err());
    }

    #[test]
    fn test_maximum_from_index_rejected_without_overflow() {
        let tl = timeline(&[3.0, 4.0]);
        for to in [0u64, 1, u64::MAX] {
            let json = format!(
                r#"{{ "fromClipIndex": 18446744073709551615, "toClipIndex": {to}, "type": "fade", "duration": 1.0 }}"#
            );
            let transition: Transition = serde_json::from_str(&json).unwrap();
            assert!(!transition.is_adjacent());
            assert!(matches!(
                TransitionMap::build(&tl, &[transition]),
                Err(SpliceError::InvalidTransition { .. })
            ));
        }
    }

    #[test]
    fn test_duration_reaching_clip_length_rejected() {
        let tl = timeline(&[3.0, 2.0]);
        assert!(TransitionMap::build(&tl, &[fade(0, 2.0)]).is_err());
        assert!(TransitionMap::build(&tl, &[fade(0, 1.99)]).is_ok());
        assert!(TransitionMap::build(&tl, &[fade(0, 0.0)]).is_err());
    }

    #[test]
    fn test_duplicate_boundary_rejected() {
        let tl = timeline(&[3.0, 4.0]);
        assert!(TransitionMap::build(&tl, &[fade(0, 1.0), fade(0, 0.5)]).is_err());
    }

    #[test]
    fn test_incoming_lookup() {
        let tl = timeline(&[3.0, 4.0, 5.0]);
        let map = TransitionMap::build(&tl, &[fade(1, 0.5)]).unwrap();
        assert!(map.incoming(0).is_none());
        assert!(map.incoming(1).is_none());
        assert!((map.incoming(2).unwrap().duration - 0.5).abs() < 1e-9);
        assert!((map.total_overlap() - 0.5).abs() < 1e-9);
    }
}
