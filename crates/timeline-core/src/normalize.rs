//! Timeline normalization: author order and effective durations.

use serde::Serialize;
use splice_common::error::{SpliceError, SpliceResult};
use splice_project_model::clip::Clip;

/// A clip in playback order with its validated effective duration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedClip {
    /// The clip as authored.
    pub clip: Clip,

    /// Position of the clip in the request's clip list.
    pub input_index: usize,

    /// `source_duration - trim_start - trim_end`, always > 0.
    pub effective_duration: f64,
}

impl NormalizedClip {
    /// Author-timeline start.
    pub fn editor_start(&self) -> f64 {
        self.clip.start_time
    }

    /// Author-timeline end (exclusive).
    pub fn editor_end(&self) -> f64 {
        self.clip.start_time + self.effective_duration
    }
}

/// Clips sorted by author start time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedTimeline {
    pub clips: Vec<NormalizedClip>,
}

impl NormalizedTimeline {
    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    /// Output length when every clip is joined by a hard cut.
    pub fn sequential_duration(&self) -> f64 {
        self.clips.iter().map(|c| c.effective_duration).sum()
    }
}

/// Sort clips by author start time and validate their trims.
///
/// Ties keep input order. Fails with [`SpliceError::InvalidClip`] when the
/// list is empty or any clip has a non-finite field, a negative trim, or a
/// non-positive effective duration.
pub fn normalize(clips: &[Clip]) -> SpliceResult<NormalizedTimeline> {
    if clips.is_empty() {
        return Err(SpliceError::invalid_clip("export requires at least one clip"));
    }

    let mut normalized = Vec::with_capacity(clips.len());
    for (input_index, clip) in clips.iter().enumerate() {
        let fields = [
            clip.source_duration,
            clip.start_time,
            clip.trim_start,
            clip.trim_end,
        ];
        if fields.iter().any(|v| !v.is_finite()) {
            return Err(SpliceError::invalid_clip(format!(
                "clip '{}' has a non-finite time field",
                clip.id
            )));
        }
        if clip.trim_start < 0.0 || clip.trim_end < 0.0 {
            return Err(SpliceError::invalid_clip(format!(
                "clip '{}' has a negative trim (start={}, end={})",
                clip.id, clip.trim_start, clip.trim_end
            )));
        }

        let effective_duration = clip.effective_duration();
        if effective_duration <= 0.0 {
            return Err(SpliceError::invalid_clip(format!(
                "clip '{}' has non-positive effective duration {effective_duration:.3}s \
                 (source {:.3}s, trim {:.3}s + {:.3}s)",
                clip.id, clip.source_duration, clip.trim_start, clip.trim_end
            )));
        }

        normalized.push(NormalizedClip {
            clip: clip.clone(),
            input_index,
            effective_duration,
        });
    }

    // `sort_by` is stable, so simultaneous starts keep request order.
    normalized.sort_by(|a, b| a.clip.start_time.total_cmp(&b.clip.start_time));

    tracing::debug!(
        clips = normalized.len(),
        sequential_duration = normalized.iter().map(|c| c.effective_duration).sum::<f64>(),
        "Timeline normalized"
    );

    Ok(NormalizedTimeline { clips: normalized })
}
