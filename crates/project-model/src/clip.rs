//! Clips and the transitions joining them.
//!
//! All times are in seconds. A clip's author-timeline placement
//! (`start_time`) is independent of its source trim points.

use serde::{Deserialize, Serialize};

/// A trimmed piece of source media placed on the editor timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Clip {
    /// Editor-assigned identifier.
    pub id: String,

    /// Where the source media can be fetched from.
    pub source_url: String,

    /// Total duration of the untrimmed source.
    pub source_duration: f64,

    /// Author-timeline start offset.
    pub start_time: f64,

    /// Seconds trimmed from the head of the source.
    #[serde(default)]
    pub trim_start: f64,

    /// Seconds trimmed from the tail of the source.
    #[serde(default)]
    pub trim_end: f64,
}

impl Clip {
    pub fn new(id: impl Into<String>, source_url: impl Into<String>, source_duration: f64) -> Self {
        Self {
            id: id.into(),
            source_url: source_url.into(),
            source_duration,
            start_time: 0.0,
            trim_start: 0.0,
            trim_end: 0.0,
        }
    }

    /// Builder-style author start offset.
    pub fn starting_at(mut self, start_time: f64) -> Self {
        self.start_time = start_time;
        self
    }

    /// Builder-style trim points.
    pub fn trimmed(mut self, trim_start: f64, trim_end: f64) -> Self {
        self.trim_start = trim_start;
        self.trim_end = trim_end;
        self
    }

    /// Duration that survives trimming.
    pub fn effective_duration(&self) -> f64 {
        self.source_duration - self.trim_start - self.trim_end
    }

    /// End of the clip on the author timeline.
    pub fn end_time(&self) -> f64 {
        self.start_time + self.effective_duration()
    }

    /// Whether the source must be cut before it can be joined.
    pub fn needs_trim(&self) -> bool {
        self.trim_start > 0.0 || self.trim_end > 0.0
    }
}

/// A transition between two adjacent clips of the normalized sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transition {
    pub from_clip_index: usize,
    pub to_clip_index: usize,
    #[serde(rename = "type")]
    pub style: TransitionStyle,
    pub duration: f64,
}

impl Transition {
    /// A transition from clip `from` into clip `from + 1`.
    pub fn between(from: usize, style: TransitionStyle, duration: f64) -> Self {
        Self {
            from_clip_index: from,
            to_clip_index: from + 1,
            style,
            duration,
        }
    }

    pub fn is_adjacent(&self) -> bool {
        self.from_clip_index.checked_add(1) == Some(self.to_clip_index)
    }
}

/// Visual style of a cross-dissolve. Names match ffmpeg's `xfade` filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionStyle {
    Fade,
    FadeBlack,
    FadeWhite,
    Dissolve,
    WipeLeft,
    WipeRight,
    WipeUp,
    WipeDown,
    SlideLeft,
    SlideRight,
    SlideUp,
    SlideDown,
    CircleCrop,
    RectCrop,
    CircleOpen,
    CircleClose,
    Pixelize,
    Radial,
    SmoothLeft,
    SmoothRight,
    SmoothUp,
    SmoothDown,
}

impl TransitionStyle {
    /// The `transition=` value understood by `xfade`.
    pub fn xfade_name(self) -> &'static str {
        match self {
            Self::Fade => "fade",
            Self::FadeBlack => "fadeblack",
            Self::FadeWhite => "fadewhite",
            Self::Dissolve => "dissolve",
            Self::WipeLeft => "wipeleft",
            Self::WipeRight => "wiperight",
            Self::WipeUp => "wipeup",
            Self::WipeDown => "wipedown",
            Self::SlideLeft => "slideleft",
            Self::SlideRight => "slideright",
            Self::SlideUp => "slideup",
            Self::SlideDown => "slidedown",
            Self::CircleCrop => "circlecrop",
            Self::RectCrop => "rectcrop",
            Self::CircleOpen => "circleopen",
            Self::CircleClose => "circleclose",
            Self::Pixelize => "pixelize",
            Self::Radial => "radial",
            Self::SmoothLeft => "smoothleft",
            Self::SmoothRight => "smoothright",
            Self::SmoothUp => "smoothup",
            Self::SmoothDown => "smoothdown",
        }
    }
}

impl Default for TransitionStyle {
    fn default() -> Self {
        Self::Fade
    }
}
