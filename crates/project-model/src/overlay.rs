//! Text overlays authored against the editor preview surface.
//!
//! Positions are percentages (`0.0..=100.0`) of the frame with the origin at
//! the top-left; the point anchors the *centre* of the rendered text block.
//! Font sizes and padding are in preview pixels.

use serde::{Deserialize, Serialize};

/// A time-positioned block of text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextOverlay {
    pub id: String,

    /// Start on the author timeline.
    pub start_time: f64,

    /// Visible duration in seconds.
    pub duration: f64,

    /// Free text, possibly multi-line.
    pub text: String,

    #[serde(default)]
    pub position: OverlayPosition,

    #[serde(default)]
    pub style: TextStyle,
}

impl TextOverlay {
    pub fn new(id: impl Into<String>, text: impl Into<String>, start_time: f64, duration: f64) -> Self {
        Self {
            id: id.into(),
            start_time,
            duration,
            text: text.into(),
            position: OverlayPosition::default(),
            style: TextStyle::default(),
        }
    }

    /// Builder-style anchor position in percent.
    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.position = OverlayPosition { x, y };
        self
    }

    /// Builder-style style override.
    pub fn styled(mut self, style: TextStyle) -> Self {
        self.style = style;
        self
    }
}

/// Anchor point in percent of the frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayPosition {
    pub x: f64,
    pub y: f64,
}

impl OverlayPosition {
    pub const CENTER: OverlayPosition = OverlayPosition { x: 50.0, y: 50.0 };

    /// The position with non-finite components replaced by the centre.
    pub fn sanitized(self) -> Self {
        Self {
            x: if self.x.is_finite() { self.x } else { Self::CENTER.x },
            y: if self.y.is_finite() { self.y } else { Self::CENTER.y },
        }
    }
}

impl Default for OverlayPosition {
    fn default() -> Self {
        Self::CENTER
    }
}

/// Visual style of an overlay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TextStyle {
    pub font_family: String,

    /// Size in preview pixels.
    pub font_size: f64,

    pub font_weight: FontWeight,

    /// Text colour (`#RRGGBB`, `rgb()`, `rgba()`).
    pub color: String,

    pub background_color: Option<String>,

    /// Box padding in preview pixels.
    pub background_padding: Option<f64>,

    pub text_align: TextAlign,

    /// Overall opacity in `[0, 1]`.
    pub opacity: f64,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_family: "Inter".to_string(),
            font_size: 32.0,
            font_weight: FontWeight::Normal,
            color: "#FFFFFF".to_string(),
            background_color: None,
            background_padding: None,
            text_align: TextAlign::Center,
            opacity: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontWeight {
    Normal,
    Bold,
    Light,
}

impl FontWeight {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Bold => "bold",
            Self::Light => "light",
        }
    }
}

impl Default for FontWeight {
    fn default() -> Self {
        Self::Normal
    }
}

/// Justification of lines inside the block. Does not move the anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    Left,
    Center,
    Right,
}

impl Default for TextAlign {
    fn default() -> Self {
        Self::Center
    }
}

/// Size of the editing surface the overlay was authored against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewFrame {
    pub width: u32,
    pub height: u32,
}

impl PreviewFrame {
    /// Approximate width of the web editor's preview container.
    pub const DEFAULT_WIDTH: u32 = 400;

    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Default for PreviewFrame {
    fn default() -> Self {
        Self {
            width: Self::DEFAULT_WIDTH,
            height: 225,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlay_wire_shape() {
        let json = r##"{
            "id": "t1",
            "startTime": 2.5,
            "duration": 3.0,
            "text": "Hello\nWorld",
            "position": { "x": 25, "y": 80 },
            "style": {
                "fontFamily": "Montserrat",
                "fontSize": 24,
                "fontWeight": "bold",
                "color": "rgba(255,0,0,0.5)",
                "backgroundColor": "#000000",
                "backgroundPadding": 8,
                "textAlign": "left",
                "opacity": 0.9
            }
        }"##;
        let overlay: TextOverlay = serde_json::from_str(json).unwrap();
        assert_eq!(overlay.position, OverlayPosition { x: 25.0, y: 80.0 });
        assert_eq!(overlay.style.font_weight, FontWeight::Bold);
        assert_eq!(overlay.style.text_align, TextAlign::Left);
        assert_eq!(overlay.style.background_padding, Some(8.0));
    }

    #[test]
    fn test_style_defaults_fill_missing_fields() {
        let json = r#"{ "id": "t", "startTime": 0, "duration": 1, "text": "x", "style": { "fontSize": 40 } }"#;
        let overlay: TextOverlay = serde_json::from_str(json).unwrap();
        assert_eq!(overlay.position, OverlayPosition::CENTER);
        assert_eq!(overlay.style.font_family, "Inter");
        assert_eq!(overlay.style.font_size, 40.0);
        assert_eq!(overlay.style.color, "#FFFFFF");
        assert!((overlay.style.opacity - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_position_sanitized() {
        let pos = OverlayPosition { x: f64::NAN, y: 10.0 }.sanitized();
        assert_eq!(pos, OverlayPosition { x: 50.0, y: 10.0 });
    }
}
