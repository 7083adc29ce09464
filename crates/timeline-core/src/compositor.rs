//! Overlay compositor: remapped overlays to per-line `drawtext` filters.
//!
//! Positions and sizes are authored against the editor preview; the output
//! frame is usually several times larger. Everything is scaled linearly by
//! `output_width / preview_width` so text keeps its on-screen proportion.
//!
//! The web preview centres the text block on the anchor point
//! (`translate(-50%, -50%)`), and `textAlign` only justifies lines inside
//! that block. A single-line `drawtext` is therefore always centred on the
//! anchor, and multi-line blocks are stacked around it line by line.

use std::fmt::Write as _;
use std::path::PathBuf;

use serde::Serialize;
use splice_project_model::overlay::PreviewFrame;

use crate::color::parse_color;
use crate::fonts::FontResolver;
use crate::remap::RemappedOverlay;

/// Line height as a multiple of the font size.
pub const LINE_HEIGHT_FACTOR: f64 = 1.2;

/// Pixel size of the rendered output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OutputFrame {
    pub width: u32,
    pub height: u32,
}

impl OutputFrame {
    /// Assumed when the output size cannot be probed.
    pub const FALLBACK: OutputFrame = OutputFrame {
        width: 1920,
        height: 1080,
    };

    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Background box drawn behind a line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextBox {
    /// `0xRRGGBB@opacity`.
    pub color: String,
    /// Border width in output pixels.
    pub border: u32,
}

/// One `drawtext` instruction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DrawTextLine {
    /// Id of the overlay this line belongs to.
    pub overlay_id: String,
    /// Escaped line text.
    pub text: String,
    pub font_file: PathBuf,
    pub font_size: u32,
    /// `0xRRGGBB@opacity`.
    pub font_color: String,
    /// Horizontal centre in output pixels.
    pub x: i64,
    /// Vertical centre of this line in output pixels.
    pub y: f64,
    pub background: Option<TextBox>,
    /// Visible from `start` (inclusive) to `end` (exclusive), output time.
    pub start: f64,
    pub end: f64,
}

impl DrawTextLine {
    /// The `drawtext=...` filter for this line.
    pub fn to_filter(&self) -> String {
        let mut filter = format!(
            "drawtext=text='{}':fontfile='{}':fontsize={}:fontcolor={}:x={}-(tw/2):y={}-(th/2)",
            self.text,
            escape_drawtext(&self.font_file.to_string_lossy()),
            self.font_size,
            self.font_color,
            self.x,
            self.y.round() as i64,
        );
        if let Some(background) = &self.background {
            let _ = write!(
                filter,
                ":box=1:boxcolor={}:boxborderw={}",
                background.color, background.border
            );
        }
        let _ = write!(
            filter,
            ":enable='gte(t,{:.3})*lt(t,{:.3})'",
            self.start, self.end
        );
        filter
    }
}

/// Lays out overlays against a concrete output frame.
pub struct OverlayCompositor<'a> {
    frame: OutputFrame,
    preview: PreviewFrame,
    fonts: &'a dyn FontResolver,
}

impl<'a> OverlayCompositor<'a> {
    pub fn new(frame: OutputFrame, preview: PreviewFrame, fonts: &'a dyn FontResolver) -> Self {
        Self {
            frame,
            preview,
            fonts,
        }
    }

    /// `output_width / preview_width`.
    pub fn scale_factor(&self) -> f64 {
        f64::from(self.frame.width) / f64::from(self.preview.width.max(1))
    }

    /// Draw instructions for one overlay, one per non-empty line.
    pub fn compose(&self, remapped: &RemappedOverlay) -> Vec<DrawTextLine> {
        let overlay = &remapped.overlay;
        let style = &overlay.style;
        let scale = self.scale_factor();

        let position = overlay.position.sanitized();
        let x = (position.x / 100.0 * f64::from(self.frame.width)) as i64;
        let y = (position.y / 100.0 * f64::from(self.frame.height)) as i64;

        let font_size = ((style.font_size * scale) as u32).max(1);
        let padding = (style.background_padding.unwrap_or(0.0).max(0.0) * scale) as u32;
        let font = self.fonts.resolve(&style.font_family, style.font_weight);

        let opacity = if style.opacity.is_finite() {
            style.opacity.clamp(0.0, 1.0)
        } else {
            1.0
        };
        let font_color = parse_color(&style.color).to_ffmpeg_with_opacity(opacity);
        let background = style.background_color.as_deref().map(|bg| TextBox {
            color: parse_color(bg).to_ffmpeg_with_opacity(opacity),
            border: padding,
        });

        let lines = split_lines(&overlay.text);
        let offsets = line_offsets(lines.len(), f64::from(font_size));

        tracing::debug!(
            overlay = %overlay.id,
            x,
            y,
            font_size,
            scale,
            lines = lines.len(),
            font = %font.path.display(),
            align = ?style.text_align,
            "Overlay laid out"
        );

        lines
            .into_iter()
            .zip(offsets)
            .map(|(line, offset)| DrawTextLine {
                overlay_id: overlay.id.clone(),
                text: escape_drawtext(line),
                font_file: font.path.clone(),
                font_size,
                font_color: font_color.clone(),
                x,
                y: y as f64 + offset,
                background: background.clone(),
                start: remapped.start,
                end: remapped.end(),
            })
            .collect()
    }

    /// Draw instructions for every overlay, in input order.
    pub fn compose_all(&self, overlays: &[RemappedOverlay]) -> Vec<DrawTextLine> {
        overlays.iter().flat_map(|o| self.compose(o)).collect()
    }
}

/// Vertical offset of each line's centre from the block centre.
pub fn line_offsets(line_count: usize, font_size: f64) -> Vec<f64> {
    let line_height = LINE_HEIGHT_FACTOR * font_size;
    let block_height = line_count as f64 * line_height;
    (0..line_count)
        .map(|i| -block_height / 2.0 + line_height / 2.0 + i as f64 * line_height)
        .collect()
}

/// Non-empty lines after normalizing `\r\n` and `\r` to `\n`.
pub fn split_lines(text: &str) -> Vec<&str> {
    text.split(['\n', '\r'])
        .filter(|line| !line.trim().is_empty())
        .collect()
}

/// Escape text for a `drawtext` value inside a filter chain.
pub fn escape_drawtext(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => escaped.push_str("\\\\\\\\"),
            '\'' | ':' | '[' | ']' | '%' => {
                escaped.push_str("\\\\");
                escaped.push(c);
            }
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Join draw instructions into one `-vf` chain.
pub fn drawtext_chain(lines: &[DrawTextLine]) -> String {
    lines
        .iter()
        .map(DrawTextLine::to_filter)
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fonts::{FontSource, ResolvedFont};
    use splice_project_model::overlay::{FontWeight, TextOverlay, TextStyle};

    struct FixedFont;

    impl FontResolver for FixedFont {
        fn resolve(&self, family: &str, weight: FontWeight) -> ResolvedFont {
            ResolvedFont {
                path: PathBuf::from(format!("/fonts/{family}-{}.ttf", weight.as_str())),
                source: FontSource::Requested,
            }
        }
    }

    fn remapped(overlay: TextOverlay, start: f64, duration: f64) -> RemappedOverlay {
        RemappedOverlay {
            overlay,
            start,
            duration,
        }
    }

    fn compositor(fonts: &FixedFont) -> OverlayCompositor<'_> {
        OverlayCompositor::new(
            OutputFrame::new(1920, 1080),
            PreviewFrame::new(400, 225),
            fonts,
        )
    }

    #[test]
    fn test_position_and_scale() {
        let fonts = FixedFont;
        let overlay = TextOverlay::new("t", "Hello", 0.0, 2.0).at(25.0, 75.0);
        let lines = compositor(&fonts).compose(&remapped(overlay, 1.0, 2.0));
        assert_eq!(lines.len(), 1);
        let line = &lines[0];
        assert_eq!(line.x, 480);
        assert!((line.y - 810.0).abs() < 1e-9);
        // 32px at 1920/400 = 4.8x.
        assert_eq!(line.font_size, 153);
        assert_eq!(line.font_file, PathBuf::from("/fonts/Inter-normal.ttf"));
    }

    #[test]
    fn test_filter_text() {
        let fonts = FixedFont;
        let style = TextStyle {
            color: "rgba(255,255,255,0.5)".to_string(),
            background_color: Some("#000000".to_string()),
            background_padding: Some(10.0),
            opacity: 0.8,
            ..TextStyle::default()
        };
        let overlay = TextOverlay::new("t", "Hi", 0.0, 2.0).styled(style);
        let lines = compositor(&fonts).compose(&remapped(overlay, 1.5, 2.0));
        assert_eq!(
            lines[0].to_filter(),
            "drawtext=text='Hi':fontfile='/fonts/Inter-normal.ttf':fontsize=153:\
             fontcolor=0xFFFFFF@0.4:x=960-(tw/2):y=540-(th/2):\
             box=1:boxcolor=0x000000@0.8:boxborderw=48:\
             enable='gte(t,1.500)*lt(t,3.500)'"
        );
    }

    #[test]
    fn test_font_path_is_escaped() {
        let fonts = FixedFont;
        let style = TextStyle {
            font_family: "It's:Odd".to_string(),
            ..TextStyle::default()
        };
        let overlay = TextOverlay::new("t", "Hi", 0.0, 1.0).styled(style);
        let filter = compositor(&fonts).compose(&remapped(overlay, 0.0, 1.0))[0].to_filter();
        assert!(filter.contains(r"fontfile='/fonts/It\'s\:Odd-normal.ttf':fontsize="));
    }

    #[test]
    fn test_multiline_block_is_centered() {
        let fonts = FixedFont;
        let overlay = TextOverlay::new("t", "one\r\ntwo\rthree\n\nfour", 0.0, 1.0);
        let lines = compositor(&fonts).compose(&remapped(overlay, 0.0, 1.0));
        assert_eq!(lines.len(), 4);
        let mean: f64 = lines.iter().map(|l| l.y - 540.0).sum::<f64>() / lines.len() as f64;
        assert!(mean.abs() < 1e-6);
        assert!(lines[0].y < lines[1].y && lines[2].y < lines[3].y);
        let spacing = lines[1].y - lines[0].y;
        assert!((spacing - 1.2 * 153.0).abs() < 1e-9);
    }

    #[test]
    fn test_line_offsets_symmetric() {
        for n in 1..6 {
            let offsets = line_offsets(n, 40.0);
            let sum: f64 = offsets.iter().sum();
            assert!(sum.abs() < 1e-9);
            assert!((offsets[0] + offsets[n - 1]).abs() < 1e-9);
        }
        assert_eq!(line_offsets(1, 40.0), vec![0.0]);
    }

    #[test]
    fn test_alignment_does_not_move_anchor() {
        use splice_project_model::overlay::TextAlign;
        let fonts = FixedFont;
        let left = TextStyle {
            text_align: TextAlign::Left,
            ..TextStyle::default()
        };
        let a = compositor(&fonts).compose(&remapped(TextOverlay::new("a", "x", 0.0, 1.0), 0.0, 1.0));
        let b = compositor(&fonts).compose(&remapped(
            TextOverlay::new("a", "x", 0.0, 1.0).styled(left),
            0.0,
            1.0,
        ));
        assert_eq!(a[0].x, b[0].x);
        assert_eq!(a[0].y, b[0].y);
    }

    #[test]
    fn test_escape_drawtext() {
        assert_eq!(escape_drawtext("50% off: [now]"), "50\\\\% off\\\\: \\\\[now\\\\]");
        assert_eq!(escape_drawtext("it's"), "it\\\\'s");
        assert_eq!(escape_drawtext("a\\b"), "a\\\\\\\\b");
        assert_eq!(escape_drawtext("plain"), "plain");
    }

    #[test]
    fn test_empty_text_yields_no_lines() {
        let fonts = FixedFont;
        let lines = compositor(&fonts).compose(&remapped(TextOverlay::new("t", " \n\r\n", 0.0, 1.0), 0.0, 1.0));
        assert!(lines.is_empty());
    }

    #[test]
    fn test_chain_joins_with_commas() {
        let fonts = FixedFont;
        let c = compositor(&fonts);
        let lines = c.compose_all(&[
            remapped(TextOverlay::new("a", "A", 0.0, 1.0), 0.0, 1.0),
            remapped(TextOverlay::new("b", "B", 0.0, 1.0), 1.0, 1.0),
        ]);
        let chain = drawtext_chain(&lines);
        assert_eq!(chain.matches("drawtext=").count(), 2);
        assert!(chain.contains("1.000)',drawtext="));
    }
}
