//! Colour parsing for overlay text and background boxes.
//!
//! Accepts `#RRGGBB`, `RRGGBB`, `rgb(r,g,b)` and `rgba(r,g,b,a)`. Anything
//! else renders as opaque black instead of failing the export.

use serde::Serialize;

/// A parsed colour with its alpha channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ParsedColor {
    /// `0xRRGGBB`.
    pub rgb: u32,
    /// Alpha in `[0, 1]`.
    pub alpha: f64,
}

impl ParsedColor {
    pub const BLACK: ParsedColor = ParsedColor {
        rgb: 0x000000,
        alpha: 1.0,
    };

    pub fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Self {
            rgb: (u32::from(r) << 16) | (u32::from(g) << 8) | u32::from(b),
            alpha: 1.0,
        }
    }

    /// Colour in ffmpeg's `0xRRGGBB` notation.
    pub fn to_ffmpeg(&self) -> String {
        format!("0x{:06X}", self.rgb)
    }

    /// ffmpeg `color@opacity` with the alpha folded into `opacity`.
    pub fn to_ffmpeg_with_opacity(&self, opacity: f64) -> String {
        format!("{}@{}", self.to_ffmpeg(), format_opacity(self.alpha * opacity))
    }
}

/// Parse a colour string, falling back to opaque black.
pub fn parse_color(input: &str) -> ParsedColor {
    match try_parse_color(input) {
        Some(color) => color,
        None => {
            tracing::warn!(color = input, "Unrecognized colour, using opaque black");
            ParsedColor::BLACK
        }
    }
}

fn try_parse_color(input: &str) -> Option<ParsedColor> {
    let color = input.trim();

    if let Some(inner) = strip_function(color, "rgba") {
        let parts = split_components(inner);
        if parts.len() != 4 {
            return None;
        }
        let alpha: f64 = parts[3].parse().ok()?;
        if !alpha.is_finite() {
            return None;
        }
        let mut parsed = ParsedColor::from_rgb(
            parse_channel(parts[0])?,
            parse_channel(parts[1])?,
            parse_channel(parts[2])?,
        );
        parsed.alpha = alpha.clamp(0.0, 1.0);
        return Some(parsed);
    }

    if let Some(inner) = strip_function(color, "rgb") {
        let parts = split_components(inner);
        if parts.len() != 3 {
            return None;
        }
        return Some(ParsedColor::from_rgb(
            parse_channel(parts[0])?,
            parse_channel(parts[1])?,
            parse_channel(parts[2])?,
        ));
    }

    let hex = color.strip_prefix('#').unwrap_or(color);
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let rgb = u32::from_str_radix(hex, 16).ok()?;
    Some(ParsedColor { rgb, alpha: 1.0 })
}

fn strip_function<'a>(color: &'a str, name: &str) -> Option<&'a str> {
    let rest = color.strip_prefix(name)?.trim_start();
    rest.strip_prefix('(')?.strip_suffix(')')
}

fn split_components(inner: &str) -> Vec<&str> {
    inner.split(',').map(str::trim).collect()
}

fn parse_channel(part: &str) -> Option<u8> {
    part.parse::<u8>().ok()
}

/// Opacity with at most three decimals and no trailing zeros.
pub fn format_opacity(opacity: f64) -> String {
    let clamped = if opacity.is_finite() {
        opacity.clamp(0.0, 1.0)
    } else {
        1.0
    };
    let text = format!("{clamped:.3}");
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text.is_empty() {
        "0".to_string()
    } else {
        text.to_string()
    }
}
