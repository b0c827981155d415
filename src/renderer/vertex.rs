//! Instance and vertex types for 2D rendering

use bytemuck::{Pod, Zeroable};

use crate::consts::FALLBACK_COLOR;

/// One glowing disc: a particle or a trace point
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct ParticleInstance {
    pub position: [f32; 2],
    pub radius: f32,
    pub color: [f32; 4],
}

impl ParticleInstance {
    pub const fn new(x: f32, y: f32, radius: f32, color: [f32; 4]) -> Self {
        Self {
            position: [x, y],
            radius,
            color,
        }
    }
}

/// Line-list vertex, two per bond
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct LineVertex {
    pub position: [f32; 2],
    pub color: [f32; 4],
}

impl LineVertex {
    pub const fn new(x: f32, y: f32, color: [f32; 4]) -> Self {
        Self {
            position: [x, y],
            color,
        }
    }
}

/// Parse `#rgb` or `#rrggbb` into RGBA with the given alpha
pub fn parse_hex_color(hex: &str, alpha: f32) -> Option<[f32; 4]> {
    let digits = hex.strip_prefix('#')?;
    if !digits.is_ascii() {
        return None;
    }
    let channel = |s: &str| u8::from_str_radix(s, 16).ok().map(|v| v as f32 / 255.0);
    let (r, g, b) = match digits.len() {
        3 => {
            let expand = |i: usize| {
                let c = &digits[i..i + 1];
                channel(&format!("{c}{c}"))
            };
            (expand(0)?, expand(1)?, expand(2)?)
        }
        6 => (
            channel(&digits[0..2])?,
            channel(&digits[2..4])?,
            channel(&digits[4..6])?,
        ),
        _ => return None,
    };
    Some([r, g, b, alpha.clamp(0.0, 1.0)])
}

/// Parse a color, substituting the fallback cyan when it is malformed
pub fn color_or_fallback(hex: &str, alpha: f32) -> [f32; 4] {
    parse_hex_color(hex, alpha)
        .or_else(|| parse_hex_color(FALLBACK_COLOR, alpha))
        .unwrap_or(colors::FALLBACK)
}

/// Fixed colors for canvas elements
pub mod colors {
    pub const BACKGROUND: [f32; 4] = [0.0, 0.0, 0.0, 1.0];
    pub const FALLBACK: [f32; 4] = [0.024, 0.714, 0.831, 1.0];
    pub const ENTROPY_BAR: [f32; 4] = [1.0, 1.0, 1.0, 0.3];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_long_and_short() {
        assert_eq!(parse_hex_color("#ff0000", 1.0), Some([1.0, 0.0, 0.0, 1.0]));
        assert_eq!(parse_hex_color("#fff", 0.5), Some([1.0, 1.0, 1.0, 0.5]));
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert_eq!(parse_hex_color("red", 1.0), None);
        assert_eq!(parse_hex_color("#12345", 1.0), None);
        assert_eq!(parse_hex_color("#gggggg", 1.0), None);
        assert_eq!(parse_hex_color("#ééé", 1.0), None);
    }

    #[test]
    fn test_fallback_is_cyan() {
        let c = color_or_fallback("not a color", 1.0);
        assert_eq!(Some(c), parse_hex_color(FALLBACK_COLOR, 1.0));
        assert!(c[2] > c[0]);
    }

    #[test]
    fn test_alpha_clamped() {
        assert_eq!(parse_hex_color("#000000", 2.0).map(|c| c[3]), Some(1.0));
    }
}
