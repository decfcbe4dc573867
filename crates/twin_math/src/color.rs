//! Hex color parsing for twin-model material and light colors.

use glam::Vec3;

/// Fallback color for missing or malformed color strings.
pub const NEUTRAL_GRAY: Vec3 = Vec3::new(0.5, 0.5, 0.5);

/// Parse a `#RRGGBB` (or bare `RRGGBB`) string into a normalized RGB triple.
///
/// Hex digits are case-insensitive. Anything other than exactly six hex
/// digits after the optional `#` returns `None`.
pub fn parse_hex_color(hex: &str) -> Option<Vec3> {
    let digits = hex.strip_prefix('#').unwrap_or(hex);
    if digits.len() != 6 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }

    let channel = |range: std::ops::Range<usize>| -> Option<f32> {
        u8::from_str_radix(&digits[range], 16)
            .ok()
            .map(|v| f32::from(v) / 255.0)
    };

    Some(Vec3::new(channel(0..2)?, channel(2..4)?, channel(4..6)?))
}
