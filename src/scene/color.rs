//! RGB colours as used by materials, lights and the parameter panel.
//!
//! Hex values are taken as-is (no sRGB decoding); the surface format does
//! the output encoding.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("`{0}` is not a colour (expected #rrggbb, #rgb or a colour name)")]
pub struct ParseColorError(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

const NAMED: &[(&str, u32)] = &[
    ("black", 0x000000),
    ("white", 0xffffff),
    ("grey", 0x808080),
    ("gray", 0x808080),
    ("green", 0x008000),
    ("purple", 0x800080),
    ("red", 0xff0000),
    ("blue", 0x0000ff),
];

impl Color {
    pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    pub fn from_hex(hex: u32) -> Self {
        let [_, r, g, b] = hex.to_be_bytes();
        Self::from_rgb8([r, g, b])
    }

    pub fn from_rgb8([r, g, b]: [u8; 3]) -> Self {
        Self::rgb(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0)
    }

    pub fn to_rgb8(self) -> [u8; 3] {
        let q = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        [q(self.r), q(self.g), q(self.b)]
    }

    pub fn to_hex(self) -> u32 {
        let [r, g, b] = self.to_rgb8();
        u32::from_be_bytes([0, r, g, b])
    }

    /// `#rrggbb`, the form the colour pickers display.
    pub fn to_hex_string(self) -> String {
        format!("#{:06x}", self.to_hex())
    }

    /// Accepts `#rrggbb`, `#rgb`, `0xrrggbb` and a handful of CSS colour names.
    pub fn parse(value: &str) -> Result<Self, ParseColorError> {
        let value = value.trim();
        let err = || ParseColorError(value.to_string());
        if let Some((_, hex)) = NAMED.iter().find(|(name, _)| name.eq_ignore_ascii_case(value)) {
            return Ok(Self::from_hex(*hex));
        }
        let digits = value
            .strip_prefix('#')
            .or_else(|| value.strip_prefix("0x"))
            .ok_or_else(err)?;
        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(err());
        }
        match digits.len() {
            6 => u32::from_str_radix(digits, 16).map(Self::from_hex).map_err(|_| err()),
            3 => {
                let expanded: String = digits.chars().flat_map(|c| [c, c]).collect();
                u32::from_str_radix(&expanded, 16).map(Self::from_hex).map_err(|_| err())
            }
            _ => Err(err()),
        }
    }

    /// Colour multiplied by an intensity, as a padded uniform vector.
    pub fn scaled(self, intensity: f32) -> [f32; 4] {
        [self.r * intensity, self.g * intensity, self.b * intensity, 1.0]
    }

    pub fn to_array(self) -> [f32; 4] {
        self.scaled(1.0)
    }

    /// The colour as a linear clear value.
    pub fn to_wgpu(self) -> wgpu::Color {
        wgpu::Color {
            r: self.r as f64,
            g: self.g as f64,
            b: self.b as f64,
            a: 1.0,
        }
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex_string())
    }
}

impl TryFrom<String> for Color {
    type Error = ParseColorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_hex_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_string_round_trips_panel_values() {
        let ambient = Color::from_hex(0x67167e);
        assert_eq!(ambient.to_hex_string(), "#67167e");
        assert_eq!(Color::parse("#9A36A1").map(Color::to_hex), Ok(0x9a36a1));
    }

    #[test]
    fn parses_names_and_short_form() {
        assert_eq!(Color::parse("grey").map(Color::to_hex), Ok(0x808080));
        assert_eq!(Color::parse("Purple").map(Color::to_hex), Ok(0x800080));
        assert_eq!(Color::parse("#fff"), Ok(Color::WHITE));
        assert_eq!(Color::parse("0x4076ac").map(Color::to_hex), Ok(0x4076ac));
    }

    #[test]
    fn rejects_garbage() {
        assert!(Color::parse("#12345").is_err());
        assert!(Color::parse("#gggggg").is_err());
        assert!(Color::parse("chartreuse-ish").is_err());
        assert!(Color::parse("").is_err());
    }

    #[test]
    fn scaled_multiplies_channels() {
        let [r, g, b, a] = Color::WHITE.scaled(0.25);
        assert_eq!([r, g, b, a], [0.25, 0.25, 0.25, 1.0]);
    }
}
