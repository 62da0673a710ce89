// Configuration loading

pub mod error;
pub mod settings;
pub mod theme;

pub use error::ConfigError;
pub use settings::{ModePreference, Settings};
pub use theme::ThemeRegistry;

/// Framework-agnostic RGBA color
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    /// Convert from hex u32 (0xRRGGBB)
    pub fn from_hex(hex: u32) -> Self {
        let r = ((hex >> 16) & 0xFF) as f32 / 255.0;
        let g = ((hex >> 8) & 0xFF) as f32 / 255.0;
        let b = (hex & 0xFF) as f32 / 255.0;
        Self { r, g, b, a: 1.0 }
    }

    /// Parse a resolved style value: `#rgb`, `#rrggbb` or `#rrggbbaa`.
    pub fn parse(value: &str) -> Option<Self> {
        let hex = value.trim().strip_prefix('#')?;
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        match hex.len() {
            3 => {
                let expanded: String = hex.chars().flat_map(|c| [c, c]).collect();
                u32::from_str_radix(&expanded, 16).ok().map(Self::from_hex)
            }
            6 => u32::from_str_radix(hex, 16).ok().map(Self::from_hex),
            8 => {
                let rgba = u32::from_str_radix(hex, 16).ok()?;
                let mut color = Self::from_hex(rgba >> 8);
                color.a = (rgba & 0xFF) as f32 / 255.0;
                Some(color)
            }
            _ => None,
        }
    }

    /// 8-bit RGB channels, alpha dropped.
    pub fn to_rgb8(self) -> (u8, u8, u8) {
        let channel = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        (channel(self.r), channel(self.g), channel(self.b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_forms() {
        assert_eq!(Color::parse("#3b82f6").unwrap().to_rgb8(), (0x3b, 0x82, 0xf6));
        assert_eq!(Color::parse("#fff").unwrap().to_rgb8(), (255, 255, 255));
        let translucent = Color::parse("#00000080").unwrap();
        assert!((translucent.a - 0.5).abs() < 0.01);
    }

    #[test]
    fn test_parse_rejects_non_hex() {
        assert!(Color::parse("red").is_none());
        assert!(Color::parse("#12345").is_none());
        assert!(Color::parse("#ggg").is_none());
    }
}
