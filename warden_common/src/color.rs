use serde::{Deserialize, Serialize};

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Color {
    Rgb(u8, u8, u8),
    Integer(u32),
}

impl Color {
    pub const WHITE: Color = Color::Rgb(255, 255, 255);
    pub const GRAY: Color = Color::Rgb(101, 101, 102);
    pub const BLACK: Color = Color::Rgb(1, 1, 1);

    pub const BLUE: Color = Color::Rgb(108, 139, 235);
    pub const BLURPLE: Color = Color::Rgb(131, 118, 204);

    pub const RED: Color = Color::Rgb(240, 41, 60);
    pub const DARK_RED: Color = Color::Rgb(148, 27, 38);

    pub const GREEN: Color = Color::Rgb(56, 242, 102);
    pub const DARK_GREEN: Color = Color::Rgb(24, 161, 58);

    pub const YELLOW: Color = Color::Rgb(245, 207, 37);
    pub const ORANGE: Color = Color::Rgb(242, 113, 31);

    pub fn to_u32(&self) -> u32 {
        match self {
            Self::Rgb(r, g, b) => ((*r as u32) << 16u32) + ((*g as u32) << 8u32) + (*b as u32),
            Self::Integer(int) => *int,
        }
    }

    pub fn from_hexcode(hex: &str) -> anyhow::Result<Self> {
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        anyhow::ensure!(hex.len() == 6, "expected a 6-digit hex color code");

        let r = u8::from_str_radix(&hex[0..2], 16)?;
        let g = u8::from_str_radix(&hex[2..4], 16)?;
        let b = u8::from_str_radix(&hex[4..6], 16)?;
        Ok(Self::Rgb(r, g, b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_rgb_to_u32() {
        assert_eq!(Color::Rgb(0xF0, 0x29, 0x3C).to_u32(), 0xF0293C);
        assert_eq!(Color::Integer(0xABCDEF).to_u32(), 0xABCDEF);
    }

    #[test]
    fn parses_hexcodes() {
        assert_eq!(Color::from_hexcode("#f0293c").unwrap(), Color::Rgb(0xF0, 0x29, 0x3C));
        assert!(Color::from_hexcode("#f029").is_err());
    }
}
