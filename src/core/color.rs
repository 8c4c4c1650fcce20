use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::ChartError;

/// RGBA color, alpha in [0, 1]
///
/// Parsed from the CSS forms the indicator UI sends: `#rrggbb`,
/// `#rrggbbaa`, `rgb(r, g, b)` and `rgba(r, g, b, a)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl Rgba {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Same color with alpha multiplied by `factor`
    pub fn with_alpha_factor(self, factor: f32) -> Self {
        Self {
            a: (self.a * factor).clamp(0.0, 1.0),
            ..self
        }
    }
}

impl FromStr for Rgba {
    type Err = ChartError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || ChartError::validation_field("invalid color", "color", s);

        if let Some(hex) = s.strip_prefix('#') {
            let byte = |i: usize| {
                hex.get(i..i + 2)
                    .and_then(|h| u8::from_str_radix(h, 16).ok())
                    .ok_or_else(invalid)
            };
            return match hex.len() {
                6 => Ok(Self::rgb(byte(0)?, byte(2)?, byte(4)?)),
                8 => Ok(Self::rgba(byte(0)?, byte(2)?, byte(4)?, byte(6)? as f32 / 255.0)),
                _ => Err(invalid()),
            };
        }

        let body = s
            .strip_prefix("rgba(")
            .or_else(|| s.strip_prefix("rgb("))
            .and_then(|rest| rest.strip_suffix(')'))
            .ok_or_else(invalid)?;
        let parts: Vec<&str> = body.split(',').map(str::trim).collect();
        let channel = |p: &str| p.parse::<u8>().map_err(|_| invalid());
        match parts.as_slice() {
            [r, g, b] => Ok(Self::rgb(channel(r)?, channel(g)?, channel(b)?)),
            [r, g, b, a] => {
                let alpha = a.parse::<f32>().map_err(|_| invalid())?;
                Ok(Self::rgba(channel(r)?, channel(g)?, channel(b)?, alpha.clamp(0.0, 1.0)))
            }
            _ => Err(invalid()),
        }
    }
}

impl TryFrom<String> for Rgba {
    type Error = ChartError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Rgba> for String {
    fn from(color: Rgba) -> Self {
        color.to_string()
    }
}

impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.a >= 1.0 {
            write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            write!(f, "rgba({}, {}, {}, {})", self.r, self.g, self.b, self.a)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex() {
        assert_eq!("#26a69a".parse::<Rgba>().unwrap(), Rgba::rgb(0x26, 0xa6, 0x9a));
        let c: Rgba = "#ff000080".parse().unwrap();
        assert_eq!((c.r, c.g, c.b), (255, 0, 0));
        assert!((c.a - 128.0 / 255.0).abs() < 1e-6);
    }

    #[test]
    fn test_parse_css_functions() {
        assert_eq!(
            "rgba(41, 98, 255, 0.7)".parse::<Rgba>().unwrap(),
            Rgba::rgba(41, 98, 255, 0.7)
        );
        assert_eq!("rgb(1,2,3)".parse::<Rgba>().unwrap(), Rgba::rgb(1, 2, 3));
        assert!("hsl(1,2,3)".parse::<Rgba>().is_err());
        assert!("#12".parse::<Rgba>().is_err());
    }

    #[test]
    fn test_display_round_trip_form() {
        assert_eq!(Rgba::rgb(255, 235, 59).to_string(), "#ffeb3b");
        assert_eq!(Rgba::rgba(1, 2, 3, 0.5).to_string(), "rgba(1, 2, 3, 0.5)");
    }
}
