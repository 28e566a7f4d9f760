//! Visual themes and their colour tokens

use std::fmt;
use std::str::FromStr;

/// The two colour schemes the site ships with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Theme {
    #[default]
    Purple,
    Yellow,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Purple => "purple",
            Theme::Yellow => "yellow",
        }
    }

    /// Parse a persisted value, `None` for anything that is not a known theme
    pub fn from_stored(value: Option<&str>) -> Option<Theme> {
        value.and_then(|v| v.parse().ok())
    }

    pub fn palette(&self) -> Palette {
        match self {
            Theme::Purple => Palette {
                primary: "#7c3aed",
                secondary: "#a78bfa",
                accent: "#c4b5fd",
                primary_dark: "#5b21b6",
                primary_light: "#ede9fe",
            },
            Theme::Yellow => Palette {
                primary: "#f59e0b",
                secondary: "#fbbf24",
                accent: "#fcd34d",
                primary_dark: "#d97706",
                primary_light: "#fef3c7",
            },
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown theme '{0}' (expected purple or yellow)")]
pub struct UnknownTheme(pub String);

impl FromStr for Theme {
    type Err = UnknownTheme;

    /// Stored values are exact; no trimming or case folding
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "purple" => Ok(Theme::Purple),
            "yellow" => Ok(Theme::Yellow),
            other => Err(UnknownTheme(other.to_string())),
        }
    }
}

/// Colour tokens applied to the visual layer, as `#rrggbb`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub primary: &'static str,
    pub secondary: &'static str,
    pub accent: &'static str,
    pub primary_dark: &'static str,
    pub primary_light: &'static str,
}

impl Palette {
    /// Tokens in the order they are written to the page
    pub fn tokens(&self) -> [(&'static str, &'static str); 5] {
        [
            ("--primary", self.primary),
            ("--secondary", self.secondary),
            ("--accent", self.accent),
            ("--primary-dark", self.primary_dark),
            ("--primary-light", self.primary_light),
        ]
    }
}

/// Split `#rrggbb` into its channels
pub fn hex_to_rgb(hex: &str) -> Option<(u8, u8, u8)> {
    let hex = hex.strip_prefix('#')?;
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some((r, g, b))
}
