use flowmap_core::{GraphModel, NodeIndex};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// `#rrggbb`, or `#rrggbbaa` when not fully opaque.
    pub fn to_hex(&self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }

    pub fn darken(&self, factor: f32) -> Self {
        Self {
            r: ((self.r as f32) * (1.0 - factor)) as u8,
            g: ((self.g as f32) * (1.0 - factor)) as u8,
            b: ((self.b as f32) * (1.0 - factor)) as u8,
            a: self.a,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Color {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s
            .strip_prefix('#')
            .ok_or_else(|| format!("color `{s}` must start with '#'"))?;
        let channel = |i: usize| {
            hex.get(i..i + 2)
                .and_then(|c| u8::from_str_radix(c, 16).ok())
                .ok_or_else(|| format!("invalid color `{s}`"))
        };
        match hex.len() {
            6 => Ok(Self::rgb(channel(0)?, channel(2)?, channel(4)?)),
            8 => Ok(Self::rgba(channel(0)?, channel(2)?, channel(4)?, channel(6)?)),
            _ => Err(format!("invalid color `{s}`")),
        }
    }
}

// Hex strings on the wire, the form renderers consume directly.
impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// d3 `schemeCategory10`.
pub const CATEGORY10: [Color; 10] = [
    Color::rgb(0x1f, 0x77, 0xb4),
    Color::rgb(0xff, 0x7f, 0x0e),
    Color::rgb(0x2c, 0xa0, 0x2c),
    Color::rgb(0xd6, 0x27, 0x28),
    Color::rgb(0x94, 0x67, 0xbd),
    Color::rgb(0x8c, 0x56, 0x4b),
    Color::rgb(0xe3, 0x77, 0xc2),
    Color::rgb(0x7f, 0x7f, 0x7f),
    Color::rgb(0xbc, 0xbd, 0x22),
    Color::rgb(0x17, 0xbe, 0xcf),
];

pub const LABEL_TEXT_COLOR: Color = Color::rgb(255, 255, 255);
pub const LABEL_BACKGROUND_COLOR: Color = Color::rgb(0x41, 0x4b, 0x61);
pub const LABEL_FONT_FAMILY: &str = "Helvetica Neue";
pub const LABEL_FONT_SIZE: f64 = 10.0;
pub const LABEL_BACKGROUND_PADDING: f64 = 3.0;

/// Opacity applied to the whole link layer, on top of per-link visibility.
pub const LINK_STROKE_OPACITY: f64 = 0.5;

/// Ordinal color scale: each category gets the next palette color the
/// first time it is seen, wrapping around when the palette runs out.
#[derive(Debug, Clone)]
pub struct CategoryPalette {
    colors: Vec<Color>,
    assigned: HashMap<String, Color>,
}

impl Default for CategoryPalette {
    fn default() -> Self {
        Self::new(CATEGORY10.to_vec())
    }
}

impl CategoryPalette {
    pub fn new(colors: Vec<Color>) -> Self {
        let colors = if colors.is_empty() {
            CATEGORY10.to_vec()
        } else {
            colors
        };
        Self {
            colors,
            assigned: HashMap::new(),
        }
    }

    /// Palette with every node category of `model` assigned in node order.
    pub fn for_model(model: &GraphModel) -> Self {
        let mut palette = Self::default();
        for node in model.nodes() {
            palette.color(node.category());
        }
        palette
    }

    pub fn color(&mut self, category: &str) -> Color {
        if let Some(color) = self.assigned.get(category) {
            return *color;
        }
        let color = self.colors[self.assigned.len() % self.colors.len()];
        self.assigned.insert(category.to_string(), color);
        color
    }

    /// Color of an already assigned category.
    pub fn get(&self, category: &str) -> Option<Color> {
        self.assigned.get(category).copied()
    }

    pub fn node_color(&self, model: &GraphModel, node: NodeIndex) -> Color {
        self.get(model[node].category())
            .unwrap_or(self.colors[0])
    }
}
