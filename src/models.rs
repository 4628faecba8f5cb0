use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of one (family, pixel size) pair. Indexes the width cache and the
/// corrected metrics.
///
/// `family` may be a CSS-style fallback list (`"Noto Sans, DejaVu Sans"`);
/// the measurement provider decides how to resolve it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FontKey {
    pub family: String,
    pub size_px: u32,
}

impl FontKey {
    pub fn new(family: impl Into<String>, size_px: u32) -> Self {
        Self {
            family: family.into(),
            size_px,
        }
    }

    /// Same family at a different size.
    pub fn with_size(&self, size_px: u32) -> Self {
        Self {
            family: self.family.clone(),
            size_px,
        }
    }

    pub fn size(&self) -> f32 {
        self.size_px as f32
    }
}

impl fmt::Display for FontKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}px {}", self.size_px, self.family)
    }
}

/// Paragraphs of wrapped lines, in input order.
///
/// Flattening is paragraph-major, line-minor. Paragraph boundaries do not add
/// a blank line of their own.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineSet {
    pub paragraphs: Vec<Vec<String>>,
}

impl LineSet {
    pub fn new(paragraphs: Vec<Vec<String>>) -> Self {
        Self { paragraphs }
    }

    /// A line set holding exactly one line, e.g. an author name.
    pub fn single(line: impl Into<String>) -> Self {
        Self {
            paragraphs: vec![vec![line.into()]],
        }
    }

    pub fn paragraph_count(&self) -> usize {
        self.paragraphs.len()
    }

    pub fn line_count(&self) -> usize {
        self.paragraphs.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.line_count() == 0
    }

    /// Render order: every line of every paragraph.
    pub fn flatten(&self) -> Vec<&str> {
        self.paragraphs
            .iter()
            .flat_map(|p| p.iter().map(String::as_str))
            .collect()
    }

    /// Last line of the last non-empty paragraph.
    pub fn last_line_mut(&mut self) -> Option<&mut String> {
        self.paragraphs
            .iter_mut()
            .rev()
            .find(|p| !p.is_empty())
            .and_then(|p| p.last_mut())
    }
}

/// Horizontal alignment of each line relative to the anchor x.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HorizontalAlign {
    #[default]
    Start,
    Center,
    End,
}

/// Vertical anchoring accepted by the line renderer.
///
/// `Center` is synthetic: the block is shifted up by half its height and then
/// drawn top-relative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerticalBaseline {
    #[default]
    Top,
    Alphabetic,
    Center,
}

/// Baselines a drawing surface understands natively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextBaseline {
    #[default]
    Top,
    Alphabetic,
    Bottom,
}

impl From<VerticalBaseline> for TextBaseline {
    fn from(b: VerticalBaseline) -> Self {
        match b {
            VerticalBaseline::Top | VerticalBaseline::Center => TextBaseline::Top,
            VerticalBaseline::Alphabetic => TextBaseline::Alphabetic,
        }
    }
}

/// RGBA color representation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const BLACK: Rgba = Rgba::rgb(0, 0, 0);
    pub const WHITE: Rgba = Rgba::rgb(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    pub fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }

    /// Parse `#rgb`, `#rrggbb` or `#rrggbbaa` (leading `#` optional).
    pub fn from_hex(s: &str) -> Option<Self> {
        let hex = s.trim().trim_start_matches('#');
        if !hex.is_ascii() {
            return None;
        }
        let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        match hex.len() {
            3 => {
                let mut px = [0u8; 3];
                for (slot, c) in px.iter_mut().zip(hex.chars()) {
                    let v = c.to_digit(16)? as u8;
                    *slot = v * 17;
                }
                Some(Self::rgb(px[0], px[1], px[2]))
            }
            6 => Some(Self::rgb(byte(0)?, byte(2)?, byte(4)?)),
            8 => Some(Self::new(byte(0)?, byte(2)?, byte(4)?, byte(6)?)),
            _ => None,
        }
    }

    pub fn to_hex(&self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}

impl TryFrom<String> for Rgba {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Rgba::from_hex(&s).ok_or_else(|| format!("invalid color: {s:?}"))
    }
}

impl From<Rgba> for String {
    fn from(c: Rgba) -> Self {
        c.to_hex()
    }
}

/// Everything the engine consumes for one block of text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub font_family: String,
    pub font_size: u32,
    pub max_width: f32,
    pub max_height: f32,
    /// Multiple of the corrected em height; 0 collapses the block to zero height.
    pub line_height: f32,
    pub horizontal_align: HorizontalAlign,
    pub vertical_baseline: VerticalBaseline,
    pub ellipsis: Option<String>,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            font_family: "Noto Sans".into(),
            font_size: 16,
            max_width: 100.0,
            max_height: f32::MAX,
            line_height: 1.5,
            horizontal_align: HorizontalAlign::Start,
            vertical_baseline: VerticalBaseline::Top,
            ellipsis: None,
        }
    }
}

impl LayoutConfig {
    pub fn font(&self) -> FontKey {
        FontKey::new(self.font_family.clone(), self.font_size)
    }
}
