//! Per-font character advance cache.
//!
//! One [`CharWidths`] table per [`FontKey`], measured once for a fixed code
//! point range and extended on demand for glyphs outside it. Existing entries
//! are never overwritten: rendering is assumed deterministic for a fixed key.

use ahash::RandomState;
use log::debug;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use super::measure::{FontGuard, MeasurementProvider};
use crate::error::LayoutError;
use crate::models::FontKey;

/// Which code points are measured up front when a font is first seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CharRange {
    /// U+0001..U+007E. Practically instant.
    #[default]
    Ascii,
    /// U+0001..U+10FFFE, surrogates skipped. Orders of magnitude slower and
    /// heavier; prefer `Ascii` plus on-demand lookups.
    Unicode,
}

impl CharRange {
    fn end(self) -> u32 {
        match self {
            CharRange::Ascii => 0x7F,
            CharRange::Unicode => 0x10FFFF,
        }
    }

    /// NUL is skipped, some backends reject it.
    pub fn chars(self) -> impl Iterator<Item = char> {
        (1..self.end()).filter_map(char::from_u32)
    }
}

/// Advance widths for one font key.
#[derive(Debug, Default)]
pub struct CharWidths {
    widths: RwLock<HashMap<char, f32, RandomState>>,
}

impl CharWidths {
    /// Measure every char of `range` with `font` active.
    pub fn measure<P: MeasurementProvider + ?Sized>(
        provider: &mut P,
        font: &FontKey,
        range: CharRange,
    ) -> Self {
        let guard = FontGuard::new(provider, font);
        let mut buf = [0u8; 4];
        let widths: HashMap<char, f32, RandomState> = range
            .chars()
            .map(|ch| (ch, guard.measure(ch.encode_utf8(&mut buf)).width))
            .collect();
        Self {
            widths: RwLock::new(widths),
        }
    }

    pub fn get(&self, ch: char) -> Option<f32> {
        self.widths
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&ch)
            .copied()
    }

    /// Insert `width` unless `ch` is already present; returns the stored width.
    pub fn insert_missing(&self, ch: char, width: f32) -> f32 {
        *self
            .widths
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(ch)
            .or_insert(width)
    }

    /// Cached width of `ch`, measuring it with the provider's active font on a miss.
    /// With `update`, the measured width is kept for later calls.
    pub fn char_width<P: MeasurementProvider + ?Sized>(
        &self,
        provider: &P,
        ch: char,
        update: bool,
    ) -> f32 {
        if let Some(width) = self.get(ch) {
            return width;
        }
        let mut buf = [0u8; 4];
        let width = provider.measure(ch.encode_utf8(&mut buf)).width;
        if update {
            self.insert_missing(ch, width)
        } else {
            width
        }
    }

    /// Like [`char_width`](Self::char_width) for a string that must hold exactly one char.
    pub fn glyph_width<P: MeasurementProvider + ?Sized>(
        &self,
        provider: &P,
        glyph: &str,
        update: bool,
    ) -> Result<f32, LayoutError> {
        let mut chars = glyph.chars();
        match (chars.next(), chars.next()) {
            (Some(ch), None) => Ok(self.char_width(provider, ch, update)),
            _ => Err(LayoutError::NotASingleCharacter(glyph.to_string())),
        }
    }

    pub fn len(&self) -> usize {
        self.widths
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sorted copy of the table.
    pub fn snapshot(&self) -> Vec<(char, f32)> {
        let mut out: Vec<(char, f32)> = self
            .widths
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(c, w)| (*c, *w))
            .collect();
        out.sort_by_key(|(c, _)| *c);
        out
    }
}

/// Shared cache of [`CharWidths`] keyed by font.
///
/// Check-then-populate runs under one lock, so concurrent first lookups of
/// the same key measure once.
#[derive(Debug, Default)]
pub struct WidthCache {
    range: CharRange,
    fonts: Mutex<HashMap<FontKey, Arc<CharWidths>, RandomState>>,
}

impl WidthCache {
    pub fn new(range: CharRange) -> Self {
        Self {
            range,
            fonts: Mutex::new(HashMap::default()),
        }
    }

    pub fn get(&self, font: &FontKey) -> Option<Arc<CharWidths>> {
        self.fonts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(font)
            .cloned()
    }

    pub fn contains(&self, font: &FontKey) -> bool {
        self.get(font).is_some()
    }

    /// Number of fonts cached.
    pub fn len(&self) -> usize {
        self.fonts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Widths for `font`, measured through `provider` on first use.
    ///
    /// The provider's active font is switched for the measurement and
    /// restored afterwards.
    pub fn get_or_build<P: MeasurementProvider + ?Sized>(
        &self,
        provider: &mut P,
        font: &FontKey,
    ) -> Arc<CharWidths> {
        let mut fonts = self.fonts.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(widths) = fonts.get(font) {
            return Arc::clone(widths);
        }
        let widths = Arc::new(CharWidths::measure(provider, font, self.range));
        debug!("measured {} glyph widths for {}", widths.len(), font);
        fonts.insert(font.clone(), Arc::clone(&widths));
        widths
    }
}
