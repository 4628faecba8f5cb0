//! Greedy, single-pass word wrap with hyphenation fallback.
//!
//! Input is split into paragraphs on `\n` and into words on single spaces
//! (so runs of spaces survive as empty words). Each word is appended char by
//! char while `line + word + hyphen` stays under the budget. When the next
//! char would overflow:
//!
//! - a short word (narrower than `short_word_ratio * max_width`) on a
//!   non-empty line moves whole to the next line;
//! - a longer word is split: the fitting head gets a trailing `-` and the tail
//!   is re-queued at the same position;
//! - on an empty line the first char is always taken, so even a glyph wider
//!   than the budget makes progress.
//!
//! This is not an optimal-fit (Knuth-Plass) breaker and never backtracks.

use super::cache::CharWidths;
use super::measure::{FontGuard, MeasurementProvider};
use crate::models::{FontKey, LineSet};

pub const HYPHEN: char = '-';

/// Break policy knobs.
#[derive(Debug, Clone, PartialEq)]
pub struct WrapOptions {
    /// Words narrower than this fraction of the width are never hyphenated
    /// when they collide with the tail of a line.
    pub short_word_ratio: f32,
    /// When false, words only break at spaces; a word wider than the whole
    /// budget overflows on a line of its own.
    pub hyphenate: bool,
    /// Keep widths measured on a cache miss.
    pub update_cache: bool,
}

impl Default for WrapOptions {
    fn default() -> Self {
        Self {
            short_word_ratio: 1.0 / 3.0,
            hyphenate: true,
            update_cache: true,
        }
    }
}

/// Wrap `text` to `max_width` using `font`.
///
/// `widths` should be the cache entry for `font`; misses are measured through
/// `provider`, whose active font is switched for the call and restored.
pub fn wrap<P: MeasurementProvider + ?Sized>(
    text: &str,
    font: &FontKey,
    max_width: f32,
    provider: &mut P,
    widths: &CharWidths,
    options: &WrapOptions,
) -> LineSet {
    if text.is_empty() {
        return LineSet::default();
    }
    let guard = FontGuard::new(provider, font);
    let wrapper = Wrapper {
        provider: &*guard,
        widths,
        options,
        max_width,
        space: widths.char_width(&*guard, ' ', options.update_cache),
        hyphen: widths.char_width(&*guard, HYPHEN, options.update_cache),
    };
    let paragraphs = text
        .split('\n')
        .map(|p| wrapper.paragraph(p.strip_suffix('\r').unwrap_or(p)))
        .collect();
    LineSet::new(paragraphs)
}

struct Wrapper<'a, P: ?Sized> {
    provider: &'a P,
    widths: &'a CharWidths,
    options: &'a WrapOptions,
    max_width: f32,
    space: f32,
    hyphen: f32,
}

/// Words of the line being built. `width` counts a space after every word.
#[derive(Default)]
struct Line {
    words: Vec<String>,
    width: f32,
}

impl Line {
    fn push(&mut self, word: String, width: f32, space: f32) {
        self.words.push(word);
        self.width += width + space;
    }

    fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    fn finish(&mut self) -> String {
        self.width = 0.0;
        std::mem::take(&mut self.words).join(" ")
    }
}

/// One measured char of a word. `rest` is the width from here to the word end.
#[derive(Clone, Copy)]
struct Glyph {
    offset: usize,
    width: f32,
    rest: f32,
}

enum Placement {
    /// The whole word went onto the current line.
    Fits,
    /// Nothing placed; retry on a fresh line.
    Defer,
    /// Glyph count of the placed head; the carried tail starts after it.
    Split(usize),
}

impl<P: MeasurementProvider + ?Sized> Wrapper<'_, P> {
    fn char_width(&self, ch: char) -> f32 {
        self.widths
            .char_width(self.provider, ch, self.options.update_cache)
    }

    /// Widths of every char of `word`, measured once per word.
    fn measure_word(&self, word: &str) -> Vec<Glyph> {
        let mut glyphs: Vec<Glyph> = word
            .char_indices()
            .map(|(offset, ch)| Glyph {
                offset,
                width: self.char_width(ch),
                rest: 0.0,
            })
            .collect();
        let mut rest = 0.0;
        for g in glyphs.iter_mut().rev() {
            rest += g.width;
            g.rest = rest;
        }
        glyphs
    }

    fn paragraph(&self, paragraph: &str) -> Vec<String> {
        let mut lines = Vec::new();
        let mut line = Line::default();
        for word in paragraph.split(' ') {
            let glyphs = self.measure_word(word);
            let mut start = 0;
            loop {
                match self.place(word, &glyphs[start..], &mut line) {
                    Placement::Fits => break,
                    Placement::Defer => lines.push(line.finish()),
                    Placement::Split(taken) => {
                        lines.push(line.finish());
                        start += taken;
                    }
                }
            }
        }
        lines.push(line.finish());
        lines
    }

    /// Place the tail of `word` described by `glyphs` onto `line`.
    fn place(&self, word: &str, glyphs: &[Glyph], line: &mut Line) -> Placement {
        let base = glyphs.first().map_or(word.len(), |g| g.offset);
        let total = glyphs.first().map_or(0.0, |g| g.rest);
        let short = total < self.max_width * self.options.short_word_ratio;

        let mut taken = 0.0;
        for (k, g) in glyphs.iter().enumerate() {
            if line.width + taken + g.width + self.hyphen >= self.max_width {
                if !line.is_empty() && (k == 0 || short || !self.options.hyphenate) {
                    return Placement::Defer;
                }
                if line.is_empty() && (k == 0 || !self.options.hyphenate) {
                    // overflow rather than stall
                    taken += g.width;
                    continue;
                }
                let mut head = word[base..g.offset].to_string();
                let mut head_width = taken;
                if line.width + taken + self.hyphen <= self.max_width {
                    head.push(HYPHEN);
                    head_width += self.hyphen;
                }
                line.push(head, head_width, self.space);
                return Placement::Split(k);
            }
            taken += g.width;
        }
        line.push(word[base..].to_string(), taken, self.space);
        Placement::Fits
    }
}
