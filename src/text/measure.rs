//! Measurement provider seam and the scoped font switch.

use crate::models::FontKey;
use std::ops::{Deref, DerefMut};

/// Result of measuring a string with the active font.
///
/// `descent` is the positive distance below the baseline.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TextMeasure {
    pub width: f32,
    pub ascent: f32,
    pub descent: f32,
}

/// Anything that can report advance widths and vertical metrics for text
/// in a currently active font (a canvas, a rasterizer, an estimator).
///
/// Measuring the empty string returns zero width.
pub trait MeasurementProvider {
    fn active_font(&self) -> FontKey;

    fn set_active_font(&mut self, font: &FontKey);

    fn measure(&self, text: &str) -> TextMeasure;
}

/// Switches the provider to `font` and switches it back on drop.
pub struct FontGuard<'a, P: MeasurementProvider + ?Sized> {
    provider: &'a mut P,
    previous: Option<FontKey>,
}

impl<'a, P: MeasurementProvider + ?Sized> FontGuard<'a, P> {
    pub fn new(provider: &'a mut P, font: &FontKey) -> Self {
        let current = provider.active_font();
        let previous = if current == *font {
            None
        } else {
            provider.set_active_font(font);
            Some(current)
        };
        Self { provider, previous }
    }
}

impl<P: MeasurementProvider + ?Sized> Deref for FontGuard<'_, P> {
    type Target = P;

    fn deref(&self) -> &P {
        self.provider
    }
}

impl<P: MeasurementProvider + ?Sized> DerefMut for FontGuard<'_, P> {
    fn deref_mut(&mut self) -> &mut P {
        self.provider
    }
}

impl<P: MeasurementProvider + ?Sized> Drop for FontGuard<'_, P> {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            self.provider.set_active_font(&previous);
        }
    }
}

/// Heuristic provider: every char advances `size * advance_ratio`.
///
/// Useful for headless layout estimates and deterministic tests. The default
/// vertical ratios deliberately do not sum to 1 so the metrics corrector has
/// something to correct.
#[derive(Debug, Clone, PartialEq)]
pub struct EstimateProvider {
    font: FontKey,
    pub advance_ratio: f32,
    pub ascent_ratio: f32,
    pub descent_ratio: f32,
}

impl Default for EstimateProvider {
    fn default() -> Self {
        Self {
            font: FontKey::new("sans-serif", 16),
            advance_ratio: 0.60,
            ascent_ratio: 0.9,
            descent_ratio: 0.3,
        }
    }
}

impl EstimateProvider {
    pub fn new(advance_ratio: f32, ascent_ratio: f32, descent_ratio: f32) -> Self {
        Self {
            advance_ratio,
            ascent_ratio,
            descent_ratio,
            ..Self::default()
        }
    }

    /// Width of one char at the active size.
    pub fn advance(&self) -> f32 {
        self.font.size() * self.advance_ratio
    }
}

impl MeasurementProvider for EstimateProvider {
    fn active_font(&self) -> FontKey {
        self.font.clone()
    }

    fn set_active_font(&mut self, font: &FontKey) {
        self.font = font.clone();
    }

    fn measure(&self, text: &str) -> TextMeasure {
        let size = self.font.size();
        TextMeasure {
            width: text.chars().count() as f32 * self.advance(),
            ascent: size * self.ascent_ratio,
            descent: size * self.descent_ratio,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_restores_previous_font() {
        let mut p = EstimateProvider::default();
        let original = p.active_font();
        {
            let g = FontGuard::new(&mut p, &FontKey::new("Mono", 40));
            assert_eq!(g.active_font(), FontKey::new("Mono", 40));
            assert!((g.measure("ab").width - 48.0).abs() < 1e-4);
        }
        assert_eq!(p.active_font(), original);
    }

    #[test]
    fn empty_string_has_zero_width() {
        let p = EstimateProvider::default();
        assert_eq!(p.measure("").width, 0.0);
    }
}
