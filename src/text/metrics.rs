//! Font-metric correction and the line-height arithmetic built on it.

use log::warn;

use super::measure::{FontGuard, MeasurementProvider};
use crate::models::FontKey;

/// Reference glyph for vertical metrics.
pub const REFERENCE_GLYPH: &str = "M";

/// Tolerance applied before flooring a line count.
const LINE_EPSILON: f32 = 1e-4;

/// Ascent/descent rescaled so that `ascent + descent == size`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CorrectedMetrics {
    pub ascent: f32,
    pub descent: f32,
    /// Factor applied to the raw values.
    pub multiplier: f32,
}

impl CorrectedMetrics {
    /// Normalize raw provider metrics to `size`.
    ///
    /// A non-positive or non-finite raw sum (typically an unresolved font)
    /// falls back to an 80/20 split of `size`.
    pub fn from_raw(raw_ascent: f32, raw_descent: f32, size: f32) -> Self {
        let raw = raw_ascent + raw_descent;
        if !(raw.is_finite() && raw > 0.0) {
            warn!("unusable font metrics (ascent {raw_ascent}, descent {raw_descent}); estimating");
            return Self {
                ascent: size * 0.8,
                descent: size * 0.2,
                multiplier: 1.0,
            };
        }
        let multiplier = size / raw;
        Self {
            ascent: raw_ascent * multiplier,
            descent: raw_descent * multiplier,
            multiplier,
        }
    }

    /// Height of one line at multiplier 1.
    pub fn em_height(&self) -> f32 {
        self.ascent + self.descent
    }
}

/// Measure the reference glyph with `font` and correct the result.
pub fn corrected_metrics<P: MeasurementProvider + ?Sized>(
    provider: &mut P,
    font: &FontKey,
) -> CorrectedMetrics {
    let guard = FontGuard::new(provider, font);
    let m = guard.measure(REFERENCE_GLYPH);
    CorrectedMetrics::from_raw(m.ascent, m.descent, font.size())
}

/// Pixel height of `lines` uniform lines.
pub fn text_height(lines: usize, metrics: &CorrectedMetrics, line_height: f32) -> f32 {
    if line_height == 0.0 {
        return 0.0;
    }
    line_height * metrics.em_height() * lines as f32
}

/// [`text_height`] with the metrics measured on the spot.
pub fn measure_text_height<P: MeasurementProvider + ?Sized>(
    provider: &mut P,
    lines: usize,
    font: &FontKey,
    line_height: f32,
) -> f32 {
    if line_height == 0.0 {
        return 0.0;
    }
    text_height(lines, &corrected_metrics(provider, font), line_height)
}

/// Largest whole number of lines whose [`text_height`] fits `max_height`.
///
/// Zero-height lines always fit, so that case returns `usize::MAX`.
pub fn max_lines(max_height: f32, metrics: &CorrectedMetrics, line_height: f32) -> usize {
    let per_line = line_height * metrics.em_height();
    if !(per_line > 0.0) {
        return usize::MAX;
    }
    let lines = (max_height / per_line + LINE_EPSILON).floor();
    if lines.is_nan() || lines < 0.0 {
        0
    } else {
        // saturating cast
        lines as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::measure::EstimateProvider;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn correction_sums_to_size() {
        let m = CorrectedMetrics::from_raw(14.0, 6.0, 16.0);
        assert!(close(m.em_height(), 16.0));
        assert!(close(m.ascent, 11.2));
        assert!(close(m.descent, 4.8));
        assert!(close(m.multiplier, 0.8));
    }

    #[test]
    fn zero_metrics_fall_back() {
        let m = CorrectedMetrics::from_raw(0.0, 0.0, 10.0);
        assert!(close(m.ascent, 8.0));
        assert!(close(m.descent, 2.0));
        let m = CorrectedMetrics::from_raw(f32::NAN, 1.0, 10.0);
        assert!(close(m.em_height(), 10.0));
    }

    #[test]
    fn measured_metrics_use_requested_size() {
        let mut p = EstimateProvider::default();
        let m = corrected_metrics(&mut p, &FontKey::new("x", 30));
        assert!(close(m.ascent, 22.5));
        assert!(close(m.descent, 7.5));
        assert_eq!(p.active_font(), FontKey::new("sans-serif", 16));
    }

    #[test]
    fn height_is_zero_for_zero_lines_or_multiplier() {
        let m = CorrectedMetrics::from_raw(9.0, 3.0, 12.0);
        assert_eq!(text_height(0, &m, 1.5), 0.0);
        assert_eq!(text_height(7, &m, 0.0), 0.0);
        assert!(close(text_height(2, &m, 1.5), 36.0));
    }

    #[test]
    fn height_is_monotonic() {
        let m = CorrectedMetrics::from_raw(9.0, 3.0, 13.0);
        let mut prev = 0.0;
        for n in 0..50 {
            let h = text_height(n, &m, 1.25);
            assert!(h >= prev);
            prev = h;
        }
    }

    #[test]
    fn max_lines_inverts_height() {
        let m = CorrectedMetrics::from_raw(9.0, 3.0, 10.0);
        assert_eq!(max_lines(45.0, &m, 1.5), 3);
        assert_eq!(max_lines(44.9, &m, 1.5), 2);
        assert_eq!(max_lines(5.0, &m, 1.5), 0);
        assert_eq!(max_lines(-5.0, &m, 1.5), 0);
        assert_eq!(max_lines(5.0, &m, 0.0), usize::MAX);
        for n in 0..20 {
            assert!(max_lines(text_height(n, &m, 1.25), &m, 1.25) >= n);
        }
    }
}
