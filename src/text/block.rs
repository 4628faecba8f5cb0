//! One-call pipeline for a single block: wrap, cut to height, measure.

use serde::Serialize;

use super::cache::WidthCache;
use super::measure::MeasurementProvider;
use super::metrics::{corrected_metrics, text_height};
use super::render::DrawStyle;
use super::truncate::truncate_lines;
use super::wrap::{WrapOptions, wrap};
use crate::models::{FontKey, LayoutConfig, LineSet, Rgba};

/// A laid-out block ready to paint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextBlock {
    pub font: FontKey,
    pub lines: LineSet,
    pub height: f32,
    /// Lines were dropped to respect `max_height`.
    pub truncated: bool,
}

/// Wrap `text` per `config`, then truncate it to `config.max_height`.
pub fn layout_block<P: MeasurementProvider + ?Sized>(
    provider: &mut P,
    cache: &WidthCache,
    text: &str,
    config: &LayoutConfig,
    options: &WrapOptions,
) -> TextBlock {
    let font = config.font();
    let widths = cache.get_or_build(provider, &font);
    let wrapped = wrap(text, &font, config.max_width, provider, &widths, options);

    let metrics = corrected_metrics(provider, &font);
    let lines = truncate_lines(
        &wrapped,
        &metrics,
        config.line_height,
        config.max_height,
        config.ellipsis.as_deref(),
    );
    let truncated = lines.line_count() < wrapped.line_count();
    TextBlock {
        height: text_height(lines.line_count(), &metrics, config.line_height),
        font,
        lines,
        truncated,
    }
}

impl LayoutConfig {
    /// Paint settings matching this configuration.
    pub fn draw_style(&self, color: Rgba, x: f32, y: f32) -> DrawStyle {
        DrawStyle::new(self.font(), color, x, y)
            .line_height(self.line_height)
            .align(self.horizontal_align)
            .baseline(self.vertical_baseline)
    }
}
