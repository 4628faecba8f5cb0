//! Multi-line text painting with baseline-accurate spacing.

use anyhow::Result;
use std::ops::{Deref, DerefMut};

use super::measure::MeasurementProvider;
use super::metrics::{corrected_metrics, text_height};
use crate::models::{FontKey, HorizontalAlign, LineSet, Rgba, TextBaseline, VerticalBaseline};

/// The subset of surface state the line renderer touches.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceState {
    pub font: FontKey,
    pub fill: Rgba,
    pub align: HorizontalAlign,
    pub baseline: TextBaseline,
}

/// A canvas-like target: stateful font/fill/alignment plus `fill_text`.
pub trait DrawingSurface: MeasurementProvider {
    fn fill_color(&self) -> Rgba;
    fn set_fill_color(&mut self, color: Rgba);

    fn text_align(&self) -> HorizontalAlign;
    fn set_text_align(&mut self, align: HorizontalAlign);

    fn text_baseline(&self) -> TextBaseline;
    fn set_text_baseline(&mut self, baseline: TextBaseline);

    /// Paint one line anchored at (x, y) per the current align and baseline.
    fn fill_text(&mut self, text: &str, x: f32, y: f32) -> Result<()>;

    fn state(&self) -> SurfaceState {
        SurfaceState {
            font: self.active_font(),
            fill: self.fill_color(),
            align: self.text_align(),
            baseline: self.text_baseline(),
        }
    }

    fn restore(&mut self, state: &SurfaceState) {
        self.set_active_font(&state.font);
        self.set_fill_color(state.fill);
        self.set_text_align(state.align);
        self.set_text_baseline(state.baseline);
    }
}

/// Saves the surface state on creation and restores it on drop, whichever
/// way the borrowing code exits.
pub struct SurfaceGuard<'a, S: DrawingSurface + ?Sized> {
    surface: &'a mut S,
    saved: SurfaceState,
}

impl<'a, S: DrawingSurface + ?Sized> SurfaceGuard<'a, S> {
    pub fn new(surface: &'a mut S) -> Self {
        let saved = surface.state();
        Self { surface, saved }
    }
}

impl<S: DrawingSurface + ?Sized> Deref for SurfaceGuard<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        self.surface
    }
}

impl<S: DrawingSurface + ?Sized> DerefMut for SurfaceGuard<'_, S> {
    fn deref_mut(&mut self) -> &mut S {
        self.surface
    }
}

impl<S: DrawingSurface + ?Sized> Drop for SurfaceGuard<'_, S> {
    fn drop(&mut self) {
        self.surface.restore(&self.saved);
    }
}

/// How and where a line set is painted.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawStyle {
    pub font: FontKey,
    pub color: Rgba,
    pub x: f32,
    pub y: f32,
    pub line_height: f32,
    pub align: HorizontalAlign,
    pub baseline: VerticalBaseline,
}

impl DrawStyle {
    /// Line height 1.5, start-aligned, top baseline.
    pub fn new(font: FontKey, color: Rgba, x: f32, y: f32) -> Self {
        Self {
            font,
            color,
            x,
            y,
            line_height: 1.5,
            align: HorizontalAlign::Start,
            baseline: VerticalBaseline::Top,
        }
    }

    pub fn line_height(mut self, line_height: f32) -> Self {
        self.line_height = line_height;
        self
    }

    pub fn align(mut self, align: HorizontalAlign) -> Self {
        self.align = align;
        self
    }

    pub fn baseline(mut self, baseline: VerticalBaseline) -> Self {
        self.baseline = baseline;
        self
    }
}

/// Paint every line of `lines`, paragraph-major.
///
/// Between consecutive lines the cursor advances by the corrected descent
/// after a line and the corrected ascent before the next, both scaled by the
/// line height. `Center` shifts the block up by half its height and draws
/// top-relative. The surface state is restored before returning.
pub fn draw_lines<S: DrawingSurface + ?Sized>(
    surface: &mut S,
    lines: &LineSet,
    style: &DrawStyle,
) -> Result<()> {
    let flat = lines.flatten();
    if flat.is_empty() {
        return Ok(());
    }

    let mut s = SurfaceGuard::new(surface);
    s.set_active_font(&style.font);
    s.set_fill_color(style.color);
    s.set_text_align(style.align);
    s.set_text_baseline(style.baseline.into());

    let metrics = corrected_metrics(&mut *s, &style.font);
    let mut y = style.y;
    if style.baseline == VerticalBaseline::Center {
        y -= text_height(flat.len(), &metrics, style.line_height) / 2.0;
    }

    for (i, line) in flat.iter().enumerate() {
        if i != 0 {
            y += metrics.ascent * style.line_height;
        }
        s.fill_text(line, style.x, y)?;
        y += metrics.descent * style.line_height;
    }
    Ok(())
}
