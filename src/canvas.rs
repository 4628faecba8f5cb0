//! In-memory RGB canvas: the concrete measurement provider and drawing surface.
//!
//! All coordinates and font sizes are logical; the pixel buffer is
//! `scale.x` times wider and `scale.y` times taller. Solid fills go through plotters'
//! bitmap backend, glyphs are rasterized with `ab_glyph` and alpha-blended
//! onto the buffer.

use ab_glyph::{Font, FontArc, PxScale, ScaleFont, point};
use anyhow::{Context, Result, anyhow};
use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbImage};
use plotters::backend::DrawingBackend;
use plotters::style::{Color, RGBAColor};
use plotters_bitmap::BitMapBackend;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

use crate::fonts::FontLibrary;
use crate::models::{FontKey, HorizontalAlign, Rgba, TextBaseline};
use crate::text::measure::{MeasurementProvider, TextMeasure};
use crate::text::render::DrawingSurface;

/// Axis-aligned rectangle in logical units.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Smaller rectangle with `dx`/`dy` removed from each side.
    pub fn inset(&self, dx: f32, dy: f32) -> Self {
        Self::new(
            self.x + dx,
            self.y + dy,
            (self.width - 2.0 * dx).max(0.0),
            (self.height - 2.0 * dy).max(0.0),
        )
    }
}

/// Device pixels per logical unit on each axis.
///
/// Deserializes from a bare number (uniform) or `{"x": .., "y": ..}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "ScaleRepr")]
pub struct Scale {
    pub x: f32,
    pub y: f32,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ScaleRepr {
    Uniform(f32),
    Axes { x: f32, y: f32 },
}

impl From<ScaleRepr> for Scale {
    fn from(repr: ScaleRepr) -> Self {
        match repr {
            ScaleRepr::Uniform(s) => Scale::uniform(s),
            ScaleRepr::Axes { x, y } => Scale::new(x, y),
        }
    }
}

impl Scale {
    pub const ONE: Scale = Scale::uniform(1.0);

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub const fn uniform(s: f32) -> Self {
        Self { x: s, y: s }
    }

    /// Non-positive or non-finite axes become 1.
    pub fn sanitized(self) -> Self {
        let fix = |s: f32| if s.is_finite() && s > 0.0 { s } else { 1.0 };
        Self::new(fix(self.x), fix(self.y))
    }
}

impl Default for Scale {
    fn default() -> Self {
        Self::ONE
    }
}

/// Scale factor for a CSS-style pixel size: one em equals `size` pixels.
fn px_scale(font: &FontArc, size: f32) -> PxScale {
    font.pt_to_px_scale(size).unwrap_or_else(|| PxScale::from(size))
}

fn advance_width<F: Font, SF: ScaleFont<F>>(scaled: &SF, text: &str) -> f32 {
    let mut width = 0.0f32;
    let mut prev = None;
    for ch in text.chars() {
        let id = scaled.glyph_id(ch);
        if let Some(prev) = prev {
            width += scaled.kern(prev, id);
        }
        width += scaled.h_advance(id);
        prev = Some(id);
    }
    width
}

fn blend_pixel(img: &mut RgbImage, x: i64, y: i64, color: Rgba, coverage: f32) {
    if x < 0 || y < 0 || x >= img.width() as i64 || y >= img.height() as i64 {
        return;
    }
    let alpha = coverage.clamp(0.0, 1.0) * color.a as f32 / 255.0;
    if alpha <= 0.0 {
        return;
    }
    let px = img.get_pixel_mut(x as u32, y as u32);
    for (dst, src) in px.0.iter_mut().zip([color.r, color.g, color.b]) {
        *dst = (src as f32 * alpha + *dst as f32 * (1.0 - alpha)).round() as u8;
    }
}

fn lerp_channel(a: u8, b: u8, t: f32) -> u8 {
    (a as f32 + (b as f32 - a as f32) * t).round() as u8
}

pub struct Canvas {
    image: RgbImage,
    scale: Scale,
    fonts: Arc<FontLibrary>,
    font: FontKey,
    fill: Rgba,
    align: HorizontalAlign,
    baseline: TextBaseline,
}

impl std::fmt::Debug for Canvas {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Canvas")
            .field("size", &self.image.dimensions())
            .field("scale", &self.scale)
            .field("font", &self.font)
            .finish_non_exhaustive()
    }
}

impl Canvas {
    /// A black canvas of `width` x `height` pixels. Non-positive or
    /// non-finite scale axes are treated as 1.
    pub fn new(width: u32, height: u32, scale: Scale, fonts: Arc<FontLibrary>) -> Self {
        Self {
            image: RgbImage::new(width, height),
            scale: scale.sanitized(),
            fonts,
            font: FontKey::new("sans-serif", 10),
            fill: Rgba::BLACK,
            align: HorizontalAlign::Start,
            baseline: TextBaseline::Alphabetic,
        }
    }

    /// Pixel dimensions.
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn scale(&self) -> Scale {
        self.scale
    }

    /// Dimensions in logical units.
    pub fn logical_size(&self) -> (f32, f32) {
        let (w, h) = self.image.dimensions();
        (w as f32 / self.scale.x, h as f32 / self.scale.y)
    }

    pub fn bounds(&self) -> Rect {
        let (w, h) = self.logical_size();
        Rect::new(0.0, 0.0, w, h)
    }

    pub fn fonts(&self) -> &FontLibrary {
        &self.fonts
    }

    /// Pixel at device coordinates.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba> {
        self.image
            .get_pixel_checked(x, y)
            .map(|p| Rgba::rgb(p.0[0], p.0[1], p.0[2]))
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    /// Encode by file extension (`.png`, `.jpg`, ...).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        self.image
            .save(path)
            .with_context(|| format!("writing image {}", path.display()))
    }

    fn device_rect(&self, rect: Rect) -> Option<(i32, i32, i32, i32)> {
        let (w, h) = self.image.dimensions();
        let Scale { x: sx, y: sy } = self.scale;
        let x0 = ((rect.x * sx).round() as i32).clamp(0, w as i32);
        let y0 = ((rect.y * sy).round() as i32).clamp(0, h as i32);
        let x1 = ((rect.right() * sx).round() as i32).clamp(0, w as i32);
        let y1 = ((rect.bottom() * sy).round() as i32).clamp(0, h as i32);
        (x1 > x0 && y1 > y0).then_some((x0, y0, x1, y1))
    }

    pub fn fill_rect(&mut self, rect: Rect, color: Rgba) -> Result<()> {
        let Some((x0, y0, x1, y1)) = self.device_rect(rect) else {
            return Ok(());
        };
        let (w, h) = self.image.dimensions();
        let style = RGBAColor(color.r, color.g, color.b, color.a as f64 / 255.0);
        let mut backend = BitMapBackend::with_buffer(&mut *self.image, (w, h));
        backend
            .draw_rect((x0, y0), (x1 - 1, y1 - 1), &style.filled(), true)
            .map_err(|e| anyhow!("{:?}", e))?;
        backend.present().map_err(|e| anyhow!("{:?}", e))?;
        Ok(())
    }

    pub fn clear(&mut self, color: Rgba) -> Result<()> {
        self.fill_rect(self.bounds(), color)
    }

    /// Blend a linear gradient over `area`. Colors are interpolated (alpha
    /// included) along `start -> end` and held constant past either end.
    pub fn fill_linear_gradient(
        &mut self,
        area: Rect,
        start: (f32, f32),
        end: (f32, f32),
        from: Rgba,
        to: Rgba,
    ) {
        let Some((x0, y0, x1, y1)) = self.device_rect(area) else {
            return;
        };
        let (dx, dy) = (end.0 - start.0, end.1 - start.1);
        let len2 = dx * dx + dy * dy;
        for py in y0..y1 {
            for px in x0..x1 {
                let lx = (px as f32 + 0.5) / self.scale.x;
                let ly = (py as f32 + 0.5) / self.scale.y;
                let t = if len2 > 0.0 {
                    (((lx - start.0) * dx + (ly - start.1) * dy) / len2).clamp(0.0, 1.0)
                } else {
                    1.0
                };
                let color = Rgba::new(
                    lerp_channel(from.r, to.r, t),
                    lerp_channel(from.g, to.g, t),
                    lerp_channel(from.b, to.b, t),
                    lerp_channel(from.a, to.a, t),
                );
                blend_pixel(&mut self.image, px as i64, py as i64, color, 1.0);
            }
        }
    }

    /// Draw `img` stretched to `dest`, keeping only the part inside `clip`.
    pub fn draw_image(&mut self, img: &DynamicImage, dest: Rect, clip: Rect) {
        let Some((cx0, cy0, cx1, cy1)) = self.device_rect(clip) else {
            return;
        };
        let Scale { x: sx, y: sy } = self.scale;
        let dw = (dest.width * sx).round();
        let dh = (dest.height * sy).round();
        if dw < 1.0 || dh < 1.0 {
            return;
        }
        let dx = (dest.x * sx).round() as i64;
        let dy = (dest.y * sy).round() as i64;
        let resized = imageops::resize(&img.to_rgba8(), dw as u32, dh as u32, FilterType::Triangle);
        for (sx, sy, p) in resized.enumerate_pixels() {
            let (x, y) = (dx + sx as i64, dy + sy as i64);
            if x < cx0 as i64 || x >= cx1 as i64 || y < cy0 as i64 || y >= cy1 as i64 {
                continue;
            }
            let [r, g, b, a] = p.0;
            blend_pixel(&mut self.image, x, y, Rgba::new(r, g, b, a), 1.0);
        }
    }

    fn resolved_font(&self) -> Option<FontArc> {
        self.fonts.resolve(&self.font.family).cloned()
    }
}

impl MeasurementProvider for Canvas {
    fn active_font(&self) -> FontKey {
        self.font.clone()
    }

    fn set_active_font(&mut self, font: &FontKey) {
        self.font = font.clone();
    }

    /// Unresolved families measure as zero.
    fn measure(&self, text: &str) -> TextMeasure {
        let Some(font) = self.resolved_font() else {
            return TextMeasure::default();
        };
        let scaled = font.as_scaled(px_scale(&font, self.font.size()));
        TextMeasure {
            width: advance_width(&scaled, text),
            ascent: scaled.ascent(),
            descent: -scaled.descent(),
        }
    }
}

impl DrawingSurface for Canvas {
    fn fill_color(&self) -> Rgba {
        self.fill
    }

    fn set_fill_color(&mut self, color: Rgba) {
        self.fill = color;
    }

    fn text_align(&self) -> HorizontalAlign {
        self.align
    }

    fn set_text_align(&mut self, align: HorizontalAlign) {
        self.align = align;
    }

    fn text_baseline(&self) -> TextBaseline {
        self.baseline
    }

    fn set_text_baseline(&mut self, baseline: TextBaseline) {
        self.baseline = baseline;
    }

    fn fill_text(&mut self, text: &str, x: f32, y: f32) -> Result<()> {
        let Some(font) = self.resolved_font() else {
            return Ok(());
        };
        let em = px_scale(&font, self.font.size());
        let px = PxScale {
            x: em.x * self.scale.x,
            y: em.y * self.scale.y,
        };
        let scaled = font.as_scaled(px);
        let width = advance_width(&scaled, text);
        let ascent = scaled.ascent();
        let descent = -scaled.descent();

        let mut cursor_x = x * self.scale.x
            - match self.align {
                HorizontalAlign::Start => 0.0,
                HorizontalAlign::Center => width / 2.0,
                HorizontalAlign::End => width,
            };
        let baseline = y * self.scale.y
            + match self.baseline {
                TextBaseline::Top => ascent,
                TextBaseline::Alphabetic => 0.0,
                TextBaseline::Bottom => -descent,
            };

        let color = self.fill;
        let mut prev = None;
        for ch in text.chars() {
            if ch.is_control() {
                continue;
            }
            let id = scaled.glyph_id(ch);
            if let Some(prev) = prev {
                cursor_x += scaled.kern(prev, id);
            }
            let glyph = id.with_scale_and_position(px, point(cursor_x, baseline));
            if let Some(outline) = font.outline_glyph(glyph) {
                let bounds = outline.px_bounds();
                let image = &mut self.image;
                outline.draw(|gx, gy, coverage| {
                    blend_pixel(
                        image,
                        (bounds.min.x + gx as f32) as i64,
                        (bounds.min.y + gy as f32) as i64,
                        color,
                        coverage,
                    );
                });
            }
            cursor_x += scaled.h_advance(id);
            prev = Some(id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn canvas(w: u32, h: u32, scale: f32) -> Canvas {
        Canvas::new(w, h, Scale::uniform(scale), Arc::new(FontLibrary::new()))
    }

    #[test]
    fn logical_size_divides_by_scale() {
        let c = canvas(200, 100, 2.0);
        assert_eq!(c.logical_size(), (100.0, 50.0));
        assert_eq!(canvas(10, 10, 0.0).scale(), Scale::ONE);
        assert_eq!(canvas(10, 10, f32::NAN).scale(), Scale::ONE);
        let c = Canvas::new(10, 10, Scale::new(2.0, -1.0), Arc::new(FontLibrary::new()));
        assert_eq!(c.scale(), Scale::new(2.0, 1.0));
    }

    #[test]
    fn axes_scale_independently() {
        let mut c = Canvas::new(40, 20, Scale::new(2.0, 1.0), Arc::new(FontLibrary::new()));
        assert_eq!(c.logical_size(), (20.0, 20.0));
        c.fill_rect(Rect::new(0.0, 0.0, 5.0, 5.0), Rgba::WHITE).unwrap();
        assert_eq!(c.pixel(8, 3), Some(Rgba::WHITE));
        assert_eq!(c.pixel(12, 3), Some(Rgba::BLACK));
        assert_eq!(c.pixel(3, 7), Some(Rgba::BLACK));
    }

    #[test]
    fn scale_reads_number_or_axes() {
        let s: Scale = serde_json::from_str("1.5").unwrap();
        assert_eq!(s, Scale::uniform(1.5));
        let s: Scale = serde_json::from_str(r#"{"x": 2, "y": 1}"#).unwrap();
        assert_eq!(s, Scale::new(2.0, 1.0));
    }

    #[test]
    fn fill_rect_covers_scaled_area() {
        let mut c = canvas(40, 40, 2.0);
        c.fill_rect(Rect::new(5.0, 5.0, 5.0, 5.0), Rgba::WHITE).unwrap();
        assert_eq!(c.pixel(10, 10), Some(Rgba::WHITE));
        assert_eq!(c.pixel(15, 16), Some(Rgba::WHITE));
        assert_eq!(c.pixel(9, 10), Some(Rgba::BLACK));
        assert_eq!(c.pixel(20, 20), Some(Rgba::BLACK));
        // fully outside is a no-op
        c.fill_rect(Rect::new(100.0, 100.0, 5.0, 5.0), Rgba::WHITE).unwrap();
    }

    #[test]
    fn gradient_runs_from_transparent_to_opaque() {
        let mut c = canvas(100, 10, 1.0);
        c.clear(Rgba::WHITE).unwrap();
        c.fill_linear_gradient(
            c.bounds(),
            (0.0, 0.0),
            (50.0, 0.0),
            Rgba::BLACK.with_alpha(0),
            Rgba::BLACK,
        );
        let left = c.pixel(0, 5).unwrap();
        let mid = c.pixel(25, 5).unwrap();
        assert!(left.r > 245, "{left:?}");
        assert!(mid.r > 100 && mid.r < 155, "{mid:?}");
        assert_eq!(c.pixel(50, 5), Some(Rgba::BLACK));
        assert_eq!(c.pixel(99, 5), Some(Rgba::BLACK));
    }

    #[test]
    fn image_is_clipped() {
        let mut c = canvas(20, 10, 1.0);
        let red = DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, Rgb([255, 0, 0])));
        c.draw_image(&red, Rect::new(0.0, 0.0, 20.0, 10.0), Rect::new(0.0, 0.0, 10.0, 10.0));
        assert_eq!(c.pixel(5, 5), Some(Rgba::rgb(255, 0, 0)));
        assert_eq!(c.pixel(15, 5), Some(Rgba::BLACK));
    }

    #[test]
    fn unresolved_font_measures_and_draws_nothing() {
        let mut c = canvas(20, 20, 1.0);
        c.set_active_font(&FontKey::new("Nope", 12));
        assert_eq!(c.measure("hello"), TextMeasure::default());
        c.set_fill_color(Rgba::WHITE);
        c.fill_text("hello", 10.0, 10.0).unwrap();
        assert!(c.image().pixels().all(|p| p.0 == [0, 0, 0]));
    }
}
