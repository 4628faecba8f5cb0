use anyhow::Result;
use quotecard::text::{
    DrawingSurface, EstimateProvider, MeasurementProvider, SurfaceState, TextMeasure,
};
use quotecard::{FontKey, HorizontalAlign, Rgba, TextBaseline};
use std::path::PathBuf;

/// One `fill_text` call and the surface state it saw.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCall {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub state: SurfaceState,
}

/// Drawing surface that records calls instead of painting. Measures with
/// `EstimateProvider`, so every char is `0.6 * size` wide.
pub struct RecordingSurface {
    pub provider: EstimateProvider,
    pub fill: Rgba,
    pub align: HorizontalAlign,
    pub baseline: TextBaseline,
    pub calls: Vec<DrawCall>,
}

impl RecordingSurface {
    /// Raw ascent/descent of 0.8/0.2 of the size, so corrected metrics equal raw.
    pub fn new() -> Self {
        Self {
            provider: EstimateProvider::new(0.6, 0.8, 0.2),
            fill: Rgba::BLACK,
            align: HorizontalAlign::Start,
            baseline: TextBaseline::Alphabetic,
            calls: Vec::new(),
        }
    }

    #[allow(dead_code)]
    pub fn texts(&self) -> Vec<&str> {
        self.calls.iter().map(|c| c.text.as_str()).collect()
    }
}

impl MeasurementProvider for RecordingSurface {
    fn active_font(&self) -> FontKey {
        self.provider.active_font()
    }

    fn set_active_font(&mut self, font: &FontKey) {
        self.provider.set_active_font(font)
    }

    fn measure(&self, text: &str) -> TextMeasure {
        self.provider.measure(text)
    }
}

impl DrawingSurface for RecordingSurface {
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
        let state = self.state();
        self.calls.push(DrawCall {
            text: text.to_string(),
            x,
            y,
            state,
        });
        Ok(())
    }
}

/// First TTF found in the usual system locations.
#[allow(dead_code)]
pub fn system_font() -> Option<PathBuf> {
    [
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/truetype/noto/NotoSans-Regular.ttf",
        "/usr/share/fonts/noto/NotoSans-Regular.ttf",
        "/usr/share/fonts/truetype/freefont/FreeSans.ttf",
        "/usr/share/fonts/TTF/DejaVuSans.ttf",
        "/Library/Fonts/Arial.ttf",
        "C:\\Windows\\Fonts\\arial.ttf",
    ]
    .iter()
    .map(PathBuf::from)
    .find(|p| p.exists())
}
