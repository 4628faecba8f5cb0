//! Quote card composition: avatar half, gradient, centered message with the
//! author lines under it, and a corner watermark.
//!
//! The message is set at the largest font size (from `font_size.max` down to
//! `font_size.min`) whose wrapped height fits the text half after padding and
//! the two author lines. If even the minimum size does not fit, the message is
//! truncated with the configured ellipsis.

use anyhow::{Context, Result};
use image::DynamicImage;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use crate::avatar::{AvatarLoader, AvatarSource};
use crate::canvas::{Canvas, Rect, Scale};
use crate::fonts::FontLibrary;
use crate::markdown::MarkdownStripper;
use crate::models::{FontKey, HorizontalAlign, LineSet, Rgba, TextBaseline};
use crate::text::cache::WidthCache;
use crate::text::measure::MeasurementProvider;
use crate::text::metrics::measure_text_height;
use crate::text::render::{DrawStyle, DrawingSurface, SurfaceGuard, draw_lines};
use crate::text::truncate::truncate;
use crate::text::wrap::{WrapOptions, wrap};

/// Side of the card the avatar occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    #[default]
    Left,
    Top,
    Right,
    Bottom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Default for Resolution {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FontSizes {
    pub max: u32,
    pub min: u32,
    /// Display name and username.
    pub regular: u32,
    pub watermark: u32,
}

impl Default for FontSizes {
    fn default() -> Self {
        Self {
            max: 50,
            min: 20,
            regular: 30,
            watermark: 20,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Theme {
    pub background: Rgba,
    pub text: Rgba,
    pub display_name: Rgba,
    pub username: Rgba,
    pub watermark: Rgba,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            background: Rgba::BLACK,
            text: Rgba::WHITE,
            display_name: Rgba::rgb(0xdd, 0xdd, 0xdd),
            username: Rgba::rgb(0x77, 0x77, 0x77),
            watermark: Rgba::rgb(0x77, 0x77, 0x77),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Padding {
    pub x: f32,
    pub y: f32,
}

impl Default for Padding {
    fn default() -> Self {
        Self { x: 30.0, y: 30.0 }
    }
}

/// Card settings. Every field has a default, so a JSON file only needs the
/// keys it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CardConfig {
    pub avatar_origin: Origin,
    /// Output size in pixels.
    pub resolution: Resolution,
    /// Pixels per logical unit on each axis; layout happens at
    /// `resolution / scale`. A bare number scales both axes.
    pub scale: Scale,
    pub font_family: String,
    pub font_size: FontSizes,
    pub theme: Theme,
    pub padding: Padding,
    /// Empty disables the watermark.
    pub watermark: String,
    /// Empty truncates without a marker.
    pub ellipsis: String,
    pub line_height: f32,
    /// Render chat markdown as its plain text.
    pub strip_markdown: bool,
}

impl Default for CardConfig {
    fn default() -> Self {
        Self {
            avatar_origin: Origin::Left,
            resolution: Resolution::default(),
            scale: Scale::uniform(2.0),
            font_family: "Noto Sans, GG, Twemoji, FreeSans, Bitstream Vera Sans Mono".into(),
            font_size: FontSizes::default(),
            theme: Theme::default(),
            padding: Padding::default(),
            watermark: "@ArchWiki".into(),
            ellipsis: "[…]".into(),
            line_height: 1.5,
            strip_markdown: true,
        }
    }
}

impl CardConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file =
            File::open(path).with_context(|| format!("opening config {}", path.display()))?;
        serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn logical_size(&self) -> (f32, f32) {
        let s = self.scale.sanitized();
        (
            self.resolution.width as f32 / s.x,
            self.resolution.height as f32 / s.y,
        )
    }

    pub fn avatar_area(&self) -> Rect {
        let (w, h) = self.logical_size();
        match self.avatar_origin {
            Origin::Left => Rect::new(0.0, 0.0, w / 2.0, h),
            Origin::Right => Rect::new(w / 2.0, 0.0, w / 2.0, h),
            Origin::Top => Rect::new(0.0, 0.0, w, h / 2.0),
            Origin::Bottom => Rect::new(0.0, h / 2.0, w, h / 2.0),
        }
    }

    /// The half opposite the avatar.
    pub fn text_area(&self) -> Rect {
        let (w, h) = self.logical_size();
        match self.avatar_origin {
            Origin::Left => Rect::new(w / 2.0, 0.0, w / 2.0, h),
            Origin::Right => Rect::new(0.0, 0.0, w / 2.0, h),
            Origin::Top => Rect::new(0.0, h / 2.0, w, h / 2.0),
            Origin::Bottom => Rect::new(0.0, 0.0, w, h / 2.0),
        }
    }

    /// Square covering the avatar area, centered on it.
    pub fn avatar_placement(&self) -> Rect {
        let area = self.avatar_area();
        let side = area.width.max(area.height);
        Rect::new(
            area.x + (area.width - side) / 2.0,
            area.y + (area.height - side) / 2.0,
            side,
            side,
        )
    }

    /// Gradient axis: outer edge of the avatar half to the split line.
    pub fn gradient_axis(&self) -> ((f32, f32), (f32, f32)) {
        let (w, h) = self.logical_size();
        match self.avatar_origin {
            Origin::Left => ((0.0, 0.0), (w / 2.0, 0.0)),
            Origin::Right => ((w, 0.0), (w / 2.0, 0.0)),
            Origin::Top => ((0.0, 0.0), (0.0, h / 2.0)),
            Origin::Bottom => ((0.0, h), (0.0, h / 2.0)),
        }
    }

    /// Anchor point, alignment and baseline for the watermark: the bottom
    /// right corner, mirrored away from a right or bottom avatar.
    pub fn watermark_anchor(&self) -> (f32, f32, HorizontalAlign, TextBaseline) {
        let (w, h) = self.logical_size();
        let (x, align) = match self.avatar_origin {
            Origin::Right => (0.0, HorizontalAlign::Start),
            _ => (w, HorizontalAlign::End),
        };
        let (y, baseline) = match self.avatar_origin {
            Origin::Bottom => (0.0, TextBaseline::Top),
            _ => (h, TextBaseline::Bottom),
        };
        (x, y, align, baseline)
    }

    fn ellipsis(&self) -> Option<&str> {
        Some(self.ellipsis.as_str()).filter(|s| !s.is_empty())
    }
}

/// One message to render.
#[derive(Debug, Clone, PartialEq)]
pub struct QuoteData {
    pub message: String,
    pub display_name: String,
    pub username: String,
    pub avatar: AvatarSource,
}

/// Where the text blocks ended up.
#[derive(Debug, Clone, PartialEq)]
pub struct CardLayout {
    pub message: LineSet,
    pub message_font: FontKey,
    pub message_height: f32,
    /// The message did not fit at the minimum size and was cut.
    pub truncated: bool,
    pub author_font: FontKey,
    pub display_name_height: f32,
    pub username_height: f32,
    /// Horizontal center of the text half.
    pub anchor_x: f32,
    /// Top of the stacked message and author lines.
    pub top: f32,
}

impl CardLayout {
    pub fn total_height(&self) -> f32 {
        self.message_height + self.display_name_height + self.username_height
    }
}

/// Fit the message and author lines into the text half.
pub fn layout_text<P: MeasurementProvider + ?Sized>(
    provider: &mut P,
    widths: &WidthCache,
    data: &QuoteData,
    config: &CardConfig,
) -> CardLayout {
    let region = config.text_area();
    let budget = region.inset(config.padding.x, config.padding.y);
    let lh = config.line_height;
    let family = config.font_family.as_str();

    let author_font = FontKey::new(family, config.font_size.regular);
    let display_name_height = measure_text_height(provider, 1, &author_font, lh);
    let username_height = measure_text_height(provider, 1, &author_font, lh);
    let remaining = budget.height - display_name_height - username_height;

    let min = config.font_size.min.max(1);
    let max = config.font_size.max.max(min);
    let options = WrapOptions::default();

    let set_at = |provider: &mut P, font: &FontKey| {
        let table = widths.get_or_build(provider, font);
        let lines = wrap(&data.message, font, budget.width, provider, &table, &options);
        let height = measure_text_height(provider, lines.line_count(), font, lh);
        (lines, height)
    };

    let mut font = FontKey::new(family, max);
    let (mut message, mut height) = set_at(&mut *provider, &font);
    while height > remaining && font.size_px > min {
        font = font.with_size(font.size_px - 1);
        (message, height) = set_at(&mut *provider, &font);
    }
    debug!(
        "message set at {font}: {} lines, {height:.1} of {remaining:.1}",
        message.line_count()
    );

    let mut truncated = false;
    if height > remaining {
        let before = message.line_count();
        message = truncate(&message, provider, &font, lh, remaining, config.ellipsis());
        height = measure_text_height(provider, message.line_count(), &font, lh);
        truncated = message.line_count() < before;
        debug!("truncated message from {before} to {} lines", message.line_count());
    }

    let total = height + display_name_height + username_height;
    CardLayout {
        message,
        message_font: font,
        message_height: height,
        truncated,
        author_font,
        display_name_height,
        username_height,
        anchor_x: region.center().0,
        top: region.y + (region.height - total) / 2.0,
    }
}

/// Paint a full card onto `canvas`.
pub fn compose(
    canvas: &mut Canvas,
    avatar: Option<&DynamicImage>,
    data: &QuoteData,
    config: &CardConfig,
    widths: &WidthCache,
) -> Result<CardLayout> {
    if let Err(err) = canvas.fonts().require(&config.font_family) {
        warn!("{err}; text will not be drawn");
    }
    let theme = &config.theme;
    canvas.clear(theme.background)?;

    if let Some(img) = avatar {
        canvas.draw_image(img, config.avatar_placement(), config.avatar_area());
    }
    let (start, end) = config.gradient_axis();
    let bounds = canvas.bounds();
    canvas.fill_linear_gradient(
        bounds,
        start,
        end,
        theme.background.with_alpha(0),
        theme.background,
    );

    let layout = layout_text(canvas, widths, data, config);
    let lh = config.line_height;
    let x = layout.anchor_x;

    let message = DrawStyle::new(layout.message_font.clone(), theme.text, x, layout.top)
        .line_height(lh)
        .align(HorizontalAlign::Center);
    draw_lines(canvas, &layout.message, &message)?;

    let y = layout.top + layout.message_height;
    let name = DrawStyle::new(layout.author_font.clone(), theme.display_name, x, y)
        .line_height(lh)
        .align(HorizontalAlign::Center);
    draw_lines(canvas, &LineSet::single(data.display_name.as_str()), &name)?;

    let y = y + layout.display_name_height;
    let user = DrawStyle::new(layout.author_font.clone(), theme.username, x, y)
        .line_height(lh)
        .align(HorizontalAlign::Center);
    draw_lines(canvas, &LineSet::single(data.username.as_str()), &user)?;

    draw_watermark(canvas, config)?;
    Ok(layout)
}

/// Watermark text in the corner away from the avatar.
pub fn draw_watermark<S: DrawingSurface + ?Sized>(
    surface: &mut S,
    config: &CardConfig,
) -> Result<()> {
    if config.watermark.is_empty() {
        return Ok(());
    }
    let (x, y, align, baseline) = config.watermark_anchor();
    let mut s = SurfaceGuard::new(surface);
    s.set_active_font(&FontKey::new(
        config.font_family.as_str(),
        config.font_size.watermark,
    ));
    s.set_fill_color(config.theme.watermark);
    s.set_text_align(align);
    s.set_text_baseline(baseline);
    s.fill_text(&config.watermark, x, y)
}

/// Renders cards with one shared width cache and avatar cache.
#[derive(Debug)]
pub struct QuoteRenderer {
    config: CardConfig,
    fonts: Arc<FontLibrary>,
    widths: WidthCache,
    avatars: AvatarLoader,
    markdown: MarkdownStripper,
}

impl QuoteRenderer {
    pub fn new(config: CardConfig, fonts: Arc<FontLibrary>) -> Result<Self> {
        Ok(Self {
            config,
            fonts,
            widths: WidthCache::default(),
            avatars: AvatarLoader::new()?,
            markdown: MarkdownStripper::new()?,
        })
    }

    pub fn avatars(&self) -> &AvatarLoader {
        &self.avatars
    }

    pub fn render(&self, data: &QuoteData) -> Result<(Canvas, CardLayout)> {
        let avatar = self.avatars.load(&data.avatar)?;
        let stripped;
        let data = if self.config.strip_markdown {
            stripped = QuoteData {
                message: self.markdown.strip(&data.message),
                ..data.clone()
            };
            &stripped
        } else {
            data
        };
        let res = self.config.resolution;
        let mut canvas = Canvas::new(
            res.width,
            res.height,
            self.config.scale,
            Arc::clone(&self.fonts),
        );
        let layout = compose(&mut canvas, Some(&avatar), data, &self.config, &self.widths)?;
        Ok((canvas, layout))
    }

    pub fn render_to_file(&self, data: &QuoteData, path: impl AsRef<Path>) -> Result<CardLayout> {
        let (canvas, layout) = self.render(data)?;
        canvas.save(path)?;
        Ok(layout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::measure::EstimateProvider;

    fn data(message: &str) -> QuoteData {
        QuoteData {
            message: message.into(),
            display_name: "Someone".into(),
            username: "@someone".into(),
            avatar: AvatarSource::parse("avatar.png"),
        }
    }

    fn run(message: &str, config: &CardConfig) -> CardLayout {
        let mut p = EstimateProvider::default();
        layout_text(&mut p, &WidthCache::default(), &data(message), config)
    }

    #[test]
    fn areas_follow_origin() {
        let mut cfg = CardConfig::default();
        assert_eq!(cfg.logical_size(), (960.0, 540.0));
        assert_eq!(cfg.text_area(), Rect::new(480.0, 0.0, 480.0, 540.0));
        assert_eq!(cfg.avatar_placement(), Rect::new(-30.0, 0.0, 540.0, 540.0));

        cfg.avatar_origin = Origin::Bottom;
        assert_eq!(cfg.avatar_area(), Rect::new(0.0, 270.0, 960.0, 270.0));
        assert_eq!(cfg.text_area(), Rect::new(0.0, 0.0, 960.0, 270.0));
        assert_eq!(cfg.avatar_placement(), Rect::new(0.0, -75.0, 960.0, 960.0));
        assert_eq!(cfg.gradient_axis(), ((0.0, 540.0), (0.0, 270.0)));
    }

    #[test]
    fn watermark_moves_away_from_avatar() {
        let mut cfg = CardConfig::default();
        assert_eq!(
            cfg.watermark_anchor(),
            (960.0, 540.0, HorizontalAlign::End, TextBaseline::Bottom)
        );
        cfg.avatar_origin = Origin::Right;
        assert_eq!(
            cfg.watermark_anchor(),
            (0.0, 540.0, HorizontalAlign::Start, TextBaseline::Bottom)
        );
        cfg.avatar_origin = Origin::Bottom;
        assert_eq!(
            cfg.watermark_anchor(),
            (960.0, 0.0, HorizontalAlign::End, TextBaseline::Top)
        );
    }

    #[test]
    fn short_message_uses_max_size() {
        let layout = run("hello", &CardConfig::default());
        assert_eq!(layout.message_font.size_px, 50);
        assert_eq!(layout.message.flatten(), vec!["hello"]);
        assert!(!layout.truncated);
        assert!((layout.message_height - 75.0).abs() < 1e-3);
        assert!((layout.display_name_height - 45.0).abs() < 1e-3);
        assert!((layout.top - 187.5).abs() < 1e-3);
        assert_eq!(layout.anchor_x, 720.0);
    }

    #[test]
    fn medium_message_shrinks_until_it_fits() {
        let message = vec!["abcd"; 20].join(" ");
        let layout = run(&message, &CardConfig::default());
        let size = layout.message_font.size_px;
        assert!(size > 20 && size < 50, "settled at {size}");
        assert!(!layout.truncated);
        assert!(layout.message_height <= 480.0 - 90.0 + 1e-3);
    }

    #[test]
    fn long_message_is_truncated_at_min_size() {
        let message = vec!["word"; 1000].join(" ");
        let layout = run(&message, &CardConfig::default());
        assert_eq!(layout.message_font.size_px, 20);
        assert!(layout.truncated);
        // 390px left, 30px per line
        assert_eq!(layout.message.line_count(), 13);
        let last = layout.message.flatten().last().map(|s| s.to_string());
        assert!(last.is_some_and(|l| l.ends_with("[…]")));
        assert!(layout.top >= 0.0);
    }

    #[test]
    fn top_origin_centers_across_full_width() {
        let cfg = CardConfig {
            avatar_origin: Origin::Top,
            ..CardConfig::default()
        };
        let layout = run("hi", &cfg);
        assert_eq!(layout.anchor_x, 480.0);
        assert!((layout.top - (270.0 + (270.0 - layout.total_height()) / 2.0)).abs() < 1e-3);
    }

    #[test]
    fn config_json_overrides_some_fields() {
        let cfg: CardConfig = serde_json::from_str(
            r##"{"avatar_origin": "right", "theme": {"text": "#ff0000"}, "font_size": {"max": 40}}"##,
        )
        .unwrap();
        assert_eq!(cfg.avatar_origin, Origin::Right);
        assert_eq!(cfg.theme.text, Rgba::rgb(255, 0, 0));
        assert_eq!(cfg.theme.background, Rgba::BLACK);
        assert_eq!(cfg.font_size.max, 40);
        assert_eq!(cfg.font_size.min, 20);
        assert_eq!(cfg.watermark, "@ArchWiki");
        assert_eq!(cfg.scale, Scale::uniform(2.0));
    }

    #[test]
    fn per_axis_scale_shapes_the_logical_card() {
        let cfg: CardConfig = serde_json::from_str(r#"{"scale": {"x": 2, "y": 1}}"#).unwrap();
        assert_eq!(cfg.logical_size(), (960.0, 1080.0));
        assert_eq!(cfg.text_area(), Rect::new(480.0, 0.0, 480.0, 1080.0));
        let cfg: CardConfig = serde_json::from_str(r#"{"scale": 0}"#).unwrap();
        assert_eq!(cfg.logical_size(), (1920.0, 1080.0));
    }
}
