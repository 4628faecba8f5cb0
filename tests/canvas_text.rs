mod common;

use quotecard::text::{
    DrawStyle, DrawingSurface, FontGuard, MeasurementProvider, WidthCache, WrapOptions,
    corrected_metrics, draw_lines, wrap,
};
use quotecard::{
    Canvas, FontKey, FontLibrary, HorizontalAlign, LineSet, Rgba, Scale, TextBaseline,
};
use std::sync::Arc;

fn canvas_with_system_font(w: u32, h: u32, scale: f32) -> Option<Canvas> {
    let Some(path) = common::system_font() else {
        eprintln!("skipping canvas text test: no system font found");
        return None;
    };
    let mut fonts = FontLibrary::new();
    fonts.load_file("Sys", &path).unwrap();
    Some(Canvas::new(w, h, Scale::uniform(scale), Arc::new(fonts)))
}

fn lit_pixels(c: &Canvas) -> usize {
    c.image().pixels().filter(|p| p.0 != [0, 0, 0]).count()
}

#[test]
fn real_font_metrics_are_corrected_to_size() {
    let Some(mut c) = canvas_with_system_font(10, 10, 1.0) else {
        return;
    };
    let font = FontKey::new("Missing, Sys", 32);
    let m = corrected_metrics(&mut c, &font);
    assert!((m.ascent + m.descent - 32.0).abs() < 1e-3);
    assert!(m.ascent > m.descent);

    let g = FontGuard::new(&mut c, &font);
    let one = g.measure("M").width;
    let two = g.measure("MM").width;
    assert!(one > 0.0);
    assert!((two - 2.0 * one).abs() < 0.5);
    assert_eq!(g.measure("").width, 0.0);
}

#[test]
fn real_font_lines_fit_their_budget() {
    let Some(mut c) = canvas_with_system_font(10, 10, 1.0) else {
        return;
    };
    let font = FontKey::new("Sys", 16);
    let cache = WidthCache::default();
    let widths = cache.get_or_build(&mut c, &font);
    let text = "Hello, this is a test of the emergency broadcast system. This is only a test.";
    let set = wrap(text, &font, 100.0, &mut c, &widths, &WrapOptions::default());

    assert!(set.line_count() > 1);
    let g = FontGuard::new(&mut c, &font);
    for line in set.flatten() {
        // summed advances ignore kerning, so allow a pixel of slack
        assert!(g.measure(line).width <= 101.0, "{line:?}");
    }
}

#[test]
fn text_lands_where_alignment_says() {
    let Some(mut c) = canvas_with_system_font(200, 60, 1.0) else {
        return;
    };
    let style = DrawStyle::new(FontKey::new("Sys", 20), Rgba::WHITE, 200.0, 10.0)
        .align(HorizontalAlign::End);
    draw_lines(&mut c, &LineSet::single("right"), &style).unwrap();

    assert!(lit_pixels(&c) > 0);
    let leftmost = c
        .image()
        .enumerate_pixels()
        .filter(|(_, _, p)| p.0 != [0, 0, 0])
        .map(|(x, _, _)| x)
        .min()
        .unwrap();
    assert!(leftmost > 100, "text starts at {leftmost}");
    // state restored after drawing
    assert_eq!(c.text_align(), HorizontalAlign::Start);
    assert_eq!(c.text_baseline(), TextBaseline::Alphabetic);
}

#[test]
fn scale_enlarges_drawn_text() {
    let Some(mut small) = canvas_with_system_font(200, 100, 1.0) else {
        return;
    };
    let Some(mut big) = canvas_with_system_font(400, 200, 2.0) else {
        return;
    };
    let style = DrawStyle::new(FontKey::new("Sys", 20), Rgba::WHITE, 10.0, 10.0);
    draw_lines(&mut small, &LineSet::single("Scale"), &style).unwrap();
    draw_lines(&mut big, &LineSet::single("Scale"), &style).unwrap();
    let (a, b) = (lit_pixels(&small), lit_pixels(&big));
    assert!(b > a * 3, "{a} vs {b}");
}
