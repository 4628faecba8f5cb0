//! quotecard
//!
//! Text layout for quote card images, plus the composition that uses it.
//! Pairs with the `quotecard` CLI.
//!
//! ### Features
//! - Greedy word wrap with hyphenation for long words, driven by cached
//!   per-font character widths
//! - Height math on normalized font metrics, and truncation with an ellipsis
//! - Multi-line drawing with alignment and baseline control
//! - Card composition: avatar half, gradient, shrink-to-fit message, watermark
//!
//! ### Example
//! ```no_run
//! use quotecard::text::{EstimateProvider, WidthCache, WrapOptions, wrap};
//! use quotecard::FontKey;
//!
//! let mut provider = EstimateProvider::default();
//! let font = FontKey::new("Noto Sans", 16);
//! let cache = WidthCache::default();
//! let widths = cache.get_or_build(&mut provider, &font);
//! let opts = WrapOptions::default();
//! let lines = wrap("Hello there, world", &font, 80.0, &mut provider, &widths, &opts);
//! println!("{:?}", lines.flatten());
//! ```

pub mod avatar;
pub mod canvas;
pub mod card;
pub mod error;
pub mod fonts;
pub mod markdown;
pub mod models;
pub mod text;

pub use avatar::{AvatarLoader, AvatarSource};
pub use canvas::{Canvas, Rect, Scale};
pub use card::{CardConfig, CardLayout, Origin, QuoteData, QuoteRenderer, Resolution};
pub use error::LayoutError;
pub use fonts::FontLibrary;
pub use markdown::MarkdownStripper;
pub use models::{
    FontKey, HorizontalAlign, LayoutConfig, LineSet, Rgba, TextBaseline, VerticalBaseline,
};
