//! The layout engine: measure, wrap, size, truncate and paint text.
//!
//! Everything here talks to fonts only through [`MeasurementProvider`]
//! (and [`DrawingSurface`] for painting), so the same code runs against the
//! pixel [`Canvas`](crate::canvas::Canvas) or the headless
//! [`EstimateProvider`].

pub mod block;
pub mod cache;
pub mod measure;
pub mod metrics;
pub mod render;
pub mod truncate;
pub mod wrap;

pub use block::{TextBlock, layout_block};
pub use cache::{CharRange, CharWidths, WidthCache};
pub use measure::{EstimateProvider, FontGuard, MeasurementProvider, TextMeasure};
pub use metrics::{
    CorrectedMetrics, corrected_metrics, max_lines, measure_text_height, text_height,
};
pub use render::{DrawStyle, DrawingSurface, SurfaceGuard, SurfaceState, draw_lines};
pub use truncate::{DEFAULT_ELLIPSIS, truncate, truncate_lines};
pub use wrap::{WrapOptions, wrap};
