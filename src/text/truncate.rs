//! Cut a wrapped line set down to a height budget.

use super::metrics::{CorrectedMetrics, corrected_metrics, max_lines};
use super::measure::MeasurementProvider;
use crate::models::{FontKey, LineSet};

/// Marker used when the caller has no preference.
pub const DEFAULT_ELLIPSIS: &str = "…";

/// Keep as many whole lines as fit `max_height`.
///
/// Whole paragraphs are kept while they fit; the first paragraph that does
/// not is cut to the remaining line count and everything after it is dropped.
/// At least one line survives when there is any content at all. With an
/// `ellipsis`, the tail of the last kept line is overwritten by it (or it is
/// appended when the line is shorter than the marker). A set that already
/// fits is returned untouched, ellipsis included.
pub fn truncate_lines(
    lines: &LineSet,
    metrics: &CorrectedMetrics,
    line_height: f32,
    max_height: f32,
    ellipsis: Option<&str>,
) -> LineSet {
    let total = lines.line_count();
    let budget = max_lines(max_height, metrics, line_height);
    if budget >= total {
        return lines.clone();
    }
    let budget = budget.max(1);

    let mut kept: Vec<Vec<String>> = Vec::new();
    let mut count = 0;
    for paragraph in &lines.paragraphs {
        if count == budget {
            break;
        }
        if count + paragraph.len() <= budget {
            kept.push(paragraph.clone());
            count += paragraph.len();
            continue;
        }
        kept.push(paragraph[..budget - count].to_vec());
        break;
    }

    let mut out = LineSet::new(kept);
    if let (Some(marker), Some(last)) = (ellipsis, out.last_line_mut()) {
        apply_ellipsis(last, marker);
    }
    out
}

/// [`truncate_lines`] with the metrics measured for `font`.
pub fn truncate<P: MeasurementProvider + ?Sized>(
    lines: &LineSet,
    provider: &mut P,
    font: &FontKey,
    line_height: f32,
    max_height: f32,
    ellipsis: Option<&str>,
) -> LineSet {
    let metrics = corrected_metrics(provider, font);
    truncate_lines(lines, &metrics, line_height, max_height, ellipsis)
}

/// Overwrite the last `marker.chars().count()` chars of `line` with `marker`.
pub fn apply_ellipsis(line: &mut String, marker: &str) {
    let n = marker.chars().count();
    if n == 0 {
        return;
    }
    if line.chars().count() >= n {
        // byte offset of the n-th char from the end
        let cut = line
            .char_indices()
            .rev()
            .nth(n - 1)
            .map(|(i, _)| i)
            .unwrap_or(0);
        line.truncate(cut);
    }
    line.push_str(marker);
}
