//! Page progress rules shared by the detail view and the store.

use crate::error::PageInputError;

/// Clamps a page to `[0, page_count]`; an unknown or zero count leaves it unbounded.
pub fn clamp_page(page: u32, page_count: Option<u32>) -> u32 {
    match page_count.filter(|count| *count > 0) {
        Some(count) => page.min(count),
        None => page,
    }
}

/// Applies a +/- step (the ±1 and ±10 buttons) and clamps the result.
pub fn adjust_page(current: u32, delta: i64, page_count: Option<u32>) -> u32 {
    let next = i64::from(current).saturating_add(delta).clamp(0, i64::from(u32::MAX));
    clamp_page(next as u32, page_count)
}

/// Parses the free-text page field. Values above a known page count are rejected, not clamped.
pub fn parse_page_input(raw: &str, page_count: Option<u32>) -> Result<u32, PageInputError> {
    let page = raw
        .trim()
        .parse::<i64>()
        .ok()
        .filter(|value| *value >= 0)
        .and_then(|value| u32::try_from(value).ok())
        .ok_or(PageInputError::Invalid)?;

    match page_count.filter(|count| *count > 0) {
        Some(count) if page > count => Err(PageInputError::ExceedsTotal(count)),
        _ => Ok(page),
    }
}

/// Rounded percentage, capped at 100. `None` when the total is unknown.
pub fn progress_percent(current: u32, total: Option<u32>) -> Option<u32> {
    let total = total.filter(|total| *total > 0)?;
    let pct = (f64::from(current) / f64::from(total) * 100.0).round();
    Some(pct.min(100.0) as u32)
}
