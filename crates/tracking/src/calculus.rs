//! Time calculus: relative window offsets to absolute boundaries.
//!
//! Pure functions with no clock access. Every interval is closed at its
//! start; the end is open unless the window is the last one of its milestone,
//! which keeps the schedule's hard deadline inside the `max` window.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TrackingError};
use crate::schema::Window;

/// Absolute boundaries of one window for a concrete reference instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowBounds {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Whether an interval's end instant belongs to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndBound {
    /// `[start, end)`
    Open,
    /// `[start, end]`
    Closed,
}

/// Add a window's offsets to `reference`.
///
/// Fails with `InvalidOffset` when `end < start` or a boundary falls
/// outside the representable range.
pub fn resolve_window(reference: DateTime<Utc>, window: &Window) -> Result<WindowBounds> {
    let invalid = || TrackingError::InvalidOffset {
        start: window.start,
        end: window.end,
    };
    if !window.is_ordered() {
        return Err(invalid());
    }
    let start = reference.checked_add_signed(window.start).ok_or_else(invalid)?;
    let end = reference.checked_add_signed(window.end).ok_or_else(invalid)?;
    Ok(WindowBounds { start, end })
}

/// Whether `instant` lies within `[start, end)` or `[start, end]`.
pub fn contains(instant: DateTime<Utc>, bounds: &WindowBounds, end: EndBound) -> bool {
    if instant < bounds.start {
        return false;
    }
    match end {
        EndBound::Open => instant < bounds.end,
        EndBound::Closed => instant <= bounds.end,
    }
}
