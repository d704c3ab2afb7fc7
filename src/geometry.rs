//! Time ↔ pixel mapping.
//!
//! A [`TimeAxis`] maps the visible [`TimeWindow`] onto `[0, total_width]`
//! pixels at a fixed number of pixels per hour. The two directions are
//! inverse up to millisecond rounding; snapping happens separately so that
//! previews can show exact pointer positions while commits are snapped.
//!
//! Timestamps outside the window are clamped to the window bounds, and
//! pixel offsets outside `[0, total_width]` are clamped the same way.

use chrono::{DateTime, Duration, Utc};

use crate::error::{DispatchError, Result};
use crate::models::TimeWindow;

const MS_PER_HOUR: f64 = 3_600_000.0;

/// Rounds `minutes` to the nearest multiple of `granularity`.
///
/// Halves round toward positive infinity, so a drag of exactly half a step
/// in either direction resolves the same way. A non-positive granularity
/// only rounds to whole minutes.
pub fn snap_minutes(minutes: f64, granularity: i64) -> i64 {
    if granularity <= 0 {
        return (minutes + 0.5).floor() as i64;
    }
    let g = granularity as f64;
    ((minutes / g + 0.5).floor() * g) as i64
}

/// Horizontal time axis for one visible window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeAxis {
    window: TimeWindow,
    px_per_hour: f64,
}

impl TimeAxis {
    /// Creates an axis over `window` at `px_per_hour`.
    ///
    /// # Errors
    /// `InvalidScale` if `px_per_hour` is not positive, `InvalidWindow` if
    /// the window is empty or inverted.
    pub fn new(window: TimeWindow, px_per_hour: f64) -> Result<Self> {
        if px_per_hour.is_nan() || px_per_hour <= 0.0 {
            return Err(DispatchError::InvalidScale(px_per_hour));
        }
        let window = TimeWindow::checked(window.start, window.end)?;
        Ok(Self {
            window,
            px_per_hour,
        })
    }

    /// The visible window.
    #[inline]
    pub fn window(&self) -> TimeWindow {
        self.window
    }

    /// Pixels per hour.
    #[inline]
    pub fn px_per_hour(&self) -> f64 {
        self.px_per_hour
    }

    /// Width of the whole window in pixels.
    pub fn total_width(&self) -> f64 {
        self.window.duration().num_milliseconds() as f64 / MS_PER_HOUR * self.px_per_hour
    }

    /// Pixel offset of `t`, clamped to the window.
    pub fn time_to_x(&self, t: DateTime<Utc>) -> f64 {
        let t = self.window.clamp(t);
        let ms = (t - self.window.start).num_milliseconds() as f64;
        ms / MS_PER_HOUR * self.px_per_hour
    }

    /// Timestamp at pixel offset `x`, clamped to the window.
    pub fn x_to_time(&self, x: f64) -> DateTime<Utc> {
        let x = x.clamp(0.0, self.total_width());
        let ms = (x / self.px_per_hour * MS_PER_HOUR).round() as i64;
        self.window.start + Duration::milliseconds(ms)
    }

    /// Minutes represented by a horizontal distance.
    #[inline]
    pub fn px_to_minutes(&self, dx: f64) -> f64 {
        dx / self.px_per_hour * 60.0
    }

    /// Pixels represented by a number of minutes.
    #[inline]
    pub fn minutes_to_px(&self, minutes: f64) -> f64 {
        minutes / 60.0 * self.px_per_hour
    }

    /// Snapped time offset for a horizontal drag of `dx` pixels.
    pub fn snap_delta(&self, dx: f64, granularity: i64) -> Duration {
        Duration::minutes(snap_minutes(self.px_to_minutes(dx), granularity))
    }

    /// Snaps `t` to the granularity grid anchored at the window start.
    pub fn snap_time(&self, t: DateTime<Utc>, granularity: i64) -> DateTime<Utc> {
        let minutes = (t - self.window.start).num_milliseconds() as f64 / 60_000.0;
        self.window.start + Duration::minutes(snap_minutes(minutes, granularity))
    }

    /// Horizontal extent `(left, width)` of an interval, clipped to the window.
    pub fn span(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> (f64, f64) {
        let left = self.time_to_x(start);
        let right = self.time_to_x(end);
        (left, (right - left).max(0.0))
    }
}
