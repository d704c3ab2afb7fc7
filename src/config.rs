//! Board configuration.
//!
//! All geometry is in CSS-style pixels, all durations in minutes unless the
//! field name says otherwise. Defaults match a day view at 80 px per hour
//! with 15-minute snapping.

use serde::{Deserialize, Serialize};

use crate::error::{DispatchError, Result};

/// Tunables for layout, gestures, auto-scroll and persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    /// Horizontal pixels per hour of time.
    pub px_per_hour: f64,
    /// Default snapping granularity (minutes).
    pub snap_minutes: i64,
    /// Snapping granularity while the coarse modifier is held (minutes).
    pub coarse_snap_minutes: i64,
    /// Shortest duration an appointment can be moved or resized to (minutes).
    pub min_duration_minutes: i64,
    /// Pointer travel needed before a press becomes a drag (px).
    pub drag_activation_px: f64,
    /// Height of one appointment card (px).
    pub item_height_px: f64,
    /// Vertical gap between stacked lanes (px).
    pub lane_gap_px: f64,
    /// Extra vertical padding per technician row (px).
    pub row_padding_px: f64,
    /// Distance from a viewport edge at which auto-scroll starts (px).
    pub auto_scroll_margin_px: f64,
    /// Auto-scroll speed at the very edge (px per frame).
    pub auto_scroll_max_speed_px: f64,
    /// Auto-scroll frame interval (ms).
    pub auto_scroll_frame_ms: u64,
    /// Upper bound on a single persistence call (ms).
    pub persist_timeout_ms: u64,
    /// Length of a working day for utilization metrics (minutes).
    pub workday_minutes: i64,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            px_per_hour: 80.0,
            snap_minutes: 15,
            coarse_snap_minutes: 60,
            min_duration_minutes: 15,
            drag_activation_px: 5.0,
            item_height_px: 48.0,
            lane_gap_px: 4.0,
            row_padding_px: 8.0,
            auto_scroll_margin_px: 160.0,
            auto_scroll_max_speed_px: 45.0,
            auto_scroll_frame_ms: 16,
            persist_timeout_ms: 15_000,
            workday_minutes: 8 * 60,
        }
    }
}

impl BoardConfig {
    /// Parses a JSON document; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Sets the horizontal scale.
    pub fn with_px_per_hour(mut self, px_per_hour: f64) -> Self {
        self.px_per_hour = px_per_hour;
        self
    }

    /// Sets the default and coarse snapping granularities.
    pub fn with_snap(mut self, snap_minutes: i64, coarse_snap_minutes: i64) -> Self {
        self.snap_minutes = snap_minutes;
        self.coarse_snap_minutes = coarse_snap_minutes;
        self
    }

    /// Sets the minimum appointment duration.
    pub fn with_min_duration(mut self, minutes: i64) -> Self {
        self.min_duration_minutes = minutes;
        self
    }

    /// Sets the drag activation distance.
    pub fn with_drag_activation(mut self, px: f64) -> Self {
        self.drag_activation_px = px;
        self
    }

    /// Sets the card height, lane gap and row padding.
    pub fn with_lane_geometry(mut self, item_height_px: f64, gap_px: f64, padding_px: f64) -> Self {
        self.item_height_px = item_height_px;
        self.lane_gap_px = gap_px;
        self.row_padding_px = padding_px;
        self
    }

    /// Sets the auto-scroll margin and maximum speed.
    pub fn with_auto_scroll(mut self, margin_px: f64, max_speed_px: f64) -> Self {
        self.auto_scroll_margin_px = margin_px;
        self.auto_scroll_max_speed_px = max_speed_px;
        self
    }

    /// Sets the persistence timeout.
    pub fn with_persist_timeout_ms(mut self, ms: u64) -> Self {
        self.persist_timeout_ms = ms;
        self
    }

    /// Snapping granularity for the given modifier state.
    #[inline]
    pub fn granularity(&self, coarse: bool) -> i64 {
        if coarse {
            self.coarse_snap_minutes
        } else {
            self.snap_minutes
        }
    }

    /// Minimum duration as a `chrono::Duration`.
    #[inline]
    pub fn min_duration(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.min_duration_minutes)
    }

    /// Checks that every value is usable.
    pub fn validate(&self) -> Result<()> {
        if self.px_per_hour.is_nan() || self.px_per_hour <= 0.0 {
            return Err(DispatchError::InvalidScale(self.px_per_hour));
        }
        if self.snap_minutes <= 0 {
            return Err(DispatchError::InvalidGranularity(self.snap_minutes));
        }
        if self.coarse_snap_minutes <= 0 {
            return Err(DispatchError::InvalidGranularity(self.coarse_snap_minutes));
        }
        if self.min_duration_minutes <= 0 {
            return Err(DispatchError::Config(format!(
                "min_duration_minutes must be positive, got {}",
                self.min_duration_minutes
            )));
        }
        if self.drag_activation_px < 0.0 {
            return Err(DispatchError::Config(format!(
                "drag_activation_px must not be negative, got {}",
                self.drag_activation_px
            )));
        }
        if self.auto_scroll_margin_px <= 0.0 || self.auto_scroll_max_speed_px < 0.0 {
            return Err(DispatchError::Config(
                "auto-scroll margin must be positive and max speed non-negative".into(),
            ));
        }
        if self.auto_scroll_frame_ms == 0 {
            return Err(DispatchError::Config(
                "auto_scroll_frame_ms must be positive".into(),
            ));
        }
        Ok(())
    }
}
