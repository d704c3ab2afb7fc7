//! Board geometry: one row per technician, one card per appointment.
//!
//! Rows are sized independently from their own lane count:
//! `(max_lane + 1) * (item_height + gap) + padding`. The layout is derived
//! state and is recomputed from scratch whenever appointments or the
//! visible window change.

use chrono::{DateTime, Utc};

use super::lanes::{max_lane, pack_lanes, Span};
use crate::config::BoardConfig;
use crate::geometry::TimeAxis;
use crate::models::{Appointment, Technician};

/// Geometry of one appointment card.
#[derive(Debug, Clone, PartialEq)]
pub struct LaneItem {
    /// Appointment identifier.
    pub appointment_id: String,
    /// Appointment start.
    pub start: DateTime<Utc>,
    /// Appointment end.
    pub end: DateTime<Utc>,
    /// Left edge within the timeline (px).
    pub left: f64,
    /// Card width (px).
    pub width: f64,
    /// Top edge within the row (px).
    pub top: f64,
    /// Lane index within the row.
    pub lane: usize,
    /// Whether the card overlaps another on the same row.
    pub has_overlap: bool,
}

/// One technician's row.
#[derive(Debug, Clone, PartialEq)]
pub struct TechnicianRow {
    /// Technician identifier.
    pub technician_id: String,
    /// Top edge within the board (px).
    pub top: f64,
    /// Row height (px).
    pub height: f64,
    /// Highest lane index used on the row.
    pub max_lane: usize,
    /// Cards in the order their appointments were supplied.
    pub items: Vec<LaneItem>,
}

/// Layout of every technician row for one visible window.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoardLayout {
    /// Rows in technician order.
    pub rows: Vec<TechnicianRow>,
}

/// Height of a row whose highest lane index is `max_lane`.
pub fn row_height(max_lane: usize, config: &BoardConfig) -> f64 {
    (max_lane as f64 + 1.0) * (config.item_height_px + config.lane_gap_px) + config.row_padding_px
}

impl BoardLayout {
    /// Lays out `appointments` against `technicians` on `axis`.
    ///
    /// Unassigned, archived, and out-of-window appointments get no card.
    /// Appointments referencing an unknown technician are ignored.
    pub fn compute(
        technicians: &[Technician],
        appointments: &[Appointment],
        axis: &TimeAxis,
        config: &BoardConfig,
    ) -> Self {
        let window = axis.window();
        let lane_pitch = config.item_height_px + config.lane_gap_px;
        let mut rows = Vec::with_capacity(technicians.len());
        let mut top = 0.0;

        for tech in technicians {
            let members: Vec<&Appointment> = appointments
                .iter()
                .filter(|a| !a.archived && a.is_assigned_to(&tech.id))
                .filter(|a| a.window().overlaps(&window))
                .collect();

            let geometry: Vec<(f64, f64)> =
                members.iter().map(|a| axis.span(a.start, a.end)).collect();
            let spans: Vec<Span> = geometry
                .iter()
                .map(|&(left, width)| Span::new(left, left + width))
                .collect();
            let slots = pack_lanes(&spans);
            let max = max_lane(&slots);

            let items = members
                .iter()
                .zip(geometry.iter().zip(slots.iter()))
                .map(|(a, (&(left, width), slot))| LaneItem {
                    appointment_id: a.id.clone(),
                    start: a.start,
                    end: a.end,
                    left,
                    width,
                    top: config.row_padding_px / 2.0 + slot.lane as f64 * lane_pitch,
                    lane: slot.lane,
                    has_overlap: slot.has_overlap,
                })
                .collect();

            let height = row_height(max, config);
            rows.push(TechnicianRow {
                technician_id: tech.id.clone(),
                top,
                height,
                max_lane: max,
                items,
            });
            top += height;
        }

        Self { rows }
    }

    /// Row for a technician.
    pub fn row(&self, technician_id: &str) -> Option<&TechnicianRow> {
        self.rows.iter().find(|r| r.technician_id == technician_id)
    }

    /// Card for an appointment, with the row it sits on.
    pub fn item(&self, appointment_id: &str) -> Option<(&TechnicianRow, &LaneItem)> {
        self.rows.iter().find_map(|row| {
            row.items
                .iter()
                .find(|i| i.appointment_id == appointment_id)
                .map(|i| (row, i))
        })
    }

    /// Technician whose row contains the vertical offset `y`.
    pub fn technician_at(&self, y: f64) -> Option<&str> {
        self.rows
            .iter()
            .find(|r| y >= r.top && y < r.top + r.height)
            .map(|r| r.technician_id.as_str())
    }

    /// Sum of all row heights.
    pub fn total_height(&self) -> f64 {
        self.rows.iter().map(|r| r.height).sum()
    }

    /// Number of cards flagged as overlapping.
    pub fn conflict_count(&self) -> usize {
        self.rows
            .iter()
            .flat_map(|r| r.items.iter())
            .filter(|i| i.has_overlap)
            .count()
    }
}
