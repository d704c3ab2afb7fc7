//! Board summary metrics.
//!
//! Computes the header figures of a dispatch board from a computed layout.
//!
//! # Metrics
//!
//! | Metric | Definition |
//! |--------|-----------|
//! | Appointments | Cards placed on technician rows |
//! | Conflicts | Cards flagged `has_overlap` |
//! | Booked minutes | Card time inside the visible window, per technician |
//! | Utilization | Booked minutes / workday minutes, per technician |
//! | Board utilization | Total booked / (rows × workday) |

use std::collections::HashMap;

use super::BoardLayout;
use crate::models::TimeWindow;

/// Dispatch board summary.
#[derive(Debug, Clone)]
pub struct BoardMetrics {
    /// Cards placed on technician rows.
    pub appointment_count: usize,
    /// Cards that overlap another card on their row.
    pub conflict_count: usize,
    /// Booked minutes inside the window, per technician.
    pub booked_minutes_by_technician: HashMap<String, i64>,
    /// Booked minutes / workday, per technician.
    pub utilization_by_technician: HashMap<String, f64>,
    /// Total booked minutes / (technicians × workday).
    pub board_utilization: f64,
}

impl BoardMetrics {
    /// Computes metrics for `layout` over `window`.
    ///
    /// # Arguments
    /// * `layout` - A computed board layout.
    /// * `window` - The visible window; card time outside it is not counted.
    /// * `workday_minutes` - Working minutes per technician (typically 480).
    pub fn calculate(layout: &BoardLayout, window: &TimeWindow, workday_minutes: i64) -> Self {
        let mut appointment_count = 0;
        let mut conflict_count = 0;
        let mut booked: HashMap<String, i64> = HashMap::new();

        for row in &layout.rows {
            let entry = booked.entry(row.technician_id.clone()).or_insert(0);
            for item in &row.items {
                appointment_count += 1;
                if item.has_overlap {
                    conflict_count += 1;
                }
                if let Some(clipped) = window.intersection(&TimeWindow::new(item.start, item.end)) {
                    *entry += clipped.duration_minutes();
                }
            }
        }

        let utilization_by_technician = if workday_minutes > 0 {
            booked
                .iter()
                .map(|(id, &mins)| (id.clone(), mins as f64 / workday_minutes as f64))
                .collect()
        } else {
            HashMap::new()
        };

        let capacity = layout.rows.len() as i64 * workday_minutes;
        let board_utilization = if capacity > 0 {
            booked.values().sum::<i64>() as f64 / capacity as f64
        } else {
            0.0
        };

        Self {
            appointment_count,
            conflict_count,
            booked_minutes_by_technician: booked,
            utilization_by_technician,
            board_utilization,
        }
    }

    /// Whether the board is within the given limits.
    pub fn meets_thresholds(&self, max_conflicts: usize, min_utilization: f64) -> bool {
        self.conflict_count <= max_conflicts && self.board_utilization >= min_utilization
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BoardConfig;
    use crate::geometry::TimeAxis;
    use crate::models::{Appointment, Technician};
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, h, m, 0).unwrap()
    }

    fn layout_for(appts: &[Appointment], window: TimeWindow) -> BoardLayout {
        let techs = vec![Technician::new("T1"), Technician::new("T2")];
        let axis = TimeAxis::new(window, 80.0).unwrap();
        BoardLayout::compute(&techs, appts, &axis, &BoardConfig::default())
    }

    #[test]
    fn test_metrics_basic() {
        let window = TimeWindow::new(at(0, 0), at(0, 0) + Duration::days(1));
        let appts = vec![
            Appointment::new("A", at(8, 0), at(12, 0)).assigned_to("T1"),
            Appointment::new("B", at(13, 0), at(15, 0)).assigned_to("T1"),
            Appointment::new("C", at(9, 0), at(11, 0)).assigned_to("T2"),
        ];
        let m = BoardMetrics::calculate(&layout_for(&appts, window), &window, 480);

        assert_eq!(m.appointment_count, 3);
        assert_eq!(m.conflict_count, 0);
        assert_eq!(m.booked_minutes_by_technician["T1"], 360);
        assert_eq!(m.booked_minutes_by_technician["T2"], 120);
        assert!((m.utilization_by_technician["T1"] - 0.75).abs() < 1e-10);
        assert!((m.utilization_by_technician["T2"] - 0.25).abs() < 1e-10);
        // 480 / 960
        assert!((m.board_utilization - 0.5).abs() < 1e-10);
    }

    #[test]
    fn test_metrics_conflicts() {
        let window = TimeWindow::new(at(0, 0), at(0, 0) + Duration::days(1));
        let appts = vec![
            Appointment::new("A", at(9, 0), at(10, 0)).assigned_to("T1"),
            Appointment::new("B", at(9, 30), at(10, 30)).assigned_to("T1"),
        ];
        let m = BoardMetrics::calculate(&layout_for(&appts, window), &window, 480);
        assert_eq!(m.conflict_count, 2);
        assert!(m.meets_thresholds(2, 0.0));
        assert!(!m.meets_thresholds(1, 0.0));
    }

    #[test]
    fn test_metrics_clip_to_window() {
        let window = TimeWindow::new(at(8, 0), at(12, 0));
        let appts = vec![Appointment::new("A", at(7, 0), at(9, 0)).assigned_to("T1")];
        let m = BoardMetrics::calculate(&layout_for(&appts, window), &window, 480);
        assert_eq!(m.booked_minutes_by_technician["T1"], 60);
    }

    #[test]
    fn test_metrics_empty() {
        let window = TimeWindow::new(at(8, 0), at(12, 0));
        let m = BoardMetrics::calculate(&BoardLayout::default(), &window, 480);
        assert_eq!(m.appointment_count, 0);
        assert!((m.board_utilization - 0.0).abs() < 1e-10);
        assert!(m.utilization_by_technician.is_empty());
    }

    #[test]
    fn test_metrics_zero_workday() {
        let window = TimeWindow::new(at(0, 0), at(0, 0) + Duration::days(1));
        let appts = vec![Appointment::new("A", at(8, 0), at(9, 0)).assigned_to("T1")];
        let m = BoardMetrics::calculate(&layout_for(&appts, window), &window, 0);
        assert!(m.utilization_by_technician.is_empty());
        assert!((m.board_utilization - 0.0).abs() < 1e-10);
    }
}
