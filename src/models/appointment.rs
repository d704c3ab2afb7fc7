//! Appointment model.
//!
//! An appointment is the schedulable unit on the board: a half-open time
//! interval, optionally linked to a backing job, assigned to at most one
//! primary technician (plus optional crew). Lane packing and geometry only
//! ever look at the primary technician.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::TimeWindow;

/// A scheduled, time-bounded unit of work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    /// Unique appointment (schedule entry) identifier.
    pub id: String,
    /// Backing job record, if any.
    #[serde(default)]
    pub job_id: Option<String>,
    /// Short title shown on the card.
    #[serde(default)]
    pub title: String,
    /// Start time (inclusive).
    pub start: DateTime<Utc>,
    /// End time (exclusive).
    pub end: DateTime<Utc>,
    /// Primary technician. `None` = unassigned.
    #[serde(default)]
    pub technician_id: Option<String>,
    /// Secondary participants. Not used for layout.
    #[serde(default)]
    pub crew: Vec<String>,
    /// Lifecycle status.
    #[serde(default)]
    pub status: AppointmentStatus,
    /// Presentation priority. Never used for packing.
    #[serde(default)]
    pub priority: Priority,
    /// Archived appointments are terminal and hidden from the board.
    #[serde(default)]
    pub archived: bool,
}

/// Lifecycle status of an appointment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AppointmentStatus {
    #[default]
    Scheduled,
    Dispatched,
    Arrived,
    InProgress,
    Closed,
    Completed,
    Cancelled,
}

/// Presentation priority.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

/// Where an appointment sits on the board: technician and interval.
///
/// Gestures propose a new placement; the coordinator compares it with the
/// old one to decide which persistence calls are needed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Placement {
    /// Primary technician. `None` = unassigned.
    pub technician_id: Option<String>,
    /// Start time (inclusive).
    pub start: DateTime<Utc>,
    /// End time (exclusive).
    pub end: DateTime<Utc>,
}

impl Appointment {
    /// Creates an unassigned, scheduled appointment.
    pub fn new(id: impl Into<String>, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            job_id: None,
            title: String::new(),
            start,
            end,
            technician_id: None,
            crew: Vec::new(),
            status: AppointmentStatus::Scheduled,
            priority: Priority::Medium,
            archived: false,
        }
    }

    /// Links a backing job.
    pub fn with_job(mut self, job_id: impl Into<String>) -> Self {
        self.job_id = Some(job_id.into());
        self
    }

    /// Sets the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Assigns the primary technician.
    pub fn assigned_to(mut self, technician_id: impl Into<String>) -> Self {
        self.technician_id = Some(technician_id.into());
        self
    }

    /// Adds a secondary participant.
    pub fn with_crew_member(mut self, technician_id: impl Into<String>) -> Self {
        self.crew.push(technician_id.into());
        self
    }

    /// Sets the status.
    pub fn with_status(mut self, status: AppointmentStatus) -> Self {
        self.status = status;
        self
    }

    /// Sets the priority.
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Whether no primary technician is assigned.
    #[inline]
    pub fn is_unassigned(&self) -> bool {
        self.technician_id.is_none()
    }

    /// Whether this appointment belongs to the given technician's row.
    #[inline]
    pub fn is_assigned_to(&self, technician_id: &str) -> bool {
        self.technician_id.as_deref() == Some(technician_id)
    }

    /// Duration (end - start).
    #[inline]
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// The appointment's interval.
    #[inline]
    pub fn window(&self) -> TimeWindow {
        TimeWindow::new(self.start, self.end)
    }

    /// Current placement.
    pub fn placement(&self) -> Placement {
        Placement {
            technician_id: self.technician_id.clone(),
            start: self.start,
            end: self.end,
        }
    }

    /// Overwrites technician and interval from a placement.
    pub fn set_placement(&mut self, placement: &Placement) {
        self.technician_id = placement.technician_id.clone();
        self.start = placement.start;
        self.end = placement.end;
    }

    /// Extends `end` so the appointment lasts at least `min`.
    ///
    /// Returns `true` if the interval was changed.
    pub fn enforce_min_duration(&mut self, min: Duration) -> bool {
        if self.duration() < min {
            self.end = self.start + min;
            true
        } else {
            false
        }
    }
}

impl Placement {
    /// Creates a placement.
    pub fn new(technician_id: Option<String>, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            technician_id,
            start,
            end,
        }
    }

    /// Duration (end - start).
    #[inline]
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Whether start or end differ from `other`.
    pub fn time_differs(&self, other: &Self) -> bool {
        self.start != other.start || self.end != other.end
    }

    /// Whether the technician differs from `other`.
    pub fn technician_differs(&self, other: &Self) -> bool {
        self.technician_id != other.technician_id
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Scheduled => "scheduled",
            Self::Dispatched => "dispatched",
            Self::Arrived => "arrived",
            Self::InProgress => "in-progress",
            Self::Closed => "closed",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, h, m, 0).unwrap()
    }

    #[test]
    fn test_appointment_builder() {
        let a = Appointment::new("A1", at(9, 0), at(10, 30))
            .with_job("J1")
            .with_title("Furnace tune-up")
            .assigned_to("T1")
            .with_crew_member("T2")
            .with_status(AppointmentStatus::Dispatched)
            .with_priority(Priority::Urgent);

        assert_eq!(a.id, "A1");
        assert_eq!(a.job_id.as_deref(), Some("J1"));
        assert!(a.is_assigned_to("T1"));
        assert!(!a.is_assigned_to("T2"));
        assert!(!a.is_unassigned());
        assert_eq!(a.crew, vec!["T2"]);
        assert_eq!(a.duration(), Duration::minutes(90));
        assert_eq!(a.status, AppointmentStatus::Dispatched);
        assert_eq!(a.priority, Priority::Urgent);
    }

    #[test]
    fn test_new_is_unassigned_and_scheduled() {
        let a = Appointment::new("A1", at(9, 0), at(10, 0));
        assert!(a.is_unassigned());
        assert_eq!(a.status, AppointmentStatus::Scheduled);
        assert!(!a.archived);
    }

    #[test]
    fn test_placement_roundtrip() {
        let mut a = Appointment::new("A1", at(9, 0), at(10, 0)).assigned_to("T1");
        let p = Placement::new(None, at(11, 0), at(12, 0));
        a.set_placement(&p);
        assert!(a.is_unassigned());
        assert_eq!(a.placement(), p);
    }

    #[test]
    fn test_placement_differences() {
        let a = Placement::new(Some("T1".into()), at(9, 0), at(10, 0));
        let b = Placement::new(Some("T2".into()), at(9, 0), at(10, 0));
        let c = Placement::new(Some("T1".into()), at(9, 15), at(10, 15));
        assert!(a.technician_differs(&b));
        assert!(!a.time_differs(&b));
        assert!(a.time_differs(&c));
        assert!(!a.technician_differs(&c));
    }

    #[test]
    fn test_enforce_min_duration() {
        let mut inverted = Appointment::new("A1", at(10, 0), at(9, 0));
        assert!(inverted.enforce_min_duration(Duration::minutes(15)));
        assert_eq!(inverted.end, at(10, 15));

        let mut ok = Appointment::new("A2", at(9, 0), at(10, 0));
        assert!(!ok.enforce_min_duration(Duration::minutes(15)));
        assert_eq!(ok.end, at(10, 0));
    }

    #[test]
    fn test_status_serde() {
        let json = serde_json::to_string(&AppointmentStatus::InProgress).unwrap();
        assert_eq!(json, "\"in-progress\"");
        let p: Priority = serde_json::from_str("\"urgent\"").unwrap();
        assert_eq!(p, Priority::Urgent);
    }

    #[test]
    fn test_minimal_json() {
        let json = r#"{ "id": "A1", "start": "2025-03-10T09:00:00Z", "end": "2025-03-10T10:00:00Z" }"#;
        let a: Appointment = serde_json::from_str(json).unwrap();
        assert_eq!(a, Appointment::new("A1", at(9, 0), at(10, 0)));
    }

    #[test]
    fn test_appointment_json() {
        let a = Appointment::new("A1", at(9, 0), at(10, 0)).assigned_to("T1");
        let json = serde_json::to_string(&a).unwrap();
        let back: Appointment = serde_json::from_str(&json).unwrap();
        assert_eq!(a, back);
    }
}
