//! Error types.
//!
//! `DispatchError` covers failures detected locally, before anything is
//! sent to the backend. Failures reported by the backend itself are
//! [`RemoteError`](crate::commit::RemoteError) and never surface here.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::{AppointmentStatus, StatusCommand};

pub type Result<T> = std::result::Result<T, DispatchError>;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("pixels per hour must be positive, got {0}")]
    InvalidScale(f64),

    #[error("snap granularity must be positive, got {0} minutes")]
    InvalidGranularity(i64),

    #[error("invalid time window: end {end} is not after start {start}")]
    InvalidWindow {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("unknown appointment: {0}")]
    UnknownAppointment(String),

    #[error("unknown technician: {0}")]
    UnknownTechnician(String),

    #[error("a gesture is already active on appointment {0}")]
    GestureActive(String),

    #[error("appointment {0} is archived or finished and cannot be moved")]
    Locked(String),

    #[error("{command} is not available for appointment {appointment_id} ({status})")]
    CommandUnavailable {
        appointment_id: String,
        command: StatusCommand,
        status: AppointmentStatus,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DispatchError {
    /// Whether this error means a gesture referenced state that no longer
    /// exists. These abort the gesture and are not shown to the operator.
    #[must_use]
    pub fn is_gesture_integrity(&self) -> bool {
        matches!(
            self,
            Self::UnknownAppointment(_) | Self::UnknownTechnician(_)
        )
    }
}
