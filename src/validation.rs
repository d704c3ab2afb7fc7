//! Integrity checks for fetched board snapshots.
//!
//! Checks structural integrity of technicians and appointments as returned
//! by the backend. Detects:
//! - Duplicate IDs
//! - Missing technician references (primary or crew)
//! - Empty or inverted intervals
//! - Unassigned appointments that are already dispatched or later
//!
//! Problems are reported, not fixed; the store decides how to repair what
//! it can (see [`AppointmentStore::replace`](crate::store::AppointmentStore::replace)).

use crate::models::{Appointment, Technician};
use std::collections::HashSet;

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// Two entities share the same ID.
    DuplicateId,
    /// An appointment references a technician that doesn't exist.
    InvalidTechnicianReference,
    /// `end` is not after `start`.
    InvalidInterval,
    /// An unassigned appointment is dispatched, arrived, or in progress.
    UnassignedUnderway,
}

impl ValidationError {
    fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Validates a board snapshot.
///
/// Checks:
/// 1. No duplicate technician IDs
/// 2. No duplicate appointment IDs
/// 3. Every primary and crew technician reference exists
/// 4. Every interval has `end > start`
/// 5. No unassigned appointment is past `scheduled` (unless terminal)
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_snapshot(technicians: &[Technician], appointments: &[Appointment]) -> ValidationResult {
    let mut errors = Vec::new();

    // Collect technician IDs
    let mut technician_ids = HashSet::new();
    for t in technicians {
        if !technician_ids.insert(t.id.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate technician ID: {}", t.id),
            ));
        }
    }

    let mut appointment_ids = HashSet::new();
    for appt in appointments {
        if !appointment_ids.insert(appt.id.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate appointment ID: {}", appt.id),
            ));
        }

        if appt.end <= appt.start {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidInterval,
                format!(
                    "Appointment '{}' ends at {} which is not after its start {}",
                    appt.id, appt.end, appt.start
                ),
            ));
        }

        let refs = appt.technician_id.iter().chain(appt.crew.iter());
        for tech in refs {
            if !technician_ids.contains(tech.as_str()) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::InvalidTechnicianReference,
                    format!(
                        "Appointment '{}' references unknown technician '{}'",
                        appt.id, tech
                    ),
                ));
            }
        }

        if appt.is_unassigned() && appt.status.is_underway() && !appt.status.is_terminal() {
            errors.push(ValidationError::new(
                ValidationErrorKind::UnassignedUnderway,
                format!("Appointment '{}' is {} but unassigned", appt.id, appt.status),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
