//! Local appointment cache.
//!
//! One [`AppointmentStore`] is owned by each engine. It is mutated by
//! gesture previews, optimistic commits, and full-replacement refreshes;
//! everything else reads from it. Technicians are kept in row order and
//! appointments in the order the backend returned them.

use chrono::Duration;
use tracing::debug;

use crate::error::{DispatchError, Result};
use crate::models::{Appointment, Placement, Technician};

/// Technicians and appointments currently shown on the board.
#[derive(Debug, Clone, Default)]
pub struct AppointmentStore {
    technicians: Vec<Technician>,
    appointments: Vec<Appointment>,
}

impl AppointmentStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Technicians in row order.
    pub fn technicians(&self) -> &[Technician] {
        &self.technicians
    }

    /// Appointments in backend order.
    pub fn appointments(&self) -> &[Appointment] {
        &self.appointments
    }

    /// Looks up an appointment.
    pub fn get(&self, id: &str) -> Option<&Appointment> {
        self.appointments.iter().find(|a| a.id == id)
    }

    /// Looks up an appointment for mutation.
    pub fn get_mut(&mut self, id: &str) -> Option<&mut Appointment> {
        self.appointments.iter_mut().find(|a| a.id == id)
    }

    /// Looks up an appointment, failing with `UnknownAppointment`.
    pub fn require(&self, id: &str) -> Result<&Appointment> {
        self.get(id)
            .ok_or_else(|| DispatchError::UnknownAppointment(id.to_string()))
    }

    /// Looks up an appointment that may still be moved.
    ///
    /// # Errors
    /// `UnknownAppointment`, or `Locked` if it is archived or finished.
    pub fn require_movable(&self, id: &str) -> Result<&Appointment> {
        let appt = self.require(id)?;
        if appt.is_locked() {
            return Err(DispatchError::Locked(id.to_string()));
        }
        Ok(appt)
    }

    /// Looks up a technician.
    pub fn technician(&self, id: &str) -> Option<&Technician> {
        self.technicians.iter().find(|t| t.id == id)
    }

    /// Row index of a technician.
    pub fn technician_index(&self, id: &str) -> Option<usize> {
        self.technicians.iter().position(|t| t.id == id)
    }

    /// Technician `step` rows away from `from`, if any.
    pub fn neighbour_technician(&self, from: &str, step: i32) -> Option<&Technician> {
        let index = self.technician_index(from)? as i64 + step as i64;
        if index < 0 {
            return None;
        }
        self.technicians.get(index as usize)
    }

    /// Overwrites an appointment's placement. Returns the previous one.
    ///
    /// # Errors
    /// `UnknownAppointment` if the id is not cached, `UnknownTechnician` if
    /// the placement names a technician without a row.
    pub fn set_placement(&mut self, id: &str, placement: &Placement) -> Result<Placement> {
        if let Some(tech) = placement.technician_id.as_deref() {
            if self.technician(tech).is_none() {
                return Err(DispatchError::UnknownTechnician(tech.to_string()));
            }
        }
        let appt = self
            .get_mut(id)
            .ok_or_else(|| DispatchError::UnknownAppointment(id.to_string()))?;
        let previous = appt.placement();
        appt.set_placement(placement);
        Ok(previous)
    }

    /// Replaces the whole cache with a fetched snapshot.
    ///
    /// Duplicate appointment ids keep their first copy. Intervals that are
    /// empty or inverted are extended to `min_duration`.
    pub fn replace(
        &mut self,
        technicians: Vec<Technician>,
        appointments: Vec<Appointment>,
        min_duration: Duration,
    ) {
        let mut kept: Vec<Appointment> = Vec::with_capacity(appointments.len());
        for mut appt in appointments {
            if kept.iter().any(|a| a.id == appt.id) {
                debug!(appointment_id = %appt.id, "dropping duplicate appointment");
                continue;
            }
            if appt.duration() <= Duration::zero() && appt.enforce_min_duration(min_duration) {
                debug!(appointment_id = %appt.id, "normalized empty interval");
            }
            kept.push(appt);
        }

        let mut techs: Vec<Technician> = Vec::with_capacity(technicians.len());
        for tech in technicians {
            if !techs.iter().any(|t| t.id == tech.id) {
                techs.push(tech);
            }
        }

        self.technicians = techs;
        self.appointments = kept;
    }

    /// Ids of unassigned appointments that are still open, in backend
    /// order.
    pub fn unassigned_ids(&self) -> Vec<&str> {
        self.appointments
            .iter()
            .filter(|a| a.is_unassigned() && !a.is_locked())
            .map(|a| a.id.as_str())
            .collect()
    }
}
