//! Appointment status lifecycle.
//!
//! ```text
//! scheduled ──dispatch──▶ dispatched ──arrive──▶ arrived / in-progress ──┬─close────▶ closed
//!                                                                        └─complete─▶ completed
//!
//! any non-terminal ──cancel──▶ cancelled
//! any non-terminal ──archive─▶ (archived flag)
//! scheduled + assigned ──unassign──▶ scheduled + unassigned
//! ```
//!
//! Commands are offered only when they are valid, so an invalid command is
//! never sent. The backend still re-validates.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{Appointment, AppointmentStatus};

/// An explicit operator command on an appointment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusCommand {
    Dispatch,
    Arrive,
    Close,
    Complete,
    Cancel,
    Archive,
    Unassign,
}

impl StatusCommand {
    /// Every command, in menu order.
    pub const ALL: [StatusCommand; 7] = [
        Self::Dispatch,
        Self::Arrive,
        Self::Close,
        Self::Complete,
        Self::Cancel,
        Self::Archive,
        Self::Unassign,
    ];
}

impl AppointmentStatus {
    /// Whether no further transition is possible.
    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Closed | Self::Completed | Self::Cancelled)
    }

    /// Whether the appointment has reached the field (dispatched or later).
    ///
    /// Such appointments cannot be unassigned.
    #[inline]
    pub fn is_underway(self) -> bool {
        !matches!(self, Self::Scheduled)
    }

    /// Status after applying `command`, or `None` if not allowed.
    ///
    /// `Archive` and `Unassign` leave the status unchanged.
    pub fn after(self, command: StatusCommand) -> Option<AppointmentStatus> {
        use AppointmentStatus::*;
        match (self, command) {
            (Scheduled, StatusCommand::Dispatch) => Some(Dispatched),
            (Dispatched, StatusCommand::Arrive) => Some(Arrived),
            (Arrived | InProgress, StatusCommand::Close) => Some(Closed),
            (Arrived | InProgress, StatusCommand::Complete) => Some(Completed),
            (s, StatusCommand::Cancel) if !s.is_terminal() => Some(Cancelled),
            (s, StatusCommand::Archive) if !s.is_terminal() => Some(s),
            (Scheduled, StatusCommand::Unassign) => Some(Scheduled),
            _ => None,
        }
    }
}

impl Appointment {
    /// Archived or finished. Locked appointments cannot be moved.
    #[inline]
    pub fn is_locked(&self) -> bool {
        self.archived || self.status.is_terminal()
    }

    /// Whether the status still permits leaving the lanes, regardless of
    /// the current (possibly previewed) technician.
    #[inline]
    pub fn can_be_unassigned(&self) -> bool {
        !self.archived && self.status.after(StatusCommand::Unassign).is_some()
    }

    /// Whether `command` may be offered for this appointment.
    pub fn allows(&self, command: StatusCommand) -> bool {
        if self.archived {
            return false;
        }
        match command {
            StatusCommand::Dispatch | StatusCommand::Unassign if self.is_unassigned() => false,
            _ => self.status.after(command).is_some(),
        }
    }

    /// Commands to offer, in menu order.
    pub fn available_commands(&self) -> Vec<StatusCommand> {
        StatusCommand::ALL
            .into_iter()
            .filter(|&c| self.allows(c))
            .collect()
    }

    /// Applies `command` locally. Returns `false` (and changes nothing) if
    /// the command is not allowed.
    pub fn apply_command(&mut self, command: StatusCommand) -> bool {
        if !self.allows(command) {
            return false;
        }
        let Some(next) = self.status.after(command) else {
            return false;
        };
        self.status = next;
        match command {
            StatusCommand::Archive => self.archived = true,
            StatusCommand::Unassign => self.technician_id = None,
            _ => {}
        }
        true
    }
}

impl fmt::Display for StatusCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Dispatch => "dispatch",
            Self::Arrive => "arrive",
            Self::Close => "close",
            Self::Complete => "complete",
            Self::Cancel => "cancel",
            Self::Archive => "archive",
            Self::Unassign => "unassign",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn appt(status: AppointmentStatus, technician: Option<&str>) -> Appointment {
        let start = Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap();
        let mut a = Appointment::new("A1", start, start + chrono::Duration::hours(1))
            .with_status(status);
        a.technician_id = technician.map(str::to_string);
        a
    }

    #[test]
    fn test_forward_lifecycle() {
        let mut a = appt(AppointmentStatus::Scheduled, Some("T1"));
        assert!(a.apply_command(StatusCommand::Dispatch));
        assert_eq!(a.status, AppointmentStatus::Dispatched);
        assert!(a.apply_command(StatusCommand::Arrive));
        assert_eq!(a.status, AppointmentStatus::Arrived);
        assert!(a.apply_command(StatusCommand::Complete));
        assert_eq!(a.status, AppointmentStatus::Completed);
        assert!(a.available_commands().is_empty());
    }

    #[test]
    fn test_no_skipping_states() {
        let a = appt(AppointmentStatus::Scheduled, Some("T1"));
        assert!(!a.allows(StatusCommand::Arrive));
        assert!(!a.allows(StatusCommand::Close));
        assert!(!a.allows(StatusCommand::Complete));
    }

    #[test]
    fn test_close_on_cancelled_not_offered() {
        let mut a = appt(AppointmentStatus::Cancelled, Some("T1"));
        assert!(!a.allows(StatusCommand::Close));
        assert!(!a.apply_command(StatusCommand::Close));
        assert_eq!(a.status, AppointmentStatus::Cancelled);
    }

    #[test]
    fn test_cancel_from_any_non_terminal() {
        for status in [
            AppointmentStatus::Scheduled,
            AppointmentStatus::Dispatched,
            AppointmentStatus::Arrived,
            AppointmentStatus::InProgress,
        ] {
            let mut a = appt(status, Some("T1"));
            assert!(a.apply_command(StatusCommand::Cancel), "{status}");
            assert_eq!(a.status, AppointmentStatus::Cancelled);
        }
    }

    #[test]
    fn test_archive_is_terminal_side_exit() {
        let mut a = appt(AppointmentStatus::Dispatched, Some("T1"));
        assert!(a.apply_command(StatusCommand::Archive));
        assert!(a.archived);
        assert_eq!(a.status, AppointmentStatus::Dispatched);
        assert!(a.available_commands().is_empty());
    }

    #[test]
    fn test_unassign_only_while_scheduled() {
        let mut a = appt(AppointmentStatus::Scheduled, Some("T1"));
        assert!(a.apply_command(StatusCommand::Unassign));
        assert!(a.is_unassigned());

        let b = appt(AppointmentStatus::Dispatched, Some("T1"));
        assert!(!b.allows(StatusCommand::Unassign));
    }

    #[test]
    fn test_locked_and_unassignable() {
        let a = appt(AppointmentStatus::Cancelled, None);
        assert!(a.is_locked());
        assert!(!a.can_be_unassigned());

        let mut b = appt(AppointmentStatus::Scheduled, None);
        assert!(!b.is_locked());
        assert!(b.can_be_unassigned());
        b.archived = true;
        assert!(b.is_locked());
        assert!(!b.can_be_unassigned());

        let c = appt(AppointmentStatus::Dispatched, Some("T1"));
        assert!(!c.is_locked());
        assert!(!c.can_be_unassigned());
    }

    #[test]
    fn test_unassigned_cannot_dispatch() {
        let a = appt(AppointmentStatus::Scheduled, None);
        assert_eq!(
            a.available_commands(),
            vec![StatusCommand::Cancel, StatusCommand::Archive]
        );
    }

    #[test]
    fn test_in_progress_can_close() {
        let a = appt(AppointmentStatus::InProgress, Some("T1"));
        assert!(a.allows(StatusCommand::Close));
        assert!(a.allows(StatusCommand::Complete));
        assert!(!a.allows(StatusCommand::Arrive));
    }
}
