//! Test fixtures: timestamps, a recording backend, and a recording scroll target.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use crate::autoscroll::{ScrollTarget, Viewport};
use crate::commit::{DispatchBackend, PersistKind, RemoteError, RemoteResult};
use crate::models::{Appointment, StatusCommand, Technician, TimeWindow};

/// 2025-03-10 at `h:m` UTC.
pub fn at(h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 10, h, m, 0).unwrap()
}

/// A persistence call as seen by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedCall {
    TimeChange {
        appointment_id: String,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    Assignment {
        appointment_id: String,
        technician_id: String,
    },
    Unassign {
        appointment_id: String,
    },
    StatusTransition {
        appointment_id: String,
        command: StatusCommand,
    },
}

impl RecordedCall {
    pub fn kind(&self) -> PersistKind {
        match self {
            Self::TimeChange { .. } => PersistKind::TimeChange,
            Self::Assignment { .. } => PersistKind::Assignment,
            Self::Unassign { .. } => PersistKind::Unassign,
            Self::StatusTransition { .. } => PersistKind::StatusTransition,
        }
    }
}

/// Backend that records writes, serves a fixed snapshot, and fails on
/// request.
#[derive(Default)]
pub struct RecordingBackend {
    calls: Mutex<Vec<RecordedCall>>,
    failures: Mutex<HashMap<PersistKind, RemoteError>>,
    technicians: Mutex<Vec<Technician>>,
    appointments: Mutex<Vec<Appointment>>,
    fetches: Mutex<Vec<(Option<String>, TimeWindow)>>,
    delay: Option<Duration>,
}

fn guard<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap()
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays every write by `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Sets what the fetch calls return.
    pub fn with_snapshot(self, technicians: Vec<Technician>, appointments: Vec<Appointment>) -> Self {
        self.set_snapshot(technicians, appointments);
        self
    }

    pub fn set_snapshot(&self, technicians: Vec<Technician>, appointments: Vec<Appointment>) {
        *guard(&self.technicians) = technicians;
        *guard(&self.appointments) = appointments;
    }

    /// Makes every call of `kind` fail with `error`.
    pub fn fail(&self, kind: PersistKind, error: RemoteError) {
        guard(&self.failures).insert(kind, error);
    }

    /// Writes received so far, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        guard(&self.calls).clone()
    }

    /// Fetch-appointment requests received so far.
    pub fn fetches(&self) -> Vec<(Option<String>, TimeWindow)> {
        guard(&self.fetches).clone()
    }

    async fn record(&self, call: RecordedCall) -> RemoteResult<()> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let kind = call.kind();
        guard(&self.calls).push(call);
        match guard(&self.failures).get(&kind) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl DispatchBackend for RecordingBackend {
    async fn fetch_technicians(&self) -> RemoteResult<Vec<Technician>> {
        Ok(guard(&self.technicians).clone())
    }

    async fn fetch_appointments(
        &self,
        technician_filter: Option<&str>,
        range: TimeWindow,
    ) -> RemoteResult<Vec<Appointment>> {
        guard(&self.fetches).push((technician_filter.map(str::to_string), range));
        Ok(guard(&self.appointments)
            .iter()
            .filter(|a| a.window().overlaps(&range))
            .filter(|a| match technician_filter {
                Some(t) => a.is_assigned_to(t),
                None => true,
            })
            .cloned()
            .collect())
    }

    async fn persist_time_change(
        &self,
        appointment_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> RemoteResult<()> {
        self.record(RecordedCall::TimeChange {
            appointment_id: appointment_id.to_string(),
            start,
            end,
        })
        .await
    }

    async fn persist_assignment(
        &self,
        appointment_id: &str,
        technician_id: &str,
    ) -> RemoteResult<()> {
        self.record(RecordedCall::Assignment {
            appointment_id: appointment_id.to_string(),
            technician_id: technician_id.to_string(),
        })
        .await
    }

    async fn persist_unassign(&self, appointment_id: &str) -> RemoteResult<()> {
        self.record(RecordedCall::Unassign {
            appointment_id: appointment_id.to_string(),
        })
        .await
    }

    async fn persist_status_transition(
        &self,
        appointment_id: &str,
        command: StatusCommand,
    ) -> RemoteResult<()> {
        self.record(RecordedCall::StatusTransition {
            appointment_id: appointment_id.to_string(),
            command,
        })
        .await
    }
}

/// Scroll container that moves its viewport and records every scroll.
#[derive(Default)]
pub struct RecordingScroller {
    viewport: Mutex<Viewport>,
    scrolls: Mutex<Vec<(f64, f64)>>,
}

impl RecordingScroller {
    pub fn new(viewport: Viewport) -> Arc<Self> {
        Arc::new(Self {
            viewport: Mutex::new(viewport),
            scrolls: Mutex::new(Vec::new()),
        })
    }

    pub fn scrolls(&self) -> Vec<(f64, f64)> {
        guard(&self.scrolls).clone()
    }

    pub fn scroll_count(&self) -> usize {
        guard(&self.scrolls).len()
    }
}

impl ScrollTarget for RecordingScroller {
    fn viewport(&self) -> Viewport {
        *guard(&self.viewport)
    }

    fn scroll_by(&self, dx: f64, dy: f64) {
        let mut vp = guard(&self.viewport);
        vp.left += dx;
        vp.top += dy;
        guard(&self.scrolls).push((dx, dy));
    }
}
