//! Optimistic mutation coordinator.
//!
//! A commit has two phases:
//!
//! 1. [`Coordinator::commit`] writes the proposed placement into the local
//!    cache synchronously and returns the persistence calls still owed to
//!    the backend as a [`PendingCommit`].
//! 2. [`PendingCommit::reconcile`] sends those calls in order and reports
//!    the result through the [`Notifier`].
//!
//! A failed call is surfaced to the operator and the sequence stops. The
//! local cache is never rolled back; the next refresh reconciles it.
//!
//! # Call plan
//!
//! | Change | Calls |
//! |--------|-------|
//! | time only | `persist_time_change` |
//! | technician only | `persist_assignment` |
//! | technician and time | `persist_assignment`, then `persist_time_change` |
//! | pool → technician | `persist_assignment`, then `persist_time_change` |
//! | technician → pool | `persist_unassign` |
//! | nothing | none |

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::error::{DispatchError, Result};
use crate::events::{Notice, Notifier};
use crate::gesture::ProposedChange;
use crate::models::{Appointment, StatusCommand, Technician, TimeWindow};
use crate::store::AppointmentStore;

// ---------------------------------------------------------------------------
// Backend boundary
// ---------------------------------------------------------------------------

/// Failure reported by (or while talking to) the backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// The backend refused the call with a message for the operator.
    #[error("{0}")]
    Rejected(String),
    /// The call failed without a usable message.
    #[error("request failed")]
    Unspecified,
    /// No answer within the configured timeout.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
}

impl RemoteError {
    /// Text to show the operator: the backend's message verbatim, or the
    /// fallback for `kind` when there is none.
    pub fn operator_message(&self, kind: PersistKind) -> String {
        match self {
            Self::Rejected(msg) if !msg.trim().is_empty() => msg.clone(),
            _ => kind.fallback_message().to_string(),
        }
    }
}

pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

/// Read and write operations offered by the dispatch backend.
#[async_trait]
pub trait DispatchBackend: Send + Sync {
    async fn fetch_technicians(&self) -> RemoteResult<Vec<Technician>>;

    async fn fetch_appointments(
        &self,
        technician_filter: Option<&str>,
        range: TimeWindow,
    ) -> RemoteResult<Vec<Appointment>>;

    async fn persist_time_change(
        &self,
        appointment_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> RemoteResult<()>;

    async fn persist_assignment(&self, appointment_id: &str, technician_id: &str)
        -> RemoteResult<()>;

    async fn persist_unassign(&self, appointment_id: &str) -> RemoteResult<()>;

    async fn persist_status_transition(
        &self,
        appointment_id: &str,
        command: StatusCommand,
    ) -> RemoteResult<()>;
}

// ---------------------------------------------------------------------------
// Calls
// ---------------------------------------------------------------------------

/// Which backend write a call uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PersistKind {
    TimeChange,
    Assignment,
    Unassign,
    StatusTransition,
}

impl PersistKind {
    /// Operator text used when the backend gives none.
    pub fn fallback_message(self) -> &'static str {
        match self {
            Self::TimeChange => "Failed to update times",
            Self::Assignment => "Failed to assign job",
            Self::Unassign => "Failed to unschedule appointment",
            Self::StatusTransition => "Failed to update appointment status",
        }
    }
}

/// One backend write owed for an appointment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistCall {
    TimeChange {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    Assignment {
        technician_id: String,
    },
    Unassign,
    StatusTransition(StatusCommand),
}

impl PersistCall {
    pub fn kind(&self) -> PersistKind {
        match self {
            Self::TimeChange { .. } => PersistKind::TimeChange,
            Self::Assignment { .. } => PersistKind::Assignment,
            Self::Unassign => PersistKind::Unassign,
            Self::StatusTransition(_) => PersistKind::StatusTransition,
        }
    }

    async fn send(&self, backend: &dyn DispatchBackend, appointment_id: &str) -> RemoteResult<()> {
        match self {
            Self::TimeChange { start, end } => {
                backend.persist_time_change(appointment_id, *start, *end).await
            }
            Self::Assignment { technician_id } => {
                backend.persist_assignment(appointment_id, technician_id).await
            }
            Self::Unassign => backend.persist_unassign(appointment_id).await,
            Self::StatusTransition(command) => {
                backend
                    .persist_status_transition(appointment_id, *command)
                    .await
            }
        }
    }
}

/// Calls needed to persist `change`, in the order they must be sent.
pub fn plan_calls(change: &ProposedChange) -> Vec<PersistCall> {
    let (from, to) = (&change.from, &change.to);
    let mut calls = Vec::with_capacity(2);

    match &to.technician_id {
        None => {
            if from.technician_id.is_some() {
                calls.push(PersistCall::Unassign);
            } else if from.time_differs(to) {
                calls.push(PersistCall::TimeChange {
                    start: to.start,
                    end: to.end,
                });
            }
        }
        Some(technician_id) => {
            if from.technician_differs(to) {
                calls.push(PersistCall::Assignment {
                    technician_id: technician_id.clone(),
                });
            }
            if from.time_differs(to) || change.schedules_from_pool() {
                calls.push(PersistCall::TimeChange {
                    start: to.start,
                    end: to.end,
                });
            }
        }
    }

    calls
}

// ---------------------------------------------------------------------------
// Coordinator
// ---------------------------------------------------------------------------

type InFlight = Arc<Mutex<HashMap<String, usize>>>;

fn lock(in_flight: &InFlight) -> MutexGuard<'_, HashMap<String, usize>> {
    in_flight.lock().unwrap_or_else(|e| e.into_inner())
}

/// Applies changes locally and hands out the remote half as [`PendingCommit`]s.
#[derive(Clone)]
pub struct Coordinator {
    backend: Arc<dyn DispatchBackend>,
    notifier: Notifier,
    in_flight: InFlight,
    timeout: Duration,
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("in_flight", &lock(&self.in_flight).len())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Coordinator {
    /// Creates a coordinator.
    ///
    /// # Arguments
    /// * `backend` - Where persistence calls go.
    /// * `notifier` - Receives `Saving` / `Saved` / `Failed` notices.
    /// * `timeout` - Upper bound for each individual call.
    pub fn new(backend: Arc<dyn DispatchBackend>, notifier: Notifier, timeout: Duration) -> Self {
        Self {
            backend,
            notifier,
            in_flight: Arc::default(),
            timeout,
        }
    }

    /// The backend.
    pub fn backend(&self) -> &Arc<dyn DispatchBackend> {
        &self.backend
    }

    /// Writes `change.to` into the cache and returns the calls it needs.
    ///
    /// # Errors
    /// Gesture-integrity errors from the store, or `CommandUnavailable` when
    /// the change would unassign an appointment whose status forbids it. The
    /// cache is unchanged then.
    pub fn apply(&self, store: &mut AppointmentStore, change: &ProposedChange) -> Result<Vec<PersistCall>> {
        if change.from.technician_id.is_some() && change.to.technician_id.is_none() {
            let appt = store.require(&change.appointment_id)?;
            if !appt.can_be_unassigned() {
                return Err(DispatchError::CommandUnavailable {
                    appointment_id: appt.id.clone(),
                    command: StatusCommand::Unassign,
                    status: appt.status,
                });
            }
        }
        store.set_placement(&change.appointment_id, &change.to)?;
        Ok(plan_calls(change))
    }

    /// Applies `change` and returns its remote half, or `None` if nothing
    /// needs persisting.
    pub fn commit(
        &self,
        store: &mut AppointmentStore,
        change: &ProposedChange,
    ) -> Result<Option<PendingCommit>> {
        let calls = self.apply(store, change)?;
        if calls.is_empty() {
            return Ok(None);
        }
        Ok(Some(self.pending(&change.appointment_id, calls)))
    }

    /// Registers `calls` as in flight for `appointment_id`.
    pub fn pending(&self, appointment_id: &str, calls: Vec<PersistCall>) -> PendingCommit {
        {
            let mut map = lock(&self.in_flight);
            let count = map.entry(appointment_id.to_string()).or_insert(0);
            if *count > 0 {
                debug!(
                    appointment_id,
                    outstanding = *count,
                    "commit started while another is in flight"
                );
            }
            *count += 1;
        }

        PendingCommit {
            appointment_id: appointment_id.to_string(),
            calls,
            backend: Arc::clone(&self.backend),
            notifier: self.notifier.clone(),
            timeout: self.timeout,
            _guard: InFlightGuard {
                appointment_id: appointment_id.to_string(),
                in_flight: Arc::clone(&self.in_flight),
            },
        }
    }

    /// Whether any commit for `appointment_id` has not finished.
    pub fn is_in_flight(&self, appointment_id: &str) -> bool {
        lock(&self.in_flight).contains_key(appointment_id)
    }

    /// Number of appointments with outstanding commits.
    pub fn in_flight_count(&self) -> usize {
        lock(&self.in_flight).len()
    }
}

// ---------------------------------------------------------------------------
// PendingCommit
// ---------------------------------------------------------------------------

struct InFlightGuard {
    appointment_id: String,
    in_flight: InFlight,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let mut map = lock(&self.in_flight);
        if let Some(count) = map.get_mut(&self.appointment_id) {
            *count -= 1;
            if *count == 0 {
                map.remove(&self.appointment_id);
            }
        }
    }
}

/// Result of reconciling a commit with the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Every call succeeded.
    Persisted,
    /// A call failed; later calls were not sent.
    Failed { kind: PersistKind, message: String },
}

/// The remote half of a commit. Counts as in flight until dropped.
#[must_use = "a pending commit does nothing until reconciled"]
pub struct PendingCommit {
    appointment_id: String,
    calls: Vec<PersistCall>,
    backend: Arc<dyn DispatchBackend>,
    notifier: Notifier,
    timeout: Duration,
    _guard: InFlightGuard,
}

impl std::fmt::Debug for PendingCommit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingCommit")
            .field("appointment_id", &self.appointment_id)
            .field("calls", &self.calls)
            .finish()
    }
}

impl PendingCommit {
    pub fn appointment_id(&self) -> &str {
        &self.appointment_id
    }

    /// Calls that will be sent, in order.
    pub fn calls(&self) -> &[PersistCall] {
        &self.calls
    }

    /// Sends every call in order, stopping at the first failure.
    ///
    /// Emits `Saving` first, then either `Saved` or exactly one `Failed`.
    pub async fn reconcile(self) -> CommitOutcome {
        let id = self.appointment_id.as_str();
        self.notifier.emit(&Notice::Saving {
            appointment_id: id.to_string(),
        });

        for call in &self.calls {
            let kind = call.kind();
            let result =
                match tokio::time::timeout(self.timeout, call.send(self.backend.as_ref(), id)).await {
                    Ok(result) => result,
                    Err(_) => Err(RemoteError::Timeout(self.timeout)),
                };

            if let Err(err) = result {
                let message = err.operator_message(kind);
                warn!(appointment_id = %id, ?kind, error = %err, "persistence call failed");
                self.notifier.emit(&Notice::Failed {
                    appointment_id: id.to_string(),
                    kind,
                    message: message.clone(),
                });
                return CommitOutcome::Failed { kind, message };
            }
        }

        info!(appointment_id = %id, calls = self.calls.len(), "commit persisted");
        self.notifier.emit(&Notice::Saved {
            appointment_id: id.to_string(),
        });
        CommitOutcome::Persisted
    }
}
