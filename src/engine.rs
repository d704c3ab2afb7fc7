//! Dispatch engine.
//!
//! [`DispatchEngine`] owns one board: the visible window, the local cache,
//! the unassigned pool order, the gesture tracker, the commit coordinator,
//! and the notice registry. Several engines can live side by side; none of
//! them share state.
//!
//! # Event flow
//!
//! ```text
//! pointer_down ─▶ GestureTracker::begin
//! pointer_move ─▶ GestureTracker::update ─▶ preview written to the store
//!                                        └▶ auto-scroll started on activation
//! pointer_up   ─▶ GestureTracker::release ─▶ Coordinator::commit ─▶ PendingCommit
//! nudge_*      ─────────────────────────────▶ Coordinator::commit ─▶ PendingCommit
//! status cmd   ─▶ local transition ─────────▶ PendingCommit
//! refresh      ─▶ validate ─▶ parked while a gesture runs, else replace + pool merge
//! ```
//!
//! The caller drives every [`PendingCommit`] (usually by spawning
//! `reconcile()`); the engine never awaits persistence itself.

use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use crate::autoscroll::{AutoScroll, AutoScrollTask, ScrollTarget};
use crate::commit::{
    Coordinator, DispatchBackend, PendingCommit, PersistCall, RemoteError, RemoteResult,
};
use crate::config::BoardConfig;
use crate::error::{DispatchError, Result};
use crate::events::{Notice, Notifier, SubscriptionId};
use crate::geometry::TimeAxis;
use crate::gesture::{
    DropTarget, GestureConfig, GestureKind, GestureOrigin, GestureTracker, PointerPosition,
    ProposedChange, Release,
};
use crate::layout::{BoardLayout, BoardMetrics};
use crate::models::{Appointment, Placement, StatusCommand, Technician, TimeWindow};
use crate::store::AppointmentStore;
use crate::unassigned::UnassignedOrder;
use crate::validation::validate_snapshot;

/// A fetched snapshot waiting for the active gesture to end.
#[derive(Debug, Clone)]
struct ParkedRefresh {
    technicians: Vec<Technician>,
    appointments: Vec<Appointment>,
}

/// One dispatch board.
pub struct DispatchEngine {
    config: BoardConfig,
    axis: TimeAxis,
    store: AppointmentStore,
    pool: UnassignedOrder,
    tracker: GestureTracker,
    coordinator: Coordinator,
    notifier: Notifier,
    technician_filter: Option<String>,
    scroll_target: Option<Arc<dyn ScrollTarget>>,
    autoscroll: Option<AutoScrollTask>,
    parked: Option<ParkedRefresh>,
}

impl std::fmt::Debug for DispatchEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchEngine")
            .field("window", &self.axis.window())
            .field("technicians", &self.store.technicians().len())
            .field("appointments", &self.store.appointments().len())
            .field("phase", &self.tracker.phase())
            .field("parked", &self.parked.is_some())
            .finish()
    }
}

impl DispatchEngine {
    /// Creates an empty board over `window`.
    ///
    /// # Errors
    /// Configuration and window errors from [`BoardConfig::validate`] and
    /// [`TimeAxis::new`].
    pub fn new(
        config: BoardConfig,
        window: TimeWindow,
        backend: Arc<dyn DispatchBackend>,
    ) -> Result<Self> {
        config.validate()?;
        let axis = TimeAxis::new(window, config.px_per_hour)?;
        let notifier = Notifier::new();
        let coordinator = Coordinator::new(
            backend,
            notifier.clone(),
            Duration::from_millis(config.persist_timeout_ms),
        );

        Ok(Self {
            tracker: GestureTracker::new(GestureConfig::from(&config)),
            config,
            axis,
            store: AppointmentStore::new(),
            pool: UnassignedOrder::new(),
            coordinator,
            notifier,
            technician_filter: None,
            scroll_target: None,
            autoscroll: None,
            parked: None,
        })
    }

    /// Scrolls `target` while a drag is near its edges.
    pub fn with_scroll_target(mut self, target: Arc<dyn ScrollTarget>) -> Self {
        self.scroll_target = Some(target);
        self
    }

    /// Restricts [`sync`](Self::sync) to one technician's appointments.
    pub fn with_technician_filter(mut self, technician_id: impl Into<String>) -> Self {
        self.technician_filter = Some(technician_id.into());
        self
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    pub fn axis(&self) -> &TimeAxis {
        &self.axis
    }

    /// The local cache.
    pub fn store(&self) -> &AppointmentStore {
        &self.store
    }

    /// Looks up a cached appointment.
    pub fn appointment(&self, id: &str) -> Option<&Appointment> {
        self.store.get(id)
    }

    /// The gesture tracker.
    pub fn gesture(&self) -> &GestureTracker {
        &self.tracker
    }

    /// Whether a refresh is waiting for the current gesture to end.
    pub fn has_parked_refresh(&self) -> bool {
        self.parked.is_some()
    }

    /// Whether an appointment has commits still outstanding.
    pub fn is_in_flight(&self, appointment_id: &str) -> bool {
        self.coordinator.is_in_flight(appointment_id)
    }

    /// Whether auto-scroll is currently running.
    pub fn is_auto_scrolling(&self) -> bool {
        self.autoscroll.is_some()
    }

    /// Changes the visible window.
    pub fn set_window(&mut self, window: TimeWindow) -> Result<()> {
        self.axis = TimeAxis::new(window, self.config.px_per_hour)?;
        Ok(())
    }

    /// Computes the current board layout.
    pub fn layout(&self) -> BoardLayout {
        BoardLayout::compute(
            self.store.technicians(),
            self.store.appointments(),
            &self.axis,
            &self.config,
        )
    }

    /// Computes summary metrics for the current layout.
    pub fn metrics(&self) -> BoardMetrics {
        BoardMetrics::calculate(&self.layout(), &self.axis.window(), self.config.workday_minutes)
    }

    /// Drop target for a pointer at vertical offset `y` over the rows.
    pub fn target_at(&self, y: f64) -> DropTarget {
        match self.layout().technician_at(y) {
            Some(id) => DropTarget::Technician(id.to_string()),
            None => DropTarget::None,
        }
    }

    /// Unassigned appointments in pool order.
    pub fn unassigned(&self) -> Vec<&Appointment> {
        self.pool
            .ids()
            .iter()
            .filter_map(|id| self.store.get(id))
            .filter(|a| a.is_unassigned() && !a.is_locked())
            .collect()
    }

    /// The pool order itself.
    pub fn unassigned_order(&self) -> &UnassignedOrder {
        &self.pool
    }

    // -----------------------------------------------------------------------
    // Notices
    // -----------------------------------------------------------------------

    /// Registers an observer for Saving / Saved / Failed notices.
    pub fn subscribe<F>(&self, observer: F) -> SubscriptionId
    where
        F: Fn(&Notice) + Send + Sync + 'static,
    {
        self.notifier.subscribe(observer)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.notifier.unsubscribe(id)
    }

    // -----------------------------------------------------------------------
    // Pointer gestures
    // -----------------------------------------------------------------------

    /// Pointer down on an appointment card (or pool item).
    ///
    /// # Errors
    /// `UnknownAppointment` if the id is not cached, `Locked` for archived
    /// or finished appointments, `GestureActive` if a gesture is already
    /// running.
    pub fn pointer_down(
        &mut self,
        appointment_id: &str,
        kind: GestureKind,
        pos: PointerPosition,
    ) -> Result<()> {
        let appt = self.store.require_movable(appointment_id)?;
        let origin = if appt.is_unassigned() {
            GestureOrigin::Pool
        } else {
            GestureOrigin::Lane
        };
        self.tracker.begin(appt, kind, origin, pos)
    }

    /// Pointer moved. Returns the preview written to the cache, if any.
    pub fn pointer_move(
        &mut self,
        pos: PointerPosition,
        target: &DropTarget,
        coarse: bool,
    ) -> Option<Placement> {
        let was_active = self.tracker.is_active();
        let preview = self.tracker.update(pos, target, coarse, &self.axis)?;
        let id = self.tracker.appointment_id()?.to_string();

        if let Err(err) = self.store.set_placement(&id, &preview) {
            self.abort_gesture(&err);
            return None;
        }

        if was_active {
            if let Some(task) = &self.autoscroll {
                task.update_pointer(pos);
            }
        } else {
            self.start_autoscroll(pos);
        }
        Some(preview)
    }

    /// Pointer released. Returns the commit to reconcile, if anything needs
    /// persisting.
    pub fn pointer_up(
        &mut self,
        pos: PointerPosition,
        target: &DropTarget,
        coarse: bool,
    ) -> Option<PendingCommit> {
        self.stop_autoscroll();
        let snapshot = self.tracker.session().map(|s| s.snapshot.clone());
        let release = self.tracker.release(pos, target, coarse, &self.axis)?;

        match release {
            Release::Click { appointment_id } | Release::Unchanged { appointment_id } => {
                // A preview may still be showing
                if let Some(snapshot) = snapshot {
                    self.restore(&appointment_id, &snapshot);
                }
                self.apply_parked();
                None
            }
            Release::Reverted {
                appointment_id,
                snapshot,
            } => {
                self.restore(&appointment_id, &snapshot);
                self.apply_parked();
                None
            }
            Release::Reorder {
                appointment_id,
                snapshot,
                over,
            } => {
                self.restore(&appointment_id, &snapshot);
                match over {
                    Some(over) => self.pool.move_onto(&appointment_id, &over),
                    None => self.pool.move_to_end(&appointment_id),
                };
                self.apply_parked();
                None
            }
            Release::Changed(change) => {
                // Server state first, then the released change on top
                let refreshed = self.apply_parked();
                match self.commit(&change) {
                    Ok(pending) => pending,
                    Err(err) => {
                        warn!(appointment_id = %change.appointment_id, error = %err, "release dropped");
                        if !refreshed {
                            self.restore(&change.appointment_id, &change.from);
                        }
                        None
                    }
                }
            }
        }
    }

    /// Aborts the gesture (Escape, focus loss, drag cancel) and restores the
    /// pre-gesture placement. Returns `false` if nothing was running.
    pub fn cancel_gesture(&mut self) -> bool {
        self.stop_autoscroll();
        let Some((id, snapshot)) = self.tracker.cancel() else {
            return false;
        };
        self.restore(&id, &snapshot);
        self.apply_parked();
        true
    }

    fn abort_gesture(&mut self, err: &DispatchError) {
        warn!(error = %err, "gesture aborted");
        self.stop_autoscroll();
        if let Some((id, snapshot)) = self.tracker.cancel() {
            self.restore(&id, &snapshot);
        }
        self.apply_parked();
    }

    fn restore(&mut self, id: &str, snapshot: &Placement) {
        if let Err(err) = self.store.set_placement(id, snapshot) {
            debug!(appointment_id = %id, error = %err, "snapshot not restored");
        }
    }

    fn start_autoscroll(&mut self, pos: PointerPosition) {
        let Some(target) = &self.scroll_target else {
            return;
        };
        match Handle::try_current() {
            Ok(runtime) => {
                self.autoscroll = Some(AutoScrollTask::spawn(
                    &runtime,
                    AutoScroll::from_config(&self.config),
                    Duration::from_millis(self.config.auto_scroll_frame_ms),
                    Arc::clone(target),
                    pos,
                ));
            }
            Err(_) => warn!("no tokio runtime, auto-scroll disabled for this gesture"),
        }
    }

    fn stop_autoscroll(&mut self) {
        if let Some(task) = self.autoscroll.take() {
            task.stop();
        }
    }

    // -----------------------------------------------------------------------
    // Keyboard and commands
    // -----------------------------------------------------------------------

    fn ensure_idle(&self) -> Result<()> {
        match self.tracker.appointment_id() {
            Some(id) => Err(DispatchError::GestureActive(id.to_string())),
            None => Ok(()),
        }
    }

    fn commit(&mut self, change: &ProposedChange) -> Result<Option<PendingCommit>> {
        let pending = self.coordinator.commit(&mut self.store, change)?;
        if change.to.technician_id.is_none() {
            self.pool.push(&change.appointment_id);
        } else if change.from.technician_id.is_none() {
            self.pool.remove(&change.appointment_id);
        }
        Ok(pending)
    }

    /// Shifts an appointment by `steps` snap increments (arrow keys).
    ///
    /// # Errors
    /// `GestureActive` while a pointer gesture runs, `UnknownAppointment`,
    /// `Locked`.
    pub fn nudge_time(
        &mut self,
        appointment_id: &str,
        steps: i64,
        coarse: bool,
    ) -> Result<Option<PendingCommit>> {
        self.ensure_idle()?;
        let from = self.store.require_movable(appointment_id)?.placement();
        let delta = chrono::Duration::minutes(steps * self.config.granularity(coarse));
        let to = Placement::new(from.technician_id.clone(), from.start + delta, from.end + delta);
        self.commit(&ProposedChange::new(appointment_id, from, to))
    }

    /// Reassigns an appointment to the technician `step` rows away.
    ///
    /// Unassigned appointments and moves past the first or last row do
    /// nothing.
    pub fn nudge_technician(
        &mut self,
        appointment_id: &str,
        step: i32,
    ) -> Result<Option<PendingCommit>> {
        self.ensure_idle()?;
        let from = self.store.require_movable(appointment_id)?.placement();
        let Some(current) = from.technician_id.as_deref() else {
            return Ok(None);
        };
        let Some(next) = self.store.neighbour_technician(current, step) else {
            return Ok(None);
        };
        let to = Placement::new(Some(next.id.clone()), from.start, from.end);
        self.commit(&ProposedChange::new(appointment_id, from, to))
    }

    /// Moves a pool item onto the slot of another (keyboard reorder).
    pub fn reorder_unassigned(&mut self, appointment_id: &str, over: &str) -> bool {
        self.pool.move_onto(appointment_id, over)
    }

    /// Commands currently valid for an appointment.
    pub fn available_commands(&self, appointment_id: &str) -> Vec<StatusCommand> {
        self.store
            .get(appointment_id)
            .map(Appointment::available_commands)
            .unwrap_or_default()
    }

    /// Runs a status command: applied locally, then persisted.
    ///
    /// # Errors
    /// `CommandUnavailable` if the command is not valid now (nothing is
    /// sent), `GestureActive` if the appointment is being dragged,
    /// `UnknownAppointment`.
    pub fn run_status_command(
        &mut self,
        appointment_id: &str,
        command: StatusCommand,
    ) -> Result<PendingCommit> {
        if self.tracker.appointment_id() == Some(appointment_id) {
            return Err(DispatchError::GestureActive(appointment_id.to_string()));
        }
        let appt = self
            .store
            .get_mut(appointment_id)
            .ok_or_else(|| DispatchError::UnknownAppointment(appointment_id.to_string()))?;
        if !appt.apply_command(command) {
            return Err(DispatchError::CommandUnavailable {
                appointment_id: appointment_id.to_string(),
                command,
                status: appt.status,
            });
        }
        info!(appointment_id, %command, status = %appt.status, "status command applied");

        let call = match command {
            StatusCommand::Unassign => {
                self.pool.push(appointment_id);
                PersistCall::Unassign
            }
            StatusCommand::Archive | StatusCommand::Cancel => {
                self.pool.remove(appointment_id);
                PersistCall::StatusTransition(command)
            }
            _ => PersistCall::StatusTransition(command),
        };
        Ok(self.coordinator.pending(appointment_id, vec![call]))
    }

    // -----------------------------------------------------------------------
    // Refresh
    // -----------------------------------------------------------------------

    /// Replaces the cache with a fetched snapshot.
    ///
    /// While a gesture is running the snapshot is parked and applied when
    /// the gesture ends. A newer parked snapshot replaces an older one.
    pub fn apply_refresh(&mut self, technicians: Vec<Technician>, appointments: Vec<Appointment>) {
        if let Err(issues) = validate_snapshot(&technicians, &appointments) {
            for issue in &issues {
                warn!(kind = ?issue.kind, "{}", issue.message);
            }
        }

        if let Some(id) = self.tracker.appointment_id() {
            debug!(appointment_id = %id, "refresh parked behind active gesture");
            self.parked = Some(ParkedRefresh {
                technicians,
                appointments,
            });
            return;
        }
        self.install(technicians, appointments);
    }

    fn install(&mut self, technicians: Vec<Technician>, appointments: Vec<Appointment>) {
        self.store
            .replace(technicians, appointments, self.config.min_duration());
        let ids = self.store.unassigned_ids();
        self.pool.merge(&ids[..]);
        debug!(
            technicians = self.store.technicians().len(),
            appointments = self.store.appointments().len(),
            unassigned = self.pool.len(),
            "refresh applied"
        );
    }

    /// Installs the parked snapshot, if any. Returns whether one was applied.
    fn apply_parked(&mut self) -> bool {
        let Some(parked) = self.parked.take() else {
            return false;
        };
        self.install(parked.technicians, parked.appointments);
        true
    }

    /// Fetches technicians and appointments for `range` and applies them.
    ///
    /// # Errors
    /// The backend's error, or `Timeout` after the configured persistence
    /// timeout. The cache is left untouched on failure.
    pub async fn sync(&mut self, range: TimeWindow) -> RemoteResult<()> {
        let backend = Arc::clone(self.coordinator.backend());
        let limit = Duration::from_millis(self.config.persist_timeout_ms);
        let filter = self.technician_filter.clone();

        let fetched = tokio::time::timeout(limit, async {
            let technicians = backend.fetch_technicians().await?;
            let appointments = backend.fetch_appointments(filter.as_deref(), range).await?;
            Ok::<_, RemoteError>((technicians, appointments))
        })
        .await;

        match fetched {
            Ok(Ok((technicians, appointments))) => {
                self.apply_refresh(technicians, appointments);
                Ok(())
            }
            Ok(Err(err)) => {
                warn!(error = %err, "sync failed");
                Err(err)
            }
            Err(_) => {
                warn!(?limit, "sync timed out");
                Err(RemoteError::Timeout(limit))
            }
        }
    }
}
