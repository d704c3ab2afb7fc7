//! Gesture state machine: turns pointer input on a card into a proposed
//! placement change.
//!
//! # State Machine
//!
//! ```text
//! Idle ──begin──▶ Pending ──travel ≥ threshold──▶ Active (previewing) ──release──▶ Idle
//!                    │                                   │
//!                    └──release──▶ Click                 └──cancel──▶ snapshot restored
//! ```
//!
//! - **Pending**: the pointer is down but has not travelled far enough to be
//!   a drag. Releasing here is a click and proposes nothing.
//! - **Active**: every pointer update recomputes a candidate placement from
//!   the accumulated delta, snapped to the grid. The engine writes it to the
//!   cache as a preview.
//! - **Released**: the last candidate is frozen into a [`Release`] and the
//!   tracker returns to Idle.
//!
//! # Invariants
//!
//! 1. At most one session exists at a time.
//! 2. Every candidate lasts at least the minimum duration.
//! 3. A resize moves exactly one edge; the other keeps its snapshot value.
//! 4. A release that lands on the snapshot placement proposes nothing.
//! 5. The snapshot is taken once, at `begin`, and never changes.
//!
//! # Coordinates
//!
//! [`PointerPosition`] is in board content coordinates: `x` is the offset on
//! the [`TimeAxis`], `y` the offset from the top of the first row. Drop
//! targets are resolved by the caller (see
//! [`BoardLayout::technician_at`](crate::layout::BoardLayout::technician_at)).

use chrono::Duration;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::BoardConfig;
use crate::error::{DispatchError, Result};
use crate::geometry::TimeAxis;
use crate::models::{Appointment, Placement};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Thresholds and grid for gesture recognition.
#[derive(Debug, Clone, PartialEq)]
pub struct GestureConfig {
    /// Minimum pointer travel (px) before a drag starts (default: 5).
    pub drag_activation_px: f64,
    /// Snap granularity in minutes (default: 15).
    pub snap_minutes: i64,
    /// Snap granularity with the coarse modifier held (default: 60).
    pub coarse_snap_minutes: i64,
    /// Minimum appointment duration in minutes (default: 15).
    pub min_duration_minutes: i64,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self::from(&BoardConfig::default())
    }
}

impl From<&BoardConfig> for GestureConfig {
    fn from(config: &BoardConfig) -> Self {
        Self {
            drag_activation_px: config.drag_activation_px,
            snap_minutes: config.snap_minutes,
            coarse_snap_minutes: config.coarse_snap_minutes,
            min_duration_minutes: config.min_duration_minutes,
        }
    }
}

impl GestureConfig {
    fn granularity(&self, coarse: bool) -> i64 {
        if coarse {
            self.coarse_snap_minutes
        } else {
            self.snap_minutes
        }
    }

    fn min_duration(&self) -> Duration {
        Duration::minutes(self.min_duration_minutes)
    }
}

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Pointer location in board content coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PointerPosition {
    pub x: f64,
    pub y: f64,
}

impl PointerPosition {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    pub fn distance(&self, other: &Self) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// What the pointer grabbed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GestureKind {
    /// The card body: time and technician may change.
    Move,
    /// The left edge: only `start` changes.
    ResizeStart,
    /// The right edge: only `end` changes.
    ResizeEnd,
}

/// Where the grabbed card came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GestureOrigin {
    /// A card on a technician row.
    Lane,
    /// An item in the unassigned pool.
    Pool,
}

/// What is under the pointer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum DropTarget {
    /// Nothing droppable.
    #[default]
    None,
    /// A technician row.
    Technician(String),
    /// The unassigned pool sentinel.
    Unassigned,
    /// A specific item inside the unassigned pool.
    PoolItem(String),
}

/// Coarse state of the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GesturePhase {
    Idle,
    Pending,
    Active,
}

/// A placement change proposed by a gesture or keyboard nudge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProposedChange {
    pub appointment_id: String,
    /// Placement before the change.
    pub from: Placement,
    /// Placement after the change.
    pub to: Placement,
}

impl ProposedChange {
    pub fn new(appointment_id: impl Into<String>, from: Placement, to: Placement) -> Self {
        Self {
            appointment_id: appointment_id.into(),
            from,
            to,
        }
    }

    /// Whether nothing would change.
    pub fn is_noop(&self) -> bool {
        self.from == self.to
    }

    /// Whether the appointment is leaving the pool for a technician row.
    pub fn schedules_from_pool(&self) -> bool {
        self.from.technician_id.is_none() && self.to.technician_id.is_some()
    }
}

/// Outcome of releasing the pointer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Release {
    /// Released before the drag threshold. Nothing changed.
    Click { appointment_id: String },
    /// Released on the original placement. Nothing to persist.
    Unchanged { appointment_id: String },
    /// Released over no target, or an underway card released over the pool.
    /// The preview must be reverted to `snapshot`.
    Reverted {
        appointment_id: String,
        snapshot: Placement,
    },
    /// Pool item dropped inside the pool. `over` is the item it landed on;
    /// `None` means the pool sentinel (move to end).
    Reorder {
        appointment_id: String,
        snapshot: Placement,
        over: Option<String>,
    },
    /// A real placement change.
    Changed(ProposedChange),
}

/// One in-progress gesture.
#[derive(Debug, Clone, PartialEq)]
pub struct GestureSession {
    pub appointment_id: String,
    pub kind: GestureKind,
    pub origin: GestureOrigin,
    /// Placement when the gesture began.
    pub snapshot: Placement,
    /// Pointer position when the gesture began.
    pub start_pos: PointerPosition,
    /// Last reported pointer position.
    pub last_pos: PointerPosition,
    /// Last candidate written as a preview.
    pub preview: Option<Placement>,
    active: bool,
    /// Whether the status lets the card leave the lanes.
    unassignable: bool,
}

impl GestureSession {
    /// Whether the drag threshold has been crossed.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.active
    }
}

// ---------------------------------------------------------------------------
// GestureTracker
// ---------------------------------------------------------------------------

/// Stateful tracker for one pointer gesture at a time.
#[derive(Debug, Clone, Default)]
pub struct GestureTracker {
    config: GestureConfig,
    session: Option<GestureSession>,
}

impl GestureTracker {
    /// Creates an idle tracker.
    #[must_use]
    pub fn new(config: GestureConfig) -> Self {
        Self {
            config,
            session: None,
        }
    }

    /// Current configuration.
    #[inline]
    pub fn config(&self) -> &GestureConfig {
        &self.config
    }

    /// Replaces the configuration. An in-progress session keeps running.
    pub fn set_config(&mut self, config: GestureConfig) {
        self.config = config;
    }

    /// Current phase.
    pub fn phase(&self) -> GesturePhase {
        match &self.session {
            None => GesturePhase::Idle,
            Some(s) if s.active => GesturePhase::Active,
            Some(_) => GesturePhase::Pending,
        }
    }

    /// Whether a drag is in progress (threshold crossed).
    #[inline]
    pub fn is_active(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.active)
    }

    /// The current session, if any.
    pub fn session(&self) -> Option<&GestureSession> {
        self.session.as_ref()
    }

    /// Id of the appointment being manipulated.
    pub fn appointment_id(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.appointment_id.as_str())
    }

    /// Pointer down on `appointment`.
    ///
    /// # Errors
    /// `GestureActive` if another session exists.
    pub fn begin(
        &mut self,
        appointment: &Appointment,
        kind: GestureKind,
        origin: GestureOrigin,
        pos: PointerPosition,
    ) -> Result<()> {
        if let Some(s) = &self.session {
            return Err(DispatchError::GestureActive(s.appointment_id.clone()));
        }
        self.session = Some(GestureSession {
            appointment_id: appointment.id.clone(),
            kind,
            origin,
            snapshot: appointment.placement(),
            start_pos: pos,
            last_pos: pos,
            preview: None,
            active: false,
            unassignable: appointment.can_be_unassigned(),
        });
        Ok(())
    }

    /// Pointer moved. Returns the new preview placement once the drag is
    /// active, or `None` while idle or below the threshold.
    pub fn update(
        &mut self,
        pos: PointerPosition,
        target: &DropTarget,
        coarse: bool,
        axis: &TimeAxis,
    ) -> Option<Placement> {
        let config = &self.config;
        let session = self.session.as_mut()?;
        session.last_pos = pos;

        if !session.active {
            if session.start_pos.distance(&pos) < config.drag_activation_px {
                return None;
            }
            session.active = true;
            debug!(
                appointment_id = %session.appointment_id,
                kind = ?session.kind,
                "gesture activated"
            );
        }

        let candidate = candidate(config, session, pos, target, coarse, axis);
        session.preview = Some(candidate.clone());
        Some(candidate)
    }

    /// Pointer released. Returns `None` if no session existed.
    pub fn release(
        &mut self,
        pos: PointerPosition,
        target: &DropTarget,
        coarse: bool,
        axis: &TimeAxis,
    ) -> Option<Release> {
        let session = self.session.take()?;
        let id = session.appointment_id.clone();

        if !session.active && session.start_pos.distance(&pos) < self.config.drag_activation_px {
            return Some(Release::Click { appointment_id: id });
        }

        let release = match (session.kind, session.origin, target) {
            (GestureKind::Move, _, DropTarget::None) => Release::Reverted {
                appointment_id: id,
                snapshot: session.snapshot,
            },
            (GestureKind::Move, GestureOrigin::Pool, DropTarget::Unassigned) => Release::Reorder {
                appointment_id: id,
                snapshot: session.snapshot,
                over: None,
            },
            (
                GestureKind::Move,
                GestureOrigin::Lane,
                DropTarget::Unassigned | DropTarget::PoolItem(_),
            ) if !session.unassignable => Release::Reverted {
                appointment_id: id,
                snapshot: session.snapshot,
            },
            (GestureKind::Move, GestureOrigin::Pool, DropTarget::PoolItem(over)) => {
                if *over == id {
                    Release::Unchanged { appointment_id: id }
                } else {
                    Release::Reorder {
                        appointment_id: id,
                        snapshot: session.snapshot,
                        over: Some(over.clone()),
                    }
                }
            }
            _ => {
                let to = candidate(&self.config, &session, pos, target, coarse, axis);
                let change = ProposedChange::new(id.clone(), session.snapshot, to);
                if change.is_noop() {
                    Release::Unchanged { appointment_id: id }
                } else {
                    Release::Changed(change)
                }
            }
        };

        debug!(appointment_id = %session.appointment_id, ?release, "gesture released");
        Some(release)
    }

    /// Aborts the session (Escape, focus loss, drag cancel).
    ///
    /// Returns the appointment id and snapshot so the caller can restore a
    /// preview, or `None` if no session existed.
    pub fn cancel(&mut self) -> Option<(String, Placement)> {
        let session = self.session.take()?;
        debug!(appointment_id = %session.appointment_id, "gesture cancelled");
        Some((session.appointment_id, session.snapshot))
    }

    /// Drops any session without reporting it.
    pub fn reset(&mut self) {
        self.session = None;
    }
}

// ---------------------------------------------------------------------------
// Candidate computation
// ---------------------------------------------------------------------------

fn candidate(
    config: &GestureConfig,
    session: &GestureSession,
    pos: PointerPosition,
    target: &DropTarget,
    coarse: bool,
    axis: &TimeAxis,
) -> Placement {
    let g = config.granularity(coarse);
    let min = config.min_duration();
    let snap = &session.snapshot;
    let delta = axis.snap_delta(pos.x - session.start_pos.x, g);

    match session.kind {
        GestureKind::Move => {
            let duration = snap.duration().max(min);
            let technician_id = match target {
                DropTarget::Technician(t) => Some(t.clone()),
                DropTarget::Unassigned | DropTarget::PoolItem(_) => None,
                DropTarget::None => snap.technician_id.clone(),
            };
            if technician_id.is_none() {
                // Over the pool: time is kept, only the assignment goes
                if !session.unassignable {
                    return snap.clone();
                }
                return Placement::new(None, snap.start, snap.end);
            }
            let start = match session.origin {
                GestureOrigin::Lane => snap.start + delta,
                GestureOrigin::Pool => axis.snap_time(axis.x_to_time(pos.x), g),
            };
            Placement::new(technician_id, start, start + duration)
        }
        GestureKind::ResizeStart => {
            let mut start = snap.start + delta;
            if snap.end - start < min {
                start = snap.end - min;
            }
            Placement::new(snap.technician_id.clone(), start, snap.end)
        }
        GestureKind::ResizeEnd => {
            let mut end = snap.end + delta;
            if end - snap.start < min {
                end = snap.start + min;
            }
            Placement::new(snap.technician_id.clone(), snap.start, end)
        }
    }
}
