//! Dispatch board engine for the U-Engine ecosystem.
//!
//! Lays appointments out against technicians on a horizontal time axis,
//! resolves overlaps into visual lanes, and turns operator gestures
//! (drag, resize, keyboard nudge) into optimistic local changes that are
//! persisted through an external backend.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `Technician`, `Appointment`, `TimeWindow`,
//!   `Placement`, status lifecycle and `StatusCommand`
//! - **`geometry`**: Time ↔ pixel mapping and snapping (`TimeAxis`)
//! - **`layout`**: Lane packing, row geometry, board metrics
//! - **`gesture`**: Move/resize gesture state machine
//! - **`store`**: Client-local appointment cache
//! - **`commit`**: Optimistic mutation coordinator and backend boundary
//! - **`events`**: Typed observer registry for operator notices
//! - **`autoscroll`**: Edge-triggered scrolling while a gesture is active
//! - **`unassigned`**: Stable manual ordering of the unassigned pool
//! - **`engine`**: `DispatchEngine`, the single owner of all of the above
//! - **`validation`**: Integrity checks on fetched snapshots
//!
//! # Architecture
//!
//! Everything except `commit::PendingCommit::reconcile` and the auto-scroll
//! ticker is synchronous. Local state changes happen before any remote call
//! is issued; the backend is the final arbiter and a later refresh
//! reconciles any divergence.

pub mod autoscroll;
pub mod commit;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod geometry;
pub mod gesture;
pub mod layout;
pub mod models;
pub mod store;
pub mod unassigned;
pub mod validation;

#[cfg(test)]
pub(crate) mod testing;

pub use config::BoardConfig;
pub use engine::DispatchEngine;
pub use error::{DispatchError, Result};
