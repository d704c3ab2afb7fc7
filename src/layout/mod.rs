//! Board layout: lane packing, row geometry, and summary metrics.
//!
//! # Pipeline
//!
//! ```text
//! appointments ──TimeAxis::span──▶ Span per card ──pack_lanes──▶ LaneSlot
//!        └──────────────────────────────▶ BoardLayout (rows, cards) ──▶ BoardMetrics
//! ```
//!
//! # Usage
//!
//! ```
//! use u_dispatch::layout::{pack_lanes, Span};
//!
//! let slots = pack_lanes(&[Span::new(0.0, 80.0), Span::new(40.0, 120.0)]);
//! assert_eq!(slots[0].lane, 0);
//! assert_eq!(slots[1].lane, 1);
//! assert!(slots[0].has_overlap && slots[1].has_overlap);
//! ```

mod board;
mod lanes;
mod metrics;

pub use board::{row_height, BoardLayout, LaneItem, TechnicianRow};
pub use lanes::{max_lane, pack_lanes, LaneSlot, Span};
pub use metrics::BoardMetrics;
