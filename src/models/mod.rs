//! Dispatch board domain models.
//!
//! Provides the data types the board operates on. Canonical state is owned
//! by the backend; these are the client-side copies.
//!
//! # Domain Mappings
//!
//! | u-dispatch | Field service | Healthcare | Logistics |
//! |------------|---------------|------------|-----------|
//! | Technician | Technician/Crew | Clinician | Driver |
//! | Appointment | Visit | Consultation | Pickup |
//! | Placement | Assignment + slot | Room + slot | Route + slot |

mod appointment;
mod status;
mod technician;
mod window;

pub use appointment::{Appointment, AppointmentStatus, Placement, Priority};
pub use status::StatusCommand;
pub use technician::{Technician, TechnicianStatus};
pub use window::TimeWindow;
