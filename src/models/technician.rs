//! Technician model.
//!
//! Technicians own the rows of the board. They are created and updated
//! outside this crate and are read-only here; the order in which they are
//! supplied is the row order.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// A technician (or crew) that appointments are scheduled against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Technician {
    /// Unique technician identifier.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Current field status.
    #[serde(default)]
    pub status: TechnicianStatus,
    /// Domain-specific metadata (role, color, department, ...).
    #[serde(default)]
    pub attributes: HashMap<String, String>,
}

/// Field status of a technician.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TechnicianStatus {
    #[default]
    Available,
    OnJob,
    OnBreak,
    Offline,
}

impl Technician {
    /// Creates an available technician.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            status: TechnicianStatus::Available,
            attributes: HashMap::new(),
        }
    }

    /// Sets the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the status.
    pub fn with_status(mut self, status: TechnicianStatus) -> Self {
        self.status = status;
        self
    }

    /// Adds a domain-specific attribute.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Display label, falling back to the id when no name is set.
    pub fn label(&self) -> &str {
        if self.name.is_empty() {
            &self.id
        } else {
            &self.name
        }
    }
}

impl fmt::Display for TechnicianStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Available => "available",
            Self::OnJob => "on-job",
            Self::OnBreak => "on-break",
            Self::Offline => "offline",
        };
        f.write_str(s)
    }
}
