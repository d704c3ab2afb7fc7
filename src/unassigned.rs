//! Manual ordering of the unassigned pool.
//!
//! The backend returns unassigned appointments in its own order, which can
//! change between refreshes. The operator's manual order is kept here and
//! merged with every refresh:
//!
//! - identities still present keep their relative order,
//! - new identities are appended in server order,
//! - identities no longer present are dropped.
//!
//! Reordering never touches the server.

use std::collections::HashSet;

/// Client-local order of unassigned appointment ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnassignedOrder {
    ids: Vec<String>,
}

impl UnassignedOrder {
    /// Creates an empty order. The first merge adopts server order.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current order.
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    /// Number of ids.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the pool is empty.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Position of an id.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.ids.iter().position(|x| x == id)
    }

    /// Merges the server's unassigned set (in server order).
    pub fn merge<S: AsRef<str>>(&mut self, server_ids: &[S]) {
        let present: HashSet<&str> = server_ids.iter().map(|s| s.as_ref()).collect();
        self.ids.retain(|id| present.contains(id.as_str()));

        let mut known: HashSet<String> = self.ids.iter().cloned().collect();
        for id in server_ids {
            let id = id.as_ref();
            if known.insert(id.to_string()) {
                self.ids.push(id.to_string());
            }
        }
    }

    /// Moves the item at `from` to `to` (remove then reinsert).
    ///
    /// Returns `false` if either index is out of range.
    pub fn move_index(&mut self, from: usize, to: usize) -> bool {
        if from >= self.ids.len() || to >= self.ids.len() {
            return false;
        }
        let id = self.ids.remove(from);
        self.ids.insert(to, id);
        true
    }

    /// Moves `id` into the slot currently held by `over`.
    pub fn move_onto(&mut self, id: &str, over: &str) -> bool {
        if id == over {
            return false;
        }
        match (self.position(id), self.position(over)) {
            (Some(from), Some(to)) => self.move_index(from, to),
            _ => false,
        }
    }

    /// Moves `id` to the end of the pool.
    pub fn move_to_end(&mut self, id: &str) -> bool {
        match self.position(id) {
            Some(from) => {
                let last = self.ids.len() - 1;
                self.move_index(from, last)
            }
            None => false,
        }
    }

    /// Appends `id` if absent (an appointment just dropped into the pool).
    pub fn push(&mut self, id: &str) {
        if self.position(id).is_none() {
            self.ids.push(id.to_string());
        }
    }

    /// Removes `id` (an appointment just scheduled out of the pool).
    pub fn remove(&mut self, id: &str) -> bool {
        match self.position(id) {
            Some(i) => {
                self.ids.remove(i);
                true
            }
            None => false,
        }
    }
}
