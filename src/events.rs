//! Operator notices and observer registration.
//!
//! Each [`Notifier`] belongs to one engine instance. Observers subscribe
//! explicitly, get a [`SubscriptionId`] back, and unsubscribe with it; there
//! is no global registry. Clones of a notifier share their observers, so a
//! commit running on another task reaches the same subscribers.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::commit::PersistKind;

/// A user-visible notice about a persistence round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// A commit started; calls are being sent.
    Saving { appointment_id: String },
    /// Every call of a commit succeeded.
    Saved { appointment_id: String },
    /// A call failed. `message` is the backend's text, or a fallback.
    Failed {
        appointment_id: String,
        kind: PersistKind,
        message: String,
    },
}

impl Notice {
    /// Appointment this notice is about.
    pub fn appointment_id(&self) -> &str {
        match self {
            Self::Saving { appointment_id }
            | Self::Saved { appointment_id }
            | Self::Failed { appointment_id, .. } => appointment_id,
        }
    }

    /// Whether this is a failure.
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Handle returned by [`Notifier::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Observer = Box<dyn Fn(&Notice) + Send + Sync>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    observers: Vec<(SubscriptionId, Observer)>,
}

/// Fan-out of notices to registered observers.
#[derive(Clone, Default)]
pub struct Notifier {
    inner: Arc<Mutex<Registry>>,
}

impl Notifier {
    /// Creates a notifier with no observers.
    pub fn new() -> Self {
        Self::default()
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        // An observer that panicked must not silence the rest
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Registers an observer.
    pub fn subscribe<F>(&self, observer: F) -> SubscriptionId
    where
        F: Fn(&Notice) + Send + Sync + 'static,
    {
        let mut reg = self.registry();
        let id = SubscriptionId(reg.next_id);
        reg.next_id += 1;
        reg.observers.push((id, Box::new(observer)));
        id
    }

    /// Removes an observer. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut reg = self.registry();
        let before = reg.observers.len();
        reg.observers.retain(|(sid, _)| *sid != id);
        reg.observers.len() != before
    }

    /// Number of registered observers.
    pub fn observer_count(&self) -> usize {
        self.registry().observers.len()
    }

    /// Delivers `notice` to every observer, in subscription order.
    pub fn emit(&self, notice: &Notice) {
        let reg = self.registry();
        for (_, observer) in &reg.observers {
            observer(notice);
        }
    }
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("observers", &self.observer_count())
            .finish()
    }
}
