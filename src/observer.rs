//! Observation hooks for component creation.
//!
//! Observers see every constructor invocation: when it starts, when it
//! finishes, and when it fails. Singletons served from cache are not reported.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;

use crate::error::DiError;

/// Observer for component creation events.
///
/// # Examples
///
/// ```
/// use autowire::{Container, DefinitionBuilder, DiError, DiObserver, Resolver};
/// use std::sync::{Arc, Mutex};
/// use std::time::Duration;
///
/// #[derive(Default)]
/// struct Recorder(Mutex<Vec<String>>);
///
/// impl DiObserver for Recorder {
///     fn resolving(&self, name: &str) {
///         self.0.lock().unwrap().push(format!("start {name}"));
///     }
///     fn resolved(&self, name: &str, _duration: Duration) {
///         self.0.lock().unwrap().push(format!("done {name}"));
///     }
///     fn creation_failed(&self, _name: &str, _error: &DiError) {}
/// }
///
/// struct Clock;
///
/// let recorder = Arc::new(Recorder::default());
/// let container = Container::new();
/// container.add_observer(recorder.clone());
/// container.register("clock", DefinitionBuilder::<Clock>::new(|_| Ok(Clock)).build()).unwrap();
/// container.get::<Clock>().unwrap();
///
/// assert_eq!(*recorder.0.lock().unwrap(), vec!["start clock", "done clock"]);
/// ```
pub trait DiObserver: Send + Sync {
    /// A constructor for `name` is about to run.
    fn resolving(&self, name: &str);

    /// The constructor for `name` returned an instance.
    fn resolved(&self, name: &str, duration: Duration);

    /// The constructor for `name` failed.
    fn creation_failed(&self, name: &str, error: &DiError);
}

/// Registered observers. Cheap to check when empty.
#[derive(Default)]
pub(crate) struct Observers {
    observers: RwLock<Vec<Arc<dyn DiObserver>>>,
}

impl Observers {
    pub(crate) fn add(&self, observer: Arc<dyn DiObserver>) {
        self.observers.write().push(observer);
    }

    #[inline]
    pub(crate) fn has_observers(&self) -> bool {
        !self.observers.read().is_empty()
    }

    pub(crate) fn resolving(&self, name: &str) {
        for observer in self.observers.read().iter() {
            observer.resolving(name);
        }
    }

    pub(crate) fn resolved(&self, name: &str, duration: Duration) {
        for observer in self.observers.read().iter() {
            observer.resolved(name, duration);
        }
    }

    pub(crate) fn creation_failed(&self, name: &str, error: &DiError) {
        for observer in self.observers.read().iter() {
            observer.creation_failed(name, error);
        }
    }
}

/// Observer that forwards creation events to `tracing`.
pub struct LoggingObserver {
    prefix: String,
}

impl LoggingObserver {
    pub fn new() -> Self {
        Self {
            prefix: "autowire".to_string(),
        }
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into() }
    }
}

impl Default for LoggingObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl DiObserver for LoggingObserver {
    fn resolving(&self, name: &str) {
        tracing::debug!(prefix = %self.prefix, component = name, "creating component");
    }

    fn resolved(&self, name: &str, duration: Duration) {
        tracing::debug!(prefix = %self.prefix, component = name, ?duration, "created component");
    }

    fn creation_failed(&self, name: &str, error: &DiError) {
        tracing::warn!(prefix = %self.prefix, component = name, %error, "component creation failed");
    }
}
