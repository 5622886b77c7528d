//! Fan-out of raw notifications to registered observers.

use std::sync::{Arc, PoisonError, RwLock};

use ensemble_client_core::{TimeTrace, Tracer, WatchedEvent, Watcher, tracer::PARENT_PROCESS};

/// Ordered observer registry.
///
/// The registry only references observers; it never controls their
/// lifetime. Each dispatch iterates a snapshot of the registry, so an
/// observer removed while a dispatch is in flight may still receive that
/// one event.
#[derive(Default)]
pub struct EventDispatcher {
    observers: RwLock<Vec<Arc<dyn Watcher>>>,
}

impl EventDispatcher {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer. Delivery follows registration order.
    pub fn add_observer(&self, watcher: Arc<dyn Watcher>) {
        self.observers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(watcher);
    }

    /// Unregister one registration of `watcher`, matched by identity.
    /// Returns whether anything was removed.
    pub fn remove_observer(&self, watcher: &Arc<dyn Watcher>) -> bool {
        let mut observers = self.observers.write().unwrap_or_else(PoisonError::into_inner);
        let target = Arc::as_ptr(watcher).cast::<()>();
        match observers
            .iter()
            .position(|w| Arc::as_ptr(w).cast::<()>() == target)
        {
            Some(index) => {
                observers.remove(index);
                true
            }
            None => false,
        }
    }

    /// Number of registered observers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.observers.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether no observer is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver `event` to every observer, timing each call, then hand it to
    /// `apply`.
    ///
    /// Observers run before `apply`, so they can see an event before the
    /// connection state reflects it.
    pub fn dispatch<A>(&self, event: &WatchedEvent, tracer: &Arc<dyn Tracer>, apply: A)
    where
        A: FnOnce(&WatchedEvent),
    {
        let observers = self
            .observers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        for observer in &observers {
            let trace = TimeTrace::new(PARENT_PROCESS, Arc::clone(tracer));
            observer.process(event);
            trace.commit();
        }

        apply(event);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use ensemble_client_core::KeeperState;

    use super::*;
    use crate::testing::{RecordingTracer, RecordingWatcher};

    type Log = Arc<Mutex<Vec<(&'static str, WatchedEvent)>>>;

    fn labels(log: &Log) -> Vec<&'static str> {
        log.lock().unwrap().iter().map(|(l, _)| *l).collect()
    }

    #[test]
    fn test_delivers_in_registration_order_then_applies() {
        let log: Log = Arc::default();
        let dispatcher = EventDispatcher::new();
        for label in ["a", "b", "c"] {
            dispatcher.add_observer(RecordingWatcher::new(label, &log));
        }
        let recording = Arc::new(RecordingTracer::default());
        let tracer: Arc<dyn Tracer> = recording.clone();

        let event = WatchedEvent::connection(KeeperState::SyncConnected);
        dispatcher.dispatch(&event, &tracer, |e| {
            log.lock().unwrap().push(("apply", e.clone()));
        });

        assert_eq!(labels(&log), vec!["a", "b", "c", "apply"]);
        assert_eq!(recording.time_count(PARENT_PROCESS), 3);
    }

    #[test]
    fn test_removed_observer_gets_nothing() {
        let log: Log = Arc::default();
        let dispatcher = EventDispatcher::new();
        let a = RecordingWatcher::new("a", &log);
        let b = RecordingWatcher::new("b", &log);
        dispatcher.add_observer(Arc::clone(&a));
        dispatcher.add_observer(Arc::clone(&b));

        assert!(dispatcher.remove_observer(&a));
        assert!(!dispatcher.remove_observer(&a));
        assert_eq!(dispatcher.len(), 1);

        let tracer: Arc<dyn Tracer> = Arc::new(RecordingTracer::default());
        for _ in 0..2 {
            dispatcher.dispatch(
                &WatchedEvent::connection(KeeperState::Disconnected),
                &tracer,
                |_| {},
            );
        }
        assert_eq!(labels(&log), vec!["b", "b"]);
    }

    #[test]
    fn test_removal_during_dispatch_still_delivers_in_flight_event() {
        let log: Log = Arc::default();
        let dispatcher = Arc::new(EventDispatcher::new());
        let late = RecordingWatcher::new("late", &log);

        let remover: Arc<dyn Watcher> = {
            let dispatcher = Arc::downgrade(&dispatcher);
            let late = Arc::clone(&late);
            Arc::new(move |_: &WatchedEvent| {
                if let Some(dispatcher) = dispatcher.upgrade() {
                    dispatcher.remove_observer(&late);
                }
            })
        };
        dispatcher.add_observer(remover);
        dispatcher.add_observer(Arc::clone(&late));

        let tracer: Arc<dyn Tracer> = Arc::new(RecordingTracer::default());
        let event = WatchedEvent::connection(KeeperState::SyncConnected);
        dispatcher.dispatch(&event, &tracer, |_| {});
        assert_eq!(labels(&log), vec!["late"]);

        dispatcher.dispatch(&event, &tracer, |_| {});
        assert_eq!(labels(&log), vec!["late"]);
    }
}
