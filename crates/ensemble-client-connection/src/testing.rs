//! Fakes shared by the unit tests.

use std::{
    collections::HashMap,
    sync::{
        Arc, Barrier, Mutex,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use ensemble_client_core::{SessionError, SessionFactory, Tracer, WatchedEvent, Watcher};

#[derive(Debug)]
pub struct FakeSession {
    pub id: u64,
    pub connection_string: String,
}

/// Session factory that records every create and close.
///
/// A session's id is its index in `created`.
#[derive(Default)]
pub struct RecordingFactory {
    pub created: Mutex<Vec<String>>,
    pub closed: Mutex<Vec<u64>>,
    pub fail_create: AtomicBool,
    pub fail_close: AtomicBool,
}

impl RecordingFactory {
    pub fn created_count(&self) -> usize {
        self.created.lock().unwrap().len()
    }

    pub fn closed_ids(&self) -> Vec<u64> {
        self.closed.lock().unwrap().clone()
    }

    pub fn set_fail_create(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_close(&self, fail: bool) {
        self.fail_close.store(fail, Ordering::SeqCst);
    }
}

impl SessionFactory for RecordingFactory {
    type Session = FakeSession;

    fn create(
        &self,
        connection_string: &str,
        _session_timeout: Duration,
        _sink: Arc<dyn Watcher>,
    ) -> Result<FakeSession, SessionError> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(SessionError::Create(format!("refused by {connection_string}")));
        }
        let mut created = self.created.lock().unwrap();
        let id = created.len() as u64;
        created.push(connection_string.to_string());
        Ok(FakeSession {
            id,
            connection_string: connection_string.to_string(),
        })
    }

    fn close(&self, session: &FakeSession) -> Result<(), SessionError> {
        self.closed.lock().unwrap().push(session.id);
        if self.fail_close.load(Ordering::SeqCst) {
            return Err(SessionError::Close(format!("session {} stuck", session.id)));
        }
        Ok(())
    }
}

/// Factory whose `create` waits on each gate in turn, then records like
/// [`RecordingFactory`].
pub struct GatedFactory {
    pub inner: RecordingFactory,
    gates: Vec<Arc<Barrier>>,
}

impl GatedFactory {
    pub fn new(gates: &[&Arc<Barrier>]) -> Self {
        Self {
            inner: RecordingFactory::default(),
            gates: gates.iter().map(|g| Arc::clone(*g)).collect(),
        }
    }
}

impl SessionFactory for GatedFactory {
    type Session = FakeSession;

    fn create(
        &self,
        connection_string: &str,
        session_timeout: Duration,
        sink: Arc<dyn Watcher>,
    ) -> Result<FakeSession, SessionError> {
        for gate in &self.gates {
            gate.wait();
        }
        self.inner.create(connection_string, session_timeout, sink)
    }

    fn close(&self, session: &FakeSession) -> Result<(), SessionError> {
        self.inner.close(session)
    }
}

/// Tracer that tallies counters and timing calls.
#[derive(Default)]
pub struct RecordingTracer {
    counts: Mutex<HashMap<String, u64>>,
    times: Mutex<Vec<String>>,
}

impl RecordingTracer {
    pub fn count(&self, name: &str) -> u64 {
        self.counts.lock().unwrap().get(name).copied().unwrap_or(0)
    }

    pub fn time_count(&self, name: &str) -> usize {
        self.times.lock().unwrap().iter().filter(|n| *n == name).count()
    }
}

impl Tracer for RecordingTracer {
    fn add_time(&self, name: &str, _elapsed: Duration) {
        self.times.lock().unwrap().push(name.to_string());
    }

    fn add_count(&self, name: &str, amount: u64) {
        *self.counts.lock().unwrap().entry(name.to_string()).or_default() += amount;
    }
}

/// Observer that appends `(label, event)` to a shared log.
pub struct RecordingWatcher {
    label: &'static str,
    log: Arc<Mutex<Vec<(&'static str, WatchedEvent)>>>,
}

impl RecordingWatcher {
    pub fn new(
        label: &'static str,
        log: &Arc<Mutex<Vec<(&'static str, WatchedEvent)>>>,
    ) -> Arc<dyn Watcher> {
        Arc::new(Self {
            label,
            log: Arc::clone(log),
        })
    }
}

impl Watcher for RecordingWatcher {
    fn process(&self, event: &WatchedEvent) {
        self.log.lock().unwrap().push((self.label, event.clone()));
    }
}
