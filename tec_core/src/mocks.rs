//! Test and helper mocks for tec_core

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tec_traits::{Address, BoxError, DeviceSession, Instance, ParameterId, SessionFactory};

use crate::observer::SampleObserver;
use crate::series::TimeSeriesRecord;

/// Address reported by `RecordingSession::identify`.
pub const MOCK_ADDRESS: Address = 1;

/// One request seen by a `RecordingSession`, in issue order.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionCall {
    Identify,
    Get {
        id: ParameterId,
        instance: Instance,
    },
    Set {
        id: ParameterId,
        value: f64,
        instance: Instance,
    },
}

/// Called after every successful read with the number of reads so far.
pub type ReadHook = Arc<dyn Fn(usize) + Send + Sync>;

#[derive(Default)]
struct Shared {
    calls: Vec<SessionCall>,
    opens: usize,
    reads: usize,
    sets: usize,
    reading: f64,
    fail_open: Option<String>,
    fail_reads: Option<String>,
    fail_set_at: Option<(usize, String)>,
    read_hook: Option<ReadHook>,
}

fn lock(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Session factory that records every request into a log shared by all the
/// sessions it opens. Reads return a fixed value; failures are injected on
/// demand.
#[derive(Clone, Default)]
pub struct RecordingFactory {
    shared: Arc<Mutex<Shared>>,
}

impl RecordingFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject the write at position `n` (0-based, counting accepted writes
    /// across sessions) once, with an untyped error carrying `message`.
    pub fn fail_write_at(self, n: usize, message: impl Into<String>) -> Self {
        lock(&self.shared).fail_set_at = Some((n, message.into()));
        self
    }

    pub fn fail_open(self, message: impl Into<String>) -> Self {
        lock(&self.shared).fail_open = Some(message.into());
        self
    }

    /// Make every later read fail with `message`.
    pub fn fail_reads(&self, message: impl Into<String>) {
        lock(&self.shared).fail_reads = Some(message.into());
    }

    /// Run `hook` after every read, outside the log lock. Tests use it to
    /// advance a virtual clock or cancel a run part way.
    pub fn on_read(self, hook: impl Fn(usize) + Send + Sync + 'static) -> Self {
        lock(&self.shared).read_hook = Some(Arc::new(hook));
        self
    }

    pub fn set_reading(&self, value: f64) {
        lock(&self.shared).reading = value;
    }

    pub fn calls(&self) -> Vec<SessionCall> {
        lock(&self.shared).calls.clone()
    }

    /// `(id, value, instance)` of every accepted write, in order.
    pub fn writes(&self) -> Vec<(ParameterId, f64, Instance)> {
        lock(&self.shared)
            .calls
            .iter()
            .filter_map(|c| match *c {
                SessionCall::Set {
                    id,
                    value,
                    instance,
                } => Some((id, value, instance)),
                _ => None,
            })
            .collect()
    }

    /// Accepted writes of one parameter id.
    pub fn writes_of(&self, id: ParameterId) -> Vec<(f64, Instance)> {
        self.writes()
            .into_iter()
            .filter(|(w, _, _)| *w == id)
            .map(|(_, v, i)| (v, i))
            .collect()
    }

    pub fn opens(&self) -> usize {
        lock(&self.shared).opens
    }

    pub fn identifies(&self) -> usize {
        lock(&self.shared)
            .calls
            .iter()
            .filter(|c| matches!(c, SessionCall::Identify))
            .count()
    }
}

impl SessionFactory for RecordingFactory {
    type Session = RecordingSession;

    fn open(&mut self, _port: &str) -> Result<RecordingSession, BoxError> {
        let mut s = lock(&self.shared);
        if let Some(msg) = &s.fail_open {
            return Err(msg.clone().into());
        }
        s.opens += 1;
        Ok(RecordingSession {
            shared: self.shared.clone(),
        })
    }
}

pub struct RecordingSession {
    shared: Arc<Mutex<Shared>>,
}

impl DeviceSession for RecordingSession {
    fn identify(&mut self) -> Result<Address, BoxError> {
        lock(&self.shared).calls.push(SessionCall::Identify);
        Ok(MOCK_ADDRESS)
    }

    fn get_parameter(
        &mut self,
        id: ParameterId,
        _address: Address,
        instance: Instance,
    ) -> Result<f64, BoxError> {
        let (value, reads, hook) = {
            let mut s = lock(&self.shared);
            if let Some(msg) = &s.fail_reads {
                return Err(msg.clone().into());
            }
            s.calls.push(SessionCall::Get { id, instance });
            s.reads += 1;
            (s.reading, s.reads, s.read_hook.clone())
        };
        if let Some(hook) = hook {
            hook(reads);
        }
        Ok(value)
    }

    fn set_parameter(
        &mut self,
        id: ParameterId,
        value: f64,
        _address: Address,
        instance: Instance,
    ) -> Result<(), BoxError> {
        let mut s = lock(&self.shared);
        let position = s.sets;
        if s.fail_set_at.as_ref().is_some_and(|(n, _)| *n == position)
            && let Some((_, msg)) = s.fail_set_at.take()
        {
            return Err(msg.into());
        }
        s.sets += 1;
        s.calls.push(SessionCall::Set {
            id,
            value,
            instance,
        });
        Ok(())
    }
}

/// Observer that keeps every delivered record. Clones share the store, so a
/// clone can be inspected after the original moved into an `ObserverPump`.
#[derive(Debug, Clone, Default)]
pub struct CollectingObserver {
    records: Arc<Mutex<Vec<TimeSeriesRecord>>>,
    finished: Arc<Mutex<bool>>,
}

impl CollectingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<TimeSeriesRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn finished(&self) -> bool {
        *self.finished.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SampleObserver for CollectingObserver {
    fn on_sample(&mut self, record: &TimeSeriesRecord) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record.clone());
    }

    fn on_finish(&mut self) {
        *self.finished.lock().unwrap_or_else(PoisonError::into_inner) = true;
    }
}
