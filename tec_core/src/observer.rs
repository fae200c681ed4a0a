//! Background delivery of samples to a visualization or logging observer.
//!
//! The observer runs on its own thread behind a bounded channel. The
//! sampling loop only ever does a non-blocking send: when the queue is full
//! the notification is dropped and counted, so a slow observer cannot stall
//! the tick schedule.
//!
//! Each `ObserverPump` owns exactly one thread. Dropping the pump closes
//! the channel, lets the thread drain what is queued and joins it.
use crossbeam_channel as xch;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::series::TimeSeriesRecord;

/// Receives every delivered record. Best-effort: the control loop never
/// depends on it.
pub trait SampleObserver: Send {
    fn on_sample(&mut self, record: &TimeSeriesRecord);

    /// Called once after the last record, when the pump shuts down.
    fn on_finish(&mut self) {}
}

pub struct ObserverPump {
    tx: Option<xch::Sender<TimeSeriesRecord>>,
    dropped: Arc<AtomicU64>,
    delivered: Arc<AtomicU64>,
    join_handle: Option<std::thread::JoinHandle<()>>,
}

impl ObserverPump {
    pub fn spawn<O: SampleObserver + 'static>(mut observer: O, capacity: usize) -> Self {
        let (tx, rx) = xch::bounded::<TimeSeriesRecord>(capacity.max(1));
        let delivered = Arc::new(AtomicU64::new(0));
        let delivered_clone = delivered.clone();

        let join_handle = std::thread::spawn(move || {
            // Ends when every sender is gone and the queue is drained
            for record in rx.iter() {
                observer.on_sample(&record);
                delivered_clone.fetch_add(1, Ordering::Relaxed);
            }
            observer.on_finish();
            tracing::trace!("observer thread exiting cleanly");
        });

        Self {
            tx: Some(tx),
            dropped: Arc::new(AtomicU64::new(0)),
            delivered,
            join_handle: Some(join_handle),
        }
    }

    /// Queue `record` without blocking. Returns false if it was dropped.
    pub fn notify(&self, record: &TimeSeriesRecord) -> bool {
        let Some(tx) = &self.tx else {
            return false;
        };
        match tx.try_send(record.clone()) {
            Ok(()) => true,
            Err(xch::TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    elapsed_s = record.elapsed_s,
                    "observer queue full; notification dropped"
                );
                false
            }
            Err(xch::TrySendError::Disconnected(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::debug!("observer thread gone; notification dropped");
                false
            }
        }
    }

    /// Notifications dropped so far.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Notifications handed to the observer so far.
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }
}

impl Drop for ObserverPump {
    fn drop(&mut self) {
        // Closing the channel is the shutdown signal
        drop(self.tx.take());
        if let Some(handle) = self.join_handle.take() {
            match handle.join() {
                Ok(()) => {
                    tracing::trace!("observer thread joined successfully");
                }
                Err(e) => {
                    // Observer panicked; log but don't propagate (we're in Drop)
                    tracing::warn!(?e, "observer thread panicked during shutdown");
                }
            }
        }
    }
}
