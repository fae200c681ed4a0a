//! Drift-corrected periodic telemetry sampling.
//!
//! `monitor(duration)` splits the window into `tick_count(duration, tick)`
//! ticks. Tick `i` waits until `i * tick` has elapsed since the loop started,
//! measured against that fixed anchor rather than by summing sleeps, so a slow
//! poll delays only its own tick and never shifts later deadlines. A tick that
//! is already late does not sleep at all.
//!
//! Each poll reads every `TELEMETRY` parameter across the read order and
//! appends one `TimeSeriesRecord`. Overruns are logged and counted, not
//! treated as errors.
use std::time::Duration;

use tec_traits::clock::Clock;
use tec_traits::{Instance, SessionFactory};

use crate::cancel::CancelToken;
use crate::error::Result;
use crate::gateway::DeviceGateway;
use crate::observer::ObserverPump;
use crate::params::{DEFAULT_READ_ORDER, TELEMETRY};
use crate::series::{TimeSeries, TimeSeriesRecord};
use crate::util::tick_count;

/// Nominal sampling cadence.
pub const DEFAULT_TICK: Duration = Duration::from_millis(500);

/// Per-call timing report of a monitor window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MonitorStats {
    /// Records appended.
    pub ticks: u64,
    /// Ticks whose poll and notification ran past the next deadline.
    pub overruns: u64,
    /// Observer notifications dropped because the queue was full.
    pub dropped_notifications: u64,
    /// Worst start delay of a poll behind its own deadline.
    pub max_lateness: Duration,
}

impl MonitorStats {
    pub fn merge(&mut self, other: &MonitorStats) {
        self.ticks += other.ticks;
        self.overruns += other.overruns;
        self.dropped_notifications += other.dropped_notifications;
        self.max_lateness = self.max_lateness.max(other.max_lateness);
    }
}

pub struct SamplingLoop<C: Clock> {
    clock: C,
    tick: Duration,
    read_order: Vec<Instance>,
    cancel: CancelToken,
    observer: Option<ObserverPump>,
}

impl<C: Clock> SamplingLoop<C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            tick: DEFAULT_TICK,
            read_order: DEFAULT_READ_ORDER.to_vec(),
            cancel: CancelToken::new(),
            observer: None,
        }
    }

    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    pub fn with_read_order(mut self, read_order: Vec<Instance>) -> Self {
        self.read_order = read_order;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_observer(mut self, observer: ObserverPump) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn tick(&self) -> Duration {
        self.tick
    }

    pub fn read_order(&self) -> &[Instance] {
        &self.read_order
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Detach the observer, e.g. to drop it and flush its queue.
    pub fn take_observer(&mut self) -> Option<ObserverPump> {
        self.observer.take()
    }

    /// One poll: every telemetry parameter over the read order, appended to
    /// `out` in parameter order.
    pub fn poll<F: SessionFactory>(
        &self,
        gateway: &mut DeviceGateway<F>,
        out: &mut Vec<f64>,
    ) -> Result<()> {
        for param in TELEMETRY {
            gateway.read_into(param, &self.read_order, out)?;
        }
        Ok(())
    }

    /// Sample for `duration_s` seconds, appending one record per tick.
    ///
    /// A device error ends the window immediately; records appended before
    /// it remain in `series`.
    pub fn monitor<F: SessionFactory>(
        &mut self,
        gateway: &mut DeviceGateway<F>,
        duration_s: f64,
        series: &mut TimeSeries,
    ) -> Result<MonitorStats> {
        let ticks = tick_count(duration_s, self.tick);
        let mut stats = MonitorStats::default();
        let dropped_before = self.observer.as_ref().map_or(0, ObserverPump::dropped);
        tracing::debug!(duration_s, ticks, tick_ms = self.tick.as_millis() as u64, "monitor start");

        let anchor = series.anchor();
        let start = self.clock.now();
        for i in 0..ticks {
            self.cancel.check()?;

            let deadline = self.deadline(i);
            let elapsed = self.clock.since(start);
            match deadline.checked_sub(elapsed) {
                Some(wait) => self.clock.sleep(wait),
                None => stats.max_lateness = stats.max_lateness.max(elapsed - deadline),
            }

            let now = self.clock.now();
            let mut values = Vec::with_capacity(TELEMETRY.len() * self.read_order.len());
            self.poll(gateway, &mut values)?;
            let record = series.push(TimeSeriesRecord {
                elapsed_s: now.saturating_duration_since(start).as_secs_f64(),
                run_elapsed_s: now.saturating_duration_since(anchor).as_secs_f64(),
                values,
            });
            if let Some(observer) = &self.observer {
                observer.notify(record);
            }
            stats.ticks += 1;

            let next = self.deadline(i + 1);
            let done = self.clock.since(start);
            if done > next {
                stats.overruns += 1;
                tracing::warn!(
                    tick = i,
                    late_ms = (done - next).as_millis() as u64,
                    "tick overran its budget"
                );
            }
        }

        stats.dropped_notifications = self
            .observer
            .as_ref()
            .map_or(0, ObserverPump::dropped)
            .saturating_sub(dropped_before);
        tracing::debug!(
            ticks = stats.ticks,
            overruns = stats.overruns,
            dropped = stats.dropped_notifications,
            "monitor done"
        );
        Ok(stats)
    }

    #[inline]
    fn deadline(&self, tick: u64) -> Duration {
        self.tick
            .saturating_mul(u32::try_from(tick).unwrap_or(u32::MAX))
    }
}
