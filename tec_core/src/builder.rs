//! Builder for `ThermalCycler`.
//!
//! `build()` only exists once a session factory has been supplied; every
//! other field has a default. All fields are validated on `build()`.

use std::time::Duration;

use tec_traits::clock::{Clock, MonotonicClock};
use tec_traits::{Instance, SessionFactory};

use crate::calibration::CalibrationModel;
use crate::cancel::CancelToken;
use crate::error::{Result, TecError};
use crate::gateway::DeviceGateway;
use crate::observer::ObserverPump;
use crate::params::{DEFAULT_READ_ORDER, DEFAULT_WRITE_ORDER};
use crate::protocol::ThermalCycler;
use crate::sampler::{DEFAULT_TICK, SamplingLoop};
use crate::setpoint::{SetpointController, ZoneChannels};

/// Type-state marker: no session factory yet.
pub struct NoFactory;

pub struct CyclerBuilder<F> {
    factory: F,
    port: String,
    calibration: CalibrationModel,
    channels: ZoneChannels,
    tick: Duration,
    read_order: Vec<Instance>,
    write_order: Vec<Instance>,
    cancel: Option<CancelToken>,
    observer: Option<ObserverPump>,
}

impl Default for CyclerBuilder<NoFactory> {
    fn default() -> Self {
        Self {
            factory: NoFactory,
            port: String::new(),
            calibration: CalibrationModel::default(),
            channels: ZoneChannels::default(),
            tick: DEFAULT_TICK,
            read_order: DEFAULT_READ_ORDER.to_vec(),
            write_order: DEFAULT_WRITE_ORDER.to_vec(),
            cancel: None,
            observer: None,
        }
    }
}

impl CyclerBuilder<NoFactory> {
    /// Start building a cycler.
    pub fn new() -> Self {
        Self::default()
    }
}

impl<F> CyclerBuilder<F> {
    /// Factory and the port it opens on `connect()`.
    pub fn with_factory<G: SessionFactory>(
        self,
        factory: G,
        port: impl Into<String>,
    ) -> CyclerBuilder<G> {
        CyclerBuilder {
            factory,
            port: port.into(),
            calibration: self.calibration,
            channels: self.channels,
            tick: self.tick,
            read_order: self.read_order,
            write_order: self.write_order,
            cancel: self.cancel,
            observer: self.observer,
        }
    }

    pub fn with_calibration(mut self, calibration: CalibrationModel) -> Self {
        self.calibration = calibration;
        self
    }

    pub fn with_channels(mut self, channels: ZoneChannels) -> Self {
        self.channels = channels;
        self
    }

    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    pub fn with_read_order(mut self, order: Vec<Instance>) -> Self {
        self.read_order = order;
        self
    }

    pub fn with_write_order(mut self, order: Vec<Instance>) -> Self {
        self.write_order = order;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn with_observer(mut self, observer: ObserverPump) -> Self {
        self.observer = Some(observer);
        self
    }
}

fn check_channels(name: &str, channels: &[Instance]) -> Result<()> {
    if channels.is_empty() {
        return Err(TecError::Config(format!("{name} must not be empty")));
    }
    if channels.contains(&0) {
        return Err(TecError::Config(format!("{name} instances start at 1")));
    }
    Ok(())
}

impl<F: SessionFactory> CyclerBuilder<F> {
    /// Build on the monotonic wall clock.
    pub fn build(self) -> Result<ThermalCycler<F, MonotonicClock>> {
        self.build_with_clock(MonotonicClock::new())
    }

    pub fn build_with_clock<C: Clock>(self, clock: C) -> Result<ThermalCycler<F, C>> {
        if self.port.trim().is_empty() {
            return Err(TecError::Config("port must not be empty".into()));
        }
        if self.tick.is_zero() {
            return Err(TecError::Config("tick must be > 0".into()));
        }
        check_channels("read order", &self.read_order)?;
        check_channels("write order", &self.write_order)?;
        check_channels("bottom channels", &self.channels.bottom)?;
        check_channels("top channels", &self.channels.top)?;

        let mut sampler = SamplingLoop::new(clock)
            .with_tick(self.tick)
            .with_read_order(self.read_order)
            .with_cancel(self.cancel.unwrap_or_default());
        if let Some(observer) = self.observer {
            sampler = sampler.with_observer(observer);
        }
        let gateway = DeviceGateway::new(self.factory, self.port);
        let setpoint = SetpointController::new(self.calibration, self.channels);
        Ok(ThermalCycler::new(gateway, setpoint, sampler).with_write_order(self.write_order))
    }
}
