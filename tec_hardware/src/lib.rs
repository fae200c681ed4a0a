#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Device backends for the TEC engine.
//!
//! Only the simulated dual-channel plant ships here. A transport for real
//! controllers plugs in by implementing `tec_traits::SessionFactory`.

pub mod error;

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use error::HwError;
use tec_traits::clock::Clock;
use tec_traits::params;
use tec_traits::{Address, BoxError, DeviceSession, Instance, ParameterId, SessionFactory};

/// Port name accepted by `SimFactory`.
pub const SIM_PORT: &str = "sim";
/// Address the simulated controller reports from `identify`.
pub const SIM_ADDRESS: Address = 1;

const AMBIENT_C: f64 = 25.0;
/// Object follows the ramp temperature with this first-order lag while driven.
const DRIVEN_TAU_S: f64 = 1.5;
/// Passive relaxation towards the sink when the output stage is off.
const PASSIVE_TAU_S: f64 = 20.0;
const MAX_CURRENT_A: f64 = 6.0;
const CURRENT_PER_DEG_A: f64 = 0.8;
const LOAD_OHMS: f64 = 1.8;
const STABLE_BAND_C: f64 = 0.5;
const MAX_STEP_S: f64 = 0.1;

#[derive(Debug, Clone)]
struct ChannelState {
    enabled: bool,
    target: f64,
    ramp_rate: f64,
    ramp_temp: f64,
    object_temp: f64,
    current: f64,
}

impl Default for ChannelState {
    fn default() -> Self {
        Self {
            enabled: false,
            target: AMBIENT_C,
            ramp_rate: 0.0,
            ramp_temp: AMBIENT_C,
            object_temp: AMBIENT_C,
            current: 0.0,
        }
    }
}

impl ChannelState {
    fn advance(&mut self, dt: f64) {
        if self.enabled {
            let gap = self.target - self.ramp_temp;
            let max_move = if self.ramp_rate > 0.0 {
                self.ramp_rate * dt
            } else {
                f64::INFINITY
            };
            self.ramp_temp += gap.clamp(-max_move, max_move);
            let k = 1.0 - (-dt / DRIVEN_TAU_S).exp();
            self.object_temp += (self.ramp_temp - self.object_temp) * k;
            self.current = (CURRENT_PER_DEG_A * (self.ramp_temp - self.object_temp))
                .clamp(-MAX_CURRENT_A, MAX_CURRENT_A);
        } else {
            let k = 1.0 - (-dt / PASSIVE_TAU_S).exp();
            self.object_temp += (AMBIENT_C - self.object_temp) * k;
            self.ramp_temp = self.object_temp;
            self.current = 0.0;
        }
    }

    fn loop_status(&self) -> f64 {
        if !self.enabled {
            0.0
        } else if (self.object_temp - self.target).abs() <= STABLE_BAND_C {
            2.0
        } else {
            1.0
        }
    }
}

#[derive(Debug)]
struct Plant {
    channels: [ChannelState; 2],
    last_update: Option<Instant>,
    link_up: bool,
    writes: usize,
    fail_after_writes: Option<usize>,
}

impl Plant {
    fn new() -> Self {
        Self {
            channels: [ChannelState::default(), ChannelState::default()],
            last_update: None,
            link_up: true,
            writes: 0,
            fail_after_writes: None,
        }
    }

    fn catch_up(&mut self, now: Instant) {
        let Some(last) = self.last_update.replace(now) else {
            return;
        };
        let mut remaining = now.saturating_duration_since(last).as_secs_f64();
        while remaining > 0.0 {
            let dt = remaining.min(MAX_STEP_S);
            for ch in &mut self.channels {
                ch.advance(dt);
            }
            remaining -= dt;
        }
    }

    fn channel(&self, instance: Instance) -> Result<&ChannelState, HwError> {
        match instance {
            1 | 2 => Ok(&self.channels[usize::from(instance - 1)]),
            other => Err(HwError::InvalidInstance(other)),
        }
    }

    fn channel_mut(&mut self, instance: Instance) -> Result<&mut ChannelState, HwError> {
        match instance {
            1 | 2 => Ok(&mut self.channels[usize::from(instance - 1)]),
            other => Err(HwError::InvalidInstance(other)),
        }
    }
}

fn lock(plant: &Mutex<Plant>) -> MutexGuard<'_, Plant> {
    // A panicked holder cannot leave the plant half-written in a way that matters here.
    plant.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Session on the simulated dual-channel controller.
pub struct SimulatedTec<C: Clock> {
    plant: Arc<Mutex<Plant>>,
    clock: C,
}

impl<C: Clock> SimulatedTec<C> {
    fn check(&self, plant: &Plant, address: Address) -> Result<(), HwError> {
        if !plant.link_up {
            return Err(HwError::Disconnected);
        }
        if address != SIM_ADDRESS {
            return Err(HwError::AddressMismatch {
                expected: SIM_ADDRESS,
                got: address,
            });
        }
        Ok(())
    }
}

impl<C: Clock> DeviceSession for SimulatedTec<C> {
    fn identify(&mut self) -> Result<Address, BoxError> {
        let plant = lock(&self.plant);
        if !plant.link_up {
            return Err(Box::new(HwError::Disconnected));
        }
        Ok(SIM_ADDRESS)
    }

    fn get_parameter(
        &mut self,
        id: ParameterId,
        address: Address,
        instance: Instance,
    ) -> Result<f64, BoxError> {
        let mut plant = lock(&self.plant);
        self.check(&plant, address)?;
        plant.catch_up(self.clock.now());
        let ch = plant.channel(instance)?;
        let value = match id {
            params::LOOP_STATUS => ch.loop_status(),
            params::OBJECT_TEMPERATURE => ch.object_temp,
            params::SINK_TEMPERATURE => AMBIENT_C,
            params::TARGET_OBJECT_TEMPERATURE | params::TARGET_TEMPERATURE => ch.target,
            params::RAMP_TEMPERATURE => ch.ramp_temp,
            params::OUTPUT_CURRENT => ch.current,
            params::OUTPUT_VOLTAGE => ch.current * LOAD_OHMS,
            params::OUTPUT_ENABLE => f64::from(u8::from(ch.enabled)),
            params::RAMP_RATE => ch.ramp_rate,
            other => return Err(Box::new(HwError::UnknownParameter(other))),
        };
        Ok(value)
    }

    fn set_parameter(
        &mut self,
        id: ParameterId,
        value: f64,
        address: Address,
        instance: Instance,
    ) -> Result<(), BoxError> {
        let mut plant = lock(&self.plant);
        self.check(&plant, address)?;
        if let Some(limit) = plant.fail_after_writes
            && plant.writes >= limit
        {
            return Err(Box::new(HwError::Nack(2)));
        }
        plant.catch_up(self.clock.now());
        let ch = plant.channel_mut(instance)?;
        match id {
            params::OUTPUT_ENABLE => ch.enabled = value != 0.0,
            params::TARGET_TEMPERATURE => ch.target = value,
            params::RAMP_RATE => ch.ramp_rate = value,
            params::LOOP_STATUS
            | params::OBJECT_TEMPERATURE
            | params::SINK_TEMPERATURE
            | params::TARGET_OBJECT_TEMPERATURE
            | params::RAMP_TEMPERATURE
            | params::OUTPUT_CURRENT
            | params::OUTPUT_VOLTAGE => return Err(Box::new(HwError::ReadOnly(id))),
            other => return Err(Box::new(HwError::UnknownParameter(other))),
        }
        plant.writes += 1;
        tracing::trace!(id, value, instance, "sim write");
        Ok(())
    }
}

/// Opens `SimulatedTec` sessions on port `"sim"`. All sessions opened by one
/// factory drive the same plant, so reconnecting keeps its thermal state.
pub struct SimFactory<C: Clock + Clone> {
    plant: Arc<Mutex<Plant>>,
    clock: C,
}

impl<C: Clock + Clone> SimFactory<C> {
    pub fn new(clock: C) -> Self {
        Self {
            plant: Arc::new(Mutex::new(Plant::new())),
            clock,
        }
    }

    /// Inspection and fault-injection handle onto the shared plant.
    pub fn handle(&self) -> SimHandle {
        SimHandle {
            plant: self.plant.clone(),
        }
    }
}

impl<C: Clock + Clone> SessionFactory for SimFactory<C> {
    type Session = SimulatedTec<C>;

    fn open(&mut self, port: &str) -> Result<Self::Session, BoxError> {
        if port != SIM_PORT {
            return Err(Box::new(HwError::NoSuchPort(port.to_string())));
        }
        {
            let mut plant = lock(&self.plant);
            plant.link_up = true;
            let now = self.clock.now();
            plant.catch_up(now);
            plant.last_update = Some(now);
        }
        tracing::debug!(port, "simulated TEC session opened");
        Ok(SimulatedTec {
            plant: self.plant.clone(),
            clock: self.clock.clone(),
        })
    }
}

/// Snapshot/fault handle for tests and diagnostics.
#[derive(Clone)]
pub struct SimHandle {
    plant: Arc<Mutex<Plant>>,
}

impl SimHandle {
    pub fn object_temp(&self, instance: Instance) -> Option<f64> {
        lock(&self.plant).channel(instance).ok().map(|c| c.object_temp)
    }

    pub fn target(&self, instance: Instance) -> Option<f64> {
        lock(&self.plant).channel(instance).ok().map(|c| c.target)
    }

    pub fn ramp_rate(&self, instance: Instance) -> Option<f64> {
        lock(&self.plant).channel(instance).ok().map(|c| c.ramp_rate)
    }

    pub fn enabled(&self, instance: Instance) -> Option<bool> {
        lock(&self.plant).channel(instance).ok().map(|c| c.enabled)
    }

    /// Number of accepted parameter writes so far.
    pub fn writes(&self) -> usize {
        lock(&self.plant).writes
    }

    /// Simulate a cable pull (`false`) or re-plug (`true`).
    pub fn set_link(&self, up: bool) {
        lock(&self.plant).link_up = up;
    }

    /// Reject every write once `n` writes have been accepted.
    pub fn fail_after_writes(&self, n: Option<usize>) {
        lock(&self.plant).fail_after_writes = n;
    }

    /// Advance the plant by `dt` regardless of the session clock.
    pub fn settle_for(&self, dt: Duration) {
        let mut plant = lock(&self.plant);
        let mut remaining = dt.as_secs_f64();
        while remaining > 0.0 {
            let step = remaining.min(MAX_STEP_S);
            for ch in &mut plant.channels {
                ch.advance(step);
            }
            remaining -= step;
        }
    }
}
