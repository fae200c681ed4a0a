#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Thermal cycling engine for a dual-zone TEC controller (hardware-agnostic).
//!
//! All device interaction goes through `tec_traits::SessionFactory` and
//! `tec_traits::DeviceSession`, so the engine runs unchanged against the
//! simulator in `tec_hardware` or a real transport.
//!
//! ## Architecture
//!
//! - **Calibration**: per-zone linear logical to physical mapping (`calibration`)
//! - **Gateway**: connection lifecycle and typed parameter access (`gateway`)
//! - **Setpoints**: ramp and calibrated target per zone, bottom first (`setpoint`)
//! - **Sampling**: drift-corrected telemetry polling into a `TimeSeries` (`sampler`)
//! - **Observer**: bounded, non-blocking delivery to a background consumer (`observer`)
//! - **Protocol**: Activation, cycles, Equilibration and cooldown (`protocol`)
//! - **Routines**: square-wave and step-response characterisation (`routines`)
//!
//! Temperatures are degrees Celsius and ramp rates degrees Celsius per
//! second throughout. Values handed to the device are physical; everything
//! the caller supplies is logical.

pub mod builder;
pub mod calibration;
pub mod cancel;
pub mod conversions;
pub mod error;
pub mod gateway;
pub mod hw_error;
pub mod mocks;
pub mod observer;
pub mod params;
pub mod profile;
pub mod protocol;
pub mod routines;
pub mod sampler;
pub mod series;
pub mod setpoint;
pub mod util;

pub use builder::CyclerBuilder;
pub use calibration::{CalibrationModel, Zone, ZoneTuning};
pub use cancel::CancelToken;
pub use error::{Result, TecError};
pub use gateway::DeviceGateway;
pub use observer::{ObserverPump, SampleObserver};
pub use params::Parameter;
pub use profile::{CycleOrder, PhaseKind, ProtocolProfile, ThermalPhaseSpec, hold_time_s};
pub use protocol::{ProtocolState, RunSummary, ThermalCycler};
pub use sampler::{MonitorStats, SamplingLoop};
pub use series::{ChannelTelemetry, TimeSeries, TimeSeriesRecord};
pub use setpoint::{AppliedSetpoint, SetpointController, ZoneChannels};
