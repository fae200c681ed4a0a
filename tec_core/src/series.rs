//! In-memory telemetry series.

use std::time::Instant;

use tec_traits::Instance;

use crate::params::TELEMETRY;

/// One sampling tick: every telemetry parameter, every read instance.
///
/// `values` is laid out parameter-major in `TELEMETRY` order, and within a
/// parameter in the read order used by the sampling loop.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeriesRecord {
    /// Seconds since the start of the monitor call that produced it.
    pub elapsed_s: f64,
    /// Seconds since the series anchor (usually the start of the run).
    pub run_elapsed_s: f64,
    pub values: Vec<f64>,
}

impl TimeSeriesRecord {
    /// Decode the readings of `instance`, given the read order the record
    /// was taken with.
    pub fn channel(&self, read_order: &[Instance], instance: Instance) -> Option<ChannelTelemetry> {
        let width = read_order.len();
        let pos = read_order.iter().position(|&i| i == instance)?;
        if self.values.len() != width * TELEMETRY.len() {
            return None;
        }
        let at = |param: usize| self.values[param * width + pos];
        Some(ChannelTelemetry {
            instance,
            loop_status: at(0),
            object_temp: at(1),
            target_object_temp: at(2),
            output_current: at(3),
            output_voltage: at(4),
            sink_temp: at(5),
            ramp_temp: at(6),
        })
    }
}

/// Telemetry of one instance within a record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelTelemetry {
    pub instance: Instance,
    pub loop_status: f64,
    pub object_temp: f64,
    pub target_object_temp: f64,
    pub output_current: f64,
    pub output_voltage: f64,
    pub sink_temp: f64,
    pub ramp_temp: f64,
}

/// Append-only series owned by the caller of a run. Records already taken
/// stay available when the run fails part way.
#[derive(Debug, Clone)]
pub struct TimeSeries {
    anchor: Instant,
    records: Vec<TimeSeriesRecord>,
}

impl TimeSeries {
    pub fn new(anchor: Instant) -> Self {
        Self {
            anchor,
            records: Vec::new(),
        }
    }

    pub fn anchor(&self) -> Instant {
        self.anchor
    }

    pub fn records(&self) -> &[TimeSeriesRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn last(&self) -> Option<&TimeSeriesRecord> {
        self.records.last()
    }

    pub fn into_records(self) -> Vec<TimeSeriesRecord> {
        self.records
    }

    pub(crate) fn push(&mut self, record: TimeSeriesRecord) -> &TimeSeriesRecord {
        self.records.push(record);
        &self.records[self.records.len() - 1]
    }
}
