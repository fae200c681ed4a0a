//! Sample sinks fed by the observer pump: one console line per tick and an
//! optional JSON-lines file.
//!
//! Object and target temperatures are shown in logical units, through the
//! inverse calibration of the zone that owns each channel. Channels outside
//! both zones are shown as read.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use eyre::WrapErr;
use serde_json::{Value, json};
use tec_core::{
    CalibrationModel, ChannelTelemetry, SampleObserver, TimeSeriesRecord, ZoneChannels,
};
use tec_traits::Instance;

/// Decodes raw records into per-channel values in logical units.
pub struct RecordDecoder {
    read_order: Vec<Instance>,
    zones: ZoneChannels,
    calibration: CalibrationModel,
}

/// One channel of a record, with logical temperatures filled in.
pub struct DecodedChannel {
    pub zone: Option<&'static str>,
    pub raw: ChannelTelemetry,
    pub object_temp: f64,
    pub target_temp: f64,
}

impl RecordDecoder {
    pub fn new(read_order: Vec<Instance>, zones: ZoneChannels, calibration: CalibrationModel) -> Self {
        Self {
            read_order,
            zones,
            calibration,
        }
    }

    pub fn decode(&self, record: &TimeSeriesRecord) -> Vec<DecodedChannel> {
        self.read_order
            .iter()
            .filter_map(|&i| record.channel(&self.read_order, i))
            .map(|raw| {
                let zone = self.zones.zone_of(raw.instance);
                let logical = |t: f64| match zone {
                    Some(z) => self.calibration.to_logical(z, t),
                    None => t,
                };
                DecodedChannel {
                    zone: zone.map(|z| z.name()),
                    object_temp: logical(raw.object_temp),
                    target_temp: logical(raw.target_object_temp),
                    raw,
                }
            })
            .collect()
    }

    pub fn to_json(&self, record: &TimeSeriesRecord) -> Value {
        let channels: Vec<Value> = self
            .decode(record)
            .iter()
            .map(|c| {
                json!({
                    "instance": c.raw.instance,
                    "zone": c.zone,
                    "object_temp": c.object_temp,
                    "target_temp": c.target_temp,
                    "object_temp_raw": c.raw.object_temp,
                    "target_temp_raw": c.raw.target_object_temp,
                    "loop_status": c.raw.loop_status,
                    "output_current": c.raw.output_current,
                    "output_voltage": c.raw.output_voltage,
                    "sink_temp": c.raw.sink_temp,
                    "ramp_temp": c.raw.ramp_temp,
                })
            })
            .collect();
        json!({
            "elapsed_s": record.elapsed_s,
            "run_elapsed_s": record.run_elapsed_s,
            "channels": channels,
        })
    }

    pub fn to_line(&self, record: &TimeSeriesRecord) -> String {
        let mut line = format!("t={:>8.1}s", record.run_elapsed_s);
        for c in self.decode(record) {
            line.push_str(&format!(
                "  ch{} {:<6} {:>6.2} -> {:>6.2} degC",
                c.raw.instance,
                c.zone.unwrap_or("-"),
                c.object_temp,
                c.target_temp
            ));
        }
        line
    }
}

/// Prints each sample on stdout, as text or as a JSON object.
pub struct ConsoleSink {
    json: bool,
}

impl ConsoleSink {
    pub fn new(json: bool) -> Self {
        Self { json }
    }

    fn emit(&self, decoder: &RecordDecoder, record: &TimeSeriesRecord) {
        if self.json {
            println!("{}", json!({ "sample": decoder.to_json(record) }));
        } else {
            println!("{}", decoder.to_line(record));
        }
    }
}

/// Appends one JSON object per record.
pub struct JsonlSink {
    out: BufWriter<File>,
    failed: bool,
}

impl JsonlSink {
    pub fn append(path: &Path) -> eyre::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .wrap_err_with(|| format!("open samples file {}", path.display()))?;
        Ok(Self {
            out: BufWriter::new(file),
            failed: false,
        })
    }

    fn emit(&mut self, decoder: &RecordDecoder, record: &TimeSeriesRecord) {
        if self.failed {
            return;
        }
        if let Err(e) = writeln!(self.out, "{}", decoder.to_json(record)) {
            // Sampling goes on; only the file is lost
            tracing::warn!(error = %e, "samples file write failed; further samples not written");
            self.failed = true;
        }
    }

    fn flush(&mut self) {
        if let Err(e) = self.out.flush() {
            tracing::warn!(error = %e, "samples file flush failed");
        }
    }
}

/// Fan-out observer handed to the pump.
pub struct SampleSinks {
    decoder: RecordDecoder,
    console: ConsoleSink,
    file: Option<JsonlSink>,
}

impl SampleSinks {
    pub fn new(decoder: RecordDecoder, console: ConsoleSink, file: Option<JsonlSink>) -> Self {
        Self {
            decoder,
            console,
            file,
        }
    }
}

impl SampleObserver for SampleSinks {
    fn on_sample(&mut self, record: &TimeSeriesRecord) {
        self.console.emit(&self.decoder, record);
        if let Some(file) = &mut self.file {
            file.emit(&self.decoder, record);
        }
    }

    fn on_finish(&mut self) {
        if let Some(file) = &mut self.file {
            file.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tec_core::{Zone, ZoneTuning};

    fn record() -> TimeSeriesRecord {
        // 7 params x read order [1, 2]; object temp (param 1) = 60 / 70
        let mut values = vec![0.0; 14];
        values[2] = 60.0;
        values[3] = 70.0;
        values[4] = 61.0;
        values[5] = 71.0;
        TimeSeriesRecord {
            elapsed_s: 0.5,
            run_elapsed_s: 12.5,
            values,
        }
    }

    fn decoder() -> RecordDecoder {
        let cal = CalibrationModel::new(
            ZoneTuning::new(1.0, 2.0).unwrap(),
            ZoneTuning::identity(),
        );
        RecordDecoder::new(vec![1, 2], ZoneChannels::default(), cal)
    }

    #[test]
    fn bottom_channel_is_shown_in_logical_units() {
        let d = decoder();
        let chans = d.decode(&record());
        assert_eq!(chans.len(), 2);
        // instance 1 is top (identity), instance 2 is bottom: (70 - 1) / 2
        assert_eq!(chans[0].zone, Some(Zone::Top.name()));
        assert_eq!(chans[0].object_temp, 60.0);
        assert_eq!(chans[1].zone, Some(Zone::Bottom.name()));
        assert_eq!(chans[1].object_temp, 34.5);
        assert_eq!(chans[1].target_temp, 35.0);
        assert_eq!(chans[1].raw.object_temp, 70.0);
    }

    #[test]
    fn json_shape_carries_both_clocks() {
        let v = decoder().to_json(&record());
        assert_eq!(v["run_elapsed_s"], 12.5);
        assert_eq!(v["channels"][1]["zone"], "bottom");
        assert_eq!(v["channels"][1]["object_temp_raw"], 70.0);
    }

    #[test]
    fn line_lists_every_channel() {
        let line = decoder().to_line(&record());
        assert!(line.contains("ch1 top"), "{line}");
        assert!(line.contains("ch2 bottom"), "{line}");
    }
}
