//! Turn CLI flags and the TOML config into a ready-to-run cycler.
//!
//! Everything that fails here is a configuration problem and surfaces as
//! `TecError::Config`, so it maps to the configuration exit code.

use std::path::Path;
use std::time::Duration;

use eyre::WrapErr;
use tec_config::Config;
use tec_core::{
    CalibrationModel, CancelToken, CyclerBuilder, ObserverPump, ProtocolProfile, TecError,
    ThermalCycler, ZoneChannels,
};
use tec_hardware::SimFactory;
use tec_traits::clock::MonotonicClock;

use crate::cli::Cli;
use crate::sinks::{ConsoleSink, JsonlSink, RecordDecoder, SampleSinks};

pub type Cycler = ThermalCycler<SimFactory<MonotonicClock>, MonotonicClock>;

fn config_error(e: eyre::Report) -> eyre::Report {
    eyre::Report::new(TecError::Config(format!("{e:#}")))
}

/// Read, parse and validate the TOML config.
pub fn load_config(path: &Path) -> eyre::Result<Config> {
    let load = || -> eyre::Result<Config> {
        let text = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("read config {}", path.display()))?;
        let cfg = tec_config::load_toml(&text)
            .wrap_err_with(|| format!("parse config {}", path.display()))?;
        cfg.validate()?;
        Ok(cfg)
    };
    load().map_err(config_error)
}

/// CSV table selected by `--unit` wins, then the inline `[calibration]`
/// table, then the identity model.
pub fn resolve_calibration(cli: &Cli, cfg: &Config) -> eyre::Result<CalibrationModel> {
    let pair = match (&cli.calibration, &cli.unit) {
        (Some(csv), Some(unit)) => {
            Some(tec_config::load_calibration_csv(csv, unit).map_err(config_error)?)
        }
        (Some(_), None) => {
            return Err(config_error(eyre::eyre!("--calibration requires --unit")));
        }
        _ => cfg.calibration,
    };
    match pair {
        Some(pair) => {
            let model = CalibrationModel::try_from(&pair)?;
            tracing::info!(
                unit = cli.unit.as_deref().unwrap_or("inline"),
                "calibration loaded"
            );
            Ok(model)
        }
        None => {
            tracing::warn!("no calibration configured; using identity");
            Ok(CalibrationModel::default())
        }
    }
}

/// `--profile FILE` wins over the inline `[profile]` table.
pub fn resolve_profile(cli: &Cli, cfg: &Config) -> eyre::Result<ProtocolProfile> {
    if let Some(path) = &cli.profile {
        let text = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("read profile {}", path.display()))
            .map_err(config_error)?;
        let profile = tec_config::load_profile_toml(&text).map_err(config_error)?;
        return Ok(ProtocolProfile::from(&profile));
    }
    cfg.profile
        .as_ref()
        .map(ProtocolProfile::from)
        .ok_or_else(|| {
            config_error(eyre::eyre!(
                "no profile: add a [profile] table to the config or pass --profile FILE"
            ))
        })
}

/// Observer fan-out for the console and the optional `--samples` file.
fn observer(cli: &Cli, cfg: &Config, calibration: CalibrationModel) -> eyre::Result<ObserverPump> {
    let decoder = RecordDecoder::new(
        cfg.device.read_channels.clone(),
        ZoneChannels::from(&cfg.zones),
        calibration,
    );
    let file = match &cli.samples {
        Some(path) => Some(JsonlSink::append(path).map_err(config_error)?),
        None => None,
    };
    let sinks = SampleSinks::new(decoder, ConsoleSink::new(cli.json), file);
    Ok(ObserverPump::spawn(sinks, cfg.sampling.observer_queue))
}

/// Wire the simulated plant, calibration, channel layout and sinks.
pub fn build_cycler(cli: &Cli, cfg: &Config, cancel: CancelToken) -> eyre::Result<Cycler> {
    let calibration = resolve_calibration(cli, cfg)?;
    let pump = observer(cli, cfg, calibration)?;
    let cycler = CyclerBuilder::new()
        .with_factory(SimFactory::new(MonotonicClock::new()), cfg.device.port.clone())
        .with_calibration(calibration)
        .with_channels(ZoneChannels::from(&cfg.zones))
        .with_tick(Duration::from_millis(cfg.sampling.tick_ms))
        .with_read_order(cfg.device.read_channels.clone())
        .with_write_order(cfg.device.write_channels.clone())
        .with_cancel(cancel)
        .with_observer(pump)
        .build()?;
    tracing::debug!(
        port = %cfg.device.port,
        tick_ms = cfg.sampling.tick_ms,
        "cycler ready"
    );
    Ok(cycler)
}
