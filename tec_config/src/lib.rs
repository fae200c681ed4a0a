#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schemas, thermal profiles and calibration tables for the TEC cycler.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - Profiles may be inline (`[profile]`) or loaded from a separate file.
//! - Calibration CSV tables hold several units; one is selected by name.
use serde::Deserialize;

/// Calibration CSV schema.
///
/// Expected headers:
/// unit,zone,offset,gain
///
/// Example:
/// unit,zone,offset,gain
/// Unit3,bottom,0.5224,0.8228
/// Unit3,top,1.5425,0.7747
#[derive(Debug, Deserialize, Clone)]
pub struct CalibrationRow {
    pub unit: String,
    pub zone: ZoneName,
    pub offset: f64,
    pub gain: f64,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ZoneName {
    Top,
    Bottom,
}

/// Linear tuning for one zone: `physical = offset + gain * logical`.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct ZoneTuning {
    #[serde(alias = "T_offset")]
    pub offset: f64,
    #[serde(alias = "fudge_factor")]
    pub gain: f64,
}

impl ZoneTuning {
    pub fn validate(&self, zone: &str) -> eyre::Result<()> {
        if !self.offset.is_finite() {
            eyre::bail!("calibration.{zone}.offset must be finite");
        }
        if !self.gain.is_finite() {
            eyre::bail!("calibration.{zone}.gain must be finite");
        }
        if self.gain == 0.0 {
            eyre::bail!("calibration.{zone}.gain must be non-zero");
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct CalibrationPair {
    pub top: ZoneTuning,
    pub bottom: ZoneTuning,
}

impl CalibrationPair {
    pub fn validate(&self) -> eyre::Result<()> {
        self.top.validate("top")?;
        self.bottom.validate("bottom")
    }

    /// Select `unit` from a multi-unit calibration table.
    pub fn from_rows(rows: &[CalibrationRow], unit: &str) -> eyre::Result<Self> {
        let mut top = None;
        let mut bottom = None;
        for row in rows.iter().filter(|r| r.unit == unit) {
            let slot = match row.zone {
                ZoneName::Top => &mut top,
                ZoneName::Bottom => &mut bottom,
            };
            if slot.is_some() {
                eyre::bail!("calibration unit '{unit}' lists zone {:?} twice", row.zone);
            }
            *slot = Some(ZoneTuning {
                offset: row.offset,
                gain: row.gain,
            });
        }
        let (Some(top), Some(bottom)) = (top, bottom) else {
            let known: Vec<&str> = rows.iter().map(|r| r.unit.as_str()).collect();
            eyre::bail!(
                "calibration unit '{unit}' needs both top and bottom rows (units in table: {})",
                known.join(",")
            );
        };
        let pair = Self { top, bottom };
        pair.validate()?;
        Ok(pair)
    }
}

#[derive(Debug, Deserialize)]
pub struct DeviceCfg {
    /// Port identifier handed to the session factory ("sim" for the simulator).
    pub port: String,
    /// Instance order used for telemetry reads.
    #[serde(default = "default_read_channels")]
    pub read_channels: Vec<u8>,
    /// Instance order used for enable/disable writes.
    #[serde(default = "default_write_channels")]
    pub write_channels: Vec<u8>,
}

fn default_read_channels() -> Vec<u8> {
    vec![1, 2]
}

fn default_write_channels() -> Vec<u8> {
    vec![2, 1]
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ZonesCfg {
    pub bottom_channels: Vec<u8>,
    pub top_channels: Vec<u8>,
}

impl Default for ZonesCfg {
    fn default() -> Self {
        Self {
            bottom_channels: vec![2],
            top_channels: vec![1],
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SamplingCfg {
    /// Nominal tick interval in milliseconds.
    pub tick_ms: u64,
    /// Depth of the bounded observer queue.
    pub observer_queue: usize,
}

impl Default for SamplingCfg {
    fn default() -> Self {
        Self {
            tick_ms: 500,
            observer_queue: 64,
        }
    }
}

/// One thermal step: go to `temperature` at `ramp_rate`, then hold.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct PhaseCfg {
    #[serde(alias = "temp")]
    pub temperature: f64,
    #[serde(alias = "ramprate")]
    pub ramp_rate: f64,
    #[serde(alias = "time")]
    pub hold_s: f64,
}

impl PhaseCfg {
    fn validate(&self, name: &str) -> eyre::Result<()> {
        if !self.temperature.is_finite() {
            eyre::bail!("profile.{name}.temperature must be finite");
        }
        if !(self.ramp_rate.is_finite() && self.ramp_rate > 0.0) {
            eyre::bail!("profile.{name}.ramp_rate must be > 0");
        }
        if !(self.hold_s.is_finite() && self.hold_s >= 0.0) {
            eyre::bail!("profile.{name}.hold_s must be >= 0");
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum CycleOrder {
    #[default]
    AnnealFirst,
    DenatureFirst,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProfileCfg {
    pub cycles: u32,
    #[serde(default)]
    pub order: CycleOrder,
    /// Telemetry window after the output stage is disabled.
    #[serde(default = "default_cooldown_s")]
    pub cooldown_s: f64,
    #[serde(alias = "Activation")]
    pub activation: PhaseCfg,
    #[serde(alias = "Denaturing", alias = "denaturing")]
    pub denature: PhaseCfg,
    #[serde(alias = "Annealing", alias = "annealing")]
    pub anneal: PhaseCfg,
    #[serde(alias = "Equilibration")]
    pub equilibration: PhaseCfg,
}

fn default_cooldown_s() -> f64 {
    20.0
}

impl ProfileCfg {
    pub fn validate(&self) -> eyre::Result<()> {
        self.activation.validate("activation")?;
        self.denature.validate("denature")?;
        self.anneal.validate("anneal")?;
        self.equilibration.validate("equilibration")?;
        if !(self.cooldown_s.is_finite() && self.cooldown_s >= 0.0) {
            eyre::bail!("profile.cooldown_s must be >= 0");
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct ProfileFile {
    profile: ProfileCfg,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Config {
    pub device: DeviceCfg,
    #[serde(default)]
    pub zones: ZonesCfg,
    #[serde(default)]
    pub sampling: SamplingCfg,
    /// Inline calibration; a CSV table selected on the command line takes precedence.
    #[serde(default)]
    pub calibration: Option<CalibrationPair>,
    /// Inline profile; a separate profile file takes precedence.
    #[serde(default)]
    pub profile: Option<ProfileCfg>,
    #[serde(default)]
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Parse a stand-alone profile file (same `[profile]` table as the main config).
pub fn load_profile_toml(s: &str) -> eyre::Result<ProfileCfg> {
    let file: ProfileFile =
        toml::from_str(s).map_err(|e| eyre::eyre!("invalid profile file: {e}"))?;
    file.profile.validate()?;
    Ok(file.profile)
}

pub fn load_calibration_csv(path: &std::path::Path, unit: &str) -> eyre::Result<CalibrationPair> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| eyre::eyre!("open calibration CSV {:?}: {}", path, e))?;

    // Enforce exact headers
    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read CSV headers {:?}: {}", path, e))?
        .clone();
    let expected = ["unit", "zone", "offset", "gain"];
    let actual: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
    if actual != expected {
        eyre::bail!(
            "calibration CSV must have headers 'unit,zone,offset,gain', got: {}",
            actual.join(",")
        );
    }

    let mut rows = Vec::new();
    for (idx, rec) in rdr.deserialize::<CalibrationRow>().enumerate() {
        match rec {
            Ok(row) => rows.push(row),
            Err(e) => {
                eyre::bail!("invalid CSV row {}: {}", idx + 2, e);
            }
        }
    }

    CalibrationPair::from_rows(&rows, unit)
}

fn validate_channels(name: &str, channels: &[u8]) -> eyre::Result<()> {
    if channels.is_empty() {
        eyre::bail!("{name} must list at least one channel");
    }
    if channels.contains(&0) {
        eyre::bail!("{name} channel ids start at 1");
    }
    Ok(())
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Device
        if self.device.port.trim().is_empty() {
            eyre::bail!("device.port must not be empty");
        }
        validate_channels("device.read_channels", &self.device.read_channels)?;
        validate_channels("device.write_channels", &self.device.write_channels)?;

        // Zones
        validate_channels("zones.bottom_channels", &self.zones.bottom_channels)?;
        validate_channels("zones.top_channels", &self.zones.top_channels)?;

        // Sampling
        if self.sampling.tick_ms == 0 {
            eyre::bail!("sampling.tick_ms must be >= 1");
        }
        if self.sampling.observer_queue == 0 {
            eyre::bail!("sampling.observer_queue must be >= 1");
        }

        if let Some(cal) = &self.calibration {
            cal.validate()?;
        }
        if let Some(profile) = &self.profile {
            profile.validate()?;
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref()
            && !matches!(rot, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly, got '{rot}'");
        }

        Ok(())
    }
}
