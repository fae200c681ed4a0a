//! Human-readable error descriptions, exit codes and structured JSON errors.

use tec_core::TecError;

/// Process exit codes.
pub const EXIT_OTHER: i32 = 1;
pub const EXIT_CONFIG: i32 = 2;
pub const EXIT_DEVICE: i32 = 3;
pub const EXIT_CANCELLED: i32 = 4;

fn tec_error(err: &eyre::Report) -> Option<&TecError> {
    err.chain().find_map(|e| e.downcast_ref::<TecError>())
}

/// Stable reason name for JSON output.
pub fn reason_name(err: &eyre::Report) -> &'static str {
    match tec_error(err) {
        Some(TecError::Config(_)) => "ConfigError",
        Some(TecError::Cancelled) => "Cancelled",
        Some(TecError::Timeout) => "Timeout",
        Some(TecError::LinkLost(_)) => "LinkLost",
        Some(TecError::NotConnected) => "NotConnected",
        Some(TecError::Device(_) | TecError::DeviceFault(_)) => "DeviceError",
        None => "Error",
    }
}

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    if let Some(te) = tec_error(err) {
        return match te {
            TecError::Config(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the config TOML, profile file or calibration CSV.\nHow to fix: Edit the file named above and rerun. See etc/tec_config.toml for a sample."
            ),
            TecError::Cancelled => "What happened: Run cancelled.\nLikely causes: Ctrl-C was pressed.\nHow to fix: Nothing to fix; the output stage was switched off before exit.".to_string(),
            TecError::Timeout => "What happened: The controller did not answer in time.\nLikely causes: Cable loose, wrong port, or controller busy.\nHow to fix: Check the connection and [device] port, then start a new run.".to_string(),
            TecError::LinkLost(msg) => format!(
                "What happened: Link to the controller was lost ({msg}).\nLikely causes: Cable unplugged or controller power cycled.\nHow to fix: Reconnect, confirm with `tecctl self-check`, then start a new run."
            ),
            TecError::NotConnected => "What happened: No connection to the controller.\nLikely causes: A previous error dropped the link.\nHow to fix: Run `tecctl self-check` to reconnect.".to_string(),
            TecError::Device(msg) | TecError::DeviceFault(msg) => format!(
                "What happened: The controller rejected a request ({msg}).\nLikely causes: Wrong [device] port, unsupported parameter, or a fault latched on the controller.\nHow to fix: Check [device] port and channel lists, clear the fault, then rerun."
            ),
        };
    }

    let msg = err.to_string();
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// 2 configuration, 3 device communication, 4 cancelled, 1 anything else.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    match tec_error(err) {
        Some(TecError::Config(_)) => EXIT_CONFIG,
        Some(TecError::Cancelled) => EXIT_CANCELLED,
        Some(e) if e.is_device_error() => EXIT_DEVICE,
        _ => EXIT_OTHER,
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    serde_json::json!({ "reason": reason_name(err), "message": humanize(err) }).to_string()
}
