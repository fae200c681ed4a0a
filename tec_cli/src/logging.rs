//! Tracing subscriber setup: console layer on stderr plus an optional
//! JSON file layer from the `[logging]` table.

use std::path::Path;

use eyre::WrapErr;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::FILE_GUARD;

/// Console filter: `RUST_LOG` when set, otherwise `--log-level`.
fn console_filter(level: &str) -> eyre::Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(f) => Ok(f),
        Err(_) => EnvFilter::try_new(level).wrap_err_with(|| format!("invalid log level '{level}'")),
    }
}

fn rolling_appender(path: &Path, rotation: Option<&str>) -> tracing_appender::rolling::RollingFileAppender {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file = path
        .file_name()
        .map(|f| f.to_owned())
        .unwrap_or_else(|| "tecctl.log".into());
    match rotation.unwrap_or("never") {
        "daily" => tracing_appender::rolling::daily(dir, file),
        "hourly" => tracing_appender::rolling::hourly(dir, file),
        _ => tracing_appender::rolling::never(dir, file),
    }
}

/// Install the global subscriber. Call once, before any command runs.
pub fn init_tracing(json: bool, level: &str, logging: &tec_config::Logging) -> eyre::Result<()> {
    let filter = console_filter(level)?;
    let console = if json {
        fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_filter(filter)
            .boxed()
    } else {
        fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
            .with_filter(filter)
            .boxed()
    };

    let file = match logging.file.as_deref() {
        Some(path) => {
            let path = Path::new(path);
            if let Some(dir) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(dir)
                    .wrap_err_with(|| format!("create log directory {}", dir.display()))?;
            }
            let appender = rolling_appender(path, logging.rotation.as_deref());
            let (writer, guard) = tracing_appender::non_blocking(appender);
            // Flushes on process exit
            let _ = FILE_GUARD.set(guard);
            let file_level = logging.level.as_deref().unwrap_or("info");
            let file_filter = EnvFilter::try_new(file_level)
                .wrap_err_with(|| format!("invalid [logging] level '{file_level}'"))?;
            Some(
                fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_writer(writer)
                    .with_filter(file_filter)
                    .boxed(),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(console)
        .with(file)
        .try_init()
        .wrap_err("install tracing subscriber")?;
    Ok(())
}
