//! `tecctl`: drive a dual-zone TEC through a PCR protocol or one of the
//! characterisation routines.

mod cli;
mod commands;
mod error_fmt;
mod logging;
mod setup;
mod sinks;

use clap::Parser;
use tec_core::CancelToken;

use crate::cli::{Cli, JSON_MODE};

fn run(cli: &Cli, cancel: CancelToken) -> eyre::Result<()> {
    let cfg = setup::load_config(&cli.config)?;
    logging::init_tracing(cli.json, &cli.log_level, &cfg.logging)?;
    tracing::debug!(config = %cli.config.display(), "config loaded");
    commands::dispatch(cli, &cfg, cancel)
}

fn main() {
    // Plain output only; no span traces
    let _ = color_eyre::install();
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    let cancel = CancelToken::new();
    {
        let cancel = cancel.clone();
        if let Err(e) = ctrlc::set_handler(move || cancel.cancel()) {
            eprintln!("warning: Ctrl-C handler not installed: {e}");
        }
    }

    if let Err(err) = run(&cli, cancel) {
        let json = JSON_MODE.get().copied().unwrap_or(false);
        if json {
            eprintln!("{}", error_fmt::format_error_json(&err));
        } else {
            eprintln!("{}", error_fmt::humanize(&err));
        }
        std::process::exit(error_fmt::exit_code_for_error(&err));
    }
}
