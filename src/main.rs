//! Disperser CLI
//!
//! Offline rendering and response inspection for the phase disperser.

use anyhow::Context;
use clap::Parser;
use env_logger::Env;
use log::debug;

use disperser::cli::commands;
use disperser::cli::{Cli, Commands};
use disperser::engine::ExportFormat;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(level)).init();

    debug!("Disperser v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Process {
            input,
            output,
            controls,
            config,
            bit_depth,
            block_size,
        } => {
            let engine_config = commands::load_config(config.config.as_deref(), config.legacy)
                .context("Failed to load engine configuration")?;
            commands::process(
                &input,
                &output,
                controls.settings(),
                engine_config,
                ExportFormat::new(bit_depth),
                block_size,
            )
            .with_context(|| format!("Failed to process {}", input.display()))
        }
        Commands::Response {
            controls,
            config,
            sample_rate,
            points,
            json,
        } => {
            let engine_config = commands::load_config(config.config.as_deref(), config.legacy)
                .context("Failed to load engine configuration")?;
            commands::response(controls.settings(), engine_config, sample_rate, points, json)
                .context("Failed to compute response")
        }
        Commands::Config { legacy } => {
            commands::print_config(legacy).context("Failed to print configuration")
        }
    }
}
