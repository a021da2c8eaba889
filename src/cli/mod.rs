//! CLI Module
//!
//! Command-line interface for offline rendering and response inspection.

pub mod commands;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::dsp::params::{FREQUENCY_RANGE, INTENSITY_RANGE, MIX_RANGE, Q_RANGE};
use crate::dsp::DisperserSettings;

/// Disperser - stereo phase dispersion through cascaded all-pass filters
#[derive(Parser, Debug)]
#[command(name = "disperser-cli")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Disperser controls shared by several commands
#[derive(Args, Debug, Clone)]
pub struct ControlArgs {
    /// Frequency control (20-20000)
    #[arg(short, long, default_value_t = FREQUENCY_RANGE.default)]
    pub frequency: f64,

    /// Number of stages (1-50)
    #[arg(short, long, default_value_t = INTENSITY_RANGE.default as u32)]
    pub intensity: u32,

    /// Q control (0-1.41)
    #[arg(short, long, default_value_t = Q_RANGE.default)]
    pub q: f64,

    /// Dry/wet mix (0-1)
    #[arg(short, long, default_value_t = MIX_RANGE.default)]
    pub mix: f64,
}

impl ControlArgs {
    pub fn settings(&self) -> DisperserSettings {
        DisperserSettings::new(self.frequency, self.intensity, self.q, self.mix)
    }
}

/// Where the engine configuration comes from
#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    /// JSON engine configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Use the legacy configuration (44.1 kHz coefficients, tuned once)
    #[arg(long, conflicts_with = "config")]
    pub legacy: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Render a WAV file through the disperser
    #[command(name = "process")]
    Process {
        /// Input WAV file
        input: PathBuf,

        /// Output WAV file
        output: PathBuf,

        #[command(flatten)]
        controls: ControlArgs,

        #[command(flatten)]
        config: ConfigArgs,

        /// Output bit depth (16, 24 or 32)
        #[arg(short, long, default_value_t = 24)]
        bit_depth: u16,

        /// Host block size used while rendering
        #[arg(long, default_value_t = 512)]
        block_size: usize,
    },

    /// Print the magnitude, phase and group delay of the cascade
    #[command(name = "response")]
    Response {
        #[command(flatten)]
        controls: ControlArgs,

        #[command(flatten)]
        config: ConfigArgs,

        /// Sample rate in Hz
        #[arg(short, long, default_value_t = 44100)]
        sample_rate: u32,

        /// Number of log-spaced frequencies
        #[arg(short, long, default_value_t = 24)]
        points: usize,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Print an engine configuration as JSON
    #[command(name = "config")]
    Config {
        /// Print the legacy configuration instead of the default
        #[arg(long)]
        legacy: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_process_defaults() {
        let cli = Cli::try_parse_from(["disperser-cli", "process", "in.wav", "out.wav"]).unwrap();
        match cli.command {
            Commands::Process {
                controls,
                config,
                bit_depth,
                block_size,
                ..
            } => {
                assert_eq!(controls.settings(), DisperserSettings::default());
                assert!(config.config.is_none());
                assert!(!config.legacy);
                assert_eq!(bit_depth, 24);
                assert_eq!(block_size, 512);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_response_flags() {
        let cli = Cli::try_parse_from([
            "disperser-cli",
            "-v",
            "response",
            "--frequency",
            "1500",
            "-i",
            "12",
            "--legacy",
            "--json",
        ])
        .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Response {
                controls,
                config,
                json,
                ..
            } => {
                assert_eq!(controls.frequency, 1500.0);
                assert_eq!(controls.intensity, 12);
                assert!(config.legacy);
                assert!(json);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_legacy_conflicts_with_config_file() {
        assert!(Cli::try_parse_from(["disperser-cli", "config", "--legacy"]).is_ok());

        let result = Cli::try_parse_from([
            "disperser-cli",
            "process",
            "in.wav",
            "out.wav",
            "--legacy",
            "--config",
            "engine.json",
        ]);
        assert!(result.is_err());
    }
}
