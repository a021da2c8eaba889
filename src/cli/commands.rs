//! CLI Command Implementations
//!
//! Implements the actual logic for each CLI command.

use std::path::Path;

use log::info;
use serde::Serialize;

use crate::config::EngineConfig;
use crate::dsp::allpass::AllPassCoefficients;
use crate::dsp::analysis::{cascade_response, log_spaced_frequencies, ResponsePoint};
use crate::dsp::{DispersionEngine, DisperserSettings, Effect};
use crate::engine::buffer::{calculate_peak, calculate_rms, AudioBuffer};
use crate::engine::io::{export_audio, import_audio, ExportFormat};
use crate::error::{DisperserError, Result};

/// Lowest frequency in a response table
const RESPONSE_LOW_HZ: f64 = 20.0;

/// Resolve the engine configuration from a file, the legacy preset or defaults.
pub fn load_config(path: Option<&Path>, legacy: bool) -> Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::load(path),
        None if legacy => Ok(EngineConfig::legacy()),
        None => Ok(EngineConfig::default()),
    }
}

/// Feed a whole buffer through the engine in host-sized blocks.
///
/// Mono buffers are paired with a silent right channel.
pub fn render(engine: &mut DispersionEngine, buffer: &mut AudioBuffer, block_size: usize) {
    let block_size = block_size.max(1);
    engine.prepare(buffer.sample_rate, block_size);

    if let Some((left, right)) = buffer.stereo_mut() {
        for (l, r) in left
            .chunks_mut(block_size)
            .zip(right.chunks_mut(block_size))
        {
            engine.process_block_in_place(l, r);
        }
        return;
    }

    if buffer.channels() == 1 {
        let mut silent = vec![0.0; block_size];
        for chunk in buffer.channel_mut(0).chunks_mut(block_size) {
            let right = &mut silent[..chunk.len()];
            right.fill(0.0);
            engine.process_block_in_place(chunk, right);
        }
    }
}

/// Render a WAV file through the disperser.
pub fn process(
    input: &Path,
    output: &Path,
    settings: DisperserSettings,
    config: EngineConfig,
    format: ExportFormat,
    block_size: usize,
) -> Result<()> {
    info!("Processing {} -> {}", input.display(), output.display());

    let mut buffer = import_audio(input)?;
    let mut engine = DispersionEngine::with_settings(config, settings)?;

    let rms_before = calculate_rms(&buffer);
    render(&mut engine, &mut buffer, block_size);
    export_audio(&buffer, output, format)?;

    info!(
        "Rendered {:.2}s at {} Hz: {} stages at {} Hz",
        buffer.duration_secs(),
        buffer.sample_rate,
        engine.active_stages(),
        engine.resolved_frequency_hz()
    );

    println!("Wrote {}", output.display());
    println!(
        "RMS {:.2} dB -> {:.2} dB, peak {:.2} dB",
        rms_before,
        calculate_rms(&buffer),
        calculate_peak(&buffer)
    );

    Ok(())
}

/// Cascade response as the engine would configure it
#[derive(Debug, Clone, Serialize)]
pub struct ResponseReport {
    pub sample_rate: f64,
    pub resolved_frequency_hz: f64,
    pub stages: usize,
    pub coefficients: AllPassCoefficients,
    pub points: Vec<ResponsePoint>,
}

/// Tune an engine for `settings` and evaluate its cascade.
///
/// The sample rate must put Nyquist at or above the 20 Hz start of the table.
pub fn response_report(
    settings: DisperserSettings,
    config: EngineConfig,
    sample_rate: u32,
    points: usize,
) -> Result<ResponseReport> {
    if (sample_rate as f64) < 2.0 * RESPONSE_LOW_HZ {
        return Err(DisperserError::invalid_parameter(
            "sample_rate",
            sample_rate,
            "at least 40 Hz",
        ));
    }

    let mut engine = DispersionEngine::with_settings(config, settings)?;
    engine.prepare(sample_rate, 1);

    // One silent sample is enough to size and tune the bank
    let mut left = [0.0];
    let mut right = [0.0];
    engine.process_block_in_place(&mut left, &mut right);

    let rate = engine.coefficient_sample_rate();
    let coefficients = *engine.bank().reference_coefficients();
    let nyquist = sample_rate as f64 / 2.0;
    let frequencies = log_spaced_frequencies(RESPONSE_LOW_HZ, nyquist.min(20000.0), points);

    Ok(ResponseReport {
        sample_rate: rate,
        resolved_frequency_hz: engine.resolved_frequency_hz(),
        stages: engine.active_stages(),
        coefficients,
        points: cascade_response(&coefficients, engine.active_stages(), rate, &frequencies),
    })
}

/// Print the cascade response.
pub fn response(
    settings: DisperserSettings,
    config: EngineConfig,
    sample_rate: u32,
    points: usize,
    json: bool,
) -> Result<()> {
    let report = response_report(settings, config, sample_rate, points)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!(
        "{} stages at {} Hz (coefficients at {} Hz)",
        report.stages, report.resolved_frequency_hz, report.sample_rate
    );
    println!(
        "{:>10}  {:>12}  {:>12}  {:>14}",
        "freq (Hz)", "mag (dB)", "phase (rad)", "delay (smp)"
    );
    for point in &report.points {
        println!(
            "{:>10.1}  {:>12.6}  {:>12.4}  {:>14.3}",
            point.frequency, point.magnitude_db, point.phase_rad, point.group_delay_samples
        );
    }

    Ok(())
}

/// Print a configuration as JSON.
pub fn print_config(legacy: bool) -> Result<()> {
    let config = if legacy {
        EngineConfig::legacy()
    } else {
        EngineConfig::default()
    };
    println!("{}", config.to_json_string()?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::buffer::ChannelLayout;
    use approx::assert_abs_diff_eq;
    use tempfile::tempdir;

    #[test]
    fn test_load_config_sources() {
        assert_eq!(load_config(None, false).unwrap(), EngineConfig::default());
        assert_eq!(load_config(None, true).unwrap(), EngineConfig::legacy());
        assert!(load_config(Some(Path::new("/missing/config.json")), false).is_err());
    }

    #[test]
    fn test_render_matches_direct_processing() {
        let settings = DisperserSettings::new(1200.0, 6, 0.5, 0.7);
        let source = AudioBuffer::sine(330.0, 0.4, 3000, ChannelLayout::Stereo, 44100);

        let mut rendered = source.clone();
        let mut engine = DispersionEngine::with_settings(EngineConfig::default(), settings).unwrap();
        render(&mut engine, &mut rendered, 128);

        let mut direct = DispersionEngine::with_settings(EngineConfig::default(), settings).unwrap();
        let mut left = vec![0.0; 3000];
        let mut right = vec![0.0; 3000];
        direct.process_block(source.channel(0), source.channel(1), &mut left, &mut right);

        assert_eq!(rendered.channel(0), left.as_slice());
        assert_eq!(rendered.channel(1), right.as_slice());
    }

    #[test]
    fn test_render_mono() {
        let mut mono = AudioBuffer::sine(330.0, 0.4, 1000, ChannelLayout::Mono, 48000);
        let original = mono.clone();
        let mut engine = DispersionEngine::default();
        render(&mut engine, &mut mono, 100);

        assert_ne!(mono, original);
        assert!(mono.is_finite());
        assert_eq!(engine.sample_rate(), 48000.0);
    }

    #[test]
    fn test_process_file() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("in.wav");
        let output = dir.path().join("out.wav");

        let tone = AudioBuffer::sine(440.0, 0.5, 4410, ChannelLayout::Stereo, 44100);
        export_audio(&tone, &input, ExportFormat::float()).unwrap();

        process(
            &input,
            &output,
            DisperserSettings::default(),
            EngineConfig::default(),
            ExportFormat::default(),
            256,
        )
        .unwrap();

        let rendered = import_audio(&output).unwrap();
        assert_eq!(rendered.len(), 4410);
        assert_eq!(rendered.channels(), 2);
    }

    #[test]
    fn test_process_missing_input() {
        let dir = tempdir().unwrap();
        let err = process(
            &dir.path().join("nope.wav"),
            &dir.path().join("out.wav"),
            DisperserSettings::default(),
            EngineConfig::default(),
            ExportFormat::default(),
            256,
        )
        .unwrap_err();
        assert_eq!(err.error_code(), "FILE_NOT_FOUND");
    }

    #[test]
    fn test_response_report() {
        let config = EngineConfig {
            frequency_mapping: crate::dsp::FrequencyMapping::Direct,
            ..Default::default()
        };
        let report =
            response_report(DisperserSettings::new(2000.0, 12, 0.7, 1.0), config, 48000, 16)
                .unwrap();

        assert_eq!(report.stages, 12);
        assert_eq!(report.resolved_frequency_hz, 2000.0);
        assert_eq!(report.sample_rate, 48000.0);
        assert_eq!(report.points.len(), 16);
        for point in &report.points {
            assert_abs_diff_eq!(point.magnitude_db, 0.0, epsilon = 1e-9);
        }
        assert!(report.points.last().unwrap().phase_rad < report.points[0].phase_rad);
    }

    #[test]
    fn test_response_report_rejects_low_sample_rate() {
        let settings = DisperserSettings::default();
        for rate in [0, 20, 39] {
            let err = response_report(settings, EngineConfig::default(), rate, 8).unwrap_err();
            assert_eq!(err.error_code(), "INVALID_PARAMETER");
        }

        // Nyquist lands on the 20 Hz start of the table
        let report = response_report(settings, EngineConfig::default(), 40, 8).unwrap();
        assert_eq!(report.points.len(), 8);
        assert!(report.points.iter().all(|p| p.frequency == 20.0));
    }
}
