//! Audio file I/O
//!
//! WAV import and export through hound. Audio keeps its own sample rate;
//! the disperser retunes to whatever rate the buffer carries.

use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use log::debug;

use crate::engine::buffer::{AudioBuffer, ChannelLayout};
use crate::error::{DisperserError, Result};

/// Export format configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportFormat {
    /// Bit depth: 16, 24, or 32 (float)
    pub bit_depth: u16,
}

impl Default for ExportFormat {
    fn default() -> Self {
        ExportFormat { bit_depth: 24 }
    }
}

impl ExportFormat {
    pub fn new(bit_depth: u16) -> Self {
        ExportFormat { bit_depth }
    }

    /// 16-bit integer
    pub fn cd_quality() -> Self {
        ExportFormat { bit_depth: 16 }
    }

    /// 32-bit float
    pub fn float() -> Self {
        ExportFormat { bit_depth: 32 }
    }
}

/// Import a WAV file
///
/// # Arguments
/// * `path` - Path to the WAV file to import
///
/// # Errors
/// * `FileNotFound` - If the file does not exist
/// * `InvalidAudio` - If the file is not a valid WAV file
/// * `UnsupportedFormat` - If the audio has more than 2 channels or an odd bit depth
/// * `EmptyAudio` - If the file holds no frames
pub fn import_audio(path: &Path) -> Result<AudioBuffer> {
    if !path.exists() {
        return Err(DisperserError::FileNotFound {
            path: path.display().to_string(),
            source: None,
        });
    }

    let reader = WavReader::open(path).map_err(|e| DisperserError::InvalidAudio {
        reason: format!("Failed to open WAV file: {}", e),
        source: Some(Box::new(e)),
    })?;

    let spec = reader.spec();
    let channels = spec.channels as usize;
    let layout =
        ChannelLayout::from_count(channels).ok_or_else(|| DisperserError::UnsupportedFormat {
            format: format!("{}-channel audio (only mono/stereo supported)", channels),
        })?;

    let interleaved = read_samples_as_f64(reader, spec.bits_per_sample, spec.sample_format)?;
    if interleaved.len() < channels {
        return Err(DisperserError::EmptyAudio);
    }

    let buffer = AudioBuffer::from_interleaved(&interleaved, layout, spec.sample_rate)?;
    debug!(
        "Imported {}: {} channels, {} frames at {} Hz",
        path.display(),
        buffer.channels(),
        buffer.len(),
        buffer.sample_rate
    );

    Ok(buffer)
}

/// Export an AudioBuffer to a WAV file at the buffer's sample rate
///
/// Integer formats are clamped to full scale.
///
/// # Errors
/// * `UnsupportedFormat` - bit depth other than 16, 24 or 32
/// * `Io` - if the file cannot be written
pub fn export_audio(buffer: &AudioBuffer, path: &Path, format: ExportFormat) -> Result<()> {
    let sample_format = match format.bit_depth {
        16 | 24 => SampleFormat::Int,
        32 => SampleFormat::Float,
        other => {
            return Err(DisperserError::UnsupportedFormat {
                format: format!("{}-bit audio (only 16, 24, 32 supported)", other),
            });
        }
    };

    let spec = WavSpec {
        channels: buffer.num_channels() as u16,
        sample_rate: buffer.sample_rate,
        bits_per_sample: format.bit_depth,
        sample_format,
    };

    let mut writer = WavWriter::create(path, spec).map_err(wav_write_error)?;
    let interleaved = buffer.to_interleaved();

    match format.bit_depth {
        16 => {
            for sample in interleaved {
                let scaled = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
                writer.write_sample(scaled).map_err(wav_write_error)?;
            }
        }
        24 => {
            for sample in interleaved {
                // 24-bit stored as i32 in hound
                let scaled = (sample * 8388607.0).clamp(-8388608.0, 8388607.0) as i32;
                writer.write_sample(scaled).map_err(wav_write_error)?;
            }
        }
        _ => {
            for sample in interleaved {
                writer
                    .write_sample(sample as f32)
                    .map_err(wav_write_error)?;
            }
        }
    }

    writer.finalize().map_err(wav_write_error)?;
    debug!(
        "Exported {} frames to {} ({}-bit)",
        buffer.len(),
        path.display(),
        format.bit_depth
    );

    Ok(())
}

// ============================================================================
// Internal helper functions
// ============================================================================

fn wav_write_error(e: hound::Error) -> DisperserError {
    match e {
        hound::Error::IoError(io) => DisperserError::Io(io),
        other => DisperserError::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            other.to_string(),
        )),
    }
}

/// Read interleaved samples and convert to f64 in [-1, 1]
fn read_samples_as_f64<R: std::io::Read>(
    mut reader: WavReader<R>,
    bits_per_sample: u16,
    sample_format: SampleFormat,
) -> Result<Vec<f64>> {
    let read_error = |e: hound::Error| DisperserError::InvalidAudio {
        reason: format!("Failed to read {}-bit samples: {}", bits_per_sample, e),
        source: Some(Box::new(e)),
    };

    match sample_format {
        SampleFormat::Float => reader
            .samples::<f32>()
            .map(|s| s.map(f64::from))
            .collect::<std::result::Result<Vec<f64>, _>>()
            .map_err(read_error),
        SampleFormat::Int => {
            let scale = match bits_per_sample {
                8 => 128.0,
                16 => 32768.0,
                24 => 8388608.0,
                32 => 2147483648.0,
                _ => {
                    return Err(DisperserError::UnsupportedFormat {
                        format: format!("{}-bit integer audio", bits_per_sample),
                    })
                }
            };

            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f64 / scale))
                .collect::<std::result::Result<Vec<f64>, _>>()
                .map_err(read_error)
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
