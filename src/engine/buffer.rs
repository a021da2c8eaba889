//! Audio Buffer Management
//!
//! Planar double-precision buffer used for offline rendering. The filter
//! math runs in f64, so buffers stay in f64 from import to export.

use crate::error::{DisperserError, Result};

// ============================================================================
// Constants
// ============================================================================

/// Default sample rate for generated buffers
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;

// ============================================================================
// Helper Functions
// ============================================================================

/// Convert decibels to linear amplitude
#[inline]
pub fn db_to_linear(db: f64) -> f64 {
    10.0_f64.powf(db / 20.0)
}

/// Convert linear amplitude to decibels
///
/// Returns -infinity for zero input.
#[inline]
pub fn linear_to_db(linear: f64) -> f64 {
    if linear <= 0.0 {
        f64::NEG_INFINITY
    } else {
        20.0 * linear.log10()
    }
}

/// RMS level of a buffer across all channels, in dB
///
/// Returns -infinity for empty or silent buffers.
pub fn calculate_rms(buffer: &AudioBuffer) -> f64 {
    let total_samples = buffer.num_channels() * buffer.num_samples();
    if total_samples == 0 {
        return f64::NEG_INFINITY;
    }

    let sum_squares: f64 = buffer
        .samples
        .iter()
        .flat_map(|channel| channel.iter())
        .map(|&s| s * s)
        .sum();

    linear_to_db((sum_squares / total_samples as f64).sqrt())
}

/// Peak level of a buffer across all channels, in dB
pub fn calculate_peak(buffer: &AudioBuffer) -> f64 {
    let peak = buffer
        .samples
        .iter()
        .flat_map(|channel| channel.iter())
        .map(|&s| s.abs())
        .fold(0.0_f64, f64::max);

    linear_to_db(peak)
}

// ============================================================================
// Channel Layout
// ============================================================================

/// Audio channel configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ChannelLayout {
    /// Single channel (mono)
    Mono,
    /// Two channels (stereo: left, right)
    #[default]
    Stereo,
}

impl ChannelLayout {
    /// Returns the number of channels for this layout
    pub fn num_channels(&self) -> usize {
        match self {
            ChannelLayout::Mono => 1,
            ChannelLayout::Stereo => 2,
        }
    }

    /// Create a ChannelLayout from a channel count
    pub fn from_count(count: usize) -> Option<Self> {
        match count {
            1 => Some(ChannelLayout::Mono),
            2 => Some(ChannelLayout::Stereo),
            _ => None,
        }
    }
}

// ============================================================================
// Audio Buffer
// ============================================================================

/// Non-interleaved f64 audio, one `Vec` per channel
///
/// # Example
/// ```
/// use disperser::engine::buffer::{AudioBuffer, ChannelLayout};
///
/// let buffer = AudioBuffer::new(44100, ChannelLayout::Stereo, 44100);
/// assert_eq!(buffer.channels(), 2);
/// assert_eq!(buffer.len(), 44100);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    /// Sample data: outer Vec is channels, inner Vec is samples
    pub samples: Vec<Vec<f64>>,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

impl AudioBuffer {
    /// Create a zeroed buffer
    pub fn new(num_samples: usize, layout: ChannelLayout, sample_rate: u32) -> Self {
        Self {
            samples: vec![vec![0.0_f64; num_samples]; layout.num_channels()],
            sample_rate,
        }
    }

    /// Build a buffer from per-channel vectors
    ///
    /// # Errors
    /// * `UnsupportedFormat` - zero or more than two channels
    /// * `InvalidAudio` - channels of different lengths
    pub fn from_channels(samples: Vec<Vec<f64>>, sample_rate: u32) -> Result<Self> {
        if ChannelLayout::from_count(samples.len()).is_none() {
            return Err(DisperserError::UnsupportedFormat {
                format: format!("{}-channel audio (only mono/stereo supported)", samples.len()),
            });
        }

        let len = samples[0].len();
        if samples.iter().any(|ch| ch.len() != len) {
            return Err(DisperserError::InvalidAudio {
                reason: "Channels have different lengths".to_string(),
                source: None,
            });
        }

        Ok(Self {
            samples,
            sample_rate,
        })
    }

    /// Create an audio buffer from interleaved sample data (L, R, L, R, ...)
    pub fn from_interleaved(
        interleaved: &[f64],
        layout: ChannelLayout,
        sample_rate: u32,
    ) -> Result<Self> {
        let num_channels = layout.num_channels();

        if interleaved.len() % num_channels != 0 {
            return Err(DisperserError::InvalidAudio {
                reason: format!(
                    "Interleaved data length {} is not divisible by channel count {}",
                    interleaved.len(),
                    num_channels
                ),
                source: None,
            });
        }

        let num_samples = interleaved.len() / num_channels;
        let mut samples = vec![Vec::with_capacity(num_samples); num_channels];

        for frame in interleaved.chunks_exact(num_channels) {
            for (ch, &sample) in frame.iter().enumerate() {
                samples[ch].push(sample);
            }
        }

        Ok(Self {
            samples,
            sample_rate,
        })
    }

    /// Convert the buffer to interleaved format
    pub fn to_interleaved(&self) -> Vec<f64> {
        let num_channels = self.channels();
        let num_samples = self.len();

        let mut interleaved = Vec::with_capacity(num_channels * num_samples);
        for sample_idx in 0..num_samples {
            for channel in &self.samples {
                interleaved.push(channel[sample_idx]);
            }
        }

        interleaved
    }

    /// Sine tone on every channel
    pub fn sine(
        frequency: f64,
        amplitude: f64,
        num_samples: usize,
        layout: ChannelLayout,
        sample_rate: u32,
    ) -> Self {
        let mut buffer = Self::new(num_samples, layout, sample_rate);
        let angular = 2.0 * std::f64::consts::PI * frequency / sample_rate as f64;

        for channel in &mut buffer.samples {
            for (i, sample) in channel.iter_mut().enumerate() {
                *sample = amplitude * (angular * i as f64).sin();
            }
        }

        buffer
    }

    /// Get the number of channels
    #[inline]
    pub fn channels(&self) -> usize {
        self.samples.len()
    }

    /// Alias for channels()
    #[inline]
    pub fn num_channels(&self) -> usize {
        self.channels()
    }

    /// Get the number of samples per channel
    #[inline]
    pub fn len(&self) -> usize {
        self.samples.first().map(|ch| ch.len()).unwrap_or(0)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Alias for len()
    #[inline]
    pub fn num_samples(&self) -> usize {
        self.len()
    }

    /// Duration in seconds
    #[inline]
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.len() as f64 / self.sample_rate as f64
    }

    pub fn channel_layout(&self) -> Option<ChannelLayout> {
        ChannelLayout::from_count(self.channels())
    }

    /// Immutable access to a channel
    ///
    /// # Panics
    /// Panics if the channel index is out of bounds
    #[inline]
    pub fn channel(&self, index: usize) -> &[f64] {
        &self.samples[index]
    }

    /// Mutable access to a channel
    ///
    /// # Panics
    /// Panics if the channel index is out of bounds
    #[inline]
    pub fn channel_mut(&mut self, index: usize) -> &mut [f64] {
        &mut self.samples[index]
    }

    /// Mutable access to both channels of a stereo buffer at once
    pub fn stereo_mut(&mut self) -> Option<(&mut [f64], &mut [f64])> {
        match self.samples.as_mut_slice() {
            [left, right] => Some((left.as_mut_slice(), right.as_mut_slice())),
            _ => None,
        }
    }

    #[inline]
    pub fn get_sample(&self, channel: usize, index: usize) -> Option<f64> {
        self.samples
            .get(channel)
            .and_then(|ch| ch.get(index).copied())
    }

    #[inline]
    pub fn set_sample(&mut self, channel: usize, index: usize, value: f64) -> bool {
        if let Some(sample) = self
            .samples
            .get_mut(channel)
            .and_then(|ch| ch.get_mut(index))
        {
            *sample = value;
            return true;
        }
        false
    }

    /// Check if all samples are finite (not NaN or Infinity)
    pub fn is_finite(&self) -> bool {
        self.samples
            .iter()
            .flat_map(|ch| ch.iter())
            .all(|s| s.is_finite())
    }
}

impl Default for AudioBuffer {
    fn default() -> Self {
        Self::new(0, ChannelLayout::Stereo, DEFAULT_SAMPLE_RATE)
    }
}

// ============================================================================
// Tests
// ============================================================================
