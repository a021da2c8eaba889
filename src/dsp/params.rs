//! Disperser parameters
//!
//! Host-facing controls, their ranges, and the mapping from controls to the
//! values the filter math uses. [`DisperserParams`] is shared between the
//! control thread and the audio thread; the audio thread takes one
//! [`DisperserSettings`] snapshot per block.

use atomic_float::AtomicF64;
use serde::{Deserialize, Serialize};
use std::f64::consts::SQRT_2;
use std::sync::atomic::{AtomicU32, Ordering};

use super::allpass::MIN_Q;

// ============================================================================
// Ranges
// ============================================================================

/// Inclusive range with a default value
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamRange {
    pub min: f64,
    pub max: f64,
    pub default: f64,
}

impl ParamRange {
    #[inline]
    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }

    /// Position of `value` inside the range, 0.0 to 1.0
    #[inline]
    pub fn normalize(&self, value: f64) -> f64 {
        (self.clamp(value) - self.min) / (self.max - self.min)
    }

    /// Human-readable description for error messages
    pub fn describe(&self) -> String {
        format!("number {}-{}", self.min, self.max)
    }
}

/// Frequency control
pub const FREQUENCY_RANGE: ParamRange = ParamRange {
    min: 20.0,
    max: 20000.0,
    default: 700.0,
};

/// Number of cascaded stages
pub const INTENSITY_RANGE: ParamRange = ParamRange {
    min: 1.0,
    max: 50.0,
    default: 25.0,
};

/// Q control, scaled by sqrt(2) before use
pub const Q_RANGE: ParamRange = ParamRange {
    min: 0.0,
    max: 1.41,
    default: 0.7,
};

/// Dry/wet blend
pub const MIX_RANGE: ParamRange = ParamRange {
    min: 0.0,
    max: 1.0,
    default: 0.8,
};

// ============================================================================
// Control mapping
// ============================================================================

/// Resolved frequency below which a large retune clears filter history
pub const POP_GUARD_MAX_HZ: f64 = 500.0;

/// How the frequency control turns into a filter frequency in Hz
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrequencyMapping {
    /// Musical exponential sweep over the control range (about 20 Hz - 20 kHz)
    #[default]
    Exponential,
    /// The control value is the frequency in Hz
    Direct,
}

impl FrequencyMapping {
    /// Map a frequency control value to Hz
    pub fn resolve(&self, control: f64) -> f64 {
        match self {
            FrequencyMapping::Exponential => {
                exponential_curve(FREQUENCY_RANGE.normalize(control))
            }
            FrequencyMapping::Direct => FREQUENCY_RANGE.clamp(control).floor(),
        }
    }
}

/// Exponential note curve: 0.0 maps to ~20 Hz, 1.0 to ~20 kHz
///
/// Walks 120 semitones up from MIDI note 16 and truncates to whole Hz.
pub fn exponential_curve(position: f64) -> f64 {
    (((16.0 + position * 100.0 * 1.20103) * 1.059_f64.ln()).exp() * 8.17742).floor()
}

/// Q actually fed to the coefficient math
pub fn effective_q(q_control: f64) -> f64 {
    let q = q_control * SQRT_2;
    if q <= MIN_Q {
        MIN_Q
    } else {
        q
    }
}

/// Whether a retune should clear stage history to avoid a pop
///
/// Large jumps (more than 10% of the new control value) into the low
/// register are the ones that make a running cascade burst.
pub fn needs_pop_guard(control: f64, previous_control: f64, resolved_hz: f64) -> bool {
    (control - previous_control).abs() > control / 10.0 && resolved_hz < POP_GUARD_MAX_HZ
}

// ============================================================================
// Settings snapshot
// ============================================================================

/// Plain copy of the four controls, as read at the start of a block
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisperserSettings {
    /// Frequency control (20-20000)
    pub frequency: f64,
    /// Stage count (1-50)
    pub intensity: u32,
    /// Q control (0.0-1.41)
    pub q: f64,
    /// Dry/wet mix (0.0-1.0)
    pub mix: f64,
}

impl Default for DisperserSettings {
    fn default() -> Self {
        Self {
            frequency: FREQUENCY_RANGE.default,
            intensity: INTENSITY_RANGE.default as u32,
            q: Q_RANGE.default,
            mix: MIX_RANGE.default,
        }
    }
}

impl DisperserSettings {
    /// Build settings, clamping every value to its range
    pub fn new(frequency: f64, intensity: u32, q: f64, mix: f64) -> Self {
        Self {
            frequency,
            intensity,
            q,
            mix,
        }
        .clamped()
    }

    /// Copy with every value clamped to its range
    pub fn clamped(self) -> Self {
        Self {
            frequency: FREQUENCY_RANGE.clamp(self.frequency),
            intensity: clamp_intensity(self.intensity as f64),
            q: Q_RANGE.clamp(self.q),
            mix: MIX_RANGE.clamp(self.mix),
        }
    }
}

#[inline]
fn clamp_intensity(value: f64) -> u32 {
    // Truncate like an integer host attribute
    INTENSITY_RANGE.clamp(value).trunc() as u32
}

// ============================================================================
// Shared parameters
// ============================================================================

/// Lock-free parameter block shared between control and audio threads
///
/// Setters clamp to the host ranges. Each value is independent; a block
/// might see a new frequency together with an old mix, which is fine since
/// nothing ties them together.
#[derive(Debug)]
pub struct DisperserParams {
    frequency: AtomicF64,
    intensity: AtomicU32,
    q: AtomicF64,
    mix: AtomicF64,
}

impl DisperserParams {
    pub fn new(settings: DisperserSettings) -> Self {
        let settings = settings.clamped();
        Self {
            frequency: AtomicF64::new(settings.frequency),
            intensity: AtomicU32::new(settings.intensity),
            q: AtomicF64::new(settings.q),
            mix: AtomicF64::new(settings.mix),
        }
    }

    pub fn set_frequency(&self, value: f64) {
        self.frequency
            .store(FREQUENCY_RANGE.clamp(value), Ordering::Release);
    }

    pub fn set_intensity(&self, value: f64) {
        self.intensity
            .store(clamp_intensity(value), Ordering::Release);
    }

    pub fn set_q(&self, value: f64) {
        self.q.store(Q_RANGE.clamp(value), Ordering::Release);
    }

    pub fn set_mix(&self, value: f64) {
        self.mix.store(MIX_RANGE.clamp(value), Ordering::Release);
    }

    /// Replace all four values
    pub fn apply(&self, settings: DisperserSettings) {
        self.set_frequency(settings.frequency);
        self.set_intensity(settings.intensity as f64);
        self.set_q(settings.q);
        self.set_mix(settings.mix);
    }

    pub fn frequency(&self) -> f64 {
        self.frequency.load(Ordering::Acquire)
    }

    pub fn intensity(&self) -> u32 {
        self.intensity.load(Ordering::Acquire)
    }

    pub fn q(&self) -> f64 {
        self.q.load(Ordering::Acquire)
    }

    pub fn mix(&self) -> f64 {
        self.mix.load(Ordering::Acquire)
    }

    /// Read all four values once
    pub fn snapshot(&self) -> DisperserSettings {
        DisperserSettings {
            frequency: self.frequency(),
            intensity: self.intensity(),
            q: self.q(),
            mix: self.mix(),
        }
    }
}

impl Default for DisperserParams {
    fn default() -> Self {
        Self::new(DisperserSettings::default())
    }
}
