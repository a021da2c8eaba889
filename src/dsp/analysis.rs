//! Response analysis
//!
//! Closed-form magnitude, phase and group delay of a cascade of identical
//! all-pass stages, plus FFT-based measurement of rendered impulse
//! responses for checking what the processing actually does.

use rustfft::{num_complex::Complex, FftPlanner};
use serde::Serialize;
use std::f64::consts::PI;

use super::allpass::{AllPassCoefficients, AllPassStage};
use crate::engine::buffer::linear_to_db;

/// Cascade response at a single frequency
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ResponsePoint {
    /// Frequency in Hz
    pub frequency: f64,
    /// Magnitude in dB (0 for an ideal all-pass)
    pub magnitude_db: f64,
    /// Unwrapped phase in radians
    pub phase_rad: f64,
    /// Group delay in samples
    pub group_delay_samples: f64,
}

/// Evaluate a cascade of `stages` identical stages at each frequency
///
/// Frequencies should be ascending for the phase unwrapping to be
/// meaningful.
pub fn cascade_response(
    coeffs: &AllPassCoefficients,
    stages: usize,
    sample_rate: f64,
    frequencies: &[f64],
) -> Vec<ResponsePoint> {
    let n = stages as f64;
    let mut unwrapped = 0.0;
    let mut previous: Option<f64> = None;

    frequencies
        .iter()
        .map(|&frequency| {
            let h = coeffs.response(frequency, sample_rate);
            let phase = h.arg();

            // Unwrap one stage, then scale: the cascade wraps N times faster
            unwrapped = match previous {
                None => phase,
                Some(prev) => unwrapped + wrap_to_pi(phase - prev),
            };
            previous = Some(phase);

            ResponsePoint {
                frequency,
                magnitude_db: n * linear_to_db(h.norm()),
                phase_rad: n * unwrapped,
                group_delay_samples: n * group_delay(coeffs, frequency, sample_rate),
            }
        })
        .collect()
}

/// Group delay of a single stage in samples
///
/// Uses tau = Re(sum k b_k z^-k / B) - Re(sum k a_k z^-k / A).
pub fn group_delay(coeffs: &AllPassCoefficients, frequency: f64, sample_rate: f64) -> f64 {
    let w = 2.0 * PI * frequency / sample_rate;
    let z1 = Complex::from_polar(1.0, -w);
    let z2 = Complex::from_polar(1.0, -2.0 * w);

    let num = coeffs.c0 + z1 * coeffs.c1 + z2 * coeffs.c2;
    let num_ramp = z1 * coeffs.c1 + z2 * (2.0 * coeffs.c2);
    let den = 1.0 + z1 * coeffs.c3 + z2 * coeffs.c4;
    let den_ramp = z1 * coeffs.c3 + z2 * (2.0 * coeffs.c4);

    (num_ramp / num).re - (den_ramp / den).re
}

#[inline]
fn wrap_to_pi(mut angle: f64) -> f64 {
    while angle > PI {
        angle -= 2.0 * PI;
    }
    while angle < -PI {
        angle += 2.0 * PI;
    }
    angle
}

/// Impulse response of a stage, starting from rest
pub fn impulse_response(stage: &AllPassStage, len: usize) -> Vec<f64> {
    cascade_impulse_response(stage.coefficients(), 1, len)
}

/// Impulse response of `stages` identical stages in series, from rest
pub fn cascade_impulse_response(
    coeffs: &AllPassCoefficients,
    stages: usize,
    len: usize,
) -> Vec<f64> {
    let mut buffer = vec![0.0; len];
    if let Some(first) = buffer.first_mut() {
        *first = 1.0;
    }

    for _ in 0..stages {
        AllPassStage::with_coefficients(*coeffs).process_in_place(&mut buffer);
    }

    buffer
}

/// Magnitude spectrum of an impulse response in dB
///
/// Returns `len / 2 + 1` bins from DC to Nyquist. The response should have
/// decayed before the end of the slice or the spectrum will show ripple.
pub fn magnitude_spectrum_db(impulse: &[f64]) -> Vec<f64> {
    if impulse.is_empty() {
        return Vec::new();
    }

    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(impulse.len());

    let mut spectrum: Vec<Complex<f64>> =
        impulse.iter().map(|&s| Complex::new(s, 0.0)).collect();
    fft.process(&mut spectrum);

    spectrum
        .iter()
        .take(impulse.len() / 2 + 1)
        .map(|c| linear_to_db(c.norm()))
        .collect()
}

/// Logarithmically spaced frequencies from `low` to `high` inclusive
///
/// Returns an empty list when `low` is not positive or `high < low`.
pub fn log_spaced_frequencies(low: f64, high: f64, points: usize) -> Vec<f64> {
    if low <= 0.0 || high < low || points == 0 {
        return Vec::new();
    }
    if points == 1 {
        return vec![low];
    }

    let ratio = high / low;
    (0..points)
        .map(|i| low * ratio.powf(i as f64 / (points - 1) as f64))
        .collect()
}
