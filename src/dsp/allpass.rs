//! Second-order all-pass stage
//!
//! Bilinear-transform biquad whose numerator is the mirrored denominator,
//! so the magnitude response is unity everywhere and only phase is altered.

use rustfft::num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Lower bound applied to Q before coefficient derivation
pub const MIN_Q: f64 = 0.005;

/// Normalized all-pass coefficients
///
/// Transfer function: H(z) = (c0 + c1*z^-1 + c2*z^-2) / (1 + c3*z^-1 + c4*z^-2)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AllPassCoefficients {
    pub c0: f64,
    pub c1: f64,
    pub c2: f64,
    pub c3: f64,
    pub c4: f64,
}

impl AllPassCoefficients {
    /// Derive coefficients for a center frequency, sample rate and Q
    ///
    /// # Arguments
    /// * `frequency` - Center frequency in Hz (must be positive)
    /// * `sample_rate` - Sample rate in Hz (must be positive)
    /// * `q` - Resonance, floored at [`MIN_Q`]
    pub fn calculate(frequency: f64, sample_rate: f64, q: f64) -> Self {
        let q = q.max(MIN_Q);

        let w0 = 2.0 * PI * frequency / sample_rate;
        let cos_w0 = w0.cos();
        let alpha = w0.sin() * (2.0 * q);

        let b0 = 1.0 - alpha;
        let b1 = -2.0 * cos_w0;
        let b2 = 1.0 + alpha;
        let a0 = 1.0 + alpha;
        let a1 = -2.0 * cos_w0;
        let a2 = 1.0 - alpha;

        Self {
            c0: b0 / a0,
            c1: b1 / a0,
            c2: b2 / a0,
            c3: a1 / a0,
            c4: a2 / a0,
        }
    }

    /// Complex frequency response H(e^jw) at `frequency`
    pub fn response(&self, frequency: f64, sample_rate: f64) -> Complex64 {
        let w = 2.0 * PI * frequency / sample_rate;
        let z1 = Complex64::from_polar(1.0, -w);
        let z2 = Complex64::from_polar(1.0, -2.0 * w);

        let num = self.c0 + z1 * self.c1 + z2 * self.c2;
        let den = 1.0 + z1 * self.c3 + z2 * self.c4;
        num / den
    }

    /// Check if the poles lie strictly inside the unit circle
    pub fn is_stable(&self) -> bool {
        // Jury criterion for 1 + c3 z^-1 + c4 z^-2
        self.c4.abs() < 1.0 && self.c3.abs() < 1.0 + self.c4
    }
}

/// One all-pass filter with direct-form-I state
#[derive(Debug, Clone, Copy, Default)]
pub struct AllPassStage {
    coeffs: AllPassCoefficients,
    xm1: f64,
    xm2: f64,
    ym1: f64,
    ym2: f64,
}

impl AllPassStage {
    /// Create a stage tuned to `frequency` with cleared state
    pub fn new(frequency: f64, sample_rate: f64, q: f64) -> Self {
        Self::with_coefficients(AllPassCoefficients::calculate(frequency, sample_rate, q))
    }

    /// Create a stage from precomputed coefficients with cleared state
    pub fn with_coefficients(coeffs: AllPassCoefficients) -> Self {
        Self {
            coeffs,
            ..Default::default()
        }
    }

    /// Current coefficients
    pub fn coefficients(&self) -> &AllPassCoefficients {
        &self.coeffs
    }

    /// Replace the coefficients, keeping the filter history
    pub fn set_coefficients(&mut self, coeffs: AllPassCoefficients) {
        self.coeffs = coeffs;
    }

    /// Take over another stage's tuning without touching this stage's history
    pub fn copy_coefficients_from(&mut self, other: &AllPassStage) {
        self.coeffs = other.coeffs;
    }

    /// Zero the input and output history
    pub fn reset(&mut self) {
        self.xm1 = 0.0;
        self.xm2 = 0.0;
        self.ym1 = 0.0;
        self.ym2 = 0.0;
    }

    /// True when all four history values are zero
    pub fn is_at_rest(&self) -> bool {
        self.xm1 == 0.0 && self.xm2 == 0.0 && self.ym1 == 0.0 && self.ym2 == 0.0
    }

    #[inline]
    pub fn process_sample(&mut self, x: f64) -> f64 {
        let c = &self.coeffs;
        let y = c.c0 * x + c.c1 * self.xm1 + c.c2 * self.xm2 - c.c3 * self.ym1 - c.c4 * self.ym2;

        self.ym2 = self.ym1;
        self.ym1 = y;
        self.xm2 = self.xm1;
        self.xm1 = x;

        y
    }

    /// Filter `input` into `output`
    ///
    /// Processes `min(input.len(), output.len())` samples.
    pub fn process_block(&mut self, input: &[f64], output: &mut [f64]) {
        for (x, y) in input.iter().zip(output.iter_mut()) {
            *y = self.process_sample(*x);
        }
    }

    /// Filter a buffer in place
    ///
    /// Each output only depends on the current input and the stored history,
    /// so overwriting sample `i` before reading `i + 1` gives the same result
    /// as separate buffers.
    pub fn process_in_place(&mut self, buffer: &mut [f64]) {
        for sample in buffer.iter_mut() {
            *sample = self.process_sample(*sample);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    fn noise(len: usize, seed: u64) -> Vec<f64> {
        let mut state = seed;
        (0..len)
            .map(|_| {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                ((state >> 11) as f64 / (1u64 << 53) as f64) * 2.0 - 1.0
            })
            .collect()
    }

    #[test]
    fn test_coefficients_match_closed_form() {
        let co = AllPassCoefficients::calculate(1000.0, 44100.0, 0.707);

        let w0 = 2.0 * PI * 1000.0 / 44100.0;
        let alpha = w0.sin() * 2.0 * 0.707;
        let a0 = 1.0 + alpha;

        assert_abs_diff_eq!(co.c0, (1.0 - alpha) / a0, epsilon = 1e-9);
        assert_abs_diff_eq!(co.c1, -2.0 * w0.cos() / a0, epsilon = 1e-9);
        assert_abs_diff_eq!(co.c2, 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(co.c3, -2.0 * w0.cos() / a0, epsilon = 1e-9);
        assert_abs_diff_eq!(co.c4, (1.0 - alpha) / a0, epsilon = 1e-9);
    }

    #[test]
    fn test_numerator_mirrors_denominator() {
        let co = AllPassCoefficients::calculate(440.0, 48000.0, 0.3);
        // b0/a0 == a2/a0, b1 == a1, b2 == a0
        assert_eq!(co.c0, co.c4);
        assert_eq!(co.c1, co.c3);
        assert_relative_eq!(co.c2, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_q_is_floored() {
        let floored = AllPassCoefficients::calculate(1000.0, 44100.0, 0.0);
        let at_floor = AllPassCoefficients::calculate(1000.0, 44100.0, MIN_Q);
        assert_eq!(floored, at_floor);
        assert!(floored.c0.is_finite());
        assert!(floored.is_stable());

        let negative = AllPassCoefficients::calculate(1000.0, 44100.0, -3.0);
        assert_eq!(negative, at_floor);
    }

    #[test]
    fn test_response_has_unity_magnitude() {
        let co = AllPassCoefficients::calculate(700.0, 44100.0, 0.99);
        for freq in [20.0, 100.0, 700.0, 5000.0, 20000.0] {
            assert_relative_eq!(co.response(freq, 44100.0).norm(), 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_phase_is_minus_pi_at_center() {
        let co = AllPassCoefficients::calculate(2000.0, 48000.0, 0.5);
        let phase = co.response(2000.0, 48000.0).arg();
        assert_relative_eq!(phase.abs(), PI, epsilon = 1e-9);
    }

    #[test]
    fn test_process_block_recursion() {
        let mut stage = AllPassStage::new(1000.0, 44100.0, 0.707);
        let c = *stage.coefficients();
        let input = [1.0, 0.5, -0.25, 0.0];
        let mut output = [0.0; 4];
        stage.process_block(&input, &mut output);

        let y0 = c.c0 * 1.0;
        let y1 = c.c0 * 0.5 + c.c1 * 1.0 - c.c3 * y0;
        let y2 = c.c0 * -0.25 + c.c1 * 0.5 + c.c2 * 1.0 - c.c3 * y1 - c.c4 * y0;
        let y3 = c.c1 * -0.25 + c.c2 * 0.5 - c.c3 * y2 - c.c4 * y1;

        assert_eq!(output, [y0, y1, y2, y3]);
    }

    #[test]
    fn test_in_place_matches_separate_buffers() {
        let input = noise(512, 7);
        let mut a = AllPassStage::new(300.0, 44100.0, 0.4);
        let mut b = a;

        let mut separate = vec![0.0; input.len()];
        a.process_block(&input, &mut separate);

        let mut in_place = input.clone();
        b.process_in_place(&mut in_place);

        assert_eq!(separate, in_place);
    }

    #[test]
    fn test_copy_coefficients_keeps_state() {
        let mut source = AllPassStage::new(5000.0, 44100.0, 1.0);
        let mut target = AllPassStage::new(100.0, 44100.0, 0.2);
        target.process_in_place(&mut [0.3, -0.2, 0.9]);
        assert!(!target.is_at_rest());

        target.copy_coefficients_from(&source);
        assert_eq!(target.coefficients(), source.coefficients());
        assert!(!target.is_at_rest());

        source.reset();
        assert!(source.is_at_rest());
    }

    #[test]
    fn test_reset_forgets_history() {
        let history = noise(256, 42);
        let follow = noise(64, 99);

        let mut used = AllPassStage::new(800.0, 44100.0, 0.6);
        used.process_in_place(&mut history.clone());
        used.reset();

        let mut fresh = AllPassStage::with_coefficients(*used.coefficients());

        let mut out_used = vec![0.0; follow.len()];
        let mut out_fresh = vec![0.0; follow.len()];
        used.process_block(&follow, &mut out_used);
        fresh.process_block(&follow, &mut out_fresh);

        assert_eq!(out_used, out_fresh);
    }

    #[test]
    fn test_reset_keeps_coefficients() {
        let mut stage = AllPassStage::new(1200.0, 48000.0, 0.5);
        let before = *stage.coefficients();
        stage.process_in_place(&mut [1.0, 1.0]);
        stage.reset();
        assert_eq!(*stage.coefficients(), before);
    }
}
