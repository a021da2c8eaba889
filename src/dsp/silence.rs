//! Silence tracking for auto-bypass
//!
//! Counts consecutive sub-floor samples across both channels. Once the count
//! reaches the deactivation threshold the cascade can be skipped entirely.

/// Amplitude below which a sample counts as silent
pub const DEFAULT_NOISE_FLOOR: f64 = 0.000007;

/// Silent samples after which the cascade goes dormant
pub const DEFAULT_DEACTIVATE_AFTER: u32 = 16384;

/// Saturation point of the silence counter
pub const DEFAULT_COUNTER_CAP: u32 = 32768;

/// Shared stereo silence counter
#[derive(Debug, Clone)]
pub struct SilenceTracker {
    noise_floor: f64,
    deactivate_after: u32,
    cap: u32,
    samples_since_signal: u32,
}

impl SilenceTracker {
    pub fn new(noise_floor: f64, deactivate_after: u32, cap: u32) -> Self {
        Self {
            noise_floor,
            deactivate_after,
            cap: cap.max(deactivate_after),
            samples_since_signal: 1,
        }
    }

    pub fn noise_floor(&self) -> f64 {
        self.noise_floor
    }

    pub fn samples_since_signal(&self) -> u32 {
        self.samples_since_signal
    }

    /// True once enough silence has passed to skip the cascade
    pub fn is_dormant(&self) -> bool {
        self.samples_since_signal >= self.deactivate_after
    }

    #[inline]
    fn is_signal(&self, left: f64, right: f64) -> bool {
        left.abs() >= self.noise_floor || right.abs() >= self.noise_floor
    }

    /// Input pass: any audible sample re-arms the cascade
    ///
    /// Silent input does not advance the counter here; only the output pass
    /// counts, so a block is never counted twice.
    pub fn scan_input(&mut self, left: &[f64], right: &[f64]) {
        if left
            .iter()
            .zip(right.iter())
            .any(|(&l, &r)| self.is_signal(l, r))
        {
            self.samples_since_signal = 0;
        }
    }

    /// Output pass: reset on audible samples, otherwise count up to the cap
    pub fn scan_output(&mut self, left: &[f64], right: &[f64]) {
        for (&l, &r) in left.iter().zip(right.iter()) {
            if self.is_signal(l, r) {
                self.samples_since_signal = 0;
            } else if self.samples_since_signal < self.cap {
                self.samples_since_signal += 1;
            }
        }
    }

    /// Forget any counted silence
    pub fn reset(&mut self) {
        self.samples_since_signal = 1;
    }
}

impl Default for SilenceTracker {
    fn default() -> Self {
        Self::new(
            DEFAULT_NOISE_FLOOR,
            DEFAULT_DEACTIVATE_AFTER,
            DEFAULT_COUNTER_CAP,
        )
    }
}
