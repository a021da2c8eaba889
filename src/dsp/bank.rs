//! Fixed-capacity cascade of all-pass stages
//!
//! Both channels share one active-stage cursor. Storage is allocated once in
//! [`FilterBank::new`]; growing or shrinking the cascade only moves the cursor.

use super::allpass::{AllPassCoefficients, AllPassStage};

/// Default number of stages per channel
pub const DEFAULT_MAX_STAGES: usize = 50;

/// Stereo bank of serially connected all-pass stages
#[derive(Debug, Clone)]
pub struct FilterBank {
    left: Box<[AllPassStage]>,
    right: Box<[AllPassStage]>,
    active: usize,
}

impl FilterBank {
    /// Create a bank holding `capacity` stages per channel (at least one)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            left: vec![AllPassStage::default(); capacity].into_boxed_slice(),
            right: vec![AllPassStage::default(); capacity].into_boxed_slice(),
            active: 0,
        }
    }

    /// Number of stage slots per channel
    pub fn capacity(&self) -> usize {
        self.left.len()
    }

    /// Number of stages currently in the signal path
    pub fn active_count(&self) -> usize {
        self.active
    }

    pub fn is_active(&self) -> bool {
        self.active > 0
    }

    pub fn left_stage(&self, index: usize) -> Option<&AllPassStage> {
        self.left.get(index)
    }

    pub fn right_stage(&self, index: usize) -> Option<&AllPassStage> {
        self.right.get(index)
    }

    /// Coefficients of the reference stage (slot 0)
    pub fn reference_coefficients(&self) -> &AllPassCoefficients {
        self.left[0].coefficients()
    }

    /// Move the active-stage cursor
    ///
    /// Growing from a non-zero count hands the tuning of the last active
    /// stage to every newly activated slot. Shrinking leaves the dormant
    /// stages untouched. Growing from zero only moves the cursor; the caller
    /// tunes the bank first with [`FilterBank::rebuild_from_reference`].
    /// The count is clamped to the capacity.
    pub fn set_active_count(&mut self, count: usize) {
        let count = count.min(self.capacity());

        if count > self.active && self.active > 0 {
            let last = self.active - 1;
            let (left_src, left_dst) = self.left.split_at_mut(self.active);
            let (right_src, right_dst) = self.right.split_at_mut(self.active);
            let new_range = count - self.active;

            for stage in &mut left_dst[..new_range] {
                stage.copy_coefficients_from(&left_src[last]);
            }
            for stage in &mut right_dst[..new_range] {
                stage.copy_coefficients_from(&right_src[last]);
            }
        }

        self.active = count;
    }

    /// Retune the whole bank from a freshly computed reference stage
    ///
    /// Slot 0 is replaced by a fresh stage, so its history always starts
    /// from rest. Every other slot (active or not) copies its coefficients
    /// and keeps its history unless `reset_state` is set.
    pub fn rebuild_from_reference(
        &mut self,
        frequency: f64,
        sample_rate: f64,
        q: f64,
        reset_state: bool,
    ) {
        let coeffs = AllPassCoefficients::calculate(frequency, sample_rate, q);

        for channel in [&mut self.left, &mut self.right] {
            let (reference, rest) = channel.split_at_mut(1);
            reference[0] = AllPassStage::with_coefficients(coeffs);

            for stage in rest.iter_mut() {
                stage.copy_coefficients_from(&reference[0]);
                if reset_state {
                    stage.reset();
                }
            }
        }
    }

    /// Run both channels through every active stage, in place
    pub fn process_serial_in_place(&mut self, left: &mut [f64], right: &mut [f64]) {
        let active = self.active;
        for (l, r) in self.left[..active]
            .iter_mut()
            .zip(self.right[..active].iter_mut())
        {
            l.process_in_place(left);
            r.process_in_place(right);
        }
    }

    /// Run both channels through every active stage
    ///
    /// The inputs are copied to the outputs first; `min` of the paired
    /// lengths is processed per channel.
    pub fn process_serial(
        &mut self,
        in_left: &[f64],
        in_right: &[f64],
        out_left: &mut [f64],
        out_right: &mut [f64],
    ) {
        let n_left = in_left.len().min(out_left.len());
        let n_right = in_right.len().min(out_right.len());
        out_left[..n_left].copy_from_slice(&in_left[..n_left]);
        out_right[..n_right].copy_from_slice(&in_right[..n_right]);

        self.process_serial_in_place(&mut out_left[..n_left], &mut out_right[..n_right]);
    }

    /// Clear the history of every slot; coefficients and cursor are kept
    pub fn reset(&mut self) {
        for stage in self.left.iter_mut().chain(self.right.iter_mut()) {
            stage.reset();
        }
    }
}

impl Default for FilterBank {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_STAGES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tuned_bank(capacity: usize, active: usize) -> FilterBank {
        let mut bank = FilterBank::new(capacity);
        bank.rebuild_from_reference(1000.0, 44100.0, 0.99, true);
        bank.set_active_count(active);
        bank
    }

    fn sine(len: usize, freq: f64) -> Vec<f64> {
        (0..len)
            .map(|i| (2.0 * std::f64::consts::PI * freq * i as f64 / 44100.0).sin())
            .collect()
    }

    #[test]
    fn test_new_bank_is_inactive() {
        let bank = FilterBank::new(8);
        assert_eq!(bank.capacity(), 8);
        assert_eq!(bank.active_count(), 0);
        assert!(!bank.is_active());
        assert_eq!(FilterBank::new(0).capacity(), 1);
    }

    #[test]
    fn test_rebuild_fills_every_slot() {
        let bank = tuned_bank(10, 2);
        let reference = *bank.reference_coefficients();
        for i in 0..bank.capacity() {
            assert_eq!(*bank.left_stage(i).unwrap().coefficients(), reference);
            assert_eq!(*bank.right_stage(i).unwrap().coefficients(), reference);
        }
    }

    #[test]
    fn test_active_count_is_clamped() {
        let mut bank = tuned_bank(4, 1);
        bank.set_active_count(99);
        assert_eq!(bank.active_count(), 4);
    }

    #[test]
    fn test_growth_copies_last_active_stage() {
        let mut bank = FilterBank::new(6);
        bank.rebuild_from_reference(1000.0, 44100.0, 0.5, true);
        bank.set_active_count(2);

        // Retune only the first two slots by hand so growth has a distinct source
        let retuned = AllPassCoefficients::calculate(250.0, 44100.0, 0.3);
        bank.left[1].set_coefficients(retuned);
        bank.right[1].set_coefficients(retuned);

        bank.set_active_count(5);
        for i in 2..5 {
            assert_eq!(*bank.left_stage(i).unwrap().coefficients(), retuned);
            assert_eq!(*bank.right_stage(i).unwrap().coefficients(), retuned);
        }
        // Beyond the new range nothing changed
        assert_ne!(*bank.left_stage(5).unwrap().coefficients(), retuned);
    }

    #[test]
    fn test_shrink_keeps_dormant_state() {
        let mut bank = tuned_bank(4, 4);
        let mut l = sine(64, 440.0);
        let mut r = sine(64, 660.0);
        bank.process_serial_in_place(&mut l, &mut r);

        bank.set_active_count(1);
        assert_eq!(bank.active_count(), 1);
        assert!(!bank.left_stage(3).unwrap().is_at_rest());
        assert!(!bank.right_stage(3).unwrap().is_at_rest());
    }

    #[test]
    fn test_inactive_stages_are_not_processed() {
        let mut bank = tuned_bank(4, 2);
        let mut l = sine(32, 440.0);
        let mut r = sine(32, 440.0);
        bank.process_serial_in_place(&mut l, &mut r);

        assert!(!bank.left_stage(1).unwrap().is_at_rest());
        assert!(bank.left_stage(2).unwrap().is_at_rest());
        assert!(bank.right_stage(3).unwrap().is_at_rest());
    }

    #[test]
    fn test_serial_matches_manual_chain() {
        let mut bank = tuned_bank(8, 3);
        let input = sine(256, 523.0);

        let mut expected = input.clone();
        let stage = AllPassStage::with_coefficients(*bank.reference_coefficients());
        let mut stages = [stage, stage, stage];
        for s in stages.iter_mut() {
            s.process_in_place(&mut expected);
        }

        let mut out_l = vec![0.0; input.len()];
        let mut out_r = vec![0.0; input.len()];
        bank.process_serial(&input, &input, &mut out_l, &mut out_r);

        assert_eq!(out_l, expected);
        assert_eq!(out_r, expected);
    }

    #[test]
    fn test_channels_are_independent() {
        let mut bank = tuned_bank(4, 4);
        let mut l = sine(128, 440.0);
        let mut r = vec![0.0; 128];
        bank.process_serial_in_place(&mut l, &mut r);

        assert!(r.iter().all(|&s| s == 0.0));
        assert!(l.iter().any(|&s| s != 0.0));
    }

    #[test]
    fn test_rebuild_without_reset_keeps_history() {
        let mut bank = tuned_bank(3, 3);
        let mut l = sine(64, 440.0);
        let mut r = sine(64, 440.0);
        bank.process_serial_in_place(&mut l, &mut r);

        bank.rebuild_from_reference(2000.0, 44100.0, 0.5, false);
        assert!(bank.left_stage(0).unwrap().is_at_rest());
        assert!(bank.right_stage(0).unwrap().is_at_rest());
        assert!(!bank.left_stage(1).unwrap().is_at_rest());
        assert!(!bank.left_stage(2).unwrap().is_at_rest());
        assert!(!bank.right_stage(2).unwrap().is_at_rest());
        assert_eq!(
            *bank.left_stage(2).unwrap().coefficients(),
            AllPassCoefficients::calculate(2000.0, 44100.0, 0.5)
        );

        bank.rebuild_from_reference(200.0, 44100.0, 0.5, true);
        assert!(bank.left_stage(0).unwrap().is_at_rest());
        assert!(bank.right_stage(2).unwrap().is_at_rest());
    }

    #[test]
    fn test_reset_clears_all_slots() {
        let mut bank = tuned_bank(5, 5);
        let mut l = sine(64, 440.0);
        let mut r = sine(64, 440.0);
        bank.process_serial_in_place(&mut l, &mut r);

        let coeffs = *bank.reference_coefficients();
        bank.reset();
        for i in 0..5 {
            assert!(bank.left_stage(i).unwrap().is_at_rest());
            assert!(bank.right_stage(i).unwrap().is_at_rest());
        }
        assert_eq!(*bank.reference_coefficients(), coeffs);
        assert_eq!(bank.active_count(), 5);
    }
}
