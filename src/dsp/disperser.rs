//! Phase Disperser Effect
//!
//! Drives a stereo [`FilterBank`] block by block:
//! 1. take one parameter snapshot and resize/retune the cascade
//! 2. copy the input to the wet buffers and re-arm the silence tracker
//! 3. filter through every active stage unless the tracker went dormant
//! 4. count silence on the filtered signal
//! 5. blend wet and dry with the mix control
//!
//! Nothing in the block path allocates, locks or logs. Buffers are sized
//! at construction and in [`Effect::prepare`].

use std::sync::Arc;

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::bank::FilterBank;
use super::effect::{Effect, EffectParams};
use super::params::{
    effective_q, needs_pop_guard, DisperserParams, DisperserSettings, ParamRange,
    FREQUENCY_RANGE, INTENSITY_RANGE, MIX_RANGE, Q_RANGE,
};
use super::silence::SilenceTracker;
use crate::config::{CoefficientRate, EngineConfig};
use crate::engine::buffer::DEFAULT_SAMPLE_RATE;
use crate::engine::AudioBuffer;
use crate::error::{DisperserError, Result};

/// Highest resolved frequency as a fraction of the coefficient sample rate
const NYQUIST_GUARD: f64 = 0.49;

/// Serialized form of the effect: identity plus the four controls
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisperserPreset {
    pub params: EffectParams,
    #[serde(default)]
    pub settings: DisperserSettings,
}

/// Stereo phase disperser
#[derive(Debug)]
pub struct DispersionEngine {
    effect: EffectParams,
    config: EngineConfig,
    params: Arc<DisperserParams>,
    bank: FilterBank,
    silence: SilenceTracker,
    wet_left: Vec<f64>,
    wet_right: Vec<f64>,
    mono_scratch: Vec<f64>,
    sample_rate: f64,
    /// Controls the bank was last tuned with
    last_frequency: f64,
    last_q: f64,
    resolved_hz: f64,
    needs_retune: bool,
}

impl DispersionEngine {
    /// Create an engine with default controls
    pub fn new(config: EngineConfig) -> Result<Self> {
        Self::with_settings(config, DisperserSettings::default())
    }

    /// Create an engine with initial control values
    ///
    /// # Errors
    /// * `InvalidConfig` - if the configuration fails validation
    pub fn with_settings(config: EngineConfig, settings: DisperserSettings) -> Result<Self> {
        config.validate()?;
        debug!(
            "Creating disperser: {} stages, {} sample blocks, {:?} coefficients",
            config.max_stages, config.max_block_size, config.coefficient_rate
        );
        Ok(Self::build(config, settings))
    }

    fn build(config: EngineConfig, settings: DisperserSettings) -> Self {
        Self {
            effect: EffectParams::default(),
            params: Arc::new(DisperserParams::new(settings)),
            bank: FilterBank::new(config.max_stages),
            silence: SilenceTracker::new(
                config.noise_floor,
                config.deactivate_after_samples,
                config.silence_counter_cap,
            ),
            wet_left: vec![0.0; config.max_block_size],
            wet_right: vec![0.0; config.max_block_size],
            mono_scratch: vec![0.0; config.max_block_size],
            sample_rate: DEFAULT_SAMPLE_RATE as f64,
            last_frequency: 0.0,
            last_q: 0.0,
            resolved_hz: 0.0,
            needs_retune: false,
            config,
        }
    }

    // ------------------------------------------------------------------------
    // Parameters
    // ------------------------------------------------------------------------

    /// Shared parameter block, for a control thread
    pub fn params(&self) -> Arc<DisperserParams> {
        Arc::clone(&self.params)
    }

    /// Current control values
    pub fn settings(&self) -> DisperserSettings {
        self.params.snapshot()
    }

    pub fn set_frequency(&mut self, value: f64) {
        self.params.set_frequency(value);
    }

    pub fn set_intensity(&mut self, value: u32) {
        self.params.set_intensity(value as f64);
    }

    pub fn set_q(&mut self, value: f64) {
        self.params.set_q(value);
    }

    pub fn set_mix(&mut self, value: f64) {
        self.params.set_mix(value);
    }

    // ------------------------------------------------------------------------
    // State inspection
    // ------------------------------------------------------------------------

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn bank(&self) -> &FilterBank {
        &self.bank
    }

    /// Stages currently in the signal path
    pub fn active_stages(&self) -> usize {
        self.bank.active_count()
    }

    /// Filter frequency in Hz the bank was last tuned to (0 before the first block)
    pub fn resolved_frequency_hz(&self) -> f64 {
        self.resolved_hz
    }

    /// True while silence keeps the cascade bypassed
    pub fn is_dormant(&self) -> bool {
        self.silence.is_dormant()
    }

    pub fn samples_since_signal(&self) -> u32 {
        self.silence.samples_since_signal()
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Sample rate used by the coefficient math
    pub fn coefficient_sample_rate(&self) -> f64 {
        self.config.coefficient_rate.resolve(self.sample_rate)
    }

    /// Adopt a new host rate, marking the bank for retune in host mode
    ///
    /// Zero is ignored. Safe to call from the block path.
    fn update_sample_rate(&mut self, sample_rate: u32) {
        if sample_rate == 0 || sample_rate as f64 == self.sample_rate {
            return;
        }
        self.sample_rate = sample_rate as f64;
        if self.bank.is_active() && self.config.coefficient_rate == CoefficientRate::Host {
            self.needs_retune = true;
        }
    }

    // ------------------------------------------------------------------------
    // Processing
    // ------------------------------------------------------------------------

    /// Process one host block
    ///
    /// `min` of the four slice lengths is processed. Blocks longer than the
    /// working buffers are split; each piece takes its own parameter
    /// snapshot. When disabled the input is copied through.
    pub fn process_block(
        &mut self,
        in_left: &[f64],
        in_right: &[f64],
        out_left: &mut [f64],
        out_right: &mut [f64],
    ) {
        let frames = in_left
            .len()
            .min(in_right.len())
            .min(out_left.len())
            .min(out_right.len());

        if !self.effect.enabled {
            out_left[..frames].copy_from_slice(&in_left[..frames]);
            out_right[..frames].copy_from_slice(&in_right[..frames]);
            return;
        }

        let chunk = self.wet_left.len();
        let mut start = 0;
        while start < frames {
            let end = (start + chunk).min(frames);
            let n = end - start;
            let mix = self.run_wet(&in_left[start..end], &in_right[start..end]);

            blend(&self.wet_left[..n], &in_left[start..end], &mut out_left[start..end], mix);
            blend(&self.wet_right[..n], &in_right[start..end], &mut out_right[start..end], mix);
            start = end;
        }
    }

    /// Process one host block in place
    pub fn process_block_in_place(&mut self, left: &mut [f64], right: &mut [f64]) {
        if !self.effect.enabled {
            return;
        }

        let frames = left.len().min(right.len());
        let chunk = self.wet_left.len();
        let mut start = 0;
        while start < frames {
            let end = (start + chunk).min(frames);
            let n = end - start;
            let mix = self.run_wet(&left[start..end], &right[start..end]);

            blend_in_place(&self.wet_left[..n], &mut left[start..end], mix);
            blend_in_place(&self.wet_right[..n], &mut right[start..end], mix);
            start = end;
        }
    }

    /// Fill the wet buffers for one chunk and return the mix to apply
    fn run_wet(&mut self, dry_left: &[f64], dry_right: &[f64]) -> f64 {
        let settings = self.params.snapshot();
        self.update_cascade(&settings);

        let n = dry_left.len();
        let wet_left = &mut self.wet_left[..n];
        let wet_right = &mut self.wet_right[..n];
        wet_left.copy_from_slice(dry_left);
        wet_right.copy_from_slice(dry_right);

        self.silence.scan_input(wet_left, wet_right);

        if !self.silence.is_dormant() && self.bank.is_active() && settings.mix > 0.0 {
            self.bank.process_serial_in_place(wet_left, wet_right);
        }

        // Counting on the filtered signal lets the cascade ring out before sleeping
        self.silence.scan_output(wet_left, wet_right);

        settings.mix
    }

    /// Resize and, when needed, retune the cascade for this block
    fn update_cascade(&mut self, settings: &DisperserSettings) {
        let target = (settings.intensity as usize).clamp(1, self.bank.capacity());

        let changed = settings.frequency != self.last_frequency || settings.q != self.last_q;
        if !self.bank.is_active() || self.needs_retune || (self.config.retune_on_change && changed)
        {
            self.retune(settings);
        }

        self.bank.set_active_count(target);
    }

    /// Rebuild every slot from a freshly computed reference stage
    fn retune(&mut self, settings: &DisperserSettings) {
        let rate = self.coefficient_sample_rate();
        let hz = self
            .config
            .frequency_mapping
            .resolve(settings.frequency)
            .min((rate * NYQUIST_GUARD).floor());
        let reset = needs_pop_guard(settings.frequency, self.last_frequency, hz);

        self.bank
            .rebuild_from_reference(hz, rate, effective_q(settings.q), reset);

        self.last_frequency = settings.frequency;
        self.last_q = settings.q;
        self.resolved_hz = hz;
        self.needs_retune = false;
    }
}

#[inline]
fn blend(wet: &[f64], dry: &[f64], out: &mut [f64], mix: f64) {
    for ((o, &w), &d) in out.iter_mut().zip(wet).zip(dry) {
        *o = w * mix + d * (1.0 - mix);
    }
}

#[inline]
fn blend_in_place(wet: &[f64], buffer: &mut [f64], mix: f64) {
    for (b, &w) in buffer.iter_mut().zip(wet) {
        *b = w * mix + *b * (1.0 - mix);
    }
}

impl Clone for DispersionEngine {
    /// Deep copy: the clone gets its own parameter block
    fn clone(&self) -> Self {
        Self {
            effect: self.effect.clone(),
            config: self.config.clone(),
            params: Arc::new(DisperserParams::new(self.params.snapshot())),
            bank: self.bank.clone(),
            silence: self.silence.clone(),
            wet_left: self.wet_left.clone(),
            wet_right: self.wet_right.clone(),
            mono_scratch: self.mono_scratch.clone(),
            sample_rate: self.sample_rate,
            last_frequency: self.last_frequency,
            last_q: self.last_q,
            resolved_hz: self.resolved_hz,
            needs_retune: self.needs_retune,
        }
    }
}

impl Default for DispersionEngine {
    fn default() -> Self {
        Self::build(EngineConfig::default(), DisperserSettings::default())
    }
}

impl Effect for DispersionEngine {
    fn name(&self) -> &'static str {
        "phase-disperser"
    }

    fn effect_params(&self) -> &EffectParams {
        &self.effect
    }

    fn effect_params_mut(&mut self) -> &mut EffectParams {
        &mut self.effect
    }

    fn process(&mut self, buffer: &mut AudioBuffer) {
        if !self.effect.enabled {
            return;
        }

        self.update_sample_rate(buffer.sample_rate);

        match buffer.channels() {
            2 => {
                if let Some((left, right)) = buffer.stereo_mut() {
                    self.process_block_in_place(left, right);
                }
            }
            1 => {
                // Pair the mono channel with silence so only it drives the tracker
                let mut scratch = std::mem::take(&mut self.mono_scratch);
                for chunk in buffer.channel_mut(0).chunks_mut(scratch.len()) {
                    let silent = &mut scratch[..chunk.len()];
                    silent.fill(0.0);
                    self.process_block_in_place(chunk, silent);
                }
                self.mono_scratch = scratch;
            }
            n => warn!("Phase disperser skipped a {}-channel buffer", n),
        }
    }

    fn prepare(&mut self, sample_rate: u32, max_block_size: usize) {
        if sample_rate == 0 {
            warn!("Ignoring zero sample rate");
        }
        self.update_sample_rate(sample_rate);

        if max_block_size > self.wet_left.len() {
            self.wet_left.resize(max_block_size, 0.0);
            self.wet_right.resize(max_block_size, 0.0);
            self.mono_scratch.resize(max_block_size, 0.0);
        }

        debug!(
            "Prepared phase disperser at {} Hz (coefficients at {} Hz), {} sample blocks",
            self.sample_rate,
            self.coefficient_sample_rate(),
            self.wet_left.len()
        );
    }

    fn reset(&mut self) {
        self.bank.reset();
        self.silence.reset();
    }

    fn to_json(&self) -> Result<Value> {
        let preset = DisperserPreset {
            params: self.effect.clone(),
            settings: self.params.snapshot(),
        };
        Ok(serde_json::to_value(preset)?)
    }

    fn from_json(&mut self, json: &Value) -> Result<()> {
        let preset: DisperserPreset = serde_json::from_value(json.clone())?;
        self.effect = preset.params;
        self.params.apply(preset.settings);
        debug!("Loaded preset for phase disperser {}", self.effect.id);
        Ok(())
    }

    fn get_params(&self) -> Value {
        let settings = self.params.snapshot();
        json!({
            "effect": self.name(),
            "frequency": settings.frequency,
            "intensity": settings.intensity,
            "q": settings.q,
            "mix": settings.mix,
            "enabled": self.effect.enabled,
            "resolved_frequency_hz": self.resolved_hz,
            "active_stages": self.bank.active_count(),
            "dormant": self.silence.is_dormant(),
        })
    }

    fn set_param(&mut self, name: &str, value: &Value) -> Result<()> {
        let number = |range: &ParamRange| {
            value
                .as_f64()
                .ok_or_else(|| DisperserError::invalid_parameter(name, value, range.describe()))
        };

        match name {
            "frequency" => self.params.set_frequency(number(&FREQUENCY_RANGE)?),
            "intensity" => self.params.set_intensity(number(&INTENSITY_RANGE)?),
            "q" => self.params.set_q(number(&Q_RANGE)?),
            "mix" => self.params.set_mix(number(&MIX_RANGE)?),
            "enabled" => {
                self.effect.enabled = value
                    .as_bool()
                    .ok_or_else(|| DisperserError::invalid_parameter(name, value, "bool"))?;
            }
            _ => {
                return Err(DisperserError::invalid_parameter(
                    name,
                    value,
                    "one of frequency, intensity, q, mix, enabled",
                ))
            }
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
