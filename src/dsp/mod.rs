//! DSP for the phase disperser
//!
//! All-pass stages, the stereo stage bank, silence tracking and the engine
//! that ties them together. The engine implements the `Effect` trait for
//! whole-buffer processing and presets.

pub mod allpass;
pub mod analysis;
pub mod bank;
mod disperser;
mod effect;
pub mod params;
pub mod silence;

pub use allpass::{AllPassCoefficients, AllPassStage, MIN_Q};
pub use analysis::{cascade_response, ResponsePoint};
pub use bank::FilterBank;
pub use disperser::{DispersionEngine, DisperserPreset};
pub use effect::{Effect, EffectParams};
pub use params::{DisperserParams, DisperserSettings, FrequencyMapping};
pub use silence::SilenceTracker;
