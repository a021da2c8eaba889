//! Disperser - stereo phase dispersion
//!
//! A cascade of identical second-order all-pass filters smears the phase
//! of a signal around a chosen frequency without changing its magnitude
//! spectrum. The result is blended with the dry input.
//!
//! # Architecture
//!
//! - [`dsp`]: all-pass stages, the stage bank, silence tracking and the
//!   [`DispersionEngine`] block processor
//! - [`engine`]: f64 audio buffers and WAV I/O for offline rendering
//! - [`config`]: engine sizing and behaviour switches
//! - [`cli`]: the `disperser-cli` command surface
//!
//! # Example
//! ```
//! use disperser::{DispersionEngine, EngineConfig};
//!
//! let mut engine = DispersionEngine::new(EngineConfig::default()).unwrap();
//! engine.set_intensity(10);
//!
//! let input = vec![0.25; 256];
//! let mut left = vec![0.0; 256];
//! let mut right = vec![0.0; 256];
//! engine.process_block(&input, &input, &mut left, &mut right);
//! assert_eq!(engine.active_stages(), 10);
//! ```

pub mod cli;
pub mod config;
pub mod dsp;
pub mod engine;
pub mod error;

pub use config::{CoefficientRate, EngineConfig};
pub use dsp::{DispersionEngine, DisperserParams, DisperserSettings, Effect};
pub use error::{DisperserError, Result};
