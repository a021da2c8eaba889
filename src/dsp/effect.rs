//! Host-facing effect interface
//!
//! Whole-buffer processing at the buffer's own sample rate, instance
//! identity and JSON presets. Block-level processing with separate dry and
//! wet slices lives on [`super::DispersionEngine`].

use crate::engine::AudioBuffer;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identity and bypass state carried in every preset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectParams {
    pub id: String,
    pub enabled: bool,
}

impl Default for EffectParams {
    fn default() -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            enabled: true,
        }
    }
}

pub trait Effect: Send + Sync {
    /// Machine name, reported by `get_params`
    fn name(&self) -> &'static str;

    /// Process every channel of `buffer` in place
    ///
    /// Follows `buffer.sample_rate` without reallocating.
    fn process(&mut self, buffer: &mut AudioBuffer);

    /// Set the host rate and grow working buffers. May allocate and log.
    fn prepare(&mut self, sample_rate: u32, max_block_size: usize);

    /// Clear filter history and silence tracking, keeping parameters
    fn reset(&mut self);

    fn effect_params(&self) -> &EffectParams;

    fn effect_params_mut(&mut self) -> &mut EffectParams;

    fn id(&self) -> &str {
        &self.effect_params().id
    }

    fn set_id(&mut self, id: String) {
        self.effect_params_mut().id = id;
    }

    /// A disabled effect leaves buffers untouched and its cascade idle
    fn set_enabled(&mut self, enabled: bool) {
        self.effect_params_mut().enabled = enabled;
    }

    fn to_json(&self) -> Result<Value>;

    /// Load a preset; identity, enabled flag and controls are replaced
    fn from_json(&mut self, json: &Value) -> Result<()>;

    /// Controls plus read-only engine state
    fn get_params(&self) -> Value;

    /// Set one control by name (`frequency`, `intensity`, `q`, `mix`, `enabled`)
    fn set_param(&mut self, name: &str, value: &Value) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_params_have_fresh_ids() {
        let a = EffectParams::default();
        let b = EffectParams::default();
        assert!(a.enabled);
        assert_ne!(a.id, b.id);
        assert!(uuid::Uuid::parse_str(&a.id).is_ok());
    }

    #[test]
    fn test_params_from_json() {
        let params: EffectParams =
            serde_json::from_value(json!({"id": "left-bus", "enabled": false})).unwrap();
        assert_eq!(
            params,
            EffectParams {
                id: "left-bus".to_string(),
                enabled: false,
            }
        );
        assert!(serde_json::from_value::<EffectParams>(json!({"id": 4})).is_err());
    }
}
