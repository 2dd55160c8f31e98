//! Configuration for orthosync-core
//!
//! Centralized configuration for render loop timing, mode handler defaults
//! and interaction behavior.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Engine-wide configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Render loop timing and fidelity
    pub render: RenderLoopConfig,
    /// Mode handler defaults
    pub handlers: HandlerConfig,
    /// Interaction behavior
    pub interaction: InteractionConfig,
}

/// Render loop timing and fidelity configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderLoopConfig {
    /// Timer period in milliseconds (33 ms is roughly 30 Hz)
    pub tick_interval_ms: u64,
    /// Desired update rate (frames per second) requested while dragging
    pub interactive_update_rate: f64,
    /// Desired update rate requested at rest; tiny values mean "full quality"
    pub still_update_rate: f64,
}

impl Default for RenderLoopConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 33,
            interactive_update_rate: 10.0,
            still_update_rate: 0.0001,
        }
    }
}

impl RenderLoopConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

/// Defaults used when constructing mode handlers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HandlerConfig {
    /// Fraction of the scalar range used as the initial extraction threshold
    pub iso_fraction: f64,
    /// Opacity of the translucent reference planes
    pub plane_opacity: f64,
    /// Offset lifting crosshair lines above their slice, in world units
    pub crosshair_layer_offset: f64,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            iso_fraction: 0.4,
            plane_opacity: 0.2,
            crosshair_layer_offset: 0.05,
        }
    }
}

/// Interaction configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionConfig {
    /// Slice steps per wheel notch
    pub wheel_step: i32,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self { wheel_step: 1 }
    }
}

impl SyncConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }

    /// Serialize configuration to TOML
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Load configuration from a JSON string
    pub fn from_json(json_str: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json_str)
    }

    /// Serialize configuration to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.render.tick_interval_ms == 0 {
            return Err(ConfigError::OutOfRange(
                "tick_interval_ms must be positive".to_string(),
            ));
        }

        if self.render.interactive_update_rate <= 0.0 || self.render.still_update_rate <= 0.0 {
            return Err(ConfigError::OutOfRange(
                "update rates must be positive".to_string(),
            ));
        }

        if self.render.interactive_update_rate <= self.render.still_update_rate {
            return Err(ConfigError::InvalidRates(
                "interactive_update_rate must exceed still_update_rate".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.handlers.iso_fraction) {
            return Err(ConfigError::OutOfRange(
                "iso_fraction must be between 0.0 and 1.0".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.handlers.plane_opacity) {
            return Err(ConfigError::OutOfRange(
                "plane_opacity must be between 0.0 and 1.0".to_string(),
            ));
        }

        if self.interaction.wheel_step == 0 {
            return Err(ConfigError::OutOfRange(
                "wheel_step must be non-zero".to_string(),
            ));
        }

        Ok(())
    }
}

/// Configuration validation error
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Rate values are invalid relative to each other
    #[error("Invalid rates: {0}")]
    InvalidRates(String),
    /// Value is out of valid range
    #[error("Value out of range: {0}")]
    OutOfRange(String),
}
