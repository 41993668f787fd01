//! # Engine Configuration
//!
//! Settings shared by every scene the engine creates: logging, strictness,
//! light capacity, and the shadow-map parameters cameras read at activation.
//!
//! ```toml
//! log_level = "debug"
//! max_number_of_lights = 4
//! shadows = true
//! shadow_distance = 30.0
//! ```

use serde::{Serialize, Deserialize};

pub use crate::config::{Config, ConfigError, ConfigFormat};

/// Largest shadow map edge the engine will request from the backend
pub const MAX_SHADOW_MAP_SIZE: u32 = 4096;

/// # Engine Configuration
///
/// Missing fields fall back to [`EngineConfig::default`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Log level for the engine
    pub log_level: String,
    /// Strict mode: invalid setter input is reported as an error instead of ignored
    pub debug_mode: bool,
    /// Point light capacity of each scene
    pub max_number_of_lights: usize,
    /// Whether cameras may render shadow maps
    pub shadows: bool,
    /// Distance in front of the camera covered by the shadow map
    pub shadow_distance: f32,
    /// How far the shadow volume's near plane is pulled back, in multiples of its radius
    pub shadow_near_multiplier: f32,
    /// Scale applied to the maximum shadow map size
    pub shadow_map_quality: f32,
}

impl EngineConfig {
    /// Create a new engine configuration
    pub fn new() -> Self {
        Self {
            log_level: "info".to_string(),
            debug_mode: cfg!(debug_assertions),
            max_number_of_lights: 8,
            shadows: false,
            shadow_distance: 20.0,
            shadow_near_multiplier: 3.0,
            shadow_map_quality: 1.0,
        }
    }

    /// Set log level
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Enable or disable strict mode
    pub fn with_debug(mut self, enabled: bool) -> Self {
        self.debug_mode = enabled;
        self
    }

    /// Set the point light capacity
    pub fn with_max_lights(mut self, max: usize) -> Self {
        self.max_number_of_lights = max;
        self
    }

    /// Enable shadow mapping
    pub fn with_shadows(mut self, enabled: bool) -> Self {
        self.shadows = enabled;
        self
    }

    /// Shadow map edge length given the backend's texture size limit
    pub fn shadow_map_size(&self, backend_max_texture_size: u32) -> u32 {
        let size = backend_max_texture_size.min(MAX_SHADOW_MAP_SIZE) as f32 * self.shadow_map_quality;
        (size as u32).max(1)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl Config for EngineConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if !(self.shadow_distance > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "shadow_distance must be positive, got {}", self.shadow_distance
            )));
        }
        if !(self.shadow_map_quality > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "shadow_map_quality must be positive, got {}", self.shadow_map_quality
            )));
        }
        if !self.shadow_near_multiplier.is_finite() {
            return Err(ConfigError::Invalid("shadow_near_multiplier must be finite".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = EngineConfig::parse("max_number_of_lights = 2\nshadows = true\n", ConfigFormat::Toml)
            .expect("valid toml");
        assert_eq!(config.max_number_of_lights, 2);
        assert!(config.shadows);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_ron_config() {
        let config = EngineConfig::parse("(shadow_distance: 40.0)", ConfigFormat::Ron).expect("valid ron");
        assert!((config.shadow_distance - 40.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_invalid_shadow_distance_rejected() {
        let result = EngineConfig::parse("shadow_distance = -1.0", ConfigFormat::Toml);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_shadow_map_size_is_capped() {
        let config = EngineConfig { shadow_map_quality: 0.5, ..EngineConfig::default() };
        assert_eq!(config.shadow_map_size(16384), 2048);
        assert_eq!(config.shadow_map_size(1024), 512);
    }

    #[test]
    fn test_unknown_extension() {
        let result = EngineConfig::load_from_file("engine.ini");
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat(_))));
    }
}
