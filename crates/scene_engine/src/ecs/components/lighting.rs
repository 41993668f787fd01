//! Light component
//!
//! A light's position and direction come from its entity's transform. The
//! scene registers every activated light with [`crate::scene::SceneLights`],
//! which packs the per-frame data the shaders consume.

use serde::{Deserialize, Serialize};

use crate::core::{SceneError, SceneResult};
use crate::foundation::math::Vec3;

/// Types of lights supported by the lighting system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LightType {
    /// Uniform light from every direction; at most one per scene
    Ambient,
    /// Parallel rays along the transform's +Z axis; at most one per scene
    Directional,
    /// Radiates from the transform's position
    Point,
}

/// Light data attached to an entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Light {
    #[serde(rename = "type")]
    light_type: LightType,
    color: Vec3,
    intensity: f32,
    attenuation: Vec3,
    shadow: bool,
    shadow_strength: f32,
    shadow_bias: f32,
    #[serde(skip)]
    activated: bool,
}

impl Default for Light {
    fn default() -> Self {
        Self::new(LightType::Point)
    }
}

impl Light {
    /// White light of the given type with intensity 1 and no attenuation falloff
    pub fn new(light_type: LightType) -> Self {
        Self {
            light_type,
            color: Vec3::new(1.0, 1.0, 1.0),
            intensity: 1.0,
            attenuation: Vec3::new(1.0, 0.0, 0.0),
            shadow: false,
            shadow_strength: 1.0,
            shadow_bias: 0.05,
            activated: false,
        }
    }

    /// Set color
    pub fn with_color(mut self, color: Vec3) -> Self {
        self.color = color;
        self
    }

    /// Set intensity
    pub fn with_intensity(mut self, intensity: f32) -> Self {
        self.intensity = intensity;
        self
    }

    /// Set constant, linear, and quadratic attenuation
    pub fn with_attenuation(mut self, attenuation: Vec3) -> Self {
        self.attenuation = attenuation;
        self
    }

    /// Enable shadow casting (directional lights only)
    pub fn with_shadow(mut self, shadow: bool) -> Self {
        self.shadow = shadow;
        self
    }

    /// Light type
    pub fn light_type(&self) -> LightType {
        self.light_type
    }

    /// Change the light type; fails once the light is active in a scene
    pub fn set_light_type(&mut self, light_type: LightType) -> SceneResult<()> {
        if self.activated && light_type != self.light_type {
            return Err(SceneError::InvalidOperation(
                "Light type cannot be changed after activation".to_string(),
            ));
        }
        self.light_type = light_type;
        Ok(())
    }

    /// Color without intensity
    pub fn color(&self) -> Vec3 {
        self.color
    }

    /// Set color
    pub fn set_color(&mut self, color: Vec3) {
        self.color = color;
    }

    /// Intensity multiplier
    pub fn intensity(&self) -> f32 {
        self.intensity
    }

    /// Set intensity
    pub fn set_intensity(&mut self, intensity: f32) {
        self.intensity = intensity;
    }

    /// Color multiplied by intensity, the value shaders receive
    pub fn color_intensity(&self) -> Vec3 {
        self.color * self.intensity
    }

    /// Constant, linear, and quadratic attenuation coefficients
    pub fn attenuation(&self) -> Vec3 {
        self.attenuation
    }

    /// Set attenuation coefficients
    pub fn set_attenuation(&mut self, attenuation: Vec3) {
        self.attenuation = attenuation;
    }

    /// Whether this light casts shadows
    pub fn shadow(&self) -> bool {
        self.shadow
    }

    /// Enable or disable shadows; the camera allocates or frees the shadow map on its next frame
    pub fn set_shadow(&mut self, shadow: bool) {
        self.shadow = shadow;
    }

    /// Shadow darkness in [0, 1]
    pub fn shadow_strength(&self) -> f32 {
        self.shadow_strength
    }

    /// Set shadow darkness
    pub fn set_shadow_strength(&mut self, strength: f32) {
        self.shadow_strength = strength.clamp(0.0, 1.0);
    }

    /// Depth bias applied when sampling the shadow map
    pub fn shadow_bias(&self) -> f32 {
        self.shadow_bias
    }

    /// Set depth bias
    pub fn set_shadow_bias(&mut self, bias: f32) {
        self.shadow_bias = bias;
    }

    /// Whether the light is registered with a scene
    pub fn is_activated(&self) -> bool {
        self.activated
    }

    pub(crate) fn set_activated(&mut self, activated: bool) {
        self.activated = activated;
    }
}

/// Factory functions for the common light setups
pub struct LightFactory;

impl LightFactory {
    /// Ambient light
    pub fn ambient(color: Vec3, intensity: f32) -> Light {
        Light::new(LightType::Ambient).with_color(color).with_intensity(intensity)
    }

    /// Directional light; orient it through its entity's transform
    pub fn directional(color: Vec3, intensity: f32) -> Light {
        Light::new(LightType::Directional).with_color(color).with_intensity(intensity)
    }

    /// Point light with attenuation coefficients
    pub fn point(color: Vec3, intensity: f32, attenuation: Vec3) -> Light {
        Light::new(LightType::Point)
            .with_color(color)
            .with_intensity(intensity)
            .with_attenuation(attenuation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_light_defaults() {
        let light = Light::default();
        assert_eq!(light.light_type(), LightType::Point);
        assert_eq!(light.color(), Vec3::new(1.0, 1.0, 1.0));
        assert_eq!(light.attenuation(), Vec3::new(1.0, 0.0, 0.0));
        assert!(!light.shadow());
        assert_relative_eq!(light.shadow_bias(), 0.05);
    }

    #[test]
    fn test_color_intensity() {
        let light = LightFactory::point(Vec3::new(1.0, 0.5, 0.0), 2.0, Vec3::new(1.0, 0.1, 0.0));
        assert_relative_eq!(light.color_intensity(), Vec3::new(2.0, 1.0, 0.0));
    }

    #[test]
    fn test_type_is_fixed_after_activation() {
        let mut light = Light::new(LightType::Point);
        light.set_light_type(LightType::Directional).unwrap();

        light.set_activated(true);
        assert!(light.set_light_type(LightType::Ambient).is_err());
        assert_eq!(light.light_type(), LightType::Directional);
    }

    #[test]
    fn test_json_config_uses_defaults_for_missing_fields() {
        let light: Light = serde_json::from_str(r#"{"type":"Directional","intensity":0.5}"#).unwrap();
        assert_eq!(light.light_type(), LightType::Directional);
        assert_relative_eq!(light.intensity(), 0.5);
        assert_eq!(light.color(), Vec3::new(1.0, 1.0, 1.0));
    }
}
