use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

use super::ShadowType;

/// Names of the shaders the shadow map camera looks up on the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShaderNames {
    /// Override shader writing light space depth
    pub caster: String,
    /// Shared post-process shader, pass 0 writes exponential moments, pass 1 variance moments
    pub moments: String,
    /// Custom deferred lighting shader installed in the deferred shading slot
    pub deferred_lighting: String,
}

impl Default for ShaderNames {
    fn default() -> Self {
        Self {
            caster: "ESM/ShadowmapCaster".to_string(),
            moments: "ESM/E_ShadowmapCaster".to_string(),
            deferred_lighting: "ESM/DeferredShading".to_string(),
        }
    }
}

/// Configuration of a [ShadowmapCamera](super::ShadowmapCamera)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShadowSettings {
    pub shadow_type: ShadowType,
    /// Normal offset applied before the exponential lookup, in [0, 0.1]
    pub esm_normal_bias: f32,
    /// Width and height of every shadow render target
    pub resolution: u32,
    pub shaders: ShaderNames,
}

impl ShadowSettings {
    pub const DEFAULT_RESOLUTION: u32 = 2048;
    pub const MAX_RESOLUTION: u32 = 16384;
    pub const DEFAULT_ESM_NORMAL_BIAS: f32 = 0.001;
    pub const MAX_ESM_NORMAL_BIAS: f32 = 0.1;

    pub fn check_resolution(resolution: u32) -> Result<(), ConfigError> {
        if resolution == 0 || resolution > Self::MAX_RESOLUTION {
            return Err(ConfigError::Resolution {
                value: resolution,
                max: Self::MAX_RESOLUTION,
            });
        }
        Ok(())
    }

    /// Clamps to [0, 0.1], NaN becomes the default bias
    pub fn clamp_esm_normal_bias(bias: f32) -> f32 {
        if bias.is_nan() {
            Self::DEFAULT_ESM_NORMAL_BIAS
        } else {
            bias.clamp(0.0, Self::MAX_ESM_NORMAL_BIAS)
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let mut settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_json_str(&json)
    }

    pub fn to_json_string(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Clamps the normal bias into range and rejects settings that cannot produce a render target
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        Self::check_resolution(self.resolution)?;

        let clamped = Self::clamp_esm_normal_bias(self.esm_normal_bias);
        if clamped.to_bits() != self.esm_normal_bias.to_bits() {
            log::warn!(
                "esm_normal_bias {} out of range, clamped to {}",
                self.esm_normal_bias,
                clamped
            );
            self.esm_normal_bias = clamped;
        }

        let names = [
            ("caster", &self.shaders.caster),
            ("moments", &self.shaders.moments),
            ("deferred_lighting", &self.shaders.deferred_lighting),
        ];
        for (field, name) in names {
            if name.trim().is_empty() {
                return Err(ConfigError::EmptyShaderName(field));
            }
        }

        Ok(())
    }
}

impl Default for ShadowSettings {
    fn default() -> Self {
        Self {
            shadow_type: ShadowType::default(),
            esm_normal_bias: Self::DEFAULT_ESM_NORMAL_BIAS,
            resolution: Self::DEFAULT_RESOLUTION,
            shaders: ShaderNames::default(),
        }
    }
}
