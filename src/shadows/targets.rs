use crate::{backend::RenderTargetHandle, error::BackendError};

/// Describes a render target to allocate on a backend
#[derive(Debug, Clone, PartialEq)]
pub struct RenderTargetDescriptor {
    pub label: &'static str,
    pub width: u32,
    pub height: u32,
    pub format: wgpu::TextureFormat,
    /// Depth buffer attached while rendering into the target, if any
    pub depth_format: Option<wgpu::TextureFormat>,
    pub filter: wgpu::FilterMode,
    pub mip_level_count: u32,
}

impl RenderTargetDescriptor {
    /// Light space depth written by the caster shader, 24 bit depth buffer, point sampled
    pub fn shadow_map(size: u32) -> Self {
        Self {
            label: "shadow_map",
            width: size,
            height: size,
            format: wgpu::TextureFormat::R32Float,
            depth_format: Some(wgpu::TextureFormat::Depth24Plus),
            filter: wgpu::FilterMode::Nearest,
            mip_level_count: 1,
        }
    }

    /// Single channel exponential moments, bilinear without mipmaps
    pub fn exponential_moments(size: u32) -> Self {
        Self {
            label: "esm_moments",
            width: size,
            height: size,
            format: wgpu::TextureFormat::R32Float,
            depth_format: None,
            filter: wgpu::FilterMode::Linear,
            mip_level_count: 1,
        }
    }

    /// Depth and squared depth moments, bilinear without mipmaps
    pub fn variance_moments(size: u32) -> Self {
        Self {
            label: "vsm_moments",
            width: size,
            height: size,
            format: wgpu::TextureFormat::Rg32Float,
            depth_format: None,
            filter: wgpu::FilterMode::Linear,
            mip_level_count: 1,
        }
    }

    pub fn extent(&self) -> wgpu::Extent3d {
        wgpu::Extent3d {
            width: self.width,
            height: self.height,
            depth_or_array_layers: 1,
        }
    }

    /// Fails unless both sides are in `1..=max`
    pub fn check_size(&self, max: u32) -> Result<(), BackendError> {
        let valid = |side: u32| (1..=max).contains(&side);
        if valid(self.width) && valid(self.height) {
            return Ok(());
        }

        Err(BackendError::TargetSize {
            label: self.label.to_string(),
            width: self.width,
            height: self.height,
            max,
        })
    }
}

/// Render targets owned by the shadow map camera. At most one of each exists at a time.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ShadowTargets {
    pub shadow_map: Option<RenderTargetHandle>,
    pub exponential: Option<RenderTargetHandle>,
    pub variance: Option<RenderTargetHandle>,
}

impl ShadowTargets {
    /// Global texture names paired with the handle bound to them
    pub fn bindings(&self) -> [(&'static str, Option<RenderTargetHandle>); 3] {
        [
            (super::globals::SHADOW_MAP_TEXTURE, self.shadow_map),
            (super::globals::ESM_TEXTURE, self.exponential),
            (super::globals::VSM_TEXTURE, self.variance),
        ]
    }
}
