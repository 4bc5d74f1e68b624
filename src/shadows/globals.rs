use std::collections::HashMap;

use glam::Mat4;

use crate::backend::RenderTargetHandle;

pub const LIGHT_VIEW_PROJECTION: &str = "light_VP";
pub const SHADOW_TYPE: &str = "shadowType";
pub const ESM_NORMAL_BIAS: &str = "esmNormalBias";
pub const SHADOW_MAP_TEXTURE: &str = "smTex";
pub const ESM_TEXTURE: &str = "esmTex";
pub const VSM_TEXTURE: &str = "vsmTex";

/// Value stored under a global shader parameter name
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GlobalValue {
    Matrix(Mat4),
    Int(i32),
    Float(f32),
    Texture(RenderTargetHandle),
}

/// Named shader parameters shared by every pass of a frame.
///
/// Setting a name replaces whatever value was stored under it before, regardless of its kind.
#[derive(Debug, Default, Clone)]
pub struct ShaderGlobals {
    values: HashMap<String, GlobalValue>,
}

impl ShaderGlobals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_matrix(&mut self, name: &str, value: Mat4) {
        self.set(name, GlobalValue::Matrix(value));
    }

    pub fn set_int(&mut self, name: &str, value: i32) {
        self.set(name, GlobalValue::Int(value));
    }

    pub fn set_float(&mut self, name: &str, value: f32) {
        self.set(name, GlobalValue::Float(value));
    }

    pub fn set_texture(&mut self, name: &str, value: RenderTargetHandle) {
        self.set(name, GlobalValue::Texture(value));
    }

    /// Unbinds a texture, returns the handle that was bound
    pub fn remove_texture(&mut self, name: &str) -> Option<RenderTargetHandle> {
        let handle = self.texture(name)?;
        self.values.remove(name);
        Some(handle)
    }

    pub fn get(&self, name: &str) -> Option<&GlobalValue> {
        self.values.get(name)
    }

    pub fn matrix(&self, name: &str) -> Option<Mat4> {
        match self.values.get(name)? {
            GlobalValue::Matrix(m) => Some(*m),
            _ => None,
        }
    }

    pub fn int(&self, name: &str) -> Option<i32> {
        match self.values.get(name)? {
            GlobalValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn float(&self, name: &str) -> Option<f32> {
        match self.values.get(name)? {
            GlobalValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn texture(&self, name: &str) -> Option<RenderTargetHandle> {
        match self.values.get(name)? {
            GlobalValue::Texture(t) => Some(*t),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn set(&mut self, name: &str, value: GlobalValue) {
        self.values.insert(name.to_string(), value);
    }
}

/// Uniform block consumed by the deferred lighting shader.
///
/// WGSL layout:
/// ```wgsl
/// struct ShadowUniforms {
///     light_vp: mat4x4<f32>,
///     shadow_type: i32,
///     esm_normal_bias: f32,
/// }
/// ```
#[repr(C, align(16))]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ShadowUniforms {
    pub light_vp: [[f32; 4]; 4],
    pub shadow_type: i32,
    pub esm_normal_bias: f32,
    _padding: [f32; 2],
}

impl ShadowUniforms {
    pub fn new(light_vp: Mat4, shadow_type: i32, esm_normal_bias: f32) -> Self {
        Self {
            light_vp: light_vp.to_cols_array_2d(),
            shadow_type,
            esm_normal_bias,
            _padding: [0.0; 2],
        }
    }

    /// Packs the published shadow parameters, missing values fall back to zero / identity
    pub fn from_globals(globals: &ShaderGlobals) -> Self {
        Self::new(
            globals.matrix(LIGHT_VIEW_PROJECTION).unwrap_or(Mat4::IDENTITY),
            globals.int(SHADOW_TYPE).unwrap_or(0),
            globals.float(ESM_NORMAL_BIAS).unwrap_or(0.0),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniforms_are_wgsl_sized() {
        assert_eq!(std::mem::size_of::<ShadowUniforms>(), 80);
        assert_eq!(std::mem::align_of::<ShadowUniforms>(), 16);
    }

    #[test]
    fn setting_a_name_replaces_any_kind() {
        let mut globals = ShaderGlobals::new();
        globals.set_int("x", 3);
        globals.set_float("x", 1.5);

        assert_eq!(globals.int("x"), None);
        assert_eq!(globals.float("x"), Some(1.5));
        assert_eq!(globals.len(), 1);
    }

    #[test]
    fn remove_texture_only_removes_textures() {
        let mut globals = ShaderGlobals::new();
        globals.set_texture(SHADOW_MAP_TEXTURE, RenderTargetHandle::new(7));
        globals.set_float(ESM_NORMAL_BIAS, 0.01);

        assert_eq!(globals.remove_texture(ESM_NORMAL_BIAS), None);
        assert_eq!(globals.remove_texture(SHADOW_MAP_TEXTURE), Some(RenderTargetHandle::new(7)));
        assert_eq!(globals.texture(SHADOW_MAP_TEXTURE), None);
        assert_eq!(globals.float(ESM_NORMAL_BIAS), Some(0.01));
    }

    #[test]
    fn uniforms_pack_published_values() {
        let mut globals = ShaderGlobals::new();
        let vp = Mat4::from_scale(glam::Vec3::splat(2.0));
        globals.set_matrix(LIGHT_VIEW_PROJECTION, vp);
        globals.set_int(SHADOW_TYPE, 3);
        globals.set_float(ESM_NORMAL_BIAS, 0.02);

        let uniforms = ShadowUniforms::from_globals(&globals);
        assert_eq!(uniforms.light_vp, vp.to_cols_array_2d());
        assert_eq!(uniforms.shadow_type, 3);
        assert_eq!(uniforms.esm_normal_bias, 0.02);

        let empty = ShadowUniforms::from_globals(&ShaderGlobals::new());
        assert_eq!(empty.light_vp, Mat4::IDENTITY.to_cols_array_2d());
    }
}
