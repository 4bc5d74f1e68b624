pub use super::{
    backend::{
        BackendCommand, BuiltinShader, BuiltinShaderMode, RecordingBackend, RenderBackend,
        RenderTargetHandle, ShaderHandle, WgpuBackend,
    },
    error::{BackendError, ConfigError},
    glam::{self, Mat4, Quat, Vec2, Vec3, Vec4},
    math::*,
    shadows::{
        RenderTargetDescriptor, ShaderGlobals, ShaderNames, ShadowSettings, ShadowUniforms,
        ShadowType, ShadowmapCamera,
    },
    wgpu::{self},
};
