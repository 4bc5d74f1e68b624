//! Rendering backends the shadow map camera drives.
//!
//! [RenderBackend] is the seam between the component and whatever owns GPU resources.
//! [RecordingBackend] records commands without a device, [WgpuBackend] executes them with wgpu.

mod recording;
pub mod gpu;

pub use recording::{BackendCommand, RecordingBackend};
pub use gpu::WgpuBackend;

use crate::{error::BackendError, math::LightCamera, shadows::RenderTargetDescriptor};

/// Handle to a render target allocated by a backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RenderTargetHandle(u32);

impl RenderTargetHandle {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u32 {
        self.0
    }
}

/// Handle to a shader registered on a backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShaderHandle(u32);

impl ShaderHandle {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u32 {
        self.0
    }
}

/// Renderer stages whose shader can be replaced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinShader {
    DeferredShading,
}

/// Which implementation a [BuiltinShader] stage uses
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinShaderMode {
    #[default]
    UseBuiltin,
    UseCustom,
}

pub trait RenderBackend {
    /// Allocates a render target. Fails when the device cannot hold a texture of that size.
    fn create_render_target(&mut self, descriptor: &RenderTargetDescriptor) -> Result<RenderTargetHandle, BackendError>;

    /// Frees a render target. Unknown handles are ignored.
    fn release_render_target(&mut self, target: RenderTargetHandle);

    fn find_shader(&self, name: &str) -> Option<ShaderHandle>;

    /// Renders the scene's shadow casters from `camera` into `target` with `shader` replacing
    /// every material
    fn render_with_shader(
        &mut self,
        camera: &LightCamera,
        target: RenderTargetHandle,
        shader: ShaderHandle,
    ) -> Result<(), BackendError>;

    /// Full screen pass reading `source` and writing `destination` with the given shader pass
    fn blit(
        &mut self,
        source: RenderTargetHandle,
        destination: RenderTargetHandle,
        shader: ShaderHandle,
        pass: u32,
    ) -> Result<(), BackendError>;

    fn custom_shader(&self, builtin: BuiltinShader) -> Option<ShaderHandle>;

    fn set_shader_mode(&mut self, builtin: BuiltinShader, mode: BuiltinShaderMode);

    fn set_custom_shader(&mut self, builtin: BuiltinShader, shader: ShaderHandle);
}
