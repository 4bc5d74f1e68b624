mod bind_group;
mod blit;
mod caster;
mod shader;
mod target;

use std::collections::HashMap;

use glam::Mat4;
use wgpu::util::DeviceExt;

pub use bind_group::{BindGroup, BindGroupBuilder};
pub use blit::BlitPass;
pub use caster::{CasterMesh, CasterPass, CasterVertex};
pub use shader::{Shader, ShaderLoader};
pub use target::GpuRenderTarget;

use crate::{
    error::BackendError,
    math::LightCamera,
    shadows::{
        globals::{ESM_TEXTURE, SHADOW_MAP_TEXTURE, VSM_TEXTURE},
        RenderTargetDescriptor, ShaderGlobals, ShadowUniforms,
    },
};

use super::{BuiltinShader, BuiltinShaderMode, RenderBackend, RenderTargetHandle, ShaderHandle};

/// Runs `f` inside a validation error scope, turning a captured error into
/// [BackendError::Validation] instead of the device's uncaptured error handler
pub(crate) fn scoped<T>(device: &wgpu::Device, label: &str, f: impl FnOnce() -> T) -> Result<T, BackendError> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let value = f();

    match pollster::block_on(device.pop_error_scope()) {
        Some(err) => Err(BackendError::Validation {
            label: label.to_string(),
            message: err.to_string(),
        }),
        None => Ok(value),
    }
}

/// [RenderBackend] executing commands on a wgpu device
pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    shaders: ShaderLoader,
    targets: HashMap<RenderTargetHandle, GpuRenderTarget>,
    next_target: u32,
    casters: Vec<CasterMesh>,
    caster_pass: CasterPass,
    blit_pass: BlitPass,
    uniforms: wgpu::Buffer,
    builtin: HashMap<BuiltinShader, (BuiltinShaderMode, Option<ShaderHandle>)>,
}

impl WgpuBackend {
    pub fn new(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        let caster_pass = CasterPass::new(&device);
        let blit_pass = BlitPass::new(&device);

        let uniforms = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("shadow_uniform_buffer"),
            contents: bytemuck::bytes_of(&ShadowUniforms::new(Mat4::IDENTITY, 0, 0.0)),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        Self {
            device,
            queue,
            shaders: ShaderLoader::new(),
            targets: HashMap::new(),
            next_target: 0,
            casters: Vec::new(),
            caster_pass,
            blit_pass,
            uniforms,
            builtin: HashMap::new(),
        }
    }

    /// Creates a backend on its own device without a surface. Requests
    /// [wgpu::Features::FLOAT32_FILTERABLE] when the adapter has it so moment maps can be
    /// sampled bilinearly, and the adapter's own limits so large shadow maps fit.
    pub fn headless() -> Result<Self, BackendError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .map_err(|err| BackendError::Adapter(err.to_string()))?;

        let info = adapter.get_info();
        log::info!(
            "using adapter {} ({:?}), max texture size {}",
            info.name,
            info.backend,
            adapter.limits().max_texture_dimension_2d
        );

        let required_features = adapter.features() & wgpu::Features::FLOAT32_FILTERABLE;
        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("penumbra_device"),
            required_features,
            required_limits: adapter.limits(),
            ..Default::default()
        }))
        .map_err(|err| BackendError::Device(err.to_string()))?;

        Ok(Self::new(device, queue))
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Compiles a WGSL shader and makes it resolvable by `name`.
    /// Registering a name twice keeps the first shader and returns its handle.
    pub fn register_shader(&mut self, name: &str, wgsl: &str) -> Result<ShaderHandle, BackendError> {
        if let Some(existing) = self.shaders.find(name) {
            log::warn!("shader '{}' already registered", name);
            return Ok(existing);
        }

        let shader = scoped(&self.device, name, || Shader::wgsl(&self.device, name, wgsl))?;
        self.shaders
            .insert(shader)
            .ok_or_else(|| BackendError::Validation {
                label: name.to_string(),
                message: "shader name already registered".to_string(),
            })
    }

    /// Adds a mesh drawn by every caster pass, returns its index
    pub fn add_caster(&mut self, label: &str, positions: &[[f32; 3]], indices: &[u32], model: Mat4) -> usize {
        let mesh = self.caster_pass.create_mesh(&self.device, label, positions, indices, model);
        self.casters.push(mesh);
        self.casters.len() - 1
    }

    pub fn casters(&self) -> &[CasterMesh] {
        &self.casters
    }

    pub fn set_caster_model(&self, index: usize, model: Mat4) {
        if let Some(mesh) = self.casters.get(index) {
            mesh.set_model(&self.queue, model);
        }
    }

    pub fn clear_casters(&mut self) {
        self.casters.clear();
    }

    pub fn target(&self, handle: RenderTargetHandle) -> Option<&GpuRenderTarget> {
        self.targets.get(&handle)
    }

    pub fn uniform_buffer(&self) -> &wgpu::Buffer {
        &self.uniforms
    }

    /// Writes the published matrix, shadow type and bias to the shadow uniform buffer
    pub fn upload_globals(&self, globals: &ShaderGlobals) {
        let uniforms = ShadowUniforms::from_globals(globals);
        self.queue.write_buffer(&self.uniforms, 0, bytemuck::bytes_of(&uniforms));
    }

    /// Bind group for a deferred lighting pass: the shadow uniforms followed by each of
    /// smTex, esmTex and vsmTex with its sampler. None until all three textures are bound.
    pub fn shadow_bind_group(&self, globals: &ShaderGlobals) -> Option<BindGroup> {
        let mut builder = BindGroup::build("shadow", &self.device)
            .add_uniform_buffer(&self.uniforms, wgpu::ShaderStages::VERTEX_FRAGMENT);

        for name in [SHADOW_MAP_TEXTURE, ESM_TEXTURE, VSM_TEXTURE] {
            let target = self.targets.get(&globals.texture(name)?)?;
            builder = builder
                .add_texture_view(&target.view, target.filtering, wgpu::ShaderStages::FRAGMENT)
                .add_sampler(&target.sampler, target.filtering, wgpu::ShaderStages::FRAGMENT);
        }

        Some(builder.finish())
    }

    fn shader_module(&self, shader: ShaderHandle) -> Result<&wgpu::ShaderModule, BackendError> {
        self.shaders
            .get(shader)
            .map(|s| &s.module)
            .ok_or(BackendError::UnknownShader(shader))
    }
}

impl RenderBackend for WgpuBackend {
    fn create_render_target(&mut self, descriptor: &RenderTargetDescriptor) -> Result<RenderTargetHandle, BackendError> {
        let target = GpuRenderTarget::new(&self.device, descriptor)?;

        let handle = RenderTargetHandle::new(self.next_target);
        self.next_target += 1;
        self.targets.insert(handle, target);

        Ok(handle)
    }

    fn release_render_target(&mut self, target: RenderTargetHandle) {
        match self.targets.remove(&target) {
            Some(gpu_target) => gpu_target.destroy(),
            None => log::warn!("release of unknown render target {:?} ignored", target),
        }
    }

    fn find_shader(&self, name: &str) -> Option<ShaderHandle> {
        self.shaders.find(name)
    }

    fn render_with_shader(
        &mut self,
        camera: &LightCamera,
        target: RenderTargetHandle,
        shader: ShaderHandle,
    ) -> Result<(), BackendError> {
        let gpu_target = self.targets.get(&target).ok_or(BackendError::UnknownTarget(target))?;
        let module = self
            .shaders
            .get(shader)
            .map(|s| &s.module)
            .ok_or(BackendError::UnknownShader(shader))?;

        self.caster_pass.render(
            &self.device,
            &self.queue,
            shader,
            module,
            camera.view_projection_matrix(),
            gpu_target,
            &self.casters,
        )
    }

    fn blit(
        &mut self,
        source: RenderTargetHandle,
        destination: RenderTargetHandle,
        shader: ShaderHandle,
        pass: u32,
    ) -> Result<(), BackendError> {
        let source_target = self.targets.get(&source).ok_or(BackendError::UnknownTarget(source))?;
        let destination_target = self
            .targets
            .get(&destination)
            .ok_or(BackendError::UnknownTarget(destination))?;
        let module = self
            .shaders
            .get(shader)
            .map(|s| &s.module)
            .ok_or(BackendError::UnknownShader(shader))?;

        self.blit_pass.run(
            &self.device,
            &self.queue,
            shader,
            module,
            pass,
            source_target,
            destination_target,
        )
    }

    fn custom_shader(&self, builtin: BuiltinShader) -> Option<ShaderHandle> {
        self.builtin.get(&builtin).and_then(|(_, shader)| *shader)
    }

    fn set_shader_mode(&mut self, builtin: BuiltinShader, mode: BuiltinShaderMode) {
        self.builtin.entry(builtin).or_default().0 = mode;
    }

    fn set_custom_shader(&mut self, builtin: BuiltinShader, shader: ShaderHandle) {
        if self.shader_module(shader).is_err() {
            log::warn!("custom shader {:?} for {:?} is not registered", shader, builtin);
        }
        self.builtin.entry(builtin).or_default().1 = Some(shader);
    }
}
