use std::collections::{BTreeMap, HashMap};

use glam::Mat4;

use crate::{error::BackendError, math::LightCamera, shadows::RenderTargetDescriptor};

use super::{BuiltinShader, BuiltinShaderMode, RenderBackend, RenderTargetHandle, ShaderHandle};

/// Command issued to a [RecordingBackend], in the order they were received
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCommand {
    CreateTarget {
        target: RenderTargetHandle,
        descriptor: RenderTargetDescriptor,
    },
    ReleaseTarget(RenderTargetHandle),
    RenderWithShader {
        target: RenderTargetHandle,
        shader: ShaderHandle,
        view_projection: Mat4,
    },
    Blit {
        source: RenderTargetHandle,
        destination: RenderTargetHandle,
        shader: ShaderHandle,
        pass: u32,
    },
    SetShaderMode(BuiltinShader, BuiltinShaderMode),
    SetCustomShader(BuiltinShader, ShaderHandle),
}

/// Backend without a device. Keeps track of live targets and records every command, used for
/// headless runs and to inspect what a frame would have done.
///
/// Target sizes are checked against the same 2D texture limit a default wgpu device has.
#[derive(Debug)]
pub struct RecordingBackend {
    commands: Vec<BackendCommand>,
    targets: BTreeMap<RenderTargetHandle, RenderTargetDescriptor>,
    next_target: u32,
    max_texture_dimension: u32,
    shaders: HashMap<String, ShaderHandle>,
    builtin: HashMap<BuiltinShader, (BuiltinShaderMode, Option<ShaderHandle>)>,
}

impl Default for RecordingBackend {
    fn default() -> Self {
        Self {
            commands: Vec::new(),
            targets: BTreeMap::new(),
            next_target: 0,
            max_texture_dimension: wgpu::Limits::default().max_texture_dimension_2d,
            shaders: HashMap::new(),
            builtin: HashMap::new(),
        }
    }
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Largest width or height [RenderBackend::create_render_target] accepts
    pub fn with_max_texture_dimension(mut self, max: u32) -> Self {
        self.max_texture_dimension = max;
        self
    }

    pub fn max_texture_dimension(&self) -> u32 {
        self.max_texture_dimension
    }

    /// Makes `name` resolvable through [RenderBackend::find_shader]. Registering the same name
    /// twice returns the existing handle.
    pub fn register_shader(&mut self, name: &str) -> ShaderHandle {
        let next = ShaderHandle::new(self.shaders.len() as u32);
        *self.shaders.entry(name.to_string()).or_insert(next)
    }

    pub fn commands(&self) -> &[BackendCommand] {
        &self.commands
    }

    /// Returns the recorded commands, leaving the log empty
    pub fn take_commands(&mut self) -> Vec<BackendCommand> {
        std::mem::take(&mut self.commands)
    }

    pub fn live_targets(&self) -> impl Iterator<Item = (RenderTargetHandle, &RenderTargetDescriptor)> {
        self.targets.iter().map(|(handle, descriptor)| (*handle, descriptor))
    }

    pub fn is_live(&self, target: RenderTargetHandle) -> bool {
        self.targets.contains_key(&target)
    }

    pub fn descriptor(&self, target: RenderTargetHandle) -> Option<&RenderTargetDescriptor> {
        self.targets.get(&target)
    }

    pub fn shader_mode(&self, builtin: BuiltinShader) -> BuiltinShaderMode {
        self.builtin.get(&builtin).map(|(mode, _)| *mode).unwrap_or_default()
    }

    fn ensure_live(&self, target: RenderTargetHandle) -> Result<(), BackendError> {
        if self.targets.contains_key(&target) {
            Ok(())
        } else {
            Err(BackendError::UnknownTarget(target))
        }
    }

    fn ensure_shader(&self, shader: ShaderHandle) -> Result<(), BackendError> {
        if self.shaders.values().any(|s| *s == shader) {
            Ok(())
        } else {
            Err(BackendError::UnknownShader(shader))
        }
    }
}

impl RenderBackend for RecordingBackend {
    fn create_render_target(&mut self, descriptor: &RenderTargetDescriptor) -> Result<RenderTargetHandle, BackendError> {
        descriptor.check_size(self.max_texture_dimension)?;

        let target = RenderTargetHandle::new(self.next_target);
        self.next_target += 1;

        self.targets.insert(target, descriptor.clone());
        self.commands.push(BackendCommand::CreateTarget {
            target,
            descriptor: descriptor.clone(),
        });

        Ok(target)
    }

    fn release_render_target(&mut self, target: RenderTargetHandle) {
        if self.targets.remove(&target).is_none() {
            log::warn!("release of unknown render target {:?} ignored", target);
            return;
        }

        self.commands.push(BackendCommand::ReleaseTarget(target));
    }

    fn find_shader(&self, name: &str) -> Option<ShaderHandle> {
        self.shaders.get(name).copied()
    }

    fn render_with_shader(
        &mut self,
        camera: &LightCamera,
        target: RenderTargetHandle,
        shader: ShaderHandle,
    ) -> Result<(), BackendError> {
        self.ensure_live(target)?;
        self.ensure_shader(shader)?;

        self.commands.push(BackendCommand::RenderWithShader {
            target,
            shader,
            view_projection: camera.view_projection_matrix(),
        });

        Ok(())
    }

    fn blit(
        &mut self,
        source: RenderTargetHandle,
        destination: RenderTargetHandle,
        shader: ShaderHandle,
        pass: u32,
    ) -> Result<(), BackendError> {
        self.ensure_live(source)?;
        self.ensure_live(destination)?;
        self.ensure_shader(shader)?;

        self.commands.push(BackendCommand::Blit {
            source,
            destination,
            shader,
            pass,
        });

        Ok(())
    }

    fn custom_shader(&self, builtin: BuiltinShader) -> Option<ShaderHandle> {
        self.builtin.get(&builtin).and_then(|(_, shader)| *shader)
    }

    fn set_shader_mode(&mut self, builtin: BuiltinShader, mode: BuiltinShaderMode) {
        self.builtin.entry(builtin).or_default().0 = mode;
        self.commands.push(BackendCommand::SetShaderMode(builtin, mode));
    }

    fn set_custom_shader(&mut self, builtin: BuiltinShader, shader: ShaderHandle) {
        self.builtin.entry(builtin).or_default().1 = Some(shader);
        self.commands.push(BackendCommand::SetCustomShader(builtin, shader));
    }
}
