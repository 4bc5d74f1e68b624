use std::collections::HashMap;

use wgpu::{Device, ShaderSource};

use crate::backend::ShaderHandle;

pub struct Shader {
    /// Label used in the shader module will be `label_shader`.
    /// e.g. label: "ESM/ShadowmapCaster" -> ESM/ShadowmapCaster_shader
    pub label: String,
    pub module: wgpu::ShaderModule,
}

impl Shader {
    pub fn new(device: &Device, label: &str, source: ShaderSource) -> Self {
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&format!("{}_shader", label)),
            source,
        });

        Self {
            label: label.to_string(),
            module,
        }
    }

    pub fn wgsl(device: &Device, label: &str, source: &str) -> Self {
        let source = ShaderSource::Wgsl(source.into());
        Self::new(device, label, source)
    }
}

/// Cache of shader modules addressed by name, use ShaderLoader::insert to add a compiled shader
/// and ShaderLoader::find to resolve a name
#[derive(Default)]
pub struct ShaderLoader {
    names: HashMap<String, ShaderHandle>,
    shaders: Vec<Shader>,
}

impl ShaderLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an already compiled shader, returns None if its label already exists
    pub fn insert(&mut self, shader: Shader) -> Option<ShaderHandle> {
        if self.names.contains_key(&shader.label) {
            return None;
        }

        let handle = ShaderHandle::new(self.shaders.len() as u32);
        self.names.insert(shader.label.clone(), handle);
        self.shaders.push(shader);

        Some(handle)
    }

    pub fn find(&self, label: &str) -> Option<ShaderHandle> {
        self.names.get(label).copied()
    }

    pub fn get(&self, handle: ShaderHandle) -> Option<&Shader> {
        self.shaders.get(handle.id() as usize)
    }
}
