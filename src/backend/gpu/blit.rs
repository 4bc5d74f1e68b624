use std::collections::HashMap;

use crate::{backend::ShaderHandle, error::BackendError};

use super::{scoped, target::GpuRenderTarget};

/// Full screen post-process pass.
///
/// The shader must expose a `vs_fullscreen` vertex entry point drawing one triangle from the
/// vertex index and one `fs_pass{N}` fragment entry point per pass. Group 0 binds the source
/// texture at 0 and a non-filtering sampler at 1.
pub struct BlitPass {
    layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    pipelines: HashMap<(ShaderHandle, u32, wgpu::TextureFormat), wgpu::RenderPipeline>,
}

impl BlitPass {
    pub fn new(device: &wgpu::Device) -> Self {
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("blit_bind_group_layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: false },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::NonFiltering),
                    count: None,
                },
            ],
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("blit_sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        Self {
            layout,
            sampler,
            pipelines: HashMap::new(),
        }
    }

    pub fn entry_point(pass: u32) -> String {
        format!("fs_pass{}", pass)
    }

    fn prepare_pipeline(
        &mut self,
        device: &wgpu::Device,
        shader: ShaderHandle,
        module: &wgpu::ShaderModule,
        pass: u32,
        format: wgpu::TextureFormat,
    ) -> Result<(ShaderHandle, u32, wgpu::TextureFormat), BackendError> {
        let key = (shader, pass, format);
        if self.pipelines.contains_key(&key) {
            return Ok(key);
        }

        let label = format!("blit_pipeline_{}_{}", shader.id(), pass);
        let fragment_entry = Self::entry_point(pass);
        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(&format!("{}_layout", label)),
            bind_group_layouts: &[&self.layout],
            push_constant_ranges: &[],
        });

        let pipeline = scoped(device, &label, || {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(&label),
                layout: Some(&layout),
                vertex: wgpu::VertexState {
                    module,
                    entry_point: Some("vs_fullscreen"),
                    compilation_options: Default::default(),
                    buffers: &[],
                },
                primitive: wgpu::PrimitiveState::default(),
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                fragment: Some(wgpu::FragmentState {
                    module,
                    entry_point: Some(&fragment_entry),
                    compilation_options: Default::default(),
                    targets: &[Some(format.into())],
                }),
                multiview: None,
                cache: None,
            })
        })?;

        self.pipelines.insert(key, pipeline);
        Ok(key)
    }

    pub fn run(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        shader: ShaderHandle,
        module: &wgpu::ShaderModule,
        pass: u32,
        source: &GpuRenderTarget,
        destination: &GpuRenderTarget,
    ) -> Result<(), BackendError> {
        let key = self.prepare_pipeline(device, shader, module, pass, destination.descriptor.format)?;
        let pipeline = &self.pipelines[&key];

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("blit_bind_group"),
            layout: &self.layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&source.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("blit_encoder"),
        });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("blit_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &destination.view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            render_pass.set_pipeline(pipeline);
            render_pass.set_bind_group(0, &bind_group, &[]);
            render_pass.draw(0..3, 0..1);
        }

        queue.submit(Some(encoder.finish()));

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_point_per_pass() {
        assert_eq!(BlitPass::entry_point(0), "fs_pass0");
        assert_eq!(BlitPass::entry_point(1), "fs_pass1");
    }
}
