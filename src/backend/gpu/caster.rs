use std::collections::HashMap;

use glam::Mat4;
use wgpu::util::DeviceExt;

use crate::{backend::ShaderHandle, error::BackendError};

use super::{scoped, target::GpuRenderTarget};

type PipelineKey = (ShaderHandle, wgpu::TextureFormat, Option<wgpu::TextureFormat>);

#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CasterVertex {
    pub position: [f32; 3],
}

impl CasterVertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x3];

    pub fn vertex_descriptor() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Self>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// Mesh drawn into the shadow map with the caster override shader
pub struct CasterMesh {
    pub label: String,
    vertex: wgpu::Buffer,
    index: wgpu::Buffer,
    num_indices: u32,
    model: wgpu::Buffer,
    model_bind_group: wgpu::BindGroup,
}

impl CasterMesh {
    pub fn set_model(&self, queue: &wgpu::Queue, model: Mat4) {
        queue.write_buffer(&self.model, 0, bytemuck::cast_slice(&[model.to_cols_array_2d()]));
    }
}

/// Renders caster meshes from the light with an override shader.
///
/// The shader must expose `vs_main` and `fs_main`. Group 0 binding 0 holds the light
/// view-projection matrix, group 1 binding 0 the model matrix, vertex location 0 the position.
pub struct CasterPass {
    camera_layout: wgpu::BindGroupLayout,
    model_layout: wgpu::BindGroupLayout,
    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,
}

impl CasterPass {
    pub fn new(device: &wgpu::Device) -> Self {
        let camera_layout = Self::matrix_layout(device, "caster_camera");
        let model_layout = Self::matrix_layout(device, "caster_model");

        let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("caster_camera_uniform_buffer"),
            contents: bytemuck::cast_slice(&[Mat4::IDENTITY.to_cols_array_2d()]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("caster_camera_bind_group"),
            layout: &camera_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
        });

        Self {
            camera_layout,
            model_layout,
            camera_buffer,
            camera_bind_group,
            pipelines: HashMap::new(),
        }
    }

    fn matrix_layout(device: &wgpu::Device, label: &str) -> wgpu::BindGroupLayout {
        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(&format!("{}_bind_group_layout", label)),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        })
    }

    pub fn create_mesh(
        &self,
        device: &wgpu::Device,
        label: &str,
        positions: &[[f32; 3]],
        indices: &[u32],
        model: Mat4,
    ) -> CasterMesh {
        let vertices: Vec<CasterVertex> = positions.iter().map(|p| CasterVertex { position: *p }).collect();

        let vertex = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{}_vertex_buffer", label)),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{}_index_buffer", label)),
            contents: bytemuck::cast_slice(indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        let model_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{}_model_uniform_buffer", label)),
            contents: bytemuck::cast_slice(&[model.to_cols_array_2d()]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let model_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("{}_model_bind_group", label)),
            layout: &self.model_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: model_buffer.as_entire_binding(),
            }],
        });

        CasterMesh {
            label: label.to_string(),
            vertex,
            index,
            num_indices: indices.len() as u32,
            model: model_buffer,
            model_bind_group,
        }
    }

    /// Builds the pipeline for this shader and target formats if it is not cached yet
    fn prepare_pipeline(
        &mut self,
        device: &wgpu::Device,
        shader: ShaderHandle,
        module: &wgpu::ShaderModule,
        format: wgpu::TextureFormat,
        depth_format: Option<wgpu::TextureFormat>,
    ) -> Result<PipelineKey, BackendError> {
        let key = (shader, format, depth_format);
        if !self.pipelines.contains_key(&key) {
            let label = format!("caster_pipeline_{}", shader.id());
            let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(&format!("{}_layout", label)),
                bind_group_layouts: &[&self.camera_layout, &self.model_layout],
                push_constant_ranges: &[],
            });

            let pipeline = scoped(device, &label, || {
                device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                    label: Some(&label),
                    layout: Some(&layout),
                    vertex: wgpu::VertexState {
                        module,
                        entry_point: Some("vs_main"),
                        compilation_options: Default::default(),
                        buffers: &[CasterVertex::vertex_descriptor()],
                    },
                    // both faces cast
                    primitive: wgpu::PrimitiveState::default(),
                    depth_stencil: depth_format.map(|format| wgpu::DepthStencilState {
                        format,
                        depth_write_enabled: true,
                        depth_compare: wgpu::CompareFunction::Less,
                        stencil: wgpu::StencilState::default(),
                        bias: wgpu::DepthBiasState::default(),
                    }),
                    multisample: wgpu::MultisampleState::default(),
                    fragment: Some(wgpu::FragmentState {
                        module,
                        entry_point: Some("fs_main"),
                        compilation_options: Default::default(),
                        targets: &[Some(format.into())],
                    }),
                    multiview: None,
                    cache: None,
                })
            })?;

            self.pipelines.insert(key, pipeline);
        }

        Ok(key)
    }

    pub fn render(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        shader: ShaderHandle,
        module: &wgpu::ShaderModule,
        view_projection: Mat4,
        target: &GpuRenderTarget,
        meshes: &[CasterMesh],
    ) -> Result<(), BackendError> {
        queue.write_buffer(&self.camera_buffer, 0, bytemuck::cast_slice(&[view_projection.to_cols_array_2d()]));

        let key = self.prepare_pipeline(
            device,
            shader,
            module,
            target.descriptor.format,
            target.descriptor.depth_format,
        )?;
        let pipeline = &self.pipelines[&key];

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("shadow_caster_encoder"),
        });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("shadow_caster_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &target.view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        // farthest depth where nothing was drawn
                        load: wgpu::LoadOp::Clear(wgpu::Color::WHITE),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: target.depth_view().map(|view| wgpu::RenderPassDepthStencilAttachment {
                    view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            render_pass.set_pipeline(pipeline);
            render_pass.set_bind_group(0, &self.camera_bind_group, &[]);

            for mesh in meshes.iter().filter(|m| m.num_indices > 0) {
                render_pass.set_bind_group(1, &mesh.model_bind_group, &[]);
                render_pass.set_vertex_buffer(0, mesh.vertex.slice(..));
                render_pass.set_index_buffer(mesh.index.slice(..), wgpu::IndexFormat::Uint32);
                render_pass.draw_indexed(0..mesh.num_indices, 0, 0..1);
            }
        }

        queue.submit(Some(encoder.finish()));

        Ok(())
    }
}
