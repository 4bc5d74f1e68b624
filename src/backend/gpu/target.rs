use crate::{error::BackendError, shadows::RenderTargetDescriptor};

use super::scoped;

/// Render target texture with the view and sampler shaders read it through
pub struct GpuRenderTarget {
    pub descriptor: RenderTargetDescriptor,
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub depth: Option<(wgpu::Texture, wgpu::TextureView)>,
    pub sampler: wgpu::Sampler,
    /// Whether `sampler` filters, false when the format cannot be filtered on this device
    pub filtering: bool,
}

impl GpuRenderTarget {
    /// Allocates the textures described by `descriptor`. Sizes beyond the device's 2D texture
    /// limit and any other validation failure are returned instead of reaching the device's
    /// uncaptured error handler.
    pub fn new(device: &wgpu::Device, descriptor: &RenderTargetDescriptor) -> Result<Self, BackendError> {
        descriptor.check_size(device.limits().max_texture_dimension_2d)?;

        scoped(device, descriptor.label, || Self::create(device, descriptor))
    }

    fn create(device: &wgpu::Device, descriptor: &RenderTargetDescriptor) -> Self {
        let size = descriptor.extent();

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(&format!("{}_texture", descriptor.label)),
            size,
            mip_level_count: descriptor.mip_level_count,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: descriptor.format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some(&format!("{}_view", descriptor.label)),
            ..Default::default()
        });

        let depth = descriptor.depth_format.map(|format| {
            let depth_texture = device.create_texture(&wgpu::TextureDescriptor {
                label: Some(&format!("{}_depth_texture", descriptor.label)),
                size,
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                view_formats: &[],
            });
            let depth_view = depth_texture.create_view(&wgpu::TextureViewDescriptor::default());
            (depth_texture, depth_view)
        });

        let filtering = descriptor.filter == wgpu::FilterMode::Linear && Self::can_filter(device, descriptor.format);
        if descriptor.filter == wgpu::FilterMode::Linear && !filtering {
            log::warn!(
                "{:?} is not filterable on this device, '{}' falls back to nearest sampling",
                descriptor.format,
                descriptor.label
            );
        }
        let filter = if filtering { wgpu::FilterMode::Linear } else { wgpu::FilterMode::Nearest };

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(&format!("{}_sampler", descriptor.label)),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: filter,
            min_filter: filter,
            ..Default::default()
        });

        Self {
            descriptor: descriptor.clone(),
            texture,
            view,
            depth,
            sampler,
            filtering,
        }
    }

    pub fn depth_view(&self) -> Option<&wgpu::TextureView> {
        self.depth.as_ref().map(|(_, view)| view)
    }

    fn can_filter(device: &wgpu::Device, format: wgpu::TextureFormat) -> bool {
        match format {
            wgpu::TextureFormat::R32Float | wgpu::TextureFormat::Rg32Float | wgpu::TextureFormat::Rgba32Float => {
                device.features().contains(wgpu::Features::FLOAT32_FILTERABLE)
            }
            _ => true,
        }
    }

    /// Frees GPU memory now instead of when the last reference drops
    pub fn destroy(&self) {
        self.texture.destroy();
        if let Some((depth, _)) = &self.depth {
            depth.destroy();
        }
    }
}
