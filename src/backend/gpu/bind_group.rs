pub struct BindGroup {
    pub layout: wgpu::BindGroupLayout,
    pub inner: wgpu::BindGroup,
}

impl<'a> From<&'a BindGroup> for Option<&'a wgpu::BindGroup> {
    fn from(value: &'a BindGroup) -> Self {
        Some(&value.inner)
    }
}

impl BindGroup {
    pub fn build<'a>(label: &'a str, device: &'a wgpu::Device) -> BindGroupBuilder<'a> {
        BindGroupBuilder::new(label, device)
    }
}

/// Collects layout entries and resources side by side, bindings are numbered in insertion order
pub struct BindGroupBuilder<'a> {
    label: &'a str,
    device: &'a wgpu::Device,
    layout_entries: Vec<wgpu::BindGroupLayoutEntry>,
    entries: Vec<wgpu::BindGroupEntry<'a>>,
}

impl<'a> BindGroupBuilder<'a> {
    pub fn new(label: &'a str, device: &'a wgpu::Device) -> Self {
        Self {
            label,
            device,
            layout_entries: Vec::new(),
            entries: Vec::new(),
        }
    }

    pub fn add_uniform_buffer(mut self, buffer: &'a wgpu::Buffer, visibility: wgpu::ShaderStages) -> Self {
        let ty = wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        };
        self.add_entry(visibility, ty, buffer.as_entire_binding());
        self
    }

    /// 2D float texture. 32 bit float formats are only filterable with
    /// [wgpu::Features::FLOAT32_FILTERABLE].
    pub fn add_texture_view(mut self, view: &'a wgpu::TextureView, filterable: bool, visibility: wgpu::ShaderStages) -> Self {
        let ty = wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        };
        self.add_entry(visibility, ty, wgpu::BindingResource::TextureView(view));
        self
    }

    pub fn add_sampler(mut self, sampler: &'a wgpu::Sampler, filtering: bool, visibility: wgpu::ShaderStages) -> Self {
        let ty = if filtering {
            wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering)
        } else {
            wgpu::BindingType::Sampler(wgpu::SamplerBindingType::NonFiltering)
        };
        self.add_entry(visibility, ty, wgpu::BindingResource::Sampler(sampler));
        self
    }

    fn add_entry(&mut self, visibility: wgpu::ShaderStages, ty: wgpu::BindingType, resource: wgpu::BindingResource<'a>) {
        let layout_entry = wgpu::BindGroupLayoutEntry {
            binding: self.layout_entries.len() as u32,
            visibility,
            ty,
            count: None,
        };

        let entry = wgpu::BindGroupEntry {
            binding: layout_entry.binding,
            resource,
        };

        self.layout_entries.push(layout_entry);
        self.entries.push(entry);
    }

    pub fn finish(self) -> BindGroup {
        let layout = self.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &self.layout_entries,
            label: Some(&format!("{}_bind_group_layout", self.label)),
        });

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &layout,
            entries: &self.entries,
            label: Some(&format!("{}_bind_group", self.label)),
        });

        BindGroup {
            layout,
            inner: bind_group,
        }
    }
}
