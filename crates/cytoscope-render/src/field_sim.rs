//! Double-buffered volumetric field simulation on the GPU.
//!
//! Two `rgba16float` 3D textures hold the field. Each [`FieldSimulation::step`]
//! runs the update kernel reading the current buffer and writing the other
//! one, then flips which buffer is current. The renderer only ever sees the
//! current buffer through [`DynamicVolumeSource`].

use std::sync::atomic::{AtomicU64, Ordering};

use cytoscope_core::field::{decode_rgba16f, FIELD_TEXEL_BYTES};
use cytoscope_core::{
    CoreError, DispatchGrid, FieldSeed, FieldSlot, PingPong, UploadLayout, VolumeExtent,
    WORKGROUP_EDGE,
};

use crate::error::{RenderError, RenderResult};
use crate::readback;
use crate::shader::{validated, ShaderBuilder};

/// Texture format of both field buffers.
pub const FIELD_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

const FIELD_PRELUDE: &str = include_str!("shaders/field_prelude.wgsl");

static NEXT_FIELD_BUFFER_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a field buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldBufferId(u64);

impl FieldBufferId {
    fn next() -> Self {
        Self(NEXT_FIELD_BUFFER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// One of the two field textures.
pub struct FieldBuffer {
    slot: FieldSlot,
    id: FieldBufferId,
    texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl FieldBuffer {
    fn new(device: &wgpu::Device, size: u32, slot: FieldSlot) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(slot.label()),
            size: wgpu::Extent3d {
                width: size,
                height: size,
                depth_or_array_layers: size,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D3,
            format: FIELD_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::STORAGE_BINDING
                | wgpu::TextureUsages::COPY_DST
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some(slot.label()),
            dimension: Some(wgpu::TextureViewDimension::D3),
            ..Default::default()
        });
        Self {
            slot,
            id: FieldBufferId::next(),
            texture,
            view,
        }
    }

    fn upload(&self, queue: &wgpu::Queue, size: u32, layout: &UploadLayout) {
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &layout.bytes,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(layout.bytes_per_row),
                rows_per_image: Some(layout.rows_per_image),
            },
            wgpu::Extent3d {
                width: size,
                height: size,
                depth_or_array_layers: size,
            },
        );
    }

    /// Allocation-time tag.
    pub fn slot(&self) -> FieldSlot {
        self.slot
    }

    /// Identity used for rebind-on-change.
    pub fn id(&self) -> FieldBufferId {
        self.id
    }

    /// View bound for sampling.
    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }
}

/// Parameters of the Gray-Scott reaction in the red (`u`) and green (`v`)
/// channels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrayScottParams {
    pub diffuse_u: f32,
    pub diffuse_v: f32,
    pub feed: f32,
    pub kill: f32,
    pub dt: f32,
}

impl Default for GrayScottParams {
    fn default() -> Self {
        Self {
            diffuse_u: 0.16,
            diffuse_v: 0.08,
            feed: 0.0367,
            kill: 0.0649,
            dt: 1.0,
        }
    }
}

/// Update kernel body.
///
/// The source is a WGSL function
/// `fn field_rule(cell: vec3<i32>, size: i32) -> vec4<f32>` returning the new
/// value of `cell`. It may call `field_load(cell)` and `field_laplacian(cell)`,
/// both of which read the current buffer with edge clamping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRule {
    label: String,
    source: String,
}

impl FieldRule {
    /// Diffusion of all four channels with a per-step decay factor.
    pub fn diffusion(rate: f32, decay: f32) -> Self {
        Self {
            label: "diffusion".into(),
            source: format!(
                "fn field_rule(cell: vec3<i32>, size: i32) -> vec4<f32> {{
    let c = field_load(cell);
    return (c + {rate:?} * field_laplacian(cell)) * (1.0 - {decay:?});
}}"
            ),
        }
    }

    /// Gray-Scott reaction-diffusion.
    pub fn gray_scott(params: GrayScottParams) -> Self {
        let GrayScottParams {
            diffuse_u,
            diffuse_v,
            feed,
            kill,
            dt,
        } = params;
        Self {
            label: "gray-scott".into(),
            source: format!(
                "fn field_rule(cell: vec3<i32>, size: i32) -> vec4<f32> {{
    let c = field_load(cell);
    let lap = field_laplacian(cell);
    let uvv = c.x * c.y * c.y;
    let du = {diffuse_u:?} * lap.x - uvv + {feed:?} * (1.0 - c.x);
    let dv = {diffuse_v:?} * lap.y + uvv - ({feed:?} + {kill:?}) * c.y;
    let u = clamp(c.x + {dt:?} * du, 0.0, 1.0);
    let v = clamp(c.y + {dt:?} * dv, 0.0, 1.0);
    return vec4<f32>(u, v, c.z, c.w);
}}"
            ),
        }
    }

    /// Arbitrary rule source defining `field_rule`.
    pub fn custom(label: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            source: source.into(),
        }
    }

    /// Rule name used in labels and logs.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// WGSL source of the rule.
    pub fn source(&self) -> &str {
        &self.source
    }
}

impl Default for FieldRule {
    fn default() -> Self {
        Self::diffusion(0.1, 0.001)
    }
}

/// Binding of the dynamic volume for one frame.
pub struct VolumeBinding<'a> {
    pub id: FieldBufferId,
    pub view: &'a wgpu::TextureView,
}

/// Anything that can supply the renderer's second volume.
pub trait DynamicVolumeSource {
    /// The volume to sample this frame. Its `id` changes whenever the
    /// underlying texture does.
    fn current_volume(&self) -> VolumeBinding<'_>;
}

/// The double-buffered field simulation.
pub struct FieldSimulation {
    buffers: [FieldBuffer; 2],
    state: PingPong,
    pipeline: wgpu::ComputePipeline,
    // Indexed by the slot being read.
    bind_groups: [wgpu::BindGroup; 2],
    grid: DispatchGrid,
    rule: FieldRule,
    steps: u64,
}

impl FieldSimulation {
    /// Allocates both buffers of `size³` voxels, seeds them and builds the
    /// update kernel. Shader or pipeline errors are returned here; there is
    /// no per-step error path.
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        size: u32,
        seed: &FieldSeed,
        rule: FieldRule,
    ) -> RenderResult<Self> {
        if size == 0 {
            return Err(CoreError::InvalidFieldSize(size).into());
        }
        let limit = device.limits().max_texture_dimension_3d;
        if size > limit {
            return Err(RenderError::TextureCreationFailed(format!(
                "field size {size} exceeds the device 3D texture limit of {limit}"
            )));
        }

        let layout = UploadLayout::padded(
            &seed.encode(size)?,
            VolumeExtent::cube(size),
            FIELD_TEXEL_BYTES,
            wgpu::COPY_BYTES_PER_ROW_ALIGNMENT,
        );
        let buffers = [
            FieldBuffer::new(device, size, FieldSlot::A),
            FieldBuffer::new(device, size, FieldSlot::B),
        ];
        for buffer in &buffers {
            buffer.upload(queue, size, &layout);
        }

        let module = ShaderBuilder::new()
            .with_label(format!("field step ({})", rule.label()))
            .with_source(FIELD_PRELUDE)
            .with_source(rule.source())
            .build(device)?;

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("field step bind group layout"),
            entries: &[
                // Current field (read)
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: false },
                        view_dimension: wgpu::TextureViewDimension::D3,
                        multisampled: false,
                    },
                    count: None,
                },
                // Next field (write)
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::StorageTexture {
                        access: wgpu::StorageTextureAccess::WriteOnly,
                        format: FIELD_FORMAT,
                        view_dimension: wgpu::TextureViewDimension::D3,
                    },
                    count: None,
                },
            ],
        });

        let pipeline = validated(device, || {
            let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("field step pipeline layout"),
                bind_group_layouts: &[&bind_group_layout],
                push_constant_ranges: &[],
            });
            device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some("field step pipeline"),
                layout: Some(&pipeline_layout),
                module: &module,
                entry_point: Some("main"),
                compilation_options: Default::default(),
                cache: None,
            })
        })
        .map_err(|message| {
            log::error!("field step pipeline ({}) failed: {message}", rule.label());
            RenderError::PipelineCreationFailed(message)
        })?;

        let bind_group = |read: &FieldBuffer, write: &FieldBuffer| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(read.slot.label()),
                layout: &bind_group_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(&read.view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(&write.view),
                    },
                ],
            })
        };
        let bind_groups = [
            bind_group(&buffers[0], &buffers[1]),
            bind_group(&buffers[1], &buffers[0]),
        ];

        let grid = DispatchGrid::cover(size, WORKGROUP_EDGE);
        log::info!(
            "field simulation {size}^3 ({}), {} workgroups per axis",
            rule.label(),
            grid.groups
        );

        Ok(Self {
            buffers,
            state: PingPong::default(),
            pipeline,
            bind_groups,
            grid,
            rule,
            steps: 0,
        })
    }

    /// Advances the field by one step and returns the new step count.
    ///
    /// The work is submitted and not waited on. Anything submitted to the
    /// same `queue` afterwards, such as the render pass sampling
    /// [`FieldSimulation::current_output`], observes the completed step
    /// because wgpu executes submissions on one queue in order. Using a
    /// different queue for rendering would need an explicit fence here.
    pub fn step(&mut self, device: &wgpu::Device, queue: &wgpu::Queue) -> u64 {
        let read = self.state.current();

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("field step encoder"),
        });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("field step pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &self.bind_groups[read.index()], &[]);
            let (x, y, z) = self.grid.workgroups();
            pass.dispatch_workgroups(x, y, z);
        }
        queue.submit(std::iter::once(encoder.finish()));

        self.state = self.state.flipped();
        self.steps += 1;
        self.steps
    }

    /// The buffer last written by [`FieldSimulation::step`], or buffer A
    /// before the first step.
    pub fn current_output(&self) -> &FieldBuffer {
        &self.buffers[self.state.current().index()]
    }

    /// Number of steps taken.
    pub fn step_count(&self) -> u64 {
        self.steps
    }

    /// Edge length of the cubic field.
    pub fn size(&self) -> u32 {
        self.grid.size
    }

    /// Which buffer is current.
    pub fn state(&self) -> PingPong {
        self.state
    }

    /// The update rule in use.
    pub fn rule(&self) -> &FieldRule {
        &self.rule
    }

    /// Reads the current field back to the host in row-major order.
    ///
    /// Blocks until every submitted step has finished.
    pub fn read_current(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
    ) -> RenderResult<Vec<[f32; 4]>> {
        let bytes = readback::read_texture(
            device,
            queue,
            &self.current_output().texture,
            VolumeExtent::cube(self.size()),
            FIELD_TEXEL_BYTES,
        )?;
        Ok(decode_rgba16f(&bytes))
    }
}

impl DynamicVolumeSource for FieldSimulation {
    fn current_volume(&self) -> VolumeBinding<'_> {
        let buffer = self.current_output();
        VolumeBinding {
            id: buffer.id,
            view: &buffer.view,
        }
    }
}
