//! Full-screen ray-marching compositor for the static volume and the
//! simulated field.

use std::sync::Arc;

use cytoscope_core::{
    compute_frame_uniform, CameraState, DisplayMetrics, FrameUniform, RaymarchOptions,
};
use glam::Vec3;

use crate::buffer::{create_uniform_buffer, update_uniform_buffer};
use crate::engine::RenderEngine;
use crate::error::{RenderError, RenderResult};
use crate::field_sim::{DynamicVolumeSource, FieldBufferId, VolumeBinding};
use crate::shader::{validated, ShaderBuilder};
use crate::volume_texture::StaticVolume;

/// Corners of the world-space cube both volumes are drawn into.
pub const VOLUME_BOX_MIN: Vec3 = Vec3::splat(-0.5);
pub const VOLUME_BOX_MAX: Vec3 = Vec3::splat(0.5);

/// GPU representation of [`RaymarchOptions`].
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct RaymarchUniforms {
    pub field_color: [f32; 3],
    pub steps: u32,
    pub background: [f32; 3],
    pub static_gain: f32,
    pub field_gain: f32,
    pub field_channel: u32,
    pub _padding: [f32; 2],
}

impl From<&RaymarchOptions> for RaymarchUniforms {
    fn from(options: &RaymarchOptions) -> Self {
        Self {
            field_color: options.field_color.to_array(),
            steps: options.steps.max(1),
            background: options.background.to_array(),
            static_gain: options.static_gain,
            field_gain: options.field_gain,
            field_channel: options.field_channel.min(3),
            _padding: [0.0; 2],
        }
    }
}

/// What happened to a requested frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// The frame was drawn and submitted.
    Rendered,
    /// The target could not be acquired; try again next frame.
    Skipped,
}

/// Ray-marching renderer compositing two volumes into the output image.
pub struct CompositingRenderer {
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    frame_buffer: wgpu::Buffer,
    raymarch_buffer: wgpu::Buffer,
    static_volume: Arc<StaticVolume>,
    bound: Option<(FieldBufferId, wgpu::BindGroup)>,
    rebinds: u64,
    options: RaymarchOptions,
}

impl CompositingRenderer {
    /// Builds the pipeline, sampler and uniform buffers.
    pub fn new(
        device: &wgpu::Device,
        static_volume: Arc<StaticVolume>,
        output_format: wgpu::TextureFormat,
        options: RaymarchOptions,
    ) -> RenderResult<Self> {
        let module = ShaderBuilder::new()
            .with_label("composite")
            .with_source(include_str!("shaders/composite.wgsl"))
            .build(device)?;

        let volume_entry = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D3,
                multisampled: false,
            },
            count: None,
        };
        let uniform_entry = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("composite bind group layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
                // Static volume
                volume_entry(1),
                // Simulated field
                volume_entry(2),
                // Camera
                uniform_entry(3),
                // Raymarch parameters
                uniform_entry(4),
            ],
        });

        let pipeline = validated(device, || {
            let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("composite pipeline layout"),
                bind_group_layouts: &[&bind_group_layout],
                push_constant_ranges: &[],
            });
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("composite pipeline"),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &module,
                    entry_point: Some("vs_main"),
                    buffers: &[],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &module,
                    entry_point: Some("fs_main"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: output_format,
                        blend: None,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    ..Default::default()
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        })
        .map_err(|message| {
            log::error!("composite pipeline failed: {message}");
            RenderError::PipelineCreationFailed(message)
        })?;

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("volume sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let frame_buffer =
            create_uniform_buffer(device, &FrameUniform::default(), Some("frame uniform"));
        let raymarch_buffer = create_uniform_buffer(
            device,
            &RaymarchUniforms::from(&options),
            Some("raymarch uniform"),
        );

        log::info!("compositing renderer ready ({output_format:?}, {} steps)", options.steps);

        Ok(Self {
            pipeline,
            bind_group_layout,
            sampler,
            frame_buffer,
            raymarch_buffer,
            static_volume,
            bound: None,
            rebinds: 0,
            options,
        })
    }

    /// Current ray marching parameters.
    pub fn options(&self) -> &RaymarchOptions {
        &self.options
    }

    /// Replaces the ray marching parameters.
    pub fn set_options(&mut self, queue: &wgpu::Queue, options: RaymarchOptions) {
        self.options = options;
        update_uniform_buffer(queue, &self.raymarch_buffer, &RaymarchUniforms::from(&options));
    }

    /// How many times the bind group has been built.
    pub fn rebinds(&self) -> u64 {
        self.rebinds
    }

    /// Identity of the field buffer bound by the last frame.
    pub fn bound_source(&self) -> Option<FieldBufferId> {
        self.bound.as_ref().map(|(id, _)| *id)
    }

    /// Draws one frame.
    ///
    /// The target is first resized to `display` if needed, then the camera
    /// uniform is uploaded and the output image acquired. A target that
    /// cannot be acquired this frame yields [`FrameOutcome::Skipped`]; a
    /// degenerate camera is an error.
    pub fn render_frame(
        &mut self,
        engine: &mut RenderEngine,
        source: &dyn DynamicVolumeSource,
        camera: &CameraState,
        display: &DisplayMetrics,
    ) -> RenderResult<FrameOutcome> {
        engine.sync_to_display(display);

        let uniform = compute_frame_uniform(camera)?;
        update_uniform_buffer(&engine.queue, &self.frame_buffer, &uniform);

        let Some(frame) = engine.acquire_frame()? else {
            return Ok(FrameOutcome::Skipped);
        };

        let bind_group = self.bind_source(&engine.device, source.current_volume());

        let background = self.options.background;
        let mut encoder = engine
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("composite encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("composite pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: frame.view(),
                    resolve_target: None,
                    depth_slice: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: f64::from(background.x),
                            g: f64::from(background.y),
                            b: f64::from(background.z),
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.draw(0..6, 0..1);
        }
        engine.queue.submit(std::iter::once(encoder.finish()));
        frame.present();

        Ok(FrameOutcome::Rendered)
    }

    /// Rebuilds the bind group only when the dynamic volume changed identity.
    fn bind_source(&mut self, device: &wgpu::Device, binding: VolumeBinding<'_>) -> wgpu::BindGroup {
        if let Some((id, bind_group)) = &self.bound {
            if *id == binding.id {
                return bind_group.clone();
            }
        }
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("composite bind group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(self.static_volume.view()),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(binding.view),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: self.frame_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: self.raymarch_buffer.as_entire_binding(),
                },
            ],
        });
        self.rebinds += 1;
        log::debug!("composite bind group rebuilt for {:?} (#{})", binding.id, self.rebinds);
        self.bound = Some((binding.id, bind_group.clone()));
        bind_group
    }
}
