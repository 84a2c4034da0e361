//! Device-resident static scalar volume.

use cytoscope_core::{ScalarVolumeData, VolumeExtent};

use crate::error::{RenderError, RenderResult};

/// Texture format of the static volume (one byte per voxel, sampled as `[0, 1]`).
pub const STATIC_VOLUME_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::R8Unorm;

/// Read-only 3D scalar texture uploaded once from host bytes.
///
/// Only a sampling view is exposed; there is no mutation API.
pub struct StaticVolume {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
    extent: VolumeExtent,
}

impl StaticVolume {
    /// Allocates the texture and uploads `data` in a single padded write.
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        data: &ScalarVolumeData,
    ) -> RenderResult<Self> {
        let extent = data.extent();
        let limit = device.limits().max_texture_dimension_3d;
        if extent.max_dimension() > limit {
            return Err(RenderError::TextureCreationFailed(format!(
                "volume {}x{}x{} exceeds the device 3D texture limit of {limit}",
                extent.width, extent.height, extent.depth
            )));
        }

        let size = wgpu::Extent3d {
            width: extent.width,
            height: extent.height,
            depth_or_array_layers: extent.depth,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("static volume"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D3,
            format: STATIC_VOLUME_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        let layout = data.upload_layout();
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
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
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some("static volume view"),
            dimension: Some(wgpu::TextureViewDimension::D3),
            ..Default::default()
        });

        log::info!(
            "uploaded static volume {}x{}x{} (row pitch {})",
            extent.width,
            extent.height,
            extent.depth,
            layout.bytes_per_row
        );

        Ok(Self {
            _texture: texture,
            view,
            extent,
        })
    }

    /// View for sampling in shaders.
    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    /// Volume dimensions.
    pub fn extent(&self) -> VolumeExtent {
        self.extent
    }
}

/// Validates `bytes` against `width * height * depth` and uploads them.
///
/// A length mismatch fails with
/// [`CoreError::VolumeSizeMismatch`](cytoscope_core::CoreError::VolumeSizeMismatch)
/// before anything is allocated on the device.
pub fn create_static_volume(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    bytes: Vec<u8>,
    width: u32,
    height: u32,
    depth: u32,
) -> RenderResult<StaticVolume> {
    let data = ScalarVolumeData::new(bytes, VolumeExtent::new(width, height, depth))?;
    StaticVolume::new(device, queue, &data)
}
