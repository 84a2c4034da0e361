//! Copying texture contents back to host memory.
//!
//! Used by headless rendering and by tests that inspect the simulated field.
//! Readback blocks on the device and is not meant for the per-frame path.

use cytoscope_core::{UploadLayout, VolumeExtent};

use crate::error::{RenderError, RenderResult};

/// Reads a 2D texture back as tightly packed rows.
pub fn read_texture_2d(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    texture: &wgpu::Texture,
    width: u32,
    height: u32,
    bytes_per_texel: u32,
) -> RenderResult<Vec<u8>> {
    read_texture(
        device,
        queue,
        texture,
        VolumeExtent::new(width, height, 1),
        bytes_per_texel,
    )
}

/// Reads a 2D or 3D texture back as tightly packed row-major texels
/// (`x` fastest, then `y`, then `z`).
pub fn read_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    texture: &wgpu::Texture,
    extent: VolumeExtent,
    bytes_per_texel: u32,
) -> RenderResult<Vec<u8>> {
    let bytes_per_row =
        (extent.width * bytes_per_texel).div_ceil(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT)
            * wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    let buffer_size =
        u64::from(bytes_per_row) * u64::from(extent.height) * u64::from(extent.depth);

    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("readback buffer"),
        size: buffer_size,
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("readback copy encoder"),
    });
    encoder.copy_texture_to_buffer(
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::TexelCopyBufferInfo {
            buffer: &buffer,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(bytes_per_row),
                rows_per_image: Some(extent.height),
            },
        },
        wgpu::Extent3d {
            width: extent.width,
            height: extent.height,
            depth_or_array_layers: extent.depth,
        },
    );
    queue.submit(std::iter::once(encoder.finish()));

    let slice = buffer.slice(..);
    let (tx, rx) = std::sync::mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        // The receiver outlives the poll below; a failed send means nobody waits.
        let _ = tx.send(result);
    });
    device
        .poll(wgpu::PollType::wait_indefinitely())
        .map_err(|err| RenderError::ReadbackFailed(err.to_string()))?;
    rx.recv()
        .map_err(|err| RenderError::ReadbackFailed(err.to_string()))?
        .map_err(|err| RenderError::ReadbackFailed(err.to_string()))?;

    let data = slice.get_mapped_range();
    let tight = UploadLayout::unpad(&data, extent, bytes_per_texel, bytes_per_row);
    drop(data);
    buffer.unmap();

    Ok(tight)
}
