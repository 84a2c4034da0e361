//! Host-side scalar volume data and upload layout.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Row pitch alignment required for texture copies (matches
/// `wgpu::COPY_BYTES_PER_ROW_ALIGNMENT`).
pub const ROW_PITCH_ALIGNMENT: u32 = 256;

/// Dimensions of a 3D grid in voxels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VolumeExtent {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
}

impl VolumeExtent {
    /// Creates an extent from its three dimensions.
    #[must_use]
    pub const fn new(width: u32, height: u32, depth: u32) -> Self {
        Self {
            width,
            height,
            depth,
        }
    }

    /// Creates a cubic extent of `size³` voxels.
    #[must_use]
    pub const fn cube(size: u32) -> Self {
        Self::new(size, size, size)
    }

    /// Total number of voxels.
    #[must_use]
    pub fn voxel_count(&self) -> usize {
        self.width as usize * self.height as usize * self.depth as usize
    }

    /// Returns true if any dimension is zero.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.depth == 0
    }

    /// Row-major flat index of voxel `(x, y, z)`.
    #[must_use]
    pub fn flat_index(&self, x: u32, y: u32, z: u32) -> usize {
        (z as usize * self.height as usize + y as usize) * self.width as usize + x as usize
    }

    /// Largest dimension, used to check against device limits.
    #[must_use]
    pub fn max_dimension(&self) -> u32 {
        self.width.max(self.height).max(self.depth)
    }
}

/// Immutable single-channel u8 volume, validated against its extent.
///
/// The on-disk format is a headerless row-major dump: `x` varies fastest,
/// then `y`, then `z`. Dimensions are supplied out of band.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScalarVolumeData {
    bytes: Vec<u8>,
    extent: VolumeExtent,
}

impl ScalarVolumeData {
    /// Wraps `bytes` after checking `bytes.len() == width * height * depth`.
    pub fn new(bytes: Vec<u8>, extent: VolumeExtent) -> CoreResult<Self> {
        if extent.is_empty() {
            return Err(CoreError::EmptyVolume);
        }
        let expected = extent.voxel_count();
        if bytes.len() != expected {
            return Err(CoreError::VolumeSizeMismatch {
                expected,
                actual: bytes.len(),
            });
        }
        Ok(Self { bytes, extent })
    }

    /// Creates a volume where every voxel holds `value`.
    pub fn uniform(extent: VolumeExtent, value: u8) -> CoreResult<Self> {
        Self::new(vec![value; extent.voxel_count()], extent)
    }

    /// Creates a soft sphere centered in the grid, bright at the center and
    /// fading to zero at the inscribed radius.
    pub fn synthetic_sphere(extent: VolumeExtent) -> CoreResult<Self> {
        let mut bytes = Vec::with_capacity(extent.voxel_count());
        let center = [
            extent.width as f32 * 0.5,
            extent.height as f32 * 0.5,
            extent.depth as f32 * 0.5,
        ];
        let radius = center[0].min(center[1]).min(center[2]).max(1.0);
        for z in 0..extent.depth {
            for y in 0..extent.height {
                for x in 0..extent.width {
                    let d = [
                        x as f32 + 0.5 - center[0],
                        y as f32 + 0.5 - center[1],
                        z as f32 + 0.5 - center[2],
                    ];
                    let r = (d[0] * d[0] + d[1] * d[1] + d[2] * d[2]).sqrt() / radius;
                    bytes.push(((1.0 - r).clamp(0.0, 1.0) * 255.0) as u8);
                }
            }
        }
        Self::new(bytes, extent)
    }

    /// Raw voxel bytes in row-major order.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Volume dimensions.
    #[must_use]
    pub fn extent(&self) -> VolumeExtent {
        self.extent
    }

    /// Padded upload layout for a single-byte texel format.
    #[must_use]
    pub fn upload_layout(&self) -> UploadLayout {
        UploadLayout::padded(&self.bytes, self.extent, 1, ROW_PITCH_ALIGNMENT)
    }
}

/// Texel rows repacked to an aligned row pitch, ready for a single bulk
/// texture upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadLayout {
    /// Padded texel data.
    pub bytes: Vec<u8>,
    /// Row pitch in bytes (multiple of the requested alignment).
    pub bytes_per_row: u32,
    /// Rows per depth slice.
    pub rows_per_image: u32,
}

impl UploadLayout {
    /// Repacks tightly packed rows of `extent.width * bytes_per_texel` bytes
    /// into rows padded up to a multiple of `alignment`.
    ///
    /// When the tight row is already aligned the data is copied unchanged.
    #[must_use]
    pub fn padded(
        tight: &[u8],
        extent: VolumeExtent,
        bytes_per_texel: u32,
        alignment: u32,
    ) -> Self {
        let row_bytes = extent.width * bytes_per_texel;
        let bytes_per_row = row_bytes.div_ceil(alignment) * alignment;
        let rows = extent.height as usize * extent.depth as usize;
        debug_assert_eq!(tight.len(), rows * row_bytes as usize);

        let bytes = if bytes_per_row == row_bytes {
            tight.to_vec()
        } else {
            let mut padded = vec![0u8; rows * bytes_per_row as usize];
            for (src, dst) in tight
                .chunks_exact(row_bytes as usize)
                .zip(padded.chunks_exact_mut(bytes_per_row as usize))
            {
                dst[..row_bytes as usize].copy_from_slice(src);
            }
            padded
        };

        Self {
            bytes,
            bytes_per_row,
            rows_per_image: extent.height,
        }
    }

    /// Strips row padding, the inverse of [`UploadLayout::padded`].
    #[must_use]
    pub fn unpad(
        padded: &[u8],
        extent: VolumeExtent,
        bytes_per_texel: u32,
        bytes_per_row: u32,
    ) -> Vec<u8> {
        let row_bytes = (extent.width * bytes_per_texel) as usize;
        let rows = extent.height as usize * extent.depth as usize;
        let mut tight = Vec::with_capacity(rows * row_bytes);
        for row in padded.chunks(bytes_per_row as usize).take(rows) {
            tight.extend_from_slice(&row[..row_bytes]);
        }
        tight
    }
}
