//! Ping-pong state, seeding policy and dispatch tiling for the simulated field.

use half::f16;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{CoreError, CoreResult};
use crate::volume::VolumeExtent;

/// Edge length of the cubic compute workgroup (`@workgroup_size(4, 4, 4)`).
pub const WORKGROUP_EDGE: u32 = 4;

/// Bytes per voxel of an `rgba16float` field texel.
pub const FIELD_TEXEL_BYTES: u32 = 8;

/// Allocation-time tag of one of the two field buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldSlot {
    A,
    B,
}

impl FieldSlot {
    /// Index into the fixed two-element buffer array.
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            FieldSlot::A => 0,
            FieldSlot::B => 1,
        }
    }

    /// The other slot.
    #[must_use]
    pub fn other(self) -> Self {
        match self {
            FieldSlot::A => FieldSlot::B,
            FieldSlot::B => FieldSlot::A,
        }
    }

    /// Debug label used for the GPU texture.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            FieldSlot::A => "cytosol field A",
            FieldSlot::B => "cytosol field B",
        }
    }
}

/// Which buffer holds the readable field.
///
/// The next write target is always the other slot, so a step can never read
/// and write the same buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PingPong {
    #[default]
    CurrentIsA,
    CurrentIsB,
}

impl PingPong {
    /// Slot holding the last written (readable) field.
    #[must_use]
    pub fn current(self) -> FieldSlot {
        match self {
            PingPong::CurrentIsA => FieldSlot::A,
            PingPong::CurrentIsB => FieldSlot::B,
        }
    }

    /// Slot the next step writes into.
    #[must_use]
    pub fn next(self) -> FieldSlot {
        self.current().other()
    }

    /// State after one step has written into [`PingPong::next`].
    #[must_use]
    pub fn flipped(self) -> Self {
        match self {
            PingPong::CurrentIsA => PingPong::CurrentIsB,
            PingPong::CurrentIsB => PingPong::CurrentIsA,
        }
    }
}

/// Initial contents of both field buffers.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FieldSeed {
    /// Every channel zero.
    #[default]
    Zero,
    /// Every voxel holds the same RGBA value.
    Uniform([f32; 4]),
    /// Red channel at 1.0 with a deterministic noisy green channel
    /// in `[0, amplitude)`, a usual start for reaction-diffusion.
    Noise { seed: u64, amplitude: f32 },
    /// Red channel holds the voxel's row-major flat index.
    ///
    /// Only fields of at most [`FLAT_INDEX_MAX_VOXELS`] voxels are accepted,
    /// since larger indices are not exact in `f16`.
    FlatIndex,
    /// Caller-provided voxels in row-major order (`size³` entries).
    Explicit(Vec<[f32; 4]>),
}

/// Largest voxel count whose flat indices `f16` stores exactly (2^11).
pub const FLAT_INDEX_MAX_VOXELS: usize = 2048;

impl FieldSeed {
    /// Expands the seed into `size³` RGBA voxels.
    pub fn voxels(&self, size: u32) -> CoreResult<Vec<[f32; 4]>> {
        if size == 0 {
            return Err(CoreError::InvalidFieldSize(size));
        }
        let count = VolumeExtent::cube(size).voxel_count();
        let voxels = match self {
            FieldSeed::Zero => vec![[0.0; 4]; count],
            FieldSeed::Uniform(value) => vec![*value; count],
            FieldSeed::Noise { seed, amplitude } => {
                let mut rng = StdRng::seed_from_u64(*seed);
                (0..count)
                    .map(|_| [1.0, rng.gen::<f32>() * amplitude, 0.0, 0.0])
                    .collect()
            }
            FieldSeed::FlatIndex => {
                if count > FLAT_INDEX_MAX_VOXELS {
                    return Err(CoreError::SeedNotRepresentable {
                        voxels: count,
                        max: FLAT_INDEX_MAX_VOXELS,
                    });
                }
                (0..count).map(|i| [i as f32, 0.0, 0.0, 0.0]).collect()
            }
            FieldSeed::Explicit(voxels) => {
                if voxels.len() != count {
                    return Err(CoreError::SeedSizeMismatch {
                        expected: count,
                        actual: voxels.len(),
                    });
                }
                voxels.clone()
            }
        };
        Ok(voxels)
    }

    /// Expands the seed and encodes it as tightly packed `rgba16float` bytes.
    pub fn encode(&self, size: u32) -> CoreResult<Vec<u8>> {
        Ok(encode_rgba16f(&self.voxels(size)?))
    }
}

/// Encodes RGBA voxels as little-endian half floats.
#[must_use]
pub fn encode_rgba16f(voxels: &[[f32; 4]]) -> Vec<u8> {
    let halves: Vec<u16> = voxels
        .iter()
        .flat_map(|v| v.map(|c| f16::from_f32(c).to_bits()))
        .collect();
    bytemuck::cast_slice(&halves).to_vec()
}

/// Decodes tightly packed `rgba16float` bytes back into RGBA voxels.
#[must_use]
pub fn decode_rgba16f(bytes: &[u8]) -> Vec<[f32; 4]> {
    bytes
        .chunks_exact(FIELD_TEXEL_BYTES as usize)
        .map(|texel| {
            let mut out = [0.0; 4];
            for (c, pair) in out.iter_mut().zip(texel.chunks_exact(2)) {
                *c = f16::from_bits(u16::from_le_bytes([pair[0], pair[1]])).to_f32();
            }
            out
        })
        .collect()
}

/// Workgroup grid covering a cubic domain.
///
/// Invocations past the domain edge are discarded by the kernel's bounds
/// guard, so each voxel maps to exactly one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchGrid {
    /// Domain edge length in voxels.
    pub size: u32,
    /// Workgroup edge length.
    pub edge: u32,
    /// Workgroups per axis.
    pub groups: u32,
}

impl DispatchGrid {
    /// Grid of `ceil(size / edge)` groups per axis.
    #[must_use]
    pub fn cover(size: u32, edge: u32) -> Self {
        Self {
            size,
            edge,
            groups: size.div_ceil(edge),
        }
    }

    /// Arguments for `dispatch_workgroups`.
    #[must_use]
    pub fn workgroups(&self) -> (u32, u32, u32) {
        (self.groups, self.groups, self.groups)
    }

    /// Voxel written by the invocation at `group * edge + local`, if it lies
    /// inside the domain.
    #[must_use]
    pub fn voxel(&self, group: [u32; 3], local: [u32; 3]) -> Option<[u32; 3]> {
        let id = [
            group[0] * self.edge + local[0],
            group[1] * self.edge + local[1],
            group[2] * self.edge + local[2],
        ];
        id.iter().all(|&c| c < self.size).then_some(id)
    }

    /// Counts how many invocations land on each voxel (row-major).
    #[must_use]
    pub fn coverage(&self) -> Vec<u32> {
        let extent = VolumeExtent::cube(self.size);
        let mut hits = vec![0u32; extent.voxel_count()];
        let lanes = 0..self.edge;
        for gz in 0..self.groups {
            for gy in 0..self.groups {
                for gx in 0..self.groups {
                    for lz in lanes.clone() {
                        for ly in lanes.clone() {
                            for lx in lanes.clone() {
                                if let Some([x, y, z]) =
                                    self.voxel([gx, gy, gz], [lx, ly, lz])
                                {
                                    hits[extent.flat_index(x, y, z)] += 1;
                                }
                            }
                        }
                    }
                }
            }
        }
        hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_ping_pong_never_aliases() {
        let mut state = PingPong::default();
        for _ in 0..5 {
            assert_ne!(state.current(), state.next());
            state = state.flipped();
        }
    }

    #[test]
    fn test_ping_pong_parity() {
        let mut state = PingPong::default();
        for k in 0..8 {
            let expected = if k % 2 == 0 { FieldSlot::A } else { FieldSlot::B };
            assert_eq!(state.current(), expected, "after {k} steps");
            state = state.flipped();
        }
    }

    #[test]
    fn test_slot_indices() {
        assert_eq!(FieldSlot::A.index(), 0);
        assert_eq!(FieldSlot::B.index(), 1);
        assert_eq!(FieldSlot::A.other(), FieldSlot::B);
    }

    #[test]
    fn test_seed_sizes() {
        assert_eq!(FieldSeed::Zero.voxels(3).unwrap().len(), 27);
        assert_eq!(FieldSeed::Zero.encode(3).unwrap().len(), 27 * 8);
        assert!(matches!(
            FieldSeed::Zero.voxels(0),
            Err(CoreError::InvalidFieldSize(0))
        ));
    }

    #[test]
    fn test_explicit_seed_must_match() {
        let seed = FieldSeed::Explicit(vec![[0.0; 4]; 7]);
        match seed.voxels(2) {
            Err(CoreError::SeedSizeMismatch { expected, actual }) => {
                assert_eq!((expected, actual), (8, 7));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_noise_seed_is_deterministic() {
        let seed = FieldSeed::Noise {
            seed: 42,
            amplitude: 0.25,
        };
        let a = seed.voxels(4).unwrap();
        let b = seed.voxels(4).unwrap();
        assert_eq!(a, b);
        assert!(a.iter().all(|v| v[0] == 1.0 && (0.0..0.25).contains(&v[1])));
    }

    #[test]
    fn test_flat_index_seed_round_trips_through_f16() {
        let bytes = FieldSeed::FlatIndex.encode(6).unwrap();
        let decoded = decode_rgba16f(&bytes);
        for (i, voxel) in decoded.iter().enumerate() {
            assert_eq!(voxel[0], i as f32);
        }
    }

    #[test]
    fn test_flat_index_seed_limited_to_exact_f16() {
        // 12³ = 1728 voxels: every index survives the encoding.
        let decoded = decode_rgba16f(&FieldSeed::FlatIndex.encode(12).unwrap());
        assert_eq!(decoded.last().map(|v| v[0]), Some(1727.0));

        // 13³ = 2197 voxels would round above 2048.
        assert!(matches!(
            FieldSeed::FlatIndex.voxels(13),
            Err(CoreError::SeedNotRepresentable {
                voxels: 2197,
                max: FLAT_INDEX_MAX_VOXELS
            })
        ));
    }

    #[test]
    fn test_dispatch_grid_counts() {
        assert_eq!(DispatchGrid::cover(256, 4).workgroups(), (64, 64, 64));
        assert_eq!(DispatchGrid::cover(6, 4).workgroups(), (2, 2, 2));
        assert_eq!(DispatchGrid::cover(1, 4).groups, 1);
    }

    proptest! {
        #[test]
        fn prop_dispatch_covers_each_voxel_once(size in 1u32..14, edge in 1u32..6) {
            let grid = DispatchGrid::cover(size, edge);
            prop_assert!(grid.coverage().iter().all(|&hits| hits == 1));
        }
    }
}
