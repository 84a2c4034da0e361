//! Loading raw scalar volumes from disk.

use std::path::Path;

use cytoscope_core::{Options, ScalarVolumeData, VolumeExtent};

use crate::Result;

/// Edge length of the synthetic volume shown when no file is configured.
pub const SYNTHETIC_VOLUME_SIZE: u32 = 64;

/// Reads a headerless row-major u8 volume of the given extent.
///
/// The file length must equal `width * height * depth`.
pub fn load_raw_volume(path: impl AsRef<Path>, extent: VolumeExtent) -> Result<ScalarVolumeData> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;
    log::info!(
        "read {} bytes from {} for a {}x{}x{} volume",
        bytes.len(),
        path.display(),
        extent.width,
        extent.height,
        extent.depth
    );
    Ok(ScalarVolumeData::new(bytes, extent)?)
}

/// The configured volume file, or a synthetic sphere if none is set.
pub fn load_volume(options: &Options) -> Result<ScalarVolumeData> {
    match &options.volume {
        Some(source) => load_raw_volume(&source.path, source.extent()),
        None => {
            log::info!("no volume configured; using a synthetic sphere");
            Ok(ScalarVolumeData::synthetic_sphere(VolumeExtent::cube(
                SYNTHETIC_VOLUME_SIZE,
            ))?)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CytoscopeError;
    use cytoscope_core::{CoreError, VolumeSource};

    #[test]
    fn test_load_matching_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cube.raw");
        let bytes: Vec<u8> = (0..24).collect();
        std::fs::write(&path, &bytes).unwrap();

        let volume = load_raw_volume(&path, VolumeExtent::new(2, 3, 4)).unwrap();
        assert_eq!(volume.bytes(), bytes.as_slice());
        assert_eq!(volume.extent(), VolumeExtent::new(2, 3, 4));
    }

    #[test]
    fn test_size_mismatch_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short.raw");
        std::fs::write(&path, [0u8; 20]).unwrap();

        let err = load_raw_volume(&path, VolumeExtent::new(2, 3, 4)).unwrap_err();
        assert!(matches!(
            err,
            CytoscopeError::Core(CoreError::VolumeSizeMismatch {
                expected: 24,
                actual: 20
            })
        ));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_raw_volume("/nonexistent/volume.raw", VolumeExtent::cube(2)).unwrap_err();
        assert!(matches!(err, CytoscopeError::Io(_)));
    }

    #[test]
    fn test_load_volume_uses_options() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("v.raw");
        std::fs::write(&path, [7u8; 8]).unwrap();
        let options = Options {
            volume: Some(VolumeSource {
                path,
                width: 2,
                height: 2,
                depth: 2,
            }),
            ..Options::default()
        };
        assert_eq!(load_volume(&options).unwrap().bytes(), &[7u8; 8]);

        let synthetic = load_volume(&Options::default()).unwrap();
        assert_eq!(synthetic.extent(), VolumeExtent::cube(SYNTHETIC_VOLUME_SIZE));
    }
}
