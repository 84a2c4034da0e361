//! Configuration options for cytoscope.

use std::path::{Path, PathBuf};

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::CoreResult;
use crate::field::FieldSeed;
use crate::volume::VolumeExtent;

/// Global configuration options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Edge length of the simulated cubic field.
    pub field_size: u32,

    /// Initial contents of the field buffers.
    pub field_seed: FieldSeedKind,

    /// RNG seed used when `field_seed` is `noise`.
    pub noise_seed: u64,

    /// Update rule run by each simulation step.
    pub field_rule: FieldRuleKind,

    /// Simulation steps run before each rendered frame.
    pub steps_per_frame: u32,

    /// Ray marching parameters.
    pub raymarch: RaymarchOptions,

    /// Raw volume file to display (a synthetic sphere is used if absent).
    pub volume: Option<VolumeSource>,

    /// Window title.
    pub window_title: String,

    /// Initial window width in logical pixels.
    pub window_width: u32,

    /// Initial window height in logical pixels.
    pub window_height: u32,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            field_size: 128,
            field_seed: FieldSeedKind::Zero,
            noise_seed: 0,
            field_rule: FieldRuleKind::Diffusion,
            steps_per_frame: 1,
            raymarch: RaymarchOptions::default(),
            volume: None,
            window_title: "cytoscope-rs".to_string(),
            window_width: 1280,
            window_height: 720,
        }
    }
}

impl Options {
    /// Parses options from a JSON document. Missing keys take defaults.
    pub fn from_json_str(json: &str) -> CoreResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Loads options from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> CoreResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Resolves the configured seed kind into a [`FieldSeed`].
    #[must_use]
    pub fn seed(&self) -> FieldSeed {
        match self.field_seed {
            FieldSeedKind::Zero => FieldSeed::Zero,
            FieldSeedKind::Noise => FieldSeed::Noise {
                seed: self.noise_seed,
                amplitude: 0.25,
            },
        }
    }
}

/// Seeding policy selectable from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FieldSeedKind {
    /// All-zero field.
    #[default]
    Zero,
    /// Deterministic noise from `noise_seed`.
    Noise,
}

/// Built-in update rules selectable from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FieldRuleKind {
    /// Damped diffusion of every channel.
    #[default]
    Diffusion,
    /// Gray-Scott reaction-diffusion in the red and green channels.
    GrayScott,
}

/// Location and dimensions of a raw volume file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeSource {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub depth: u32,
}

impl VolumeSource {
    /// Declared extent of the file.
    #[must_use]
    pub fn extent(&self) -> VolumeExtent {
        VolumeExtent::new(self.width, self.height, self.depth)
    }
}

/// Tunable ray marching parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RaymarchOptions {
    /// Samples taken along each ray inside the volume cube.
    pub steps: u32,
    /// Multiplier on the static volume's maximum.
    pub static_gain: f32,
    /// Multiplier on the simulated field's maximum.
    pub field_gain: f32,
    /// Field channel projected (0 = red .. 3 = alpha). Green holds the
    /// Gray-Scott `v` species.
    pub field_channel: u32,
    /// Tint applied to the simulated field.
    pub field_color: Vec3,
    /// Clear color outside the volume.
    pub background: Vec3,
}

impl Default for RaymarchOptions {
    fn default() -> Self {
        Self {
            steps: 256,
            static_gain: 1.0,
            field_gain: 1.0,
            field_channel: 1,
            field_color: Vec3::new(1.0, 0.35, 0.1),
            background: Vec3::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let options = Options::from_json_str(r#"{ "field_size": 64, "field_seed": "noise" }"#)
            .unwrap();
        assert_eq!(options.field_size, 64);
        assert_eq!(options.field_seed, FieldSeedKind::Noise);
        assert_eq!(options.steps_per_frame, 1);
        assert_eq!(options.raymarch.steps, 256);
        assert_eq!(options.raymarch.field_channel, 1);
        assert_eq!(options.field_rule, FieldRuleKind::Diffusion);
        assert!(matches!(options.seed(), FieldSeed::Noise { seed: 0, .. }));
    }

    #[test]
    fn test_round_trip_through_file() {
        let mut options = Options::default();
        options.volume = Some(VolumeSource {
            path: PathBuf::from("data/sample.raw"),
            width: 256,
            height: 256,
            depth: 128,
        });
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("options.json");
        std::fs::write(&path, serde_json::to_string_pretty(&options).unwrap()).unwrap();
        let loaded = Options::load(&path).unwrap();
        assert_eq!(loaded, options);
        assert_eq!(
            loaded.volume.unwrap().extent(),
            VolumeExtent::new(256, 256, 128)
        );
    }

    #[test]
    fn test_rule_and_nested_raymarch_keys() {
        let options = Options::from_json_str(
            r#"{ "field_rule": "gray_scott", "raymarch": { "steps": 64, "field_channel": 0 } }"#,
        )
        .unwrap();
        assert_eq!(options.field_rule, FieldRuleKind::GrayScott);
        assert_eq!(options.raymarch.steps, 64);
        assert_eq!(options.raymarch.field_channel, 0);
        assert_eq!(options.raymarch.static_gain, 1.0);
    }

    #[test]
    fn test_bad_json_is_an_error() {
        assert!(Options::from_json_str("{ not json").is_err());
    }
}
