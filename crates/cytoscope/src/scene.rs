//! The static volume, simulated field and compositor wired to one engine.

use std::sync::Arc;

use cytoscope_core::{
    CameraState, DisplayMetrics, FieldRuleKind, FieldSeed, Options, RaymarchOptions,
    ScalarVolumeData,
};
use cytoscope_render::{
    CompositingRenderer, FieldRule, FieldSimulation, FrameOutcome, GrayScottParams, RenderEngine,
    StaticVolume,
};

use crate::Result;

/// What to simulate and how to draw it.
#[derive(Debug, Clone)]
pub struct SceneConfig {
    /// Edge length of the cubic field.
    pub field_size: u32,
    /// Initial contents of both field buffers.
    pub seed: FieldSeed,
    /// Update kernel body.
    pub rule: FieldRule,
    /// Ray marching parameters.
    pub raymarch: RaymarchOptions,
}

impl From<&Options> for SceneConfig {
    fn from(options: &Options) -> Self {
        let rule = match options.field_rule {
            FieldRuleKind::Diffusion => FieldRule::default(),
            FieldRuleKind::GrayScott => FieldRule::gray_scott(GrayScottParams::default()),
        };
        Self {
            field_size: options.field_size,
            seed: options.seed(),
            rule,
            raymarch: options.raymarch,
        }
    }
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self::from(&Options::default())
    }
}

/// Everything drawn each frame.
pub struct Scene {
    volume: Arc<StaticVolume>,
    simulation: FieldSimulation,
    renderer: CompositingRenderer,
}

impl Scene {
    /// Uploads the volume and builds the simulation and renderer.
    ///
    /// Any invalid input, shader error or pipeline error is returned here.
    pub fn new(
        engine: &RenderEngine,
        volume: &ScalarVolumeData,
        config: &SceneConfig,
    ) -> Result<Self> {
        let volume = Arc::new(StaticVolume::new(&engine.device, &engine.queue, volume)?);
        let simulation = FieldSimulation::new(
            &engine.device,
            &engine.queue,
            config.field_size,
            &config.seed,
            config.rule.clone(),
        )?;
        let renderer = CompositingRenderer::new(
            &engine.device,
            Arc::clone(&volume),
            engine.output_format(),
            config.raymarch,
        )?;
        Ok(Self {
            volume,
            simulation,
            renderer,
        })
    }

    /// Runs `steps` simulation steps and returns the total step count.
    pub fn advance(&mut self, engine: &RenderEngine, steps: u32) -> u64 {
        for _ in 0..steps {
            self.simulation.step(&engine.device, &engine.queue);
        }
        self.simulation.step_count()
    }

    /// Draws one frame of the current field.
    pub fn render(
        &mut self,
        engine: &mut RenderEngine,
        camera: &CameraState,
        display: &DisplayMetrics,
    ) -> Result<FrameOutcome> {
        Ok(self
            .renderer
            .render_frame(engine, &self.simulation, camera, display)?)
    }

    /// The uploaded static volume.
    pub fn volume(&self) -> &StaticVolume {
        &self.volume
    }

    /// The field simulation.
    pub fn simulation(&self) -> &FieldSimulation {
        &self.simulation
    }

    /// The compositor.
    pub fn renderer(&self) -> &CompositingRenderer {
        &self.renderer
    }

    /// Replaces the ray marching parameters from the next frame on.
    pub fn set_raymarch_options(&mut self, engine: &RenderEngine, options: RaymarchOptions) {
        self.renderer.set_options(&engine.queue, options);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cytoscope_core::FieldSeedKind;
    use proptest::prelude::*;

    #[test]
    fn test_config_from_options() {
        let options = Options {
            field_size: 32,
            field_seed: FieldSeedKind::Noise,
            noise_seed: 9,
            field_rule: FieldRuleKind::GrayScott,
            ..Options::default()
        };
        let config = SceneConfig::from(&options);
        assert_eq!(config.field_size, 32);
        assert_eq!(config.rule.label(), "gray-scott");
        assert!(matches!(config.seed, FieldSeed::Noise { seed: 9, .. }));
    }

    #[test]
    fn test_default_config() {
        let config = SceneConfig::default();
        assert_eq!(config.field_size, 128);
        assert_eq!(config.seed, FieldSeed::Zero);
        assert_eq!(config.rule, FieldRule::default());
    }

    proptest! {
        #[test]
        fn prop_config_keeps_option_values(
            field_size in 1u32..512,
            noise_seed in any::<u64>(),
            gray_scott in any::<bool>(),
        ) {
            let options = Options {
                field_size,
                field_seed: FieldSeedKind::Noise,
                noise_seed,
                field_rule: if gray_scott { FieldRuleKind::GrayScott } else { FieldRuleKind::Diffusion },
                ..Options::default()
            };
            let config = SceneConfig::from(&options);
            prop_assert_eq!(config.field_size, field_size);
            prop_assert!(matches!(config.seed, FieldSeed::Noise { seed, .. } if seed == noise_seed), "expected FieldSeed::Noise with the given seed");
            prop_assert_eq!(config.rule.label() == "gray-scott", gray_scott);
        }
    }
}
