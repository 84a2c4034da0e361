//! Renders an orbit around the evolving field to numbered PNG files without
//! opening a window.
//!
//! Usage: `cargo run --example render_frames [output_dir]`

use cytoscope::{
    Camera, FieldRule, FieldSeed, GrayScottParams, HeadlessSession, RaymarchOptions,
    ScalarVolumeData, SceneConfig, VolumeExtent, VOLUME_BOX_MAX, VOLUME_BOX_MIN,
};

const FRAMES: u32 = 24;
const STEPS_PER_FRAME: u32 = 8;

fn main() -> cytoscope::Result<()> {
    env_logger::init();

    let out_dir = std::env::args().nth(1).unwrap_or_else(|| "frames".to_string());
    std::fs::create_dir_all(&out_dir)?;

    let volume = ScalarVolumeData::synthetic_sphere(VolumeExtent::cube(64))?;
    let config = SceneConfig {
        field_size: 64,
        seed: FieldSeed::Noise {
            seed: 1,
            amplitude: 0.25,
        },
        rule: FieldRule::gray_scott(GrayScottParams::default()),
        raymarch: RaymarchOptions {
            static_gain: 0.6,
            ..RaymarchOptions::default()
        },
    };
    let mut session = HeadlessSession::new(512, 512, &volume, &config)?;

    let mut camera = Camera::new(1.0);
    camera.frame_box(VOLUME_BOX_MIN, VOLUME_BOX_MAX);
    camera.orbit(0.0, 0.4);
    for frame in 0..FRAMES {
        session.advance(STEPS_PER_FRAME);
        let path = format!("{out_dir}/frame_{frame:03}.png");
        session.render_to_file(&path, &camera.state())?;
        println!("wrote {path}");
        camera.orbit(std::f32::consts::TAU / FRAMES as f32, 0.0);
    }
    Ok(())
}
