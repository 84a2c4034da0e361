//! Interactive viewer: a static volume with a Gray-Scott "cytosol" overlay.
//!
//! Usage: `cargo run --example cytosol_viewer [options.json]`
//!
//! Without a config file a synthetic sphere is shown and the overlay starts
//! from deterministic noise. Left drag orbits, right drag pans, the wheel
//! zooms and Escape quits.

use cytoscope::{FieldRuleKind, FieldSeedKind, Options};

fn main() -> cytoscope::Result<()> {
    let options = match std::env::args().nth(1) {
        Some(path) => Options::load(path)?,
        None => Options {
            field_size: 96,
            field_seed: FieldSeedKind::Noise,
            noise_seed: 7,
            field_rule: FieldRuleKind::GrayScott,
            steps_per_frame: 4,
            ..Options::default()
        },
    };
    cytoscope::run(options)
}
