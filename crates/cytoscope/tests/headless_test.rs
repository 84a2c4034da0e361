//! Headless GPU integration tests.
//!
//! These need a GPU adapter (real or software fallback). When none is
//! available each test prints a note and returns early.

use cytoscope::*;
use cytoscope_render::create_static_volume;

fn try_session(
    width: u32,
    height: u32,
    volume: &ScalarVolumeData,
    config: &SceneConfig,
) -> Option<HeadlessSession> {
    match HeadlessSession::new(width, height, volume, config) {
        Ok(session) => Some(session),
        Err(CytoscopeError::Render(
            err @ (RenderError::AdapterCreationFailed
            | RenderError::DeviceCreationFailed(_)
            | RenderError::UnsupportedBackend(_)),
        )) => {
            eprintln!("Skipping headless test: no usable GPU adapter ({err})");
            None
        }
        Err(err) => panic!("session creation failed: {err}"),
    }
}

fn small_config(field_size: u32) -> SceneConfig {
    SceneConfig {
        field_size,
        seed: FieldSeed::Zero,
        rule: FieldRule::default(),
        raymarch: RaymarchOptions::default(),
    }
}

fn uniform_volume(value: u8) -> ScalarVolumeData {
    ScalarVolumeData::uniform(VolumeExtent::cube(4), value).unwrap()
}

fn axis_camera() -> CameraState {
    CameraState::look_at(
        Vec3::new(0.0, 0.0, 3.0),
        Vec3::ZERO,
        Vec3::Y,
        std::f32::consts::FRAC_PI_4,
        1.0,
        0.1,
        10.0,
    )
}

#[test]
fn static_volume_only_renders_uniform_silhouette() {
    let Some(mut session) = try_session(64, 64, &uniform_volume(128), &small_config(4)) else {
        return;
    };

    let pixels = session.render(&axis_camera()).unwrap();
    assert_eq!(pixels.len(), 64 * 64 * 4);

    let center = &pixels[(32 * 64 + 32) * 4..(32 * 64 + 32) * 4 + 4];
    assert!(center[0].abs_diff(128) <= 1, "center pixel {center:?}");

    let mut inside = 0;
    let mut outside = 0;
    for px in pixels.chunks_exact(4) {
        assert_eq!(px[3], 255, "output must be opaque");
        if px[..3] == [0, 0, 0] {
            outside += 1;
            continue;
        }
        inside += 1;
        for c in &px[..3] {
            assert!(c.abs_diff(center[0]) <= 1, "non-uniform pixel {px:?}");
        }
    }
    assert!(inside > 0, "volume should be visible");
    assert!(outside > 0, "volume should not fill the frame");
}

#[test]
fn current_output_alternates_with_step_parity() {
    let Some(mut session) = try_session(16, 16, &uniform_volume(0), &small_config(4)) else {
        return;
    };

    let initial = session.scene().simulation().current_output().id();
    assert_eq!(
        session.scene().simulation().current_output().slot(),
        FieldSlot::A
    );

    for k in 1..=5u64 {
        assert_eq!(session.step(), k);
        let simulation = session.scene().simulation();
        let expected = if k % 2 == 0 { FieldSlot::A } else { FieldSlot::B };
        assert_eq!(simulation.current_output().slot(), expected, "after {k} steps");
        assert_eq!(simulation.current_output().id() == initial, k % 2 == 0);
    }
}

#[test]
fn step_writes_every_voxel() {
    // Not a multiple of the workgroup edge, so the last group is partial.
    // Each voxel's green is one more than its source value, so any voxel the
    // dispatch skipped keeps its seeded 0. Exactly-once dispatch is covered
    // by the core `DispatchGrid` property test.
    let size = 6;
    let config = SceneConfig {
        field_size: size,
        seed: FieldSeed::FlatIndex,
        rule: FieldRule::custom(
            "coverage",
            "fn field_rule(cell: vec3<i32>, size: i32) -> vec4<f32> {
    let c = field_load(cell);
    let right = field_load(cell + vec3<i32>(1, 0, 0));
    return vec4<f32>(c.x, c.y + 1.0, right.x, 0.0);
}",
        ),
        raymarch: RaymarchOptions::default(),
    };
    let Some(mut session) = try_session(16, 16, &uniform_volume(0), &config) else {
        return;
    };

    let extent = VolumeExtent::cube(size);
    let seeded = session.read_field().unwrap();
    assert_eq!(seeded.len(), extent.voxel_count());
    for (i, voxel) in seeded.iter().enumerate() {
        assert_eq!(voxel[0], i as f32, "seed upload at {i}");
    }

    session.step();
    let field = session.read_field().unwrap();
    for z in 0..size {
        for y in 0..size {
            for x in 0..size {
                let i = extent.flat_index(x, y, z);
                let right = extent.flat_index((x + 1).min(size - 1), y, z);
                let voxel = field[i];
                assert_eq!(voxel[0], i as f32, "index at ({x}, {y}, {z})");
                assert_eq!(voxel[1], 1.0, "voxel ({x}, {y}, {z}) not written");
                assert_eq!(voxel[2], right as f32, "neighbour at ({x}, {y}, {z})");
            }
        }
    }
}

#[test]
fn resize_is_idempotent() {
    let Some(mut session) = try_session(32, 32, &uniform_volume(64), &small_config(4)) else {
        return;
    };

    assert!(session.resize(100, 80));
    let first = session.viewport();
    assert!(!session.resize(100, 80));
    assert_eq!(session.viewport(), first);
    assert_eq!((first.width, first.height), (100, 80));

    let pixels = session.render(&axis_camera()).unwrap();
    assert_eq!(pixels.len(), 100 * 80 * 4);
}

#[test]
fn bind_group_rebuilt_only_when_field_changes() {
    let Some(mut session) = try_session(16, 16, &uniform_volume(64), &small_config(4)) else {
        return;
    };
    let camera = axis_camera();

    session.render(&camera).unwrap();
    session.render(&camera).unwrap();
    assert_eq!(session.scene().renderer().rebinds(), 1);

    session.step();
    session.render(&camera).unwrap();
    assert_eq!(session.scene().renderer().rebinds(), 2);
    assert_eq!(
        session.scene().renderer().bound_source(),
        Some(session.scene().simulation().current_output().id())
    );

    session.render(&camera).unwrap();
    assert_eq!(session.scene().renderer().rebinds(), 2);
}

#[test]
fn field_contribution_shows_in_render() {
    let config = SceneConfig {
        field_size: 4,
        seed: FieldSeed::Uniform([0.0, 1.0, 0.0, 0.0]),
        rule: FieldRule::diffusion(0.0, 0.0),
        raymarch: RaymarchOptions {
            field_color: Vec3::new(0.0, 0.0, 1.0),
            ..RaymarchOptions::default()
        },
    };
    let Some(mut session) = try_session(32, 32, &uniform_volume(0), &config) else {
        return;
    };
    session.step();

    let pixels = session.render(&axis_camera()).unwrap();
    let center = &pixels[(16 * 32 + 16) * 4..(16 * 32 + 16) * 4 + 4];
    assert_eq!(center[0], 0);
    assert_eq!(center[2], 255);
}

#[test]
fn raymarch_options_apply_to_next_render() {
    let config = SceneConfig {
        field_size: 4,
        seed: FieldSeed::Uniform([0.0, 1.0, 0.0, 0.0]),
        rule: FieldRule::diffusion(0.0, 0.0),
        raymarch: RaymarchOptions::default(),
    };
    let Some(mut session) = try_session(32, 32, &uniform_volume(0), &config) else {
        return;
    };
    let camera = axis_camera();
    let center = (16 * 32 + 16) * 4;

    let before = session.render(&camera).unwrap();
    assert_eq!(&before[..4], &[0, 0, 0, 255], "default background is black");
    assert_eq!(before[center], 255);
    assert!(before[center + 1] < 128);

    session.set_raymarch_options(RaymarchOptions {
        field_color: Vec3::new(0.0, 1.0, 0.0),
        background: Vec3::new(0.0, 0.0, 1.0),
        ..RaymarchOptions::default()
    });
    let after = session.render(&camera).unwrap();
    assert_eq!(&after[..4], &[0, 0, 255, 255]);
    assert_eq!(&after[center..center + 4], &[0, 255, 0, 255]);
    assert_eq!(
        session.scene().renderer().options().background,
        Vec3::new(0.0, 0.0, 1.0)
    );
}

#[test]
fn degenerate_camera_is_an_error() {
    let Some(mut session) = try_session(16, 16, &uniform_volume(0), &small_config(4)) else {
        return;
    };
    let mut camera = axis_camera();
    camera.far = camera.near;

    let err = session.render(&camera).unwrap_err();
    assert!(matches!(
        err,
        CytoscopeError::Render(RenderError::Core(CoreError::DegenerateCamera(_)))
    ));
}

#[test]
fn invalid_rule_fails_at_construction() {
    let volume = uniform_volume(0);
    if try_session(16, 16, &volume, &small_config(4)).is_none() {
        return;
    }

    let config = SceneConfig {
        rule: FieldRule::custom("broken", "fn field_rule(cell: vec3<i32>) -> f32 { return 1; }"),
        ..small_config(4)
    };
    let err = HeadlessSession::new(16, 16, &volume, &config)
        .err()
        .expect("invalid rule must fail");
    assert!(
        matches!(
            err,
            CytoscopeError::Render(
                RenderError::ShaderCompilationFailed(_) | RenderError::PipelineCreationFailed(_)
            )
        ),
        "unexpected error {err}"
    );
}

#[test]
fn static_volume_rejects_mismatched_bytes() {
    let Some(session) = try_session(16, 16, &uniform_volume(0), &small_config(4)) else {
        return;
    };
    let engine = session.engine();

    let err = create_static_volume(&engine.device, &engine.queue, vec![0; 10], 2, 2, 3)
        .err()
        .expect("mismatch must fail");
    assert!(matches!(
        err,
        RenderError::Core(CoreError::VolumeSizeMismatch {
            expected: 12,
            actual: 10
        })
    ));

    // A width that is not a multiple of the row alignment still uploads.
    let volume = create_static_volume(&engine.device, &engine.queue, vec![1; 300], 5, 6, 10)
        .unwrap();
    assert_eq!(volume.extent(), VolumeExtent::new(5, 6, 10));
}

#[test]
fn gray_scott_stays_bounded() {
    let config = SceneConfig {
        field_size: 8,
        seed: FieldSeed::Noise {
            seed: 3,
            amplitude: 0.25,
        },
        rule: FieldRule::gray_scott(GrayScottParams::default()),
        raymarch: RaymarchOptions::default(),
    };
    let Some(mut session) = try_session(16, 16, &uniform_volume(0), &config) else {
        return;
    };
    assert_eq!(session.scene().simulation().rule().label(), "gray-scott");
    assert_eq!(session.advance(10), 10);

    for voxel in session.read_field().unwrap() {
        assert!((0.0..=1.0).contains(&voxel[0]), "u = {}", voxel[0]);
        assert!((0.0..=1.0).contains(&voxel[1]), "v = {}", voxel[1]);
    }
}

#[test]
fn render_to_file_writes_png() {
    let volume = ScalarVolumeData::synthetic_sphere(VolumeExtent::cube(8)).unwrap();
    let Some(mut session) = try_session(24, 24, &volume, &small_config(4)) else {
        return;
    };
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("frame.png");

    session.render_to_file(&path, &axis_camera()).unwrap();
    assert!(std::fs::metadata(&path).unwrap().len() > 0);
}
