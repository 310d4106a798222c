//! End-to-end checks of the colour stages through the public API.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use darkroom_core::film_sim::apply_film_simulation;
use darkroom_core::grading::{apply_rgb_curves, apply_tone_curve, build_curve_lut};
use darkroom_core::transform::params::{FilmSimulationParams, RgbCurvesParams, ToneCurveParams};
use darkroom_core::{
    Channel, ClutState, ClutStore, CurveKind, CurveSpec, EngineConfig, Execution, GammaTables,
    Kernel, Lut3D, MAX_SAMPLE, Pipeline, PlanarImage, ProcParams, Stage,
};

/// Every channel sweeps the full domain, left to right, top to bottom.
fn ramp(width: usize, height: usize) -> PlanarImage {
    let mut img = PlanarImage::new(width, height);
    let last = (width * height - 1) as f32;
    for row in 0..height {
        for col in 0..width {
            let v = (row * width + col) as f32 / last * MAX_SAMPLE;
            img.set(row, col, [v, v, v]);
        }
    }
    img
}

fn write_invert_cube(dir: &Path) -> PathBuf {
    let mut lut = Lut3D::identity(9);
    for entry in lut.data_mut() {
        *entry = entry.map(|v| 1.0 - v);
    }
    let path = dir.join("invert.cube");
    lut.save_cube(&path).unwrap();
    path
}

fn enabled_curves(spec: CurveSpec) -> RgbCurvesParams {
    RgbCurvesParams {
        enabled: true,
        r_curve: spec.clone(),
        g_curve: spec.clone(),
        b_curve: spec,
    }
}

#[test]
fn test_identity_sentinel_changes_no_pixel() {
    let gamma = GammaTables::srgb();
    for raw in [
        vec![0.0],
        vec![0.0, 0.0, 0.3, 1.0, 0.7],
        Vec::new(),
    ] {
        let spec = CurveSpec::from_raw(raw);
        assert!(build_curve_lut(&spec, &gamma, 1).is_identity());

        let original = ramp(64, 8);
        let mut img = original.clone();
        apply_rgb_curves(&mut img, &enabled_curves(spec), &gamma, 1, None, &Execution::default());
        assert_eq!(img, original);
    }
}

#[test]
fn test_monotonic_curves_preserve_order() {
    let gamma = GammaTables::srgb();
    let curves = [
        CurveSpec::from_points(CurveKind::Linear, &[[0.0, 0.0], [0.3, 0.1], [0.6, 0.9], [1.0, 1.0]]),
        CurveSpec::from_points(CurveKind::Nurbs, &[[0.0, 0.05], [0.25, 0.5], [0.75, 0.6], [1.0, 0.95]]),
        CurveSpec::parametric([0.25, 0.5, 0.75], [-40.0, 30.0, -20.0, 100.0]),
    ];

    for spec in curves {
        let mut img = ramp(512, 16);
        apply_rgb_curves(&mut img, &enabled_curves(spec.clone()), &gamma, 1, None, &Execution::default());
        for c in Channel::ALL {
            let plane = img.channel(c);
            assert!(
                plane.windows(2).all(|w| w[1] >= w[0]),
                "{c} not monotonic for {spec:?}"
            );
        }
    }
}

#[test]
fn test_gamma_roundtrip_every_sample() {
    let gamma = GammaTables::srgb();
    for i in 0..=65535_u32 {
        let v = i as f32;
        let back = gamma.decode(gamma.encode(v));
        assert!((back - v).abs() <= 1.0, "{i}: {back}");
    }
}

#[test]
fn test_mid_gray_curve_scenario() {
    let gamma = GammaTables::srgb();
    let spec = CurveSpec::from_points(CurveKind::Linear, &[[0.0, 0.0], [0.5, 0.7], [1.0, 1.0]]);
    let gray = 0.5 * MAX_SAMPLE;
    let mut img = PlanarImage::filled(8, 8, [gray; 3]);
    apply_rgb_curves(&mut img, &enabled_curves(spec), &gamma, 1, None, &Execution::default());

    // encode → curve in perceptual space → decode
    let encoded = f64::from(gamma.encode(gray) / MAX_SAMPLE);
    let curved = 0.7 + (encoded - 0.5) * (1.0 - 0.7) / (1.0 - 0.5);
    let expected = gamma.decode(curved as f32 * MAX_SAMPLE);

    let px = img.get(3, 5);
    for v in px {
        assert!((v - expected).abs() < 2.0, "{v} vs {expected}");
        assert!(v > gray, "curve lifts mid-gray");
    }
    // Not a raw substitution of 0.7 in linear space.
    assert!((px[0] - 0.7 * MAX_SAMPLE).abs() > 1000.0);
    assert_eq!(px[0], px[1]);
    assert_eq!(px[1], px[2]);
}

#[test]
fn test_strength_blending() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_invert_cube(dir.path());
    let store = ClutStore::new(1);
    let gamma = GammaTables::srgb();
    let exec = Execution::default();
    let original = ramp(40, 10);

    let with_strength = |strength: f32| {
        let mut img = original.clone();
        let params = FilmSimulationParams {
            enabled: true,
            clut_filename: path.to_string_lossy().into_owned(),
            strength,
            ..Default::default()
        };
        apply_film_simulation(&mut img, &params, &store, &gamma, None, &exec).unwrap();
        img
    };

    assert_eq!(with_strength(0.0), original);

    let full = with_strength(1.0);
    for row in [0, 9] {
        for col in [0, 17, 39] {
            let o = original.get(row, col);
            let f = full.get(row, col);
            for k in 0..3 {
                let enc = gamma.encode(o[k]) / MAX_SAMPLE;
                let looked_up = Lut3D::identity(9).apply([1.0 - enc; 3])[0];
                let pure = gamma.decode(looked_up * MAX_SAMPLE);
                assert!((f[k] - pure).abs() < 1.0, "{} vs {pure}", f[k]);
            }
        }
    }

    let third = with_strength(0.3);
    for c in Channel::ALL {
        let keep = 1.0 - 0.3_f32;
        for ((t, f), o) in third
            .channel(c)
            .iter()
            .zip(full.channel(c))
            .zip(original.channel(c))
        {
            assert_eq!(t.to_bits(), (0.3 * f + keep * o).to_bits());
        }
    }
}

#[test]
fn test_single_slot_cache_reloads_evicted_clut() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("a.cube");
    let b = dir.path().join("b.cube");
    Lut3D::identity(2).save_cube(&a).unwrap();
    Lut3D::identity(3).save_cube(&b).unwrap();

    let store = ClutStore::new(1);
    let first_a = store.get_or_load(&a).unwrap();
    store.get_or_load(&b).unwrap();
    assert_eq!(store.state(&a), ClutState::Unloaded);
    assert_eq!(store.state(&b), ClutState::Ready);

    let second_a = store.get_or_load(&a).unwrap();
    assert!(!Arc::ptr_eq(&first_a, &second_a), "stale reference reused");
    assert_eq!(store.stats().misses, 3);
    assert_eq!(store.stats().hits, 0);
    assert_eq!(store.len(), 1);
}

#[test]
fn test_kernels_and_threading_are_equivalent() {
    let gamma = GammaTables::srgb();
    let params = RgbCurvesParams {
        enabled: true,
        r_curve: CurveSpec::from_points(CurveKind::CatmullRom, &[[0.0, 0.0], [0.4, 0.55], [1.0, 1.0]]),
        g_curve: CurveSpec::from_points(CurveKind::Spline, &[[0.0, 0.1], [0.5, 0.45], [1.0, 1.0]]),
        b_curve: CurveSpec::identity(),
    };
    let tone = ToneCurveParams {
        enabled: true,
        curve: CurveSpec::parametric([0.2, 0.5, 0.8], [10.0, 0.0, 0.0, -25.0]),
    };

    let run = |exec: Execution| {
        // Odd width exercises the scalar remainder of the wide kernel.
        let mut img = ramp(101, 7);
        apply_tone_curve(&mut img, &tone, &gamma, 1, None, &exec);
        apply_rgb_curves(&mut img, &params, &gamma, 1, None, &exec);
        img
    };

    let reference = run(Execution::serial());
    for multithread in [false, true] {
        for kernel in [Kernel::Wide, Kernel::Scalar] {
            assert_eq!(run(Execution { multithread, kernel }), reference);
        }
    }
}

#[test]
fn test_film_simulation_order_relative_to_tone_curve() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_invert_cube(dir.path());
    let config = EngineConfig {
        clut_cache_size: 2,
        clut_dir: Some(dir.path().to_path_buf()),
        multithread: true,
        kernel: Kernel::detect(),
    };
    let pipeline = Pipeline::new(config);

    let mut params = ProcParams::default();
    params.tone_curve = ToneCurveParams {
        enabled: true,
        curve: CurveSpec::from_points(CurveKind::Linear, &[[0.0, 0.0], [0.5, 0.8], [1.0, 1.0]]),
    };
    params.film_simulation = FilmSimulationParams {
        enabled: true,
        clut_filename: "invert.cube".into(),
        strength: 1.0,
        ..Default::default()
    };

    let mut before = ramp(32, 4);
    let report = pipeline.process(&mut before, &params, 1, None);
    assert_eq!(report.applied, vec![Stage::FilmSimulation, Stage::ToneCurve]);

    params.film_simulation.after_tone_curve = true;
    let mut after = ramp(32, 4);
    let report = pipeline.process(&mut after, &params, 1, None);
    assert_eq!(report.applied, vec![Stage::ToneCurve, Stage::FilmSimulation]);
    assert_ne!(before, after);

    // The "before" slot is film simulation followed by the tone curve.
    let exec = pipeline.config().execution();
    let mut manual = ramp(32, 4);
    params.film_simulation.after_tone_curve = false;
    apply_film_simulation(
        &mut manual,
        &params.film_simulation,
        pipeline.cluts(),
        pipeline.gamma(),
        Some(dir.path()),
        &exec,
    )
    .unwrap();
    apply_tone_curve(&mut manual, &params.tone_curve, pipeline.gamma(), 1, None, &exec);
    assert_eq!(manual, before);
    assert_eq!(pipeline.cluts().state(&path), ClutState::Ready);
}

#[test]
fn test_params_file_drives_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let params_path = dir.path().join("params.json");
    std::fs::write(
        &params_path,
        r#"{ "rgb_curves": { "enabled": true, "b_curve": [5, 0, 0.2, 1, 1] } }"#,
    )
    .unwrap();

    let params = ProcParams::load(&params_path).unwrap();
    let pipeline = Pipeline::new(EngineConfig::default());
    let mut img = PlanarImage::filled(3, 3, [0.0; 3]);
    let report = pipeline.process(&mut img, &params, 1, None);

    assert_eq!(report.applied, vec![Stage::RgbCurves]);
    let px = img.get(1, 1);
    assert_eq!(px[0], 0.0);
    assert!(px[2] > 0.0);
}
