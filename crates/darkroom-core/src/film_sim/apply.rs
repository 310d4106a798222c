//! Film simulation: CLUT lookup blended with the original image.

use std::path::Path;

use crate::color_management::GammaTables;
use crate::error::FilmSimError;
use crate::film_sim::clut::Clut;
use crate::film_sim::discover::resolve_clut_path;
use crate::film_sim::knobs::{Knobs, apply_exposure, apply_saturation};
use crate::film_sim::store::ClutStore;
use crate::image::{MAX_SAMPLE, PlanarImage};
use crate::transform::kernel::Execution;
use crate::transform::params::FilmSimulationParams;

/// Apply the configured CLUT to `image`.
///
/// Does nothing when the stage is disabled, has no file, or has zero
/// strength. A CLUT that fails to load yields `Err` and leaves the image
/// untouched; the failure stays cached in `store`.
///
/// Per pixel:
///
/// ```text
/// lin  = exposure(orig)                  (declared knob, linear light)
/// enc  = srgb_encode(lin)                (normalised)
/// clut = srgb_decode(saturation(lut(enc)))
/// out  = strength × clut + (1 − strength) × orig
/// ```
pub fn apply_film_simulation(
    image: &mut PlanarImage,
    params: &FilmSimulationParams,
    store: &ClutStore,
    gamma: &GammaTables,
    clut_dir: Option<&Path>,
    exec: &Execution,
) -> Result<(), FilmSimError> {
    if !params.is_active() {
        return Ok(());
    }

    let path = resolve_clut_path(&params.clut_filename, clut_dir);
    let clut = store
        .get_or_load(&path)
        .map_err(|source| FilmSimError { path, source })?;

    let strength = params.clamped_strength();
    let knobs = Knobs::resolve(&clut, &params.clut_params);
    tracing::debug!(clut = clut.name(), strength, ?knobs, "applying film simulation");

    image.for_each_row_mut(exec.multithread, |_, [red, green, blue]| {
        for ((r, g), b) in red.iter_mut().zip(green.iter_mut()).zip(blue.iter_mut()) {
            let orig = [*r, *g, *b];
            let looked_up = clut_pixel(&clut, &knobs, gamma, orig);
            let out = blend(looked_up, orig, strength);
            [*r, *g, *b] = out;
        }
    });

    Ok(())
}

/// CLUT result for one linear pixel in `[0, MAX_SAMPLE]`.
fn clut_pixel(clut: &Clut, knobs: &Knobs, gamma: &GammaTables, rgb: [f32; 3]) -> [f32; 3] {
    let lin = apply_exposure(rgb, knobs.exposure);
    let encoded = lin.map(|v| gamma.encode(v) / MAX_SAMPLE);
    let looked_up = apply_saturation(clut.lut().apply(encoded), knobs.saturation);
    looked_up.map(|v| gamma.decode(v * MAX_SAMPLE))
}

/// `strength × clut + (1 − strength) × orig`; exactly `clut` at full strength.
#[inline]
fn blend(clut: [f32; 3], orig: [f32; 3], strength: f32) -> [f32; 3] {
    if strength >= 1.0 {
        return clut;
    }
    let keep = 1.0 - strength;
    [
        strength * clut[0] + keep * orig[0],
        strength * clut[1] + keep * orig[1],
        strength * clut[2] + keep * orig[2],
    ]
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    use super::*;
    use crate::film_sim::clut::parse_param_declarations;
    use crate::transform::lut3d::Lut3D;

    /// Cube that maps every colour to its negative.
    fn write_invert_cube(dir: &Path, header: &str) -> PathBuf {
        let mut lut = Lut3D::identity(2);
        for entry in lut.data_mut() {
            *entry = entry.map(|v| 1.0 - v);
        }
        let path = dir.join("invert.cube");
        std::fs::write(&path, format!("{header}{lut}")).unwrap();
        path
    }

    fn params(path: &Path, strength: f32) -> FilmSimulationParams {
        FilmSimulationParams {
            enabled: true,
            clut_filename: path.to_string_lossy().into_owned(),
            strength,
            ..Default::default()
        }
    }

    fn sample_image() -> PlanarImage {
        let mut img = PlanarImage::new(3, 2);
        img.set(0, 0, [1000.0, 20000.0, 60000.0]);
        img.set(0, 1, [32768.0, 32768.0, 32768.0]);
        img.set(1, 2, [65535.0, 0.0, 12.5]);
        img
    }

    #[test]
    fn test_disabled_or_zero_strength_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_invert_cube(dir.path(), "");
        let store = ClutStore::new(1);
        let gamma = GammaTables::srgb();
        let original = sample_image();

        let mut img = original.clone();
        let mut off = params(&path, 1.0);
        off.enabled = false;
        apply_film_simulation(&mut img, &off, &store, &gamma, None, &Execution::serial()).unwrap();
        assert_eq!(img, original);

        apply_film_simulation(&mut img, &params(&path, 0.0), &store, &gamma, None, &Execution::serial())
            .unwrap();
        assert_eq!(img, original);
        assert!(store.is_empty(), "no-op must not load the CLUT");
    }

    #[test]
    fn test_full_strength_is_pure_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_invert_cube(dir.path(), "");
        let store = ClutStore::new(1);
        let gamma = GammaTables::srgb();

        let mut img = sample_image();
        apply_film_simulation(&mut img, &params(&path, 1.0), &store, &gamma, None, &Execution::serial())
            .unwrap();

        // Inverting in encoded space maps black to white.
        let px = img.get(1, 2);
        assert!(px[0] < 1.0, "{px:?}");
        assert!((px[1] - MAX_SAMPLE).abs() < 1.0, "{px:?}");
    }

    #[test]
    fn test_intermediate_strength_is_convex_combination() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_invert_cube(dir.path(), "");
        let store = ClutStore::new(1);
        let gamma = GammaTables::srgb();
        let original = sample_image();

        let mut full = original.clone();
        apply_film_simulation(&mut full, &params(&path, 1.0), &store, &gamma, None, &Execution::serial())
            .unwrap();
        let mut half = original.clone();
        apply_film_simulation(&mut half, &params(&path, 0.25), &store, &gamma, None, &Execution::serial())
            .unwrap();

        for row in 0..2 {
            for col in 0..3 {
                let o = original.get(row, col);
                let c = full.get(row, col);
                let h = half.get(row, col);
                for k in 0..3 {
                    let expected = 0.25 * c[k] + 0.75 * o[k];
                    assert_eq!(h[k].to_bits(), expected.to_bits());
                }
            }
        }
    }

    #[test]
    fn test_missing_clut_leaves_image_untouched() {
        let store = ClutStore::new(1);
        let gamma = GammaTables::srgb();
        let original = sample_image();
        let mut img = original.clone();

        let err = apply_film_simulation(
            &mut img,
            &params(Path::new("missing.cube"), 1.0),
            &store,
            &gamma,
            Some(Path::new("/nonexistent")),
            &Execution::default(),
        )
        .unwrap_err();
        assert_eq!(err.path, PathBuf::from("/nonexistent/missing.cube"));
        assert_eq!(img, original);
    }

    #[test]
    fn test_undeclared_knobs_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_invert_cube(dir.path(), "");
        let store = ClutStore::new(1);
        let gamma = GammaTables::srgb();

        let mut plain = sample_image();
        apply_film_simulation(&mut plain, &params(&path, 1.0), &store, &gamma, None, &Execution::serial())
            .unwrap();

        let mut knobbed = sample_image();
        let mut p = params(&path, 1.0);
        p.clut_params = BTreeMap::from([("exposure".to_string(), 2.0), ("grain".to_string(), 9.0)]);
        apply_film_simulation(&mut knobbed, &p, &store, &gamma, None, &Execution::serial()).unwrap();
        assert_eq!(plain, knobbed);
    }

    #[test]
    fn test_declared_exposure_knob_darkens_inverted_output() {
        let dir = tempfile::tempdir().unwrap();
        let header = "# PARAM exposure -2 2 0 Exposure\n";
        let path = write_invert_cube(dir.path(), header);
        assert_eq!(parse_param_declarations(header).unwrap().len(), 1);
        let store = ClutStore::new(1);
        let gamma = GammaTables::srgb();

        let mut plain = sample_image();
        apply_film_simulation(&mut plain, &params(&path, 1.0), &store, &gamma, None, &Execution::serial())
            .unwrap();

        let mut brighter = sample_image();
        let mut p = params(&path, 1.0);
        p.clut_params.insert("exposure".into(), 1.0);
        apply_film_simulation(&mut brighter, &p, &store, &gamma, None, &Execution::serial()).unwrap();

        // Brighter input through an inverting CLUT gives darker output.
        assert!(brighter.get(0, 1)[0] < plain.get(0, 1)[0]);
    }

    #[test]
    fn test_threaded_matches_serial() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_invert_cube(dir.path(), "");
        let store = ClutStore::new(1);
        let gamma = GammaTables::srgb();
        let p = params(&path, 0.6);

        let mut serial = sample_image();
        apply_film_simulation(&mut serial, &p, &store, &gamma, None, &Execution::serial()).unwrap();
        let mut threaded = sample_image();
        let exec = Execution {
            multithread: true,
            ..Execution::serial()
        };
        apply_film_simulation(&mut threaded, &p, &store, &gamma, None, &exec).unwrap();
        assert_eq!(serial, threaded);
    }
}
