//! Stage orchestration.
//!
//! The pipeline owns the shared read-only resources (gamma tables, CLUT
//! cache) and runs the colour stages in a fixed order:
//!
//! ```text
//! film simulation (before) → tone curve → film simulation (after) → RGB curves
//! ```
//!
//! Only one of the two film simulation slots runs, selected by
//! `FilmSimulationParams::after_tone_curve`.

use std::sync::Arc;

use crate::color_management::GammaTables;
use crate::config::EngineConfig;
use crate::error::FilmSimError;
use crate::film_sim::{
    ClutEntry, ClutStore, ParamDescriptors, apply_film_simulation, discover_cluts,
    resolve_clut_path,
};
use crate::grading::rgb_curves::{Pipette, apply_rgb_curves};
use crate::grading::tone_curve::apply_tone_curve;
use crate::image::PlanarImage;
use crate::transform::params::{FilmSimulationParams, ProcParams};

/// Where the caller wants pipette samples from.
#[derive(Debug)]
pub enum PipetteTarget<'a> {
    /// One channel of the RGB curves input.
    RgbCurve(Pipette<'a>),
    /// All three channels of the tone curve input.
    ToneCurve(&'a mut PlanarImage),
}

/// A colour stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    FilmSimulation,
    ToneCurve,
    RgbCurves,
}

/// What one `process` call did.
#[derive(Debug, Clone, Default)]
pub struct ProcessReport {
    /// Stages that ran, in order.
    pub applied: Vec<Stage>,
    /// Set when film simulation was requested but its CLUT failed to load.
    pub film_simulation_error: Option<FilmSimError>,
}

/// The colour pipeline with its shared resources.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: EngineConfig,
    gamma: Arc<GammaTables>,
    cluts: Arc<ClutStore>,
}

impl Pipeline {
    /// Build fresh sRGB gamma tables and a CLUT cache sized from `config`.
    pub fn new(config: EngineConfig) -> Self {
        let gamma = Arc::new(GammaTables::srgb());
        let cluts = Arc::new(ClutStore::new(config.clut_cache_size));
        Self::with_resources(config, gamma, cluts)
    }

    /// Share resources built elsewhere, e.g. between preview and export
    /// pipelines.
    pub fn with_resources(
        config: EngineConfig,
        gamma: Arc<GammaTables>,
        cluts: Arc<ClutStore>,
    ) -> Self {
        tracing::info!(
            clut_cache_size = cluts.capacity(),
            multithread = config.multithread,
            kernel = ?config.kernel,
            "pipeline ready"
        );
        Self {
            config,
            gamma,
            cluts,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn gamma(&self) -> &Arc<GammaTables> {
        &self.gamma
    }

    pub fn cluts(&self) -> &Arc<ClutStore> {
        &self.cluts
    }

    /// Run every enabled stage on `image` in place.
    ///
    /// `skip` is the preview downscale factor (1 for full quality). A film
    /// simulation failure is logged and reported; the other stages still run.
    pub fn process(
        &self,
        image: &mut PlanarImage,
        params: &ProcParams,
        skip: usize,
        pipette: Option<PipetteTarget<'_>>,
    ) -> ProcessReport {
        let exec = self.config.execution();
        let mut report = ProcessReport::default();
        tracing::debug!(
            width = image.width(),
            height = image.height(),
            skip,
            "processing image"
        );

        let (rgb_pipette, tone_pipette) = match pipette {
            Some(PipetteTarget::RgbCurve(p)) => (Some(p), None),
            Some(PipetteTarget::ToneCurve(p)) => (None, Some(p)),
            None => (None, None),
        };

        let film = &params.film_simulation;
        if !film.after_tone_curve {
            self.run_film_simulation(image, film, &mut report);
        }

        apply_tone_curve(image, &params.tone_curve, &self.gamma, skip, tone_pipette, &exec);
        if params.tone_curve.enabled {
            report.applied.push(Stage::ToneCurve);
        }

        if film.after_tone_curve {
            self.run_film_simulation(image, film, &mut report);
        }

        apply_rgb_curves(image, &params.rgb_curves, &self.gamma, skip, rgb_pipette, &exec);
        if params.rgb_curves.enabled {
            report.applied.push(Stage::RgbCurves);
        }

        report
    }

    fn run_film_simulation(
        &self,
        image: &mut PlanarImage,
        params: &FilmSimulationParams,
        report: &mut ProcessReport,
    ) {
        if !params.is_active() {
            return;
        }
        let exec = self.config.execution();
        match apply_film_simulation(
            image,
            params,
            &self.cluts,
            &self.gamma,
            self.config.clut_dir.as_deref(),
            &exec,
        ) {
            Ok(()) => report.applied.push(Stage::FilmSimulation),
            Err(e) => {
                tracing::warn!(error = %e, "film simulation skipped");
                report.film_simulation_error = Some(e);
            }
        }
    }

    /// Called when the user switches film simulation off. With a cache size
    /// of 1 the cached CLUT is released immediately.
    pub fn film_simulation_disabled(&self) {
        if self.config.clut_cache_size <= 1 {
            self.cluts.clear();
        }
    }

    /// Parameters declared by the CLUT named in a parameter block.
    pub fn clut_param_descriptors(&self, filename: &str) -> ParamDescriptors {
        let path = resolve_clut_path(filename, self.config.clut_dir.as_deref());
        self.cluts.param_descriptors(&path)
    }

    /// CLUTs available in the configured directory.
    pub fn available_cluts(&self) -> Vec<ClutEntry> {
        match &self.config.clut_dir {
            Some(dir) => discover_cluts(std::slice::from_ref(dir)),
            None => Vec::new(),
        }
    }
}
