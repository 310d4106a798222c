//! Darkroom Demo — run the colour pipeline on an image file.
//!
//! ```text
//! darkroom-demo <input> <output> [params.json] [--preview <file> <width> <height> [degrees]]
//! darkroom-demo --list-cluts
//! ```
//!
//! Engine settings come from `DARKROOM_*` environment variables; log
//! verbosity from `RUST_LOG`.

mod image_io;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use darkroom_core::geometry::{bilinear_interp, rotate};
use darkroom_core::{EngineConfig, Pipeline, ProcParams, Rgb8Buffer, Rotation};
use tracing_subscriber::EnvFilter;

/// Preview request from the command line.
struct PreviewArgs {
    path: PathBuf,
    width: usize,
    height: usize,
    rotation: Rotation,
}

struct Args {
    input: PathBuf,
    output: PathBuf,
    params: Option<PathBuf>,
    preview: Option<PreviewArgs>,
}

#[derive(Debug, thiserror::Error)]
enum DemoError {
    #[error("usage: darkroom-demo <input> <output> [params.json] [--preview <file> <width> <height> [degrees]] | --list-cluts")]
    Usage,
    #[error("invalid {what} '{value}'")]
    InvalidArgument { what: &'static str, value: String },
    #[error(transparent)]
    Params(#[from] darkroom_core::ParamsError),
    #[error(transparent)]
    Image(#[from] image_io::ImageIoError),
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let raw: Vec<String> = std::env::args().skip(1).collect();
    let result = if raw.first().map(String::as_str) == Some("--list-cluts") {
        list_cluts();
        Ok(())
    } else {
        parse_args(&raw).and_then(|args| run(&args))
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn parse_args(raw: &[String]) -> Result<Args, DemoError> {
    let mut positional = Vec::new();
    let mut preview = None;
    let mut iter = raw.iter();

    while let Some(arg) = iter.next() {
        if arg == "--preview" {
            let path = iter.next().ok_or(DemoError::Usage)?;
            let width = parse_number(iter.next(), "preview width")?;
            let height = parse_number(iter.next(), "preview height")?;
            let rotation = match iter.clone().next() {
                Some(deg) if !deg.starts_with("--") => {
                    iter.next();
                    deg.parse()
                        .ok()
                        .and_then(Rotation::from_degrees)
                        .ok_or_else(|| DemoError::InvalidArgument {
                            what: "rotation",
                            value: deg.clone(),
                        })?
                }
                _ => Rotation::None,
            };
            preview = Some(PreviewArgs {
                path: PathBuf::from(path),
                width,
                height,
                rotation,
            });
        } else {
            positional.push(PathBuf::from(arg));
        }
    }

    let mut positional = positional.into_iter();
    let (Some(input), Some(output)) = (positional.next(), positional.next()) else {
        return Err(DemoError::Usage);
    };
    Ok(Args {
        input,
        output,
        params: positional.next(),
        preview,
    })
}

fn parse_number(value: Option<&String>, what: &'static str) -> Result<usize, DemoError> {
    let value = value.ok_or(DemoError::Usage)?;
    value
        .parse()
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| DemoError::InvalidArgument {
            what,
            value: value.clone(),
        })
}

fn run(args: &Args) -> Result<(), DemoError> {
    let pipeline = Pipeline::new(EngineConfig::default());
    let params = match &args.params {
        Some(path) => ProcParams::load(path)?,
        None => ProcParams::default(),
    };

    let mut img = image_io::load_linear(&args.input, pipeline.gamma())?;
    tracing::info!(
        input = %args.input.display(),
        width = img.width(),
        height = img.height(),
        "loaded image"
    );

    let report = pipeline.process(&mut img, &params, 1, None);
    tracing::info!(stages = ?report.applied, "processed");
    if let Some(e) = &report.film_simulation_error {
        tracing::warn!("{e}");
    }

    image_io::save_encoded(&args.output, &img, pipeline.gamma())?;
    tracing::info!(output = %args.output.display(), "saved");

    if let Some(preview) = &args.preview {
        write_preview(preview, &image_io::to_preview(&img, pipeline.gamma()))?;
    }
    Ok(())
}

fn write_preview(args: &PreviewArgs, full: &Rgb8Buffer) -> Result<(), DemoError> {
    let mut scaled = Rgb8Buffer::new(args.width, args.height);
    bilinear_interp(full, &mut scaled);
    let rotated = rotate(&scaled, args.rotation);
    let (width, height) = (rotated.width(), rotated.height());
    image_io::save_preview(&args.path, rotated)?;
    tracing::info!(
        preview = %args.path.display(),
        width,
        height,
        rotation = args.rotation.degrees(),
        "saved preview"
    );
    Ok(())
}

fn list_cluts() {
    let pipeline = Pipeline::new(EngineConfig::default());
    let Some(dir) = pipeline.config().clut_dir.as_deref() else {
        tracing::warn!("DARKROOM_CLUT_DIR is not set");
        return;
    };
    for entry in pipeline.available_cluts() {
        let group = entry.group.join("/");
        let descriptors = pipeline.clut_param_descriptors(&relative(&entry.path, dir));
        let params: Vec<&str> = descriptors.params.iter().map(|p| p.name.as_str()).collect();
        println!("{group:<24} {:<32} {}", entry.label, params.join(", "));
    }
}

fn relative(path: &Path, dir: &Path) -> String {
    path.strip_prefix(dir)
        .unwrap_or(path)
        .to_string_lossy()
        .into_owned()
}
