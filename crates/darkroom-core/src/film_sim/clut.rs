//! A loaded film-simulation CLUT: the 3D table plus the knobs it declares.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ClutError;
use crate::film_sim::discover::clut_display_name;
use crate::transform::lut3d::Lut3D;

/// On-disk CLUT encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClutFormat {
    /// Text `.cube` file.
    Cube,
    /// Hald CLUT image (`.png`, `.tif`, `.tiff`).
    Hald,
}

impl ClutFormat {
    /// Format implied by the file extension (case-insensitive).
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "cube" => Some(Self::Cube),
            "png" | "tif" | "tiff" => Some(Self::Hald),
            _ => None,
        }
    }
}

/// A named, ranged parameter declared by a CLUT.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClutParamDescriptor {
    pub name: String,
    /// Display label; the name when the declaration has none.
    pub label: String,
    pub min: f32,
    pub max: f32,
    pub default: f32,
}

impl ClutParamDescriptor {
    /// Effective value: `value` clamped to the range, or the default when
    /// absent or not finite.
    pub fn resolve(&self, value: Option<f32>) -> f32 {
        match value {
            Some(v) if v.is_finite() => v.clamp(self.min, self.max),
            _ => self.default,
        }
    }
}

/// Parse `# PARAM <name> <min> <max> <default> [label...]` declarations.
pub fn parse_param_declarations(text: &str) -> Result<Vec<ClutParamDescriptor>, ClutError> {
    let mut params = Vec::new();

    for (index, raw) in text.lines().enumerate() {
        let Some(comment) = raw.trim().strip_prefix('#') else {
            continue;
        };
        let mut tokens = comment.split_whitespace();
        if tokens.next() != Some("PARAM") {
            continue;
        }
        let line = index + 1;
        let malformed = |message: String| ClutError::Parse { line, message };

        let name = tokens
            .next()
            .ok_or_else(|| malformed("PARAM without a name".into()))?
            .to_string();
        let mut numbers = [0.0_f32; 3];
        for slot in &mut numbers {
            let token = tokens
                .next()
                .ok_or_else(|| malformed(format!("PARAM {name}: expected min, max and default")))?;
            *slot = token
                .parse()
                .map_err(|_| malformed(format!("PARAM {name}: invalid number '{token}'")))?;
        }
        let [min, max, default] = numbers;
        if !(min <= max) {
            return Err(malformed(format!("PARAM {name}: min {min} exceeds max {max}")));
        }

        let label = tokens.collect::<Vec<_>>().join(" ");
        params.push(ClutParamDescriptor {
            label: if label.is_empty() { name.clone() } else { label },
            name,
            min,
            max,
            default: default.clamp(min, max),
        });
    }

    Ok(params)
}

/// An immutable, loaded CLUT. Shared as `Arc<Clut>` once cached.
#[derive(Debug, Clone)]
pub struct Clut {
    name: String,
    path: PathBuf,
    lut: Lut3D,
    params: Vec<ClutParamDescriptor>,
}

impl Clut {
    /// Load a CLUT, choosing the decoder from the file extension.
    pub fn load(path: &Path) -> Result<Self, ClutError> {
        let format = ClutFormat::from_path(path)
            .ok_or_else(|| ClutError::UnsupportedFormat(path.display().to_string()))?;

        let (lut, params) = match format {
            ClutFormat::Cube => {
                let text = std::fs::read_to_string(path).map_err(|source| ClutError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
                (Lut3D::parse_cube(&text)?, parse_param_declarations(&text)?)
            }
            ClutFormat::Hald => {
                let img = image::ImageReader::open(path)
                    .map_err(|source| ClutError::Io {
                        path: path.to_path_buf(),
                        source,
                    })?
                    .with_guessed_format()
                    .map_err(|source| ClutError::Io {
                        path: path.to_path_buf(),
                        source,
                    })?
                    .decode()?;
                (Lut3D::from_hald(&img.into_rgb32f())?, Vec::new())
            }
        };

        Ok(Self {
            name: clut_display_name(path),
            path: path.to_path_buf(),
            lut,
            params,
        })
    }

    /// Wrap an in-memory table.
    pub fn from_lut(name: impl Into<String>, lut: Lut3D, params: Vec<ClutParamDescriptor>) -> Self {
        Self {
            name: name.into(),
            path: PathBuf::new(),
            lut,
            params,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Source file; empty for in-memory tables.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn lut(&self) -> &Lut3D {
        &self.lut
    }

    pub fn params(&self) -> &[ClutParamDescriptor] {
        &self.params
    }

    pub fn param(&self, name: &str) -> Option<&ClutParamDescriptor> {
        self.params.iter().find(|p| p.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CUBE_WITH_PARAMS: &str = "\
# PARAM exposure -2 2 0 Exposure (EV)
# PARAM saturation 0 2 1
# an ordinary comment
LUT_3D_SIZE 2
0 0 0
1 0 0
0 1 0
1 1 0
0 0 1
1 0 1
0 1 1
1 1 1
";

    #[test]
    fn test_parses_param_declarations() {
        let params = parse_param_declarations(CUBE_WITH_PARAMS).unwrap();
        assert_eq!(params.len(), 2);
        assert_eq!(params[0].name, "exposure");
        assert_eq!(params[0].label, "Exposure (EV)");
        assert_eq!((params[0].min, params[0].max, params[0].default), (-2.0, 2.0, 0.0));
        assert_eq!(params[1].label, "saturation");
    }

    #[test]
    fn test_rejects_inverted_param_range() {
        let err = parse_param_declarations("# PARAM x 2 1 0\n").unwrap_err();
        assert!(matches!(err, ClutError::Parse { line: 1, .. }));
    }

    #[test]
    fn test_descriptor_resolves_values() {
        let d = ClutParamDescriptor {
            name: "exposure".into(),
            label: "exposure".into(),
            min: -2.0,
            max: 2.0,
            default: 0.5,
        };
        assert_eq!(d.resolve(None), 0.5);
        assert_eq!(d.resolve(Some(5.0)), 2.0);
        assert_eq!(d.resolve(Some(-1.0)), -1.0);
        assert_eq!(d.resolve(Some(f32::NAN)), 0.5);
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(ClutFormat::from_path(Path::new("a/Velvia.CUBE")), Some(ClutFormat::Cube));
        assert_eq!(ClutFormat::from_path(Path::new("b.tiff")), Some(ClutFormat::Hald));
        assert_eq!(ClutFormat::from_path(Path::new("c.jpg")), None);
        assert_eq!(ClutFormat::from_path(Path::new("noext")), None);
    }

    #[test]
    fn test_load_cube_with_params() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Soft_Look.cube");
        std::fs::write(&path, CUBE_WITH_PARAMS).unwrap();

        let clut = Clut::load(&path).unwrap();
        assert_eq!(clut.name(), "Soft Look");
        assert_eq!(clut.lut().size(), 2);
        assert!(clut.param("saturation").is_some());
        assert!(clut.param("grain").is_none());
    }

    #[test]
    fn test_load_hald_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("identity_HALD.png");
        let identity = Lut3D::identity(4);
        let img = image::RgbImage::from_fn(8, 8, |x, y| {
            let [r, g, b] = identity.data()[(y * 8 + x) as usize];
            image::Rgb([(r * 255.0) as u8, (g * 255.0) as u8, (b * 255.0) as u8])
        });
        img.save(&path).unwrap();

        let clut = Clut::load(&path).unwrap();
        assert_eq!(clut.lut().size(), 4);
        assert!(clut.params().is_empty());
        assert_eq!(clut.name(), "identity");
    }

    #[test]
    fn test_load_reports_missing_file_and_bad_extension() {
        assert!(matches!(
            Clut::load(Path::new("/nonexistent/x.cube")).unwrap_err(),
            ClutError::Io { .. }
        ));
        assert!(matches!(
            Clut::load(Path::new("look.3dl")).unwrap_err(),
            ClutError::UnsupportedFormat(_)
        ));
    }
}
