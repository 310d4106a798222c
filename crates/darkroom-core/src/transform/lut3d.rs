//! 3D LUT application and `.cube` / Hald CLUT I/O.

use std::fmt;
use std::path::Path;

use crate::error::ClutError;

/// Smallest and largest supported cube side.
const SIZE_RANGE: std::ops::RangeInclusive<usize> = 2..=256;

/// Upper bound on entries reserved from a header before any row is read.
const MAX_RESERVE: usize = 65 * 65 * 65;

/// A 3D lookup table mapping RGB to RGB.
///
/// Entries are stored with red varying fastest, then green, then blue, the
/// order used by both `.cube` files and Hald images. Lookups use tri-linear
/// interpolation between the eight surrounding grid vertices.
///
/// The grid is always at least 2 per side and holds exactly `size³`
/// entries; constructors enforce this and the fields stay private.
#[derive(Debug, Clone, PartialEq)]
pub struct Lut3D {
    /// Optional `TITLE` from the source file.
    pub title: Option<String>,
    size: usize,
    data: Vec<[f32; 3]>,
    /// Minimum domain values per channel.
    pub domain_min: [f32; 3],
    /// Maximum domain values per channel.
    pub domain_max: [f32; 3],
}

impl Lut3D {
    /// A table that maps every input to itself. `size` is raised to 2.
    pub fn identity(size: usize) -> Self {
        let size = size.max(2);
        let step = 1.0 / (size - 1) as f32;
        let mut data = Vec::with_capacity(size * size * size);
        for b in 0..size {
            for g in 0..size {
                for r in 0..size {
                    data.push([r as f32 * step, g as f32 * step, b as f32 * step]);
                }
            }
        }
        Self {
            title: None,
            size,
            data,
            domain_min: [0.0; 3],
            domain_max: [1.0; 3],
        }
    }

    /// Wrap raw entries over the unit domain, checking the entry count.
    pub fn from_data(size: usize, data: Vec<[f32; 3]>) -> Result<Self, ClutError> {
        if !SIZE_RANGE.contains(&size) {
            return Err(ClutError::InvalidSize(size));
        }
        let expected = size * size * size;
        if data.len() != expected {
            return Err(ClutError::SizeMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            title: None,
            size,
            data,
            domain_min: [0.0; 3],
            domain_max: [1.0; 3],
        })
    }

    /// Parse the text of a `.cube` file.
    ///
    /// Recognised keywords are `TITLE`, `LUT_3D_SIZE`, `DOMAIN_MIN`,
    /// `DOMAIN_MAX` and `LUT_3D_INPUT_RANGE`; other keywords are skipped.
    /// `LUT_1D_SIZE` is rejected.
    pub fn parse_cube(text: &str) -> Result<Self, ClutError> {
        let mut title = None;
        let mut size: Option<usize> = None;
        let mut domain_min = [0.0_f32; 3];
        let mut domain_max = [1.0_f32; 3];
        let mut data = Vec::new();

        for (index, raw) in text.lines().enumerate() {
            let line_no = index + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let mut tokens = line.split_whitespace();
            let Some(first) = tokens.next() else {
                continue;
            };

            if first.parse::<f32>().is_ok() {
                data.push(parse_triplet(line, line_no)?);
                continue;
            }

            let rest = line[first.len()..].trim();
            match first {
                "TITLE" => title = Some(rest.trim_matches('"').to_string()),
                "LUT_3D_SIZE" => {
                    let n = rest.parse::<usize>().map_err(|_| ClutError::Parse {
                        line: line_no,
                        message: format!("invalid LUT_3D_SIZE '{rest}'"),
                    })?;
                    if !SIZE_RANGE.contains(&n) {
                        return Err(ClutError::InvalidSize(n));
                    }
                    data.reserve((n * n * n).min(MAX_RESERVE));
                    size = Some(n);
                }
                "LUT_1D_SIZE" => return Err(ClutError::OneDimensional),
                "DOMAIN_MIN" => domain_min = parse_triplet(rest, line_no)?,
                "DOMAIN_MAX" => domain_max = parse_triplet(rest, line_no)?,
                "LUT_3D_INPUT_RANGE" => {
                    let [lo, hi] = parse_pair(rest, line_no)?;
                    domain_min = [lo; 3];
                    domain_max = [hi; 3];
                }
                other => tracing::debug!(keyword = other, line = line_no, "skipping .cube keyword"),
            }
        }

        let size = size.ok_or(ClutError::MissingSize)?;
        let expected = size * size * size;
        if data.len() != expected {
            return Err(ClutError::SizeMismatch {
                expected,
                actual: data.len(),
            });
        }

        Ok(Self {
            title,
            size,
            data,
            domain_min,
            domain_max,
        })
    }

    /// Grid size per axis.
    pub fn size(&self) -> usize {
        self.size
    }

    /// `size³` RGB entries, red fastest.
    pub fn data(&self) -> &[[f32; 3]] {
        &self.data
    }

    /// Mutable entries. The entry count is fixed.
    pub fn data_mut(&mut self) -> &mut [[f32; 3]] {
        &mut self.data
    }

    /// Load a 3D LUT from a `.cube` file.
    pub fn load_cube(path: &Path) -> Result<Self, ClutError> {
        let text = std::fs::read_to_string(path).map_err(|source| ClutError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse_cube(&text)
    }

    /// Save this 3D LUT to a `.cube` file.
    pub fn save_cube(&self, path: &Path) -> Result<(), ClutError> {
        std::fs::write(path, self.to_string()).map_err(|source| ClutError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Build a table from a Hald CLUT image.
    ///
    /// A level-`L` Hald image is a square of side `L³` pixels holding an
    /// `L²`-sided cube in reading order, red fastest.
    pub fn from_hald(img: &image::Rgb32FImage) -> Result<Self, ClutError> {
        let (width, height) = img.dimensions();
        let level = hald_level(width, height).ok_or(ClutError::InvalidHald { width, height })?;
        let size = (level * level) as usize;
        let data = img.pixels().map(|p| p.0).collect();
        Self::from_data(size, data)
    }

    /// Apply this LUT to an RGB triple using tri-linear interpolation.
    ///
    /// Inputs are clamped to the domain; NaN maps to the domain minimum.
    pub fn apply(&self, rgb: [f32; 3]) -> [f32; 3] {
        let last = self.size - 1;
        let mut base = [0_usize; 3];
        let mut frac = [0.0_f32; 3];
        for c in 0..3 {
            let span = self.domain_max[c] - self.domain_min[c];
            let t = if span > 0.0 {
                (rgb[c] - self.domain_min[c]) / span
            } else {
                0.0
            };
            let t = if t > 0.0 { t.min(1.0) } else { 0.0 };
            let pos = t * last as f32;
            let i = (pos as usize).min(last - 1);
            base[c] = i;
            frac[c] = pos - i as f32;
        }

        let [r0, g0, b0] = base;
        let [fr, fg, fb] = frac;
        let c000 = self.entry(r0, g0, b0);
        let c100 = self.entry(r0 + 1, g0, b0);
        let c010 = self.entry(r0, g0 + 1, b0);
        let c110 = self.entry(r0 + 1, g0 + 1, b0);
        let c001 = self.entry(r0, g0, b0 + 1);
        let c101 = self.entry(r0 + 1, g0, b0 + 1);
        let c011 = self.entry(r0, g0 + 1, b0 + 1);
        let c111 = self.entry(r0 + 1, g0 + 1, b0 + 1);

        let mut out = [0.0_f32; 3];
        for k in 0..3 {
            let c00 = lerp(c000[k], c100[k], fr);
            let c10 = lerp(c010[k], c110[k], fr);
            let c01 = lerp(c001[k], c101[k], fr);
            let c11 = lerp(c011[k], c111[k], fr);
            let c0 = lerp(c00, c10, fg);
            let c1 = lerp(c01, c11, fg);
            out[k] = lerp(c0, c1, fb);
        }
        out
    }

    #[inline]
    fn entry(&self, r: usize, g: usize, b: usize) -> [f32; 3] {
        self.data[r + self.size * (g + self.size * b)]
    }
}

impl fmt::Display for Lut3D {
    /// `.cube` text.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(title) = &self.title {
            writeln!(f, "TITLE \"{title}\"")?;
        }
        writeln!(f, "LUT_3D_SIZE {}", self.size)?;
        let [a, b, c] = self.domain_min;
        writeln!(f, "DOMAIN_MIN {a:.6} {b:.6} {c:.6}")?;
        let [a, b, c] = self.domain_max;
        writeln!(f, "DOMAIN_MAX {a:.6} {b:.6} {c:.6}")?;
        for [r, g, b] in &self.data {
            writeln!(f, "{r:.6} {g:.6} {b:.6}")?;
        }
        Ok(())
    }
}

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Level `L >= 2` with `width == height == L³`.
fn hald_level(width: u32, height: u32) -> Option<u32> {
    if width != height {
        return None;
    }
    (2..=16).find(|l| l * l * l == width)
}

fn parse_floats<const N: usize>(text: &str, line: usize) -> Result<[f32; N], ClutError> {
    let mut out = [0.0_f32; N];
    let mut tokens = text.split_whitespace();
    for slot in &mut out {
        let token = tokens.next().ok_or_else(|| ClutError::Parse {
            line,
            message: format!("expected {N} values"),
        })?;
        *slot = token.parse().map_err(|_| ClutError::Parse {
            line,
            message: format!("invalid number '{token}'"),
        })?;
    }
    if tokens.next().is_some() {
        return Err(ClutError::Parse {
            line,
            message: format!("expected {N} values"),
        });
    }
    Ok(out)
}

fn parse_triplet(text: &str, line: usize) -> Result<[f32; 3], ClutError> {
    parse_floats::<3>(text, line)
}

fn parse_pair(text: &str, line: usize) -> Result<[f32; 2], ClutError> {
    parse_floats::<2>(text, line)
}
