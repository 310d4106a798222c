//! Image representation for the processing pipeline.

use std::fmt;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::BufferError;

/// Largest sample value of the 16-bit working domain.
pub const MAX_SAMPLE: f32 = 65535.0;

/// One of the three colour planes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Channel {
    Red,
    Green,
    Blue,
}

impl Channel {
    /// All channels in plane order.
    pub const ALL: [Channel; 3] = [Channel::Red, Channel::Green, Channel::Blue];

    /// Plane index (R = 0, G = 1, B = 2).
    pub const fn index(self) -> usize {
        match self {
            Self::Red => 0,
            Self::Green => 1,
            Self::Blue => 2,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Red => write!(f, "red"),
            Self::Green => write!(f, "green"),
            Self::Blue => write!(f, "blue"),
        }
    }
}

/// Planar RGB float image. Samples live in `[0, MAX_SAMPLE]` linear light;
/// values outside the range are kept and clamped only by lookups.
///
/// All three planes always hold exactly `width * height` samples, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanarImage {
    width: usize,
    height: usize,
    planes: [Vec<f32>; 3],
}

impl PlanarImage {
    /// Black image.
    pub fn new(width: usize, height: usize) -> Self {
        Self::filled(width, height, [0.0; 3])
    }

    /// Image with every pixel set to `rgb`.
    pub fn filled(width: usize, height: usize, rgb: [f32; 3]) -> Self {
        let len = width * height;
        Self {
            width,
            height,
            planes: [vec![rgb[0]; len], vec![rgb[1]; len], vec![rgb[2]; len]],
        }
    }

    /// Wrap existing planes, checking that each holds `width * height` samples.
    pub fn from_planes(
        width: usize,
        height: usize,
        red: Vec<f32>,
        green: Vec<f32>,
        blue: Vec<f32>,
    ) -> Result<Self, BufferError> {
        let expected = width * height;
        for (plane, data) in [("red", &red), ("green", &green), ("blue", &blue)] {
            if data.len() != expected {
                return Err(BufferError::PlaneLength {
                    plane,
                    expected,
                    actual: data.len(),
                });
            }
        }
        Ok(Self {
            width,
            height,
            planes: [red, green, blue],
        })
    }

    /// Convert from a normalised `[0, 1]` RGB float image.
    pub fn from_rgb32f(img: &image::Rgb32FImage) -> Self {
        let (w, h) = img.dimensions();
        let mut out = Self::new(w as usize, h as usize);
        for (i, px) in img.pixels().enumerate() {
            for c in 0..3 {
                out.planes[c][i] = px.0[c] * MAX_SAMPLE;
            }
        }
        out
    }

    /// Convert to a normalised `[0, 1]` RGB float image. Out-of-range samples
    /// are carried over unclamped.
    pub fn to_rgb32f(&self) -> image::Rgb32FImage {
        image::Rgb32FImage::from_fn(self.width as u32, self.height as u32, |x, y| {
            let i = y as usize * self.width + x as usize;
            image::Rgb([
                self.planes[0][i] / MAX_SAMPLE,
                self.planes[1][i] / MAX_SAMPLE,
                self.planes[2][i] / MAX_SAMPLE,
            ])
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// True when the image holds no pixels.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Samples of one plane, row-major.
    pub fn channel(&self, channel: Channel) -> &[f32] {
        &self.planes[channel.index()]
    }

    pub fn channel_mut(&mut self, channel: Channel) -> &mut [f32] {
        &mut self.planes[channel.index()]
    }

    /// RGB triple at `(row, col)`.
    pub fn get(&self, row: usize, col: usize) -> [f32; 3] {
        let i = row * self.width + col;
        [self.planes[0][i], self.planes[1][i], self.planes[2][i]]
    }

    pub fn set(&mut self, row: usize, col: usize, rgb: [f32; 3]) {
        let i = row * self.width + col;
        for c in 0..3 {
            self.planes[c][i] = rgb[c];
        }
    }

    /// Run `f(row, [r, g, b])` for every row, each row's three plane slices
    /// borrowed mutably. Rows are distributed over the rayon pool when
    /// `multithread` is set; every worker writes only its own row.
    pub fn for_each_row_mut<F>(&mut self, multithread: bool, f: F)
    where
        F: Fn(usize, [&mut [f32]; 3]) + Send + Sync,
    {
        if self.is_empty() {
            return;
        }
        let width = self.width;
        let [red, green, blue] = &mut self.planes;
        if multithread {
            red.par_chunks_mut(width)
                .zip(green.par_chunks_mut(width))
                .zip(blue.par_chunks_mut(width))
                .enumerate()
                .for_each(|(y, ((r, g), b))| f(y, [r, g, b]));
        } else {
            red.chunks_mut(width)
                .zip(green.chunks_mut(width))
                .zip(blue.chunks_mut(width))
                .enumerate()
                .for_each(|(y, ((r, g), b))| f(y, [r, g, b]));
        }
    }
}

/// Single-plane value map written during a transform for UI inspection.
///
/// The pipeline writes into it but never owns it; its lifetime belongs to
/// the editing session.
#[derive(Debug, Clone, PartialEq)]
pub struct PipetteBuffer {
    width: usize,
    height: usize,
    data: Vec<f32>,
}

impl PipetteBuffer {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![0.0; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Value at `(row, col)`.
    pub fn get(&self, row: usize, col: usize) -> f32 {
        self.data[row * self.width + col]
    }

    pub fn set(&mut self, row: usize, col: usize, value: f32) {
        self.data[row * self.width + col] = value;
    }

    pub fn fill(&mut self, value: f32) {
        self.data.fill(value);
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Whether this buffer can shadow `image` coordinate for coordinate.
    pub fn matches(&self, image: &PlanarImage) -> bool {
        self.width == image.width() && self.height == image.height()
    }

    pub(crate) fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }
}
