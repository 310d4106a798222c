//! Rotation, flipping and resampling of packed 8-bit RGB buffers.
//!
//! These work on thumbnails and previews, not on the float pipeline image.
//! Every function is pure: inputs are borrowed, outputs are new buffers or a
//! caller-allocated destination.

use rayon::prelude::*;

use crate::error::BufferError;

/// Tightly packed RGB, 3 bytes per pixel, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rgb8Buffer {
    width: usize,
    height: usize,
    data: Vec<u8>,
}

impl Rgb8Buffer {
    /// Black buffer.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![0; 3 * width * height],
        }
    }

    /// Wrap raw bytes, checking the length.
    pub fn from_raw(width: usize, height: usize, data: Vec<u8>) -> Result<Self, BufferError> {
        let expected = 3 * width * height;
        if data.len() != expected {
            return Err(BufferError::ByteLength {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }

    pub fn pixel(&self, x: usize, y: usize) -> [u8; 3] {
        let o = 3 * (y * self.width + x);
        [self.data[o], self.data[o + 1], self.data[o + 2]]
    }

    pub fn set_pixel(&mut self, x: usize, y: usize, rgb: [u8; 3]) {
        let o = 3 * (y * self.width + x);
        self.data[o..o + 3].copy_from_slice(&rgb);
    }
}

impl From<image::RgbImage> for Rgb8Buffer {
    fn from(img: image::RgbImage) -> Self {
        let (w, h) = img.dimensions();
        Self {
            width: w as usize,
            height: h as usize,
            data: img.into_raw(),
        }
    }
}

/// Clockwise rotation in quarter turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rotation {
    #[default]
    None,
    Cw90,
    Cw180,
    Cw270,
}

impl Rotation {
    /// Rotation for a multiple of 90 degrees (negative values turn
    /// counter-clockwise). Other angles have no rotation.
    pub fn from_degrees(degrees: i32) -> Option<Self> {
        if degrees % 90 != 0 {
            return None;
        }
        match degrees.rem_euclid(360) {
            0 => Some(Self::None),
            90 => Some(Self::Cw90),
            180 => Some(Self::Cw180),
            _ => Some(Self::Cw270),
        }
    }

    pub const fn degrees(self) -> i32 {
        match self {
            Self::None => 0,
            Self::Cw90 => 90,
            Self::Cw180 => 180,
            Self::Cw270 => 270,
        }
    }
}

/// Rotate clockwise. Width and height swap for quarter turns.
pub fn rotate(src: &Rgb8Buffer, rotation: Rotation) -> Rgb8Buffer {
    let (w, h) = (src.width, src.height);
    let (dw, dh) = match rotation {
        Rotation::Cw90 | Rotation::Cw270 => (h, w),
        Rotation::None | Rotation::Cw180 => (w, h),
    };
    let mut out = Rgb8Buffer::new(dw, dh);

    for y in 0..h {
        for x in 0..w {
            let (tx, ty) = match rotation {
                Rotation::None => (x, y),
                Rotation::Cw90 => (h - 1 - y, x),
                Rotation::Cw180 => (w - 1 - x, h - 1 - y),
                Rotation::Cw270 => (y, w - 1 - x),
            };
            out.set_pixel(tx, ty, src.pixel(x, y));
        }
    }
    out
}

/// Mirror left to right.
pub fn hflip(src: &Rgb8Buffer) -> Rgb8Buffer {
    if src.width == 0 {
        return src.clone();
    }
    let data = src
        .data
        .chunks_exact(3 * src.width)
        .flat_map(|row| row.chunks_exact(3).rev().flatten().copied())
        .collect();
    Rgb8Buffer {
        width: src.width,
        height: src.height,
        data,
    }
}

/// Mirror top to bottom.
pub fn vflip(src: &Rgb8Buffer) -> Rgb8Buffer {
    if src.width == 0 {
        return src.clone();
    }
    let data = src
        .data
        .chunks_exact(3 * src.width)
        .rev()
        .flatten()
        .copied()
        .collect();
    Rgb8Buffer {
        width: src.width,
        height: src.height,
        data,
    }
}

/// Resample `src` into `dst` by blending the four nearest source pixels.
///
/// Destination pixel `(i, j)` reads source position
/// `(i × sh / dh, j × sw / dw)`; neighbours past the last row or column are
/// clamped to it. Results are truncated to a byte.
pub fn bilinear_interp(src: &Rgb8Buffer, dst: &mut Rgb8Buffer) {
    let (sw, sh) = (src.width, src.height);
    let (dw, dh) = (dst.width, dst.height);
    if sw == 0 || sh == 0 || dw == 0 || dh == 0 {
        return;
    }

    dst.data
        .par_chunks_mut(3 * dw)
        .enumerate()
        .for_each(|(i, out_row)| {
            let sy = (i * sh / dh).min(sh - 1);
            let dy = (i * sh) as f64 / dh as f64 - sy as f64;
            let ny = (sy + 1).min(sh - 1);

            for (j, out) in out_row.chunks_exact_mut(3).enumerate() {
                let sx = (j * sw / dw).min(sw - 1);
                let dx = (j * sw) as f64 / dw as f64 - sx as f64;
                let nx = (sx + 1).min(sw - 1);

                let p11 = src.pixel(sx, sy);
                let p12 = src.pixel(nx, sy);
                let p21 = src.pixel(sx, ny);
                let p22 = src.pixel(nx, ny);

                for c in 0..3 {
                    let v = f64::from(p11[c]) * (1.0 - dx) * (1.0 - dy)
                        + f64::from(p12[c]) * dx * (1.0 - dy)
                        + f64::from(p21[c]) * (1.0 - dx) * dy
                        + f64::from(p22[c]) * dx * dy;
                    out[c] = v.clamp(0.0, 255.0) as u8;
                }
            }
        });
}

/// Resample `src` into `dst` by picking the source pixel at
/// `(i × sh / dh, j × sw / dw)`.
pub fn nearest_interp(src: &Rgb8Buffer, dst: &mut Rgb8Buffer) {
    let (sw, sh) = (src.width, src.height);
    let (dw, dh) = (dst.width, dst.height);
    if sw == 0 || sh == 0 || dw == 0 || dh == 0 {
        return;
    }

    dst.data
        .par_chunks_mut(3 * dw)
        .enumerate()
        .for_each(|(i, out_row)| {
            let sy = i * sh / dh;
            for (j, out) in out_row.chunks_exact_mut(3).enumerate() {
                out.copy_from_slice(&src.pixel(j * sw / dw, sy));
            }
        });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered(w: usize, h: usize) -> Rgb8Buffer {
        let data = (0..3 * w * h).map(|v| (v % 251) as u8).collect();
        Rgb8Buffer::from_raw(w, h, data).unwrap()
    }

    #[test]
    fn test_from_raw_checks_length() {
        assert_eq!(
            Rgb8Buffer::from_raw(2, 2, vec![0; 11]).unwrap_err(),
            BufferError::ByteLength {
                expected: 12,
                actual: 11
            }
        );
        let bytes: Vec<u8> = (0..12).collect();
        let buf = Rgb8Buffer::from_raw(2, 2, bytes.clone()).unwrap();
        assert_eq!(buf.pixel(1, 1), [9, 10, 11]);
        assert_eq!(buf.into_raw(), bytes);
    }

    #[test]
    fn test_rotation_from_degrees() {
        assert_eq!(Rotation::from_degrees(0), Some(Rotation::None));
        assert_eq!(Rotation::from_degrees(450), Some(Rotation::Cw90));
        assert_eq!(Rotation::from_degrees(-90), Some(Rotation::Cw270));
        assert_eq!(Rotation::from_degrees(45), None);
        for r in [Rotation::None, Rotation::Cw90, Rotation::Cw180, Rotation::Cw270] {
            assert_eq!(Rotation::from_degrees(r.degrees()), Some(r));
        }
    }

    #[test]
    fn test_rotate_90_moves_top_left_to_top_right() {
        let src = numbered(3, 2);
        let r = rotate(&src, Rotation::Cw90);
        assert_eq!((r.width(), r.height()), (2, 3));
        assert_eq!(r.pixel(1, 0), src.pixel(0, 0));
        assert_eq!(r.pixel(0, 0), src.pixel(0, 1));
        assert_eq!(r.pixel(0, 2), src.pixel(2, 1));
    }

    #[test]
    fn test_rotations_compose() {
        let src = numbered(5, 3);
        assert_eq!(rotate(&rotate(&src, Rotation::Cw90), Rotation::Cw270), src);
        assert_eq!(rotate(&rotate(&src, Rotation::Cw180), Rotation::Cw180), src);
        assert_eq!(
            rotate(&rotate(&src, Rotation::Cw90), Rotation::Cw90),
            rotate(&src, Rotation::Cw180)
        );
        assert_eq!(rotate(&src, Rotation::None), src);
    }

    #[test]
    fn test_flips_are_involutions() {
        let src = numbered(4, 3);
        assert_eq!(hflip(&hflip(&src)), src);
        assert_eq!(vflip(&vflip(&src)), src);
        assert_eq!(hflip(&src).pixel(0, 1), src.pixel(3, 1));
        assert_eq!(vflip(&src).pixel(2, 0), src.pixel(2, 2));
        assert_eq!(vflip(&hflip(&src)), rotate(&src, Rotation::Cw180));
    }

    #[test]
    fn test_bilinear_upscale_2x2_to_4x4() {
        let mut src = Rgb8Buffer::new(2, 2);
        src.set_pixel(0, 0, [0, 0, 0]);
        src.set_pixel(1, 0, [100, 40, 255]);
        src.set_pixel(0, 1, [200, 80, 0]);
        src.set_pixel(1, 1, [255, 120, 255]);

        let mut dst = Rgb8Buffer::new(4, 4);
        bilinear_interp(&src, &mut dst);

        // Corners
        assert_eq!(dst.pixel(0, 0), src.pixel(0, 0));
        assert_eq!(dst.pixel(3, 0), src.pixel(1, 0));
        assert_eq!(dst.pixel(0, 3), src.pixel(0, 1));
        assert_eq!(dst.pixel(3, 3), src.pixel(1, 1));

        // (1, 1) sits halfway between all four source pixels.
        // (0 + 100 + 200 + 255) / 4 = 138.75, truncated.
        assert_eq!(dst.pixel(1, 1), [138, 60, 127]);
        // (1, 0) sits halfway between the top two.
        assert_eq!(dst.pixel(1, 0), [50, 20, 127]);
    }

    #[test]
    fn test_nearest_picks_source_pixels() {
        let src = numbered(2, 2);
        let mut dst = Rgb8Buffer::new(4, 4);
        nearest_interp(&src, &mut dst);
        assert_eq!(dst.pixel(1, 1), src.pixel(0, 0));
        assert_eq!(dst.pixel(2, 1), src.pixel(1, 0));
        assert_eq!(dst.pixel(3, 3), src.pixel(1, 1));

        let mut small = Rgb8Buffer::new(1, 1);
        nearest_interp(&dst, &mut small);
        assert_eq!(small.pixel(0, 0), src.pixel(0, 0));
    }
}
