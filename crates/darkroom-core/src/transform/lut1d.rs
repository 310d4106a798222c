//! One-dimensional lookup tables over the 16-bit sample domain.
//!
//! A `Lut1D` is either the identity (no table at all) or a dense table of
//! output samples. Callers match on the variant instead of testing for an
//! empty container, so an identity curve never allocates and never indexes.

/// Number of entries in a full 16-bit table.
pub const LUT_SIZE: usize = 65536;

/// A sampled function of one variable.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Lut1D {
    /// No-op transform. `apply` returns its input unchanged.
    #[default]
    Identity,
    /// Dense table; entry `i` is the output for input `i`.
    Table(Vec<f32>),
}

impl Lut1D {
    /// Allocate a table of `size` entries and fill it with `f(index)`.
    ///
    /// A zero `size` yields the identity.
    pub fn build(size: usize, f: impl Fn(usize) -> f32) -> Self {
        if size == 0 {
            return Self::Identity;
        }
        Self::Table((0..size).map(f).collect())
    }

    /// Wrap an existing table. An empty vector is the identity.
    pub fn from_table(table: Vec<f32>) -> Self {
        if table.is_empty() {
            Self::Identity
        } else {
            Self::Table(table)
        }
    }

    pub fn is_identity(&self) -> bool {
        matches!(self, Self::Identity)
    }

    /// Number of entries (0 for the identity).
    pub fn len(&self) -> usize {
        match self {
            Self::Identity => 0,
            Self::Table(t) => t.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Backing table, if any.
    pub fn table(&self) -> Option<&[f32]> {
        match self {
            Self::Identity => None,
            Self::Table(t) => Some(t),
        }
    }

    /// Direct lookup of entry `index`, clamped to the last entry.
    ///
    /// The identity returns the index itself.
    #[inline]
    pub fn at(&self, index: usize) -> f32 {
        match self {
            Self::Identity => index as f32,
            Self::Table(t) => t[index.min(t.len() - 1)],
        }
    }

    /// Look up a sample value in table coordinates.
    ///
    /// The value is clamped to `[0, len - 1]` and interpolated linearly
    /// between the two neighbouring entries. NaN maps to entry 0.
    #[inline]
    pub fn apply(&self, value: f32) -> f32 {
        match self {
            Self::Identity => value,
            Self::Table(t) => sample(t, value),
        }
    }

    /// Four lookups at once. Produces exactly the same results as four
    /// [`apply`](Self::apply) calls; the fixed-width arrays let the compiler
    /// keep index and weight computation in vector registers.
    #[inline]
    pub fn apply4(&self, values: [f32; 4]) -> [f32; 4] {
        let Self::Table(t) = self else {
            return values;
        };
        let last = (t.len() - 1) as f32;

        let mut pos = [0.0_f32; 4];
        for k in 0..4 {
            let v = values[k];
            // `!(v > 0.0)` also catches NaN.
            pos[k] = if !(v > 0.0) { 0.0 } else { v.min(last) };
        }

        let mut idx = [0_usize; 4];
        let mut frac = [0.0_f32; 4];
        for k in 0..4 {
            idx[k] = pos[k] as usize;
            frac[k] = pos[k] - idx[k] as f32;
        }

        let mut out = [0.0_f32; 4];
        for k in 0..4 {
            out[k] = lerp_entries(t, idx[k], frac[k]);
        }
        out
    }
}

#[inline]
fn sample(t: &[f32], value: f32) -> f32 {
    let last = (t.len() - 1) as f32;
    let pos = if !(value > 0.0) { 0.0 } else { value.min(last) };
    let idx = pos as usize;
    lerp_entries(t, idx, pos - idx as f32)
}

#[inline]
fn lerp_entries(t: &[f32], idx: usize, frac: f32) -> f32 {
    if idx + 1 >= t.len() {
        return t[t.len() - 1];
    }
    let a = t[idx];
    let b = t[idx + 1];
    a + (b - a) * frac
}
