//! Sample shapes.
//!
//! Dimensions describe how many elements a sample holds and how they
//! are laid out.

use smallvec::SmallVec;

/// Shape of one sample.
///
/// Rank 0 is scalar-like and always holds exactly one point. Rank 1 and
/// above describe an array whose point count is the product of the sizes,
/// so `[0]` is a legitimate empty array.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Dimensions {
    dims: SmallVec<[u64; 4]>,
}

impl Dimensions {
    /// Create scalar dimensions (rank 0).
    pub fn scalar() -> Self {
        Self { dims: SmallVec::new() }
    }

    /// Create 1D dimensions.
    pub fn d1(size: usize) -> Self {
        Self { dims: smallvec::smallvec![size as u64] }
    }

    /// Create 2D dimensions.
    pub fn d2(width: usize, height: usize) -> Self {
        Self { dims: smallvec::smallvec![width as u64, height as u64] }
    }

    /// Create from a slice of sizes.
    pub fn from_slice(sizes: &[u64]) -> Self {
        Self { dims: SmallVec::from_slice(sizes) }
    }

    /// Number of axes.
    #[inline]
    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// Size of one axis, `None` past the rank.
    pub fn size(&self, dim: usize) -> Option<u64> {
        self.dims.get(dim).copied()
    }

    /// All axis sizes.
    pub fn sizes(&self) -> &[u64] {
        &self.dims
    }

    /// Total number of points (product of all sizes, 1 for rank 0).
    ///
    /// Saturates at `usize::MAX`; use [`checked_num_points`](Self::checked_num_points)
    /// where the shape is untrusted.
    pub fn num_points(&self) -> usize {
        self.checked_num_points().unwrap_or(usize::MAX)
    }

    /// Total number of points, `None` when the product overflows `usize`.
    pub fn checked_num_points(&self) -> Option<usize> {
        self.dims
            .iter()
            .try_fold(1usize, |acc, &size| acc.checked_mul(usize::try_from(size).ok()?))
    }

    /// True for rank 0.
    #[inline]
    pub fn is_scalar(&self) -> bool {
        self.dims.is_empty()
    }

    /// Add a new axis at the end.
    pub fn push(&mut self, size: u64) {
        self.dims.push(size);
    }
}

impl From<usize> for Dimensions {
    fn from(size: usize) -> Self {
        Self::d1(size)
    }
}

impl From<(usize, usize)> for Dimensions {
    fn from((w, h): (usize, usize)) -> Self {
        Self::d2(w, h)
    }
}

impl From<Vec<u64>> for Dimensions {
    fn from(v: Vec<u64>) -> Self {
        Self { dims: SmallVec::from_vec(v) }
    }
}

impl std::fmt::Display for Dimensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[")?;
        for (i, s) in self.dims.iter().enumerate() {
            if i > 0 {
                write!(f, " x ")?;
            }
            write!(f, "{}", s)?;
        }
        write!(f, "]")
    }
}
