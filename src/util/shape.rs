//! N-dimensional array extents.
//!
//! A [`Shape`] is an immutable snapshot of a dataspace's rank and
//! per-dimension sizes, independent of any handle.

use smallvec::SmallVec;

/// Extent of an n-dimensional array.
///
/// The number of stored sizes is the rank, so `sizes().len() == rank()`
/// holds for every value of this type.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Shape {
    /// Size of each dimension. Empty means scalar (rank 0).
    dims: SmallVec<[usize; 4]>,
}

impl Shape {
    /// Create a scalar shape (rank 0, one element).
    pub fn scalar() -> Self {
        Self { dims: SmallVec::new() }
    }

    /// Create from a slice of sizes.
    pub fn from_slice(sizes: &[usize]) -> Self {
        Self { dims: SmallVec::from_slice(sizes) }
    }

    /// Get the rank (number of dimensions).
    #[inline]
    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// Get the size of a specific dimension.
    ///
    /// Returns None if the dimension index is out of range.
    pub fn size(&self, dim: usize) -> Option<usize> {
        self.dims.get(dim).copied()
    }

    /// Get all dimension sizes as a slice.
    pub fn sizes(&self) -> &[usize] {
        &self.dims
    }

    /// Total number of elements (product of all dimensions, 1 for scalars).
    pub fn num_points(&self) -> usize {
        self.dims.iter().product()
    }

    /// Total number of elements, or `None` if the product overflows.
    pub fn checked_num_points(&self) -> Option<usize> {
        self.dims.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d))
    }

    /// Check if this represents a scalar (rank 0).
    #[inline]
    pub fn is_scalar(&self) -> bool {
        self.dims.is_empty()
    }

    /// Row-major strides in elements.
    pub fn strides(&self) -> SmallVec<[usize; 4]> {
        let mut strides: SmallVec<[usize; 4]> = smallvec::smallvec![1; self.dims.len()];
        for d in (0..self.dims.len().saturating_sub(1)).rev() {
            strides[d] = strides[d + 1] * self.dims[d + 1];
        }
        strides
    }

    /// Row-major linear offset of a coordinate, or None if out of bounds.
    pub fn linear_index(&self, coord: &[usize]) -> Option<usize> {
        if coord.len() != self.dims.len() {
            return None;
        }
        let mut offset = 0;
        for (&c, &d) in coord.iter().zip(self.dims.iter()) {
            if c >= d {
                return None;
            }
            offset = offset * d + c;
        }
        Some(offset)
    }
}

impl From<usize> for Shape {
    fn from(size: usize) -> Self {
        Self { dims: smallvec::smallvec![size] }
    }
}

impl From<&[usize]> for Shape {
    fn from(sizes: &[usize]) -> Self {
        Self::from_slice(sizes)
    }
}

impl From<Vec<usize>> for Shape {
    fn from(v: Vec<usize>) -> Self {
        Self { dims: SmallVec::from_vec(v) }
    }
}

impl<const N: usize> From<[usize; N]> for Shape {
    fn from(a: [usize; N]) -> Self {
        Self::from_slice(&a)
    }
}

impl std::fmt::Display for Shape {
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
