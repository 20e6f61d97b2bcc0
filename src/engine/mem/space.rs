//! Dataspace state and selection enumeration.

use smallvec::SmallVec;

use crate::engine::{EngineError, EngineResult};
use crate::util::Shape;

type Dims = SmallVec<[usize; 4]>;

/// Current selection of a dataspace.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Sel {
    All,
    None,
    Hyperslab {
        start: Dims,
        stride: Dims,
        count: Dims,
        block: Dims,
    },
    /// Flattened point coordinates, `rank` values per point.
    Points(Vec<usize>),
}

/// Extent plus selection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpaceState {
    pub dims: Shape,
    pub sel: Sel,
}

impl SpaceState {
    pub fn simple(dims: &[usize]) -> Self {
        Self { dims: Shape::from_slice(dims), sel: Sel::All }
    }

    pub fn scalar() -> Self {
        Self { dims: Shape::scalar(), sel: Sel::All }
    }

    #[inline]
    pub fn rank(&self) -> usize {
        self.dims.rank()
    }

    /// Replace the selection with a regular hyperslab.
    pub fn select_hyperslab(
        &mut self,
        start: &[usize],
        stride: &[usize],
        count: &[usize],
        block: &[usize],
    ) -> EngineResult<()> {
        let rank = self.rank();
        if start.len() != rank || count.len() != rank {
            return Err(EngineError::invalid(format!(
                "hyperslab start/count must have {} entries",
                rank
            )));
        }
        let ones: Dims = SmallVec::from_elem(1, rank);
        let stride: Dims = match stride.len() {
            0 => ones.clone(),
            n if n == rank => SmallVec::from_slice(stride),
            n => return Err(EngineError::invalid(format!("stride has {} entries, rank is {}", n, rank))),
        };
        let block: Dims = match block.len() {
            0 => ones,
            n if n == rank => SmallVec::from_slice(block),
            n => return Err(EngineError::invalid(format!("block has {} entries, rank is {}", n, rank))),
        };

        for d in 0..rank {
            if stride[d] == 0 {
                return Err(EngineError::invalid(format!("zero stride in dimension {}", d)));
            }
            if block[d] == 0 {
                return Err(EngineError::invalid(format!("zero block in dimension {}", d)));
            }
            if count[d] > 1 && stride[d] < block[d] {
                return Err(EngineError::invalid(format!(
                    "blocks overlap in dimension {} (stride {} < block {})",
                    d, stride[d], block[d]
                )));
            }
            if count[d] == 0 {
                continue;
            }
            let last = (count[d] - 1)
                .checked_mul(stride[d])
                .and_then(|v| v.checked_add(start[d]))
                .and_then(|v| v.checked_add(block[d]));
            match last {
                Some(end) if end <= self.dims.sizes()[d] => {}
                _ => {
                    return Err(EngineError::invalid(format!(
                        "hyperslab exceeds dimension {} of size {}",
                        d,
                        self.dims.sizes()[d]
                    )))
                }
            }
        }

        self.sel = Sel::Hyperslab {
            start: SmallVec::from_slice(start),
            stride,
            count: SmallVec::from_slice(count),
            block,
        };
        Ok(())
    }

    /// Replace the selection with explicit points.
    pub fn select_points(&mut self, count: usize, coords: &[usize]) -> EngineResult<()> {
        let rank = self.rank();
        if count.checked_mul(rank) != Some(coords.len()) {
            return Err(EngineError::invalid(format!(
                "{} coordinates do not describe {} points of rank {}",
                coords.len(),
                count,
                rank
            )));
        }
        if rank == 0 && count > 0 {
            return Err(EngineError::invalid("cannot select points in a scalar dataspace"));
        }
        if rank > 0 {
            for point in coords.chunks(rank) {
                if self.dims.linear_index(point).is_none() {
                    return Err(EngineError::invalid(format!(
                        "point {:?} is outside extent {}",
                        point, self.dims
                    )));
                }
            }
        }
        self.sel = if count == 0 { Sel::None } else { Sel::Points(coords.to_vec()) };
        Ok(())
    }

    /// Number of selected elements.
    pub fn selected_count(&self) -> usize {
        match &self.sel {
            Sel::All => self.dims.num_points(),
            Sel::None => 0,
            Sel::Hyperslab { count, block, .. } => {
                count.iter().zip(block.iter()).map(|(c, b)| c * b).product()
            }
            Sel::Points(coords) => coords.len() / self.rank().max(1),
        }
    }

    /// Bounding box of the selection; `end` is inclusive.
    pub fn bounds(&self, start: &mut [usize], end: &mut [usize]) -> EngineResult<()> {
        let rank = self.rank();
        if start.len() != rank || end.len() != rank {
            return Err(EngineError::invalid(format!("bounds buffers must have {} entries", rank)));
        }
        if self.selected_count() == 0 {
            return Err(EngineError::invalid("selection is empty"));
        }
        match &self.sel {
            Sel::All => {
                for d in 0..rank {
                    start[d] = 0;
                    end[d] = self.dims.sizes()[d] - 1;
                }
            }
            Sel::Hyperslab { start: s, stride, count, block } => {
                for d in 0..rank {
                    start[d] = s[d];
                    end[d] = s[d] + (count[d] - 1) * stride[d] + block[d] - 1;
                }
            }
            Sel::Points(coords) => {
                start.fill(usize::MAX);
                end.fill(0);
                for point in coords.chunks(rank) {
                    for d in 0..rank {
                        start[d] = start[d].min(point[d]);
                        end[d] = end[d].max(point[d]);
                    }
                }
            }
            Sel::None => {}
        }
        Ok(())
    }

    /// Row-major linear offsets of the selected elements, in selection order.
    pub fn offsets(&self) -> Vec<usize> {
        match &self.sel {
            Sel::All => (0..self.dims.num_points()).collect(),
            Sel::None => Vec::new(),
            Sel::Points(coords) => {
                let rank = self.rank();
                coords
                    .chunks(rank)
                    .filter_map(|p| self.dims.linear_index(p))
                    .collect()
            }
            Sel::Hyperslab { start, stride, count, block } => {
                let axes: Vec<Vec<usize>> = (0..self.rank())
                    .map(|d| {
                        (0..count[d])
                            .flat_map(|c| (0..block[d]).map(move |b| (c, b)))
                            .map(|(c, b)| start[d] + c * stride[d] + b)
                            .collect()
                    })
                    .collect();
                cartesian(&axes, self.dims.strides().as_slice())
            }
        }
    }
}

/// Row-major product of per-axis indices, flattened with `strides`.
fn cartesian(axes: &[Vec<usize>], strides: &[usize]) -> Vec<usize> {
    let total: usize = axes.iter().map(Vec::len).product();
    let mut out = Vec::with_capacity(total);
    if total == 0 {
        return out;
    }
    let mut pos = vec![0usize; axes.len()];
    loop {
        out.push(
            pos.iter()
                .enumerate()
                .map(|(d, &i)| axes[d][i] * strides[d])
                .sum(),
        );
        // Odometer increment, last axis fastest.
        let mut d = axes.len();
        loop {
            if d == 0 {
                return out;
            }
            d -= 1;
            pos[d] += 1;
            if pos[d] < axes[d].len() {
                break;
            }
            pos[d] = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_selection() {
        let s = SpaceState::simple(&[2, 3]);
        assert_eq!(s.selected_count(), 6);
        assert_eq!(s.offsets(), vec![0, 1, 2, 3, 4, 5]);

        let scalar = SpaceState::scalar();
        assert_eq!(scalar.selected_count(), 1);
        assert_eq!(scalar.offsets(), vec![0]);
    }

    #[test]
    fn test_hyperslab_offsets() {
        let mut s = SpaceState::simple(&[4, 5]);
        s.select_hyperslab(&[1, 1], &[], &[2, 3], &[]).unwrap();
        assert_eq!(s.selected_count(), 6);
        assert_eq!(s.offsets(), vec![6, 7, 8, 11, 12, 13]);

        let (mut lo, mut hi) = ([0; 2], [0; 2]);
        s.bounds(&mut lo, &mut hi).unwrap();
        assert_eq!((lo, hi), ([1, 1], [2, 3]));
    }

    #[test]
    fn test_strided_hyperslab() {
        let mut s = SpaceState::simple(&[10]);
        s.select_hyperslab(&[1], &[3], &[3], &[2]).unwrap();
        assert_eq!(s.offsets(), vec![1, 2, 4, 5, 7, 8]);

        // last block would end at 1 + 3*3 + 2 = 12 > 10
        assert!(s.select_hyperslab(&[1], &[3], &[4], &[2]).is_err());
        assert!(s.select_hyperslab(&[0], &[0], &[2], &[]).is_err());
        assert!(s.select_hyperslab(&[0], &[1], &[2], &[2]).is_err());
    }

    #[test]
    fn test_points() {
        let mut s = SpaceState::simple(&[3, 3]);
        s.select_points(2, &[2, 2, 0, 1]).unwrap();
        assert_eq!(s.offsets(), vec![8, 1]);
        assert_eq!(s.selected_count(), 2);

        let (mut lo, mut hi) = ([0; 2], [0; 2]);
        s.bounds(&mut lo, &mut hi).unwrap();
        assert_eq!((lo, hi), ([0, 1], [2, 2]));

        assert!(s.select_points(1, &[3, 0]).is_err());
        assert!(s.select_points(2, &[0, 0]).is_err());

        s.select_points(0, &[]).unwrap();
        assert_eq!(s.sel, Sel::None);
        assert!(s.bounds(&mut lo, &mut hi).is_err());
    }
}
