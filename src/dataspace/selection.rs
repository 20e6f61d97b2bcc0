//! Selection algebra.
//!
//! Every selection constructor copies its parent dataspace and replaces the
//! copy's selection, so the parent is never modified. Hyperslab bounds are
//! checked against the parent extent before the engine is asked.

use std::sync::Arc;

use super::Dataspace;
use crate::engine::{Engine, ObjectId};
use crate::util::{Error, Result};

/// Rectangular (optionally strided) region of a dataspace.
#[derive(Debug, PartialEq)]
pub struct Hyperslab {
    space: Dataspace,
}

impl Hyperslab {
    /// Select `extent` contiguous elements per dimension starting at `start`.
    pub fn select(parent: &Dataspace, start: &[usize], extent: &[usize]) -> Result<Self> {
        Self::select_strided(parent, start, extent, &[], &[])
    }

    /// Select `extent` blocks per dimension, `stride` apart, each `block`
    /// elements wide. Empty `stride`/`block` mean all ones.
    pub fn select_strided(
        parent: &Dataspace,
        start: &[usize],
        extent: &[usize],
        stride: &[usize],
        block: &[usize],
    ) -> Result<Self> {
        let dims = parent.extents()?;
        let rank = dims.len();

        if start.len() != rank || extent.len() != rank {
            return Err(Error::selection(format!(
                "start and extent need {} entries, got {} and {}",
                rank,
                start.len(),
                extent.len()
            )));
        }
        if !stride.is_empty() && stride.len() != rank {
            return Err(Error::selection(format!("stride needs 0 or {} entries, got {}", rank, stride.len())));
        }
        if !block.is_empty() && block.len() != rank {
            return Err(Error::selection(format!("block needs 0 or {} entries, got {}", rank, block.len())));
        }
        for (d, &size) in dims.iter().enumerate() {
            let end = start[d].saturating_add(extent[d]);
            if end > size {
                return Err(Error::selection(format!(
                    "start + extent exceeds dimension {} ({} > {})",
                    d, end, size
                )));
            }
        }

        let space = parent.copy_space()?;
        let (engine, id) = space.handle().live("select_hyperslab")?;
        engine
            .select_hyperslab(id, start, stride, extent, block)
            .map_err(|e| Error::selection_rejected("hyperslab rejected by engine", e))?;
        Ok(Self { space })
    }

    /// Lower corner of the selection's bounding box.
    pub fn start(&self) -> Result<Vec<usize>> {
        Ok(self.bounds()?.0)
    }

    /// Exclusive upper corner of the selection's bounding box.
    pub fn end(&self) -> Result<Vec<usize>> {
        let (_, mut end) = self.bounds()?;
        end.iter_mut().for_each(|e| *e += 1);
        Ok(end)
    }

    fn bounds(&self) -> Result<(Vec<usize>, Vec<usize>)> {
        let (engine, id) = self.space.handle().live("selection_bounds")?;
        let rank = self.space.rank()?;
        let mut start = vec![0; rank];
        let mut end = vec![0; rank];
        engine
            .selection_bounds(id, &mut start, &mut end)
            .map_err(|e| Error::query("selection_bounds", e))?;
        Ok((start, end))
    }

    pub fn selected_count(&self) -> Result<usize> {
        self.space.selected_count()
    }

    #[inline]
    pub fn dataspace(&self) -> &Dataspace {
        &self.space
    }

    #[inline]
    pub fn into_dataspace(self) -> Dataspace {
        self.space
    }
}

/// Explicit list of element coordinates, or the empty selection.
#[derive(Debug, PartialEq)]
pub struct Elements {
    space: Dataspace,
    count: usize,
}

impl Elements {
    /// Select the points in `indices`, `rank` coordinates per point.
    /// An empty list selects nothing.
    pub fn select(parent: &Dataspace, indices: &[usize]) -> Result<Self> {
        let rank = parent.rank()?;
        let count = if indices.is_empty() {
            0
        } else if rank == 0 || indices.len() % rank != 0 {
            return Err(Error::selection(format!(
                "{} coordinates do not form points of rank {}",
                indices.len(),
                rank
            )));
        } else {
            indices.len() / rank
        };

        let space = parent.copy_space()?;
        let (engine, id) = space.handle().live("select_elements")?;
        let selected = if count == 0 {
            engine.select_none(id)
        } else {
            engine.select_elements(id, count, indices)
        };
        selected.map_err(|e| Error::selection_rejected("element selection rejected by engine", e))?;
        Ok(Self { space, count })
    }

    /// Number of selected points.
    #[inline]
    pub fn count(&self) -> usize {
        self.count
    }

    /// True for the explicit empty selection.
    #[inline]
    pub fn is_none(&self) -> bool {
        self.count == 0
    }

    #[inline]
    pub fn dataspace(&self) -> &Dataspace {
        &self.space
    }

    #[inline]
    pub fn into_dataspace(self) -> Dataspace {
        self.space
    }
}

/// Region of a dataset or buffer taking part in a transfer.
#[derive(Debug, Default)]
pub enum Selection {
    /// The entire extent; no dataspace is involved.
    #[default]
    Full,
    /// Single-element rank-0 dataspace.
    Scalar(Dataspace),
    Hyperslab(Hyperslab),
    Elements(Elements),
    /// A dataspace used with whatever selection it currently has.
    Extent(Dataspace),
}

impl Selection {
    #[inline]
    pub fn full() -> Self {
        Self::Full
    }

    pub fn scalar(engine: &Arc<dyn Engine>) -> Result<Self> {
        Ok(Self::Scalar(Dataspace::scalar(engine)?))
    }

    pub fn hyperslab(parent: &Dataspace, start: &[usize], extent: &[usize]) -> Result<Self> {
        Ok(Self::Hyperslab(Hyperslab::select(parent, start, extent)?))
    }

    pub fn hyperslab_strided(
        parent: &Dataspace,
        start: &[usize],
        extent: &[usize],
        stride: &[usize],
        block: &[usize],
    ) -> Result<Self> {
        Ok(Self::Hyperslab(Hyperslab::select_strided(parent, start, extent, stride, block)?))
    }

    pub fn elements(parent: &Dataspace, indices: &[usize]) -> Result<Self> {
        Ok(Self::Elements(Elements::select(parent, indices)?))
    }

    /// Dataspace behind the selection; `None` for [`Selection::Full`].
    pub fn dataspace(&self) -> Option<&Dataspace> {
        match self {
            Self::Full => None,
            Self::Scalar(s) | Self::Extent(s) => Some(s),
            Self::Hyperslab(h) => Some(h.dataspace()),
            Self::Elements(e) => Some(e.dataspace()),
        }
    }

    /// Identifier handed to the engine; `None` means "all".
    pub fn space_id(&self) -> Option<ObjectId> {
        self.dataspace().and_then(Dataspace::id)
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        matches!(self, Self::Full)
    }
}

impl From<Dataspace> for Selection {
    fn from(space: Dataspace) -> Self {
        Self::Extent(space)
    }
}

impl From<Hyperslab> for Selection {
    fn from(slab: Hyperslab) -> Self {
        Self::Hyperslab(slab)
    }
}

impl From<Elements> for Selection {
    fn from(elements: Elements) -> Self {
        Self::Elements(elements)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::mem::MemEngine;

    fn engine() -> Arc<dyn Engine> {
        Arc::new(MemEngine::new())
    }

    #[test]
    fn test_hyperslab_bounds() {
        let engine = engine();
        let space = Dataspace::simple(&engine, &[10, 10, 10]).unwrap();

        let slab = Hyperslab::select(&space, &[1, 1, 1], &[5, 5, 5]).unwrap();
        assert_eq!(slab.start().unwrap(), vec![1, 1, 1]);
        assert_eq!(slab.end().unwrap(), vec![6, 6, 6]);
        assert_eq!(slab.selected_count().unwrap(), 125);

        // parent keeps its "all" selection
        assert_eq!(space.selected_count().unwrap(), 1000);

        let err = Hyperslab::select(&space, &[0, 0, 0], &[11, 11, 11]).unwrap_err();
        assert!(matches!(err, Error::InvalidSelection { source: None, .. }));
        assert!(err.to_string().contains("11 > 10"));

        assert!(Hyperslab::select(&space, &[0, 0], &[1, 1]).is_err());
    }

    #[test]
    fn test_strided_overflow_left_to_engine() {
        let engine = engine();
        let space = Dataspace::simple(&engine, &[10]).unwrap();
        let err = Hyperslab::select_strided(&space, &[0], &[4], &[3], &[2]).unwrap_err();
        assert!(matches!(err, Error::InvalidSelection { source: Some(_), .. }));

        let slab = Hyperslab::select_strided(&space, &[0], &[3], &[3], &[2]).unwrap();
        assert_eq!(slab.selected_count().unwrap(), 6);
        assert_eq!(slab.end().unwrap(), vec![8]);
    }

    #[test]
    fn test_elements() {
        let engine = engine();
        let space = Dataspace::simple(&engine, &[4, 4]).unwrap();

        let pts = Elements::select(&space, &[0, 0, 3, 3, 1, 2]).unwrap();
        assert_eq!(pts.count(), 3);
        assert_eq!(pts.dataspace().selected_count().unwrap(), 3);

        let none = Elements::select(&space, &[]).unwrap();
        assert!(none.is_none());
        assert_eq!(none.dataspace().selected_count().unwrap(), 0);

        assert!(Elements::select(&space, &[1, 2, 3]).is_err());
        assert!(matches!(
            Elements::select(&space, &[4, 0]),
            Err(Error::InvalidSelection { source: Some(_), .. })
        ));
    }

    #[test]
    fn test_selection_space_ids() {
        let engine = engine();
        assert!(Selection::full().space_id().is_none());
        let scalar = Selection::scalar(&engine).unwrap();
        assert!(scalar.space_id().is_some());

        let space = Dataspace::simple(&engine, &[3]).unwrap();
        let id = space.id();
        let sel = Selection::from(space);
        assert_eq!(sel.space_id(), id);
    }
}
