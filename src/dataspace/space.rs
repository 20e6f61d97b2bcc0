//! Dataspace handles.

use std::sync::Arc;

use crate::engine::{Engine, ObjectId};
use crate::handle::{Handle, ObjectKind};
use crate::util::{Error, Result, Shape};

/// Array extent plus the current selection, held by the engine.
#[derive(Debug, Default, PartialEq)]
pub struct Dataspace {
    handle: Handle,
}

impl Dataspace {
    /// New simple dataspace with every element selected.
    pub fn simple(engine: &Arc<dyn Engine>, dims: &[usize]) -> Result<Self> {
        let handle = Handle::acquire(engine, ObjectKind::Dataspace, |e| e.create_simple_space(dims))?;
        Ok(Self { handle })
    }

    /// New simple dataspace with the extent of `shape`; scalar for rank 0.
    pub fn from_shape(engine: &Arc<dyn Engine>, shape: &Shape) -> Result<Self> {
        if shape.is_scalar() {
            Self::scalar(engine)
        } else {
            Self::simple(engine, shape.sizes())
        }
    }

    /// New rank-0 dataspace holding one element.
    pub fn scalar(engine: &Arc<dyn Engine>) -> Result<Self> {
        let handle = Handle::acquire(engine, ObjectKind::Dataspace, |e| e.create_scalar_space())?;
        Ok(Self { handle })
    }

    /// Wrap a handle, which must refer to a dataspace.
    pub fn from_handle(handle: Handle) -> Result<Self> {
        handle.ensure_kind(ObjectKind::Dataspace)?;
        Ok(Self { handle })
    }

    #[inline]
    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    #[inline]
    pub fn into_handle(self) -> Handle {
        self.handle
    }

    #[inline]
    pub fn id(&self) -> Option<ObjectId> {
        self.handle.id()
    }

    pub fn engine(&self) -> Result<&Arc<dyn Engine>> {
        Ok(self.handle.live("dataspace engine")?.0)
    }

    pub fn is_valid(&self) -> Result<bool> {
        self.handle.is_valid()
    }

    /// Number of dimensions.
    pub fn rank(&self) -> Result<usize> {
        let (engine, id) = self.handle.live("rank")?;
        engine.space_rank(id).map_err(Error::ShapeQuery)
    }

    /// Size of every dimension; the length is the rank.
    pub fn extents(&self) -> Result<Vec<usize>> {
        let (engine, id) = self.handle.live("extents")?;
        let rank = engine.space_rank(id).map_err(Error::ShapeQuery)?;
        let mut dims = vec![0; rank];
        engine.space_dims(id, &mut dims).map_err(Error::ShapeQuery)?;
        Ok(dims)
    }

    pub fn shape(&self) -> Result<Shape> {
        Ok(Shape::from(self.extents()?))
    }

    /// Independent copy, selection included.
    pub fn copy_space(&self) -> Result<Self> {
        let (engine, id) = self.handle.live("copy_space")?;
        let handle = Handle::acquire(engine, ObjectKind::Dataspace, |e| e.copy_space(id))?;
        Ok(Self { handle })
    }

    /// Reset the selection to every element.
    pub fn select_all(&self) -> Result<()> {
        let (engine, id) = self.handle.live("select_all")?;
        engine
            .select_all(id)
            .map_err(|e| Error::selection_rejected("select all", e))
    }

    /// Number of currently selected elements.
    pub fn selected_count(&self) -> Result<usize> {
        let (engine, id) = self.handle.live("selected_count")?;
        engine
            .selected_count(id)
            .map_err(|e| Error::query("selected_count", e))
    }

    pub fn try_clone(&self) -> Result<Self> {
        Ok(Self { handle: self.handle.try_clone()? })
    }

    pub fn close(&mut self) -> Result<()> {
        self.handle.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::mem::MemEngine;

    #[test]
    fn test_shape_queries() {
        let engine: Arc<dyn Engine> = Arc::new(MemEngine::new());
        let space = Dataspace::simple(&engine, &[3, 4, 5]).unwrap();
        assert_eq!(space.rank().unwrap(), 3);
        assert_eq!(space.extents().unwrap(), vec![3, 4, 5]);
        assert_eq!(space.shape().unwrap().num_points(), 60);
        assert_eq!(space.selected_count().unwrap(), 60);

        let scalar = Dataspace::scalar(&engine).unwrap();
        assert_eq!(scalar.rank().unwrap(), 0);
        assert!(scalar.extents().unwrap().is_empty());
        assert_eq!(scalar.shape().unwrap().num_points(), 1);
    }

    #[test]
    fn test_unset_dataspace() {
        let space = Dataspace::default();
        assert!(matches!(space.rank(), Err(Error::NotSet(_))));
        assert!(!space.is_valid().unwrap());
    }

    #[test]
    fn test_copy_is_independent() {
        let engine: Arc<dyn Engine> = Arc::new(MemEngine::new());
        let space = Dataspace::simple(&engine, &[4]).unwrap();
        let copy = space.copy_space().unwrap();
        assert!(space != copy);
        engine.select_none(copy.id().unwrap()).unwrap();
        assert_eq!(copy.selected_count().unwrap(), 0);
        assert_eq!(space.selected_count().unwrap(), 4);
        copy.select_all().unwrap();
        assert_eq!(copy.selected_count().unwrap(), 4);
    }
}
