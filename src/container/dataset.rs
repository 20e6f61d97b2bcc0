//! Datasets and typed raw-data transfer.
//!
//! Reads and writes take a memory [`Selection`] describing where elements
//! sit in the caller's buffer and a file selection describing where they go
//! in the dataset. The stored datatype is looked up on every call, and a
//! buffer whose element size differs from it is refused before the engine
//! sees it.
//!
//! ```ignore
//! let ds = Dataset::open(&file, "temperature")?;
//! let space = ds.dataspace()?;
//! let slab = Selection::hyperslab(&space, &[0, 5], &[5, 5])?;
//! let mut buf = vec![0.0f32; 25];
//! let mem = Selection::from(Dataspace::simple(file.engine()?, &[5, 5])?);
//! ds.read_region(&mut buf, &mem, &slab)?;
//! ```

use std::sync::Arc;

use tracing::trace;

use super::datatype::Datatype;
use super::location::Location;
use super::plist::{DatasetAccessProperty, DatasetCreateProperty, DatasetTransferProperty, LinkCreateProperty};
use crate::dataspace::{Dataspace, Selection};
use crate::engine::{Engine, ObjectId};
use crate::handle::{Handle, ObjectKind};
use crate::util::{Error, H5Type, Result, Shape};

/// Property lists used when creating a dataset.
#[derive(Debug, Default)]
pub struct DatasetOptions {
    pub link: Option<LinkCreateProperty>,
    pub create: Option<DatasetCreateProperty>,
    pub access: Option<DatasetAccessProperty>,
}

impl DatasetOptions {
    /// Options with a deflate level set on a fresh creation list.
    pub fn deflate(engine: &Arc<dyn Engine>, level: u32) -> Result<Self> {
        let dcpl = DatasetCreateProperty::new(engine)?;
        dcpl.set_deflate(level)?;
        Ok(Self { create: Some(dcpl), ..Self::default() })
    }
}

/// A typed n-dimensional array stored in a file.
#[derive(Debug, Default, PartialEq)]
pub struct Dataset {
    handle: Handle,
}

impl Dataset {
    /// Create a dataset with the element type `dtype` and the extent of
    /// `space`; the selection of `space` does not matter.
    pub fn create<L: Location + ?Sized>(
        loc: &L,
        name: &str,
        dtype: &Datatype,
        space: &Dataspace,
    ) -> Result<Self> {
        Self::create_with(loc, name, dtype, space, DatasetOptions::default())
    }

    pub fn create_with<L: Location + ?Sized>(
        loc: &L,
        name: &str,
        dtype: &Datatype,
        space: &Dataspace,
        opts: DatasetOptions,
    ) -> Result<Self> {
        let (engine, loc_id) = loc.location_handle().live("create dataset")?;
        let (_, type_id) = dtype.handle().live("dataset datatype")?;
        let (_, space_id) = space.handle().live("dataset dataspace")?;
        let lcpl = opts.link.as_ref().and_then(LinkCreateProperty::id);
        let dcpl = opts.create.as_ref().and_then(DatasetCreateProperty::id);
        let dapl = opts.access.as_ref().and_then(DatasetAccessProperty::id);

        let handle = Handle::acquire(engine, ObjectKind::Dataset, |e| {
            e.create_dataset(loc_id, name, type_id, space_id, lcpl, dcpl, dapl)
        })?;
        Ok(Self { handle })
    }

    pub fn open<L: Location + ?Sized>(loc: &L, name: &str) -> Result<Self> {
        let (engine, loc_id) = loc.location_handle().live("open dataset")?;
        let handle = Handle::acquire(engine, ObjectKind::Dataset, |e| e.open_dataset(loc_id, name, None))?;
        Ok(Self { handle })
    }

    /// Wrap a handle, which must refer to a dataset.
    pub fn from_handle(handle: Handle) -> Result<Self> {
        handle.ensure_kind(ObjectKind::Dataset)?;
        Ok(Self { handle })
    }

    /// New dataspace with the dataset extent and every element selected.
    pub fn dataspace(&self) -> Result<Dataspace> {
        let (engine, id) = self.handle.live("dataspace")?;
        let handle = Handle::acquire(engine, ObjectKind::Dataspace, |e| e.dataset_space(id))?;
        Dataspace::from_handle(handle)
    }

    pub fn shape(&self) -> Result<Shape> {
        self.dataspace()?.shape()
    }

    /// Stored element type.
    pub fn datatype(&self) -> Result<Datatype> {
        let (engine, id) = self.handle.live("datatype")?;
        let handle = Handle::acquire(engine, ObjectKind::Datatype, |e| e.dataset_type(id))?;
        Datatype::from_handle(handle)
    }

    // ------------------------------------------------------------------
    // Write
    // ------------------------------------------------------------------

    /// Write the whole dataset from `buf`.
    pub fn write<T: H5Type>(&self, buf: &[T]) -> Result<()> {
        self.write_with(buf, &Selection::Full, None, None)
    }

    /// Write from the `mem` region of `buf` into the whole dataset.
    pub fn write_selection<T: H5Type>(&self, buf: &[T], mem: &Selection) -> Result<()> {
        self.write_with(buf, mem, None, None)
    }

    /// Write from the `mem` region of `buf` into the `file` region.
    pub fn write_region<T: H5Type>(&self, buf: &[T], mem: &Selection, file: &Selection) -> Result<()> {
        self.write_with(buf, mem, Some(file), None)
    }

    /// Write with every argument explicit. A `None` file selection is the
    /// dataset's current dataspace; a `None` transfer list is the default.
    pub fn write_with<T: H5Type>(
        &self,
        buf: &[T],
        mem: &Selection,
        file: Option<&Selection>,
        xfer: Option<&DatasetTransferProperty>,
    ) -> Result<()> {
        let (engine, id) = self.handle.live("write")?;
        let mem_type = self.checked_mem_type::<T>(engine)?;
        let (_, type_id) = mem_type.handle().live("memory datatype")?;

        let current;
        let file_space = match file {
            Some(sel) => sel.space_id(),
            None => {
                current = self.dataspace()?;
                current.id()
            }
        };

        trace!(dataset = %id, elements = buf.len(), "write");
        engine
            .write(
                id,
                type_id,
                mem.space_id(),
                file_space,
                xfer.and_then(DatasetTransferProperty::id),
                bytemuck::cast_slice(buf),
            )
            .map_err(|e| Error::transfer("write", e))
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// Read the whole dataset into `buf`.
    pub fn read<T: H5Type>(&self, buf: &mut [T]) -> Result<()> {
        self.read_with(buf, &Selection::Full, None, None)
    }

    /// Read the whole dataset into the `mem` region of `buf`.
    pub fn read_selection<T: H5Type>(&self, buf: &mut [T], mem: &Selection) -> Result<()> {
        self.read_with(buf, mem, None, None)
    }

    /// Read the `file` region into the `mem` region of `buf`.
    pub fn read_region<T: H5Type>(&self, buf: &mut [T], mem: &Selection, file: &Selection) -> Result<()> {
        self.read_with(buf, mem, Some(file), None)
    }

    pub fn read_with<T: H5Type>(
        &self,
        buf: &mut [T],
        mem: &Selection,
        file: Option<&Selection>,
        xfer: Option<&DatasetTransferProperty>,
    ) -> Result<()> {
        let (engine, id) = self.handle.live("read")?;
        let mem_type = self.checked_mem_type::<T>(engine)?;
        let (_, type_id) = mem_type.handle().live("memory datatype")?;

        let current;
        let file_space = match file {
            Some(sel) => sel.space_id(),
            None => {
                current = self.dataspace()?;
                current.id()
            }
        };

        trace!(dataset = %id, elements = buf.len(), "read");
        engine
            .read(
                id,
                type_id,
                mem.space_id(),
                file_space,
                xfer.and_then(DatasetTransferProperty::id),
                bytemuck::cast_slice_mut(buf),
            )
            .map_err(|e| Error::transfer("read", e))
    }

    /// Memory datatype for `T`, refused when its element size differs
    /// from the stored one.
    fn checked_mem_type<T: H5Type>(&self, engine: &Arc<dyn Engine>) -> Result<Datatype> {
        let stored = self.datatype()?.size()?;
        if stored != T::SIZE {
            return Err(Error::Transfer {
                reason: format!(
                    "buffer element is {} bytes, dataset element is {} bytes",
                    T::SIZE,
                    stored
                ),
                source: None,
            });
        }
        Datatype::native::<T>(engine)
    }

    #[inline]
    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    #[inline]
    pub fn id(&self) -> Option<ObjectId> {
        self.handle.id()
    }

    pub fn is_valid(&self) -> Result<bool> {
        self.handle.is_valid()
    }

    pub fn try_clone(&self) -> Result<Self> {
        Ok(Self { handle: self.handle.try_clone()? })
    }

    pub fn close(&mut self) -> Result<()> {
        self.handle.close()
    }
}
