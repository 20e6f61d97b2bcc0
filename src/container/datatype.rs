//! Datatypes.

use std::path::PathBuf;
use std::sync::Arc;

use super::location::Location;
use crate::engine::{Engine, ObjectId};
use crate::handle::{Handle, ObjectKind};
use crate::util::{Error, H5Type, NativeType, Result, TypeClass};

/// Element type of a dataset, transient or committed to a file.
#[derive(Debug, Default, PartialEq)]
pub struct Datatype {
    handle: Handle,
}

impl Datatype {
    /// Transient copy of the native type matching `T`.
    pub fn native<T: H5Type>(engine: &Arc<dyn Engine>) -> Result<Self> {
        Self::from_native(engine, T::NATIVE)
    }

    pub fn from_native(engine: &Arc<dyn Engine>, native: NativeType) -> Result<Self> {
        let handle = Handle::acquire(engine, ObjectKind::Datatype, |e| e.native_type(native))?;
        Ok(Self { handle })
    }

    /// Open the type committed at `name`.
    pub fn open<L: Location + ?Sized>(loc: &L, name: &str) -> Result<Self> {
        let (engine, loc_id) = loc.location_handle().live("open datatype")?;
        let handle = Handle::acquire(engine, ObjectKind::Datatype, |e| e.open_type(loc_id, name, None))?;
        Ok(Self { handle })
    }

    /// Wrap a handle, which must refer to a datatype.
    pub fn from_handle(handle: Handle) -> Result<Self> {
        handle.ensure_kind(ObjectKind::Datatype)?;
        Ok(Self { handle })
    }

    /// Transient copy of this type.
    pub fn copy(&self) -> Result<Self> {
        let (engine, id) = self.handle.live("copy datatype")?;
        let handle = Handle::acquire(engine, ObjectKind::Datatype, |e| e.copy_type(id))?;
        Ok(Self { handle })
    }

    /// Link this type into `loc` as `name`. A committed type cannot be
    /// committed again.
    pub fn commit<L: Location + ?Sized>(&self, loc: &L, name: &str) -> Result<()> {
        let (engine, id) = self.handle.live("commit datatype")?;
        let (_, loc_id) = loc.location_handle().live("commit location")?;
        engine
            .commit_type(loc_id, name, id, None, None, None)
            .map_err(|e| Error::acquisition(format!("committed datatype {:?}", name), e))
    }

    pub fn is_committed(&self) -> Result<bool> {
        let (engine, id) = self.handle.live("is_committed")?;
        engine.type_committed(id).map_err(|e| Error::query("type_committed", e))
    }

    pub fn native_type(&self) -> Result<NativeType> {
        let (engine, id) = self.handle.live("native_type")?;
        engine.type_native(id).map_err(|e| Error::query("type_native", e))
    }

    pub fn class(&self) -> Result<TypeClass> {
        Ok(self.native_type()?.class())
    }

    /// Size of one element in bytes.
    pub fn size(&self) -> Result<usize> {
        Ok(self.native_type()?.size())
    }

    /// Number of significant bits.
    pub fn precision(&self) -> Result<usize> {
        Ok(self.native_type()?.precision())
    }

    /// Bit offset of the significant bits within an element. Native types
    /// use every bit, so this is always 0.
    pub fn offset(&self) -> Result<usize> {
        self.native_type()?;
        Ok(0)
    }

    /// Whether this type is, or contains, an element of `class`.
    pub fn detect_class(&self, class: TypeClass) -> Result<bool> {
        Ok(self.class()? == class)
    }

    /// Path of the file a committed type lives in.
    pub fn file_name(&self) -> Result<PathBuf> {
        let (engine, id) = self.handle.live("file_name")?;
        engine.file_name(id).map_err(|e| Error::query("file_name", e))
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
