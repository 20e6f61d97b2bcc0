//! Property lists, typed by class.
//!
//! `PropertyList<C>` is parameterised by a zero-sized class tag, so a
//! dataset-transfer list cannot be passed where a file-access list is
//! expected. Class-specific settings live in inherent impls on the
//! matching alias.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::engine::{Engine, ObjectId, PropertyClass};
use crate::handle::{Handle, ObjectKind};
use crate::util::{Error, Result};

/// Zero-sized marker naming a property list class.
pub trait PropertyClassTag: Send + Sync + 'static {
    const CLASS: PropertyClass;
}

macro_rules! property_classes {
    ($($(#[$meta:meta])* $tag:ident => $alias:ident = $class:ident;)*) => {
        $(
            $(#[$meta])*
            #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
            pub struct $tag;

            impl PropertyClassTag for $tag {
                const CLASS: PropertyClass = PropertyClass::$class;
            }

            $(#[$meta])*
            pub type $alias = PropertyList<$tag>;
        )*
    };
}

property_classes! {
    /// Attribute creation.
    AttributeCreate => AttributeCreateProperty = AttributeCreate;
    /// Dataset access.
    DatasetAccess => DatasetAccessProperty = DatasetAccess;
    /// Dataset creation (storage filters).
    DatasetCreate => DatasetCreateProperty = DatasetCreate;
    /// Raw data transfer.
    DatasetTransfer => DatasetTransferProperty = DatasetTransfer;
    DatatypeAccess => DatatypeAccessProperty = DatatypeAccess;
    DatatypeCreate => DatatypeCreateProperty = DatatypeCreate;
    /// File access (driver settings).
    FileAccess => FileAccessProperty = FileAccess;
    FileCreate => FileCreateProperty = FileCreate;
    FileMount => FileMountProperty = FileMount;
    GroupAccess => GroupAccessProperty = GroupAccess;
    GroupCreate => GroupCreateProperty = GroupCreate;
    LinkAccess => LinkAccessProperty = LinkAccess;
    /// Link creation.
    LinkCreate => LinkCreateProperty = LinkCreate;
    ObjectCopy => ObjectCopyProperty = ObjectCopy;
    ObjectCreate => ObjectCreateProperty = ObjectCreate;
    StringCreate => StringCreateProperty = StringCreate;
}

/// Property list of class `C`.
pub struct PropertyList<C: PropertyClassTag> {
    handle: Handle,
    _class: PhantomData<C>,
}

impl<C: PropertyClassTag> PropertyList<C> {
    /// New list with default settings.
    pub fn new(engine: &Arc<dyn Engine>) -> Result<Self> {
        let handle = Handle::acquire(engine, ObjectKind::PropertyList, |e| e.create_plist(C::CLASS))?;
        Ok(Self { handle, _class: PhantomData })
    }

    /// Wrap a handle, checking that it is a property list of class `C`.
    pub fn from_handle(handle: Handle) -> Result<Self> {
        handle.ensure_kind(ObjectKind::PropertyList)?;
        let (engine, id) = handle.live("plist_class")?;
        let actual = engine
            .plist_class(id)
            .map_err(|e| Error::query("plist_class", e))?;
        if actual != C::CLASS {
            return Err(Error::KindMismatch {
                expected: C::CLASS.to_string(),
                actual: actual.to_string(),
            });
        }
        Ok(Self { handle, _class: PhantomData })
    }

    #[inline]
    pub fn class(&self) -> PropertyClass {
        C::CLASS
    }

    /// Handle on the class object of this list.
    pub fn class_handle(&self) -> Result<Handle> {
        let (engine, _) = self.handle.live("class_handle")?;
        Handle::acquire(engine, ObjectKind::PropertyListClass, |e| e.open_plist_class(C::CLASS))
    }

    pub fn try_clone(&self) -> Result<Self> {
        Ok(Self { handle: self.handle.try_clone()?, _class: PhantomData })
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

    pub fn is_valid(&self) -> Result<bool> {
        self.handle.is_valid()
    }

    pub fn close(&mut self) -> Result<()> {
        self.handle.close()
    }
}

impl<C: PropertyClassTag> PartialEq for PropertyList<C> {
    fn eq(&self, other: &Self) -> bool {
        self.handle == other.handle
    }
}

impl<C: PropertyClassTag> fmt::Debug for PropertyList<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyList")
            .field("class", &C::CLASS)
            .field("id", &self.handle.id())
            .finish()
    }
}

impl FileAccessProperty {
    /// Attach the multi-process coordination descriptor.
    pub fn set_coordinated_access(&self) -> Result<()> {
        let (engine, id) = self.handle.live("set_coordinated_access")?;
        engine
            .set_coordinated_access(id, true)
            .map_err(|e| Error::query("set_coordinated_access", e))
    }

    pub fn coordinated_access(&self) -> Result<bool> {
        let (engine, id) = self.handle.live("coordinated_access")?;
        engine
            .coordinated_access(id)
            .map_err(|e| Error::query("coordinated_access", e))
    }
}

impl DatasetTransferProperty {
    /// Request collective transfers.
    pub fn set_collective(&self) -> Result<()> {
        let (engine, id) = self.handle.live("set_collective")?;
        engine
            .set_collective_transfer(id, true)
            .map_err(|e| Error::query("set_collective", e))
    }

    pub fn collective(&self) -> Result<bool> {
        let (engine, id) = self.handle.live("collective")?;
        engine
            .collective_transfer(id)
            .map_err(|e| Error::query("collective", e))
    }
}

impl LinkCreateProperty {
    /// Create missing groups along a link path.
    pub fn set_create_intermediate_groups(&self, on: bool) -> Result<()> {
        let (engine, id) = self.handle.live("set_create_intermediate_groups")?;
        engine
            .set_create_intermediate(id, on)
            .map_err(|e| Error::query("set_create_intermediate_groups", e))
    }

    pub fn create_intermediate_groups(&self) -> Result<bool> {
        let (engine, id) = self.handle.live("create_intermediate_groups")?;
        engine
            .create_intermediate(id)
            .map_err(|e| Error::query("create_intermediate_groups", e))
    }
}

impl DatasetCreateProperty {
    /// Deflate level 1-9 for new datasets; 0 stores raw.
    pub fn set_deflate(&self, level: u32) -> Result<()> {
        let (engine, id) = self.handle.live("set_deflate")?;
        engine
            .set_deflate(id, level)
            .map_err(|e| Error::query("set_deflate", e))
    }

    pub fn deflate(&self) -> Result<Option<u32>> {
        let (engine, id) = self.handle.live("deflate")?;
        engine.deflate(id).map_err(|e| Error::query("deflate", e))
    }
}
