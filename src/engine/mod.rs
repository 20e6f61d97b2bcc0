//! Storage engine capability interface.
//!
//! The handle layer never touches storage directly. Every create, open,
//! release, shape query, selection and transfer goes through the
//! [`Engine`] trait, which hands out opaque [`ObjectId`]s and keeps one
//! reference count per identifier.
//!
//! [`mem::MemEngine`] is the reference implementation: an in-memory engine
//! that persists each file as a small binary container.
//!
//! ## Conventions
//!
//! - An identifier returned by a create/open capability carries one
//!   reference owned by the caller.
//! - `Option<ObjectId>` property-list arguments use engine defaults on `None`.
//! - `Option<ObjectId>` dataspace arguments to [`Engine::read`] and
//!   [`Engine::write`] mean "all": a `None` file space is the dataset's full
//!   extent, a `None` memory space is the file space itself.

mod error;
pub mod mem;

pub use error::*;

use std::fmt;
use std::num::NonZeroU64;
use std::path::{Path, PathBuf};

use crate::handle::ObjectKind;
use crate::util::NativeType;

/// Opaque resource identifier issued by an engine. Never zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(NonZeroU64);

impl ObjectId {
    /// Wrap a raw identifier; zero is not an identifier.
    #[inline]
    pub const fn new(raw: u64) -> Option<Self> {
        match NonZeroU64::new(raw) {
            Some(v) => Some(Self(v)),
            None => None,
        }
    }

    /// Raw identifier value.
    #[inline]
    pub const fn get(self) -> u64 {
        self.0.get()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a new file is created.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CreateMode {
    /// Fail if the file already exists.
    Exclusive,
    /// Overwrite any existing file.
    Truncate,
}

/// Intent with which a file is open.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccessMode {
    ReadOnly,
    ReadWrite,
}

/// Property list classes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PropertyClass {
    AttributeCreate,
    DatasetAccess,
    DatasetCreate,
    DatasetTransfer,
    DatatypeAccess,
    DatatypeCreate,
    FileAccess,
    FileCreate,
    FileMount,
    GroupAccess,
    GroupCreate,
    LinkAccess,
    LinkCreate,
    ObjectCopy,
    ObjectCreate,
    StringCreate,
}

impl PropertyClass {
    /// Class name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::AttributeCreate => "attribute create",
            Self::DatasetAccess => "dataset access",
            Self::DatasetCreate => "dataset create",
            Self::DatasetTransfer => "data transfer",
            Self::DatatypeAccess => "datatype access",
            Self::DatatypeCreate => "datatype create",
            Self::FileAccess => "file access",
            Self::FileCreate => "file create",
            Self::FileMount => "file mount",
            Self::GroupAccess => "group access",
            Self::GroupCreate => "group create",
            Self::LinkAccess => "link access",
            Self::LinkCreate => "link create",
            Self::ObjectCopy => "object copy",
            Self::ObjectCreate => "object create",
            Self::StringCreate => "string create",
        }
    }
}

impl fmt::Display for PropertyClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Capability interface of a storage engine.
///
/// All methods are synchronous and either complete or fail immediately.
pub trait Engine: Send + Sync {
    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Kind of the resource behind `id`; unknown ids report [`ObjectKind::Bad`].
    fn kind_of(&self, id: ObjectId) -> EngineResult<ObjectKind>;

    /// Whether `id` refers to a live resource.
    fn is_valid(&self, id: ObjectId) -> EngineResult<bool>;

    /// Add a reference; returns the new count.
    fn inc_ref(&self, id: ObjectId) -> EngineResult<usize>;

    /// Drop a reference of any kind; returns the remaining count.
    fn dec_ref(&self, id: ObjectId) -> EngineResult<usize>;

    /// Current reference count.
    fn ref_count(&self, id: ObjectId) -> EngineResult<usize>;

    fn close_file(&self, id: ObjectId) -> EngineResult<()>;
    fn close_group(&self, id: ObjectId) -> EngineResult<()>;
    fn close_datatype(&self, id: ObjectId) -> EngineResult<()>;
    fn close_dataspace(&self, id: ObjectId) -> EngineResult<()>;
    fn close_dataset(&self, id: ObjectId) -> EngineResult<()>;
    fn close_plist(&self, id: ObjectId) -> EngineResult<()>;
    fn close_plist_class(&self, id: ObjectId) -> EngineResult<()>;

    // ------------------------------------------------------------------
    // Shape
    // ------------------------------------------------------------------

    /// New simple dataspace with the given extents and an "all" selection.
    fn create_simple_space(&self, dims: &[usize]) -> EngineResult<ObjectId>;

    /// New rank-0 dataspace holding one element.
    fn create_scalar_space(&self) -> EngineResult<ObjectId>;

    /// Independent copy of a dataspace, selection included.
    fn copy_space(&self, space: ObjectId) -> EngineResult<ObjectId>;

    fn space_rank(&self, space: ObjectId) -> EngineResult<usize>;

    /// Fill `out` with the extents; `out.len()` must equal the rank.
    fn space_dims(&self, space: ObjectId, out: &mut [usize]) -> EngineResult<()>;

    // ------------------------------------------------------------------
    // Selection (each call replaces the previous selection)
    // ------------------------------------------------------------------

    fn select_all(&self, space: ObjectId) -> EngineResult<()>;

    fn select_none(&self, space: ObjectId) -> EngineResult<()>;

    /// Regular hyperslab; empty `stride`/`block` mean all ones.
    fn select_hyperslab(
        &self,
        space: ObjectId,
        start: &[usize],
        stride: &[usize],
        count: &[usize],
        block: &[usize],
    ) -> EngineResult<()>;

    /// Explicit points; `coords` holds `count` tuples of rank coordinates.
    fn select_elements(&self, space: ObjectId, count: usize, coords: &[usize]) -> EngineResult<()>;

    /// Bounding box of the selection; `end` is inclusive.
    fn selection_bounds(
        &self,
        space: ObjectId,
        start: &mut [usize],
        end: &mut [usize],
    ) -> EngineResult<()>;

    fn selected_count(&self, space: ObjectId) -> EngineResult<usize>;

    // ------------------------------------------------------------------
    // Transfer
    // ------------------------------------------------------------------

    fn read(
        &self,
        dataset: ObjectId,
        mem_type: ObjectId,
        mem_space: Option<ObjectId>,
        file_space: Option<ObjectId>,
        xfer: Option<ObjectId>,
        buf: &mut [u8],
    ) -> EngineResult<()>;

    fn write(
        &self,
        dataset: ObjectId,
        mem_type: ObjectId,
        mem_space: Option<ObjectId>,
        file_space: Option<ObjectId>,
        xfer: Option<ObjectId>,
        buf: &[u8],
    ) -> EngineResult<()>;

    // ------------------------------------------------------------------
    // Files
    // ------------------------------------------------------------------

    fn create_file(
        &self,
        path: &Path,
        mode: CreateMode,
        fcpl: Option<ObjectId>,
        fapl: Option<ObjectId>,
    ) -> EngineResult<ObjectId>;

    fn open_file(&self, path: &Path, mode: AccessMode, fapl: Option<ObjectId>) -> EngineResult<ObjectId>;

    /// Write the file containing `obj` back to storage.
    fn flush(&self, obj: ObjectId) -> EngineResult<()>;

    fn file_intent(&self, file: ObjectId) -> EngineResult<AccessMode>;

    /// Whether the file was opened with coordinated multi-process access.
    fn file_coordinated(&self, file: ObjectId) -> EngineResult<bool>;

    /// Size of the persisted file in bytes.
    fn file_size(&self, file: ObjectId) -> EngineResult<u64>;

    /// Path of the file containing `obj`.
    fn file_name(&self, obj: ObjectId) -> EngineResult<PathBuf>;

    /// Identifiers of all open objects in the file, the file included.
    fn file_object_ids(&self, file: ObjectId) -> EngineResult<Vec<ObjectId>>;

    /// Whether `path` holds a container this engine can open.
    fn is_container(&self, path: &Path) -> EngineResult<bool>;

    // ------------------------------------------------------------------
    // Naming and linking
    // ------------------------------------------------------------------

    fn create_group(
        &self,
        loc: ObjectId,
        path: &str,
        lcpl: Option<ObjectId>,
        gcpl: Option<ObjectId>,
        gapl: Option<ObjectId>,
    ) -> EngineResult<ObjectId>;

    fn open_group(&self, loc: ObjectId, path: &str, gapl: Option<ObjectId>) -> EngineResult<ObjectId>;

    /// Whether the last component of `path` exists. Intermediate components
    /// must exist; below a non-group there is nothing.
    fn link_exists(&self, loc: ObjectId, path: &str) -> EngineResult<bool>;

    /// Link names of a location, in name order.
    fn link_names(&self, loc: ObjectId) -> EngineResult<Vec<String>>;

    /// Open whatever object `path` names.
    fn open_object(&self, loc: ObjectId, path: &str, lapl: Option<ObjectId>) -> EngineResult<ObjectId>;

    #[allow(clippy::too_many_arguments)]
    fn create_dataset(
        &self,
        loc: ObjectId,
        name: &str,
        dtype: ObjectId,
        space: ObjectId,
        lcpl: Option<ObjectId>,
        dcpl: Option<ObjectId>,
        dapl: Option<ObjectId>,
    ) -> EngineResult<ObjectId>;

    fn open_dataset(&self, loc: ObjectId, name: &str, dapl: Option<ObjectId>) -> EngineResult<ObjectId>;

    /// New dataspace describing the dataset extent.
    fn dataset_space(&self, dataset: ObjectId) -> EngineResult<ObjectId>;

    /// New datatype describing the stored element type.
    fn dataset_type(&self, dataset: ObjectId) -> EngineResult<ObjectId>;

    // ------------------------------------------------------------------
    // Datatypes
    // ------------------------------------------------------------------

    /// Transient copy of a native type.
    fn native_type(&self, native: NativeType) -> EngineResult<ObjectId>;

    /// Transient copy of any datatype.
    fn copy_type(&self, dtype: ObjectId) -> EngineResult<ObjectId>;

    fn commit_type(
        &self,
        loc: ObjectId,
        name: &str,
        dtype: ObjectId,
        lcpl: Option<ObjectId>,
        tcpl: Option<ObjectId>,
        tapl: Option<ObjectId>,
    ) -> EngineResult<()>;

    fn open_type(&self, loc: ObjectId, name: &str, tapl: Option<ObjectId>) -> EngineResult<ObjectId>;

    fn type_committed(&self, dtype: ObjectId) -> EngineResult<bool>;

    fn type_native(&self, dtype: ObjectId) -> EngineResult<NativeType>;

    // ------------------------------------------------------------------
    // Property lists
    // ------------------------------------------------------------------

    fn create_plist(&self, class: PropertyClass) -> EngineResult<ObjectId>;

    fn plist_class(&self, plist: ObjectId) -> EngineResult<PropertyClass>;

    /// Handle on the class object itself.
    fn open_plist_class(&self, class: PropertyClass) -> EngineResult<ObjectId>;

    fn set_coordinated_access(&self, fapl: ObjectId, on: bool) -> EngineResult<()>;
    fn coordinated_access(&self, fapl: ObjectId) -> EngineResult<bool>;

    fn set_collective_transfer(&self, dxpl: ObjectId, on: bool) -> EngineResult<()>;
    fn collective_transfer(&self, dxpl: ObjectId) -> EngineResult<bool>;

    fn set_create_intermediate(&self, lcpl: ObjectId, on: bool) -> EngineResult<()>;
    fn create_intermediate(&self, lcpl: ObjectId) -> EngineResult<bool>;

    /// Deflate level 1-9, or 0 to store raw.
    fn set_deflate(&self, dcpl: ObjectId, level: u32) -> EngineResult<()>;
    fn deflate(&self, dcpl: ObjectId) -> EngineResult<Option<u32>>;
}
