//! # h5veneer
//!
//! Reference-counted handles and a typed API over a hierarchical
//! array-container engine.
//!
//! Every engine resource (file, group, dataset, datatype, dataspace,
//! property list) is reached through an opaque identifier. A [`Handle`]
//! owns one reference to such an identifier and releases it on drop with
//! the release routine matching its kind. The typed wrappers in
//! [`dataspace`] and [`container`] are built on top of it.
//!
//! ## Modules
//!
//! - [`util`] - Shapes, native element types, errors, logging setup
//! - [`engine`] - The [`Engine`] trait and the in-memory reference engine
//! - [`handle`] - Reference-counted handles and object kinds
//! - [`dataspace`] - Dataspaces and selections (hyperslabs, element lists)
//! - [`container`] - Files, groups, datasets, datatypes, property lists
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use h5veneer::prelude::*;
//!
//! let engine: Arc<dyn Engine> = Arc::new(MemEngine::new());
//! let file = File::create(&engine, "out.h5v", CreationFlag::Truncate)?;
//! let space = Dataspace::simple(&engine, &[100, 50])?;
//! let dtype = Datatype::native::<f32>(&engine)?;
//! let ds = Dataset::create(&file, "field", &dtype, &space)?;
//! ds.write(&vec![1.0f32; 5000])?;
//! ```

pub mod util;
pub mod registry;
pub mod engine;
pub mod handle;
pub mod dataspace;
pub mod container;

// Re-export commonly used types
pub use util::{Error, Result, Shape, NativeType, H5Type, TypeClass, init_logging};
pub use engine::{Engine, EngineError, ObjectId};
pub use handle::{Handle, ObjectKind, Resource};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::util::{Bool, Error, H5Type, NativeType, Result, Shape, TypeClass};
    pub use crate::engine::{Engine, EngineError, ObjectId, mem::MemEngine};
    pub use crate::handle::{Handle, ObjectKind};
    pub use crate::dataspace::{Dataspace, Elements, Hyperslab, Selection};
    pub use crate::container::*;
}
