//! Files, groups, datasets, datatypes and property lists.
//!
//! Every type here wraps one [`Handle`](crate::handle::Handle) and forwards
//! to the engine it was acquired from:
//! - [`File`] - open container, also the root [`Location`]
//! - [`Group`] - named collection of links
//! - [`Dataset`] - typed n-dimensional array with selection-based transfer
//! - [`Datatype`] - element type, transient or committed
//! - [`PropertyList`] - class-tagged settings passed to create and open calls

mod dataset;
mod datatype;
mod file;
mod group;
mod location;
mod plist;

pub use dataset::*;
pub use datatype::*;
pub use file::*;
pub use group::*;
pub use location::*;
pub use plist::*;
