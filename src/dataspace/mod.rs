//! Dataspaces and selections.
//!
//! A [`Dataspace`] describes an n-dimensional extent and a selected region
//! of it. A [`Selection`] names the region of a dataset (or of a memory
//! buffer) taking part in a read or write:
//!
//! - [`Selection::Full`] - the whole extent
//! - [`Selection::Scalar`] - a single element
//! - [`Selection::Hyperslab`] - a regular block pattern, see [`Hyperslab`]
//! - [`Selection::Elements`] - explicit points, see [`Elements`]
//! - [`Selection::Extent`] - a dataspace as-is

mod selection;
mod space;

pub use selection::*;
pub use space::*;
