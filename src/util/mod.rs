//! Utility types and functions.
//!
//! This module contains fundamental types used throughout the library:
//! - [`Shape`] - rank and extents of an n-dimensional array
//! - [`NativeType`] / [`H5Type`] - element types of dataset buffers
//! - [`Error`] / [`Result`] - Error handling
//! - [`init_logging`] - tracing subscriber setup

mod error;
mod logging;
mod native;
mod shape;

pub use error::*;
pub use logging::*;
pub use native::*;
pub use shape::*;
