//! Utility types shared across the exporter.
//!
//! - [`Error`] / [`Result`] - Error handling
//! - [`sanitize_identifier`] / [`NameAllocator`] - Output name derivation

mod error;
mod naming;

pub use error::*;
pub use naming::*;
