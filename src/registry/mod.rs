//! Reference registry: stable identifiers, reference records for post-load
//! relinking, and per-field serialization overrides.

mod path;
mod references;

pub use path::{FieldPath, Segment};
pub use references::{FieldOverride, ReferenceRecord, ReferenceRegistry};
