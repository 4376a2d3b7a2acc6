//! Source object model.
//!
//! - [`Value`] / [`SourceKey`] - field values and source-local handles
//! - [`ExportableObject`] / [`SceneSource`] - objects and the input document
//! - [`SceneGraph`] - arena with derived hierarchy indices
//! - [`derive_id`] - stable identifiers
//! - [`ExportCache`] - content-addressed cache across runs

mod cache;
mod graph;
mod identity;
mod object;
mod value;

pub use cache::{CacheEntry, ContentKey, ExportCache, CACHE_FILE_NAME};
pub use graph::SceneGraph;
pub use identity::derive_id;
pub use object::{ExportableObject, ObjectId, ObjectKind, SceneSource, Transform};
pub use value::{SourceKey, Value, REF_KEY};
