//! Runtime side of the exported contract.
//!
//! - [`TypeStore`] - constructor availability from register manifests
//! - [`load_document`] / [`load_glb`] - instantiate and relink a document

mod loader;
mod store;

pub use loader::{load_document, load_glb, LoadedObject, LoadedScene, LoadedValue, ObjectHandle};
pub use store::TypeStore;
