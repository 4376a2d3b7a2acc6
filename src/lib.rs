//! # sceneweave
//!
//! Exports an engine scene graph to glTF sub-assets. Cross-object references
//! become stable identifiers recorded for relinking, shared assets are written
//! once, engine-specific values pass through a resolver chain into portable
//! extension blocks, and loader and type register source is generated for the
//! runtime that consumes the output.
//!
//! ## Modules
//!
//! - [`util`] - Errors and output name derivation
//! - [`core`] - Source object model, identifiers, export cache
//! - [`registry`] - Reference registry and field paths
//! - [`resolve`] - Value resolver chain
//! - [`extension`] - Extension data model and technique compilation seam
//! - [`emit`] - Export pipeline, documents, loader generation
//! - [`types`] - Type register manifests
//! - [`runtime`] - Load-side relinking of exported documents
//! - [`sync`] - Compact binary sync records
//! - [`tasks`] - Background work and dependency checks
//! - [`config`] - Export settings
//!
//! ## Example
//!
//! ```ignore
//! use sceneweave::prelude::*;
//!
//! let graph = SceneGraph::load("level.json")?;
//! let mut exporter = Exporter::new(ExportSettings::load("sceneweave.toml")?);
//! let report = exporter.export_scene(&graph)?;
//! println!("{}", report.summary());
//! ```

pub mod util;
pub mod core;
pub mod registry;
pub mod resolve;
pub mod extension;
pub mod emit;
pub mod types;
pub mod runtime;
pub mod sync;
pub mod tasks;
pub mod config;

// Re-export commonly used types
pub use util::{Error, Result};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::ExportSettings;
    pub use crate::core::{ExportableObject, ObjectId, SceneGraph, SceneSource, Value};
    pub use crate::emit::{ExportReport, ExportResult, Exporter};
    pub use crate::resolve::{ResolverChain, ValueResolver};
    pub use crate::runtime::{load_document, TypeStore};
    pub use crate::util::{Error, Result};
}
