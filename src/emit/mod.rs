//! Emitter pipeline.
//!
//! - [`Exporter`] - export runs, results and reports
//! - [`Serializer`] - reference-aware field serialization
//! - [`GltfDocument`] - per sub-asset document assembly
//! - [`loader_module`] - generated loader source
//! - [`write_glb`] / [`parse_glb`] - binary container
//! - [`OutputFile`] - atomic file output
//! - [`ExportGuard`] - one run per process

mod codegen;
mod context;
mod document;
mod glb;
mod guard;
mod output;
mod pipeline;
mod serializer;

pub use codegen::{loader_module, LoaderEntry};
pub use context::{Diagnostic, ExportContext, Severity};
pub use document::{
    generator, serialize_nodes, GltfDocument, NodeEntry, COMPONENTS_EXTENSION, GLTF_VERSION,
    OBJECTS_EXTENSION, REFERENCES_EXTENSION,
};
pub use glb::{parse_glb, write_glb, CHUNK_JSON, GLB_MAGIC, GLB_VERSION};
pub use guard::ExportGuard;
pub use output::{write_file, OutputFile};
pub use pipeline::{ExportReport, ExportResult, Exporter};
pub use serializer::{SerializedObjects, Serializer};
