//! Extension data model.
//!
//! - [`TechniqueSet`] - technique/program/shader arrays with index remapping
//! - [`ExtensionModel`] - per-run shared block and generic blocks
//! - [`TechniqueCompiler`] - external shader backend seam

mod blocks;
mod compiler;
mod model;
mod techniques;

pub use blocks::{ExtensionBlock, ExtensionTarget, MESH_COMPRESSION_EXTENSION, SPRITE_SHEET_EXTENSION};
pub use compiler::{ExportConfig, PrecompiledTechniques, ShaderMode, TechniqueCompiler, TECHNIQUES_FIELD};
pub use model::ExtensionModel;
pub use techniques::{
    Program, Shader, Technique, TechniqueSet, FRAGMENT_SHADER, TECHNIQUES_EXTENSION, VERTEX_SHADER,
};
