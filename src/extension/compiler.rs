//! Technique compilation seam and export configurations.

use serde::{Deserialize, Serialize};

use super::techniques::TechniqueSet;
use crate::core::{ExportableObject, ObjectId};
use crate::util::{Error, Result};

/// Variant of a shader pass the backend is asked to produce.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShaderMode {
    #[default]
    Default,
    Skinned,
    Instanced,
}

impl ShaderMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "default" => Some(Self::Default),
            "skinned" => Some(Self::Skinned),
            "instanced" => Some(Self::Instanced),
            _ => None,
        }
    }
}

/// De-duplication key: one configuration is compiled at most once per run.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ExportConfig {
    pub material: ObjectId,
    pub shader: String,
    pub sub_shader: u32,
    pub pass: u32,
    pub mode: ShaderMode,
}

impl ExportConfig {
    /// Configuration of a material whose shader is marked for export
    /// (`export_technique: true` and a `shader` name). Other materials have
    /// none.
    pub fn from_material(material: &ExportableObject, id: ObjectId) -> Option<Self> {
        if material.field("export_technique").and_then(|v| v.as_bool()) != Some(true) {
            return None;
        }
        let shader = material.field("shader")?.as_str()?.to_string();
        let index = |name: &str| {
            material
                .field(name)
                .and_then(|v| v.as_i64())
                .and_then(|i| u32::try_from(i).ok())
                .unwrap_or(0)
        };
        let mode = material
            .field("mode")
            .and_then(|v| v.as_str())
            .and_then(ShaderMode::parse)
            .unwrap_or_default();

        Some(Self {
            material: id,
            shader,
            sub_shader: index("sub_shader"),
            pass: index("pass"),
            mode,
        })
    }
}

/// Shader backend producing technique payloads.
///
/// An `Err` is a hard failure of the enclosing sub-asset. An empty payload is
/// the non-fatal "compiled to nothing" case; the material is then skipped.
pub trait TechniqueCompiler {
    fn compile(&self, material: &ExportableObject, config: &ExportConfig) -> Result<TechniqueSet>;
}

/// Material field holding a precompiled technique payload.
pub const TECHNIQUES_FIELD: &str = "techniques";

/// Compiler that reads a payload stored on the material's `techniques` field.
#[derive(Debug, Default, Clone, Copy)]
pub struct PrecompiledTechniques;

impl TechniqueCompiler for PrecompiledTechniques {
    fn compile(&self, material: &ExportableObject, _config: &ExportConfig) -> Result<TechniqueSet> {
        match material.field(TECHNIQUES_FIELD) {
            Some(payload) => serde_json::from_value(payload.to_json()).map_err(|e| Error::Compilation {
                asset: material.name.clone(),
                reason: e.to_string(),
            }),
            None => Ok(TechniqueSet::default()),
        }
    }
}
