//! Technique/program/shader block in the `KHR_techniques_webgl` layout.
//!
//! `techniques[i].program` indexes `programs`; `programs[i].vertexShader` and
//! `programs[i].fragmentShader` index `shaders`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::util::{Error, Result};

/// Extension name of the shared block.
pub const TECHNIQUES_EXTENSION: &str = "KHR_techniques_webgl";

pub const VERTEX_SHADER: u32 = 35633;
pub const FRAGMENT_SHADER: u32 = 35632;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Technique {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub program: usize,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub uniforms: BTreeMap<String, serde_json::Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Program {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "vertexShader")]
    pub vertex_shader: usize,
    #[serde(rename = "fragmentShader")]
    pub fragment_shader: usize,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Shader {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub shader_type: u32,
    pub uri: String,
}

/// Technique payload of one compiler invocation, or the merged shared block.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TechniqueSet {
    #[serde(default)]
    pub techniques: Vec<Technique>,
    #[serde(default)]
    pub programs: Vec<Program>,
    #[serde(default)]
    pub shaders: Vec<Shader>,
}

impl TechniqueSet {
    pub fn is_empty(&self) -> bool {
        self.techniques.is_empty() && self.programs.is_empty() && self.shaders.is_empty()
    }

    /// Check that every local index points inside this set.
    pub fn validate(&self) -> Result<()> {
        for (i, t) in self.techniques.iter().enumerate() {
            if t.program >= self.programs.len() {
                return Err(Error::InvalidExtension(format!(
                    "technique {i} uses program {} of {}",
                    t.program,
                    self.programs.len()
                )));
            }
        }
        for (i, p) in self.programs.iter().enumerate() {
            for shader in [p.vertex_shader, p.fragment_shader] {
                if shader >= self.shaders.len() {
                    return Err(Error::InvalidExtension(format!(
                        "program {i} uses shader {shader} of {}",
                        self.shaders.len()
                    )));
                }
            }
        }
        Ok(())
    }

    /// Append `incoming`, offsetting its local indices into this set.
    ///
    /// Returns the index of the first absorbed technique. `self` is left
    /// untouched if `incoming` fails validation.
    pub fn absorb(&mut self, incoming: TechniqueSet) -> Result<usize> {
        incoming.validate()?;

        let program_base = self.programs.len();
        let shader_base = self.shaders.len();
        let technique_base = self.techniques.len();

        self.shaders.extend(incoming.shaders);
        self.programs.extend(incoming.programs.into_iter().map(|mut p| {
            p.vertex_shader += shader_base;
            p.fragment_shader += shader_base;
            p
        }));
        self.techniques.extend(incoming.techniques.into_iter().map(|mut t| {
            t.program += program_base;
            t
        }));

        Ok(technique_base)
    }
}
