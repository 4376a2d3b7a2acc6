//! Per-run extension data model.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use super::blocks::{ExtensionBlock, ExtensionTarget};
use super::compiler::{ExportConfig, TechniqueCompiler};
use super::techniques::{TechniqueSet, TECHNIQUES_EXTENSION};
use crate::core::{ExportableObject, ObjectId};
use crate::util::Result;

/// Shared technique block plus generic blocks, accumulated over one run.
#[derive(Debug, Default)]
pub struct ExtensionModel {
    techniques: TechniqueSet,
    material_techniques: HashMap<ObjectId, usize>,
    exported: HashSet<ExportConfig>,
    blocks: BTreeMap<ExtensionTarget, Vec<ExtensionBlock>>,
}

impl ExtensionModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one technique payload for `material` into the shared block.
    ///
    /// Returns the material's technique index. Indices inside the payload are
    /// local to it and are rewritten to point into the shared arrays.
    pub fn add_shader(&mut self, material: &ObjectId, payload: TechniqueSet) -> Result<usize> {
        let index = self.techniques.absorb(payload)?;
        self.material_techniques.insert(material.clone(), index);
        Ok(index)
    }

    /// Technique index previously assigned to `material`.
    pub fn try_get_technique_index(&self, material: &ObjectId) -> Option<usize> {
        self.material_techniques.get(material).copied()
    }

    /// Whether `config` was already handled this run.
    pub fn is_exported(&self, config: &ExportConfig) -> bool {
        self.exported.contains(config)
    }

    /// Compile and merge the technique for `material`, once per
    /// configuration.
    ///
    /// `Ok(None)` when the backend produced no technique (logged, material
    /// skipped). Backend errors propagate.
    pub fn export_technique(
        &mut self,
        material: &ExportableObject,
        config: ExportConfig,
        compiler: &dyn TechniqueCompiler,
    ) -> Result<Option<usize>> {
        if self.exported.contains(&config) {
            return Ok(self.try_get_technique_index(&config.material));
        }

        let payload = compiler.compile(material, &config)?;
        if payload.techniques.is_empty() {
            tracing::warn!(
                "shader '{}' of material '{}' compiled to zero techniques; skipping",
                config.shader,
                material.name
            );
            self.exported.insert(config);
            return Ok(None);
        }

        let index = self.add_shader(&config.material, payload)?;
        tracing::debug!(
            "technique {index} for material '{}' (shader '{}', pass {})",
            material.name,
            config.shader,
            config.pass
        );
        self.exported.insert(config);
        Ok(Some(index))
    }

    /// The merged block.
    pub fn techniques(&self) -> &TechniqueSet {
        &self.techniques
    }

    /// Attach `block` to `target`, replacing a block of the same name.
    pub fn attach(&mut self, target: ExtensionTarget, block: ExtensionBlock) {
        let blocks = self.blocks.entry(target).or_default();
        match blocks.iter_mut().find(|b| b.name == block.name) {
            Some(existing) => *existing = block,
            None => blocks.push(block),
        }
    }

    pub fn blocks_for(&self, target: &ExtensionTarget) -> &[ExtensionBlock] {
        self.blocks.get(target).map(Vec::as_slice).unwrap_or(&[])
    }

    /// `extensions` object for `target`, if it has any blocks.
    pub fn extensions_json(&self, target: &ExtensionTarget) -> Option<serde_json::Value> {
        let blocks = self.blocks_for(target);
        if blocks.is_empty() {
            return None;
        }
        let map = blocks
            .iter()
            .map(|b| (b.name.clone(), b.to_json()))
            .collect::<serde_json::Map<_, _>>();
        Some(serde_json::Value::Object(map))
    }

    /// Names of the extensions that `targets` carry: their blocks, plus
    /// the techniques block for materials with a merged technique.
    pub fn used_extensions<'t>(&self, targets: impl IntoIterator<Item = &'t ExtensionTarget>) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        for target in targets {
            names.extend(self.blocks_for(target).iter().map(|b| b.name.clone()));
            if let ExtensionTarget::Material(id) = target {
                if self.try_get_technique_index(id).is_some() {
                    names.insert(TECHNIQUES_EXTENSION.to_string());
                }
            }
        }
        names
    }

    /// Drop all accumulated state.
    pub fn reset(&mut self) {
        self.techniques = TechniqueSet::default();
        self.material_techniques.clear();
        self.exported.clear();
        self.blocks.clear();
    }
}
