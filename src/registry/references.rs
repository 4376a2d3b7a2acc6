//! Per-run reference registry.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::path::FieldPath;
use crate::core::{derive_id, ExportableObject, ObjectId, ObjectKind, SceneGraph, SourceKey, Value};

/// A cross-reference the runtime relinks after loading.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceRecord {
    pub path: FieldPath,
    pub target: ObjectId,
    pub kind: ObjectKind,
}

/// Replacement for one field of one owner.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldOverride {
    pub path: FieldPath,
    pub value: Value,
}

/// Identifier assignment and reference bookkeeping for one export run.
#[derive(Debug, Default)]
pub struct ReferenceRegistry {
    ids: HashMap<SourceKey, Option<ObjectId>>,
    owners: HashMap<ObjectId, SourceKey>,
    references: Vec<ReferenceRecord>,
    overrides: HashMap<(SourceKey, String), FieldOverride>,
}

impl ReferenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Identifier of `obj`; `None` for objects without identity.
    ///
    /// Idempotent within a run. If two source objects derive the same
    /// identifier (duplicated guids), the later one gets a key-qualified
    /// suffix so identifiers stay unique.
    pub fn get_id(&mut self, graph: &SceneGraph, obj: &ExportableObject) -> Option<ObjectId> {
        if let Some(id) = self.ids.get(&obj.key) {
            return id.clone();
        }

        let id = derive_id(graph, obj).map(|id| match self.owners.get(&id) {
            Some(other) if other != &obj.key => {
                let unique = ObjectId::new(format!(
                    "{id}-{}",
                    murmur3::hash128(obj.key.as_str().as_bytes()).short_hex(8)
                ));
                tracing::warn!(
                    "identifier {id} of {} collides with {other}; using {unique}",
                    obj.key
                );
                unique
            }
            _ => id,
        });

        if let Some(id) = &id {
            self.owners.insert(id.clone(), obj.key.clone());
        }
        self.ids.insert(obj.key.clone(), id.clone());
        id
    }

    /// Identifier for the object behind `key`; unknown keys have none.
    pub fn id_for_key(&mut self, graph: &SceneGraph, key: &SourceKey) -> Option<ObjectId> {
        let obj = graph.get(key)?;
        self.get_id(graph, obj)
    }

    /// Record that `path` cites `target`.
    pub fn register_reference(&mut self, path: FieldPath, target: ObjectId, kind: ObjectKind) {
        self.references.push(ReferenceRecord { path, target, kind });
    }

    /// Serialize `value` instead of `owner.field_name`.
    ///
    /// The source object is left untouched; the override lives until
    /// [`Self::clear_cache`].
    pub fn register_field(
        &mut self,
        path: FieldPath,
        owner: &ExportableObject,
        field_name: &str,
        value: Value,
    ) {
        self.overrides.insert(
            (owner.key.clone(), field_name.to_string()),
            FieldOverride { path, value },
        );
    }

    pub fn field_override(&self, owner: &ExportableObject, field_name: &str) -> Option<&FieldOverride> {
        self.overrides.get(&(owner.key.clone(), field_name.to_string()))
    }

    pub fn references(&self) -> &[ReferenceRecord] {
        &self.references
    }

    /// References recorded since `mark` (see [`Self::mark`]).
    pub fn references_since(&self, mark: usize) -> &[ReferenceRecord] {
        &self.references[mark.min(self.references.len())..]
    }

    /// Current end of the reference list.
    pub fn mark(&self) -> usize {
        self.references.len()
    }

    /// Forget identifiers, references and overrides.
    pub fn clear_cache(&mut self) {
        self.ids.clear();
        self.owners.clear();
        self.references.clear();
        self.overrides.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SceneSource;

    fn graph() -> SceneGraph {
        let source = SceneSource::new("S")
            .with(ExportableObject::node("1", "Root"))
            .with(ExportableObject::component("2", "1", "Rotator"))
            .with(ExportableObject::asset("3", "Material", "A").with_guid("dup"))
            .with(ExportableObject::asset("4", "Material", "B").with_guid("dup"))
            .with(ExportableObject::asset("5", "Material", "C").destroyed());
        SceneGraph::from_source(source).unwrap()
    }

    #[test]
    fn test_get_id_idempotent() {
        let g = graph();
        let mut reg = ReferenceRegistry::new();
        let a = reg.get_id(&g, g.by_key("2").unwrap());
        let b = reg.get_id(&g, g.by_key("2").unwrap());
        assert!(a.is_some());
        assert_eq!(a, b);
    }

    #[test]
    fn test_duplicate_guid_disambiguated() {
        let g = graph();
        let mut reg = ReferenceRegistry::new();
        let a = reg.get_id(&g, g.by_key("3").unwrap()).unwrap();
        let b = reg.get_id(&g, g.by_key("4").unwrap()).unwrap();
        assert_eq!(a.as_str(), "dup");
        assert_ne!(a, b);
        let suffix = murmur3::hash128(b"4").short_hex(8);
        assert_eq!(b.as_str(), format!("dup-{suffix}"));
        // Still idempotent after disambiguation.
        assert_eq!(reg.get_id(&g, g.by_key("4").unwrap()), Some(b));
    }

    #[test]
    fn test_destroyed_and_unknown_have_no_id() {
        let g = graph();
        let mut reg = ReferenceRegistry::new();
        assert_eq!(reg.get_id(&g, g.by_key("5").unwrap()), None);
        assert_eq!(reg.id_for_key(&g, &SourceKey::new("404")), None);
    }

    #[test]
    fn test_register_field_and_clear() {
        let g = graph();
        let owner = g.by_key("2").unwrap();
        let mut reg = ReferenceRegistry::new();
        let id = reg.get_id(&g, owner).unwrap();
        let path = FieldPath::new(id.clone()).field("sources");
        reg.register_field(path.clone(), owner, "sources", Value::Int(7));
        reg.register_reference(path.clone(), id, ObjectKind::Node);

        assert_eq!(reg.field_override(owner, "sources").map(|o| &o.value), Some(&Value::Int(7)));
        assert!(reg.field_override(owner, "other").is_none());
        assert_eq!(owner.field("sources"), None);
        assert_eq!(reg.references().len(), 1);
        assert_eq!(reg.references_since(1).len(), 0);

        reg.clear_cache();
        assert!(reg.field_override(owner, "sources").is_none());
        assert!(reg.references().is_empty());
    }
}
