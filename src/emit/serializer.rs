//! Reference-aware serialization of object fields.
//!
//! Every distinct asset is interned once into the document's shared-object
//! table; every other occurrence becomes `{"$ref": id}` and a reference
//! record. Interning marks an asset before descending into it, so cyclic
//! asset graphs terminate.

use std::collections::{BTreeMap, HashSet};

use serde_json::{json, Map, Value as Json};

use super::context::ExportContext;
use crate::config::ExportSettings;
use crate::core::{ExportableObject, ObjectId, ObjectKind, SceneGraph, SourceKey, Value, REF_KEY};
use crate::extension::{
    ExportConfig, ExtensionBlock, ExtensionTarget, TechniqueCompiler, MESH_COMPRESSION_EXTENSION,
    TECHNIQUES_FIELD,
};
use crate::registry::FieldPath;
use crate::resolve::ResolverChain;
use crate::types::TypeImport;
use crate::util::Error;

/// Shared objects collected while serializing one document.
#[derive(Debug, Default)]
pub struct SerializedObjects {
    pub objects: BTreeMap<ObjectId, Json>,
    /// Extension targets of interned assets, in interning order.
    pub targets: Vec<ExtensionTarget>,
    pub type_imports: Vec<TypeImport>,
}

/// Serializer for one document.
pub struct Serializer<'a> {
    graph: &'a SceneGraph,
    chain: &'a ResolverChain,
    settings: &'a ExportSettings,
    compiler: &'a dyn TechniqueCompiler,
    cx: &'a mut ExportContext,
    subject: String,
    out: SerializedObjects,
    in_progress: HashSet<ObjectId>,
    failure: Option<Error>,
}

impl<'a> Serializer<'a> {
    pub fn new(
        graph: &'a SceneGraph,
        chain: &'a ResolverChain,
        settings: &'a ExportSettings,
        compiler: &'a dyn TechniqueCompiler,
        cx: &'a mut ExportContext,
        subject: &str,
    ) -> Self {
        Self {
            graph,
            chain,
            settings,
            compiler,
            cx,
            subject: subject.to_string(),
            out: SerializedObjects::default(),
            in_progress: HashSet::new(),
            failure: None,
        }
    }

    pub fn graph(&self) -> &'a SceneGraph {
        self.graph
    }

    pub fn settings(&self) -> &'a ExportSettings {
        self.settings
    }

    pub fn cx(&mut self) -> &mut ExportContext {
        &mut *self.cx
    }

    /// Identifier of `obj` in this run.
    pub fn id_of(&mut self, obj: &ExportableObject) -> Option<ObjectId> {
        self.cx.registry.get_id(self.graph, obj)
    }

    pub fn id_for_key(&mut self, key: &SourceKey) -> Option<ObjectId> {
        self.cx.registry.id_for_key(self.graph, key)
    }

    /// Path of `instance.member`.
    pub fn member_path(&mut self, instance: &ExportableObject, member: &str) -> FieldPath {
        let owner = self.id_of(instance).unwrap_or_else(|| ObjectId::new(String::new()));
        FieldPath::new(owner).field(member)
    }

    /// Record a warning against the document being serialized.
    pub fn warn(&mut self, message: impl Into<String>) {
        self.cx.warn(Some(&self.subject), message);
    }

    /// Keep the first hard failure; the document is discarded at the end.
    pub fn fail(&mut self, err: Error) {
        if self.failure.is_none() {
            self.failure = Some(err);
        }
    }

    pub fn has_failed(&self) -> bool {
        self.failure.is_some()
    }

    /// Serialize one member: field override first, then the resolver chain,
    /// then default serialization.
    pub fn serialize_member(&mut self, instance: &ExportableObject, member: &str, value: &Value) -> Json {
        let path = self.member_path(instance, member);

        if let Some(over) = self.cx.registry.field_override(instance, member) {
            let value = over.value.clone();
            return self.serialize_value(&path, &value);
        }

        let chain = self.chain;
        let mut candidate = value.clone();
        for resolver in chain.iter() {
            if resolver.try_resolve(self, instance, member, &mut candidate) {
                tracing::trace!("{}.{member} resolved by {}", instance.name, resolver.name());
                return self.serialize_value(&path, &candidate);
            }
        }
        self.serialize_value(&path, value)
    }

    /// Default serialization; references become identifier lookups.
    pub fn serialize_value(&mut self, path: &FieldPath, value: &Value) -> Json {
        match value {
            Value::Array(items) => Json::Array(
                items
                    .iter()
                    .enumerate()
                    .map(|(i, v)| self.serialize_value(&path.index(i), v))
                    .collect(),
            ),
            Value::Map(map) => Json::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), self.serialize_value(&path.field(k), v)))
                    .collect(),
            ),
            Value::Ref(key) => self.reference(path, key),
            other => other.to_json(),
        }
    }

    /// Emit a reference to `key` found at `path`.
    ///
    /// Missing and destroyed targets degrade to null with a warning. Asset
    /// targets are interned into the shared-object table.
    pub fn reference(&mut self, path: &FieldPath, key: &SourceKey) -> Json {
        let graph = self.graph;
        let Some(target) = graph.get(key) else {
            self.warn(format!("{path}: reference to missing object {key}"));
            return Json::Null;
        };
        let Some(id) = self.id_of(target) else {
            self.warn(format!("{path}: reference to destroyed object '{}'", target.name));
            return Json::Null;
        };

        if target.kind == ObjectKind::Asset {
            self.intern_asset(target, &id);
        }
        self.cx.registry.register_reference(path.clone(), id.clone(), target.kind);
        json!({ REF_KEY: id })
    }

    /// Add `asset` to the shared-object table unless it is there already or
    /// being built.
    pub fn intern_asset(&mut self, asset: &ExportableObject, id: &ObjectId) {
        self.intern(asset, id, |ser| {
            let mut skip = None;
            let target = match asset.type_name.as_str() {
                "Material" => {
                    // A merged technique replaces the raw payload field.
                    if ser.export_technique(asset, id) {
                        skip = Some(TECHNIQUES_FIELD);
                    }
                    Some(ExtensionTarget::Material(id.clone()))
                }
                "Mesh" => {
                    if ser.settings.mesh_compression {
                        ser.cx.extensions.attach(
                            ExtensionTarget::Mesh(id.clone()),
                            ExtensionBlock::new(MESH_COMPRESSION_EXTENSION, 1, json!({})),
                        );
                    }
                    Some(ExtensionTarget::Mesh(id.clone()))
                }
                "Texture" | "Texture2D" => Some(ExtensionTarget::Texture(id.clone())),
                _ => None,
            };

            let mut fields = Map::new();
            for (member, value) in asset.fields.iter().filter(|(m, _)| Some(m.as_str()) != skip) {
                let json = ser.serialize_member(asset, member, value);
                fields.insert(member.clone(), json);
            }
            (fields, target)
        });
    }

    /// Add `asset` to the shared-object table with fields produced by
    /// `build` instead of its own. Does nothing when it is already there or
    /// being built.
    pub fn intern_model(
        &mut self,
        asset: &ExportableObject,
        id: &ObjectId,
        build: impl FnOnce(&mut Self) -> Map<String, Json>,
    ) {
        self.intern(asset, id, |ser| (build(ser), None));
    }

    fn intern(
        &mut self,
        asset: &ExportableObject,
        id: &ObjectId,
        build: impl FnOnce(&mut Self) -> (Map<String, Json>, Option<ExtensionTarget>),
    ) {
        if self.out.objects.contains_key(id) || !self.in_progress.insert(id.clone()) {
            return;
        }

        let (fields, target) = build(self);
        let mut entry = Map::new();
        entry.insert("type".into(), Json::String(asset.type_name.clone()));
        if !asset.name.is_empty() {
            entry.insert("name".into(), Json::String(asset.name.clone()));
        }
        entry.insert("fields".into(), Json::Object(fields));

        self.in_progress.remove(id);
        self.out.objects.insert(id.clone(), Json::Object(entry));
        if let Some(target) = target {
            self.out.targets.push(target);
        }
    }

    /// Merge the material's technique; `true` when one was merged.
    fn export_technique(&mut self, material: &ExportableObject, id: &ObjectId) -> bool {
        let Some(config) = ExportConfig::from_material(material, id.clone()) else {
            return false;
        };
        match self.cx.extensions.export_technique(material, config, self.compiler) {
            Ok(Some(_)) => true,
            Ok(None) => {
                self.warn(format!("material '{}' exported without technique", material.name));
                false
            }
            Err(e) => {
                self.fail(e);
                false
            }
        }
    }

    /// Members of `obj` in field order.
    pub fn serialize_fields(&mut self, obj: &ExportableObject) -> Map<String, Json> {
        let mut out = Map::new();
        for (member, value) in &obj.fields {
            let json = self.serialize_member(obj, member, value);
            out.insert(member.clone(), json);
        }
        out
    }

    /// Component entry of a node, recording its type for the register.
    pub fn serialize_component(&mut self, component: &ExportableObject) -> Option<Json> {
        let id = self.id_of(component)?;

        let settings = self.settings;
        let module = component
            .module
            .as_deref()
            .unwrap_or_else(|| settings.fallback_module());
        let import = TypeImport::new(&component.type_name, module, component.export_symbol());
        if !self.out.type_imports.contains(&import) {
            self.out.type_imports.push(import);
        }

        let fields = self.serialize_fields(component);
        Some(json!({
            "guid": id,
            "type": component.type_name,
            "fields": fields,
        }))
    }

    /// Finish, returning the collected objects or the first hard failure.
    pub fn finish(self) -> Result<SerializedObjects, Error> {
        match self.failure {
            Some(e) => Err(e),
            None => Ok(self.out),
        }
    }
}
