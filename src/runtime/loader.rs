//! Load-side re-hydration of exported documents.
//!
//! Every node, component and shared object becomes exactly one arena entry.
//! Reference records are then applied: the value at each recorded path is
//! replaced by the handle of its target, so objects cited from several places
//! resolve to the same entry.

use std::collections::{BTreeMap, HashMap};

use serde_json::Value as Json;

use super::store::TypeStore;
use crate::core::{ObjectId, ObjectKind};
use crate::emit::{parse_glb, COMPONENTS_EXTENSION, OBJECTS_EXTENSION, REFERENCES_EXTENSION};
use crate::registry::{ReferenceRecord, Segment};
use crate::util::{Error, Result};

/// Index of an object in a [`LoadedScene`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectHandle(pub u32);

impl ObjectHandle {
    fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum LoadedValue {
    Scalar(Json),
    Array(Vec<LoadedValue>),
    Map(BTreeMap<String, LoadedValue>),
    Handle(ObjectHandle),
}

impl LoadedValue {
    fn from_json(json: &Json) -> Self {
        match json {
            Json::Array(items) => Self::Array(items.iter().map(Self::from_json).collect()),
            Json::Object(map) => Self::Map(map.iter().map(|(k, v)| (k.clone(), Self::from_json(v))).collect()),
            other => Self::Scalar(other.clone()),
        }
    }

    pub fn handle(&self) -> Option<ObjectHandle> {
        match self {
            Self::Handle(h) => Some(*h),
            _ => None,
        }
    }

    pub fn get(&self, field: &str) -> Option<&LoadedValue> {
        match self {
            Self::Map(map) => map.get(field),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[LoadedValue]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Scalar(Json::Null))
    }

    fn at_mut(&mut self, seg: &Segment) -> Option<&mut LoadedValue> {
        match (self, seg) {
            (Self::Map(map), Segment::Field(name)) => map.get_mut(name),
            (Self::Map(map), Segment::Index(i)) => map.get_mut(&i.to_string()),
            (Self::Array(items), Segment::Index(i)) => items.get_mut(*i),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct LoadedObject {
    pub id: Option<ObjectId>,
    pub kind: ObjectKind,
    pub type_name: String,
    pub name: String,
    pub fields: BTreeMap<String, LoadedValue>,
    pub parent: Option<ObjectHandle>,
    pub children: Vec<ObjectHandle>,
    pub components: Vec<ObjectHandle>,
}

impl LoadedObject {
    fn new(id: Option<ObjectId>, kind: ObjectKind, type_name: &str, name: &str) -> Self {
        Self {
            id,
            kind,
            type_name: type_name.to_string(),
            name: name.to_string(),
            fields: BTreeMap::new(),
            parent: None,
            children: Vec::new(),
            components: Vec::new(),
        }
    }

    pub fn field(&self, name: &str) -> Option<&LoadedValue> {
        self.fields.get(name)
    }
}

/// Re-hydrated document.
#[derive(Debug, Default)]
pub struct LoadedScene {
    objects: Vec<LoadedObject>,
    by_id: HashMap<ObjectId, ObjectHandle>,
    relinked: usize,
}

impl LoadedScene {
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn objects(&self) -> &[LoadedObject] {
        &self.objects
    }

    pub fn get(&self, handle: ObjectHandle) -> Option<&LoadedObject> {
        self.objects.get(handle.index())
    }

    pub fn handle_of(&self, id: &str) -> Option<ObjectHandle> {
        self.by_id.get(&ObjectId::new(id)).copied()
    }

    pub fn by_id(&self, id: &str) -> Option<&LoadedObject> {
        self.handle_of(id).and_then(|h| self.get(h))
    }

    /// Node at index 0 of the document, the sub-asset root.
    pub fn root(&self) -> Option<&LoadedObject> {
        self.objects.first().filter(|o| o.kind == ObjectKind::Node)
    }

    /// Number of references relinked to a live target.
    pub fn relinked(&self) -> usize {
        self.relinked
    }

    fn push(&mut self, obj: LoadedObject) -> ObjectHandle {
        let handle = ObjectHandle(self.objects.len() as u32);
        if let Some(id) = &obj.id {
            self.by_id.insert(id.clone(), handle);
        }
        self.objects.push(obj);
        handle
    }

    fn relink(&mut self, record: &ReferenceRecord) {
        let Some(owner) = self.by_id.get(&record.path.owner).copied() else {
            tracing::warn!("reference owner {} not in document", record.path.owner);
            return;
        };
        let target = self.by_id.get(&record.target).copied();
        let Some((first, rest)) = record.path.segments().split_first() else {
            return;
        };
        let Segment::Field(member) = first else {
            return;
        };

        let slot = self.objects[owner.index()]
            .fields
            .get_mut(member)
            .and_then(|v| rest.iter().try_fold(v, |v, seg| v.at_mut(seg)));
        let Some(slot) = slot else {
            tracing::warn!("reference path {} does not exist", record.path);
            return;
        };
        match target {
            Some(h) => {
                *slot = LoadedValue::Handle(h);
                self.relinked += 1;
            }
            None => {
                tracing::debug!("reference {} -> {} has no target here", record.path, record.target);
                *slot = LoadedValue::Scalar(Json::Null);
            }
        }
    }
}

fn fields_of(json: &Json) -> BTreeMap<String, LoadedValue> {
    json.as_object()
        .map(|m| m.iter().map(|(k, v)| (k.clone(), LoadedValue::from_json(v))).collect())
        .unwrap_or_default()
}

fn id_of(json: &Json) -> Option<ObjectId> {
    json.as_str().map(ObjectId::new)
}

/// Instantiate a document against the constructors registered in `store`.
///
/// A component whose type is not in the store fails the load with
/// [`Error::UnknownType`].
pub fn load_document(doc: &Json, store: &TypeStore) -> Result<LoadedScene> {
    let nodes = doc["nodes"]
        .as_array()
        .ok_or_else(|| Error::invalid("document has no nodes array"))?;
    let mut scene = LoadedScene::default();

    // Node handles equal node indices.
    for node in nodes {
        let ext = &node["extensions"][COMPONENTS_EXTENSION];
        let name = node["name"].as_str().unwrap_or_default();
        scene.push(LoadedObject::new(id_of(&ext["guid"]), ObjectKind::Node, "GameObject", name));
    }

    for (i, node) in nodes.iter().enumerate() {
        let handle = ObjectHandle(i as u32);
        for child in node["children"].as_array().map(Vec::as_slice).unwrap_or_default() {
            let Some(c) = child.as_u64().map(|c| c as usize).filter(|c| *c < nodes.len()) else {
                return Err(Error::invalid(format!("node {i} has invalid child {child}")));
            };
            scene.objects[c].parent = Some(handle);
            scene.objects[i].children.push(ObjectHandle(c as u32));
        }

        let components = node["extensions"][COMPONENTS_EXTENSION]["components"]
            .as_array()
            .map(Vec::as_slice)
            .unwrap_or_default();
        for comp in components {
            let type_name = comp["type"].as_str().unwrap_or_default();
            let id = id_of(&comp["guid"]);
            if !store.contains(type_name) {
                return Err(Error::UnknownType {
                    type_name: type_name.to_string(),
                    object: id.map(|i| i.0).unwrap_or_default(),
                });
            }
            let mut obj = LoadedObject::new(id, ObjectKind::Component, type_name, type_name);
            obj.fields = fields_of(&comp["fields"]);
            obj.parent = Some(handle);
            let c = scene.push(obj);
            scene.objects[i].components.push(c);
        }
    }

    if let Some(table) = doc["extensions"][OBJECTS_EXTENSION].as_object() {
        for (id, entry) in table {
            let mut obj = LoadedObject::new(
                Some(ObjectId::new(id.as_str())),
                ObjectKind::Asset,
                entry["type"].as_str().unwrap_or_default(),
                entry["name"].as_str().unwrap_or_default(),
            );
            obj.fields = fields_of(&entry["fields"]);
            scene.push(obj);
        }
    }

    let records: Vec<ReferenceRecord> = match doc["extensions"].get(REFERENCES_EXTENSION) {
        Some(json) => serde_json::from_value(json.clone())?,
        None => Vec::new(),
    };
    for record in &records {
        scene.relink(record);
    }
    tracing::debug!(
        "loaded {} objects, {} of {} references linked",
        scene.len(),
        scene.relinked,
        records.len()
    );
    Ok(scene)
}

/// [`load_document`] over a GLB container.
pub fn load_glb(bytes: &[u8], store: &TypeStore) -> Result<LoadedScene> {
    load_document(&parse_glb(bytes)?, store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc() -> Json {
        json!({
            "nodes": [
                { "name": "Root", "children": [1],
                  "extensions": { "SCENE_components": { "guid": "n0", "components": [] } } },
                { "name": "Child",
                  "extensions": { "SCENE_components": { "guid": "n1", "components": [
                      { "guid": "c1", "type": "Renderer",
                        "fields": { "material": { "$ref": "m" }, "list": [{ "$ref": "m" }, { "$ref": "gone" }] } }
                  ] } } }
            ],
            "extensions": {
                "SCENE_objects": { "m": { "type": "Material", "name": "Mat", "fields": { "owner": { "$ref": "n0" } } } },
                "SCENE_references": [
                    { "path": "c1/material", "target": "m", "kind": "asset" },
                    { "path": "c1/list/0", "target": "m", "kind": "asset" },
                    { "path": "c1/list/1", "target": "gone", "kind": "asset" },
                    { "path": "m/owner", "target": "n0", "kind": "node" }
                ]
            }
        })
    }

    #[test]
    fn test_shared_target_single_instance() {
        let mut store = TypeStore::new();
        store.register("Renderer", "Renderer");
        let scene = load_document(&doc(), &store).unwrap();

        assert_eq!(scene.len(), 4);
        let comp = scene.by_id("c1").unwrap();
        let a = comp.field("material").and_then(LoadedValue::handle).unwrap();
        let list = comp.field("list").and_then(LoadedValue::as_array).unwrap();
        assert_eq!(list[0].handle(), Some(a));
        assert!(list[1].is_null());
        assert_eq!(scene.get(a).unwrap().name, "Mat");

        let owner = scene.get(a).unwrap().field("owner").and_then(LoadedValue::handle);
        assert_eq!(owner, scene.handle_of("n0"));
        assert_eq!(scene.relinked(), 3);
        assert_eq!(scene.by_id("n1").unwrap().parent, scene.handle_of("n0"));
    }

    #[test]
    fn test_unknown_type_fails() {
        let err = load_document(&doc(), &TypeStore::new()).unwrap_err();
        assert!(matches!(err, Error::UnknownType { ref type_name, .. } if type_name == "Renderer"));
    }
}
