//! glTF document assembly for one sub-asset.
//!
//! Layout:
//! - `nodes`: the sub-asset subtree in pre-order, root at index 0; each node
//!   carries its components in `SCENE_components`
//! - `extensions.SCENE_objects`: identifier to shared object, each once
//! - `extensions.SCENE_references`: every reference for post-load relinking
//! - `extensions.KHR_techniques_webgl`: the run's technique block so far

use std::collections::BTreeSet;

use serde_json::{json, Map, Value as Json};

use super::context::ExportContext;
use super::serializer::{SerializedObjects, Serializer};
use crate::core::{ExportableObject, ObjectId};
use crate::extension::{ExtensionTarget, TECHNIQUES_EXTENSION};
use crate::types::TypeImport;
use crate::util::Result;

pub const COMPONENTS_EXTENSION: &str = "SCENE_components";
pub const OBJECTS_EXTENSION: &str = "SCENE_objects";
pub const REFERENCES_EXTENSION: &str = "SCENE_references";
pub const GLTF_VERSION: &str = "2.0";

/// Generator string written into every document.
pub fn generator() -> String {
    format!("sceneweave {}", env!("CARGO_PKG_VERSION"))
}

/// Node serialized into the document.
#[derive(Debug)]
pub struct NodeEntry {
    pub id: Option<ObjectId>,
    pub json: Map<String, Json>,
}

/// Serialize the live subtree under `root` in pre-order.
///
/// Nested sub-asset roots are ordinary nodes here.
pub fn serialize_nodes(ser: &mut Serializer<'_>, root: &ExportableObject) -> Vec<NodeEntry> {
    let mut nodes = Vec::new();
    push_node(ser, root, &mut nodes);
    nodes
}

fn push_node(ser: &mut Serializer<'_>, node: &ExportableObject, nodes: &mut Vec<NodeEntry>) -> Option<usize> {
    if node.destroyed {
        return None;
    }
    let graph = ser.graph();
    let index = nodes.len();
    let id = ser.id_of(node);
    nodes.push(NodeEntry { id: id.clone(), json: Map::new() });

    let children: Vec<usize> = graph
        .children(&node.key)
        .filter_map(|child| push_node(ser, child, nodes))
        .collect();
    let components: Vec<Json> = graph
        .components(&node.key)
        .filter(|c| !c.destroyed)
        .filter_map(|c| ser.serialize_component(c))
        .collect();

    let mut json = Map::new();
    json.insert("name".into(), Json::String(node.name.clone()));
    if !children.is_empty() {
        json.insert("children".into(), json!(children));
    }
    if let Some(t) = node.transform.filter(|t| !t.is_identity()) {
        if t.position != [0.0; 3] {
            json.insert("translation".into(), json!(t.position));
        }
        if t.rotation != [0.0; 3] {
            json.insert("rotation".into(), json!(t.rotation_quat()));
        }
        if t.scale != [1.0; 3] {
            json.insert("scale".into(), json!(t.scale));
        }
    }
    let mut extensions = Map::new();
    extensions.insert(
        COMPONENTS_EXTENSION.into(),
        json!({ "guid": id, "components": components }),
    );
    json.insert("extensions".into(), Json::Object(extensions));

    nodes[index].json = json;
    Some(index)
}

/// A finished document.
#[derive(Debug, Clone, PartialEq)]
pub struct GltfDocument {
    pub json: Json,
    pub type_imports: Vec<TypeImport>,
}

impl GltfDocument {
    /// Assemble nodes and collected objects, pulling extension data and the
    /// references recorded since `mark` from the context.
    pub fn assemble(
        scene_name: &str,
        nodes: Vec<NodeEntry>,
        objects: SerializedObjects,
        cx: &ExportContext,
        mark: usize,
    ) -> Self {
        let SerializedObjects {
            mut objects,
            targets,
            type_imports,
        } = objects;
        let node_targets: Vec<Option<ExtensionTarget>> = nodes
            .iter()
            .map(|n| n.id.clone().map(ExtensionTarget::Node))
            .collect();
        let mut used: BTreeSet<String> = cx
            .extensions
            .used_extensions(targets.iter().chain(node_targets.iter().flatten()));
        used.insert(COMPONENTS_EXTENSION.to_string());

        // Extension blocks are attached last; resolvers may add blocks for an
        // object after it was interned.
        for target in &targets {
            let Some(Json::Object(entry)) = objects.get_mut(target.id()) else {
                continue;
            };
            let mut ext = match cx.extensions.extensions_json(target) {
                Some(Json::Object(map)) => map,
                _ => Map::new(),
            };
            if let ExtensionTarget::Material(id) = target {
                if let Some(index) = cx.extensions.try_get_technique_index(id) {
                    ext.insert(TECHNIQUES_EXTENSION.into(), json!({ "technique": index }));
                }
            }
            if !ext.is_empty() {
                entry.insert("extensions".into(), Json::Object(ext));
            }
        }

        let nodes: Vec<Json> = nodes
            .into_iter()
            .zip(&node_targets)
            .map(|(mut n, target)| {
                if let Some(Json::Object(blocks)) = target.as_ref().and_then(|t| cx.extensions.extensions_json(t)) {
                    if let Some(Json::Object(ext)) = n.json.get_mut("extensions") {
                        ext.extend(blocks);
                    }
                }
                Json::Object(n.json)
            })
            .collect();

        let mut root_ext = Map::new();
        if !objects.is_empty() {
            used.insert(OBJECTS_EXTENSION.to_string());
            let table: Map<String, Json> = objects.into_iter().map(|(id, v)| (id.0, v)).collect();
            root_ext.insert(OBJECTS_EXTENSION.into(), Json::Object(table));
        }
        let references = cx.registry.references_since(mark);
        if !references.is_empty() {
            used.insert(REFERENCES_EXTENSION.to_string());
            root_ext.insert(REFERENCES_EXTENSION.into(), json!(references));
        }
        if used.contains(TECHNIQUES_EXTENSION) {
            root_ext.insert(TECHNIQUES_EXTENSION.into(), json!(cx.extensions.techniques()));
        }

        let roots = if nodes.is_empty() { vec![] } else { vec![0] };
        let json = json!({
            "asset": { "version": GLTF_VERSION, "generator": generator() },
            "extensionsUsed": used,
            "scene": 0,
            "scenes": [{ "name": scene_name, "nodes": roots }],
            "nodes": nodes,
            "extensions": root_ext,
        });
        Self { json, type_imports }
    }

    /// Compact JSON bytes. Maps are key-ordered, so equal documents encode
    /// to equal bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(&self.json)?)
    }

    pub fn nodes(&self) -> &[Json] {
        self.json["nodes"].as_array().map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn objects(&self) -> Option<&Map<String, Json>> {
        self.json["extensions"][OBJECTS_EXTENSION].as_object()
    }
}
