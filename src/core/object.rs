//! Exportable objects and the scene source document.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::value::{SourceKey, Value};

/// Opaque stable identifier of an exported object.
///
/// Callers must not assume any encoding; only stability across runs and
/// uniqueness within one export are guaranteed.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(pub String);

impl ObjectId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Role of an object in the source graph.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    /// Hierarchy entry with a transform.
    #[default]
    Node,
    /// Behaviour attached to a node.
    Component,
    /// Shared data object (material, timeline, sprite, ...).
    Asset,
}

impl ObjectKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Node => "node",
            Self::Component => "component",
            Self::Asset => "asset",
        }
    }
}

/// Local transform: position, euler rotation in degrees, scale.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    #[serde(default)]
    pub position: [f32; 3],
    #[serde(default)]
    pub rotation: [f32; 3],
    #[serde(default = "unit_scale")]
    pub scale: [f32; 3],
}

fn unit_scale() -> [f32; 3] {
    [1.0, 1.0, 1.0]
}

impl Transform {
    pub const IDENTITY: Self = Self {
        position: [0.0; 3],
        rotation: [0.0; 3],
        scale: [1.0; 3],
    };

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// Rotation as a quaternion `[x, y, z, w]`, applying Z, then X, then Y.
    pub fn rotation_quat(&self) -> [f32; 4] {
        let [x, y, z] = self.rotation.map(f32::to_radians);
        glam::Quat::from_euler(glam::EulerRot::YXZ, y, x, z).to_array()
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Any engine entity eligible for serialization.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct ExportableObject {
    pub key: SourceKey,
    /// Persistent engine identity, if the source has one.
    #[serde(default)]
    pub guid: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub kind: ObjectKind,
    /// Parent node for nodes, owning node for components.
    #[serde(default)]
    pub parent: Option<SourceKey>,
    #[serde(default)]
    pub fields: BTreeMap<String, Value>,
    #[serde(default)]
    pub transform: Option<Transform>,
    /// Export this node as its own glTF file.
    #[serde(default)]
    pub sub_asset: bool,
    #[serde(default)]
    pub destroyed: bool,
    /// Module the runtime imports the component constructor from.
    #[serde(default)]
    pub module: Option<String>,
    /// Export symbol of the constructor; defaults to the type name.
    #[serde(default)]
    pub symbol: Option<String>,
}

impl ExportableObject {
    fn with_kind(key: &str, kind: ObjectKind, type_name: &str) -> Self {
        Self {
            key: SourceKey::new(key),
            guid: None,
            name: String::new(),
            type_name: type_name.to_string(),
            kind,
            parent: None,
            fields: BTreeMap::new(),
            transform: None,
            sub_asset: false,
            destroyed: false,
            module: None,
            symbol: None,
        }
    }

    /// Create a node.
    pub fn node(key: &str, name: &str) -> Self {
        let mut obj = Self::with_kind(key, ObjectKind::Node, "GameObject");
        obj.name = name.to_string();
        obj.transform = Some(Transform::IDENTITY);
        obj
    }

    /// Create a component attached to `owner`.
    pub fn component(key: &str, owner: &str, type_name: &str) -> Self {
        let mut obj = Self::with_kind(key, ObjectKind::Component, type_name);
        obj.name = type_name.to_string();
        obj.parent = Some(SourceKey::new(owner));
        obj
    }

    /// Create a shared asset.
    pub fn asset(key: &str, type_name: &str, name: &str) -> Self {
        let mut obj = Self::with_kind(key, ObjectKind::Asset, type_name);
        obj.name = name.to_string();
        obj
    }

    pub fn with_parent(mut self, parent: &str) -> Self {
        self.parent = Some(SourceKey::new(parent));
        self
    }

    pub fn with_guid(mut self, guid: &str) -> Self {
        self.guid = Some(guid.to_string());
        self
    }

    pub fn with_field(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(name.to_string(), value.into());
        self
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = Some(transform);
        self
    }

    pub fn with_module(mut self, module: &str) -> Self {
        self.module = Some(module.to_string());
        self
    }

    pub fn as_sub_asset(mut self) -> Self {
        self.sub_asset = true;
        self
    }

    pub fn destroyed(mut self) -> Self {
        self.destroyed = true;
        self
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn is_node(&self) -> bool {
        self.kind == ObjectKind::Node
    }

    /// Export symbol the runtime constructs this type from.
    pub fn export_symbol(&self) -> &str {
        self.symbol.as_deref().unwrap_or(&self.type_name)
    }
}

/// Serialized engine scene, the exporter's input document.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct SceneSource {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub objects: Vec<ExportableObject>,
}

impl SceneSource {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            objects: Vec::new(),
        }
    }

    /// Append an object.
    pub fn push(&mut self, object: ExportableObject) -> &mut Self {
        self.objects.push(object);
        self
    }

    /// Builder-style append.
    pub fn with(mut self, object: ExportableObject) -> Self {
        self.objects.push(object);
        self
    }
}
