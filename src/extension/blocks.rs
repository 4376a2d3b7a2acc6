//! Named, versioned extension blocks attached to exported entities.

use serde::Serialize;

use crate::core::ObjectId;

/// Sprite sheet block placed on a sprite's texture.
pub const SPRITE_SHEET_EXTENSION: &str = "SPRITE_sheet";
/// Mesh compression marker understood by the runtime mesh decoder.
pub const MESH_COMPRESSION_EXTENSION: &str = "SCENE_mesh_compression";

/// Entity an extension block is attached to.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ExtensionTarget {
    Node(ObjectId),
    Material(ObjectId),
    Texture(ObjectId),
    Mesh(ObjectId),
}

impl ExtensionTarget {
    pub fn id(&self) -> &ObjectId {
        match self {
            Self::Node(id) | Self::Material(id) | Self::Texture(id) | Self::Mesh(id) => id,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ExtensionBlock {
    pub name: String,
    pub version: u32,
    pub payload: serde_json::Value,
}

impl ExtensionBlock {
    pub fn new(name: &str, version: u32, payload: serde_json::Value) -> Self {
        Self {
            name: name.to_string(),
            version,
            payload,
        }
    }

    /// Value stored under the block's name in an `extensions` object.
    ///
    /// Object payloads get a `version` member; other payloads are wrapped as
    /// `{version, data}`.
    pub fn to_json(&self) -> serde_json::Value {
        match &self.payload {
            serde_json::Value::Object(map) => {
                let mut map = map.clone();
                map.insert("version".into(), self.version.into());
                serde_json::Value::Object(map)
            }
            other => serde_json::json!({ "version": self.version, "data": other }),
        }
    }
}
