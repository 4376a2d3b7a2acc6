use std::collections::BTreeMap;

use super::chain::ValueResolver;
use crate::core::{ExportableObject, Value};
use crate::emit::Serializer;

/// LOD groups: each level gets a switch distance derived from the group
/// size and its screen-relative transition height.
#[derive(Debug, Default, Clone, Copy)]
pub struct LodGroupResolver;

impl LodGroupResolver {
    fn level(size: f64, level: &Value) -> Option<Value> {
        let height = level
            .get("screen_relative_height")
            .and_then(Value::as_f64)?;
        // Zero height is the last level; it never switches out.
        let distance = if height > 0.0 {
            Value::Float(size / height)
        } else {
            Value::Null
        };
        let renderers = level
            .get("renderers")
            .and_then(Value::as_array)
            .map(|r| r.iter().filter(|v| v.as_ref_key().is_some()).cloned().collect())
            .unwrap_or_default();

        Some(Value::Map(BTreeMap::from([
            ("screenRelativeTransitionHeight".to_string(), Value::Float(height)),
            ("distance".to_string(), distance),
            ("renderers".to_string(), Value::Array(renderers)),
        ])))
    }
}

impl ValueResolver for LodGroupResolver {
    fn name(&self) -> &'static str {
        "lod_group"
    }

    fn priority(&self) -> i32 {
        40
    }

    fn try_resolve(
        &self,
        _ser: &mut Serializer<'_>,
        instance: &ExportableObject,
        member: &str,
        value: &mut Value,
    ) -> bool {
        if instance.type_name != "LODGroup" || member != "lods" {
            return false;
        }
        let Some(levels) = value.as_array() else {
            return false;
        };

        let size = instance.field("size").and_then(Value::as_f64).unwrap_or(1.0);
        let resolved: Vec<Value> = levels.iter().filter_map(|l| Self::level(size, l)).collect();
        *value = Value::Array(resolved);
        true
    }
}
