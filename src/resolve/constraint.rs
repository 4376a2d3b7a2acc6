use std::collections::BTreeMap;

use super::chain::ValueResolver;
use crate::core::{ExportableObject, Value};
use crate::emit::Serializer;

/// Rewrites the `sources` list of constraint components into
/// `[{source, weight}]`, dropping sources that no longer exist.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConstraintSourceResolver;

impl ValueResolver for ConstraintSourceResolver {
    fn name(&self) -> &'static str {
        "constraint_sources"
    }

    fn priority(&self) -> i32 {
        0
    }

    fn try_resolve(
        &self,
        ser: &mut Serializer<'_>,
        instance: &ExportableObject,
        member: &str,
        value: &mut Value,
    ) -> bool {
        if member != "sources" || !instance.type_name.ends_with("Constraint") {
            return false;
        }
        let Some(items) = value.as_array() else {
            return false;
        };
        if !items.iter().all(|i| i.as_map().is_some()) {
            return false;
        }

        let graph = ser.graph();
        let derived: Vec<Value> = items
            .iter()
            .filter_map(|item| {
                let key = item.get("source")?.as_ref_key()?;
                let source = graph.get(key).filter(|s| !s.destroyed)?;
                let weight = item.get("weight").and_then(Value::as_f64).unwrap_or(1.0);
                Some(Value::Map(BTreeMap::from([
                    ("source".to_string(), Value::Ref(source.key.clone())),
                    ("weight".to_string(), Value::Float(weight)),
                ])))
            })
            .collect();
        if derived.len() < items.len() {
            tracing::debug!(
                "{}: dropped {} dead constraint sources",
                instance.name,
                items.len() - derived.len()
            );
        }

        let derived = Value::Array(derived);
        let path = ser.member_path(instance, member);
        ser.cx().registry.register_field(path, instance, member, derived.clone());
        *value = derived;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{SceneGraph, SceneSource};
    use crate::resolve::testing::with_serializer;
    use serde_json::json;

    fn graph() -> SceneGraph {
        let sources: Value = json!([
            { "source": { "$ref": "1" }, "weight": 0.25 },
            { "source": { "$ref": "3" } },
            { "source": { "$ref": "9" }, "weight": 1.0 }
        ])
        .into();
        SceneGraph::from_source(
            SceneSource::new("S")
                .with(ExportableObject::node("1", "A"))
                .with(ExportableObject::component("2", "1", "AimConstraint").with_field("sources", sources))
                .with(ExportableObject::node("3", "B"))
                .with(ExportableObject::node("9", "Gone").destroyed())
                .with(ExportableObject::component("4", "1", "Follower").with_field("sources", Value::Array(vec![]))),
        )
        .unwrap()
    }

    #[test]
    fn test_sources_rewritten_and_registered() {
        let g = graph();
        let comp = g.by_key("2").unwrap();
        let mut value = comp.field("sources").unwrap().clone();
        let (applied, cx) = with_serializer(&g, |ser| {
            ConstraintSourceResolver.try_resolve(ser, comp, "sources", &mut value)
        });
        assert!(applied);

        let items = value.as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].get("weight"), Some(&Value::Float(0.25)));
        assert_eq!(items[1].get("weight"), Some(&Value::Float(1.0)));
        assert_eq!(items[1].get("source"), Some(&Value::reference("3")));
        assert_eq!(cx.registry.field_override(comp, "sources").map(|o| &o.value), Some(&value));
    }

    #[test]
    fn test_other_members_untouched() {
        let g = graph();
        let follower = g.by_key("4").unwrap();
        let mut value = follower.field("sources").unwrap().clone();
        let before = value.clone();
        let (applied, cx) = with_serializer(&g, |ser| {
            ConstraintSourceResolver.try_resolve(ser, follower, "sources", &mut value)
        });
        assert!(!applied);
        assert_eq!(value, before);
        assert!(cx.registry.field_override(follower, "sources").is_none());

        let aim = g.by_key("2").unwrap();
        let mut other = Value::Int(1);
        let (applied, _) = with_serializer(&g, |ser| {
            ConstraintSourceResolver.try_resolve(ser, aim, "weight", &mut other)
        });
        assert!(!applied);
    }
}
