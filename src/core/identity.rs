//! Stable identifier derivation.
//!
//! A persistent engine guid is used verbatim. Without one, the identifier is a
//! MurmurHash3 digest over data that survives re-export of an unchanged scene:
//!
//! - nodes: type + name path (a position only among same-named siblings)
//! - components: type + owner path + slot among same-typed components
//! - assets: type + name + source key

use murmur3::hash_parts;

use super::graph::SceneGraph;
use super::object::{ExportableObject, ObjectId, ObjectKind};

/// Derive the identifier of `obj`, or `None` if it has no identity
/// (destroyed source object).
pub fn derive_id(graph: &SceneGraph, obj: &ExportableObject) -> Option<ObjectId> {
    if obj.destroyed {
        return None;
    }
    if let Some(guid) = obj.guid.as_deref().filter(|g| !g.is_empty()) {
        return Some(ObjectId::new(guid));
    }

    let digest = match obj.kind {
        ObjectKind::Node => hash_parts([
            obj.kind.as_str(),
            obj.type_name.as_str(),
            graph.hierarchy_path(obj).as_str(),
        ]),
        ObjectKind::Component => hash_parts([
            obj.kind.as_str(),
            obj.type_name.as_str(),
            graph.hierarchy_path(obj).as_str(),
            graph.occurrence_index(obj).to_string().as_str(),
        ]),
        ObjectKind::Asset => hash_parts([
            obj.kind.as_str(),
            obj.type_name.as_str(),
            obj.name.as_str(),
            obj.key.as_str(),
        ]),
    };
    Some(ObjectId::new(digest.to_hex()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SceneSource;

    fn graph(extra_sibling: bool) -> SceneGraph {
        let mut source = SceneSource::new("S");
        source.push(ExportableObject::node("1", "Root"));
        if extra_sibling {
            source.push(ExportableObject::node("9", "Other"));
        }
        source
            .push(ExportableObject::node("2", "Arm").with_parent("1"))
            .push(ExportableObject::component("3", "2", "Rotator"))
            .push(ExportableObject::asset("4", "Material", "Steel").with_guid("guid-steel"))
            .push(ExportableObject::asset("5", "Sprite", "Icon"));
        SceneGraph::from_source(source).unwrap()
    }

    #[test]
    fn test_guid_used_verbatim() {
        let g = graph(false);
        let id = derive_id(&g, g.by_key("4").unwrap()).unwrap();
        assert_eq!(id.as_str(), "guid-steel");
    }

    #[test]
    fn test_stable_across_rebuilds() {
        let a = graph(false);
        let b = graph(false);
        for key in ["1", "2", "3", "5"] {
            assert_eq!(
                derive_id(&a, a.by_key(key).unwrap()),
                derive_id(&b, b.by_key(key).unwrap()),
                "key {key}"
            );
        }
    }

    #[test]
    fn test_unrelated_root_does_not_shift_nested_ids() {
        // Adding a root after "Root" leaves Root's subtree paths unchanged.
        let a = graph(false);
        let b = graph(true);
        assert_eq!(
            derive_id(&a, a.by_key("3").unwrap()),
            derive_id(&b, b.by_key("3").unwrap())
        );
    }

    #[test]
    fn test_earlier_sibling_does_not_shift_ids() {
        let build = |with_lamp: bool| {
            let mut source = SceneSource::new("S");
            source.push(ExportableObject::node("1", "Root"));
            if with_lamp {
                source
                    .push(ExportableObject::node("7", "Lamp").with_parent("1"))
                    .push(ExportableObject::component("8", "7", "Rotator"));
            }
            source
                .push(ExportableObject::node("2", "Arm").with_parent("1"))
                .push(ExportableObject::component("3", "2", "Rotator"))
                .push(ExportableObject::node("4", "Hand").with_parent("2"));
            SceneGraph::from_source(source).unwrap()
        };
        let a = build(false);
        let b = build(true);
        for key in ["2", "3", "4"] {
            assert_eq!(
                derive_id(&a, a.by_key(key).unwrap()),
                derive_id(&b, b.by_key(key).unwrap()),
                "key {key}"
            );
        }
    }

    #[test]
    fn test_namesake_siblings_stay_distinct() {
        let source = SceneSource::new("S")
            .with(ExportableObject::node("1", "Root"))
            .with(ExportableObject::node("2", "Arm").with_parent("1"))
            .with(ExportableObject::node("3", "Arm").with_parent("1"))
            .with(ExportableObject::component("4", "2", "Light"))
            .with(ExportableObject::component("5", "2", "Light"));
        let g = SceneGraph::from_source(source).unwrap();
        let id = |key: &str| derive_id(&g, g.by_key(key).unwrap());
        assert_ne!(id("2"), id("3"));
        assert_ne!(id("4"), id("5"));
    }

    #[test]
    fn test_distinct_and_destroyed() {
        let g = graph(false);
        let node = derive_id(&g, g.by_key("2").unwrap()).unwrap();
        let comp = derive_id(&g, g.by_key("3").unwrap()).unwrap();
        assert_ne!(node, comp);
        assert_eq!(node.as_str().len(), 32);

        let gone = ExportableObject::node("8", "Gone").destroyed();
        assert_eq!(derive_id(&g, &gone), None);
    }
}
