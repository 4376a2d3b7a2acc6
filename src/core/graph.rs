//! Arena storage for the source object graph.
//!
//! Objects live in one flat table in document order; parent/child and
//! owner/component relations are derived index lists. Cross-references stay
//! keys, so cyclic and shared graphs need no special ownership.

use std::collections::HashMap;
use std::path::Path;

use super::object::{ExportableObject, ObjectKind, SceneSource};
use super::value::SourceKey;
use crate::util::{Error, Result};

/// Validated, indexed scene graph.
#[derive(Debug, Default)]
pub struct SceneGraph {
    name: String,
    objects: Vec<ExportableObject>,
    by_key: HashMap<SourceKey, usize>,
    children: HashMap<usize, Vec<usize>>,
    components: HashMap<usize, Vec<usize>>,
    roots: Vec<usize>,
}

impl SceneGraph {
    /// Build the arena, validating keys and parent links.
    pub fn from_source(source: SceneSource) -> Result<Self> {
        let mut by_key = HashMap::with_capacity(source.objects.len());
        for (i, obj) in source.objects.iter().enumerate() {
            if by_key.insert(obj.key.clone(), i).is_some() {
                return Err(Error::invalid(format!("duplicate object key {}", obj.key)));
            }
        }

        let mut children: HashMap<usize, Vec<usize>> = HashMap::new();
        let mut components: HashMap<usize, Vec<usize>> = HashMap::new();
        let mut roots = Vec::new();

        for (i, obj) in source.objects.iter().enumerate() {
            let parent = match &obj.parent {
                Some(key) => {
                    let p = *by_key.get(key).ok_or_else(|| {
                        Error::invalid(format!("object {} has unknown parent {key}", obj.key))
                    })?;
                    if source.objects[p].kind != ObjectKind::Node {
                        return Err(Error::invalid(format!(
                            "object {} is parented to non-node {key}",
                            obj.key
                        )));
                    }
                    Some(p)
                }
                None => None,
            };

            match (obj.kind, parent) {
                (ObjectKind::Node, Some(p)) => children.entry(p).or_default().push(i),
                (ObjectKind::Node, None) => roots.push(i),
                (ObjectKind::Component, Some(p)) => components.entry(p).or_default().push(i),
                (ObjectKind::Component, None) => {
                    return Err(Error::invalid(format!("component {} has no owner", obj.key)));
                }
                (ObjectKind::Asset, Some(_)) => {
                    return Err(Error::invalid(format!("asset {} cannot have a parent", obj.key)));
                }
                (ObjectKind::Asset, None) => {}
            }
        }

        let graph = Self {
            name: source.name,
            objects: source.objects,
            by_key,
            children,
            components,
            roots,
        };
        graph.check_acyclic_hierarchy()?;
        Ok(graph)
    }

    fn check_acyclic_hierarchy(&self) -> Result<()> {
        for obj in self.objects.iter().filter(|o| o.is_node()) {
            let mut steps = 0usize;
            let mut current = obj.parent.as_ref();
            while let Some(key) = current {
                steps += 1;
                if steps > self.objects.len() {
                    return Err(Error::invalid(format!("hierarchy cycle through {}", obj.key)));
                }
                current = self.get(key).and_then(|p| p.parent.as_ref());
            }
        }
        Ok(())
    }

    /// Parse a scene source JSON document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let source: SceneSource = serde_json::from_str(json)?;
        Self::from_source(source)
    }

    /// Load a scene source file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// All objects in document order.
    pub fn objects(&self) -> &[ExportableObject] {
        &self.objects
    }

    pub fn get(&self, key: &SourceKey) -> Option<&ExportableObject> {
        self.by_key.get(key).map(|&i| &self.objects[i])
    }

    /// Lookup by raw key string.
    pub fn by_key(&self, key: &str) -> Option<&ExportableObject> {
        self.get(&SourceKey::new(key))
    }

    /// Top-level nodes in document order.
    pub fn roots(&self) -> impl Iterator<Item = &ExportableObject> {
        self.roots.iter().map(|&i| &self.objects[i])
    }

    /// Child nodes of `key` in document order.
    pub fn children(&self, key: &SourceKey) -> impl Iterator<Item = &ExportableObject> {
        self.related(&self.children, key)
    }

    /// Components attached to node `key` in document order.
    pub fn components(&self, key: &SourceKey) -> impl Iterator<Item = &ExportableObject> {
        self.related(&self.components, key)
    }

    fn related<'a>(
        &'a self,
        table: &'a HashMap<usize, Vec<usize>>,
        key: &SourceKey,
    ) -> impl Iterator<Item = &'a ExportableObject> {
        self.by_key
            .get(key)
            .and_then(|i| table.get(i))
            .map(|v| v.as_slice())
            .unwrap_or(&[])
            .iter()
            .map(move |&i| &self.objects[i])
    }

    /// Ancestor nodes of `key`, nearest first.
    pub fn ancestors(&self, key: &SourceKey) -> Vec<&ExportableObject> {
        let mut out = Vec::new();
        let mut current = self.get(key).and_then(|o| o.parent.as_ref());
        while let Some(k) = current {
            match self.get(k) {
                Some(p) => {
                    out.push(p);
                    current = p.parent.as_ref();
                }
                None => break,
            }
        }
        out
    }

    /// Occurrence of `obj` among siblings that share its name (nodes and
    /// roots) or its type (components of one owner). Unrelated siblings
    /// never shift it.
    pub fn occurrence_index(&self, obj: &ExportableObject) -> usize {
        let index = self.by_key.get(&obj.key).copied();
        let siblings = match (&obj.parent, obj.kind) {
            (Some(p), ObjectKind::Component) => {
                self.by_key.get(p).and_then(|i| self.components.get(i))
            }
            (Some(p), _) => self.by_key.get(p).and_then(|i| self.children.get(i)),
            (None, _) => Some(&self.roots),
        };
        let same = |o: &ExportableObject| match obj.kind {
            ObjectKind::Component => o.type_name == obj.type_name,
            _ => o.name == obj.name,
        };
        siblings
            .map(|s| {
                s.iter()
                    .take_while(|&&i| Some(i) != index)
                    .filter(|&&i| same(&self.objects[i]))
                    .count()
            })
            .unwrap_or(0)
    }

    /// Slash-separated name path of a node. A level gets a `#n` suffix only
    /// when earlier siblings share its name. Components use their owner's
    /// path.
    pub fn hierarchy_path(&self, obj: &ExportableObject) -> String {
        let node = match obj.kind {
            ObjectKind::Node => Some(obj),
            ObjectKind::Component => obj.parent.as_ref().and_then(|k| self.get(k)),
            ObjectKind::Asset => None,
        };
        let Some(node) = node else {
            return String::new();
        };

        let mut chain: Vec<&ExportableObject> = self.ancestors(&node.key);
        chain.reverse();
        chain.push(node);
        chain
            .iter()
            .map(|n| match self.occurrence_index(n) {
                0 => n.name.clone(),
                k => format!("{}#{k}", n.name),
            })
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Whether `key` is a node below (or at) a sub-asset root other than
    /// itself.
    pub fn nearest_sub_asset_ancestor(&self, key: &SourceKey) -> Option<&ExportableObject> {
        self.ancestors(key).into_iter().find(|a| a.sub_asset)
    }

    /// Sub-asset roots that are not nested inside another sub-asset, in
    /// document order.
    pub fn outermost_sub_assets(&self) -> Vec<&ExportableObject> {
        self.objects
            .iter()
            .filter(|o| o.is_node() && o.sub_asset)
            .filter(|o| self.nearest_sub_asset_ancestor(&o.key).is_none())
            .collect()
    }
}
