//! Type store: which serialized type names the runtime can construct.

use std::collections::BTreeMap;
use std::path::Path;

use crate::util::Result;

/// Serialized type name to constructor symbol.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TypeStore {
    types: BTreeMap<String, String>,
}

impl TypeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, type_name: &str, symbol: &str) -> &mut Self {
        self.types.insert(type_name.to_string(), symbol.to_string());
        self
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.types.contains_key(type_name)
    }

    pub fn symbol(&self, type_name: &str) -> Option<&str> {
        self.types.get(type_name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Collect `TypeStore.add("<type>", <symbol>);` lines of a manifest.
    pub fn parse_manifest(source: &str) -> Self {
        let mut store = Self::new();
        store.merge_manifest(source);
        store
    }

    pub fn merge_manifest(&mut self, source: &str) {
        for line in source.lines() {
            let Some(args) = line
                .trim()
                .strip_prefix("TypeStore.add(")
                .and_then(|rest| rest.strip_suffix(");"))
            else {
                continue;
            };
            let Some((name, symbol)) = args.split_once(',') else {
                continue;
            };
            let name = name.trim().trim_matches('"');
            let symbol = symbol.trim();
            if !name.is_empty() && !symbol.is_empty() {
                self.register(name, symbol);
            }
        }
    }

    pub fn from_manifest(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::parse_manifest(&std::fs::read_to_string(path)?))
    }
}
