//! Type register manifests.
//!
//! Every sub-asset contributes the component types it serializes. Once all
//! contributions are in, one manifest per register path is written; the
//! runtime evaluates it before loading any asset so every serialized type
//! name maps to a constructor.

use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::emit::write_file;
use crate::util::{Error, Result};

/// Serialized type name bound to the symbol that constructs it.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeImport {
    pub type_name: String,
    pub module_path: String,
    pub export_symbol: String,
}

impl TypeImport {
    pub fn new(type_name: &str, module_path: &str, export_symbol: &str) -> Self {
        Self {
            type_name: type_name.to_string(),
            module_path: module_path.to_string(),
            export_symbol: export_symbol.to_string(),
        }
    }

    fn describe(&self) -> String {
        format!("{} from \"{}\"", self.export_symbol, self.module_path)
    }
}

/// One contribution: types destined for the manifest at `path`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TypeRegisterInfo {
    pub path: String,
    pub type_imports: Vec<TypeImport>,
}

#[derive(Clone, Debug)]
pub struct ProjectInfo {
    pub project_dir: PathBuf,
    pub engine_module: String,
}

impl ProjectInfo {
    pub fn new(project_dir: impl Into<PathBuf>, engine_module: &str) -> Self {
        Self {
            project_dir: project_dir.into(),
            engine_module: engine_module.to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegisterPath {
    pub relative_path: String,
    pub absolute_path: PathBuf,
}

/// Normalize and de-duplicate register paths, resolving them against the
/// project directory. Order of first appearance is kept.
pub fn get_type_register_paths<S: AsRef<str>>(paths: &[S], project: &ProjectInfo) -> Vec<RegisterPath> {
    let mut out: Vec<RegisterPath> = Vec::new();
    for p in paths {
        let Some(relative_path) = normalize_path(p.as_ref()) else {
            continue;
        };
        if out.iter().any(|r| r.relative_path == relative_path) {
            continue;
        }
        out.push(RegisterPath {
            absolute_path: project.project_dir.join(&relative_path),
            relative_path,
        });
    }
    out
}

/// Forward slashes, no `.` steps, no empty steps. Empty paths are dropped.
fn normalize_path(path: &str) -> Option<String> {
    let path = path.replace('\\', "/");
    let steps: Vec<&str> = path.split('/').filter(|s| !s.is_empty() && *s != ".").collect();
    if steps.is_empty() {
        return None;
    }
    Some(steps.join("/"))
}

/// Collects type imports per manifest and writes the manifests once.
#[derive(Debug, Default)]
pub struct TypeRegisterGenerator {
    manifests: BTreeMap<String, BTreeMap<String, TypeImport>>,
    finalized: bool,
}

impl TypeRegisterGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add contributions.
    ///
    /// The whole batch is checked before anything is stored: a type name
    /// bound to a different module or symbol than before fails with
    /// [`Error::DuplicateType`] and leaves the generator unchanged.
    pub fn register_types(&mut self, infos: &[TypeRegisterInfo], project: &ProjectInfo) -> Result<()> {
        let staged = self.stage(infos, project)?;
        for (path, imports) in staged {
            let manifest = self.manifests.entry(path).or_default();
            for import in imports {
                manifest.insert(import.type_name.clone(), import.clone());
            }
        }
        Ok(())
    }

    /// Check contributions as [`register_types`](Self::register_types)
    /// would, without storing them.
    pub fn check_types(&self, infos: &[TypeRegisterInfo], project: &ProjectInfo) -> Result<()> {
        self.stage(infos, project).map(|_| ())
    }

    fn stage<'i>(
        &self,
        infos: &'i [TypeRegisterInfo],
        project: &ProjectInfo,
    ) -> Result<Vec<(String, &'i [TypeImport])>> {
        if self.finalized {
            return Err(Error::ManifestFinalized);
        }

        let mut staged: HashMap<(String, String), &TypeImport> = HashMap::new();
        let mut resolved = Vec::with_capacity(infos.len());
        for info in infos {
            let Some(path) = get_type_register_paths(&[info.path.as_str()], project).pop() else {
                return Err(Error::invalid(format!("empty type register path '{}'", info.path)));
            };
            for import in &info.type_imports {
                let existing = self
                    .manifests
                    .get(&path.relative_path)
                    .and_then(|m| m.get(&import.type_name))
                    .or_else(|| staged.get(&(path.relative_path.clone(), import.type_name.clone())).copied());
                if let Some(existing) = existing {
                    if existing != import {
                        return Err(Error::DuplicateType {
                            type_name: import.type_name.clone(),
                            existing: existing.describe(),
                            incoming: import.describe(),
                        });
                    }
                }
                staged.insert((path.relative_path.clone(), import.type_name.clone()), import);
            }
            resolved.push((path.relative_path, info.type_imports.as_slice()));
        }
        Ok(resolved)
    }

    /// Register paths with at least one contribution.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.manifests.keys().map(String::as_str)
    }

    /// Types collected for `path`, sorted by type name.
    pub fn types_for(&self, path: &str) -> Vec<&TypeImport> {
        self.manifests
            .get(path)
            .map(|m| m.values().collect())
            .unwrap_or_default()
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Manifest source for one register path.
    pub fn render(&self, path: &str, project: &ProjectInfo) -> String {
        let types = self.types_for(path);

        // One binding per distinct (module, symbol); colliding local names
        // get a numeric suffix.
        let mut bindings: Vec<(&str, &str, String)> = Vec::new();
        let mut local_names: Vec<String> = vec!["TypeStore".to_string()];
        for t in &types {
            if bindings
                .iter()
                .any(|(m, s, _)| *m == t.module_path && *s == t.export_symbol)
            {
                continue;
            }
            let mut local = t.export_symbol.clone();
            let mut n = 2;
            while local_names.contains(&local) {
                local = format!("{}_{n}", t.export_symbol);
                n += 1;
            }
            local_names.push(local.clone());
            bindings.push((t.module_path.as_str(), t.export_symbol.as_str(), local));
        }

        let mut out = String::new();
        out.push_str("// Generated by sceneweave. Do not edit.\n");
        let _ = writeln!(out, "import {{ TypeStore }} from \"{}\";", project.engine_module);
        for (module, symbol, local) in &bindings {
            if *symbol == local.as_str() {
                let _ = writeln!(out, "import {{ {symbol} }} from \"{module}\";");
            } else {
                let _ = writeln!(out, "import {{ {symbol} as {local} }} from \"{module}\";");
            }
        }
        out.push('\n');
        for t in &types {
            let local = bindings
                .iter()
                .find(|(m, s, _)| *m == t.module_path && *s == t.export_symbol)
                .map(|(_, _, l)| l.as_str())
                .unwrap_or(&t.export_symbol);
            let _ = writeln!(out, "TypeStore.add(\"{}\", {local});", t.type_name);
        }
        out
    }

    /// Write every manifest and finalize.
    ///
    /// Each file goes through a temporary file in its directory, so a
    /// failed write leaves the previous manifest in place.
    pub fn emit(&mut self, project: &ProjectInfo) -> Result<Vec<PathBuf>> {
        if self.finalized {
            return Err(Error::ManifestFinalized);
        }

        let mut written = Vec::with_capacity(self.manifests.len());
        for path in self.manifests.keys() {
            let absolute = project.project_dir.join(path);
            let source = self.render(path, project);
            write_file(&absolute, source.as_bytes())?;
            tracing::debug!(
                "type register {} ({} types)",
                absolute.display(),
                self.manifests[path].len()
            );
            written.push(absolute);
        }
        self.finalized = true;
        Ok(written)
    }

    pub fn reset(&mut self) {
        self.manifests.clear();
        self.finalized = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project() -> ProjectInfo {
        ProjectInfo::new("/proj", "scene-runtime")
    }

    fn info(path: &str, imports: &[TypeImport]) -> TypeRegisterInfo {
        TypeRegisterInfo {
            path: path.into(),
            type_imports: imports.to_vec(),
        }
    }

    #[test]
    fn test_register_paths_normalized() {
        let paths = get_type_register_paths(
            &["src\\gen\\types.ts", "./src/gen//types.ts", "", "other.ts"],
            &project(),
        );
        assert_eq!(paths.len(), 2);
        assert_eq!(paths[0].relative_path, "src/gen/types.ts");
        assert_eq!(paths[0].absolute_path, PathBuf::from("/proj/src/gen/types.ts"));
        assert_eq!(paths[1].relative_path, "other.ts");
    }

    #[test]
    fn test_identical_imports_collapse() {
        let mut gen = TypeRegisterGenerator::new();
        let rot = TypeImport::new("Rotator", "scripts/Rotator", "Rotator");
        gen.register_types(&[info("a.ts", &[rot.clone()]), info("./a.ts", &[rot.clone()])], &project())
            .unwrap();
        gen.register_types(&[info("a.ts", &[rot])], &project()).unwrap();
        assert_eq!(gen.types_for("a.ts").len(), 1);
    }

    #[test]
    fn test_conflicting_import_rejected_atomically() {
        let mut gen = TypeRegisterGenerator::new();
        let p = project();
        gen.register_types(&[info("a.ts", &[TypeImport::new("Rotator", "x", "Rotator")])], &p)
            .unwrap();

        let batch = [
            info("a.ts", &[TypeImport::new("Light", "engine", "Light")]),
            info("a.ts", &[TypeImport::new("Rotator", "y", "Rotator")]),
        ];
        let err = gen.register_types(&batch, &p).unwrap_err();
        assert!(matches!(err, Error::DuplicateType { ref type_name, .. } if type_name == "Rotator"));
        // Light from the same batch was not applied.
        assert_eq!(gen.types_for("a.ts").len(), 1);

        // Conflicts inside one batch are caught as well.
        let batch = [info(
            "b.ts",
            &[TypeImport::new("Door", "a", "Door"), TypeImport::new("Door", "b", "Door")],
        )];
        assert!(gen.register_types(&batch, &p).is_err());
    }

    #[test]
    fn test_check_types_stores_nothing() {
        let mut gen = TypeRegisterGenerator::new();
        let p = project();
        let rot = [info("a.ts", &[TypeImport::new("Rotator", "x", "Rotator")])];
        gen.check_types(&rot, &p).unwrap();
        assert!(gen.types_for("a.ts").is_empty());

        gen.register_types(&rot, &p).unwrap();
        let clash = [info("a.ts", &[TypeImport::new("Rotator", "y", "Rotator")])];
        assert!(matches!(gen.check_types(&clash, &p), Err(Error::DuplicateType { .. })));
    }

    #[test]
    fn test_render_aliases_colliding_symbols() {
        let mut gen = TypeRegisterGenerator::new();
        let p = project();
        gen.register_types(
            &[info(
                "a.ts",
                &[
                    TypeImport::new("Game.Door", "scripts/door", "Door"),
                    TypeImport::new("Legacy.Door", "legacy/door", "Door"),
                    TypeImport::new("Game.DoorAlias", "scripts/door", "Door"),
                ],
            )],
            &p,
        )
        .unwrap();

        let src = gen.render("a.ts", &p);
        assert!(src.contains("import { TypeStore } from \"scene-runtime\";\n"));
        assert!(src.contains("import { Door } from \"scripts/door\";\n"));
        assert!(src.contains("import { Door as Door_2 } from \"legacy/door\";\n"));
        assert!(src.contains("TypeStore.add(\"Game.Door\", Door);\n"));
        assert!(src.contains("TypeStore.add(\"Game.DoorAlias\", Door);\n"));
        assert!(src.contains("TypeStore.add(\"Legacy.Door\", Door_2);\n"));
        assert_eq!(src.matches("import {").count(), 3);
    }

    #[test]
    fn test_emit_finalizes() {
        let dir = tempfile::tempdir().unwrap();
        let p = ProjectInfo::new(dir.path(), "scene-runtime");
        let mut gen = TypeRegisterGenerator::new();
        gen.register_types(&[info("gen/types.ts", &[TypeImport::new("Light", "engine", "Light")])], &p)
            .unwrap();

        let written = gen.emit(&p).unwrap();
        assert_eq!(written, [dir.path().join("gen/types.ts")]);
        let text = std::fs::read_to_string(&written[0]).unwrap();
        assert!(text.contains("TypeStore.add(\"Light\", Light);"));

        assert!(matches!(
            gen.register_types(&[info("gen/types.ts", &[])], &p),
            Err(Error::ManifestFinalized)
        ));
        gen.reset();
        assert!(gen.register_types(&[info("gen/types.ts", &[])], &p).is_ok());
    }
}
