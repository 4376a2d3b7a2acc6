//! Export runs.
//!
//! One run exports every outermost sub-asset of a scene into its own file,
//! then writes the loader module and the type register manifests. A failing
//! sub-asset yields a failed [`ExportResult`] and the run carries on.

use std::fmt::Write as _;
use std::path::PathBuf;

use super::codegen::{loader_module, LoaderEntry};
use super::context::{Diagnostic, ExportContext};
use super::document::{serialize_nodes, GltfDocument};
use super::glb::write_glb;
use super::guard::ExportGuard;
use super::output::write_file;
use super::serializer::Serializer;
use crate::config::ExportSettings;
use crate::core::{ContentKey, ExportCache, ExportableObject, ObjectId, SceneGraph};
use crate::extension::{PrecompiledTechniques, TechniqueCompiler};
use crate::resolve::ResolverChain;
use crate::tasks::{ensure_dependency, BackgroundTasks};
use crate::types::{ProjectInfo, TypeRegisterInfo};
use crate::util::{Error, Result};

/// Outcome of exporting one sub-asset.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExportResult {
    pub name: String,
    pub id: Option<ObjectId>,
    /// File name inside the output directory.
    pub path: Option<String>,
    pub index: usize,
    pub count: usize,
    pub success: bool,
    /// Output was current and not rewritten.
    pub cached: bool,
    /// Not exported because another sub-asset export was in progress.
    pub skipped: bool,
    pub digest: Option<String>,
    pub error: Option<String>,
}

impl ExportResult {
    fn new(name: &str, index: usize, count: usize) -> Self {
        Self {
            name: name.to_string(),
            index,
            count,
            ..Self::default()
        }
    }

    fn failed(mut self, err: &Error) -> Self {
        self.success = false;
        self.error = Some(err.to_string());
        self
    }
}

/// Outcome of a whole run.
#[derive(Debug, Default)]
pub struct ExportReport {
    pub results: Vec<ExportResult>,
    pub loader: Option<PathBuf>,
    pub manifests: Vec<PathBuf>,
    /// Hash over every exported file; the loader's cache-busting token.
    pub version: String,
    pub diagnostics: Vec<Diagnostic>,
}

impl ExportReport {
    pub fn succeeded(&self) -> impl Iterator<Item = &ExportResult> {
        self.results.iter().filter(|r| r.success)
    }

    pub fn failed(&self) -> impl Iterator<Item = &ExportResult> {
        self.results.iter().filter(|r| !r.success && !r.skipped)
    }

    pub fn is_success(&self) -> bool {
        self.failed().next().is_none()
    }

    /// Some sub-assets exported, some failed.
    pub fn is_partial(&self) -> bool {
        !self.is_success() && self.succeeded().next().is_some()
    }

    pub fn summary(&self) -> String {
        let total = self.results.len();
        let ok = self.succeeded().count();
        let cached = self.succeeded().filter(|r| r.cached).count();

        if total == 0 {
            return "no sub-assets to export".to_string();
        }
        let mut out = if self.is_success() {
            format!("exported {ok} sub-assets ({cached} cached)")
        } else if self.is_partial() {
            format!("partial export: {ok} of {total} sub-assets exported")
        } else {
            format!("export failed: none of {total} sub-assets exported")
        };
        for r in self.failed() {
            let _ = write!(out, "\n  {}: {}", r.name, r.error.as_deref().unwrap_or("unknown error"));
        }
        out
    }
}

/// Exporter holding resolvers, the shader backend and run state.
pub struct Exporter {
    settings: ExportSettings,
    chain: ResolverChain,
    compiler: Box<dyn TechniqueCompiler + Send + Sync>,
    tasks: BackgroundTasks,
    cx: ExportContext,
}

impl Exporter {
    /// Exporter with the default resolvers and precompiled techniques.
    pub fn new(settings: ExportSettings) -> Self {
        Self {
            settings,
            chain: ResolverChain::with_defaults(),
            compiler: Box::new(PrecompiledTechniques),
            tasks: BackgroundTasks::new(),
            cx: ExportContext::new(),
        }
    }

    pub fn with_compiler(mut self, compiler: impl TechniqueCompiler + Send + Sync + 'static) -> Self {
        self.compiler = Box::new(compiler);
        self
    }

    pub fn with_chain(mut self, chain: ResolverChain) -> Self {
        self.chain = chain;
        self
    }

    pub fn settings(&self) -> &ExportSettings {
        &self.settings
    }

    pub fn context(&self) -> &ExportContext {
        &self.cx
    }

    pub fn tasks(&self) -> &BackgroundTasks {
        &self.tasks
    }

    fn project(&self) -> ProjectInfo {
        ProjectInfo::new(&self.settings.project_dir, &self.settings.engine_module)
    }

    /// Export every outermost sub-asset of `graph`.
    ///
    /// Only run-level problems are errors: a concurrent run, or an output
    /// directory that cannot be created or written.
    #[tracing::instrument(skip_all, fields(scene = graph.name()))]
    pub fn export_scene(&mut self, graph: &SceneGraph) -> Result<ExportReport> {
        let _guard = ExportGuard::acquire()?;
        let out_dir = self.begin_run()?;

        let roots = self.cx.scene_objects(graph).to_vec();
        tracing::info!("exporting {} sub-assets to {}", roots.len(), out_dir.display());

        let mut results = Vec::with_capacity(roots.len());
        for key in &roots {
            let Some(node) = graph.get(key) else {
                continue;
            };
            results.push(self.export_one(graph, node));
        }

        let version = murmur3::hash_parts(results.iter().filter_map(|r| r.digest.as_deref())).short_hex(16);
        let entries: Vec<LoaderEntry> = results
            .iter()
            .filter(|r| r.success)
            .filter_map(|r| {
                let file = r.path.as_ref()?;
                let stem = file.rsplit_once('.').map(|(s, _)| s).unwrap_or(file);
                Some(LoaderEntry {
                    relative_path: format!("{}{file}", self.settings.asset_url_prefix),
                    stem: stem.to_string(),
                    index: r.index,
                    count: r.count,
                })
            })
            .collect();
        let loader_src = loader_module(&entries, &version, &self.settings.parent_var);
        let loader = write_file(out_dir.join(&self.settings.loader_file), loader_src.as_bytes())?;

        let project = self.project();
        let manifests = self.cx.types.emit(&project)?;

        let live: Vec<ObjectId> = results
            .iter()
            .filter(|r| r.success)
            .filter_map(|r| r.id.clone())
            .collect();
        self.save_cache(Some(&live));

        let report = ExportReport {
            results,
            loader: Some(loader),
            manifests,
            version,
            diagnostics: self.cx.take_diagnostics(),
        };
        tracing::info!("{}", report.summary());
        Ok(report)
    }

    /// Export one sub-asset root as a run of its own.
    ///
    /// The context starts clean, as in [`export_scene`](Self::export_scene),
    /// and the type register manifests are written afterwards. The loader
    /// module is left as it is. A request made while a sub-asset is being
    /// serialized is skipped.
    #[tracing::instrument(skip_all, fields(node = %node.name))]
    pub fn run(&mut self, graph: &SceneGraph, node: &ExportableObject) -> ExportResult {
        if self.cx.is_in_gltf() {
            return self.export_one(graph, node);
        }
        let _guard = match ExportGuard::acquire() {
            Ok(guard) => guard,
            Err(e) => return ExportResult::new(&node.name, 0, 0).failed(&e),
        };
        if let Err(e) = self.begin_run() {
            return ExportResult::new(&node.name, 0, 0).failed(&e);
        }

        let mut result = self.export_one(graph, node);
        let project = self.project();
        if let Err(e) = self.cx.types.emit(&project) {
            self.cx.error(Some(&node.name), e.to_string());
            result = result.failed(&e);
        }
        self.save_cache(None);
        result
    }

    /// Fresh context, output directory, cache, dependency check and empty
    /// manifests for every register path. Returns the output directory.
    fn begin_run(&mut self) -> Result<PathBuf> {
        self.cx.reset();
        self.chain.reset_all();

        let out_dir = self.settings.output_path();
        std::fs::create_dir_all(&out_dir)?;
        if self.settings.use_cache {
            self.cx.cache = ExportCache::load(&out_dir);
        }
        if let Some(dep) = &self.settings.runtime_dependency {
            ensure_dependency(&self.tasks, &self.settings.project_dir, dep);
        }

        // Every configured manifest is written, even when no type lands in it.
        let empty: Vec<TypeRegisterInfo> = self
            .settings
            .register_paths
            .iter()
            .map(|p| TypeRegisterInfo {
                path: p.clone(),
                type_imports: Vec::new(),
            })
            .collect();
        let project = self.project();
        self.cx.types.register_types(&empty, &project)?;
        Ok(out_dir)
    }

    /// Persist the export cache, dropping entries not in `live` when given.
    fn save_cache(&mut self, live: Option<&[ObjectId]>) {
        if !self.settings.use_cache {
            return;
        }
        if let Some(live) = live {
            self.cx.cache.retain_ids(live);
        }
        if let Err(e) = self.cx.cache.save(&self.settings.output_path()) {
            self.cx.warn(None, format!("export cache not saved: {e}"));
        }
    }

    /// Export one sub-asset root inside a started run.
    fn export_one(&mut self, graph: &SceneGraph, node: &ExportableObject) -> ExportResult {
        let (index, count) = self.cx.progress_slot(graph, node);
        let mut result = ExportResult::new(&node.name, index, count);

        if self.cx.is_in_gltf() {
            tracing::debug!("{}: nested export request skipped", node.name);
            result.skipped = true;
            return result;
        }

        let Some(id) = self.cx.registry.get_id(graph, node) else {
            let err = Error::ObjectNotFound(format!("'{}' has no identity", node.name));
            return self.finish_result(result.failed(&err));
        };
        result.id = Some(id.clone());

        self.cx.set_in_gltf(true);
        let document = self.build_document(graph, node);
        self.cx.set_in_gltf(false);
        let document = match document {
            Ok(doc) => doc,
            Err(e) => return self.finish_result(result.failed(&e)),
        };

        let result = match self.write_document(&id, &node.name, document) {
            Ok((file, digest, cached)) => {
                result.path = Some(file);
                result.digest = Some(digest);
                result.cached = cached;
                result.success = true;
                result
            }
            Err(e) => result.failed(&e),
        };
        self.finish_result(result)
    }

    fn finish_result(&mut self, result: ExportResult) -> ExportResult {
        match &result.error {
            Some(e) => self.cx.error(Some(&result.name), e.clone()),
            None if result.cached => tracing::debug!("{}: unchanged", result.name),
            None => tracing::info!("{}: wrote {}", result.name, result.path.as_deref().unwrap_or("")),
        }
        result
    }

    fn build_document(&mut self, graph: &SceneGraph, root: &ExportableObject) -> Result<GltfDocument> {
        let mark = self.cx.registry.mark();
        let (nodes, objects) = {
            let mut ser = Serializer::new(
                graph,
                &self.chain,
                &self.settings,
                &*self.compiler,
                &mut self.cx,
                &root.name,
            );
            let nodes = serialize_nodes(&mut ser, root);
            (nodes, ser.finish())
        };
        Ok(GltfDocument::assemble(&root.name, nodes, objects?, &self.cx, mark))
    }

    /// Write the document unless the cached copy is current, then register
    /// its types. Conflicting types fail the document before anything is
    /// written. Returns `(file, digest, cached)`.
    fn write_document(&mut self, id: &ObjectId, name: &str, doc: GltfDocument) -> Result<(String, String, bool)> {
        let json = doc.to_bytes()?;
        let bytes = if self.settings.binary { write_glb(&json)? } else { json };

        let project = self.project();
        let infos: Vec<TypeRegisterInfo> = self
            .settings
            .register_paths
            .iter()
            .map(|p| TypeRegisterInfo {
                path: p.clone(),
                type_imports: doc.type_imports.clone(),
            })
            .collect();
        self.cx.types.check_types(&infos, &project)?;

        let ext = if self.settings.binary { "glb" } else { "gltf" };
        let file = format!("{}.{ext}", self.cx.names.allocate(name, id.as_str()));
        let key = ContentKey::from_data(id.clone(), &bytes);
        let out_dir = self.settings.output_path();

        let cached = self.settings.use_cache && self.cx.cache.is_current(&key, &file, &out_dir);
        if !cached {
            write_file(out_dir.join(&file), &bytes)?;
            self.cx.cache.record(&key, &file);
        }
        self.cx.types.register_types(&infos, &project)?;
        Ok((file, key.digest_hex(), cached))
    }
}

impl std::fmt::Debug for Exporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Exporter")
            .field("settings", &self.settings)
            .field("chain", &self.chain)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SceneSource;

    static EXPORT_LOCK: parking_lot::Mutex<()> = parking_lot::const_mutex(());

    fn settings(dir: &std::path::Path) -> ExportSettings {
        ExportSettings {
            project_dir: dir.to_path_buf(),
            ..ExportSettings::default()
        }
    }

    #[test]
    fn test_run_inside_sub_asset_is_skipped() {
        let _lock = EXPORT_LOCK.lock();
        let dir = tempfile::tempdir().unwrap();
        let g = SceneGraph::from_source(SceneSource::new("S").with(ExportableObject::node("1", "A").as_sub_asset()))
            .unwrap();
        let mut exporter = Exporter::new(settings(dir.path()));
        exporter.cx.set_in_gltf(true);
        let result = exporter.run(&g, g.by_key("1").unwrap());
        assert!(result.skipped);
        assert!(!result.success);
        assert!(result.error.is_none());
    }

    #[test]
    fn test_run_writes_file_and_resets_flag() {
        let _lock = EXPORT_LOCK.lock();
        let dir = tempfile::tempdir().unwrap();
        let g = SceneGraph::from_source(
            SceneSource::new("S")
                .with(ExportableObject::node("1", "Level 1").as_sub_asset())
                .with(ExportableObject::node("2", "Other").as_sub_asset()),
        )
        .unwrap();
        let mut exporter = Exporter::new(settings(dir.path()));
        let result = exporter.run(&g, g.by_key("2").unwrap());
        assert!(result.success, "{:?}", result.error);
        assert_eq!((result.index, result.count), (1, 2));
        assert_eq!(result.path.as_deref(), Some("Other.gltf"));
        assert!(!exporter.context().is_in_gltf());
        assert!(dir.path().join("assets/Other.gltf").is_file());
        assert!(dir.path().join("src/generated/register_types.ts").is_file());
        assert!(!ExportGuard::is_exporting());
    }

    #[test]
    fn test_run_after_export_scene_starts_fresh() {
        let _lock = EXPORT_LOCK.lock();
        let dir = tempfile::tempdir().unwrap();
        let g = SceneGraph::from_source(
            SceneSource::new("S")
                .with(ExportableObject::node("1", "A").as_sub_asset())
                .with(ExportableObject::component("2", "1", "Spinner").with_module("./spinner")),
        )
        .unwrap();
        let mut exporter = Exporter::new(settings(dir.path()));
        let report = exporter.export_scene(&g).unwrap();
        assert!(report.is_success(), "{}", report.summary());
        assert!(exporter.context().types.is_finalized());

        let result = exporter.run(&g, g.by_key("1").unwrap());
        assert!(result.success, "{:?}", result.error);
        // Same name as before: the allocator was reset with the context.
        assert_eq!(result.path.as_deref(), Some("A.gltf"));
        assert!(result.cached);
        let manifest = std::fs::read_to_string(dir.path().join("src/generated/register_types.ts")).unwrap();
        assert!(manifest.contains("import { Spinner } from \"./spinner\";"));
    }

    #[test]
    fn test_run_while_guard_held_fails() {
        let _lock = EXPORT_LOCK.lock();
        let dir = tempfile::tempdir().unwrap();
        let g = SceneGraph::from_source(SceneSource::new("S").with(ExportableObject::node("1", "A").as_sub_asset()))
            .unwrap();
        let mut exporter = Exporter::new(settings(dir.path()));
        let _held = ExportGuard::acquire().unwrap();
        let result = exporter.run(&g, g.by_key("1").unwrap());
        assert!(!result.success);
        assert!(!result.skipped);
        assert!(!dir.path().join("assets/A.gltf").exists());
    }

    #[test]
    fn test_summary_wording() {
        let ok = ExportResult {
            success: true,
            ..ExportResult::new("A", 0, 2)
        };
        let bad = ExportResult {
            error: Some("boom".into()),
            ..ExportResult::new("B", 1, 2)
        };
        let partial = ExportReport {
            results: vec![ok.clone(), bad.clone()],
            ..ExportReport::default()
        };
        assert!(partial.is_partial());
        assert_eq!(partial.summary(), "partial export: 1 of 2 sub-assets exported\n  B: boom");

        let total = ExportReport {
            results: vec![bad],
            ..ExportReport::default()
        };
        assert!(!total.is_partial());
        assert!(total.summary().starts_with("export failed"));

        let fine = ExportReport {
            results: vec![ok],
            ..ExportReport::default()
        };
        assert_eq!(fine.summary(), "exported 1 sub-assets (0 cached)");
    }
}
