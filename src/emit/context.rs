//! Per-run export state.

use std::fmt;

use crate::core::{ExportCache, ExportableObject, SceneGraph, SourceKey};
use crate::extension::ExtensionModel;
use crate::registry::ReferenceRegistry;
use crate::types::TypeRegisterGenerator;
use crate::util::NameAllocator;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

/// Recoverable problem recorded during a run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Object or asset the problem belongs to.
    pub subject: Option<String>,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        match &self.subject {
            Some(s) => write!(f, "{level}: {s}: {}", self.message),
            None => write!(f, "{level}: {}", self.message),
        }
    }
}

/// State shared by every component of one export run.
///
/// Created empty, reset synchronously when a run starts; nothing in it
/// outlives the run except what the caller persists (the cache).
#[derive(Debug, Default)]
pub struct ExportContext {
    pub registry: ReferenceRegistry,
    pub extensions: ExtensionModel,
    pub types: TypeRegisterGenerator,
    pub cache: ExportCache,
    pub names: NameAllocator,
    diagnostics: Vec<Diagnostic>,
    is_in_gltf: bool,
    scene_objects: Option<Vec<SourceKey>>,
}

impl ExportContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop all state of a previous run.
    pub fn reset(&mut self) {
        self.registry.clear_cache();
        self.extensions.reset();
        self.types.reset();
        self.cache.clear();
        self.names.clear();
        self.diagnostics.clear();
        self.is_in_gltf = false;
        self.scene_objects = None;
    }

    /// Whether a sub-asset is currently being exported.
    pub fn is_in_gltf(&self) -> bool {
        self.is_in_gltf
    }

    pub(crate) fn set_in_gltf(&mut self, value: bool) {
        self.is_in_gltf = value;
    }

    /// Sub-asset roots of `graph`, enumerated once and then cached until
    /// the next reset.
    pub fn scene_objects(&mut self, graph: &SceneGraph) -> &[SourceKey] {
        self.scene_objects.get_or_insert_with(|| {
            graph
                .outermost_sub_assets()
                .into_iter()
                .map(|o| o.key.clone())
                .collect()
        })
    }

    /// `(index, count)` of `obj` in the scene object list; objects outside
    /// it report `(0, 1)`.
    pub fn progress_slot(&mut self, graph: &SceneGraph, obj: &ExportableObject) -> (usize, usize) {
        let list = self.scene_objects(graph);
        match list.iter().position(|k| k == &obj.key) {
            Some(i) => (i, list.len()),
            None => (0, 1),
        }
    }

    pub fn warn(&mut self, subject: Option<&str>, message: impl Into<String>) {
        let message = message.into();
        match subject {
            Some(s) => tracing::warn!("{s}: {message}"),
            None => tracing::warn!("{message}"),
        }
        self.diagnostics.push(Diagnostic {
            severity: Severity::Warning,
            subject: subject.map(str::to_string),
            message,
        });
    }

    pub fn error(&mut self, subject: Option<&str>, message: impl Into<String>) {
        let message = message.into();
        tracing::error!("{}: {message}", subject.unwrap_or("export"));
        self.diagnostics.push(Diagnostic {
            severity: Severity::Error,
            subject: subject.map(str::to_string),
            message,
        });
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }
}
