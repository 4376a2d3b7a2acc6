//! Generated loader module.
//!
//! The module loads every exported sub-asset in scene order, attaches each
//! to the parent object and reports aggregate progress.

use std::fmt::Write as _;

use crate::util::sanitize_identifier;

/// One sub-asset the loader pulls in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoaderEntry {
    /// URL relative to the loader module.
    pub relative_path: String,
    /// File stem, used to name the local variable.
    pub stem: String,
    pub index: usize,
    pub count: usize,
}

/// Render the loader module; every URL carries `?v=<version>`.
pub fn loader_module(entries: &[LoaderEntry], version: &str, parent_var: &str) -> String {
    let mut out = String::new();
    out.push_str("// Generated by sceneweave. Do not edit.\n");
    let _ = writeln!(
        out,
        "export async function loadSubAssets(context, loader, {parent_var}, onProgress) {{"
    );
    for e in entries {
        let var = format!("asset_{}", sanitize_identifier(&e.stem));
        let _ = writeln!(
            out,
            "    const {var} = await loader.loadSync(context, \"{}?v={version}\", null, false, \
             (p) => onProgress && onProgress({} / {count} + p / {count}));",
            escape(&e.relative_path),
            e.index,
            count = e.count.max(1),
        );
        let _ = writeln!(out, "    if({var}) {parent_var}.add({var}.scene);");
    }
    out.push_str("}\n");
    out
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}
