//! Runtime package dependency check.
//!
//! A project whose `package.json` pins another version of the runtime
//! package than this exporter targets still exports; a one-shot repair
//! command is started in the background.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use serde::Deserialize;

use super::background::BackgroundTasks;
use crate::config::{ExportSettings, RuntimeDependency};
use crate::util::{sanitize_identifier, Error, Result};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DependencyState {
    Satisfied,
    /// No `package.json` in the project; nothing to check.
    NoManifest,
    Missing,
    Mismatch { installed: String, required: String },
}

impl DependencyState {
    pub fn needs_repair(&self) -> bool {
        matches!(self, Self::Missing | Self::Mismatch { .. })
    }
}

#[derive(Debug, Default, Deserialize)]
struct PackageJson {
    #[serde(default)]
    dependencies: std::collections::BTreeMap<String, String>,
    #[serde(default, rename = "devDependencies")]
    dev_dependencies: std::collections::BTreeMap<String, String>,
}

/// Strip range operators from a version spec (`^1.2.0` -> `1.2.0`).
fn bare_version(spec: &str) -> &str {
    spec.trim().trim_start_matches(['^', '~', '=', 'v'])
}

/// Compare the project's declared runtime version with `dep`.
pub fn check_dependency(project_dir: &Path, dep: &RuntimeDependency) -> Result<DependencyState> {
    let manifest = project_dir.join("package.json");
    let text = match std::fs::read_to_string(&manifest) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(DependencyState::NoManifest),
        Err(e) => return Err(e.into()),
    };
    let pkg: PackageJson = serde_json::from_str(&text)?;

    let Some(spec) = pkg
        .dependencies
        .get(&dep.package)
        .or_else(|| pkg.dev_dependencies.get(&dep.package))
    else {
        return Ok(DependencyState::Missing);
    };

    let installed = bare_version(spec);
    if installed == bare_version(&dep.version) {
        Ok(DependencyState::Satisfied)
    } else {
        Ok(DependencyState::Mismatch {
            installed: installed.to_string(),
            required: dep.version.clone(),
        })
    }
}

/// Check `dep` and start its repair command in the background when needed.
/// Check errors are logged and treated as satisfied.
pub fn ensure_dependency(tasks: &BackgroundTasks, project_dir: &Path, dep: &RuntimeDependency) -> DependencyState {
    let state = match check_dependency(project_dir, dep) {
        Ok(state) => state,
        Err(e) => {
            tracing::warn!("could not check {}: {e}", dep.package);
            return DependencyState::Satisfied;
        }
    };
    if !state.needs_repair() {
        return state;
    }

    let Some((program, args)) = dep.repair_command.split_first() else {
        tracing::warn!("{} needs {}; no repair command configured", dep.package, dep.version);
        return state;
    };
    tracing::info!("{} is {state:?}; starting repair in background", dep.package);

    let program = program.clone();
    let args = args.to_vec();
    let dir = project_dir.to_path_buf();
    let key = format!("repair-{}", dep.package);
    let log = repair_log(&key);
    tasks.spawn_once(&key, move || {
        let stdout = match log {
            Some(path) => Stdio::from(std::fs::File::create(path)?),
            None => Stdio::null(),
        };
        let status = Command::new(&program)
            .args(&args)
            .current_dir(&dir)
            .stdin(Stdio::null())
            .stdout(stdout)
            .status()?;
        if status.success() {
            Ok(())
        } else {
            Err(Error::other(format!("'{program}' exited with {status}")))
        }
    });
    state
}

/// Output file for a repair command under the user cache directory.
fn repair_log(key: &str) -> Option<PathBuf> {
    let dir = ExportSettings::cache_dir()?;
    std::fs::create_dir_all(&dir).ok()?;
    Some(dir.join(format!("{}.log", sanitize_identifier(key))))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dep(version: &str) -> RuntimeDependency {
        RuntimeDependency {
            package: "scene-runtime".into(),
            version: version.into(),
            repair_command: vec![],
        }
    }

    #[test]
    fn test_states() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(check_dependency(dir.path(), &dep("1.0.0")).unwrap(), DependencyState::NoManifest);

        std::fs::write(
            dir.path().join("package.json"),
            r#"{"dependencies": {"scene-runtime": "^1.0.0"}, "devDependencies": {"other": "2"}}"#,
        )
        .unwrap();
        assert_eq!(check_dependency(dir.path(), &dep("1.0.0")).unwrap(), DependencyState::Satisfied);
        assert_eq!(
            check_dependency(dir.path(), &dep("1.2.0")).unwrap(),
            DependencyState::Mismatch {
                installed: "1.0.0".into(),
                required: "1.2.0".into()
            }
        );

        let missing = RuntimeDependency {
            package: "absent".into(),
            ..dep("1.0.0")
        };
        assert_eq!(check_dependency(dir.path(), &missing).unwrap(), DependencyState::Missing);
    }

    #[test]
    fn test_mismatch_without_command_does_not_spawn() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("package.json"), r#"{"dependencies": {"scene-runtime": "0.9.0"}}"#)
            .unwrap();
        let tasks = BackgroundTasks::new();
        let state = ensure_dependency(&tasks, dir.path(), &dep("1.0.0"));
        assert!(state.needs_repair());
        tasks.join_all();
        assert!(tasks.status().snapshot().is_empty());
    }
}
