//! Persistent export settings

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::util::{Error, Result};

/// Default settings file name looked up in the project directory.
pub const SETTINGS_FILE_NAME: &str = "sceneweave.toml";

/// Runtime npm package the exported project must depend on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeDependency {
    pub package: String,
    pub version: String,
    /// Command run (in the project directory) when the installed version is
    /// off; empty disables repair.
    pub repair_command: Vec<String>,
}

impl Default for RuntimeDependency {
    fn default() -> Self {
        Self {
            package: "scene-runtime".into(),
            version: "1.0.0".into(),
            repair_command: vec!["npm".into(), "install".into()],
        }
    }
}

/// Settings of one export project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    // Locations
    pub project_dir: PathBuf,
    /// Asset output directory, relative to the project directory.
    pub output_dir: PathBuf,
    /// Type register manifests, relative to the project directory.
    pub register_paths: Vec<String>,
    /// Loader module file name inside the output directory.
    pub loader_file: String,

    // Generated code
    pub engine_module: String,
    /// Module for component types that do not name one.
    pub default_module: Option<String>,
    pub parent_var: String,
    /// Prefix of asset URLs in the loader module.
    pub asset_url_prefix: String,

    // Output
    pub binary: bool,
    pub use_cache: bool,
    pub mesh_compression: bool,

    pub runtime_dependency: Option<RuntimeDependency>,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            project_dir: PathBuf::from("."),
            output_dir: PathBuf::from("assets"),
            register_paths: vec!["src/generated/register_types.ts".into()],
            loader_file: "scene_loader.ts".into(),
            engine_module: "scene-runtime".into(),
            default_module: None,
            parent_var: "parent".into(),
            asset_url_prefix: "./".into(),
            binary: false,
            use_cache: true,
            mesh_compression: false,
            runtime_dependency: None,
        }
    }
}

impl ExportSettings {
    /// Load settings from a TOML file, or JSON when the extension says so.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::FileNotFound(path.to_path_buf()),
            _ => Error::Io(e),
        })?;

        let mut settings: Self = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&text).map_err(|e| Error::Config(e.to_string()))?,
            _ => toml::from_str(&text)?,
        };

        // A relative project dir is relative to the settings file.
        if settings.project_dir.is_relative() {
            if let Some(parent) = path.parent() {
                settings.project_dir = parent.join(&settings.project_dir);
            }
        }
        Ok(settings)
    }

    /// `sceneweave.toml` of `project_dir` if present, defaults otherwise.
    pub fn discover(project_dir: &Path) -> Result<Self> {
        let candidate = project_dir.join(SETTINGS_FILE_NAME);
        if candidate.is_file() {
            return Self::load(candidate);
        }
        Ok(Self {
            project_dir: project_dir.to_path_buf(),
            ..Self::default()
        })
    }

    /// Absolute output directory.
    pub fn output_path(&self) -> PathBuf {
        if self.output_dir.is_absolute() {
            self.output_dir.clone()
        } else {
            self.project_dir.join(&self.output_dir)
        }
    }

    /// Module for types without one of their own.
    pub fn fallback_module(&self) -> &str {
        self.default_module.as_deref().unwrap_or(&self.engine_module)
    }

    /// Per-user cache directory for state that does not belong in the
    /// project.
    pub fn cache_dir() -> Option<PathBuf> {
        dirs::cache_dir().map(|p| p.join("sceneweave"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_toml_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE_NAME);
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "output_dir = \"web/assets\"\nbinary = true").unwrap();
        writeln!(f, "[runtime_dependency]\nversion = \"2.1.0\"").unwrap();
        drop(f);

        let s = ExportSettings::load(&path).unwrap();
        assert!(s.binary);
        assert!(s.use_cache);
        assert_eq!(s.output_path(), dir.path().join(".").join("web/assets"));
        let dep = s.runtime_dependency.unwrap();
        assert_eq!(dep.version, "2.1.0");
        assert_eq!(dep.package, "scene-runtime");
    }

    #[test]
    fn test_load_json_and_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"engine_module": "@acme/engine", "use_cache": false}"#).unwrap();
        let s = ExportSettings::load(&path).unwrap();
        assert_eq!(s.fallback_module(), "@acme/engine");
        assert!(!s.use_cache);

        let bad = dir.path().join("bad.toml");
        std::fs::write(&bad, "binary = [").unwrap();
        assert!(matches!(ExportSettings::load(&bad), Err(Error::Config(_))));
        assert!(matches!(
            ExportSettings::load(dir.path().join("missing.toml")),
            Err(Error::FileNotFound(_))
        ));
    }

    #[test]
    fn test_discover_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let s = ExportSettings::discover(dir.path()).unwrap();
        assert_eq!(s.project_dir, dir.path());
        assert_eq!(s.register_paths, ["src/generated/register_types.ts"]);
    }
}
