//! Export project configuration.

mod settings;

pub use settings::{ExportSettings, RuntimeDependency, SETTINGS_FILE_NAME};
