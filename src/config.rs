// Settings persistence for the upload form. The form is prefilled from
// `config.json` on launch and the current values are written back right
// before an upload batch starts, so a half-typed session is never saved.
//
// NOTE: the API keys are stored in plain text next to the binary. That is
// a known weakness carried over from the workflow this tool replaces; do
// not put service-wide credentials in here.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default location of the settings file, relative to the working
/// directory the tool is launched from.
pub const CONFIG_FILE: &str = "config.json";

/// The six fields of the upload form. Everything is kept as a string,
/// including `project_id`, because the values round-trip through text
/// inputs; parsing happens at submit time in `batch::validate`.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub host: String,
    pub upload_host: String,
    pub public_key: String,
    pub private_key: String,
    pub project_id: String,
    pub directory_path: String,
}

impl Settings {
    /// Load settings from `path`. A missing file is not an error: the
    /// form simply starts empty, matching a first launch.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Settings::default());
        }
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let settings = serde_json::from_str(&data)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(settings)
    }

    /// Write the current values to `path` as pretty-printed JSON so the
    /// file stays hand-editable.
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let data = serde_json::to_string_pretty(self).context("Serializing settings")?;
        std::fs::write(path, data)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }
}
