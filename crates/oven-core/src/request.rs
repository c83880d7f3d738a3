//! The form-encoded installation request
//!
//! One `InstallRequest` is decoded per browser submission. It is never
//! persisted; the browser re-sends the relevant fields with every step.

use serde::Deserialize;
use std::path::{Path, PathBuf};

fn default_dir() -> String {
    "app".to_string()
}

/// Fields of a single action request. All fields except `action` are
/// optional; missing checkbox-style fields count as unset.
#[derive(Debug, Clone, Deserialize)]
pub struct InstallRequest {
    /// Selected action name (e.g. `checkPath`, `createProject`).
    #[serde(default)]
    pub action: String,

    /// Target directory, relative to the server base directory.
    #[serde(default = "default_dir")]
    pub dir: String,

    /// Framework version label selected from the catalog, or the package
    /// version for `installPackage`.
    #[serde(default)]
    pub version: Option<String>,

    /// Package name for `installPackage`.
    #[serde(default)]
    pub package: Option<String>,

    /// Dev-dependency flag for `installPackage` ("1"/"0").
    #[serde(default)]
    pub dev: Option<String>,

    #[serde(default)]
    pub host: Option<String>,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    #[serde(default)]
    pub database: Option<String>,

    /// Whether to install and register the Mixer plugin.
    #[serde(default, rename = "installMixer")]
    pub install_mixer: Option<String>,

    /// Explicit path to a Composer archive or binary.
    #[serde(default, rename = "composerPath")]
    pub composer_path: Option<String>,
}

impl Default for InstallRequest {
    fn default() -> Self {
        Self {
            action: String::new(),
            dir: default_dir(),
            version: None,
            package: None,
            dev: None,
            host: None,
            username: None,
            password: None,
            database: None,
            install_mixer: None,
            composer_path: None,
        }
    }
}

impl InstallRequest {
    /// Absolute install directory for this request.
    pub fn install_dir(&self, base_dir: &Path) -> PathBuf {
        base_dir.join(&self.dir)
    }

    pub fn mixer_requested(&self) -> bool {
        truthy(&self.install_mixer)
    }

    pub fn dev_requested(&self) -> bool {
        truthy(&self.dev)
    }
}

/// Form checkboxes arrive as strings; treat "", "0" and "false" as unset.
fn truthy(value: &Option<String>) -> bool {
    matches!(
        value.as_deref(),
        Some(v) if !v.is_empty() && v != "0" && !v.eq_ignore_ascii_case("false")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_dir_defaults_to_app() {
        let req: InstallRequest = serde_json::from_str(r#"{"action":"checkPath"}"#).unwrap();
        assert_eq!(req.dir, "app");
        assert_eq!(req.install_dir(Path::new("/srv")), Path::new("/srv/app"));
    }

    #[test]
    fn test_checkbox_truthiness() {
        let mut req = InstallRequest::default();
        assert!(!req.mixer_requested());

        req.install_mixer = Some("0".to_string());
        assert!(!req.mixer_requested());

        req.install_mixer = Some("1".to_string());
        assert!(req.mixer_requested());

        req.dev = Some("false".to_string());
        assert!(!req.dev_requested());
    }
}
