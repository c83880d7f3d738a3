//! Manifest (composer.json) handling
//!
//! The bootstrapper backs up the generated manifest, strips its dependency
//! declarations and lifecycle hooks so installs run one step at a time
//! under orchestration, and restores the hooks at finalisation. The backup
//! is also the source of truth for the Allowed Package Set.

use crate::error::{InstallError, Result};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::Path;
use tokio::fs;

pub const MANIFEST_FILENAME: &str = "composer.json";
pub const BACKUP_FILENAME: &str = "composer.json.bak";

/// Optional plugin offered by the installer; the only installable package
/// not declared by the skeleton's own manifest.
pub const MIXER_PACKAGE: &str = "CakeDC/Mixer";
pub const MIXER_VERSION: &str = "@stable";

/// Platform requirement key excluded from dependency enumeration.
const PLATFORM_PACKAGE: &str = "php";

/// Lifecycle hooks stripped from the live manifest during installation.
const SUSPENDED_HOOKS: &[&str] = &["post-install-cmd", "post-create-project-cmd"];

/// A parsed manifest document. Key order is preserved so saved files stay
/// diffable against what Composer generated.
#[derive(Debug, Clone)]
pub struct Manifest {
    root: Map<String, Value>,
}

impl Manifest {
    pub async fn open(dir: &Path) -> Result<Self> {
        Self::open_named(dir, MANIFEST_FILENAME).await
    }

    pub async fn open_backup(dir: &Path) -> Result<Self> {
        Self::open_named(dir, BACKUP_FILENAME).await
    }

    async fn open_named(dir: &Path, filename: &str) -> Result<Self> {
        let path = dir.join(filename);
        let contents = fs::read_to_string(&path).await?;
        let root: Map<String, Value> = serde_json::from_str(&contents).map_err(|err| {
            InstallError::precondition(format!("Could not parse {}: {err}", path.display()))
        })?;

        Ok(Self { root })
    }

    pub async fn save(&self, dir: &Path) -> Result<()> {
        let contents = serde_json::to_string_pretty(&self.root).map_err(|err| {
            InstallError::precondition(format!("Could not serialize {MANIFEST_FILENAME}: {err}"))
        })?;
        fs::write(dir.join(MANIFEST_FILENAME), contents).await?;

        Ok(())
    }

    /// Package -> version constraint entries of one dependency table.
    fn table(&self, key: &str) -> Vec<(String, String)> {
        match self.root.get(key) {
            Some(Value::Object(table)) => table
                .iter()
                .filter_map(|(package, version)| {
                    version
                        .as_str()
                        .map(|v| (package.clone(), v.to_string()))
                })
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// Dependency tables read from the backed-up manifest, platform entry
/// excluded.
#[derive(Debug, Clone, Default)]
pub struct Dependencies {
    pub require: Vec<(String, String)>,
    pub require_dev: Vec<(String, String)>,
}

/// Copy the live manifest to its `.bak` sibling.
pub async fn backup(dir: &Path) -> Result<()> {
    fs::copy(dir.join(MANIFEST_FILENAME), dir.join(BACKUP_FILENAME)).await?;

    Ok(())
}

/// Back up the manifest, then strip its dependency tables and the
/// lifecycle hooks that would otherwise run unsupervised in one shot.
pub async fn clear_dependencies(dir: &Path) -> Result<()> {
    backup(dir).await?;

    let mut manifest = Manifest::open(dir).await?;
    manifest.root.remove("require");
    manifest.root.remove("require-dev");

    if let Some(Value::Object(scripts)) = manifest.root.get_mut("scripts") {
        for hook in SUSPENDED_HOOKS {
            scripts.remove(*hook);
        }
    }

    manifest.save(dir).await
}

/// Restore the original lifecycle hooks from the backup, then delete it.
pub async fn restore_scripts(dir: &Path) -> Result<()> {
    let backup = Manifest::open_backup(dir).await?;
    let mut live = Manifest::open(dir).await?;

    let scripts = backup
        .root
        .get("scripts")
        .cloned()
        .unwrap_or_else(|| Value::Object(Map::new()));
    live.root.insert("scripts".to_string(), scripts);
    live.save(dir).await?;

    fs::remove_file(dir.join(BACKUP_FILENAME)).await?;

    Ok(())
}

/// Dependencies declared by the backed-up manifest, in declaration order.
pub async fn dependencies(dir: &Path) -> Result<Dependencies> {
    let backup = Manifest::open_backup(dir).await?;

    let require = backup
        .table("require")
        .into_iter()
        .filter(|(package, _)| package != PLATFORM_PACKAGE)
        .collect();

    Ok(Dependencies {
        require,
        require_dev: backup.table("require-dev"),
    })
}

/// The Allowed Package Set: everything the backed-up manifest declares plus
/// the Mixer plugin. Computed fresh per call; there is no session memory
/// between steps.
pub async fn allowed_packages(dir: &Path) -> Result<HashMap<String, String>> {
    let deps = dependencies(dir).await?;

    let mut allowed: HashMap<String, String> = deps
        .require
        .into_iter()
        .chain(deps.require_dev)
        .collect();
    allowed.insert(MIXER_PACKAGE.to_lowercase(), MIXER_VERSION.to_string());

    Ok(allowed)
}
