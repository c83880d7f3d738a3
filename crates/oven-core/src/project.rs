//! Project bootstrapping and per-package installation
//!
//! The target directory moves through a fixed sequence: precondition
//! checks, skeleton creation (via a temp directory when the target is
//! non-empty-but-valid), dependency clearing, step enumeration, and -
//! after the client drives the per-package installs - finalisation.

use crate::catalog::VersionCatalog;
use crate::checks;
use crate::composer::{Composer, ComposerInput};
use crate::error::{InstallError, Result};
use crate::manifest;
use crate::patch;
use crate::request::InstallRequest;
use crate::step::Step;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use walkdir::WalkDir;

/// Skeleton package scaffolded by `create-project`.
pub const APP_PACKAGE: &str = "cakephp/app";

/// The framework package whose version the user picks from the catalog.
pub const FRAMEWORK_PACKAGE: &str = "cakephp/cakephp";

const CREATED_MARKER: &str = "Created project in";
const AUTOLOAD_MARKER: &str = "Generating autoload files";

/// Datasource fields patched at finalisation when supplied.
const DATASOURCE_FIELDS: &[&str] = &["host", "username", "password", "database"];

/// Outcome of a successful `createProject` action.
#[derive(Debug)]
pub struct CreateOutcome {
    pub log: String,
    pub steps: Vec<Step>,
}

/// Marker file left by an earlier install of the framework.
pub fn is_installed(dir: &Path) -> bool {
    dir.join("vendor")
        .join("cakephp")
        .join("cakephp")
        .join("VERSION.txt")
        .exists()
}

/// Scaffold the skeleton into the target directory and enumerate the
/// dependency install steps for the client to drive.
pub async fn create_project(
    composer: &Composer,
    base_dir: &Path,
    req: &InstallRequest,
    catalog: &VersionCatalog,
) -> Result<CreateOutcome> {
    let install_dir = req.install_dir(base_dir);

    if is_installed(&install_dir) {
        return Err(InstallError::precondition("CakePHP app already installed"));
    }

    checks::ensure_writable(&install_dir)?;

    if install_dir.exists() && !same_dir(&install_dir, base_dir) && !is_dir_empty(&install_dir)? {
        return Err(InstallError::precondition(format!(
            "{} is not empty",
            install_dir.display()
        )));
    }

    if !install_dir.exists() && std::fs::create_dir_all(&install_dir).is_err() {
        return Err(InstallError::precondition(format!(
            "Could NOT create {} directory",
            install_dir.display()
        )));
    }

    // Targets outside the base directory would let the endpoint write
    // anywhere the server can.
    if !install_dir.canonicalize()?.starts_with(base_dir.canonicalize()?) {
        return Err(InstallError::precondition(format!(
            "Invalid app dir {}",
            install_dir.display()
        )));
    }

    let version = match req.version.as_deref() {
        Some(label) if catalog.contains(label) => label,
        _ => {
            return Err(InstallError::policy(format!(
                "Invalid CakePHP version. Available versions: {}",
                catalog.available_message()
            )))
        }
    };

    let log = scaffold(composer, base_dir, &install_dir, version).await?;

    if !log.contains(&format!("{CREATED_MARKER} {}", install_dir.display())) {
        return Err(InstallError::tool("Error while creating project", log));
    }

    manifest::clear_dependencies(&install_dir).await?;
    let dependencies = manifest::dependencies(&install_dir).await?;

    Ok(CreateOutcome {
        log,
        steps: enumerate_steps(dependencies, version, req),
    })
}

/// Install one declared dependency into the target directory. The package
/// must belong to the Allowed Package Set; rejection happens before any
/// subprocess is spawned.
pub async fn install_package(
    composer: &Composer,
    base_dir: &Path,
    req: &InstallRequest,
) -> Result<String> {
    let package = req.package.as_deref().unwrap_or_default();
    let version = req.version.as_deref().unwrap_or_default();
    let install_dir = req.install_dir(base_dir);

    checks::ensure_writable(&install_dir)?;

    let allowed = manifest::allowed_packages(&install_dir).await?;
    if !allowed.contains_key(package) {
        return Err(InstallError::policy(format!(
            "{package} package is not allowed"
        )));
    }

    let spec = if version.is_empty() {
        package.to_string()
    } else {
        format!("{package}:{version}")
    };

    let mut input = ComposerInput::command("require")
        .flag("--prefer-dist")
        .flag("--no-interaction")
        .option("--working-dir", install_dir.display().to_string())
        .flag("--no-progress")
        .args(vec![spec]);

    if req.dev_requested() {
        input = input.flag("--dev");
    }

    let output = composer.run(&input).await?;

    if !output.contains(AUTOLOAD_MARKER) {
        return Err(InstallError::tool(
            format!("Error installing package {package}"),
            output,
        ));
    }

    Ok(output)
}

/// Restore the suspended lifecycle hooks, regenerate the autoloader, run
/// the post-install hooks, and patch the user-supplied config values.
pub async fn finalise(composer: &Composer, base_dir: &Path, req: &InstallRequest) -> Result<String> {
    let install_dir = req.install_dir(base_dir);

    checks::ensure_writable(&install_dir)?;
    manifest::restore_scripts(&install_dir).await?;

    let working_dir = install_dir.display().to_string();

    let mut log = composer
        .run(
            &ComposerInput::command("dump-autoload")
                .flag("--no-interaction")
                .option("--working-dir", working_dir.clone()),
        )
        .await?;

    log.push('\n');

    log.push_str(
        &composer
            .run(
                &ComposerInput::command("run-script")
                    .arg("post-install-cmd")
                    .flag("--no-interaction")
                    .option("--working-dir", working_dir),
            )
            .await?,
    );

    let config_path = install_dir.join("config").join("app.php");
    for field in DATASOURCE_FIELDS {
        let value = match *field {
            "host" => &req.host,
            "username" => &req.username,
            "password" => &req.password,
            _ => &req.database,
        };

        if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
            patch::update_datasource_config(&config_path, field, value).await?;
        }
    }

    if req.mixer_requested() {
        let bootstrap_path = install_dir.join("config").join("bootstrap.php");
        patch::enable_plugin(&bootstrap_path, manifest::MIXER_PACKAGE, true, true, true).await?;
    }

    Ok(log)
}

/// Run `create-project` against the target, or against a unique temp
/// directory when the target is non-empty-but-valid (Composer refuses to
/// scaffold into a non-empty directory), then move the result into place.
async fn scaffold(
    composer: &Composer,
    base_dir: &Path,
    install_dir: &Path,
    version_label: &str,
) -> Result<String> {
    let tmp_dir: Option<PathBuf> = if is_dir_empty(install_dir)? {
        None
    } else {
        Some(base_dir.join(unique_tmp_name()))
    };

    let target = tmp_dir.as_deref().unwrap_or(install_dir);
    let package = format!("{APP_PACKAGE}:{}", skeleton_version(version_label));

    // Dependencies and lifecycle hooks run later under orchestration, one
    // step per request.
    let input = ComposerInput::command("create-project")
        .flag("--no-interaction")
        .flag("--prefer-dist")
        .arg(package)
        .arg(target.display().to_string())
        .flag("--no-install")
        .flag("--no-scripts");

    let output = composer.run(&input).await?;

    if let Some(tmp) = tmp_dir {
        move_dir(&tmp, install_dir)?;
    }

    Ok(output)
}

/// One step per declared dependency, with the user's chosen version
/// substituted for the framework package, plus the optional Mixer step.
fn enumerate_steps(
    dependencies: manifest::Dependencies,
    framework_version: &str,
    req: &InstallRequest,
) -> Vec<Step> {
    let composer_path = req.composer_path.clone().unwrap_or_default();
    let mut steps = Vec::new();

    for (dev, packages) in [
        (false, dependencies.require),
        (true, dependencies.require_dev),
    ] {
        for (package, declared_version) in packages {
            let version = if package == FRAMEWORK_PACKAGE {
                framework_version.to_string()
            } else {
                declared_version
            };

            steps.push(Step::install_package(
                package,
                version,
                dev,
                req.dir.clone(),
                composer_path.clone(),
            ));
        }
    }

    if req.mixer_requested() {
        steps.push(Step::install_package(
            manifest::MIXER_PACKAGE.to_lowercase(),
            manifest::MIXER_VERSION.to_string(),
            true,
            req.dir.clone(),
            composer_path,
        ));
    }

    steps
}

/// The skeleton tracks minor branches: `~4.0.3` selects skeleton `~4.0.0`.
fn skeleton_version(version_label: &str) -> String {
    let mut parts: Vec<&str> = version_label.split('.').collect();
    if parts.len() > 1 {
        parts.pop();
        parts.push("0");
    }

    parts.join(".")
}

fn unique_tmp_name() -> String {
    let micros = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_micros();

    format!(".oven-scaffold-{micros:x}")
}

/// A directory counts as empty when it has no entries at all.
pub fn is_dir_empty(dir: &Path) -> Result<bool> {
    let mut entries = std::fs::read_dir(dir).map_err(|_| {
        InstallError::precondition(format!("{} is NOT readable", dir.display()))
    })?;

    Ok(entries.next().is_none())
}

/// Recursive directory move: files are renamed into place, directories
/// recreated, and source directories removed bottom-up once their contents
/// have relocated. The source root is gone afterwards.
pub fn move_dir(src: &Path, dest: &Path) -> Result<()> {
    if !src.is_dir() {
        return Err(InstallError::precondition(format!(
            "The source passed in does not appear to be a valid directory: [{}]",
            src.display()
        )));
    }

    if !dest.is_dir() && std::fs::create_dir_all(dest).is_err() {
        return Err(InstallError::precondition(format!(
            "The destination does not exist, and I can not create it: [{}]",
            dest.display()
        )));
    }

    for entry in WalkDir::new(src).min_depth(1).contents_first(true) {
        let entry = entry.map_err(std::io::Error::from)?;
        let Ok(relative) = entry.path().strip_prefix(src) else {
            continue;
        };
        let target = dest.join(relative);

        if entry.file_type().is_dir() {
            if !target.is_dir() {
                std::fs::create_dir_all(&target)?;
            }
            // Contents-first traversal already emptied it.
            std::fs::remove_dir(entry.path())?;
        } else {
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::rename(entry.path(), &target)?;
        }
    }

    std::fs::remove_dir(src)?;

    Ok(())
}

fn same_dir(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composer::{ComposerBin, Composer};

    fn unreachable_composer() -> Composer {
        Composer::new(
            ComposerBin::Native("/nonexistent/composer".into()),
            PathBuf::from("/nonexistent/.composer"),
        )
    }

    fn request(dir: &str) -> InstallRequest {
        InstallRequest {
            dir: dir.to_string(),
            ..InstallRequest::default()
        }
    }

    #[test]
    fn test_skeleton_version_tracks_minor_branch() {
        assert_eq!(skeleton_version("~3.5.13"), "~3.5.0");
        assert_eq!(skeleton_version("~4.0.3"), "~4.0.0");
        assert_eq!(skeleton_version("~3.5.0"), "~3.5.0");
    }

    #[test]
    fn test_move_dir_relocates_whole_tree() {
        let root = tempfile::tempdir().unwrap();
        let src = root.path().join("src");
        let dest = root.path().join("dest");

        std::fs::create_dir_all(src.join("config/schema")).unwrap();
        std::fs::create_dir_all(src.join("webroot")).unwrap();
        std::fs::write(src.join("composer.json"), "{}").unwrap();
        std::fs::write(src.join("config/app.php"), "<?php").unwrap();
        std::fs::write(src.join("config/schema/i18n.sql"), "--").unwrap();

        move_dir(&src, &dest).unwrap();

        assert!(!src.exists());
        assert!(dest.join("composer.json").is_file());
        assert!(dest.join("config/app.php").is_file());
        assert!(dest.join("config/schema/i18n.sql").is_file());
        assert!(dest.join("webroot").is_dir());
    }

    #[test]
    fn test_move_dir_rejects_missing_source() {
        let root = tempfile::tempdir().unwrap();
        let err = move_dir(&root.path().join("nope"), &root.path().join("dest")).unwrap_err();
        assert!(err.to_string().contains("does not appear to be a valid directory"));
    }

    #[tokio::test]
    async fn test_create_rejects_already_installed_target() {
        let base = tempfile::tempdir().unwrap();
        let app = base.path().join("app");
        std::fs::create_dir_all(app.join("vendor/cakephp/cakephp")).unwrap();
        std::fs::write(app.join("vendor/cakephp/cakephp/VERSION.txt"), "3.5.0").unwrap();

        let err = create_project(
            &unreachable_composer(),
            base.path(),
            &request("app"),
            &VersionCatalog::default(),
        )
        .await
        .unwrap_err();

        assert_eq!(err.to_string(), "CakePHP app already installed");
        // Precondition failure must leave the target untouched.
        assert!(!app.join("composer.json.bak").exists());
    }

    #[tokio::test]
    async fn test_create_rejects_non_empty_target() {
        let base = tempfile::tempdir().unwrap();
        let app = base.path().join("app");
        std::fs::create_dir_all(&app).unwrap();
        std::fs::write(app.join("leftover.txt"), "x").unwrap();

        let err = create_project(
            &unreachable_composer(),
            base.path(),
            &request("app"),
            &VersionCatalog::default(),
        )
        .await
        .unwrap_err();

        assert_eq!(err.to_string(), format!("{} is not empty", app.display()));
    }

    #[tokio::test]
    async fn test_create_rejects_unknown_version() {
        let base = tempfile::tempdir().unwrap();

        let mut req = request("app");
        req.version = Some("~9.9.9".to_string());

        let err = create_project(
            &unreachable_composer(),
            base.path(),
            &req,
            &VersionCatalog::default(),
        )
        .await
        .unwrap_err();

        assert_eq!(
            err.to_string(),
            "Invalid CakePHP version. Available versions: ~3.5.0, ~3.4.0"
        );
    }

    #[tokio::test]
    async fn test_create_rejects_target_outside_base() {
        let base = tempfile::tempdir().unwrap();
        let outside = tempfile::tempdir().unwrap();

        let err = create_project(
            &unreachable_composer(),
            base.path(),
            &request(outside.path().to_str().unwrap()),
            &VersionCatalog::default(),
        )
        .await
        .unwrap_err();

        assert!(err.to_string().starts_with("Invalid app dir"));
    }

    #[tokio::test]
    async fn test_install_package_rejects_outside_allowed_set() {
        let base = tempfile::tempdir().unwrap();
        let app = base.path().join("app");
        std::fs::create_dir_all(&app).unwrap();
        std::fs::write(
            app.join(manifest::BACKUP_FILENAME),
            r#"{"require": {"cakephp/cakephp": "3.5.*"}, "require-dev": {}}"#,
        )
        .unwrap();

        let mut req = request("app");
        req.package = Some("not/allowed".to_string());
        req.version = Some("1.0".to_string());

        // An unreachable composer binary proves no subprocess was spawned:
        // a spawn attempt would surface as an IO error, not a policy one.
        let err = install_package(&unreachable_composer(), base.path(), &req)
            .await
            .unwrap_err();

        assert!(matches!(err, InstallError::Policy(_)));
        assert_eq!(err.to_string(), "not/allowed package is not allowed");
    }

    #[test]
    fn test_enumerate_steps_swaps_framework_version_and_appends_mixer() {
        let dependencies = manifest::Dependencies {
            require: vec![
                ("cakephp/cakephp".to_string(), "3.5.*".to_string()),
                ("mobiledetect/mobiledetectlib".to_string(), "2.*".to_string()),
            ],
            require_dev: vec![("cakephp/bake".to_string(), "^1.1".to_string())],
        };

        let mut req = request("app");
        req.install_mixer = Some("1".to_string());
        req.composer_path = Some("/usr/local/bin/composer".to_string());

        let steps = enumerate_steps(dependencies, "~3.5.13", &req);

        assert_eq!(steps.len(), 4);
        assert_eq!(steps[0].data.package, "cakephp/cakephp");
        assert_eq!(steps[0].data.version, "~3.5.13");
        assert_eq!(steps[0].data.dev, 0);
        assert_eq!(steps[1].data.version, "2.*");
        assert_eq!(steps[2].data.dev, 1);
        assert_eq!(steps[3].data.package, "cakedc/mixer");
        assert_eq!(steps[3].data.version, "@stable");
        assert_eq!(steps[3].data.dev, 1);
        assert_eq!(steps[3].data.composer_path, "/usr/local/bin/composer");
    }
}
