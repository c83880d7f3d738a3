//! Composer adapter: locate, provision, and invoke the package manager
//!
//! This module provides:
//! - Executable resolution (explicit path, bundled archive, PATH scan)
//! - Structured command input flattened to one argv for either transport
//! - Subprocess execution with combined output capture
//! - Self-installation from the official installer script

pub mod command;
pub mod install;
pub mod locate;
pub mod runner;

pub use command::ComposerInput;
pub use locate::{ComposerBin, COMPOSER_FILENAME};
pub use runner::Composer;

use crate::checks;
use crate::error::{InstallError, Result};
use std::path::Path;

/// Ensure a working Composer is present, installing the bundled archive
/// when the resolved one is missing or broken. Returns the version banner
/// (doubling as the user-facing message) and the action log.
pub async fn provision(
    client: &reqwest::Client,
    bin: &ComposerBin,
    base_dir: &Path,
    filename: &str,
    home_dir: &Path,
) -> Result<(String, String)> {
    let composer = Composer::new(bin.clone(), home_dir.to_path_buf());

    let existing = if bin.path().exists() {
        composer
            .version()
            .await
            .ok()
            .filter(|banner| !banner.trim().is_empty())
    } else {
        None
    };

    let (version, log) = match existing {
        Some(banner) => {
            checks::pace().await;
            (banner.clone(), banner)
        }
        None => {
            let log = install::install(client, base_dir, filename, home_dir).await?;
            let banner = composer.version().await?;
            (banner, log)
        }
    };

    if !version.contains("Composer") && !version.contains("version") {
        return Err(InstallError::ExternalTool {
            message: "Invalid composer installation".to_string(),
            log: Some(log),
        });
    }

    Ok((version, log))
}
