//! Composer self-installation from the official installer script
//!
//! Downloads the setup script and its detached signature, verifies the
//! script's SHA-384 digest, then runs the script through the PHP runtime to
//! produce the bundled archive.

use crate::error::{InstallError, Result};
use sha2::{Digest, Sha384};
use std::path::Path;
use tokio::process::Command;

/// Official installer script.
pub const INSTALLER_URL: &str = "https://getcomposer.org/installer";

/// Detached SHA-384 signature for the installer script.
pub const INSTALLER_SIG_URL: &str = "https://composer.github.io/installer.sig";

const SETUP_FILENAME: &str = "composer-setup.php";
const INSTALLED_MARKER: &str = "successfully installed to:";

/// Download, verify, and run the Composer installer, leaving the archive at
/// `<base_dir>/<filename>`. Returns the captured installer output.
pub async fn install(
    client: &reqwest::Client,
    base_dir: &Path,
    filename: &str,
    home_dir: &Path,
) -> Result<String> {
    let script = client
        .get(INSTALLER_URL)
        .send()
        .await?
        .error_for_status()?
        .bytes()
        .await?;

    let signature = client
        .get(INSTALLER_SIG_URL)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;

    verify_signature(&script, signature.trim())?;

    let setup_path = base_dir.join(SETUP_FILENAME);
    tokio::fs::write(&setup_path, &script).await?;

    tracing::info!(dir = %base_dir.display(), "running composer setup script");

    let run_result = Command::new("php")
        .arg(&setup_path)
        .arg(format!("--install-dir={}", base_dir.display()))
        .arg(format!("--filename={filename}"))
        .env("COMPOSER_HOME", home_dir)
        .output()
        .await;

    // The setup script is only needed for this one run.
    let _ = tokio::fs::remove_file(&setup_path).await;

    let output = run_result?;
    let mut log = String::from_utf8_lossy(&output.stdout).into_owned();
    log.push_str(&String::from_utf8_lossy(&output.stderr));

    let installed_to = format!("{INSTALLED_MARKER} {}", base_dir.join(filename).display());
    if !log.contains(&installed_to) {
        return Err(InstallError::tool("Error while installing composer", log));
    }

    Ok(log)
}

/// The script's SHA-384 hex digest must match the published signature.
fn verify_signature(script: &[u8], expected: &str) -> Result<()> {
    let digest = hex::encode(Sha384::digest(script));

    if digest.eq_ignore_ascii_case(expected) {
        Ok(())
    } else {
        Err(InstallError::ExternalTool {
            message: "Composer Installer corrupt".to_string(),
            log: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matching_signature_is_accepted() {
        let script = b"<?php echo 'setup';";
        let signature = hex::encode(Sha384::digest(script));

        assert!(verify_signature(script, &signature).is_ok());
        assert!(verify_signature(script, &signature.to_uppercase()).is_ok());
    }

    #[test]
    fn test_mismatched_signature_is_corrupt() {
        let err = verify_signature(b"<?php echo 'setup';", "deadbeef").unwrap_err();
        assert_eq!(err.to_string(), "Composer Installer corrupt");
    }
}
