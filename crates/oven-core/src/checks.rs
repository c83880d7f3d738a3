//! Precondition checks for the host PHP runtime and the target path
//!
//! Each check is invoked as one discrete request/response cycle by the
//! browser; the client only advances after the previous check succeeds.

use crate::error::{InstallError, Result};
use semver::Version;
use std::path::Path;
use std::time::Duration;
use tokio::process::Command;

/// Cosmetic pacing delay after each requirement check, so the progress list
/// in the browser is readable rather than instantaneous.
pub const REQUIREMENTS_DELAY: Duration = Duration::from_millis(500);

/// Minimum PHP version the generated application supports.
const MIN_PHP_VERSION: (u64, u64, u64) = (5, 5, 9);

pub(crate) async fn pace() {
    tokio::time::sleep(REQUIREMENTS_DELAY).await;
}

/// PHP runtime version must be at or above the supported minimum.
pub async fn check_php() -> Result<String> {
    pace().await;

    let detected = php_version().await?;
    let (maj, min, patch) = MIN_PHP_VERSION;
    let minimum = Version::new(maj, min, patch);

    match parse_php_version(&detected) {
        Some(version) if version >= minimum => Ok(format!(
            "Your version of PHP is {minimum} or higher (detected {detected})."
        )),
        _ => Err(InstallError::precondition(format!(
            "Your version of PHP is too low. You need PHP {minimum} or higher (detected {detected})."
        ))),
    }
}

/// The mbstring extension must be loaded.
pub async fn check_mb_string() -> Result<String> {
    pace().await;

    if extension_loaded("mbstring").await? {
        Ok("Your version of PHP has the mbstring extension loaded.".to_string())
    } else {
        Err(InstallError::precondition(
            "Your version of PHP does NOT have the mbstring extension loaded.",
        ))
    }
}

/// A secure-transport extension must be loaded; mcrypt is accepted as the
/// legacy alternative to openssl.
pub async fn check_openssl() -> Result<String> {
    pace().await;

    if extension_loaded("openssl").await? {
        Ok("Your version of PHP has the openssl extension loaded.".to_string())
    } else if extension_loaded("mcrypt").await? {
        Ok("Your version of PHP has the mcrypt extension loaded.".to_string())
    } else {
        Err(InstallError::precondition(
            "Your version of PHP does NOT have the openssl or mcrypt extension loaded.",
        ))
    }
}

/// The intl extension must be loaded.
pub async fn check_intl() -> Result<String> {
    pace().await;

    if extension_loaded("intl").await? {
        Ok("Your version of PHP has the intl extension loaded.".to_string())
    } else {
        Err(InstallError::precondition(
            "Your version of PHP does NOT have the intl extension loaded.",
        ))
    }
}

/// The target path (or its parent, when the target does not exist yet) must
/// be writable.
pub async fn check_path(path: &Path) -> Result<String> {
    pace().await;

    ensure_writable(path)?;

    Ok(format!("{} directory is writable", path.display()))
}

/// Path precondition shared by every mutating action: an existing target
/// must be a writable directory; a missing one must have a writable parent
/// so it can be created.
pub fn ensure_writable(path: &Path) -> Result<()> {
    if path.exists() {
        if !path.is_dir() {
            return Err(InstallError::precondition(format!(
                "{} is not a directory",
                path.display()
            )));
        }

        if !dir_writable(path) {
            return Err(InstallError::precondition(format!(
                "{} directory is NOT writable",
                path.display()
            )));
        }
    } else {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        if !dir_writable(parent) {
            return Err(InstallError::precondition(format!(
                "{} directory is NOT writable",
                parent.display()
            )));
        }
    }

    Ok(())
}

/// Permission bits don't answer "can this process write here" under ACLs or
/// read-only mounts, so probe by creating and removing a scratch file.
fn dir_writable(dir: &Path) -> bool {
    let probe = dir.join(format!(".oven-write-probe-{}", std::process::id()));
    match std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&probe)
    {
        Ok(file) => {
            drop(file);
            let _ = std::fs::remove_file(&probe);
            true
        }
        Err(_) => false,
    }
}

async fn php_version() -> Result<String> {
    let output = Command::new("php")
        .args(["-r", "echo PHP_VERSION;"])
        .output()
        .await
        .map_err(|_| InstallError::precondition("Could not run the php executable"))?;

    if !output.status.success() {
        return Err(InstallError::precondition(
            "Could not determine the PHP version",
        ));
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

async fn extension_loaded(extension: &str) -> Result<bool> {
    let output = Command::new("php")
        .arg("-m")
        .output()
        .await
        .map_err(|_| InstallError::precondition("Could not run the php executable"))?;

    let modules = String::from_utf8_lossy(&output.stdout);
    Ok(modules
        .lines()
        .any(|line| line.trim().eq_ignore_ascii_case(extension)))
}

/// Parse a PHP version string. Distribution builds append suffixes like
/// `-1ubuntu2`, so fall back to the leading `X.Y.Z` digits when a strict
/// semver parse fails.
fn parse_php_version(version: &str) -> Option<Version> {
    if let Ok(parsed) = Version::parse(version) {
        return Some(parsed);
    }

    let bare: String = version
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    let mut parts = bare.split('.').filter(|p| !p.is_empty());
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0);
    let patch = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0);

    Some(Version::new(major, minor, patch))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_version() {
        assert_eq!(parse_php_version("7.4.33"), Some(Version::new(7, 4, 33)));
    }

    #[test]
    fn test_parse_distro_suffixed_version() {
        assert_eq!(
            parse_php_version("8.1.2-1ubuntu2.14"),
            Some(Version::parse("8.1.2-1ubuntu2.14").unwrap())
        );
        assert_eq!(
            parse_php_version("8.1.2+deb11"),
            Some(Version::new(8, 1, 2))
        );
    }

    #[test]
    fn test_parse_garbage_version() {
        assert_eq!(parse_php_version("not-a-version"), None);
    }

    #[test]
    fn test_existing_writable_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ensure_writable(dir.path()).is_ok());
    }

    #[test]
    fn test_missing_dir_with_writable_parent() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ensure_writable(&dir.path().join("missing")).is_ok());
    }

    #[test]
    fn test_file_is_not_a_directory() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("plain.txt");
        std::fs::write(&file, "x").unwrap();

        let err = ensure_writable(&file).unwrap_err();
        assert_eq!(err.to_string(), format!("{} is not a directory", file.display()));
    }

    #[tokio::test]
    async fn test_check_path_message() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("missing");

        let message = check_path(&target).await.unwrap();
        assert_eq!(message, format!("{} directory is writable", target.display()));
    }
}
