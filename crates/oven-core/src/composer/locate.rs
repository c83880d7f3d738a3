//! Composer executable resolution
//!
//! Resolution order: explicit path supplied in the request, then the
//! bundled archive next to the server base directory. A PATH scan helper
//! finds a system-wide install for display purposes.

use crate::error::{InstallError, Result};
use std::path::{Path, PathBuf};

/// Default archive filename bundled alongside the installer.
pub const COMPOSER_FILENAME: &str = "composer.phar";

/// A resolved Composer executable. Once determined for a request, the same
/// handle is reused for every subsequent command in that installation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComposerBin {
    /// A portable archive, invoked through the PHP runtime.
    Phar(PathBuf),
    /// A native executable, invoked directly.
    Native(PathBuf),
}

impl ComposerBin {
    pub fn path(&self) -> &Path {
        match self {
            Self::Phar(path) | Self::Native(path) => path,
        }
    }
}

/// Resolve the Composer executable for one request.
pub fn resolve(explicit: Option<&str>, base_dir: &Path, filename: &str) -> Result<ComposerBin> {
    match explicit.filter(|p| !p.is_empty()) {
        Some(raw) => {
            let path = PathBuf::from(raw);
            if !path.exists() {
                return Err(InstallError::precondition(format!(
                    "Composer installation not found at {raw}"
                )));
            }

            if is_phar(&path) {
                Ok(ComposerBin::Phar(path))
            } else if is_executable(&path) {
                Ok(ComposerBin::Native(path))
            } else {
                Err(InstallError::precondition(
                    "Composer binary is not executable",
                ))
            }
        }
        None => Ok(ComposerBin::Phar(base_dir.join(filename))),
    }
}

/// Scan PATH for a readable archive or executable binary; used to suggest a
/// system-wide Composer to the client.
pub fn system_path(filename: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    let stem = Path::new(filename).file_stem()?.to_os_string();

    for dir in std::env::split_paths(&path_var) {
        let archive = dir.join(filename);
        if archive.is_file() {
            return Some(archive);
        }

        let binary = dir.join(&stem);
        if binary.is_file() && is_executable(&binary) {
            return Some(binary);
        }
    }

    None
}

fn is_phar(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "phar")
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    std::fs::metadata(path).is_ok_and(|meta| meta.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
