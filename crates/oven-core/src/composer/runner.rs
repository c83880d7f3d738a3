//! Composer subprocess execution with combined output capture

use super::command::ComposerInput;
use super::locate::ComposerBin;
use crate::error::Result;
use std::path::PathBuf;
use tokio::process::Command;

/// Handle to a resolved Composer executable plus the home directory its
/// commands run with. Success or failure is decided by the callers from
/// expected substrings in the captured output, not the exit status, to
/// match how the client interprets the logs.
#[derive(Debug, Clone)]
pub struct Composer {
    bin: ComposerBin,
    home_dir: PathBuf,
}

impl Composer {
    pub fn new(bin: ComposerBin, home_dir: PathBuf) -> Self {
        Self { bin, home_dir }
    }

    pub fn bin(&self) -> &ComposerBin {
        &self.bin
    }

    /// Run one Composer command synchronously and capture stdout and stderr
    /// combined. `COMPOSER_HOME` is passed explicitly per command rather
    /// than mutating the server's own environment.
    pub async fn run(&self, input: &ComposerInput) -> Result<String> {
        let argv = input.to_argv();

        let mut command = match &self.bin {
            ComposerBin::Phar(path) => {
                let mut cmd = Command::new("php");
                cmd.arg(path);
                cmd
            }
            ComposerBin::Native(path) => Command::new(path),
        };

        tracing::debug!(bin = %self.bin.path().display(), args = ?argv, "running composer");

        let output = command
            .args(&argv)
            .env("COMPOSER_HOME", &self.home_dir)
            .output()
            .await?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.is_empty() {
            if !combined.is_empty() && !combined.ends_with('\n') {
                combined.push('\n');
            }
            combined.push_str(&stderr);
        }

        Ok(combined)
    }

    /// The `composer --version` banner.
    pub async fn version(&self) -> Result<String> {
        let banner = self.run(&ComposerInput::default().flag("--version")).await?;
        Ok(banner.trim().to_string())
    }
}
