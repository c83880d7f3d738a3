//! Error taxonomy for installation actions
//!
//! Every failure renders to the human-readable message the browser client
//! displays. `ExternalTool` failures additionally carry the captured
//! Composer log for diagnostic display.

use thiserror::Error;

/// Result alias used throughout the installer core.
pub type Result<T> = std::result::Result<T, InstallError>;

#[derive(Debug, Error)]
pub enum InstallError {
    /// A precondition failed: bad path, missing runtime extension, version
    /// too low, or an invalid target directory.
    #[error("{0}")]
    Precondition(String),

    /// The request asked for something the installer refuses on policy
    /// grounds, e.g. a package outside the allowed set.
    #[error("{0}")]
    Policy(String),

    /// Composer (or its installer) ran but did not produce the expected
    /// output. The combined subprocess log is kept for display.
    #[error("{message}")]
    ExternalTool {
        message: String,
        log: Option<String>,
    },

    /// The database rejected the supplied credentials, or required
    /// connection fields were missing.
    #[error("{0}")]
    Database(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Http(#[from] reqwest::Error),
}

impl InstallError {
    pub fn precondition(message: impl Into<String>) -> Self {
        Self::Precondition(message.into())
    }

    pub fn policy(message: impl Into<String>) -> Self {
        Self::Policy(message.into())
    }

    pub fn tool(message: impl Into<String>, log: impl Into<String>) -> Self {
        Self::ExternalTool {
            message: message.into(),
            log: Some(log.into()),
        }
    }

    /// Split into the wire message and the optional captured log.
    pub fn into_parts(self) -> (String, Option<String>) {
        match self {
            Self::ExternalTool { message, log } => (message, log),
            other => (other.to_string(), None),
        }
    }
}
