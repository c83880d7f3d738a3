//! Oven Core - Shared library for the browser-driven CakePHP installer
//!
//! This library provides the server-side installation logic behind the
//! single-endpoint installer: precondition checks, Composer provisioning
//! and invocation, project scaffolding, step-by-step dependency installs,
//! and config patching. It holds no workflow state of its own; the browser
//! client drives the step sequence one request at a time.
//!
//! # Architecture
//!
//! The library is organized into layers:
//!
//! - **Leaf operations** - runtime/path checks, Composer argv building,
//!   manifest handling, config patching
//! - **Orchestration** - `project` ties the leaves into the create /
//!   install-package / finalise actions and emits step descriptors
//! - **HTTP surface** - lives in the `oven-server` binary crate, which maps
//!   form-encoded actions onto these functions

pub mod catalog;
pub mod checks;
pub mod composer;
pub mod db;
pub mod error;
pub mod manifest;
pub mod patch;
pub mod project;
pub mod request;
pub mod step;

// Re-export main types for convenience
pub use catalog::VersionCatalog;
pub use composer::{Composer, ComposerBin, ComposerInput};
pub use error::{InstallError, Result};
pub use request::InstallRequest;
pub use step::{Step, StepData};
