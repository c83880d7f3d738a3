//! Shared server state

use oven_core::catalog::VersionCatalog;
use oven_core::composer::{locate, Composer};
use oven_core::error::Result;
use oven_core::request::InstallRequest;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Everything a request handler needs, passed explicitly instead of living
/// in ambient session or environment state.
#[derive(Clone)]
pub struct AppState {
    /// Directory installs are created under; also where the bundled
    /// Composer archive and its home directory live.
    pub base_dir: PathBuf,
    /// Filename of the bundled Composer archive.
    pub composer_filename: String,
    /// `COMPOSER_HOME` passed to every spawned Composer command.
    pub composer_home: PathBuf,
    /// Package index queried for the version catalog.
    pub package_index_url: String,
    pub client: reqwest::Client,
    /// Version catalog, fetched once per server lifetime on first use.
    catalog: Arc<RwLock<Option<VersionCatalog>>>,
}

impl AppState {
    pub fn new(base_dir: PathBuf, composer_filename: String, package_index_url: String) -> Self {
        let composer_home = base_dir.join(".composer");

        Self {
            base_dir,
            composer_filename,
            composer_home,
            package_index_url,
            client: reqwest::Client::builder()
                .user_agent("oven")
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            catalog: Arc::new(RwLock::new(None)),
        }
    }

    /// The cached catalog, fetching it on first use. Fetch failures fall
    /// back to the default list and are cached like any other result.
    pub async fn catalog(&self) -> VersionCatalog {
        if let Some(catalog) = self.catalog.read().await.clone() {
            return catalog;
        }

        let fetched = VersionCatalog::fetch(&self.client, &self.package_index_url).await;
        *self.catalog.write().await = Some(fetched.clone());
        fetched
    }

    /// Resolve the Composer executable for one request. The same handle is
    /// reused for every command the action runs.
    pub fn composer(&self, req: &InstallRequest) -> Result<Composer> {
        let bin = locate::resolve(
            req.composer_path.as_deref(),
            &self.base_dir,
            &self.composer_filename,
        )?;

        Ok(Composer::new(bin, self.composer_home.clone()))
    }
}
