//! Version catalog resolved from the Packagist package index
//!
//! The index lists tags newest-first; the catalog keeps the newest tag per
//! tracked minor branch. Network or parse failures silently fall back to
//! the hardcoded default list.

use serde::Deserialize;
use serde_json::Value;

/// Package index entry for the framework.
pub const PACKAGE_INDEX_URL: &str = "https://packagist.org/packages/cakephp/cakephp.json";

/// Minor branches offered by the installer, newest first.
const TRACKED_BRANCHES: &[&str] = &["4.0.", "3.5.", "3.4."];

/// One installable version: a `~X.Y.Z` range label mapped to the concrete
/// version string shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub label: String,
    pub version: String,
}

/// The set of framework versions offered to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionCatalog {
    entries: Vec<CatalogEntry>,
}

#[derive(Debug, Deserialize)]
struct IndexResponse {
    package: IndexPackage,
}

#[derive(Debug, Deserialize)]
struct IndexPackage {
    #[serde(default)]
    versions: serde_json::Map<String, Value>,
}

impl Default for VersionCatalog {
    fn default() -> Self {
        Self {
            entries: vec![
                CatalogEntry {
                    label: "~3.5.0".to_string(),
                    version: "~3.5.0".to_string(),
                },
                CatalogEntry {
                    label: "~3.4.0".to_string(),
                    version: "~3.4.0".to_string(),
                },
            ],
        }
    }
}

impl VersionCatalog {
    /// Fetch and parse the package index, falling back to the default list
    /// on any failure.
    pub async fn fetch(client: &reqwest::Client, index_url: &str) -> Self {
        match Self::try_fetch(client, index_url).await {
            Ok(Some(catalog)) => catalog,
            Ok(None) => {
                tracing::warn!("package index answered with no usable tags, using defaults");
                Self::default()
            }
            Err(err) => {
                tracing::warn!(error = %err, "package index unreachable, using defaults");
                Self::default()
            }
        }
    }

    async fn try_fetch(client: &reqwest::Client, index_url: &str) -> reqwest::Result<Option<Self>> {
        let response: IndexResponse = client
            .get(index_url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let tags: Vec<&str> = response.package.versions.keys().map(String::as_str).collect();
        Ok(Self::from_tags(&tags))
    }

    /// Build a catalog from an ordered tag list. Returns `None` when no
    /// tracked branch has a tag.
    pub fn from_tags(tags: &[&str]) -> Option<Self> {
        let entries: Vec<CatalogEntry> = TRACKED_BRANCHES
            .iter()
            .filter_map(|branch| latest_for_branch(tags, branch))
            .map(|version| CatalogEntry {
                label: format!("~{version}"),
                version: version.to_string(),
            })
            .collect();

        if entries.is_empty() {
            None
        } else {
            Some(Self { entries })
        }
    }

    /// Whether a submitted version label is offered by this catalog.
    pub fn contains(&self, label: &str) -> bool {
        self.entries.iter().any(|entry| entry.label == label)
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    /// Comma-joined concrete versions, for the invalid-version error text.
    pub fn available_message(&self) -> String {
        self.entries
            .iter()
            .map(|entry| entry.version.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// The index lists tags newest-first, so the first match wins.
fn latest_for_branch<'a>(tags: &[&'a str], branch: &str) -> Option<&'a str> {
    tags.iter().find(|tag| tag.starts_with(branch)).copied()
}
