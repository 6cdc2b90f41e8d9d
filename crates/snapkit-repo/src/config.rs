//! Store configuration
//!
//! Stored in `~/.config/snapkit/store.yaml`. Missing keys fall back to the
//! production catalog, or the staging one when `SNAPKIT_USE_STAGING_STORE`
//! is set.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{RepoError, Result};

/// Environment variable selecting the staging catalog
pub const STAGING_ENV: &str = "SNAPKIT_USE_STAGING_STORE";

const PRODUCTION_API: &str = "https://search.apps.ubuntu.com/api/v1/";
const STAGING_API: &str = "https://search.apps.staging.ubuntu.com/api/v1/";

/// Catalog endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct StoreConfig {
    #[serde(default = "default_search_uri")]
    pub search_uri: String,

    #[serde(default = "default_details_uri")]
    pub details_uri: String,

    #[serde(default = "default_bulk_uri")]
    pub bulk_uri: String,

    /// Store id sent with every request; the active OEM package's id when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_id: Option<String>,
}

fn api_base() -> &'static str {
    if staging_requested(std::env::var(STAGING_ENV).ok().as_deref()) {
        STAGING_API
    } else {
        PRODUCTION_API
    }
}

fn staging_requested(value: Option<&str>) -> bool {
    matches!(value, Some(v) if !v.is_empty() && v != "0")
}

fn default_search_uri() -> String {
    format!("{}search", api_base())
}

fn default_details_uri() -> String {
    format!("{}package/", api_base())
}

fn default_bulk_uri() -> String {
    format!("{}click-metadata", api_base())
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            search_uri: default_search_uri(),
            details_uri: default_details_uri(),
            bulk_uri: default_bulk_uri(),
            store_id: None,
        }
    }
}

impl StoreConfig {
    /// Endpoints below one API root
    pub fn with_base(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            search_uri: format!("{}/search", base),
            details_uri: format!("{}/package/", base),
            bulk_uri: format!("{}/click-metadata", base),
            store_id: None,
        }
    }

    pub fn with_store_id(mut self, id: impl Into<String>) -> Self {
        self.store_id = Some(id.into());
        self
    }

    /// Read `store.yaml` from the user config directory, or use the defaults
    pub fn load() -> Result<Self> {
        let path = Self::default_path()?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Read and validate the endpoints in `path`
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Write the endpoints to `path`
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_yaml::to_string(self)?)?;
        Ok(())
    }

    /// `<config dir>/snapkit/store.yaml`
    pub fn default_path() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join("snapkit").join("store.yaml"))
            .ok_or_else(|| RepoError::InvalidConfig {
                message: "no user config directory".to_string(),
            })
    }

    fn validate(&self) -> Result<()> {
        for uri in [&self.search_uri, &self.details_uri, &self.bulk_uri] {
            url::Url::parse(uri).map_err(|e| RepoError::InvalidUrl {
                url: uri.clone(),
                reason: e.to_string(),
            })?;
        }
        Ok(())
    }
}
