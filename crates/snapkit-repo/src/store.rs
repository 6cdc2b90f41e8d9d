//! Remote catalog repository
//!
//! Three endpoints: search, per-package details and bulk updates. Results
//! are [`RemoteSnap`]s; nothing here touches the local package tree except
//! through the [`InstalledNames`] collaborator used by `updates`.

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use snapkit_core::{CATALOG_FIELDS, RemotePackage, RemoteSnap};
use std::sync::Arc;
use url::Url;

use crate::client::{StoreClient, StoreHeaders};
use crate::config::StoreConfig;
use crate::error::{RepoError, Result};
use crate::local::{SystemRepository, store_id_for};

/// Source of the installed package identities sent to the bulk endpoint
pub trait InstalledNames: Send + Sync {
    /// Qualified names of the active installed packages
    fn installed_names(&self) -> Result<Vec<String>>;

    /// Version `current` points at, if the package is installed
    fn active_version(&self, qualified_name: &str) -> Result<Option<String>>;
}

/// Every origin publishing one package name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SharedName {
    parts: Vec<RemoteSnap>,
    alias: Option<usize>,
}

impl SharedName {
    fn push(&mut self, snap: RemoteSnap) {
        if snap.alias().is_some_and(|a| !a.is_empty()) {
            self.alias = Some(self.parts.len());
        }
        self.parts.push(snap);
    }

    pub fn parts(&self) -> &[RemoteSnap] {
        &self.parts
    }

    /// The entry the catalog marks as the canonical target of the name
    pub fn alias(&self) -> Option<&RemoteSnap> {
        self.alias.and_then(|i| self.parts.get(i))
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

/// Search results keyed by package name, in catalog order
pub type SearchResults = IndexMap<String, SharedName>;

#[derive(Debug, Default, Deserialize)]
struct SearchResponse {
    #[serde(rename = "_embedded", default)]
    embedded: Embedded,
}

#[derive(Debug, Default, Deserialize)]
struct Embedded {
    #[serde(rename = "clickindex:package", default)]
    packages: Vec<RemotePackage>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DetailsResponse {
    Many(Vec<RemotePackage>),
    One(Box<RemotePackage>),
    Error {
        #[serde(default)]
        errors: Vec<String>,
    },
}

#[derive(Debug, Serialize)]
struct BulkRequest<'a> {
    name: &'a [String],
}

/// The remote catalog
pub struct StoreRepository {
    config: StoreConfig,
    client: StoreClient,
    installed: Option<Arc<dyn InstalledNames>>,
}

impl StoreRepository {
    /// Catalog client identifying this host, with the configured store id
    pub fn new(config: StoreConfig) -> Result<Self> {
        let headers = StoreHeaders::default().with_store_id(config.store_id.clone());
        Self::with_headers(config, headers)
    }

    /// Catalog client for an installed system: the OEM store id applies
    /// unless the configuration names one
    pub fn for_system(config: StoreConfig, system: Arc<SystemRepository>) -> Result<Self> {
        let store_id = match &config.store_id {
            Some(id) => Some(id.clone()),
            None => store_id_for(system.paths())?,
        };
        let headers = StoreHeaders::default().with_store_id(store_id);
        Ok(Self::with_headers(config, headers)?.with_installed(system))
    }

    pub fn with_headers(config: StoreConfig, headers: StoreHeaders) -> Result<Self> {
        Ok(Self {
            client: StoreClient::new(headers)?,
            config,
            installed: None,
        })
    }

    /// Attach the collaborator `updates` asks for installed identities
    pub fn with_installed(mut self, installed: Arc<dyn InstalledNames>) -> Self {
        self.installed = Some(installed);
        self
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn client(&self) -> &StoreClient {
        &self.client
    }

    /// Search the catalog; a term may be an alias matching several origins
    pub async fn search(&self, term: &str) -> Result<SearchResults> {
        let fields = CATALOG_FIELDS.join(",");
        let url = Url::parse_with_params(
            &self.config.search_uri,
            &[("q", term), ("fields", fields.as_str())],
        )
        .map_err(|e| RepoError::InvalidUrl {
            url: self.config.search_uri.clone(),
            reason: e.to_string(),
        })?;

        let response: SearchResponse = self.client.get_json(url).await?;

        let mut results = SearchResults::new();
        for pkg in response.embedded.packages {
            results
                .entry(pkg.package_name.clone())
                .or_default()
                .push(RemoteSnap::new(pkg));
        }
        Ok(results)
    }

    /// Catalog records for `name.origin`
    pub async fn details(&self, name: &str, origin: &str) -> Result<Vec<RemoteSnap>> {
        let qualified = if origin.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", name, origin)
        };
        let raw = format!("{}/{}", self.config.details_uri.trim_end_matches('/'), qualified);
        let url = Url::parse(&raw).map_err(|e| RepoError::InvalidUrl {
            url: raw.clone(),
            reason: e.to_string(),
        })?;

        let not_found = || RepoError::NotFound {
            name: qualified.clone(),
        };

        let response: DetailsResponse = match self.client.get_json(url).await {
            Ok(response) => response,
            Err(RepoError::NotFound { .. }) => return Err(not_found()),
            Err(e) => return Err(e),
        };

        let packages = match response {
            DetailsResponse::Many(packages) => packages,
            DetailsResponse::One(pkg) => vec![*pkg],
            DetailsResponse::Error { errors } => {
                tracing::debug!("details for {} failed: {}", qualified, errors.join("; "));
                Vec::new()
            }
        };

        if packages.is_empty() {
            return Err(not_found());
        }
        Ok(packages.into_iter().map(RemoteSnap::new).collect())
    }

    /// Newer versions of the installed packages
    ///
    /// With nothing installed no request is made: the bulk endpoint answers
    /// an empty name list with the whole catalog.
    pub async fn updates(&self) -> Result<Vec<RemoteSnap>> {
        let Some(installed) = &self.installed else {
            return Ok(Vec::new());
        };

        let names: Vec<String> = installed
            .installed_names()?
            .into_iter()
            .collect::<IndexSet<_>>()
            .into_iter()
            .collect();
        if names.is_empty() {
            return Ok(Vec::new());
        }

        let url = Url::parse(&self.config.bulk_uri).map_err(|e| RepoError::InvalidUrl {
            url: self.config.bulk_uri.clone(),
            reason: e.to_string(),
        })?;
        let packages: Vec<RemotePackage> = self
            .client
            .post_json(url, &BulkRequest { name: &names })
            .await?;

        let mut updates = Vec::new();
        for pkg in packages {
            let snap = RemoteSnap::new(pkg);
            let current = installed.active_version(&snap.qualified_name())?;
            if current.as_deref() == Some(snap.version()) {
                continue;
            }
            updates.push(snap);
        }
        Ok(updates)
    }
}
