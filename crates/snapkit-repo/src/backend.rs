//! Unified repository trait
//!
//! One interface over the installed tree and the remote catalog. Each
//! implementation reports the operations it cannot serve as
//! [`RepoError::Unsupported`].

use async_trait::async_trait;
use snapkit_core::Part;

use crate::error::{RepoError, Result};
use crate::local::{LocalRepository, SystemRepository, parse_lookup};
use crate::store::{SearchResults, StoreRepository};

/// Unified repository trait
#[async_trait]
pub trait Repository: Send + Sync {
    /// Human-readable description of the source
    fn description(&self) -> String;

    /// Every installed version
    async fn installed(&self) -> Result<Vec<Part>>;

    /// Search by name or alias
    async fn search(&self, term: &str) -> Result<SearchResults>;

    /// All parts for one package
    async fn details(&self, name: &str, origin: &str) -> Result<Vec<Part>>;

    /// Available upgrades for what is installed
    async fn updates(&self) -> Result<Vec<Part>>;
}

fn unsupported(repository: &str, operation: &'static str) -> RepoError {
    RepoError::Unsupported {
        repository: repository.to_string(),
        operation,
    }
}

// ============ Local Backend ============

#[async_trait]
impl Repository for LocalRepository {
    fn description(&self) -> String {
        format!("local snaps in {}", self.root().display())
    }

    async fn installed(&self) -> Result<Vec<Part>> {
        Ok(self.scan()?.into_iter().map(Part::from).collect())
    }

    async fn search(&self, _term: &str) -> Result<SearchResults> {
        Err(unsupported("local", "search"))
    }

    async fn details(&self, name: &str, origin: &str) -> Result<Vec<Part>> {
        let (name, parsed_origin) = parse_lookup(name);
        let origin = Some(origin).filter(|o| !o.is_empty()).or(parsed_origin);
        let found = self.find(name, origin)?;
        if found.is_empty() {
            return Err(RepoError::NotFound {
                name: name.to_string(),
            });
        }
        Ok(found.into_iter().map(Part::from).collect())
    }

    async fn updates(&self) -> Result<Vec<Part>> {
        Err(unsupported("local", "updates"))
    }
}

#[async_trait]
impl Repository for SystemRepository {
    fn description(&self) -> String {
        format!("installed snaps below {}", self.paths().root.display())
    }

    async fn installed(&self) -> Result<Vec<Part>> {
        Ok(SystemRepository::installed(self)?
            .into_iter()
            .map(Part::from)
            .collect())
    }

    async fn search(&self, _term: &str) -> Result<SearchResults> {
        Err(unsupported("system", "search"))
    }

    async fn details(&self, name: &str, origin: &str) -> Result<Vec<Part>> {
        let mut parts = match Repository::details(self.apps(), name, origin).await {
            Ok(parts) => parts,
            Err(RepoError::NotFound { .. }) => Vec::new(),
            Err(e) => return Err(e),
        };
        match Repository::details(self.oem(), name, origin).await {
            Ok(oem) => parts.extend(oem),
            Err(RepoError::NotFound { .. }) => {}
            Err(e) => return Err(e),
        }
        if parts.is_empty() {
            return Err(RepoError::NotFound {
                name: name.to_string(),
            });
        }
        Ok(parts)
    }

    async fn updates(&self) -> Result<Vec<Part>> {
        Err(unsupported("system", "updates"))
    }
}

// ============ Store Backend ============

#[async_trait]
impl Repository for StoreRepository {
    fn description(&self) -> String {
        format!("snap store at {}", self.config().search_uri)
    }

    async fn installed(&self) -> Result<Vec<Part>> {
        Err(unsupported("store", "installed"))
    }

    async fn search(&self, term: &str) -> Result<SearchResults> {
        StoreRepository::search(self, term).await
    }

    async fn details(&self, name: &str, origin: &str) -> Result<Vec<Part>> {
        Ok(StoreRepository::details(self, name, origin)
            .await?
            .into_iter()
            .map(Part::from)
            .collect())
    }

    async fn updates(&self) -> Result<Vec<Part>> {
        Ok(StoreRepository::updates(self)
            .await?
            .into_iter()
            .map(Part::from)
            .collect())
    }
}
