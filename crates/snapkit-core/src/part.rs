//! Package parts: installed versions on disk and catalog entries
//!
//! A [`Part`] is a read-mostly snapshot. Installing produces a new version
//! directory; callers re-scan to observe it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::{CoreError, Result};
use crate::identity::{self, PackageType};
use crate::manifest::Manifest;
use crate::paths::{CURRENT_LINK, HASHES_FILE, Paths};
use crate::release;
use crate::sidecar::{Hashes, StoreManifest};

/// One installed version of a package
#[derive(Debug, Clone)]
pub struct InstalledSnap {
    base_dir: PathBuf,
    qualified_name: String,
    manifest: Manifest,
    origin: String,
    hash: Option<String>,
    store: Option<StoreManifest>,
    is_active: bool,
}

impl InstalledSnap {
    /// Load the version owning `<base>/meta/package.yaml`
    pub fn load(yaml_path: &Path, paths: &Paths) -> Result<Self> {
        let base_dir = yaml_path
            .parent()
            .and_then(Path::parent)
            .ok_or_else(|| CoreError::InvalidManifest {
                message: format!("{} is not inside a package", yaml_path.display()),
            })?
            .to_path_buf();

        let qualified_name = base_dir
            .parent()
            .and_then(Path::file_name)
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| CoreError::InvalidManifest {
                message: format!("{} is not inside a package", yaml_path.display()),
            })?;

        let manifest = Manifest::load(yaml_path, false)?;

        let store = StoreManifest::load(&paths.store_manifest(&qualified_name, &manifest.version))?;
        let origin = match &store {
            Some(store) if !store.origin.is_empty() => store.origin.clone(),
            _ => identity::split_qualified_name(&qualified_name)
                .1
                .unwrap_or_default()
                .to_string(),
        };

        let hash = Hashes::load(&base_dir.join(HASHES_FILE))?.map(|h| h.archive_sha512);
        let is_active = points_at(&base_dir)?;

        Ok(Self {
            base_dir,
            qualified_name,
            manifest,
            origin,
            hash,
            store,
            is_active,
        })
    }

    pub fn name(&self) -> &str {
        &self.manifest.name
    }

    pub fn version(&self) -> &str {
        &self.manifest.version
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn vendor(&self) -> &str {
        &self.manifest.vendor
    }

    /// Name of the directory holding all versions
    pub fn qualified_name(&self) -> &str {
        &self.qualified_name
    }

    pub fn package_type(&self) -> PackageType {
        self.manifest.package_type
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn description(&self) -> Option<&str> {
        self.store
            .as_ref()
            .and_then(|s| s.description.as_deref())
            .or(self.manifest.description.as_deref())
    }

    pub fn channel(&self) -> Option<&str> {
        self.store.as_ref().and_then(|s| s.channel.as_deref())
    }

    pub fn download_size(&self) -> Option<u64> {
        self.store.as_ref().map(|s| s.download_size)
    }

    pub fn hash(&self) -> Option<&str> {
        self.hash.as_deref()
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn frameworks(&self) -> &[String] {
        &self.manifest.frameworks
    }

    pub fn icon(&self) -> Option<PathBuf> {
        match self.store.as_ref().and_then(|s| s.icon.as_ref()) {
            Some(icon) => Some(PathBuf::from(icon)),
            None => self.manifest.icon.as_ref().map(|i| self.base_dir.join(i)),
        }
    }

    /// Install time, taken from the version directory
    pub fn date(&self) -> Result<DateTime<Utc>> {
        let modified = std::fs::metadata(&self.base_dir)?.modified()?;
        Ok(DateTime::<Utc>::from(modified))
    }

    /// Total size of the files in the version directory
    pub fn installed_size(&self) -> Result<u64> {
        let mut total = 0;
        for entry in WalkDir::new(&self.base_dir) {
            let entry = entry.map_err(|e| std::io::Error::other(e.to_string()))?;
            if entry.file_type().is_file() {
                total += entry.metadata().map_err(|e| std::io::Error::other(e.to_string()))?.len();
            }
        }
        Ok(total)
    }

    /// Environment exported to hooks and services of this version
    pub fn hook_env(&self) -> Vec<(String, String)> {
        vec![
            ("SNAP_NAME".to_string(), self.name().to_string()),
            ("SNAP_ORIGIN".to_string(), self.origin.clone()),
            ("SNAP_FULLNAME".to_string(), self.qualified_name.clone()),
            ("SNAP_VERSION".to_string(), self.version().to_string()),
            (
                "SNAP_APP_PATH".to_string(),
                self.base_dir.display().to_string(),
            ),
            (
                "SNAP_ARCH".to_string(),
                release::host_architecture().to_string(),
            ),
        ]
    }
}

/// Does `<parent>/current` resolve to `dir`
fn points_at(dir: &Path) -> Result<bool> {
    let Some(parent) = dir.parent() else {
        return Ok(false);
    };
    let link = parent.join(CURRENT_LINK);
    if std::fs::symlink_metadata(&link).is_err() {
        return Ok(false);
    }
    match (std::fs::canonicalize(&link), std::fs::canonicalize(dir)) {
        (Ok(target), Ok(dir)) => Ok(target == dir),
        _ => Ok(false),
    }
}

/// Fields requested from the catalog; mirrors [`RemotePackage`]
pub const CATALOG_FIELDS: &[&str] = &[
    "alias",
    "anon_download_url",
    "architecture",
    "binary_filesize",
    "channel",
    "content",
    "download_sha512",
    "download_url",
    "icon_url",
    "last_updated",
    "origin",
    "package_name",
    "publisher",
    "title",
    "version",
];

/// A catalog record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemotePackage {
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub anon_download_url: Option<String>,
    #[serde(default)]
    pub architecture: Vec<String>,
    #[serde(default)]
    pub binary_filesize: u64,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub download_sha512: Option<String>,
    #[serde(default)]
    pub download_url: Option<String>,
    #[serde(default)]
    pub icon_url: Option<String>,
    #[serde(default)]
    pub last_updated: Option<String>,
    #[serde(default)]
    pub origin: String,
    pub package_name: String,
    #[serde(default)]
    pub publisher: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    pub version: String,
}

/// A package version known to the catalog, not fetched yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteSnap {
    pkg: RemotePackage,
}

impl RemoteSnap {
    pub fn new(pkg: RemotePackage) -> Self {
        Self { pkg }
    }

    pub fn package(&self) -> &RemotePackage {
        &self.pkg
    }

    pub fn name(&self) -> &str {
        &self.pkg.package_name
    }

    pub fn version(&self) -> &str {
        &self.pkg.version
    }

    pub fn origin(&self) -> &str {
        &self.pkg.origin
    }

    pub fn vendor(&self) -> Option<&str> {
        self.pkg.publisher.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.pkg.title.as_deref()
    }

    pub fn package_type(&self) -> PackageType {
        self.pkg
            .content
            .as_deref()
            .and_then(|c| c.parse().ok())
            .unwrap_or_default()
    }

    pub fn qualified_name(&self) -> String {
        identity::qualified_name(self.package_type(), self.name(), self.origin())
    }

    pub fn download_size(&self) -> u64 {
        self.pkg.binary_filesize
    }

    pub fn channel(&self) -> Option<&str> {
        self.pkg.channel.as_deref()
    }

    pub fn alias(&self) -> Option<&str> {
        self.pkg.alias.as_deref()
    }

    pub fn icon_url(&self) -> Option<&str> {
        self.pkg.icon_url.as_deref()
    }

    /// Anonymous download preferred over the authenticated one
    pub fn download_url(&self) -> Option<&str> {
        self.pkg
            .anon_download_url
            .as_deref()
            .or(self.pkg.download_url.as_deref())
    }

    pub fn sha512(&self) -> Option<&str> {
        self.pkg.download_sha512.as_deref()
    }

    pub fn architectures(&self) -> &[String] {
        &self.pkg.architecture
    }

    pub fn date(&self) -> Option<DateTime<Utc>> {
        self.pkg
            .last_updated
            .as_deref()
            .and_then(|d| DateTime::parse_from_rfc3339(d).ok())
            .map(|d| d.with_timezone(&Utc))
    }

    /// Store metadata to record once this version is installed
    pub fn store_manifest(&self) -> StoreManifest {
        StoreManifest {
            name: self.name().to_string(),
            origin: self.origin().to_string(),
            alias: self.pkg.alias.clone(),
            description: self.pkg.title.clone(),
            download_size: self.pkg.binary_filesize,
            channel: self.pkg.channel.clone(),
            icon: None,
        }
    }
}

/// A package instance, installed or remote
#[derive(Debug, Clone)]
pub enum Part {
    Installed(InstalledSnap),
    Remote(RemoteSnap),
}

impl Part {
    pub fn name(&self) -> &str {
        match self {
            Part::Installed(snap) => snap.name(),
            Part::Remote(snap) => snap.name(),
        }
    }

    pub fn version(&self) -> &str {
        match self {
            Part::Installed(snap) => snap.version(),
            Part::Remote(snap) => snap.version(),
        }
    }

    pub fn origin(&self) -> &str {
        match self {
            Part::Installed(snap) => snap.origin(),
            Part::Remote(snap) => snap.origin(),
        }
    }

    pub fn vendor(&self) -> Option<&str> {
        match self {
            Part::Installed(snap) => Some(snap.vendor()),
            Part::Remote(snap) => snap.vendor(),
        }
    }

    pub fn description(&self) -> Option<&str> {
        match self {
            Part::Installed(snap) => snap.description(),
            Part::Remote(snap) => snap.description(),
        }
    }

    pub fn package_type(&self) -> PackageType {
        match self {
            Part::Installed(snap) => snap.package_type(),
            Part::Remote(snap) => snap.package_type(),
        }
    }

    pub fn qualified_name(&self) -> String {
        match self {
            Part::Installed(snap) => snap.qualified_name().to_string(),
            Part::Remote(snap) => snap.qualified_name(),
        }
    }

    pub fn is_installed(&self) -> bool {
        matches!(self, Part::Installed(_))
    }

    pub fn is_active(&self) -> bool {
        match self {
            Part::Installed(snap) => snap.is_active(),
            Part::Remote(_) => false,
        }
    }

    pub fn as_installed(&self) -> Option<&InstalledSnap> {
        match self {
            Part::Installed(snap) => Some(snap),
            Part::Remote(_) => None,
        }
    }

    pub fn as_remote(&self) -> Option<&RemoteSnap> {
        match self {
            Part::Remote(snap) => Some(snap),
            Part::Installed(_) => None,
        }
    }
}

impl From<InstalledSnap> for Part {
    fn from(snap: InstalledSnap) -> Self {
        Part::Installed(snap)
    }
}

impl From<RemoteSnap> for Part {
    fn from(snap: RemoteSnap) -> Self {
        Part::Remote(snap)
    }
}
