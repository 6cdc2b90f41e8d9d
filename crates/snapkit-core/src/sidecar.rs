//! Sidecar records stored next to installed packages

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;

/// `hashes.yaml`: digest of the archive a version was installed from
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Hashes {
    #[serde(default)]
    pub archive_sha512: String,
}

/// Display metadata recorded when a version came from the store
///
/// Takes precedence over the corresponding manifest fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreManifest {
    pub name: String,

    #[serde(default)]
    pub origin: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, rename = "downloadsize")]
    pub download_size: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

/// Read a YAML sidecar, `None` when it does not exist
fn load<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<Option<T>> {
    match std::fs::read(path) {
        Ok(data) => Ok(Some(serde_yaml::from_slice(&data)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn save<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_yaml::to_string(value)?)?;
    Ok(())
}

impl Hashes {
    pub fn new(archive_sha512: impl Into<String>) -> Self {
        Self {
            archive_sha512: archive_sha512.into(),
        }
    }

    pub fn load(path: &Path) -> Result<Option<Self>> {
        load(path)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        save(self, path)
    }
}

impl StoreManifest {
    pub fn load(path: &Path) -> Result<Option<Self>> {
        load(path)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        save(self, path)
    }
}
