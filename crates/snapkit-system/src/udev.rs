//! Hardware assignment rule files of OEM packages

use async_trait::async_trait;
use snapkit_core::{Manifest, Paths};
use std::path::PathBuf;

use crate::command;
use crate::error::Result;

/// Rule activation interface of the device manager
#[async_trait]
pub trait UdevControl: Send + Sync {
    async fn reload_rules(&self) -> Result<()>;

    /// Re-evaluate rules for existing devices
    async fn trigger(&self) -> Result<()>;
}

/// [`UdevControl`] backed by `udevadm`
#[derive(Debug, Clone, Default)]
pub struct Udevadm;

#[async_trait]
impl UdevControl for Udevadm {
    async fn reload_rules(&self) -> Result<()> {
        command::run("udevadm", &["control", "--reload-rules"])
            .await
            .map(|_| ())
    }

    async fn trigger(&self) -> Result<()> {
        command::run("udevadm", &["trigger"]).await.map(|_| ())
    }
}

/// Write one rule file per hardware assignment of an OEM manifest
pub fn write_rules(paths: &Paths, manifest: &Manifest, qualified_name: &str) -> Result<Vec<PathBuf>> {
    let Some(oem) = &manifest.oem else {
        return Ok(Vec::new());
    };

    let files = oem.udev_rule_files(qualified_name)?;
    if files.is_empty() {
        return Ok(Vec::new());
    }

    std::fs::create_dir_all(&paths.udev_rules_dir)?;
    let mut written = Vec::with_capacity(files.len());
    for (name, content) in files {
        let path = paths.udev_rules_dir.join(name);
        std::fs::write(&path, content)?;
        written.push(path);
    }
    Ok(written)
}

/// Delete the rule files [`write_rules`] produced; missing files are fine
pub fn remove_rules(paths: &Paths, manifest: &Manifest, qualified_name: &str) -> Result<usize> {
    let Some(oem) = &manifest.oem else {
        return Ok(0);
    };

    let mut removed = 0;
    for assign in &oem.hardware.assign {
        let path = paths.udev_rules_dir.join(assign.rule_file_name(qualified_name));
        match std::fs::remove_file(&path) {
            Ok(()) => removed += 1,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(removed)
}

/// Reload rules, then re-evaluate devices
pub async fn activate(udev: &dyn UdevControl) -> Result<()> {
    udev.reload_rules().await?;
    udev.trigger().await
}
