//! AppArmor policy descriptors and dependent policy refresh
//!
//! Every binary and service gets a JSON descriptor in the apparmor
//! directory; the profile compiler turns descriptors into loaded profiles.
//! When a framework changes the policy groups or templates it ships, the
//! affected entities of its dependents are regenerated and marked for
//! recompilation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use snapkit_core::security::{policy_file_name, profile_name};
use snapkit_core::{InstalledSnap, Paths, Release, SecurityDefinitions};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::command;
use crate::error::Result;

/// Where a framework ships its policy, relative to its version directory
pub const FRAMEWORK_POLICY_DIR: &str = "meta/framework-policy/apparmor";

pub const POLICY_VENDOR: &str = "ubuntu-core";
pub const DEFAULT_TEMPLATE: &str = "default";
pub const DEFAULT_POLICY_GROUPS: &[&str] = &["networking"];

/// Compile-profile interface of the policy tooling
#[async_trait]
pub trait ProfileCompiler: Send + Sync {
    /// Build and load the profile described by `descriptor`
    async fn compile(&self, profile: &str, descriptor: &Path) -> Result<()>;

    /// Unload a profile whose descriptor was deleted
    async fn remove(&self, profile: &str) -> Result<()>;

    /// Mark `descriptor` as newer than its compiled profile
    async fn touch(&self, descriptor: &Path) -> Result<()>;
}

/// [`ProfileCompiler`] backed by `aa-clickhook`
#[derive(Debug, Clone, Default)]
pub struct ClickHook;

#[async_trait]
impl ProfileCompiler for ClickHook {
    async fn compile(&self, profile: &str, descriptor: &Path) -> Result<()> {
        tracing::debug!("compiling profile {}", profile);
        let include = format!("--include={}", descriptor.display());
        command::run("aa-clickhook", &["-f", &include]).await.map(|_| ())
    }

    // aa-clickhook drops profiles whose descriptor is gone
    async fn remove(&self, profile: &str) -> Result<()> {
        tracing::debug!("removing profile {}", profile);
        command::run("aa-clickhook", &[]).await.map(|_| ())
    }

    async fn touch(&self, descriptor: &Path) -> Result<()> {
        let file = std::fs::File::options().append(true).open(descriptor)?;
        file.set_modified(SystemTime::now())?;
        Ok(())
    }
}

/// Content of one `<qualifiedName>_<entity>_<version>.json` descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PolicyDescriptor {
    /// Complete profile shipped by the package
    Policy {
        #[serde(rename = "security-policy")]
        policy: ResolvedPaths,
    },
    /// Profile generated from a package-provided override
    Override {
        #[serde(rename = "security-override")]
        overrides: ResolvedPaths,
        policy_vendor: String,
        policy_version: String,
    },
    /// Profile generated from a template and policy groups
    Template {
        template: String,
        policy_groups: Vec<String>,
        policy_vendor: String,
        policy_version: String,
    },
}

/// Profile paths made absolute against the version directory
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedPaths {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apparmor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seccomp: Option<String>,
}

impl PolicyDescriptor {
    pub fn for_entity(base_dir: &Path, security: &SecurityDefinitions, release: &Release) -> Self {
        let resolve = |rel: &Option<String>| {
            rel.as_ref()
                .map(|p| base_dir.join(p).display().to_string())
        };

        if let Some(policy) = &security.security_policy {
            return PolicyDescriptor::Policy {
                policy: ResolvedPaths {
                    apparmor: resolve(&policy.apparmor),
                    seccomp: resolve(&policy.seccomp),
                },
            };
        }

        if let Some(overrides) = &security.security_override {
            return PolicyDescriptor::Override {
                overrides: ResolvedPaths {
                    apparmor: resolve(&overrides.apparmor),
                    seccomp: resolve(&overrides.seccomp),
                },
                policy_vendor: POLICY_VENDOR.to_string(),
                policy_version: release.series.clone(),
            };
        }

        let policy_groups = if security.caps.is_empty() {
            DEFAULT_POLICY_GROUPS.iter().map(|s| s.to_string()).collect()
        } else {
            security.caps.clone()
        };

        PolicyDescriptor::Template {
            template: security
                .security_template
                .clone()
                .unwrap_or_else(|| DEFAULT_TEMPLATE.to_string()),
            policy_groups,
            policy_vendor: POLICY_VENDOR.to_string(),
            policy_version: release.series.clone(),
        }
    }
}

fn descriptor_path(paths: &Paths, snap: &InstalledSnap, entity: &str) -> PathBuf {
    paths
        .apparmor_dir
        .join(policy_file_name(snap.qualified_name(), entity, snap.version()))
}

fn write_descriptor(
    paths: &Paths,
    snap: &InstalledSnap,
    entity: &str,
    security: &SecurityDefinitions,
    release: &Release,
) -> Result<PathBuf> {
    let path = descriptor_path(paths, snap, entity);
    let descriptor = PolicyDescriptor::for_entity(snap.base_dir(), security, release);
    std::fs::write(&path, serde_json::to_vec_pretty(&descriptor)?)?;
    Ok(path)
}

/// Write the descriptors of every entity of `snap`, compiling each unless
/// `compile` is false
pub async fn install_policies(
    paths: &Paths,
    snap: &InstalledSnap,
    release: &Release,
    compiler: &dyn ProfileCompiler,
    compile: bool,
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(&paths.apparmor_dir)?;

    let mut written = Vec::new();
    for (entity, security) in snap.manifest().security_entities() {
        let path = write_descriptor(paths, snap, entity, security, release)?;
        if compile {
            let profile = profile_name(snap.qualified_name(), entity, snap.version());
            compiler.compile(&profile, &path).await?;
        }
        written.push(path);
    }
    Ok(written)
}

/// Delete the descriptors of `snap` and unload their profiles
pub async fn remove_policies(
    paths: &Paths,
    snap: &InstalledSnap,
    compiler: &dyn ProfileCompiler,
    unload: bool,
) -> Result<()> {
    for (entity, _) in snap.manifest().security_entities() {
        match std::fs::remove_file(descriptor_path(paths, snap, entity)) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        if unload {
            let profile = profile_name(snap.qualified_name(), entity, snap.version());
            compiler.remove(&profile).await?;
        }
    }
    Ok(())
}

/// Policy groups and templates a framework version changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicyChanges {
    pub caps: HashSet<String>,
    pub templates: HashSet<String>,
}

impl PolicyChanges {
    pub fn is_empty(&self) -> bool {
        self.caps.is_empty() && self.templates.is_empty()
    }
}

type PolicyFiles = BTreeMap<String, Vec<u8>>;

fn read_policy_dir(dir: &Path) -> Result<PolicyFiles> {
    let mut files = PolicyFiles::new();
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(files),
        Err(e) => return Err(e.into()),
    };
    for entry in entries {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            let name = entry.file_name().to_string_lossy().to_string();
            files.insert(name, std::fs::read(entry.path())?);
        }
    }
    Ok(files)
}

fn changed_names(framework: &str, old: &PolicyFiles, new: &PolicyFiles) -> HashSet<String> {
    old.keys()
        .chain(new.keys())
        .filter(|name| old.get(*name) != new.get(*name))
        .map(|name| format!("{}_{}", framework, name))
        .collect()
}

/// Compare the policy shipped by two versions of `framework`
///
/// `old` is `None` for a fresh install, which changes nothing. Names are
/// prefixed with the framework name, the way dependents refer to them.
pub fn policy_changes(framework: &str, old: Option<&Path>, new: &Path) -> Result<PolicyChanges> {
    let Some(old) = old else {
        return Ok(PolicyChanges::default());
    };
    let load = |base: &Path, kind: &str| read_policy_dir(&base.join(FRAMEWORK_POLICY_DIR).join(kind));

    Ok(PolicyChanges {
        caps: changed_names(
            framework,
            &load(old, "policygroups")?,
            &load(new, "policygroups")?,
        ),
        templates: changed_names(
            framework,
            &load(old, "templates")?,
            &load(new, "templates")?,
        ),
    })
}

/// Regenerate the descriptors of the entities of `snap` affected by
/// `changes` and mark them for recompilation
pub async fn request_apparmor_update(
    paths: &Paths,
    snap: &InstalledSnap,
    changes: &PolicyChanges,
    release: &Release,
    compiler: &dyn ProfileCompiler,
) -> Result<Vec<PathBuf>> {
    let mut touched = Vec::new();
    for (entity, security) in snap.manifest().security_entities() {
        if !security.needs_apparmor_update(&changes.caps, &changes.templates) {
            continue;
        }
        std::fs::create_dir_all(&paths.apparmor_dir)?;
        let path = write_descriptor(paths, snap, entity, security, release)?;
        compiler.touch(&path).await?;
        touched.push(path);
    }
    Ok(touched)
}
