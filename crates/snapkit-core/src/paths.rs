//! On-disk layout
//!
//! Every location is derived from a single root so tests can run the whole
//! system inside a temporary directory.

use std::path::{Path, PathBuf};

use crate::identity::PackageType;

/// Name of the symlink marking the active version
pub const CURRENT_LINK: &str = "current";

/// Content digest sidecar inside a version directory
pub const HASHES_FILE: &str = "hashes.yaml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    pub root: PathBuf,
    /// Apps and frameworks, `<apps>/<qualifiedName>/<version>`
    pub apps_dir: PathBuf,
    /// OEM packages
    pub oem_dir: PathBuf,
    /// Store metadata sidecars
    pub meta_dir: PathBuf,
    pub icons_dir: PathBuf,
    /// Security policy descriptors
    pub apparmor_dir: PathBuf,
    pub seccomp_dir: PathBuf,
    pub services_dir: PathBuf,
    pub udev_rules_dir: PathBuf,
}

impl Default for Paths {
    fn default() -> Self {
        Self::new("/")
    }
}

impl Paths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            apps_dir: root.join("apps"),
            oem_dir: root.join("oem"),
            meta_dir: root.join("var/lib/snappy/meta"),
            icons_dir: root.join("var/lib/snappy/icons"),
            apparmor_dir: root.join("var/lib/apparmor/clicks"),
            seccomp_dir: root.join("var/lib/snappy/seccomp/profiles"),
            services_dir: root.join("etc/systemd/system"),
            udev_rules_dir: root.join("etc/udev/rules.d"),
            root,
        }
    }

    /// Install root for a package type
    pub fn install_root(&self, package_type: PackageType) -> &Path {
        match package_type {
            PackageType::Oem => &self.oem_dir,
            PackageType::App | PackageType::Framework => &self.apps_dir,
        }
    }

    pub fn package_dir(&self, package_type: PackageType, qualified_name: &str) -> PathBuf {
        self.install_root(package_type).join(qualified_name)
    }

    pub fn version_dir(
        &self,
        package_type: PackageType,
        qualified_name: &str,
        version: &str,
    ) -> PathBuf {
        self.package_dir(package_type, qualified_name).join(version)
    }

    /// Store metadata sidecar for one installed version
    pub fn store_manifest(&self, qualified_name: &str, version: &str) -> PathBuf {
        self.meta_dir
            .join(format!("{}_{}.manifest", qualified_name, version))
    }

    pub fn icon(&self, qualified_name: &str, version: &str) -> PathBuf {
        self.icons_dir.join(format!("{}_{}.png", qualified_name, version))
    }

    /// Create every directory of the layout
    pub fn ensure(&self) -> std::io::Result<()> {
        for dir in [
            &self.apps_dir,
            &self.oem_dir,
            &self.meta_dir,
            &self.icons_dir,
            &self.apparmor_dir,
            &self.seccomp_dir,
            &self.services_dir,
            &self.udev_rules_dir,
        ] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_from_root() {
        let paths = Paths::new("/tmp/root");
        assert_eq!(paths.apps_dir, PathBuf::from("/tmp/root/apps"));
        assert_eq!(
            paths.version_dir(PackageType::App, "foo.mvo", "1.0"),
            PathBuf::from("/tmp/root/apps/foo.mvo/1.0")
        );
        assert_eq!(
            paths.version_dir(PackageType::Oem, "oem-foo", "2"),
            PathBuf::from("/tmp/root/oem/oem-foo/2")
        );
        assert_eq!(
            paths.store_manifest("foo.bar", "1.0"),
            PathBuf::from("/tmp/root/var/lib/snappy/meta/foo.bar_1.0.manifest")
        );
        assert_eq!(
            paths.icon("foo.bar", "1.0"),
            PathBuf::from("/tmp/root/var/lib/snappy/icons/foo.bar_1.0.png")
        );
    }

    #[test]
    fn test_ensure_creates_directories() {
        let dir = tempfile::TempDir::new().unwrap();
        let paths = Paths::new(dir.path());
        paths.ensure().unwrap();
        assert!(paths.apparmor_dir.is_dir());
        assert!(paths.udev_rules_dir.is_dir());
    }
}
