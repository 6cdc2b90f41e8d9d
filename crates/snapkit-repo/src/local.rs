//! Installed packages on disk
//!
//! Layout: `<root>/<qualifiedName>/<version>/meta/package.yaml`, with a
//! `current` symlink next to the version directories.

use snapkit_core::{
    CURRENT_LINK, InstalledSnap, MANIFEST_PATH, PackageType, Paths, identity,
};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::store::InstalledNames;

/// One install root
#[derive(Debug, Clone)]
pub struct LocalRepository {
    root: PathBuf,
    paths: Paths,
}

impl LocalRepository {
    pub fn new(root: impl Into<PathBuf>, paths: Paths) -> Self {
        Self {
            root: root.into(),
            paths,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Every version of every package below the root, in directory order
    ///
    /// A missing root yields nothing; a malformed manifest is an error.
    pub fn scan(&self) -> Result<Vec<InstalledSnap>> {
        let mut snaps = Vec::new();
        if !self.root.is_dir() {
            return Ok(snaps);
        }

        for package in std::fs::read_dir(&self.root)? {
            let package = package?;
            if !package.file_type()?.is_dir() || is_hidden(&package.file_name()) {
                continue;
            }

            for version in std::fs::read_dir(package.path())? {
                let version = version?;
                let name = version.file_name();
                if name == CURRENT_LINK || is_hidden(&name) || !version.file_type()?.is_dir() {
                    continue;
                }

                let yaml_path = version.path().join(MANIFEST_PATH);
                if !yaml_path.exists() {
                    tracing::warn!("skipping {}: no {}", version.path().display(), MANIFEST_PATH);
                    continue;
                }
                snaps.push(InstalledSnap::load(&yaml_path, &self.paths)?);
            }
        }

        Ok(snaps)
    }

    /// Installed versions of `name`, optionally restricted to one origin
    pub fn find(&self, name: &str, origin: Option<&str>) -> Result<Vec<InstalledSnap>> {
        Ok(self
            .scan()?
            .into_iter()
            .filter(|s| s.name() == name)
            .filter(|s| origin.is_none_or(|o| o.is_empty() || s.origin() == o))
            .collect())
    }
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_string_lossy().starts_with('.')
}

/// Every installed package on the system: apps, frameworks and OEM
#[derive(Debug, Clone)]
pub struct SystemRepository {
    paths: Paths,
    apps: LocalRepository,
    oem: LocalRepository,
}

impl SystemRepository {
    pub fn new(paths: Paths) -> Self {
        Self {
            apps: LocalRepository::new(paths.apps_dir.clone(), paths.clone()),
            oem: LocalRepository::new(paths.oem_dir.clone(), paths.clone()),
            paths,
        }
    }

    pub fn paths(&self) -> &Paths {
        &self.paths
    }

    pub fn apps(&self) -> &LocalRepository {
        &self.apps
    }

    pub fn oem(&self) -> &LocalRepository {
        &self.oem
    }

    /// All installed versions
    pub fn installed(&self) -> Result<Vec<InstalledSnap>> {
        let mut snaps = self.apps.scan()?;
        snaps.extend(self.oem.scan()?);
        Ok(snaps)
    }

    /// Only the versions `current` points at
    pub fn active(&self) -> Result<Vec<InstalledSnap>> {
        Ok(self
            .installed()?
            .into_iter()
            .filter(InstalledSnap::is_active)
            .collect())
    }

    pub fn active_by_type(&self, types: &[PackageType]) -> Result<Vec<InstalledSnap>> {
        Ok(self
            .active()?
            .into_iter()
            .filter(|s| types.contains(&s.package_type()))
            .collect())
    }

    pub fn active_by_qualified_name(&self, qualified_name: &str) -> Result<Option<InstalledSnap>> {
        Ok(self
            .active()?
            .into_iter()
            .find(|s| s.qualified_name() == qualified_name))
    }

    /// Every installed version sharing a qualified name
    pub fn versions_of(&self, qualified_name: &str) -> Result<Vec<InstalledSnap>> {
        Ok(self
            .installed()?
            .into_iter()
            .filter(|s| s.qualified_name() == qualified_name)
            .collect())
    }

    pub fn active_oem(&self) -> Result<Option<InstalledSnap>> {
        Ok(self.active_by_type(&[PackageType::Oem])?.into_iter().next())
    }

    /// Store id declared by the active OEM package
    pub fn store_id(&self) -> Result<Option<String>> {
        Ok(self
            .active_oem()?
            .and_then(|oem| oem.manifest().store_id().map(String::from)))
    }

    /// Installed versions declaring `framework` as a dependency, active or
    /// not, in scan order
    pub fn dependents(&self, framework: &str) -> Result<Vec<InstalledSnap>> {
        Ok(self
            .installed()?
            .into_iter()
            .filter(|s| s.manifest().depends_on(framework))
            .collect())
    }

    /// Names of [`SystemRepository::dependents`], once per package
    pub fn dependent_names(&self, framework: &str) -> Result<Vec<String>> {
        let mut names: Vec<String> = Vec::new();
        for snap in self.dependents(framework)? {
            if !names.iter().any(|n| n == snap.name()) {
                names.push(snap.name().to_string());
            }
        }
        Ok(names)
    }
}

impl InstalledNames for SystemRepository {
    fn installed_names(&self) -> Result<Vec<String>> {
        Ok(self
            .active_by_type(&[PackageType::App, PackageType::Framework, PackageType::Oem])?
            .iter()
            .map(|s| s.qualified_name().to_string())
            .collect())
    }

    fn active_version(&self, qualified_name: &str) -> Result<Option<String>> {
        Ok(self
            .active_by_qualified_name(qualified_name)?
            .map(|s| s.version().to_string()))
    }
}

/// Store id for requests made from the system rooted at `paths`
pub fn store_id_for(paths: &Paths) -> Result<Option<String>> {
    SystemRepository::new(paths.clone()).store_id()
}

/// Split `name.origin` for lookups, accepting bare names
pub fn parse_lookup(term: &str) -> (&str, Option<&str>) {
    identity::split_qualified_name(term)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn make_snap(root: &Path, qualified: &str, version: &str, yaml: &str, active: bool) {
        let base = root.join(qualified).join(version);
        fs::create_dir_all(base.join("meta")).unwrap();
        fs::write(base.join(MANIFEST_PATH), yaml).unwrap();
        if active {
            std::os::unix::fs::symlink(version, root.join(qualified).join(CURRENT_LINK)).unwrap();
        }
    }

    fn setup() -> (TempDir, Paths) {
        let dir = TempDir::new().unwrap();
        let paths = Paths::new(dir.path());
        (dir, paths)
    }

    #[test]
    fn test_missing_root_is_empty() {
        let (_dir, paths) = setup();
        let repo = LocalRepository::new(paths.apps_dir.clone(), paths);
        assert!(repo.scan().unwrap().is_empty());
    }

    #[test]
    fn test_scan_yields_every_version() {
        let (_dir, paths) = setup();
        let yaml = "name: hello-app\nversion: 1.10\nvendor: foo\n";
        make_snap(&paths.apps_dir, "hello-app.mvo", "1.10", yaml, false);
        make_snap(
            &paths.apps_dir,
            "hello-app.mvo",
            "2.0",
            "name: hello-app\nversion: 2.0\nvendor: foo\n",
            true,
        );

        let repo = LocalRepository::new(paths.apps_dir.clone(), paths.clone());
        let snaps = repo.scan().unwrap();
        assert_eq!(snaps.len(), 2);
        assert_eq!(snaps.iter().filter(|s| s.is_active()).count(), 1);

        let found = repo.find("hello-app", Some("mvo")).unwrap();
        assert_eq!(found.len(), 2);
        assert!(repo.find("hello-app", Some("other")).unwrap().is_empty());
    }

    #[test]
    fn test_malformed_manifest_is_an_error() {
        let (_dir, paths) = setup();
        make_snap(&paths.apps_dir, "broken.mvo", "1", "name: broken\n", false);

        let repo = LocalRepository::new(paths.apps_dir.clone(), paths);
        assert!(repo.scan().is_err());
    }

    #[test]
    fn test_hidden_directories_are_skipped() {
        let (_dir, paths) = setup();
        make_snap(&paths.apps_dir, ".staging-1", "1", "name: x\n", false);
        make_snap(
            &paths.apps_dir,
            "foo.mvo",
            "1",
            "name: foo\nversion: 1\nvendor: foo\n",
            true,
        );
        fs::create_dir_all(paths.apps_dir.join("foo.mvo/.1.replaced")).unwrap();

        let repo = LocalRepository::new(paths.apps_dir.clone(), paths);
        assert_eq!(repo.scan().unwrap().len(), 1);
    }

    #[test]
    fn test_system_repository_views() {
        let (_dir, paths) = setup();
        make_snap(
            &paths.apps_dir,
            "fmk",
            "1",
            "name: fmk\nversion: 1\nvendor: foo\ntype: framework\n",
            true,
        );
        make_snap(
            &paths.apps_dir,
            "foo.mvo",
            "1",
            "name: foo\nversion: 1\nvendor: foo\nframeworks: [fmk]\n",
            true,
        );
        make_snap(
            &paths.oem_dir,
            "oem-foo",
            "1",
            "name: oem-foo\nversion: 1\nvendor: foo\ntype: oem\noem:\n  store:\n    id: my-store\n",
            true,
        );

        let system = SystemRepository::new(paths);
        assert_eq!(system.installed().unwrap().len(), 3);
        assert_eq!(system.store_id().unwrap().as_deref(), Some("my-store"));
        assert_eq!(system.dependent_names("fmk").unwrap(), vec!["foo"]);
        assert!(system.dependent_names("foo").unwrap().is_empty());

        let mut names = system.installed_names().unwrap();
        names.sort();
        assert_eq!(names, vec!["fmk", "foo.mvo", "oem-foo"]);
        assert_eq!(system.active_version("foo.mvo").unwrap().as_deref(), Some("1"));
        assert_eq!(system.active_version("bar.mvo").unwrap(), None);
    }

    #[test]
    fn test_inactive_versions_are_dependents() {
        let (_dir, paths) = setup();
        let app = |v: &str| format!("name: foo\nversion: {}\nvendor: foo\nframeworks: [fmk]\n", v);
        make_snap(&paths.apps_dir, "foo.mvo", "1", &app("1"), false);
        make_snap(&paths.apps_dir, "foo.mvo", "2", &app("2"), false);
        make_snap(
            &paths.apps_dir,
            "bar.mvo",
            "1",
            "name: bar\nversion: 1\nvendor: foo\n",
            true,
        );

        let system = SystemRepository::new(paths);
        assert_eq!(system.dependents("fmk").unwrap().len(), 2);
        assert_eq!(system.dependent_names("fmk").unwrap(), vec!["foo"]);
    }

    #[test]
    fn test_parse_lookup() {
        assert_eq!(parse_lookup("foo.mvo"), ("foo", Some("mvo")));
        assert_eq!(parse_lookup("foo"), ("foo", None));
    }
}
