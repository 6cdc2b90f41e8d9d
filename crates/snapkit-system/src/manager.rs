//! Install, uninstall and activation of packages
//!
//! [`PackageManager`] drives [`Transaction`]s against the on-disk layout.
//! External effects go through injected collaborators so the whole flow runs
//! inside a temporary root in tests.
//!
//! Nothing is written below an install root before validation succeeds, and
//! the `current` symlink swap is the single activation step. A failure after
//! placement restores the previously active version.

use snapkit_core::{
    CURRENT_LINK, HASHES_FILE, Hashes, InstalledSnap, MANIFEST_PATH, Manifest, PackageType, Part,
    Paths, ProgressSink, Release, RemoteSnap, StoreManifest, check_architectures,
    host_architecture,
};
use snapkit_repo::{Fetcher, StoreClient, StoreHeaders, SystemRepository, store_id_for};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::actions::{InstallOptions, UninstallOptions};
use crate::archive::{ArchiveExtractor, LICENSE_PATH, TarArchive};
use crate::conflicts;
use crate::error::{Result, SystemError};
use crate::security::{self, ClickHook, ProfileCompiler};
use crate::services::{self, ServiceControl, Systemctl};
use crate::transaction::{Transaction, TransactionState};
use crate::udev::{self, UdevControl, Udevadm};

/// Where an install takes its archive from
enum Source<'a> {
    File { path: &'a Path, origin: &'a str },
    Remote(&'a RemoteSnap),
}

/// What an install changed so far, for rollback
#[derive(Default)]
struct Undo {
    package_dir: Option<PathBuf>,
    version_dir: Option<PathBuf>,
    /// Moved-aside copy of a reinstalled version and where it came from
    backup: Option<(PathBuf, PathBuf)>,
    sidecars: Vec<PathBuf>,
    previous: Option<InstalledSnap>,
    previous_unplaced: bool,
    previous_stopped: bool,
    placed: Option<InstalledSnap>,
    activated: bool,
    inhibit_hooks: bool,
}

/// Installs and removes packages below one [`Paths`] root
pub struct PackageManager {
    paths: Paths,
    release: Release,
    architecture: String,
    system: Arc<SystemRepository>,
    services: Arc<dyn ServiceControl>,
    compiler: Arc<dyn ProfileCompiler>,
    udev: Arc<dyn UdevControl>,
    fetcher: Arc<dyn Fetcher>,
    archive: Arc<dyn ArchiveExtractor>,
}

impl PackageManager {
    /// Manager using the system tools and the store for downloads
    pub fn new(paths: Paths) -> Result<Self> {
        let release = Release::default();
        let headers = StoreHeaders::new(&release, host_architecture())
            .with_store_id(store_id_for(&paths)?);
        let fetcher = StoreClient::new(headers)?;

        Ok(Self {
            system: Arc::new(SystemRepository::new(paths.clone())),
            paths,
            release,
            architecture: host_architecture().to_string(),
            services: Arc::new(Systemctl::new()),
            compiler: Arc::new(ClickHook),
            udev: Arc::new(Udevadm),
            fetcher: Arc::new(fetcher),
            archive: Arc::new(TarArchive),
        })
    }

    pub fn with_release(mut self, release: Release) -> Self {
        self.release = release;
        self
    }

    /// Architecture packages are checked against
    pub fn with_architecture(mut self, architecture: impl Into<String>) -> Self {
        self.architecture = architecture.into();
        self
    }

    pub fn with_service_control(mut self, services: Arc<dyn ServiceControl>) -> Self {
        self.services = services;
        self
    }

    pub fn with_profile_compiler(mut self, compiler: Arc<dyn ProfileCompiler>) -> Self {
        self.compiler = compiler;
        self
    }

    pub fn with_udev_control(mut self, udev: Arc<dyn UdevControl>) -> Self {
        self.udev = udev;
        self
    }

    pub fn with_fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.fetcher = fetcher;
        self
    }

    pub fn with_archive_extractor(mut self, archive: Arc<dyn ArchiveExtractor>) -> Self {
        self.archive = archive;
        self
    }

    pub fn paths(&self) -> &Paths {
        &self.paths
    }

    pub fn system(&self) -> &SystemRepository {
        &self.system
    }

    // ============ Part dispatch ============

    /// Install a part; only remote parts can be installed
    pub async fn install(
        &self,
        part: &Part,
        options: &InstallOptions,
        progress: &dyn ProgressSink,
    ) -> Result<Transaction> {
        match part {
            Part::Remote(snap) => self.install_remote(snap, options, progress).await,
            Part::Installed(snap) => Err(SystemError::AlreadyInstalled {
                name: snap.name().to_string(),
                version: snap.version().to_string(),
            }),
        }
    }

    /// Install a snap archive from disk under `origin`
    pub async fn install_file(
        &self,
        archive: &Path,
        origin: &str,
        options: &InstallOptions,
        progress: &dyn ProgressSink,
    ) -> Result<Transaction> {
        let label = archive
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let tx = Transaction::new(label, "");
        self.execute(
            tx,
            Source::File {
                path: archive,
                origin,
            },
            options,
            progress,
        )
        .await
    }

    /// Download and install a catalog entry
    ///
    /// Always fetches; no previously downloaded copy is reused.
    pub async fn install_remote(
        &self,
        snap: &RemoteSnap,
        options: &InstallOptions,
        progress: &dyn ProgressSink,
    ) -> Result<Transaction> {
        let tx = Transaction::new(snap.qualified_name(), snap.version());
        self.execute(tx, Source::Remote(snap), options, progress).await
    }

    // ============ Install ============

    async fn execute(
        &self,
        mut tx: Transaction,
        source: Source<'_>,
        options: &InstallOptions,
        progress: &dyn ProgressSink,
    ) -> Result<Transaction> {
        let mut undo = Undo::default();
        match self
            .run_install(&mut tx, &source, options, progress, &mut undo)
            .await
        {
            Ok(()) => {
                tracing::info!("installed {} {}", tx.target, tx.version);
                Ok(tx)
            }
            Err(e) => {
                tracing::warn!("installing {} failed: {}", tx.target, e);
                if !tx.is_done() && tx.state().has_placed() {
                    self.rollback(undo).await;
                }
                tx.abort(e.to_string());
                Err(e)
            }
        }
    }

    async fn run_install(
        &self,
        tx: &mut Transaction,
        source: &Source<'_>,
        options: &InstallOptions,
        progress: &dyn ProgressSink,
        undo: &mut Undo,
    ) -> Result<()> {
        let downloads = tempfile::TempDir::new()?;

        let (archive, expected, origin, icon) = match source {
            Source::File { path, origin } => (path.to_path_buf(), None, origin.to_string(), None),
            Source::Remote(snap) => {
                self.check_remote(snap)?;
                tx.advance(TransactionState::Fetching)?;
                let (archive, icon) = self.fetch(snap, downloads.path(), progress).await?;
                (
                    archive,
                    snap.sha512().map(String::from),
                    snap.origin().to_string(),
                    icon,
                )
            }
        };

        tx.advance(TransactionState::Unpacking)?;
        let digest = self
            .archive
            .verify(&archive, expected.as_deref(), options.allow_unauthenticated)?;
        let manifest = self.archive.read_manifest(&archive)?;
        let qualified = manifest.qualified_name(&origin);
        tx.identify(&qualified, &manifest.version);

        tx.advance(TransactionState::Validating)?;
        self.validate(&manifest, &origin, options)?;
        let previous = self.system.active_by_qualified_name(&qualified)?;
        self.check_license(&archive, &manifest, previous.as_ref(), progress)?;

        tx.advance(TransactionState::Placing)?;
        undo.previous = previous.clone();
        let snap = self
            .place(
                &archive, &manifest, &qualified, &origin, &digest, source, icon, options, progress,
                undo,
            )
            .await?;

        tx.advance(TransactionState::Activating)?;
        self.activate(&snap, options, undo).await?;

        tx.advance(TransactionState::SyncingSecurity)?;
        if manifest.package_type == PackageType::Framework {
            let old = match (&undo.backup, &previous) {
                (Some((backup, _)), _) => Some(backup.clone()),
                (None, Some(prev)) => Some(prev.base_dir().to_path_buf()),
                (None, None) => None,
            };
            self.sync_dependents(&manifest.name, old.as_deref(), snap.base_dir())
                .await?;
        }

        tx.advance(TransactionState::Done)?;

        // the new version is active; leftovers only cost disk space
        if let Some((backup, _)) = undo.backup.take() {
            if let Err(e) = std::fs::remove_dir_all(&backup) {
                tracing::warn!("could not remove {}: {}", backup.display(), e);
            }
        }
        if options.garbage_collect {
            let mut keep = vec![snap.version().to_string()];
            if let Some(prev) = &previous {
                keep.push(prev.version().to_string());
            }
            if let Err(e) = self.garbage_collect(&qualified, &keep).await {
                tracing::warn!("garbage collecting {} failed: {}", qualified, e);
            }
        }
        Ok(())
    }

    /// Checks possible from catalog data alone, before anything is fetched
    fn check_remote(&self, snap: &RemoteSnap) -> Result<()> {
        // catalogs without architecture data leave the check to the manifest
        if !snap.architectures().is_empty() {
            check_architectures(snap.architectures(), &self.architecture)?;
        }
        conflicts::check_name_available(
            &self.system,
            snap.name(),
            snap.package_type(),
            snap.origin(),
        )
    }

    async fn fetch(
        &self,
        snap: &RemoteSnap,
        dir: &Path,
        progress: &dyn ProgressSink,
    ) -> Result<(PathBuf, Option<PathBuf>)> {
        let url = snap
            .download_url()
            .ok_or_else(|| SystemError::Transaction {
                message: format!("no download url for {}", snap.qualified_name()),
            })?;
        let archive = dir.join(format!("{}_{}.snap", snap.qualified_name(), snap.version()));
        tracing::debug!("downloading {} from {}", snap.qualified_name(), url);
        self.fetcher.fetch(url, &archive, progress).await?;

        let icon = match snap.icon_url() {
            Some(icon_url) => {
                let path = dir.join("icon.png");
                self.fetcher.fetch(icon_url, &path, progress).await?;
                Some(path)
            }
            None => None,
        };
        Ok((archive, icon))
    }

    fn validate(&self, manifest: &Manifest, origin: &str, options: &InstallOptions) -> Result<()> {
        manifest.check_architecture(&self.architecture)?;
        conflicts::check_for_package_installed(&self.system, manifest, origin)?;
        manifest.check_for_name_clashes()?;

        let frameworks: Vec<String> = self
            .system
            .active_by_type(&[PackageType::Framework])?
            .iter()
            .map(|f| f.name().to_string())
            .collect();
        manifest.check_for_missing_frameworks(&frameworks)?;

        if manifest.package_type == PackageType::Oem && !options.allow_oem {
            return Err(SystemError::OemInstallNotAllowed {
                name: manifest.name.clone(),
            });
        }
        Ok(())
    }

    /// Ask for the license unless the active version shipped the same text
    fn check_license(
        &self,
        archive: &Path,
        manifest: &Manifest,
        previous: Option<&InstalledSnap>,
        progress: &dyn ProgressSink,
    ) -> Result<()> {
        if !manifest.explicit_license_agreement {
            return Ok(());
        }

        let license = self.archive.read_file(archive, LICENSE_PATH)?.ok_or_else(|| {
            SystemError::LicenseNotProvided {
                name: manifest.name.clone(),
            }
        })?;

        if let Some(prev) = previous {
            if prev.manifest().explicit_license_agreement
                && std::fs::read(prev.base_dir().join(LICENSE_PATH)).ok() == Some(license.clone())
            {
                tracing::debug!("license of {} unchanged", manifest.name);
                return Ok(());
            }
        }

        let intro = format!(
            "{} requires that you accept the following license before continuing",
            manifest.name
        );
        if progress.agreed(&intro, &String::from_utf8_lossy(&license)) {
            Ok(())
        } else {
            Err(SystemError::LicenseNotAccepted {
                name: manifest.name.clone(),
            })
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn place(
        &self,
        archive: &Path,
        manifest: &Manifest,
        qualified: &str,
        origin: &str,
        digest: &str,
        source: &Source<'_>,
        icon: Option<PathBuf>,
        options: &InstallOptions,
        progress: &dyn ProgressSink,
        undo: &mut Undo,
    ) -> Result<InstalledSnap> {
        let root = self.paths.install_root(manifest.package_type);
        std::fs::create_dir_all(root)?;
        let staging = tempfile::Builder::new()
            .prefix(".staging-")
            .tempdir_in(root)?;
        self.archive.extract(archive, staging.path())?;

        undo.inhibit_hooks = options.inhibit_hooks;
        if let Some(prev) = &undo.previous {
            undo.previous_unplaced = true;
            if !options.inhibit_hooks {
                undo.previous_stopped = true;
                self.stop_services(prev, progress).await?;
            }
            services::remove_units(&self.paths, prev)?;
        }

        let package_dir = self.paths.package_dir(manifest.package_type, qualified);
        std::fs::create_dir_all(&package_dir)?;
        undo.package_dir = Some(package_dir.clone());

        let version_dir = package_dir.join(&manifest.version);
        if version_dir.exists() {
            let backup = package_dir.join(format!(".{}.replaced", manifest.version));
            if backup.exists() {
                std::fs::remove_dir_all(&backup)?;
            }
            std::fs::rename(&version_dir, &backup)?;
            undo.backup = Some((backup, version_dir.clone()));
        }

        // the emptied staging directory is cleaned up when dropped
        std::fs::rename(staging.path(), &version_dir)?;
        undo.version_dir = Some(version_dir.clone());

        Hashes::new(digest).save(&version_dir.join(HASHES_FILE))?;

        let mut sidecar = match source {
            Source::Remote(snap) => snap.store_manifest(),
            Source::File { .. } => StoreManifest {
                name: manifest.name.clone(),
                origin: origin.to_string(),
                ..Default::default()
            },
        };
        if let Some(icon) = icon {
            let dest = self.paths.icon(qualified, &manifest.version);
            if let Some(parent) = dest.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::copy(&icon, &dest)?;
            sidecar.icon = Some(dest.display().to_string());
            undo.sidecars.push(dest);
        }
        let sidecar_path = self.paths.store_manifest(qualified, &manifest.version);
        sidecar.save(&sidecar_path)?;
        undo.sidecars.push(sidecar_path);

        let snap = InstalledSnap::load(&version_dir.join(MANIFEST_PATH), &self.paths)?;
        undo.placed = Some(snap.clone());

        security::install_policies(
            &self.paths,
            &snap,
            &self.release,
            self.compiler.as_ref(),
            !options.inhibit_hooks,
        )
        .await?;
        services::write_units(&self.paths, &snap)?;
        Ok(snap)
    }

    async fn activate(
        &self,
        snap: &InstalledSnap,
        options: &InstallOptions,
        undo: &mut Undo,
    ) -> Result<()> {
        let package_dir = self
            .paths
            .package_dir(snap.package_type(), snap.qualified_name());
        swap_current(&package_dir, snap.version())?;
        undo.activated = true;

        if snap.package_type() == PackageType::Oem {
            let rules = udev::write_rules(&self.paths, snap.manifest(), snap.qualified_name())?;
            if !rules.is_empty() && !options.inhibit_hooks {
                udev::activate(self.udev.as_ref()).await?;
            }
        }

        if !options.inhibit_hooks {
            self.start_services(snap).await?;
        }
        Ok(())
    }

    /// Refresh the policy of every dependent of `framework` whose entities
    /// use a capability or template the new version changed, or an override
    async fn sync_dependents(&self, framework: &str, old: Option<&Path>, new: &Path) -> Result<()> {
        let changes = security::policy_changes(framework, old, new)?;
        for dependent in self.system.dependents(framework)? {
            let touched = security::request_apparmor_update(
                &self.paths,
                &dependent,
                &changes,
                &self.release,
                self.compiler.as_ref(),
            )
            .await?;
            if !touched.is_empty() {
                tracing::info!(
                    "refreshed {} policies of {}",
                    touched.len(),
                    dependent.qualified_name()
                );
            }
        }
        Ok(())
    }

    /// Best effort: put back what [`Undo`] recorded
    async fn rollback(&self, undo: Undo) {
        let warn = |what: &str, e: &dyn std::fmt::Display| {
            tracing::warn!("rollback: {}: {}", what, e);
        };

        if let Some(placed) = &undo.placed {
            if undo.activated && !undo.inhibit_hooks {
                for unit in services::unit_names(placed) {
                    if let Err(e) = self.services.stop(&unit, services::DEFAULT_STOP_TIMEOUT).await {
                        warn("stopping new service", &e);
                    }
                }
            }
            if let Err(e) = services::remove_units(&self.paths, placed) {
                warn("removing units", &e);
            }
            if let Err(e) =
                security::remove_policies(&self.paths, placed, self.compiler.as_ref(), false).await
            {
                warn("removing policies", &e);
            }
            if let Err(e) = udev::remove_rules(&self.paths, placed.manifest(), placed.qualified_name()) {
                warn("removing udev rules", &e);
            }
        }

        if let Some(version_dir) = &undo.version_dir {
            if let Err(e) = std::fs::remove_dir_all(version_dir) {
                warn("removing version directory", &e);
            }
        }

        match &undo.backup {
            Some((backup, original)) => {
                if let Err(e) = std::fs::rename(backup, original) {
                    warn("restoring replaced version", &e);
                }
            }
            None => {
                for sidecar in &undo.sidecars {
                    let _ = std::fs::remove_file(sidecar);
                }
            }
        }

        if undo.activated {
            if let Some(package_dir) = &undo.package_dir {
                let restored = match &undo.previous {
                    Some(prev) => swap_current(package_dir, prev.version()),
                    None => remove_current(package_dir),
                };
                if let Err(e) = restored {
                    warn("restoring current", &e);
                }
            }
        }

        if let Some(prev) = undo.previous.as_ref().filter(|_| undo.previous_unplaced) {
            let compile = !undo.inhibit_hooks;
            let restored = async {
                security::install_policies(&self.paths, prev, &self.release, self.compiler.as_ref(), compile)
                    .await?;
                services::write_units(&self.paths, prev)?;
                if prev.package_type() == PackageType::Oem {
                    udev::write_rules(&self.paths, prev.manifest(), prev.qualified_name())?;
                }
                if undo.previous_stopped {
                    self.start_services(prev).await?;
                }
                Ok::<(), SystemError>(())
            };
            if let Err(e) = restored.await {
                warn("restoring previous version", &e);
            }
        }

        if let Some(package_dir) = &undo.package_dir {
            remove_if_empty(package_dir);
        }
    }

    /// Remove inactive versions of `qualified` not listed in `keep`
    async fn garbage_collect(&self, qualified: &str, keep: &[String]) -> Result<()> {
        for snap in self.system.versions_of(qualified)? {
            if snap.is_active() || keep.iter().any(|k| k == snap.version()) {
                continue;
            }
            tracing::info!("removing old version {} {}", qualified, snap.version());
            self.remove_version(&snap, true).await?;
        }
        Ok(())
    }

    // ============ Services ============

    async fn stop_services(&self, snap: &InstalledSnap, progress: &dyn ProgressSink) -> Result<()> {
        for (service, unit) in snap.manifest().services.iter().zip(services::unit_names(snap)) {
            progress.notify(&format!("Waiting for {} to stop.", service.name));
            self.services
                .stop(&unit, services::stop_timeout(snap, &service.name))
                .await?;
            self.services.disable(&unit).await?;
        }
        Ok(())
    }

    async fn start_services(&self, snap: &InstalledSnap) -> Result<()> {
        let units = services::unit_names(snap);
        if units.is_empty() {
            return Ok(());
        }
        self.services.daemon_reload().await?;
        for unit in &units {
            self.services.enable(unit).await?;
            self.services.start(unit).await?;
        }
        Ok(())
    }

    // ============ Uninstall ============

    /// Remove an installed version
    ///
    /// Remote parts are not installed. Built-in packages of the active OEM
    /// package and frameworks that other packages depend on are refused.
    pub async fn uninstall(
        &self,
        part: &Part,
        options: &UninstallOptions,
        progress: &dyn ProgressSink,
    ) -> Result<()> {
        let Part::Installed(snap) = part else {
            return Err(SystemError::NotInstalled);
        };

        if let Some(oem) = self.system.active_oem()? {
            if oem.manifest().built_in().iter().any(|b| b == snap.name()) {
                return Err(SystemError::PackageNotRemovable {
                    name: snap.name().to_string(),
                });
            }
        }

        if snap.package_type() == PackageType::Framework {
            let dependents = self.system.dependent_names(snap.name())?;
            if !dependents.is_empty() {
                return Err(SystemError::FrameworkInUse { dependents });
            }
        }

        if snap.is_active() {
            if !options.inhibit_hooks {
                self.stop_services(snap, progress).await?;
            }
            services::remove_units(&self.paths, snap)?;

            let removed = udev::remove_rules(&self.paths, snap.manifest(), snap.qualified_name())?;
            if removed > 0 && !options.inhibit_hooks {
                self.udev.reload_rules().await?;
            }
        }

        self.remove_version(snap, !options.inhibit_hooks).await?;
        tracing::info!("removed {} {}", snap.qualified_name(), snap.version());
        Ok(())
    }

    /// Delete one version with its policies and sidecars
    async fn remove_version(&self, snap: &InstalledSnap, unload: bool) -> Result<()> {
        security::remove_policies(&self.paths, snap, self.compiler.as_ref(), unload).await?;
        std::fs::remove_dir_all(snap.base_dir())?;

        for sidecar in [
            self.paths.store_manifest(snap.qualified_name(), snap.version()),
            self.paths.icon(snap.qualified_name(), snap.version()),
        ] {
            match std::fs::remove_file(&sidecar) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }

        let package_dir = self
            .paths
            .package_dir(snap.package_type(), snap.qualified_name());
        if snap.is_active() {
            remove_current(&package_dir)?;
        }
        remove_if_empty(&package_dir);
        Ok(())
    }

    // ============ Activation ============

    /// Make an installed version the active one, or deactivate it
    pub async fn set_active(
        &self,
        part: &Part,
        active: bool,
        progress: &dyn ProgressSink,
    ) -> Result<()> {
        let Part::Installed(snap) = part else {
            return Err(SystemError::NotInstalled);
        };
        let package_dir = self
            .paths
            .package_dir(snap.package_type(), snap.qualified_name());

        if active {
            if snap.is_active() {
                return Ok(());
            }
            if let Some(current) = self.system.active_by_qualified_name(snap.qualified_name())? {
                self.stop_services(&current, progress).await?;
                services::remove_units(&self.paths, &current)?;
            }
            security::install_policies(&self.paths, snap, &self.release, self.compiler.as_ref(), true)
                .await?;
            services::write_units(&self.paths, snap)?;
            swap_current(&package_dir, snap.version())?;
            self.start_services(snap).await?;
            tracing::info!("activated {} {}", snap.qualified_name(), snap.version());
        } else {
            if !snap.is_active() {
                return Ok(());
            }
            self.stop_services(snap, progress).await?;
            services::remove_units(&self.paths, snap)?;
            remove_current(&package_dir)?;
            tracing::info!("deactivated {} {}", snap.qualified_name(), snap.version());
        }
        Ok(())
    }
}

/// Point `<package_dir>/current` at `version` with a rename over the old link
fn swap_current(package_dir: &Path, version: &str) -> Result<()> {
    let link = package_dir.join(CURRENT_LINK);
    let staged = package_dir.join(format!(".{}.new", CURRENT_LINK));
    match std::fs::remove_file(&staged) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }
    std::os::unix::fs::symlink(version, &staged)?;
    std::fs::rename(&staged, &link)?;
    Ok(())
}

fn remove_current(package_dir: &Path) -> Result<()> {
    match std::fs::remove_file(package_dir.join(CURRENT_LINK)) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

// fails on non-empty directories, which is the point
fn remove_if_empty(dir: &Path) {
    let _ = std::fs::remove_dir(dir);
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_swap_current_replaces_link() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("1.0")).unwrap();
        std::fs::create_dir_all(dir.path().join("2.0")).unwrap();

        swap_current(dir.path(), "1.0").unwrap();
        swap_current(dir.path(), "2.0").unwrap();

        let target = std::fs::read_link(dir.path().join(CURRENT_LINK)).unwrap();
        assert_eq!(target, PathBuf::from("2.0"));
        assert!(!dir.path().join(".current.new").exists());

        remove_current(dir.path()).unwrap();
        remove_current(dir.path()).unwrap();
        assert!(std::fs::symlink_metadata(dir.path().join(CURRENT_LINK)).is_err());
    }

    #[test]
    fn test_remove_if_empty_keeps_content() {
        let dir = TempDir::new().unwrap();
        let pkg = dir.path().join("foo");
        std::fs::create_dir_all(pkg.join("1.0")).unwrap();

        remove_if_empty(&pkg);
        assert!(pkg.exists());

        std::fs::remove_dir(pkg.join("1.0")).unwrap();
        remove_if_empty(&pkg);
        assert!(!pkg.exists());
    }
}
