//! systemd units for package services
//!
//! Every service of a placed version gets its own unit file named
//! `<qualifiedName>_<service>_<version>.service`.

use async_trait::async_trait;
use snapkit_core::{InstalledSnap, Paths, Service};
use std::fmt::Write as _;
use std::path::PathBuf;
use std::time::Duration;

use crate::command;
use crate::error::Result;

/// Stop timeout used when the service declares none
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(30);

/// Start/stop/enable interface of the service manager
#[async_trait]
pub trait ServiceControl: Send + Sync {
    /// Reread unit files after they changed on disk
    async fn daemon_reload(&self) -> Result<()>;

    async fn enable(&self, unit: &str) -> Result<()>;

    async fn disable(&self, unit: &str) -> Result<()>;

    async fn start(&self, unit: &str) -> Result<()>;

    /// Stop `unit`, giving it `timeout` before it is killed
    async fn stop(&self, unit: &str, timeout: Duration) -> Result<()>;
}

/// [`ServiceControl`] backed by `systemctl`
#[derive(Debug, Clone, Default)]
pub struct Systemctl {
    root: Option<PathBuf>,
}

impl Systemctl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Operate on an image rooted at `root` instead of the running system
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    async fn systemctl(&self, args: &[&str]) -> Result<()> {
        let root;
        let mut full: Vec<&str> = Vec::with_capacity(args.len() + 1);
        if let Some(path) = &self.root {
            root = format!("--root={}", path.display());
            full.push(&root);
        }
        full.extend_from_slice(args);
        command::run("systemctl", &full).await.map(|_| ())
    }
}

#[async_trait]
impl ServiceControl for Systemctl {
    async fn daemon_reload(&self) -> Result<()> {
        if self.root.is_some() {
            return Ok(());
        }
        self.systemctl(&["daemon-reload"]).await
    }

    async fn enable(&self, unit: &str) -> Result<()> {
        self.systemctl(&["enable", unit]).await
    }

    async fn disable(&self, unit: &str) -> Result<()> {
        self.systemctl(&["disable", unit]).await
    }

    async fn start(&self, unit: &str) -> Result<()> {
        self.systemctl(&["start", unit]).await
    }

    // systemd enforces TimeoutStopSec from the unit itself
    async fn stop(&self, unit: &str, timeout: Duration) -> Result<()> {
        tracing::debug!("stopping {} (up to {}s)", unit, timeout.as_secs());
        self.systemctl(&["stop", unit]).await
    }
}

pub fn unit_name(qualified_name: &str, service: &str, version: &str) -> String {
    format!("{}_{}_{}.service", qualified_name, service, version)
}

/// Unit names of every service of `snap`, in declaration order
pub fn unit_names(snap: &InstalledSnap) -> Vec<String> {
    snap.manifest()
        .services
        .iter()
        .map(|s| unit_name(snap.qualified_name(), &s.name, snap.version()))
        .collect()
}

/// Render the unit file of one service
pub fn render_unit(snap: &InstalledSnap, service: &Service) -> String {
    let base = snap.base_dir().display().to_string();
    let description = service
        .description
        .clone()
        .unwrap_or_else(|| format!("The {} service for {}", service.name, snap.name()));
    let timeout = service.stop_timeout.unwrap_or(DEFAULT_STOP_TIMEOUT);

    let mut unit = String::new();
    let _ = writeln!(unit, "[Unit]");
    let _ = writeln!(unit, "Description={}", description);
    let _ = writeln!(unit, "X-Snappy=yes");
    let _ = writeln!(unit);
    let _ = writeln!(unit, "[Service]");
    if let Some(start) = &service.start {
        let _ = writeln!(unit, "ExecStart={}/{}", base, start);
    }
    let _ = writeln!(unit, "WorkingDirectory={}", base);
    for (key, value) in snap.hook_env() {
        let _ = writeln!(unit, "Environment=\"{}={}\"", key, value);
    }
    if let Some(stop) = &service.stop {
        let _ = writeln!(unit, "ExecStop={}/{}", base, stop);
    }
    if let Some(poststop) = &service.poststop {
        let _ = writeln!(unit, "ExecStopPost={}/{}", base, poststop);
    }
    let _ = writeln!(unit, "TimeoutStopSec={}", timeout.as_secs());
    let _ = writeln!(unit);
    let _ = writeln!(unit, "[Install]");
    let _ = writeln!(unit, "WantedBy=multi-user.target");
    unit
}

/// Write unit files for every service of `snap`
pub fn write_units(paths: &Paths, snap: &InstalledSnap) -> Result<Vec<String>> {
    if snap.manifest().services.is_empty() {
        return Ok(Vec::new());
    }
    std::fs::create_dir_all(&paths.services_dir)?;

    let mut names = Vec::new();
    for service in &snap.manifest().services {
        let name = unit_name(snap.qualified_name(), &service.name, snap.version());
        std::fs::write(paths.services_dir.join(&name), render_unit(snap, service))?;
        names.push(name);
    }
    Ok(names)
}

/// Delete the unit files of `snap`; missing files are fine
pub fn remove_units(paths: &Paths, snap: &InstalledSnap) -> Result<()> {
    for name in unit_names(snap) {
        match std::fs::remove_file(paths.services_dir.join(&name)) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

/// Stop timeout of the named unit of `snap`
pub fn stop_timeout(snap: &InstalledSnap, service: &str) -> Duration {
    snap.manifest()
        .services
        .iter()
        .find(|s| s.name == service)
        .and_then(|s| s.stop_timeout)
        .unwrap_or(DEFAULT_STOP_TIMEOUT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use snapkit_core::{CURRENT_LINK, MANIFEST_PATH};
    use tempfile::TempDir;

    fn installed(dir: &TempDir, yaml: &str) -> (Paths, InstalledSnap) {
        let paths = Paths::new(dir.path());
        let base = paths.apps_dir.join("foo.bar").join("1.0");
        std::fs::create_dir_all(base.join("meta")).unwrap();
        std::fs::write(base.join(MANIFEST_PATH), yaml).unwrap();
        std::os::unix::fs::symlink("1.0", paths.apps_dir.join("foo.bar").join(CURRENT_LINK))
            .unwrap();
        let snap = InstalledSnap::load(&base.join(MANIFEST_PATH), &paths).unwrap();
        (paths, snap)
    }

    #[test]
    fn test_render_unit() {
        let dir = TempDir::new().unwrap();
        let (_paths, snap) = installed(
            &dir,
            "name: foo\nversion: 1.0\nvendor: foo\nservices:\n - name: svc\n   start: bin/svc --serve\n   stop: bin/svc --stop\n   stop-timeout: 10s\n",
        );

        let unit = render_unit(&snap, &snap.manifest().services[0]);
        let base = snap.base_dir().display().to_string();

        assert!(unit.starts_with("[Unit]\nDescription=The svc service for foo\n"));
        assert!(unit.contains(&format!("ExecStart={}/bin/svc --serve\n", base)));
        assert!(unit.contains(&format!("ExecStop={}/bin/svc --stop\n", base)));
        assert!(unit.contains("Environment=\"SNAP_FULLNAME=foo.bar\"\n"));
        assert!(unit.contains("Environment=\"SNAP_ORIGIN=bar\"\n"));
        assert!(unit.contains("TimeoutStopSec=10\n"));
        assert!(!unit.contains("ExecStopPost"));
        assert!(unit.ends_with("WantedBy=multi-user.target\n"));
    }

    #[test]
    fn test_write_and_remove_units() {
        let dir = TempDir::new().unwrap();
        let (paths, snap) = installed(
            &dir,
            "name: foo\nversion: 1.0\nvendor: foo\nservices:\n - name: one\n - name: two\n",
        );

        let names = write_units(&paths, &snap).unwrap();
        assert_eq!(
            names,
            vec!["foo.bar_one_1.0.service", "foo.bar_two_1.0.service"]
        );
        assert!(paths.services_dir.join(&names[0]).exists());
        assert_eq!(stop_timeout(&snap, "one"), DEFAULT_STOP_TIMEOUT);

        remove_units(&paths, &snap).unwrap();
        assert!(!paths.services_dir.join(&names[0]).exists());
        remove_units(&paths, &snap).unwrap();
    }

    #[test]
    fn test_no_services_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let (paths, snap) = installed(&dir, "name: foo\nversion: 1.0\nvendor: foo\n");
        assert!(write_units(&paths, &snap).unwrap().is_empty());
        assert!(!paths.services_dir.exists());
    }
}
