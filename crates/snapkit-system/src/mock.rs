//! In-memory collaborators for testing
//!
//! Every mock records its calls into a [`CallLog`]. Sharing one log between
//! several mocks gives the global order of external effects, which is how
//! transaction ordering is asserted without touching the real system.

use async_trait::async_trait;
use snapkit_core::ProgressSink;
use snapkit_repo::{Fetcher, RepoError};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use crate::error::Result;
use crate::security::ProfileCompiler;
use crate::services::ServiceControl;
use crate::udev::UdevControl;

/// Ordered record of calls, shareable between mocks
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    calls: Arc<RwLock<Vec<String>>>,
}

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, call: impl Into<String>) {
        if let Ok(mut calls) = self.calls.write() {
            calls.push(call.into());
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.read().map(|c| c.clone()).unwrap_or_default()
    }

    /// Index of the first call starting with `prefix`
    pub fn position(&self, prefix: &str) -> Option<usize> {
        self.calls().iter().position(|c| c.starts_with(prefix))
    }

    pub fn clear(&self) {
        if let Ok(mut calls) = self.calls.write() {
            calls.clear();
        }
    }
}

// ============ Service Control ============

/// Records `enable`/`start`/`stop`/... calls per unit
#[derive(Debug, Clone, Default)]
pub struct MockServiceControl {
    log: CallLog,
}

impl MockServiceControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_log(log: CallLog) -> Self {
        Self { log }
    }

    pub fn log(&self) -> &CallLog {
        &self.log
    }

    /// Units the given verb was called on, in order
    pub fn units(&self, verb: &str) -> Vec<String> {
        let prefix = format!("systemctl {} ", verb);
        self.log
            .calls()
            .iter()
            .filter_map(|c| c.strip_prefix(&prefix).map(String::from))
            .collect()
    }
}

#[async_trait]
impl ServiceControl for MockServiceControl {
    async fn daemon_reload(&self) -> Result<()> {
        self.log.record("systemctl daemon-reload");
        Ok(())
    }

    async fn enable(&self, unit: &str) -> Result<()> {
        self.log.record(format!("systemctl enable {}", unit));
        Ok(())
    }

    async fn disable(&self, unit: &str) -> Result<()> {
        self.log.record(format!("systemctl disable {}", unit));
        Ok(())
    }

    async fn start(&self, unit: &str) -> Result<()> {
        self.log.record(format!("systemctl start {}", unit));
        Ok(())
    }

    async fn stop(&self, unit: &str, _timeout: Duration) -> Result<()> {
        self.log.record(format!("systemctl stop {}", unit));
        Ok(())
    }
}

// ============ Profile Compiler ============

#[derive(Debug, Clone, Default)]
pub struct MockProfileCompiler {
    log: CallLog,
    touched: Arc<RwLock<Vec<PathBuf>>>,
}

impl MockProfileCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_log(log: CallLog) -> Self {
        Self {
            log,
            ..Default::default()
        }
    }

    pub fn log(&self) -> &CallLog {
        &self.log
    }

    /// Descriptors marked for recompilation
    pub fn touched(&self) -> Vec<PathBuf> {
        self.touched.read().map(|t| t.clone()).unwrap_or_default()
    }

    pub fn compiled(&self) -> Vec<String> {
        self.log
            .calls()
            .iter()
            .filter_map(|c| c.strip_prefix("compile ").map(String::from))
            .collect()
    }
}

#[async_trait]
impl ProfileCompiler for MockProfileCompiler {
    async fn compile(&self, profile: &str, _descriptor: &Path) -> Result<()> {
        self.log.record(format!("compile {}", profile));
        Ok(())
    }

    async fn remove(&self, profile: &str) -> Result<()> {
        self.log.record(format!("remove {}", profile));
        Ok(())
    }

    async fn touch(&self, descriptor: &Path) -> Result<()> {
        self.log.record(format!("touch {}", descriptor.display()));
        if let Ok(mut touched) = self.touched.write() {
            touched.push(descriptor.to_path_buf());
        }
        Ok(())
    }
}

// ============ Udev ============

#[derive(Debug, Clone, Default)]
pub struct MockUdevControl {
    log: CallLog,
}

impl MockUdevControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_log(log: CallLog) -> Self {
        Self { log }
    }

    pub fn log(&self) -> &CallLog {
        &self.log
    }
}

#[async_trait]
impl UdevControl for MockUdevControl {
    async fn reload_rules(&self) -> Result<()> {
        self.log.record("udevadm control --reload-rules");
        Ok(())
    }

    async fn trigger(&self) -> Result<()> {
        self.log.record("udevadm trigger");
        Ok(())
    }
}

// ============ Progress ============

#[derive(Debug, Default)]
struct ProgressState {
    notified: Vec<String>,
    current: u64,
    written: u64,
    license_prompts: Vec<String>,
}

/// Progress sink remembering notifications and transferred bytes
#[derive(Debug, Clone, Default)]
pub struct MockProgress {
    state: Arc<RwLock<ProgressState>>,
    agree: bool,
}

impl MockProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every license prompt with `agree`
    pub fn agreeing(agree: bool) -> Self {
        Self {
            agree,
            ..Default::default()
        }
    }

    pub fn notified(&self) -> Vec<String> {
        self.state
            .read()
            .map(|s| s.notified.clone())
            .unwrap_or_default()
    }

    /// Bytes reported across all finished steps
    pub fn written(&self) -> u64 {
        self.state.read().map(|s| s.written).unwrap_or_default()
    }

    /// Intros of the license prompts shown
    pub fn license_prompts(&self) -> Vec<String> {
        self.state
            .read()
            .map(|s| s.license_prompts.clone())
            .unwrap_or_default()
    }
}

impl ProgressSink for MockProgress {
    fn start(&self, _label: &str, _total: u64) {
        if let Ok(mut state) = self.state.write() {
            state.current = 0;
        }
    }

    fn set(&self, current: u64) {
        if let Ok(mut state) = self.state.write() {
            state.current = current;
        }
    }

    fn finished(&self) {
        if let Ok(mut state) = self.state.write() {
            state.written += state.current;
            state.current = 0;
        }
    }

    fn notify(&self, message: &str) {
        if let Ok(mut state) = self.state.write() {
            state.notified.push(message.to_string());
        }
    }

    fn agreed(&self, intro: &str, _license: &str) -> bool {
        if let Ok(mut state) = self.state.write() {
            state.license_prompts.push(intro.to_string());
        }
        self.agree
    }
}

// ============ Fetcher ============

/// Serves fixed bodies by URL
#[derive(Debug, Clone, Default)]
pub struct MockFetcher {
    bodies: Arc<RwLock<HashMap<String, Vec<u8>>>>,
    log: CallLog,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_log(log: CallLog) -> Self {
        Self {
            log,
            ..Default::default()
        }
    }

    pub fn serve(self, url: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        if let Ok(mut bodies) = self.bodies.write() {
            bodies.insert(url.into(), body.into());
        }
        self
    }

    pub fn fetched(&self) -> Vec<String> {
        self.log
            .calls()
            .iter()
            .filter_map(|c| c.strip_prefix("fetch ").map(String::from))
            .collect()
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(
        &self,
        url: &str,
        dest: &Path,
        progress: &dyn ProgressSink,
    ) -> snapkit_repo::Result<u64> {
        self.log.record(format!("fetch {}", url));
        let body = self
            .bodies
            .read()
            .ok()
            .and_then(|b| b.get(url).cloned())
            .ok_or_else(|| RepoError::NotFound {
                name: url.to_string(),
            })?;

        progress.start(url, body.len() as u64);
        tokio::fs::write(dest, &body).await?;
        progress.set(body.len() as u64);
        progress.finished();
        Ok(body.len() as u64)
    }
}
