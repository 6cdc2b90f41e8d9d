//! Options for install and uninstall operations

/// Options for install operation
#[derive(Debug, Clone, Default)]
pub struct InstallOptions {
    /// Skip the archive digest check
    pub allow_unauthenticated: bool,

    /// Permit installing a package of type `oem`
    pub allow_oem: bool,

    /// Place and activate without running service and profile hooks
    pub inhibit_hooks: bool,

    /// Remove old inactive versions once the new one is active
    pub garbage_collect: bool,
}

impl InstallOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install archives without a known digest
    pub fn allow_unauthenticated(mut self) -> Self {
        self.allow_unauthenticated = true;
        self
    }

    pub fn allow_oem(mut self) -> Self {
        self.allow_oem = true;
        self
    }

    pub fn inhibit_hooks(mut self) -> Self {
        self.inhibit_hooks = true;
        self
    }

    /// Keep only the new version and the one it replaced
    pub fn with_garbage_collect(mut self) -> Self {
        self.garbage_collect = true;
        self
    }
}

/// Options for uninstall operation
#[derive(Debug, Clone, Default)]
pub struct UninstallOptions {
    /// Skip stopping services and unloading profiles
    pub inhibit_hooks: bool,
}

impl UninstallOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inhibit_hooks(mut self) -> Self {
        self.inhibit_hooks = true;
        self
    }
}
