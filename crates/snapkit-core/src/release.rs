//! Release and architecture identification of the running system

use serde::{Deserialize, Serialize};

/// Distribution release the system runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    pub series: String,
    pub flavor: String,
}

impl Default for Release {
    fn default() -> Self {
        Self {
            series: "15.04".to_string(),
            flavor: "core".to_string(),
        }
    }
}

impl Release {
    pub fn new(series: impl Into<String>, flavor: impl Into<String>) -> Self {
        Self {
            series: series.into(),
            flavor: flavor.into(),
        }
    }

    /// The framework every package implicitly depends on
    pub fn base_framework(&self) -> String {
        format!("ubuntu-{}-{}-dev1", self.flavor, self.series)
    }
}

impl std::fmt::Display for Release {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.series, self.flavor)
    }
}

/// Distribution name of the architecture this binary was built for
pub fn host_architecture() -> &'static str {
    architecture_name(std::env::consts::ARCH)
}

/// Map a Rust target architecture to the distribution's name for it
pub fn architecture_name(rust_arch: &'static str) -> &'static str {
    match rust_arch {
        "x86_64" => "amd64",
        "x86" => "i386",
        "arm" => "armhf",
        "aarch64" => "arm64",
        "powerpc64" => "ppc64el",
        other => other,
    }
}
