//! Security definitions shared by binaries and services

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Paths to hand-written profiles, per confinement mechanism
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfilePaths {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apparmor: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seccomp: Option<String>,
}

/// Per-entity security declaration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SecurityDefinitions {
    /// Shared profile fragment the entity builds on
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security_template: Option<String>,

    /// Always regenerated when anything it depends on changes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security_override: Option<ProfilePaths>,

    /// Complete profile shipped by the package, never regenerated
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security_policy: Option<ProfilePaths>,

    /// Capabilities (policy groups) contributing to the profile
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub caps: Vec<String>,
}

impl SecurityDefinitions {
    /// Decide whether the profile must be regenerated after a framework
    /// changed the given capabilities and templates.
    pub fn needs_apparmor_update(
        &self,
        changed_caps: &HashSet<String>,
        changed_templates: &HashSet<String>,
    ) -> bool {
        if self.security_policy.is_some() {
            return false;
        }
        if self.security_override.is_some() {
            return true;
        }

        if let Some(template) = &self.security_template {
            if changed_templates.contains(template) {
                return true;
            }
        }

        self.caps.iter().any(|cap| changed_caps.contains(cap))
    }
}

/// File name of the policy descriptor for one entity of one package version
pub fn policy_file_name(qualified_name: &str, entity: &str, version: &str) -> String {
    format!("{}_{}_{}.json", qualified_name, entity, version)
}

/// Profile name handed to the compiler, the descriptor name without extension
pub fn profile_name(qualified_name: &str, entity: &str, version: &str) -> String {
    format!("{}_{}_{}", qualified_name, entity, version)
}
