//! Package manifest (`meta/package.yaml`) parsing and validation
//!
//! Parsing is two-phase: the document is first read into a loose raw form
//! so that every missing required field can be reported at once, then it
//! is normalized into the typed [`Manifest`].

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use crate::error::{CoreError, Result};
use crate::hardware::Oem;
use crate::identity::{self, PackageType};
use crate::release::Release;
use crate::security::SecurityDefinitions;

/// Location of the manifest inside a package directory
pub const MANIFEST_PATH: &str = "meta/package.yaml";

/// Architecture value matching every host
pub const ARCH_ALL: &str = "all";

/// Name of the synthetic hook added for packages without binaries or services
pub const LEGACY_CONFIG_HOOK: &str = "snappy-config";

/// A command exposed by the package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Binary {
    pub name: String,

    /// Executable relative to the package directory; defaults to `name`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exec: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(flatten)]
    pub security: SecurityDefinitions,
}

impl Binary {
    pub fn exec_path(&self) -> &str {
        self.exec.as_deref().unwrap_or(&self.name)
    }
}

/// A long running daemon shipped by the package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Service {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poststop: Option<String>,

    #[serde(default, with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub stop_timeout: Option<Duration>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ports: Option<Ports>,

    #[serde(flatten)]
    pub security: SecurityDefinitions,
}

/// Ports a service listens on, by name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ports {
    #[serde(default)]
    pub internal: IndexMap<String, Port>,

    #[serde(default)]
    pub external: IndexMap<String, Port>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Port {
    /// `<number>/<protocol>`, e.g. `8081/tcp`
    pub port: String,

    #[serde(default, deserialize_with = "yaml_bool::deserialize")]
    pub negotiable: bool,
}

/// How the policy generator obtains the profile of one entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum HookKind {
    /// Generated from a template and capabilities
    ApparmorTemplate,
    /// Generated from a package-provided override
    ApparmorOverride,
    /// Package-provided complete profile
    ApparmorPolicy,
}

/// Security hook descriptor of one binary or service
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct IntegrationHook {
    pub kind: HookKind,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bin_path: Option<String>,
}

impl IntegrationHook {
    /// Key used by the legacy packaging format for this hook
    pub fn legacy_key(&self) -> &'static str {
        match self.kind {
            HookKind::ApparmorPolicy => "apparmor-profile",
            HookKind::ApparmorTemplate | HookKind::ApparmorOverride => "apparmor",
        }
    }

    fn for_entity(name: &str, security: &SecurityDefinitions, bin_path: Option<String>) -> Self {
        let policy = security.security_policy.as_ref().map(|p| p.apparmor.clone());
        let override_path = security.security_override.as_ref().map(|o| o.apparmor.clone());
        let generated = || format!("meta/{}.apparmor", name);

        let (kind, path) = match (policy, override_path) {
            (Some(path), _) => (HookKind::ApparmorPolicy, path.unwrap_or_else(generated)),
            (None, Some(path)) => (HookKind::ApparmorOverride, path.unwrap_or_else(generated)),
            (None, None) => (HookKind::ApparmorTemplate, generated()),
        };

        Self {
            kind,
            path,
            bin_path,
        }
    }
}

/// Entity name to security hook, in declaration order
pub type Integration = IndexMap<String, IntegrationHook>;

/// A validated package manifest
#[derive(Debug, Clone, PartialEq)]
pub struct Manifest {
    pub name: String,
    pub version: String,
    pub vendor: String,
    pub package_type: PackageType,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub architectures: Vec<String>,
    pub frameworks: Vec<String>,
    pub binaries: Vec<Binary>,
    pub services: Vec<Service>,
    pub oem: Option<Oem>,
    pub explicit_license_agreement: bool,
    pub integration: Integration,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RawManifest {
    name: Option<String>,
    version: Option<String>,
    vendor: Option<String>,
    #[serde(rename = "type", default)]
    package_type: PackageType,
    description: Option<String>,
    icon: Option<String>,
    architecture: Option<serde_yaml::Value>,
    framework: Option<String>,
    frameworks: Option<Vec<String>>,
    #[serde(default)]
    binaries: Vec<Binary>,
    #[serde(default)]
    services: Vec<Service>,
    oem: Option<Oem>,
    #[serde(default, deserialize_with = "yaml_bool::deserialize")]
    explicit_license_agreement: bool,
}

impl Manifest {
    /// Parse and validate a manifest
    ///
    /// With `allow_legacy_config` a package without binaries and services
    /// gets a synthetic `snappy-config` security hook.
    pub fn parse(data: &[u8], allow_legacy_config: bool) -> Result<Self> {
        let raw: RawManifest = serde_yaml::from_slice(data)?;

        let missing: Vec<String> = [
            ("name", raw.name.is_none()),
            ("version", raw.version.is_none()),
            ("vendor", raw.vendor.is_none()),
        ]
        .into_iter()
        .filter(|(_, absent)| *absent)
        .map(|(field, _)| field.to_string())
        .collect();

        let (Some(name), Some(version), Some(vendor)) = (raw.name, raw.version, raw.vendor)
        else {
            return Err(CoreError::MissingFields { fields: missing });
        };

        identity::validate_name(&name)?;
        for binary in &raw.binaries {
            identity::validate_entity_name("binary", &binary.name)?;
        }
        for service in &raw.services {
            identity::validate_entity_name("service", &service.name)?;
        }

        let frameworks = match (raw.framework, raw.frameworks) {
            (Some(_), Some(_)) => return Err(CoreError::ConflictingFrameworkSpec),
            (Some(legacy), None) => legacy
                .split(',')
                .map(str::trim)
                .filter(|f| !f.is_empty())
                .map(String::from)
                .collect(),
            (None, Some(list)) => list,
            (None, None) => Vec::new(),
        };

        let architectures = normalize_architecture(raw.architecture)?;
        let integration = build_integration(&raw.binaries, &raw.services, allow_legacy_config);

        Ok(Self {
            name,
            version,
            vendor,
            package_type: raw.package_type,
            description: raw.description,
            icon: raw.icon,
            architectures,
            frameworks,
            binaries: raw.binaries,
            services: raw.services,
            oem: raw.oem,
            explicit_license_agreement: raw.explicit_license_agreement,
            integration,
        })
    }

    /// Load `meta/package.yaml` from disk
    pub fn load<P: AsRef<Path>>(path: P, allow_legacy_config: bool) -> Result<Self> {
        let data = std::fs::read(path.as_ref())?;
        Self::parse(&data, allow_legacy_config)
    }

    pub fn qualified_name(&self, origin: &str) -> String {
        identity::qualified_name(self.package_type, &self.name, origin)
    }

    /// Framework dependencies, including the implicit base framework,
    /// as a comma separated list
    pub fn frameworks_for_click(&self, release: &Release) -> String {
        let mut all = self.frameworks.clone();
        all.push(release.base_framework());
        all.join(",")
    }

    /// Fails when a binary and a service share a name
    pub fn check_for_name_clashes(&self) -> Result<()> {
        let binaries: HashSet<&str> = self.binaries.iter().map(|b| b.name.as_str()).collect();
        match self.services.iter().find(|s| binaries.contains(s.name.as_str())) {
            Some(service) => Err(CoreError::NameClash {
                name: service.name.clone(),
            }),
            None => Ok(()),
        }
    }

    /// Fails listing every declared framework absent from `installed`
    pub fn check_for_missing_frameworks<S: AsRef<str>>(&self, installed: &[S]) -> Result<()> {
        let installed: HashSet<&str> = installed.iter().map(AsRef::as_ref).collect();
        let missing: Vec<String> = self
            .frameworks
            .iter()
            .filter(|f| !installed.contains(f.as_str()))
            .cloned()
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(CoreError::MissingFrameworks { names: missing })
        }
    }

    /// Fails unless the package supports `host`
    pub fn check_architecture(&self, host: &str) -> Result<()> {
        check_architectures(&self.architectures, host)
    }

    /// Binaries and services with their security declarations
    pub fn security_entities(&self) -> impl Iterator<Item = (&str, &SecurityDefinitions)> {
        self.binaries
            .iter()
            .map(|b| (b.name.as_str(), &b.security))
            .chain(self.services.iter().map(|s| (s.name.as_str(), &s.security)))
    }

    pub fn store_id(&self) -> Option<&str> {
        self.oem.as_ref().and_then(Oem::store_id)
    }

    pub fn built_in(&self) -> &[String] {
        self.oem
            .as_ref()
            .map(|o| o.software.built_in.as_slice())
            .unwrap_or_default()
    }

    pub fn depends_on(&self, framework: &str) -> bool {
        self.frameworks.iter().any(|f| f == framework)
    }
}

fn normalize_architecture(value: Option<serde_yaml::Value>) -> Result<Vec<String>> {
    use serde_yaml::Value;

    let scalar = |v: &Value| -> Option<String> {
        match v {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    };

    match value {
        None | Some(Value::Null) => Ok(vec![ARCH_ALL.to_string()]),
        Some(Value::Sequence(items)) => items
            .iter()
            .map(|item| {
                scalar(item).ok_or_else(|| CoreError::InvalidArchitecture {
                    message: format!("expected a list of names, found {:?}", item),
                })
            })
            .collect(),
        Some(other) => scalar(&other).map(|s| vec![s]).ok_or_else(|| {
            CoreError::InvalidArchitecture {
                message: format!("expected a name or a list of names, found {:?}", other),
            }
        }),
    }
}

fn build_integration(
    binaries: &[Binary],
    services: &[Service],
    allow_legacy_config: bool,
) -> Integration {
    let mut integration = Integration::new();

    for binary in binaries {
        let hook = IntegrationHook::for_entity(
            &binary.name,
            &binary.security,
            Some(binary.exec_path().to_string()),
        );
        integration.insert(binary.name.clone(), hook);
    }

    for service in services {
        let hook = IntegrationHook::for_entity(&service.name, &service.security, None);
        integration.insert(service.name.clone(), hook);
    }

    if binaries.is_empty() && services.is_empty() && allow_legacy_config {
        tracing::debug!("adding legacy {} hook", LEGACY_CONFIG_HOOK);
        integration.insert(
            LEGACY_CONFIG_HOOK.to_string(),
            IntegrationHook::for_entity(LEGACY_CONFIG_HOOK, &SecurityDefinitions::default(), None),
        );
    }

    integration
}

/// YAML 1.1 style booleans (`y`, `yes`, `on`, ...) as still found in manifests
pub(crate) mod yaml_bool {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer};
    use serde_yaml::Value;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<bool, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Value::deserialize(deserializer)? {
            Value::Bool(b) => Ok(b),
            Value::Null => Ok(false),
            Value::String(s) => match s.to_ascii_lowercase().as_str() {
                "y" | "yes" | "true" | "on" => Ok(true),
                "n" | "no" | "false" | "off" | "" => Ok(false),
                _ => Err(D::Error::custom(format!("'{}' is not a boolean", s))),
            },
            other => Err(D::Error::custom(format!("{:?} is not a boolean", other))),
        }
    }
}

/// Fails unless `supported` names `host` or `all`
pub fn check_architectures(supported: &[String], host: &str) -> Result<()> {
    if supported.iter().any(|arch| arch == ARCH_ALL || arch == host) {
        Ok(())
    } else {
        Err(CoreError::IncompatibleArchitecture {
            supported: supported.to_vec(),
            host: host.to_string(),
        })
    }
}
