//! Package identity: names, origins and qualified names

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{CoreError, Result};

/// Separates the package name from its origin in a qualified name
pub const ORIGIN_SEPARATOR: char = '.';

static VALID_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9-]*$").expect("valid regex"));

/// Package type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageType {
    #[default]
    App,
    Framework,
    Oem,
}

impl PackageType {
    /// Framework and OEM names are exclusive across origins
    pub fn is_origin_exclusive(self) -> bool {
        matches!(self, PackageType::Framework | PackageType::Oem)
    }
}

impl std::fmt::Display for PackageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PackageType::App => write!(f, "app"),
            PackageType::Framework => write!(f, "framework"),
            PackageType::Oem => write!(f, "oem"),
        }
    }
}

impl std::str::FromStr for PackageType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "app" | "application" => Ok(PackageType::App),
            "framework" => Ok(PackageType::Framework),
            "oem" => Ok(PackageType::Oem),
            _ => Err(format!("unknown package type: {}", s)),
        }
    }
}

/// `(name, origin, version)` triple identifying one package version
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackageIdentity {
    pub name: String,
    pub origin: String,
    pub version: String,
}

impl PackageIdentity {
    pub fn new(
        name: impl Into<String>,
        origin: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            origin: origin.into(),
            version: version.into(),
        }
    }

    pub fn qualified_name(&self, package_type: PackageType) -> String {
        qualified_name(package_type, &self.name, &self.origin)
    }
}

impl std::fmt::Display for PackageIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.origin.is_empty() {
            write!(f, "{} {}", self.name, self.version)
        } else {
            write!(f, "{}.{} {}", self.name, self.origin, self.version)
        }
    }
}

/// Validate a package name
pub fn validate_name(name: &str) -> Result<()> {
    validate(name, "package")
}

/// Validate a binary or service name
pub fn validate_entity_name(kind: &'static str, name: &str) -> Result<()> {
    validate(name, kind)
}

fn validate(name: &str, kind: &'static str) -> Result<()> {
    if VALID_NAME.is_match(name) {
        Ok(())
    } else {
        Err(CoreError::InvalidName {
            kind,
            name: name.to_string(),
        })
    }
}

/// `name` for frameworks/oem packages (or an empty origin), `name.origin` otherwise
pub fn qualified_name(package_type: PackageType, name: &str, origin: &str) -> String {
    if package_type.is_origin_exclusive() || origin.is_empty() {
        name.to_string()
    } else {
        format!("{}{}{}", name, ORIGIN_SEPARATOR, origin)
    }
}

/// Split a qualified name into bare name and origin
pub fn split_qualified_name(qualified: &str) -> (&str, Option<&str>) {
    match qualified.rsplit_once(ORIGIN_SEPARATOR) {
        Some((name, origin)) => (name, Some(origin)),
        None => (qualified, None),
    }
}

/// Extract the origin from `<root>/<name.origin>/<version>/meta/package.yaml`
pub fn origin_from_yaml_path(path: &Path) -> Result<String> {
    let qualified = path
        .parent()
        .and_then(Path::parent)
        .and_then(Path::parent)
        .and_then(Path::file_name)
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    match split_qualified_name(&qualified) {
        (_, Some(origin)) if !origin.is_empty() => Ok(origin.to_string()),
        _ => Err(CoreError::NoOrigin {
            path: path.display().to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_validate_name() {
        assert!(validate_name("hello-world").is_ok());
        assert!(validate_name("8nzc1x4iim2xj1g2ul64").is_ok());
        assert!(validate_name("foo.bar").is_err());
        assert!(validate_name("-foo").is_err());
        assert!(validate_name("").is_err());
    }

    #[test]
    fn test_validate_entity_name_rejects_punctuation() {
        let err = validate_entity_name("binary", "tes!me").unwrap_err();
        assert!(matches!(err, CoreError::InvalidName { kind: "binary", .. }));
    }

    #[test]
    fn test_qualified_name() {
        assert_eq!(qualified_name(PackageType::App, "foo", "mvo"), "foo.mvo");
        assert_eq!(qualified_name(PackageType::Framework, "foo", "mvo"), "foo");
        assert_eq!(qualified_name(PackageType::Oem, "foo", "mvo"), "foo");
        assert_eq!(qualified_name(PackageType::App, "foo", ""), "foo");
    }

    #[test]
    fn test_identity_display() {
        let id = PackageIdentity::new("foo", "mvo", "1.0");
        assert_eq!(id.to_string(), "foo.mvo 1.0");
        assert_eq!(id.qualified_name(PackageType::App), "foo.mvo");
    }

    #[test]
    fn test_origin_from_yaml_path() {
        let path = PathBuf::from("/oem/foo.bar/1.0/meta/package.yaml");
        assert_eq!(origin_from_yaml_path(&path).unwrap(), "bar");

        let path = PathBuf::from("/oem/foo/1.0/meta/package.yaml");
        assert!(matches!(
            origin_from_yaml_path(&path),
            Err(CoreError::NoOrigin { .. })
        ));
    }

    #[test]
    fn test_package_type_from_str() {
        assert_eq!("framework".parse::<PackageType>().unwrap(), PackageType::Framework);
        assert_eq!("application".parse::<PackageType>().unwrap(), PackageType::App);
        assert!("kernel".parse::<PackageType>().is_err());
    }
}
