//! Identity conflicts against the installed set

use snapkit_core::{Manifest, PackageType};
use snapkit_repo::SystemRepository;

use crate::error::{Result, SystemError};

/// Reject installing `manifest` from `origin` when a package with the same
/// bare name is installed from another origin and either side is a
/// framework or OEM package.
///
/// Same origin is an upgrade; apps from different origins coexist.
pub fn check_for_package_installed(
    system: &SystemRepository,
    manifest: &Manifest,
    origin: &str,
) -> Result<()> {
    check_name_available(system, &manifest.name, manifest.package_type, origin)
}

/// Same rule as [`check_for_package_installed`], for catalog entries whose
/// manifest is not fetched yet
pub fn check_name_available(
    system: &SystemRepository,
    name: &str,
    package_type: PackageType,
    origin: &str,
) -> Result<()> {
    for installed in system.active()? {
        if installed.name() != name || installed.origin() == origin {
            continue;
        }
        if installed.package_type().is_origin_exclusive() || package_type.is_origin_exclusive() {
            return Err(SystemError::NameAlreadyInstalled {
                name: name.to_string(),
                origin: installed.origin().to_string(),
            });
        }
    }
    Ok(())
}
