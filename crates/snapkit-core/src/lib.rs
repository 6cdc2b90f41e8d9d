//! Snapkit Core - Core types for the snap package manager
//!
//! This crate provides the foundational types used throughout snapkit:
//! - `Manifest`: The parsed and validated `meta/package.yaml`
//! - `SecurityDefinitions`: Per-entity security declaration and update decision
//! - `Part`: A package instance, installed on disk or known to the catalog
//! - `Oem`: Store identity and hardware assignment (udev rule generation)
//! - `Paths`: The on-disk layout

pub mod error;
pub mod hardware;
pub mod identity;
pub mod manifest;
pub mod part;
pub mod paths;
pub mod progress;
pub mod release;
pub mod security;
pub mod sidecar;

pub use error::{CoreError, Result};
pub use hardware::{HardwareAssign, HardwareRule, Oem};
pub use identity::{PackageIdentity, PackageType, origin_from_yaml_path, qualified_name};
pub use manifest::{
    Binary, HookKind, Integration, IntegrationHook, MANIFEST_PATH, Manifest, Port, Ports, Service,
    check_architectures,
};
pub use part::{CATALOG_FIELDS, InstalledSnap, Part, RemotePackage, RemoteSnap};
pub use paths::{CURRENT_LINK, HASHES_FILE, Paths};
pub use progress::{NullProgress, ProgressSink};
pub use release::{Release, host_architecture};
pub use security::SecurityDefinitions;
pub use sidecar::{Hashes, StoreManifest};
