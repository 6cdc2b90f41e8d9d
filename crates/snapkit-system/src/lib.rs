//! Snapkit System - Installing and removing packages on a device
//!
//! This crate provides:
//! - **Transactions**: Install state machine from fetch to security sync, with rollback
//! - **Package Manager**: Install, uninstall and activate parts below one root
//! - **Conflict Checks**: Origin exclusivity of frameworks and OEM packages
//! - **Security Policy**: AppArmor descriptors and dependent refresh on framework updates
//! - **Services**: systemd units for package services
//! - **Hardware Assignment**: udev rule files of OEM packages
//! - **Archives**: Verifying and unpacking `.snap` files
//! - **Progress Reporting**: Terminal progress bars and license prompts
//!
//! ## Example
//!
//! ```rust,no_run
//! use snapkit_core::Paths;
//! use snapkit_system::{ConsoleProgress, InstallOptions, PackageManager};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = PackageManager::new(Paths::default())?;
//! let tx = manager
//!     .install_file(
//!         "hello-world_1.0_all.snap".as_ref(),
//!         "sideload",
//!         &InstallOptions::new().allow_unauthenticated(),
//!         &ConsoleProgress::new(),
//!     )
//!     .await?;
//! println!("{} {}: {}", tx.target, tx.version, tx.state());
//! # Ok(())
//! # }
//! ```

pub mod actions;
pub mod archive;
pub mod command;
pub mod conflicts;
pub mod error;
pub mod manager;
pub mod mock;
pub mod progress;
pub mod security;
pub mod services;
pub mod transaction;
pub mod udev;

pub use actions::{InstallOptions, UninstallOptions};
pub use archive::{ArchiveExtractor, TarArchive, build_archive, sha512_file};
pub use conflicts::{check_for_package_installed, check_name_available};
pub use error::{Result, SystemError};
pub use manager::PackageManager;
pub use mock::{
    CallLog, MockFetcher, MockProfileCompiler, MockProgress, MockServiceControl, MockUdevControl,
};
pub use progress::ConsoleProgress;
pub use security::{ClickHook, PolicyChanges, PolicyDescriptor, ProfileCompiler};
pub use services::{ServiceControl, Systemctl};
pub use transaction::{Transaction, TransactionState};
pub use udev::{UdevControl, Udevadm};
