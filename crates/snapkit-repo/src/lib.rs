//! Snapkit Repositories
//!
//! Where package parts come from:
//!
//! - **Local**: every installed version below an install root
//! - **System**: apps, frameworks and OEM packages together, with dependents
//!   and the OEM store id
//! - **Store**: search, details and bulk updates against the remote catalog
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use snapkit_core::Paths;
//! use snapkit_repo::{StoreConfig, StoreRepository, SystemRepository};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let system = Arc::new(SystemRepository::new(Paths::default()));
//! let store = StoreRepository::new(StoreConfig::load()?)?.with_installed(system);
//!
//! for (name, shared) in store.search("hello-world").await? {
//!     println!("{}: {} origins", name, shared.parts().len());
//! }
//! let updates = store.updates().await?;
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod client;
pub mod config;
pub mod error;
pub mod fetch;
pub mod local;
pub mod store;

pub use backend::Repository;
pub use client::{StoreClient, StoreHeaders};
pub use config::StoreConfig;
pub use error::{RepoError, Result};
pub use fetch::Fetcher;
pub use local::{LocalRepository, SystemRepository, store_id_for};
pub use store::{InstalledNames, SearchResults, SharedName, StoreRepository};
