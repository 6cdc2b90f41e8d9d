//! Fetch interface used to download package archives and icons

use async_trait::async_trait;
use snapkit_core::ProgressSink;
use std::path::Path;

use crate::error::Result;

/// Downloads a URL to a local file
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Write the body of `url` to `dest`, returning the number of bytes
    async fn fetch(&self, url: &str, dest: &Path, progress: &dyn ProgressSink) -> Result<u64>;
}
