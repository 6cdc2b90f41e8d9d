//! Progress sink used by long running operations

/// Receives progress of downloads and transactions
///
/// Implementations must be Send + Sync so they can be shared with async tasks.
pub trait ProgressSink: Send + Sync {
    /// A new measurable step begins
    fn start(&self, label: &str, total: u64);

    /// Absolute progress of the current step
    fn set(&self, current: u64);

    fn finished(&self);

    /// Human readable message
    fn notify(&self, message: &str);

    /// Ask the user to accept a license
    fn agreed(&self, intro: &str, license: &str) -> bool;
}

/// Discards progress and declines every license
#[derive(Debug, Default, Clone, Copy)]
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn start(&self, _label: &str, _total: u64) {}

    fn set(&self, _current: u64) {}

    fn finished(&self) {}

    fn notify(&self, _message: &str) {}

    fn agreed(&self, _intro: &str, _license: &str) -> bool {
        false
    }
}
