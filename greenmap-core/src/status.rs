//! Synchronisation status surfaced to the presentation layer.

use std::fmt;

/// Coarse synchronisation state shown as an indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncStatus {
    /// The last remote operation succeeded.
    Success,
    /// The last remote operation failed; local data stays authoritative.
    Error,
    /// No connectivity or no credential; working from the local cache.
    Offline,
    /// A remote operation is in flight.
    Syncing,
}

impl SyncStatus {
    /// Lowercase name of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Offline => "offline",
            Self::Syncing => "syncing",
        }
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A status change together with its human-readable message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    /// New status.
    pub status: SyncStatus,
    /// Message suitable for display.
    pub message: String,
}

/// Receives status changes from the store.
///
/// Closures taking `(SyncStatus, &str)` implement this trait.
///
/// # Examples
/// ```
/// use std::cell::RefCell;
/// use greenmap_core::{StatusReporter, SyncStatus};
///
/// let seen = RefCell::new(Vec::new());
/// let reporter = |status: SyncStatus, _message: &str| seen.borrow_mut().push(status);
/// reporter.report(SyncStatus::Offline, "Offline mode");
/// assert_eq!(*seen.borrow(), vec![SyncStatus::Offline]);
/// ```
pub trait StatusReporter {
    /// Handle a status change.
    fn report(&self, status: SyncStatus, message: &str);
}

impl<F> StatusReporter for F
where
    F: Fn(SyncStatus, &str),
{
    fn report(&self, status: SyncStatus, message: &str) {
        self(status, message);
    }
}
