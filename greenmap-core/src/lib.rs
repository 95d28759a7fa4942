//! Core domain for the green-space catalogue.
//!
//! The catalogue is a flat list of trees, lawns and bushes with map
//! positions. A [`CatalogStore`] keeps it in memory, mirrors it to a
//! [`LocalCache`] on every change and, when online and configured, saves it
//! to a [`RemoteStore`] holding a single JSON document.
//!
//! Storage backends live in `greenmap-data`; this crate only defines the
//! seams and the synchronisation policy.

mod cache;
mod catalog;
mod clock;
mod error;
mod object;
pub mod remote;
mod status;
mod store;

#[doc(hidden)]
pub mod test_support;

pub use cache::{CACHE_KEY, CacheError, LocalCache, UNREADABLE_CACHE_KEY};
pub use catalog::{
    Catalog, CatalogDocument, DEFAULT_CITY, KindCounts, MergeOutcome, Metadata, MetadataPatch,
    Statistics,
};
pub use clock::{Clock, SystemClock};
pub use error::{ParseError, StoreError};
pub use object::{Coords, GreenKind, GreenObject, NewObject, ObjectId, ObjectPatch};
pub use remote::{PutRequest, RemoteDocument, RemoteError, RemoteStore, VersionToken};
pub use status::{StatusReporter, StatusUpdate, SyncStatus};
pub use store::{CatalogStore, ImportPolicy, SaveOutcome};
