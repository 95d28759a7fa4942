//! The catalogue store: an in-memory catalogue mirrored to a local cache and
//! to a remote single-document store.
//!
//! # Sequencing
//!
//! Every mutation updates memory, then writes the local cache, then (when
//! online) attempts a remote save. Methods take `&mut self`, so a mutation's
//! remote save finishes before the next operation starts and at most one
//! remote save is ever in flight per store. Other writers are detected only
//! through the remote version token; a rejected save is logged and dropped.
//!
//! # Failure policy
//!
//! Cache and remote-save failures never reach the caller. They are logged and
//! reported through the [`StatusReporter`]; the in-memory catalogue remains
//! authoritative for the session. Only [`CatalogStore::load_remote`] and the
//! import operations return errors.
//!
//! A remote document that could not be decoded is never overwritten: remote
//! saves fail until a later load reads the document successfully. A cache
//! entry that cannot be decoded is copied to [`UNREADABLE_CACHE_KEY`] before
//! the store starts from an empty catalogue.

mod import;

use std::fmt;

use chrono::SecondsFormat;
use geo::Rect;
use log::{debug, error, info, warn};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::remote::transport;
use crate::{
    CACHE_KEY, Catalog, CatalogDocument, Clock, DEFAULT_CITY, GreenKind, GreenObject,
    LocalCache, MergeOutcome, NewObject, ObjectId, ObjectPatch, ParseError, PutRequest,
    RemoteError, RemoteStore, Statistics, StatusReporter, StatusUpdate, StoreError, SyncStatus,
    SystemClock, UNREADABLE_CACHE_KEY, VersionToken,
};

pub use import::ImportPolicy;
use import::ImportDocument;

/// Result of a remote save attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The remote document now matches the local catalogue.
    Saved,
    /// Offline or no credential; nothing was sent.
    Skipped,
    /// The save failed; the error has already been logged and reported.
    Failed(StoreError),
}

/// Catalogue of green-space objects with local persistence and remote sync.
///
/// # Examples
///
/// ```
/// use greenmap_core::test_support::{MemoryCache, StubRemoteStore};
/// use greenmap_core::{CatalogStore, Coords, GreenKind, NewObject, SyncStatus};
///
/// # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
/// let mut store = CatalogStore::new(MemoryCache::default(), StubRemoteStore::unconfigured());
/// store.init().await;
/// assert_eq!(store.last_status().map(|s| s.status), Some(SyncStatus::Offline));
///
/// let oak = store
///     .add_object(NewObject::new(GreenKind::Tree, Coords::new(52.52, 85.21)))
///     .await;
/// assert_eq!(store.get_statistics().by_type.tree, 1);
/// assert!(store.delete_object(&oak.id).await);
/// # });
/// ```
pub struct CatalogStore<C, R, K = SystemClock> {
    catalog: Catalog,
    cache: C,
    remote: R,
    clock: K,
    online: bool,
    remote_unreadable: Option<ParseError>,
    reporter: Option<Box<dyn StatusReporter>>,
    last_status: Option<StatusUpdate>,
}

impl<C, R, K> fmt::Debug for CatalogStore<C, R, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CatalogStore")
            .field("objects", &self.catalog.objects.len())
            .field("metadata", &self.catalog.metadata)
            .field("online", &self.online)
            .field("last_status", &self.last_status)
            .finish_non_exhaustive()
    }
}

impl<C, R> CatalogStore<C, R, SystemClock>
where
    C: LocalCache,
    R: RemoteStore,
{
    /// Create a store using the system clock.
    ///
    /// The store starts online with an empty catalogue; call
    /// [`CatalogStore::init`] to load cached and remote data.
    pub fn new(cache: C, remote: R) -> Self {
        Self::with_clock(cache, remote, SystemClock)
    }
}

impl<C, R, K> CatalogStore<C, R, K>
where
    C: LocalCache,
    R: RemoteStore,
    K: Clock,
{
    /// Create a store with an explicit time source.
    pub fn with_clock(cache: C, remote: R, clock: K) -> Self {
        let created = clock.now().date_naive();
        Self {
            catalog: Catalog::new(DEFAULT_CITY, created),
            cache,
            remote,
            clock,
            online: true,
            remote_unreadable: None,
            reporter: None,
            last_status: None,
        }
    }

    /// Use `city` in the metadata of a catalogue that is not loaded from
    /// the cache or the remote store.
    #[must_use]
    pub fn with_city(mut self, city: impl Into<String>) -> Self {
        self.catalog.metadata.city = city.into();
        self
    }

    /// Set the initial connectivity flag.
    #[must_use]
    pub fn with_online(mut self, online: bool) -> Self {
        self.online = online;
        self
    }

    /// Forward status changes to `reporter`.
    #[must_use]
    pub fn with_status_reporter(mut self, reporter: impl StatusReporter + 'static) -> Self {
        self.reporter = Some(Box::new(reporter));
        self
    }

    /// Update the connectivity flag.
    pub fn set_online(&mut self, online: bool) {
        self.online = online;
    }

    /// Whether remote operations may be attempted.
    #[must_use]
    pub const fn is_online(&self) -> bool {
        self.online
    }

    /// The current catalogue.
    #[must_use]
    pub const fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// The most recent status change, if any.
    #[must_use]
    pub const fn last_status(&self) -> Option<&StatusUpdate> {
        self.last_status.as_ref()
    }

    /// The injected local cache.
    pub const fn cache(&self) -> &C {
        &self.cache
    }

    /// The injected remote store.
    pub const fn remote(&self) -> &R {
        &self.remote
    }

    /// Load the cached catalogue and, when possible, merge the remote one.
    ///
    /// Never fails: a remote failure is logged, reported as
    /// [`SyncStatus::Error`], and the cached catalogue is kept.
    pub async fn init(&mut self) -> &[GreenObject] {
        self.load_local();

        if self.online && self.remote.is_configured() {
            match self.fetch_and_merge().await {
                Ok(outcome) => {
                    info!("synchronised with remote store ({outcome:?})");
                    self.set_status(SyncStatus::Success, "Synced with remote store");
                }
                Err(err) => {
                    warn!("remote sync failed, using local data: {err}");
                    self.set_status(SyncStatus::Error, "Offline mode: remote sync failed");
                }
            }
        } else {
            info!("working offline");
            self.set_status(SyncStatus::Offline, "Offline mode");
        }

        &self.catalog.objects
    }

    /// Fetch the remote catalogue and merge it into the local one.
    ///
    /// # Errors
    ///
    /// [`StoreError::Configuration`] without a credential,
    /// [`StoreError::Remote`] when the fetch fails and [`StoreError::Parse`]
    /// when the document cannot be decoded.
    pub async fn load_remote(&mut self) -> Result<&[GreenObject], StoreError> {
        self.fetch_and_merge().await?;
        Ok(&self.catalog.objects)
    }

    async fn fetch_and_merge(&mut self) -> Result<MergeOutcome, StoreError> {
        if !self.remote.is_configured() {
            return Err(StoreError::Configuration);
        }

        self.set_status(SyncStatus::Syncing, "Loading from remote store");
        let document = self
            .remote
            .fetch_document()
            .await
            .inspect_err(|err| error!("remote load failed: {err}"))?;
        let parsed = transport::decode(&document.encoded_content)
            .and_then(|text| parse_with_objects::<CatalogDocument>(&text));
        let remote = match parsed {
            Ok(remote) => remote,
            Err(err) => {
                error!("remote catalogue is unreadable; remote saves are disabled: {err}");
                self.remote_unreadable = Some(err.clone());
                return Err(err.into());
            }
        };
        self.remote_unreadable = None;
        if !remote.unreadable.is_empty() {
            warn!(
                "remote catalogue holds {} entries that are not objects; keeping them verbatim",
                remote.unreadable.len()
            );
        }
        let remote_len = remote.objects.len();

        let outcome = self.catalog.merge_remote(remote);
        debug!(
            "merged remote catalogue: {remote_len} remote objects, {} kept ({outcome:?})",
            self.catalog.objects.len()
        );
        self.persist_local();
        self.catalog.metadata.last_update = Some(self.clock.now());
        Ok(outcome)
    }

    /// Write the whole catalogue to the remote store.
    ///
    /// Skipped when offline or without a credential. The write is
    /// conditional on the version token read just before it; a missing
    /// document is created. Failures are logged and reported, never raised.
    /// Fails without writing while the last remote load found the document
    /// unreadable.
    pub async fn save_remote(&mut self) -> SaveOutcome {
        if !self.online || !self.remote.is_configured() {
            debug!("skipping remote save: offline or no credential");
            return SaveOutcome::Skipped;
        }
        if let Some(err) = self.remote_unreadable.clone() {
            warn!("not overwriting the unreadable remote catalogue: {err}");
            self.set_status(SyncStatus::Error, "Sync error");
            return SaveOutcome::Failed(StoreError::Parse(err));
        }

        let now = self.clock.now();
        self.catalog.refresh_metadata(now);
        self.set_status(SyncStatus::Syncing, "Saving to remote store");

        let version = self.current_version().await;
        let body = match serde_json::to_string_pretty(&self.catalog) {
            Ok(body) => body,
            Err(err) => {
                error!("could not serialise catalogue for the remote store: {err}");
                self.set_status(SyncStatus::Error, "Sync error");
                return SaveOutcome::Failed(StoreError::Parse(err.into()));
            }
        };
        let count = self.catalog.objects.len();
        let request = PutRequest {
            message: format!(
                "Update catalogue: {} ({count} objects)",
                now.to_rfc3339_opts(SecondsFormat::Secs, true)
            ),
            encoded_content: transport::encode(&body),
            version,
        };

        match self.remote.put_document(request).await {
            Ok(()) => {
                info!("saved {count} objects to remote store");
                self.set_status(SyncStatus::Success, "Saved to remote store");
                SaveOutcome::Saved
            }
            Err(err) => {
                if err.is_conflict() {
                    warn!("remote save rejected, document changed since it was read: {err}");
                } else {
                    error!("remote save failed: {err}");
                }
                self.set_status(SyncStatus::Error, "Sync error");
                SaveOutcome::Failed(err.into())
            }
        }
    }

    async fn current_version(&self) -> Option<VersionToken> {
        match self.remote.fetch_document().await {
            Ok(document) => Some(document.version),
            Err(RemoteError::NotFound { .. }) => {
                debug!("remote document missing; the save will create it");
                None
            }
            Err(err) => {
                warn!("could not read remote version token, writing without it: {err}");
                None
            }
        }
    }

    /// Append a new object and return the stored record.
    pub async fn add_object(&mut self, draft: NewObject) -> GreenObject {
        let now = self.clock.now();
        let object = draft.into_object(ObjectId::generate(now), now);
        self.catalog.objects.push(object.clone());
        self.persist_local();
        self.sync_after("add").await;
        object
    }

    /// Shallow-merge `patch` into the first object with `id`.
    ///
    /// Returns `None`, leaving the catalogue untouched, when no object
    /// matches.
    pub async fn update_object(&mut self, id: &ObjectId, patch: ObjectPatch) -> Option<GreenObject> {
        let now = self.clock.now();
        let object = self
            .catalog
            .objects
            .iter_mut()
            .find(|object| &object.id == id)?;
        patch.apply(object, now);
        let updated = object.clone();
        self.persist_local();
        self.sync_after("update").await;
        Some(updated)
    }

    /// Remove the first object with `id`; returns whether one was removed.
    pub async fn delete_object(&mut self, id: &ObjectId) -> bool {
        let Some(index) = self
            .catalog
            .objects
            .iter()
            .position(|object| &object.id == id)
        else {
            return false;
        };
        self.catalog.objects.remove(index);
        self.persist_local();
        self.sync_after("delete").await;
        true
    }

    /// Copy of every object in catalogue order.
    #[must_use]
    pub fn get_all_objects(&self) -> Vec<GreenObject> {
        self.catalog.objects.clone()
    }

    /// Copies of the objects whose category equals `kind`.
    #[must_use]
    pub fn get_objects_by_type(&self, kind: &GreenKind) -> Vec<GreenObject> {
        self.catalog.by_kind(kind).cloned().collect()
    }

    /// Objects inside a map viewport (`x = longitude`, `y = latitude`).
    pub fn get_objects_in_bbox(&self, bbox: Rect<f64>) -> impl Iterator<Item = &GreenObject> {
        self.catalog.in_bbox(bbox)
    }

    /// First object with `id`.
    #[must_use]
    pub fn find_object(&self, id: &ObjectId) -> Option<&GreenObject> {
        self.catalog.find(id)
    }

    /// Totals per known category plus the last update time.
    #[must_use]
    pub fn get_statistics(&self) -> Statistics {
        self.catalog.statistics()
    }

    /// Serialise the whole catalogue as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// [`StoreError::Parse`] if serialisation fails.
    pub fn export_data(&self) -> Result<String, StoreError> {
        serde_json::to_string_pretty(&self.catalog).map_err(|err| StoreError::Parse(err.into()))
    }

    /// Import every object of an exported document under fresh identifiers.
    ///
    /// Returns the number of objects appended.
    ///
    /// # Errors
    ///
    /// [`StoreError::Parse`] when `text` is malformed or lacks `objects`.
    pub async fn import_data(&mut self, text: &str) -> Result<usize, StoreError> {
        self.import_data_with(text, ImportPolicy::AppendAll).await
    }

    /// Import objects from `text` according to `policy`.
    ///
    /// Incoming identifiers are never reused. Missing timestamps are set to
    /// the current time. Entries that are not JSON objects are skipped.
    ///
    /// # Errors
    ///
    /// [`StoreError::Parse`] when `text` is malformed or lacks `objects`.
    pub async fn import_data_with(
        &mut self,
        text: &str,
        policy: ImportPolicy,
    ) -> Result<usize, StoreError> {
        let document: ImportDocument = parse_with_objects(text)
            .inspect_err(|err| error!("import failed: {err}"))?;
        let now = self.clock.now();
        let mut imported = 0;

        for entry in document.objects {
            let incoming = match entry {
                Value::Object(fields) => GreenObject::from(fields),
                other => {
                    warn!("skipping imported entry that is not an object: {other}");
                    continue;
                }
            };
            if policy.skips(&incoming, &self.catalog) {
                debug!("skipping imported object already present locally");
                continue;
            }
            self.catalog
                .objects
                .push(import::adopt(incoming, ObjectId::generate(now), now));
            imported += 1;
        }

        info!("imported {imported} objects");
        self.persist_local();
        self.sync_after("import").await;
        Ok(imported)
    }

    async fn sync_after(&mut self, operation: &str) {
        if !self.online {
            return;
        }
        if let SaveOutcome::Failed(err) = self.save_remote().await {
            warn!("remote sync failed after {operation}: {err}");
        }
    }

    fn load_local(&mut self) {
        match self.cache.load(CACHE_KEY) {
            Ok(Some(text)) => match serde_json::from_str::<CatalogDocument>(&text) {
                Ok(document) => {
                    debug!("loaded {} objects from local cache", document.objects.len());
                    self.catalog.restore(document);
                }
                Err(err) => {
                    warn!("ignoring unreadable local cache: {err}");
                    match self.cache.store(UNREADABLE_CACHE_KEY, &text) {
                        Ok(()) => info!("copied unreadable cache to {UNREADABLE_CACHE_KEY}"),
                        Err(err) => error!("could not copy the unreadable cache: {err}"),
                    }
                }
            },
            Ok(None) => debug!("local cache is empty"),
            Err(err) => error!("local cache read failed: {err}"),
        }
    }

    fn persist_local(&self) {
        let text = match serde_json::to_string(&self.catalog) {
            Ok(text) => text,
            Err(err) => {
                error!("could not serialise catalogue for the local cache: {err}");
                return;
            }
        };
        match self.cache.store(CACHE_KEY, &text) {
            Ok(()) => debug!("cached {} objects locally", self.catalog.objects.len()),
            Err(err) => error!("local cache write failed: {err}"),
        }
    }

    fn set_status(&mut self, status: SyncStatus, message: &str) {
        if let Some(reporter) = &self.reporter {
            reporter.report(status, message);
        }
        self.last_status = Some(StatusUpdate {
            status,
            message: message.to_owned(),
        });
    }
}

/// Parse a document that must carry an `objects` array.
fn parse_with_objects<T: DeserializeOwned>(text: &str) -> Result<T, ParseError> {
    let value: Value = serde_json::from_str(text)?;
    if !value.get("objects").is_some_and(Value::is_array) {
        return Err(ParseError::MissingObjects);
    }
    Ok(serde_json::from_value(value)?)
}
