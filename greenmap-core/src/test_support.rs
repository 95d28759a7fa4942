//! In-memory doubles for the store's seams, used by unit, doc and behaviour
//! tests.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::remote::transport;
use crate::{
    CacheError, Catalog, Clock, LocalCache, PutRequest, RemoteDocument, RemoteError, RemoteStore,
    VersionToken,
};

/// URL reported in errors raised by [`StubRemoteStore`].
pub const STUB_URL: &str = "memory://catalogue/data.json";

/// `LocalCache` backed by a hash map, with an optional size quota.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RefCell<HashMap<String, String>>,
    quota: Option<usize>,
    writes: Cell<usize>,
}

impl MemoryCache {
    /// Reject values longer than `limit` bytes.
    #[must_use]
    pub fn with_quota(limit: usize) -> Self {
        Self {
            quota: Some(limit),
            ..Self::default()
        }
    }

    /// Seed `key` with `value`.
    #[must_use]
    pub fn with_entry(self, key: &str, value: &str) -> Self {
        self.entries
            .borrow_mut()
            .insert(key.to_owned(), value.to_owned());
        self
    }

    /// Current value stored under `key`.
    pub fn entry(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }

    /// Number of successful writes.
    pub fn write_count(&self) -> usize {
        self.writes.get()
    }
}

impl LocalCache for MemoryCache {
    fn load(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self.entry(key))
    }

    fn store(&self, key: &str, value: &str) -> Result<(), CacheError> {
        if let Some(limit) = self.quota
            && value.len() > limit
        {
            return Err(CacheError::QuotaExceeded {
                key: key.to_owned(),
                needed: value.len(),
                limit,
            });
        }
        self.entries
            .borrow_mut()
            .insert(key.to_owned(), value.to_owned());
        self.writes.set(self.writes.get() + 1);
        Ok(())
    }
}

#[derive(Debug, Default)]
struct StubState {
    document: Option<(VersionToken, String)>,
    revision: u64,
    fetch_error: Option<RemoteError>,
    put_error: Option<RemoteError>,
    racing_write: Option<String>,
    puts: Vec<PutRequest>,
    fetches: usize,
}

impl StubState {
    fn replace(&mut self, text: String) {
        self.revision += 1;
        let version = VersionToken::new(format!("rev-{}", self.revision));
        self.document = Some((version, text));
    }
}

/// `RemoteStore` keeping one document in memory.
///
/// Writes behave like a conditional-update API: a stale version token is
/// rejected with status 409, and overwriting an existing document without a
/// token is rejected with status 422. Each accepted write produces a new
/// `rev-N` token.
#[derive(Debug)]
pub struct StubRemoteStore {
    configured: bool,
    state: RefCell<StubState>,
}

impl StubRemoteStore {
    /// A configured store with no document.
    #[must_use]
    pub fn configured() -> Self {
        Self {
            configured: true,
            state: RefCell::new(StubState::default()),
        }
    }

    /// A store without a credential; the catalogue store never calls it.
    #[must_use]
    pub fn unconfigured() -> Self {
        Self {
            configured: false,
            ..Self::configured()
        }
    }

    /// Seed the document with `catalog`.
    ///
    /// # Errors
    ///
    /// Returns the serialisation error when `catalog` cannot be written as
    /// JSON.
    pub fn with_catalog(self, catalog: &Catalog) -> Result<Self, serde_json::Error> {
        let text = serde_json::to_string_pretty(catalog)?;
        Ok(self.with_document_text(text))
    }

    /// Seed the document with raw (unencoded) text.
    #[must_use]
    pub fn with_document_text(self, text: impl Into<String>) -> Self {
        self.set_document_text(text);
        self
    }

    /// Fail every fetch with `error`.
    #[must_use]
    pub fn failing_fetch(self, error: RemoteError) -> Self {
        self.state.borrow_mut().fetch_error = Some(error);
        self
    }

    /// Fail every write with `error`.
    #[must_use]
    pub fn failing_put(self, error: RemoteError) -> Self {
        self.state.borrow_mut().put_error = Some(error);
        self
    }

    /// Replace the document as another writer would.
    pub fn set_document_text(&self, text: impl Into<String>) {
        self.state.borrow_mut().replace(text.into());
    }

    /// Let another writer replace the document between the next version read
    /// and the write that follows it.
    pub fn race_next_put(&self, text: impl Into<String>) {
        self.state.borrow_mut().racing_write = Some(text.into());
    }

    /// Token of the current revision.
    pub fn current_version(&self) -> Option<VersionToken> {
        self.state
            .borrow()
            .document
            .as_ref()
            .map(|(version, _)| version.clone())
    }

    /// Current document text, decoded.
    pub fn document_text(&self) -> Option<String> {
        self.state
            .borrow()
            .document
            .as_ref()
            .map(|(_, text)| text.clone())
    }

    /// Current document parsed as a catalogue.
    pub fn document_catalog(&self) -> Option<Catalog> {
        self.document_text()
            .and_then(|text| serde_json::from_str(&text).ok())
    }

    /// Every write attempted so far, accepted or not.
    pub fn puts(&self) -> Vec<PutRequest> {
        self.state.borrow().puts.clone()
    }

    /// Number of fetches served so far.
    pub fn fetch_count(&self) -> usize {
        self.state.borrow().fetches
    }
}

#[async_trait(?Send)]
impl RemoteStore for StubRemoteStore {
    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn fetch_document(&self) -> Result<RemoteDocument, RemoteError> {
        let mut state = self.state.borrow_mut();
        state.fetches += 1;
        if let Some(err) = &state.fetch_error {
            return Err(err.clone());
        }
        let (version, text) = state.document.as_ref().ok_or_else(|| RemoteError::NotFound {
            url: STUB_URL.to_owned(),
        })?;
        Ok(RemoteDocument {
            version: version.clone(),
            encoded_content: transport::encode(text),
        })
    }

    async fn put_document(&self, request: PutRequest) -> Result<(), RemoteError> {
        let mut state = self.state.borrow_mut();
        state.puts.push(request.clone());
        if let Some(err) = &state.put_error {
            return Err(err.clone());
        }
        if let Some(text) = state.racing_write.take() {
            state.replace(text);
        }

        let current = state.document.as_ref().map(|(version, _)| version);
        match (current, request.version.as_ref()) {
            (Some(current), Some(sent)) if current != sent => {
                return Err(http_error(409, "does not match"));
            }
            (Some(_), None) => return Err(http_error(422, "\"sha\" wasn't supplied")),
            (None, Some(_)) => return Err(http_error(409, "document no longer exists")),
            _ => {}
        }

        let text = transport::decode(&request.encoded_content).map_err(|err| {
            RemoteError::InvalidResponse {
                url: STUB_URL.to_owned(),
                message: err.to_string(),
            }
        })?;
        state.replace(text);
        Ok(())
    }
}

fn http_error(status: u16, message: &str) -> RemoteError {
    RemoteError::Http {
        url: STUB_URL.to_owned(),
        status,
        message: message.to_owned(),
    }
}

/// Deterministic [`Clock`] advancing by a fixed step on every reading.
#[derive(Debug)]
pub struct StepClock {
    start: DateTime<Utc>,
    step: Duration,
    readings: Cell<i32>,
}

impl StepClock {
    /// A clock that always reads `at`.
    #[must_use]
    pub fn fixed(at: DateTime<Utc>) -> Self {
        Self::stepping(at, Duration::zero())
    }

    /// A clock reading `start`, then `start + step`, and so on.
    #[must_use]
    pub const fn stepping(start: DateTime<Utc>, step: Duration) -> Self {
        Self {
            start,
            step,
            readings: Cell::new(0),
        }
    }
}

impl Default for StepClock {
    fn default() -> Self {
        let start = Utc
            .with_ymd_and_hms(2024, 6, 1, 9, 0, 0)
            .single()
            .unwrap_or_default();
        Self::stepping(start, Duration::seconds(1))
    }
}

impl Clock for StepClock {
    fn now(&self) -> DateTime<Utc> {
        let n = self.readings.get();
        self.readings.set(n + 1);
        self.start + self.step * n
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CatalogStore, Coords, GreenKind, NewObject};
    use rstest::rstest;

    #[rstest]
    fn seeded_catalogue_is_served_as_the_first_revision() {
        let mut catalog = Catalog::new("Бийск", StepClock::default().now().date_naive());
        catalog.objects.push(
            NewObject::new(GreenKind::Bush, Coords::new(1.0, 2.0))
                .into_object("seed".into(), StepClock::default().now()),
        );

        let remote = StubRemoteStore::configured()
            .with_catalog(&catalog)
            .expect("seed remote");

        assert_eq!(remote.current_version(), Some(VersionToken::from("rev-1")));
        assert_eq!(remote.document_catalog(), Some(catalog));
    }

    #[rstest]
    #[tokio::test]
    async fn seeded_catalogue_loads_into_a_store() {
        let catalog = Catalog::new("Барнаул", StepClock::default().now().date_naive());
        let remote = StubRemoteStore::configured()
            .with_catalog(&catalog)
            .expect("seed remote");
        let mut store =
            CatalogStore::with_clock(MemoryCache::default(), remote, StepClock::default());

        store.load_remote().await.expect("load");

        assert_eq!(store.catalog().metadata.city, "Барнаул");
    }
}
