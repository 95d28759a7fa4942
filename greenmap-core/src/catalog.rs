//! The catalogue aggregate, its metadata and the merge policy.
//!
//! A [`Catalog`] owns every object. Remote documents are parsed into a
//! [`CatalogDocument`], whose metadata fields are all optional, and folded
//! into the local catalogue with [`Catalog::merge_remote`].
//!
//! Entries of the `objects` array that are not JSON objects cannot be read as
//! [`GreenObject`]s. They are carried along as raw values and written back
//! after the readable objects, so a save never drops them.

use chrono::{DateTime, NaiveDate, Utc};
use geo::{Intersects, Rect};
use serde::de::DeserializeOwned;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::{GreenKind, GreenObject, ObjectId};

/// City recorded in the metadata of freshly created catalogues.
pub const DEFAULT_CITY: &str = "Бийск";

/// Descriptive data stored next to the objects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    /// Time of the last remote save or load, if any.
    #[serde(default)]
    pub last_update: Option<DateTime<Utc>>,
    /// Cached object count; refreshed before each remote save.
    #[serde(default)]
    pub total_objects: usize,
    /// City the catalogue describes.
    pub city: String,
    /// Day the catalogue was created.
    pub created: NaiveDate,
}

/// Metadata as found in an incoming document.
///
/// Absent, `null` and uninterpretable fields all stay `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MetadataPatch {
    /// Remote last-update time.
    #[serde(deserialize_with = "lenient")]
    pub last_update: Option<DateTime<Utc>>,
    /// Remote object count.
    #[serde(deserialize_with = "lenient")]
    pub total_objects: Option<usize>,
    /// Remote city.
    #[serde(deserialize_with = "lenient")]
    pub city: Option<String>,
    /// Remote creation day.
    #[serde(deserialize_with = "lenient")]
    pub created: Option<NaiveDate>,
}

/// A catalogue as received from the remote store or read from the cache.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "RawDocument")]
pub struct CatalogDocument {
    /// Readable objects in document order.
    pub objects: Vec<GreenObject>,
    /// Entries of the `objects` array that are not JSON objects.
    pub unreadable: Vec<Value>,
    /// Metadata, when the document carries any.
    pub metadata: Option<MetadataPatch>,
}

#[derive(Deserialize)]
struct RawDocument {
    objects: Vec<Value>,
    #[serde(default, deserialize_with = "lenient")]
    metadata: Option<MetadataPatch>,
}

impl From<RawDocument> for CatalogDocument {
    fn from(raw: RawDocument) -> Self {
        let (objects, unreadable) = split_entries(raw.objects);
        Self {
            objects,
            unreadable,
            metadata: raw.metadata,
        }
    }
}

#[derive(Deserialize)]
struct StoredCatalog {
    objects: Vec<Value>,
    metadata: Metadata,
}

impl From<StoredCatalog> for Catalog {
    fn from(stored: StoredCatalog) -> Self {
        let (objects, unreadable) = split_entries(stored.objects);
        Self {
            objects,
            unreadable,
            metadata: stored.metadata,
        }
    }
}

fn split_entries(entries: Vec<Value>) -> (Vec<GreenObject>, Vec<Value>) {
    let mut objects = Vec::with_capacity(entries.len());
    let mut unreadable = Vec::new();
    for entry in entries {
        match entry {
            Value::Object(fields) => objects.push(GreenObject::from(fields)),
            other => unreadable.push(other),
        }
    }
    (objects, unreadable)
}

/// Deserialise `T`, treating any value that does not fit as absent.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).ok())
}

/// Which object list survived a merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The local list was at least as long and was kept.
    KeptLocal,
    /// The remote list was longer and replaced the local one.
    TookRemote,
}

/// Per-category counts for the known categories.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct KindCounts {
    /// Number of trees.
    pub tree: usize,
    /// Number of lawns.
    pub lawn: usize,
    /// Number of bushes.
    pub bush: usize,
}

/// Summary figures shown by the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    /// Number of objects in the catalogue.
    pub total: usize,
    /// Counts for the known categories; other categories are not counted.
    pub by_type: KindCounts,
    /// Time of the last remote save or load.
    pub last_update: Option<DateTime<Utc>>,
}

/// The full collection of objects plus metadata.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "StoredCatalog")]
pub struct Catalog {
    /// Objects in insertion order.
    pub objects: Vec<GreenObject>,
    /// Entries that could not be read as objects; written back after them.
    pub unreadable: Vec<Value>,
    /// Descriptive metadata.
    pub metadata: Metadata,
}

impl Serialize for Catalog {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut catalog = serializer.serialize_struct("Catalog", 2)?;
        catalog.serialize_field(
            "objects",
            &Entries {
                objects: &self.objects,
                unreadable: &self.unreadable,
            },
        )?;
        catalog.serialize_field("metadata", &self.metadata)?;
        catalog.end()
    }
}

struct Entries<'a> {
    objects: &'a [GreenObject],
    unreadable: &'a [Value],
}

#[derive(Serialize)]
#[serde(untagged)]
enum Entry<'a> {
    Object(&'a GreenObject),
    Raw(&'a Value),
}

impl Serialize for Entries<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let objects = self.objects.iter().map(Entry::Object);
        serializer.collect_seq(objects.chain(self.unreadable.iter().map(Entry::Raw)))
    }
}

impl Catalog {
    /// An empty catalogue for `city`, created on `created`.
    ///
    /// # Examples
    /// ```
    /// use chrono::NaiveDate;
    /// use greenmap_core::Catalog;
    ///
    /// let day = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
    /// let catalog = Catalog::new("Бийск", day);
    /// assert!(catalog.objects.is_empty());
    /// assert_eq!(catalog.metadata.total_objects, 0);
    /// ```
    pub fn new(city: impl Into<String>, created: NaiveDate) -> Self {
        Self {
            objects: Vec::new(),
            unreadable: Vec::new(),
            metadata: Metadata {
                last_update: None,
                total_objects: 0,
                city: city.into(),
                created,
            },
        }
    }

    /// First object carrying `id`.
    #[must_use]
    pub fn find(&self, id: &ObjectId) -> Option<&GreenObject> {
        self.objects.iter().find(|object| &object.id == id)
    }

    /// Whether any object carries `id`.
    #[must_use]
    pub fn contains(&self, id: &ObjectId) -> bool {
        self.find(id).is_some()
    }

    /// Objects whose category equals `kind` exactly.
    pub fn by_kind<'a>(&'a self, kind: &'a GreenKind) -> impl Iterator<Item = &'a GreenObject> {
        self.objects.iter().filter(move |object| &object.kind == kind)
    }

    /// Objects whose `(lon, lat)` position lies in `bbox`, boundary included.
    pub fn in_bbox(&self, bbox: Rect<f64>) -> impl Iterator<Item = &GreenObject> {
        self.objects
            .iter()
            .filter(move |object| bbox.intersects(&object.coords.to_coord()))
    }

    /// Count objects per known category.
    #[must_use]
    pub fn statistics(&self) -> Statistics {
        let by_type = self
            .objects
            .iter()
            .fold(KindCounts::default(), |mut counts, object| {
                match object.kind {
                    GreenKind::Tree => counts.tree += 1,
                    GreenKind::Lawn => counts.lawn += 1,
                    GreenKind::Bush => counts.bush += 1,
                    GreenKind::Other(_) => {}
                }
                counts
            });
        Statistics {
            total: self.objects.len(),
            by_type,
            last_update: self.metadata.last_update,
        }
    }

    /// Refresh the cached count and last-update time ahead of a remote save.
    pub fn refresh_metadata(&mut self, now: DateTime<Utc>) {
        self.metadata.total_objects = self.objects.len();
        self.metadata.last_update = Some(now);
    }

    /// Number of entries written on save, unreadable ones included.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.objects.len() + self.unreadable.len()
    }

    /// Replace the entries with those of `document` and apply its metadata.
    pub fn restore(&mut self, document: CatalogDocument) {
        self.objects = document.objects;
        self.unreadable = document.unreadable;
        if let Some(patch) = document.metadata {
            self.metadata.apply(patch);
        }
    }

    /// Fold a remote document into this catalogue.
    ///
    /// The longer entry list wins wholesale; on a tie the local list is
    /// kept. Metadata fields present in the remote document overwrite local
    /// ones. Local-only edits are lost when the remote list is longer.
    ///
    /// # Examples
    /// ```
    /// use chrono::NaiveDate;
    /// use greenmap_core::{Catalog, CatalogDocument, MergeOutcome};
    ///
    /// let day = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
    /// let mut local = Catalog::new("Бийск", day);
    /// let remote: CatalogDocument =
    ///     serde_json::from_str(r#"{"objects": [], "metadata": {"city": "Барнаул"}}"#).unwrap();
    ///
    /// assert_eq!(local.merge_remote(remote), MergeOutcome::KeptLocal);
    /// assert_eq!(local.metadata.city, "Барнаул");
    /// ```
    pub fn merge_remote(&mut self, remote: CatalogDocument) -> MergeOutcome {
        let remote_entries = remote.objects.len() + remote.unreadable.len();
        let outcome = if remote_entries > self.entry_count() {
            self.objects = remote.objects;
            self.unreadable = remote.unreadable;
            MergeOutcome::TookRemote
        } else {
            MergeOutcome::KeptLocal
        };

        if let Some(patch) = remote.metadata {
            self.metadata.apply(patch);
        }
        outcome
    }
}

impl Metadata {
    fn apply(&mut self, patch: MetadataPatch) {
        if let Some(last_update) = patch.last_update {
            self.last_update = Some(last_update);
        }
        if let Some(total_objects) = patch.total_objects {
            self.total_objects = total_objects;
        }
        if let Some(city) = patch.city {
            self.city = city;
        }
        if let Some(created) = patch.created {
            self.created = created;
        }
    }
}

impl From<Catalog> for CatalogDocument {
    fn from(catalog: Catalog) -> Self {
        let Metadata {
            last_update,
            total_objects,
            city,
            created,
        } = catalog.metadata;
        Self {
            objects: catalog.objects,
            unreadable: catalog.unreadable,
            metadata: Some(MetadataPatch {
                last_update,
                total_objects: Some(total_objects),
                city: Some(city),
                created: Some(created),
            }),
        }
    }
}
