//! Catalogued green-space objects and the inputs used to create or patch them.
//!
//! Objects are stored exactly as contributors describe them: apart from the
//! identifier, the category and the position, every descriptive field is an
//! opaque string. Unknown fields survive a load/save cycle untouched through
//! the `extra` map, and so do known fields whose values cannot be
//! interpreted: such a value stays in `extra` under its own key and is written
//! back in place of the typed field.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use geo::Coord;
use rand::seq::SliceRandom;
use serde::de::DeserializeOwned;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// Characters used for the random part of generated identifiers.
const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Number of random characters appended to generated identifiers.
const ID_SUFFIX_LEN: usize = 9;

/// Field names owned by [`GreenObject`]; never accepted through `extra`.
const RESERVED_FIELDS: [&str; 8] = [
    "id",
    "type",
    "coords",
    "name",
    "condition",
    "description",
    "created_at",
    "updated_at",
];

/// Opaque identifier of a catalogued object.
///
/// Generated identifiers combine the creation time in Unix milliseconds with
/// a random base-36 suffix. Uniqueness is probabilistic.
///
/// # Examples
/// ```
/// use chrono::{TimeZone, Utc};
/// use greenmap_core::ObjectId;
///
/// let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
/// let id = ObjectId::generate(now);
/// assert!(id.as_str().starts_with("1717243200000-"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(String);

impl ObjectId {
    /// Wrap an existing identifier.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Generate a fresh identifier for an object created at `now`.
    #[must_use]
    pub fn generate(now: DateTime<Utc>) -> Self {
        let mut rng = rand::thread_rng();
        let suffix: String = (0..ID_SUFFIX_LEN)
            .filter_map(|_| ID_ALPHABET.choose(&mut rng).copied().map(char::from))
            .collect();
        Self(format!("{}-{suffix}", now.timestamp_millis()))
    }

    /// Borrow the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the identifier is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<str> for ObjectId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ObjectId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ObjectId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Category of a catalogued object.
///
/// The three known categories are counted in statistics. Any other value is
/// kept as [`GreenKind::Other`] and written back unchanged.
///
/// # Examples
/// ```
/// use greenmap_core::GreenKind;
///
/// assert_eq!("tree".parse::<GreenKind>(), Ok(GreenKind::Tree));
/// assert_eq!(GreenKind::from("flowerbed").as_str(), "flowerbed");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum GreenKind {
    /// A single tree.
    Tree,
    /// A lawn or grassed area.
    Lawn,
    /// A bush or hedge.
    Bush,
    /// Any category this version does not know about.
    Other(String),
}

impl Default for GreenKind {
    /// An empty [`GreenKind::Other`], used when a record names no category.
    fn default() -> Self {
        Self::Other(String::new())
    }
}

impl GreenKind {
    /// Return the wire representation of the category.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Tree => "tree",
            Self::Lawn => "lawn",
            Self::Bush => "bush",
            Self::Other(value) => value,
        }
    }
}

impl From<&str> for GreenKind {
    fn from(value: &str) -> Self {
        match value {
            "tree" => Self::Tree,
            "lawn" => Self::Lawn,
            "bush" => Self::Bush,
            other => Self::Other(other.to_owned()),
        }
    }
}

impl From<String> for GreenKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "tree" => Self::Tree,
            "lawn" => Self::Lawn,
            "bush" => Self::Bush,
            _ => Self::Other(value),
        }
    }
}

impl From<GreenKind> for String {
    fn from(kind: GreenKind) -> Self {
        match kind {
            GreenKind::Other(value) => value,
            known => known.as_str().to_owned(),
        }
    }
}

impl FromStr for GreenKind {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

impl fmt::Display for GreenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Geographic position written as `[latitude, longitude]`.
///
/// A missing component is held as `NaN` and written back as `null`; such a
/// position lies outside every bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[Option<f64>; 2]", into = "[f64; 2]")]
pub struct Coords {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
}

impl Coords {
    /// Construct a position from latitude and longitude.
    #[must_use]
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// A position with neither component known.
    #[must_use]
    pub const fn unknown() -> Self {
        Self::new(f64::NAN, f64::NAN)
    }

    /// Whether both components are finite numbers.
    #[must_use]
    pub fn is_known(self) -> bool {
        self.lat.is_finite() && self.lon.is_finite()
    }

    /// Convert to a `geo` coordinate (`x = longitude`, `y = latitude`).
    #[must_use]
    pub const fn to_coord(self) -> Coord<f64> {
        Coord {
            x: self.lon,
            y: self.lat,
        }
    }
}

impl From<[f64; 2]> for Coords {
    fn from([lat, lon]: [f64; 2]) -> Self {
        Self { lat, lon }
    }
}

impl From<[Option<f64>; 2]> for Coords {
    fn from([lat, lon]: [Option<f64>; 2]) -> Self {
        Self {
            lat: lat.unwrap_or(f64::NAN),
            lon: lon.unwrap_or(f64::NAN),
        }
    }
}

impl From<Coords> for [f64; 2] {
    fn from(coords: Coords) -> Self {
        [coords.lat, coords.lon]
    }
}

/// A single catalogued item.
///
/// Records written by other clients may omit or garble any field. Parsing
/// never fails for a JSON object: absent fields take their defaults and
/// uninterpretable values are kept in `extra` so that saving writes them back
/// unchanged.
///
/// # Examples
/// ```
/// use greenmap_core::{GreenKind, GreenObject};
/// use serde_json::json;
///
/// let object: GreenObject =
///     serde_json::from_value(json!({"id": "7-a", "coords": "somewhere"})).unwrap();
/// assert_eq!(object.kind, GreenKind::default());
/// assert!(!object.coords.is_known());
/// assert_eq!(serde_json::to_value(&object).unwrap()["coords"], "somewhere");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct GreenObject {
    /// Locally generated identifier.
    pub id: ObjectId,
    /// Category of the object, written as `type`.
    pub kind: GreenKind,
    /// Position on the map.
    pub coords: Coords,
    /// Display name.
    pub name: String,
    /// Free-form condition, e.g. `good` or `poor`.
    pub condition: String,
    /// Free-form notes.
    pub description: String,
    /// Time the store created the record, when known.
    pub created_at: Option<DateTime<Utc>>,
    /// Time the store last changed the record, when known.
    pub updated_at: Option<DateTime<Utc>>,
    /// Fields this version does not model, kept verbatim.
    pub extra: Map<String, Value>,
}

impl From<Map<String, Value>> for GreenObject {
    fn from(mut fields: Map<String, Value>) -> Self {
        let id = take_field::<String>(&mut fields, "id").map(ObjectId::from);
        let kind = take_field::<String>(&mut fields, "type").map(GreenKind::from);
        let coords = take_field(&mut fields, "coords");
        let name = take_field(&mut fields, "name");
        let condition = take_field(&mut fields, "condition");
        let description = take_field(&mut fields, "description");
        let created_at = take_field(&mut fields, "created_at");
        let updated_at = take_field(&mut fields, "updated_at");
        Self {
            id: id.unwrap_or_else(|| ObjectId::new(String::new())),
            kind: kind.unwrap_or_default(),
            coords: coords.unwrap_or_else(Coords::unknown),
            name: name.unwrap_or_default(),
            condition: condition.unwrap_or_default(),
            description: description.unwrap_or_default(),
            created_at,
            updated_at,
            extra: fields,
        }
    }
}

/// Remove `key` from `fields` when its value parses as `T`; otherwise leave
/// the value where it is.
fn take_field<T: DeserializeOwned>(fields: &mut Map<String, Value>, key: &str) -> Option<T> {
    let parsed = fields.get(key).and_then(|value| T::deserialize(value).ok())?;
    fields.remove(key);
    Some(parsed)
}

impl<'de> Deserialize<'de> for GreenObject {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Map::<String, Value>::deserialize(deserializer).map(Self::from)
    }
}

impl Serialize for GreenObject {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        let typed = |key: &str| !self.extra.contains_key(key);
        if typed("id") {
            map.serialize_entry("id", &self.id)?;
        }
        if typed("type") {
            map.serialize_entry("type", &self.kind)?;
        }
        if typed("coords") {
            map.serialize_entry("coords", &self.coords)?;
        }
        if typed("name") {
            map.serialize_entry("name", &self.name)?;
        }
        if typed("condition") {
            map.serialize_entry("condition", &self.condition)?;
        }
        if typed("description") {
            map.serialize_entry("description", &self.description)?;
        }
        if let Some(created_at) = self.created_at.filter(|_| typed("created_at")) {
            map.serialize_entry("created_at", &created_at)?;
        }
        if let Some(updated_at) = self.updated_at.filter(|_| typed("updated_at")) {
            map.serialize_entry("updated_at", &updated_at)?;
        }
        for (key, value) in &self.extra {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Caller-supplied data for a new object.
///
/// # Examples
/// ```
/// use greenmap_core::{Coords, GreenKind, NewObject};
///
/// let draft = NewObject::new(GreenKind::Tree, Coords::new(52.5186, 85.2076))
///     .with_name("Old oak")
///     .with_condition("good");
/// assert_eq!(draft.name, "Old oak");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewObject {
    /// Category of the object.
    #[serde(rename = "type")]
    pub kind: GreenKind,
    /// Position on the map.
    pub coords: Coords,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Free-form condition.
    #[serde(default)]
    pub condition: String,
    /// Free-form notes.
    #[serde(default)]
    pub description: String,
    /// Additional fields stored alongside the known ones.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl NewObject {
    /// Start a draft with the mandatory category and position.
    #[must_use]
    pub fn new(kind: GreenKind, coords: Coords) -> Self {
        Self {
            kind,
            coords,
            name: String::new(),
            condition: String::new(),
            description: String::new(),
            extra: Map::new(),
        }
    }

    /// Set the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the condition.
    #[must_use]
    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = condition.into();
        self
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Attach an additional field. Reserved field names are ignored.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Turn the draft into a stored object with both timestamps set to `now`.
    pub(crate) fn into_object(self, id: ObjectId, now: DateTime<Utc>) -> GreenObject {
        GreenObject {
            id,
            kind: self.kind,
            coords: self.coords,
            name: self.name,
            condition: self.condition,
            description: self.description,
            created_at: Some(now),
            updated_at: Some(now),
            extra: strip_reserved(self.extra),
        }
    }
}

/// Partial update applied with shallow-merge semantics.
///
/// Only the supplied fields change. The identifier and creation time are not
/// part of a patch.
///
/// # Examples
/// ```
/// use greenmap_core::ObjectPatch;
///
/// let patch = ObjectPatch::default().condition("poor");
/// assert_eq!(patch.condition.as_deref(), Some("poor"));
/// assert!(patch.name.is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectPatch {
    /// New category.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<GreenKind>,
    /// New position.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coords: Option<Coords>,
    /// New display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New condition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    /// New description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Additional fields to overwrite or add.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ObjectPatch {
    /// Replace the category.
    #[must_use]
    pub fn kind(mut self, kind: GreenKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Replace the position.
    #[must_use]
    pub fn coords(mut self, coords: Coords) -> Self {
        self.coords = Some(coords);
        self
    }

    /// Replace the display name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Replace the condition.
    #[must_use]
    pub fn condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    /// Replace the description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Overwrite or add an additional field.
    #[must_use]
    pub fn field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Whether the patch carries no changes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.kind.is_none()
            && self.coords.is_none()
            && self.name.is_none()
            && self.condition.is_none()
            && self.description.is_none()
            && self.extra.is_empty()
    }

    /// Merge the patch into `target` and stamp `updated_at`.
    ///
    /// Setting a typed field discards any uninterpretable value kept for it.
    pub(crate) fn apply(self, target: &mut GreenObject, now: DateTime<Utc>) {
        if let Some(kind) = self.kind {
            target.kind = kind;
            target.extra.remove("type");
        }
        if let Some(coords) = self.coords {
            target.coords = coords;
            target.extra.remove("coords");
        }
        if let Some(name) = self.name {
            target.name = name;
            target.extra.remove("name");
        }
        if let Some(condition) = self.condition {
            target.condition = condition;
            target.extra.remove("condition");
        }
        if let Some(description) = self.description {
            target.description = description;
            target.extra.remove("description");
        }
        target.extra.extend(strip_reserved(self.extra));
        target.updated_at = Some(now);
        target.extra.remove("updated_at");
    }
}

fn strip_reserved(mut extra: Map<String, Value>) -> Map<String, Value> {
    for key in RESERVED_FIELDS {
        extra.remove(key);
    }
    extra
}
