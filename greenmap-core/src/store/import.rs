//! Parsing of exported documents brought back in through an import.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::{Catalog, GreenObject, ObjectId};

/// How an import treats incoming objects whose identifier already exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ImportPolicy {
    /// Append every incoming object under a fresh identifier.
    #[default]
    AppendAll,
    /// Drop incoming objects whose identifier matches a local object.
    SkipExisting,
}

impl ImportPolicy {
    pub(super) fn skips(self, incoming: &GreenObject, catalog: &Catalog) -> bool {
        match self {
            Self::SkipExisting => !incoming.id.is_empty() && catalog.contains(&incoming.id),
            Self::AppendAll => false,
        }
    }
}

/// An exported document; entries are read one at a time so that a
/// hand-edited record without a category or timestamps still imports.
#[derive(Debug, Deserialize)]
pub(super) struct ImportDocument {
    pub(super) objects: Vec<Value>,
}

/// Store an imported record under `id`, stamping missing timestamps with
/// `now`.
pub(super) fn adopt(mut object: GreenObject, id: ObjectId, now: DateTime<Utc>) -> GreenObject {
    object.id = id;
    object.extra.remove("id");
    if object.created_at.is_none() {
        object.created_at = Some(now);
        object.extra.remove("created_at");
    }
    if object.updated_at.is_none() {
        object.updated_at = Some(now);
        object.extra.remove("updated_at");
    }
    object
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GreenKind;
    use chrono::{NaiveDate, TimeZone};
    use rstest::{fixture, rstest};
    use serde_json::json;

    #[fixture]
    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap()
    }

    fn parse(raw: Value) -> GreenObject {
        serde_json::from_value(raw).expect("parse imported object")
    }

    #[rstest]
    fn missing_timestamps_default_to_now(now: DateTime<Utc>) {
        let object = adopt(
            parse(json!({"type": "bush", "coords": [1.0, 2.0]})),
            ObjectId::from("new"),
            now,
        );
        assert_eq!(object.created_at, Some(now));
        assert_eq!(object.updated_at, Some(now));
        assert_eq!(object.name, "");
    }

    #[rstest]
    fn present_timestamps_and_extras_are_kept(now: DateTime<Utc>) {
        let object = adopt(
            parse(json!({"id": "old", "type": "tree", "coords": [1.0, 2.0],
                "created_at": "2023-01-01T00:00:00Z", "species": "birch"})),
            ObjectId::from("new"),
            now,
        );
        assert_eq!(object.id.as_str(), "new");
        assert_eq!(
            object.created_at.map(|at| at.date_naive()),
            NaiveDate::from_ymd_opt(2023, 1, 1)
        );
        assert_eq!(object.updated_at, Some(now));
        assert_eq!(object.extra.get("species"), Some(&Value::from("birch")));
    }

    #[rstest]
    fn garbled_identifier_and_timestamps_are_replaced(now: DateTime<Utc>) {
        let object = adopt(
            parse(json!({"id": 17, "type": "tree", "coords": [1.0, 2.0], "updated_at": "soon"})),
            ObjectId::from("new"),
            now,
        );
        let back = serde_json::to_value(&object).expect("serialise");
        assert_eq!(back["id"], "new");
        assert_eq!(back["updated_at"], json!(now));
    }

    #[rstest]
    #[case(ImportPolicy::AppendAll, false)]
    #[case(ImportPolicy::SkipExisting, true)]
    fn policy_decides_on_colliding_ids(
        now: DateTime<Utc>,
        #[case] policy: ImportPolicy,
        #[case] skipped: bool,
    ) {
        let mut catalog = Catalog::new("Бийск", now.date_naive());
        catalog
            .objects
            .push(adopt(parse(json!({"type": "tree", "coords": [0.0, 0.0]})), "a".into(), now));

        let colliding = parse(json!({"id": "a", "type": "tree", "coords": [0.0, 0.0]}));
        let fresh = parse(json!({"id": "b", "type": "tree", "coords": [0.0, 0.0]}));
        let anonymous = parse(json!({"type": "tree", "coords": [0.0, 0.0]}));

        assert_eq!(policy.skips(&colliding, &catalog), skipped);
        assert!(!policy.skips(&fresh, &catalog));
        assert!(!policy.skips(&anonymous, &catalog));
    }

    #[rstest]
    fn category_and_position_may_be_missing(now: DateTime<Utc>) {
        let object = adopt(parse(json!({"name": "Unnamed"})), ObjectId::from("n"), now);
        assert_eq!(object.kind, GreenKind::default());
        assert!(!object.coords.is_known());
        assert_eq!(object.name, "Unnamed");
    }
}
