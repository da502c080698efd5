//! Serde adapters for fields that MongoDB holds as `ObjectId` and BSON `Date`
//! while the JSON API carries them as hex and RFC 3339 strings.
//!
//! The driver encodes documents through a serializer that reports itself as
//! not human readable, JSON reports the opposite, and that flag picks the
//! shape. Reading accepts either shape, so documents written by the
//! registration service and older string-shaped ones load alike.

use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use mongodb::bson::{Bson, DateTime as BsonDateTime};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Id as it must appear in a query filter. A malformed id stays a string,
/// which matches nothing.
pub fn id_bson(id: &str) -> Bson {
    match ObjectId::parse_str(id) {
        Ok(oid) => Bson::ObjectId(oid),
        Err(_) => Bson::String(id.to_string()),
    }
}

fn id_from_bson<E: serde::de::Error>(value: Bson) -> Result<String, E> {
    match value {
        Bson::ObjectId(oid) => Ok(oid.to_hex()),
        Bson::String(hex) => Ok(hex),
        other => Err(E::custom(format!(
            "expected an ObjectId, found {:?}",
            other.element_type()
        ))),
    }
}

fn datetime_from_bson<E: serde::de::Error>(value: Bson) -> Result<DateTime<Utc>, E> {
    match value {
        Bson::DateTime(stored) => DateTime::from_timestamp_millis(stored.timestamp_millis())
            .ok_or_else(|| E::custom("date out of range")),
        Bson::String(text) => DateTime::parse_from_rfc3339(&text)
            .map(|parsed| parsed.with_timezone(&Utc))
            .map_err(E::custom),
        other => Err(E::custom(format!("expected a date, found {:?}", other.element_type()))),
    }
}

pub mod hex_id {
    use super::*;

    pub fn serialize<S: Serializer>(id: &str, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            return serializer.serialize_str(id);
        }
        ObjectId::parse_str(id)
            .map_err(<S::Error as serde::ser::Error>::custom)?
            .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        id_from_bson(Bson::deserialize(deserializer)?)
    }
}

/// Pair with `#[serde(default)]` so a missing field reads as `None`.
pub mod optional_hex_id {
    use super::*;

    pub fn serialize<S: Serializer>(id: &Option<String>, serializer: S) -> Result<S::Ok, S::Error> {
        match id {
            Some(id) => hex_id::serialize(id, serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
        match Option::<Bson>::deserialize(deserializer)? {
            None | Some(Bson::Null) => Ok(None),
            Some(value) => id_from_bson(value).map(Some),
        }
    }
}

pub mod datetime {
    use super::*;

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            return value.serialize(serializer);
        }
        BsonDateTime::from_millis(value.timestamp_millis()).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        datetime_from_bson(Bson::deserialize(deserializer)?)
    }
}

/// Pair with `#[serde(default)]` so a missing field reads as `None`.
pub mod optional_datetime {
    use super::*;

    pub fn serialize<S: Serializer>(
        value: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(value) => datetime::serialize(value, serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        match Option::<Bson>::deserialize(deserializer)? {
            None | Some(Bson::Null) => Ok(None),
            Some(value) => datetime_from_bson(value).map(Some),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::{doc, from_document, to_raw_document_buf};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Row {
        #[serde(with = "hex_id")]
        id: String,
        #[serde(with = "optional_hex_id", default)]
        owner: Option<String>,
        #[serde(with = "datetime")]
        at: DateTime<Utc>,
        #[serde(with = "optional_datetime", default)]
        seen: Option<DateTime<Utc>>,
    }

    #[test]
    fn driver_encoding_uses_native_types() {
        let oid = ObjectId::new();
        let row = Row {
            id: oid.to_hex(),
            owner: None,
            at: Utc::now(),
            seen: None,
        };
        let stored = to_raw_document_buf(&row).unwrap().to_document().unwrap();
        assert_eq!(stored.get("id"), Some(&Bson::ObjectId(oid)));
        assert!(matches!(stored.get("at"), Some(Bson::DateTime(_))));
        assert_eq!(stored.get("owner"), Some(&Bson::Null));
    }

    #[test]
    fn json_encoding_uses_strings() {
        let row = Row {
            id: "64b7f0c2a1b2c3d4e5f60718".to_string(),
            owner: Some("64b7f0c2a1b2c3d4e5f60719".to_string()),
            at: "2024-03-01T10:00:00.500Z".parse().unwrap(),
            seen: None,
        };
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["id"], "64b7f0c2a1b2c3d4e5f60718");
        assert_eq!(json["owner"], "64b7f0c2a1b2c3d4e5f60719");
        assert_eq!(json["at"], "2024-03-01T10:00:00.500Z");
        let back: Row = serde_json::from_value(json).unwrap();
        assert_eq!(back, row);
    }

    #[test]
    fn reads_both_native_and_string_shapes() {
        let oid = ObjectId::new();
        let native: Row = from_document(doc! {
            "id": oid,
            "owner": oid,
            "at": BsonDateTime::from_millis(1_700_000_000_123),
        })
        .unwrap();
        assert_eq!(native.id, oid.to_hex());
        assert_eq!(native.owner, Some(oid.to_hex()));
        assert_eq!(native.at.timestamp_millis(), 1_700_000_000_123);
        assert_eq!(native.seen, None);

        let legacy: Row = from_document(doc! {
            "id": oid.to_hex(),
            "at": "2024-03-01T10:00:00Z",
            "seen": "2024-03-01T11:00:00Z",
        })
        .unwrap();
        assert_eq!(legacy.id, oid.to_hex());
        assert!(legacy.seen.is_some());
    }

    #[test]
    fn malformed_filter_ids_stay_strings() {
        assert_eq!(id_bson("not-an-id"), Bson::String("not-an-id".to_string()));
        assert!(matches!(id_bson("64b7f0c2a1b2c3d4e5f60718"), Bson::ObjectId(_)));
    }
}
