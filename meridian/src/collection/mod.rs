//! Collection references: the field catalogue and designated field roles.
//!
//! A [`CollectionReference`] is the read-only description of one indexed
//! document collection. Compilers borrow it to resolve field types and the
//! designated paths (id, timestamp, centroid, geometry); they never mutate it,
//! so one reference can serve any number of concurrent requests.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{Error, Result};

/// Backend mapping type of an indexed field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Keyword,
    Text,
    Long,
    Double,
    Boolean,
    Date,
    GeoPoint,
    GeoShape,
    Object,
}

impl FieldType {
    pub fn is_numeric(&self) -> bool {
        matches!(self, FieldType::Long | FieldType::Double)
    }

    pub fn is_geo(&self) -> bool {
        matches!(self, FieldType::GeoPoint | FieldType::GeoShape)
    }
}

/// Designated field roles and the flat field-type map of a collection.
///
/// `fields` is keyed by dot-path (`"track.location"`), the same flattening the
/// backend mapping uses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionParams {
    /// Unique document id field.
    pub id_path: String,
    /// Default temporal field for date histograms and timestamp filters.
    pub timestamp_path: String,
    /// Default point field for geo-distance sorts and aggregated geometries.
    pub centroid_path: String,
    /// Default shape field for raw-geometry fallbacks.
    pub geometry_path: String,
    pub fields: HashMap<String, FieldType>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionReference {
    pub collection_name: String,
    /// Name of the backend index the collection maps to.
    pub index_name: String,
    pub params: CollectionParams,
}

impl CollectionReference {
    /// Resolve the declared type of a dot-path field.
    pub fn field_type(&self, path: &str) -> Result<FieldType> {
        self.params
            .fields
            .get(path)
            .copied()
            .ok_or_else(|| Error::FieldNotFound(path.to_string()))
    }

    /// Whether `path` is the designated timestamp field of the collection.
    pub fn is_timestamp(&self, path: &str) -> bool {
        self.params.timestamp_path == path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference() -> CollectionReference {
        let mut fields = HashMap::new();
        fields.insert("startdate".to_string(), FieldType::Date);
        fields.insert("track".to_string(), FieldType::Object);
        fields.insert("track.location".to_string(), FieldType::GeoPoint);
        CollectionReference {
            collection_name: "ships".to_string(),
            index_name: "ships_v1".to_string(),
            params: CollectionParams {
                id_path: "id".to_string(),
                timestamp_path: "startdate".to_string(),
                centroid_path: "track.location".to_string(),
                geometry_path: "track.geometry".to_string(),
                fields,
            },
        }
    }

    #[test]
    fn test_field_type_lookup() {
        let r = reference();
        assert_eq!(r.field_type("startdate").unwrap(), FieldType::Date);
        assert_eq!(r.field_type("track.location").unwrap(), FieldType::GeoPoint);
    }

    #[test]
    fn test_unknown_field_is_not_found() {
        let r = reference();
        assert!(matches!(
            r.field_type("nope"),
            Err(Error::FieldNotFound(f)) if f == "nope"
        ));
    }

    #[test]
    fn test_timestamp_role() {
        let r = reference();
        assert!(r.is_timestamp("startdate"));
        assert!(!r.is_timestamp("track"));
    }

    #[test]
    fn test_field_type_predicates() {
        assert!(FieldType::Long.is_numeric());
        assert!(!FieldType::Keyword.is_numeric());
        assert!(FieldType::GeoShape.is_geo());
        assert!(!FieldType::Date.is_geo());
    }
}
