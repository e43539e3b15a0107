use std::collections::HashMap;

use meridian::collection::{CollectionParams, CollectionReference, FieldType};

/// A vessel-tracking collection used across the integration tests.
pub fn ships_collection() -> CollectionReference {
    let mut fields = HashMap::new();
    fields.insert("id".to_string(), FieldType::Keyword);
    fields.insert("status".to_string(), FieldType::Keyword);
    fields.insert("name".to_string(), FieldType::Text);
    fields.insert("speed".to_string(), FieldType::Double);
    fields.insert("weight".to_string(), FieldType::Long);
    fields.insert("startdate".to_string(), FieldType::Date);
    fields.insert("enddate".to_string(), FieldType::Date);
    fields.insert("track".to_string(), FieldType::Object);
    fields.insert("track.location".to_string(), FieldType::GeoPoint);
    fields.insert("track.geometry".to_string(), FieldType::GeoShape);
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
