//! The raw backend search response we consume.
//!
//! Hits are typed; aggregation sub-trees stay as raw JSON because their shape
//! depends on the aggregation plan — the formatter deserializes each named
//! sub-result according to the role recorded at build time.

use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Deserialize)]
pub struct RawSearchResponse {
    #[serde(default)]
    pub took: u64,
    #[serde(default)]
    pub timed_out: bool,
    pub hits: RawHits,
    #[serde(default)]
    pub aggregations: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawHits {
    #[serde(default)]
    pub total: RawTotal,
    #[serde(default)]
    pub hits: Vec<RawHit>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawTotal {
    #[serde(default)]
    pub value: u64,
    #[serde(default)]
    pub relation: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawHit {
    #[serde(rename = "_id", default)]
    pub id: Option<String>,
    #[serde(rename = "_source", default)]
    pub source: Value,
    #[serde(default)]
    pub sort: Vec<Value>,
}

/// One level of a bucketed aggregation result.
#[derive(Debug, Clone, Deserialize)]
pub struct RawBucketList {
    #[serde(default)]
    pub buckets: Vec<RawBucket>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawBucket {
    pub key: Value,
    #[serde(default)]
    pub key_as_string: Option<String>,
    #[serde(default)]
    pub doc_count: u64,
    /// Named sub-aggregation results, kept raw.
    #[serde(flatten)]
    pub subs: Map<String, Value>,
}

/// Scalar metric result (`avg`, `min`, `max`, `sum`, `cardinality`).
#[derive(Debug, Clone, Deserialize)]
pub struct RawMetricValue {
    #[serde(default)]
    pub value: Option<Value>,
    /// Some backends add a formatted rendering next to the value.
    #[serde(default)]
    pub value_as_string: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RawLatLon {
    pub lat: f64,
    pub lon: f64,
}

/// `geo_bounds` result.
#[derive(Debug, Clone, Deserialize)]
pub struct RawGeoBounds {
    #[serde(default)]
    pub bounds: Option<RawBounds>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RawBounds {
    pub top_left: RawLatLon,
    pub bottom_right: RawLatLon,
}

/// `geo_centroid` result.
#[derive(Debug, Clone, Deserialize)]
pub struct RawGeoCentroid {
    #[serde(default)]
    pub location: Option<RawLatLon>,
}

/// `top_hits` result.
#[derive(Debug, Clone, Deserialize)]
pub struct RawTopHits {
    pub hits: RawHits,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_response_with_aggregations() {
        let r: RawSearchResponse = serde_json::from_value(json!({
            "took": 3,
            "timed_out": false,
            "hits": {"total": {"value": 42, "relation": "eq"}, "hits": []},
            "aggregations": {"term_0": {"buckets": []}}
        }))
        .unwrap();
        assert_eq!(r.hits.total.value, 42);
        assert!(r.aggregations.unwrap().contains_key("term_0"));
    }

    #[test]
    fn test_deserialize_bucket_with_flattened_subs() {
        let b: RawBucket = serde_json::from_value(json!({
            "key": "cargo",
            "doc_count": 7,
            "avg:speed": {"value": 12.5}
        }))
        .unwrap();
        assert_eq!(b.doc_count, 7);
        let m: RawMetricValue = serde_json::from_value(b.subs["avg:speed"].clone()).unwrap();
        assert_eq!(m.value, Some(json!(12.5)));
    }

    #[test]
    fn test_deserialize_hit_defaults() {
        let h: RawHit = serde_json::from_value(json!({"_id": "a1"})).unwrap();
        assert_eq!(h.id.as_deref(), Some("a1"));
        assert!(h.source.is_null());
        assert!(h.sort.is_empty());
    }

    #[test]
    fn test_deserialize_geo_bounds() {
        let g: RawGeoBounds = serde_json::from_value(json!({
            "bounds": {
                "top_left": {"lat": 10.0, "lon": -5.0},
                "bottom_right": {"lat": -10.0, "lon": 5.0}
            }
        }))
        .unwrap();
        let b = g.bounds.unwrap();
        assert_eq!(b.top_left.lat, 10.0);
        assert_eq!(b.bottom_right.lon, 5.0);
    }

    #[test]
    fn test_empty_bucket_list_is_valid() {
        let l: RawBucketList = serde_json::from_value(json!({"buckets": []})).unwrap();
        assert!(l.buckets.is_empty());
    }
}
