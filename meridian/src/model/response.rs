//! Response-side value objects: the hierarchical aggregation tree and plain
//! search hits. Built fresh per request from the backend result, never
//! persisted.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One metric value attached to a bucket, e.g.
/// `{"type": "avg", "field": "speed", "value": 12.4}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationMetric {
    #[serde(rename = "type")]
    pub metric_type: String,
    pub field: String,
    pub value: Value,
}

/// A geometry attached to a bucket: either computed/synthesized
/// (`is_raw: false`) or read verbatim from a representative document
/// (`is_raw: true`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnedGeometry {
    /// What the geometry answers: the aggregated-geometry name (`bbox`,
    /// `centroid`, `cell`, `cell_center`), a metric name, or the document
    /// path of a raw geometry.
    pub reference: String,
    pub is_raw: bool,
    /// The sort that selected the representative document (raw only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
    pub geometry: geojson::Geometry,
}

/// One bucket of the hierarchical aggregation response.
///
/// `key` is always a scalar or a `{lat, lon}` pair; `key_as_string` keeps the
/// raw backend label. Date-histogram keys are always UTC epoch milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregationResponse {
    pub key: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_as_string: Option<String>,
    pub count: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub metrics: Vec<AggregationMetric>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub geometries: Vec<ReturnedGeometry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hits: Vec<Value>,
    /// Buckets of the next pipeline level.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub elements: Vec<AggregationResponse>,
}

/// Root of an aggregating request's response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregationsResponse {
    /// Documents matched by the filter, across all buckets.
    pub total: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub elements: Vec<AggregationResponse>,
}

/// One document of a plain search response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub source: Value,
    /// Sort-value tuple of this hit, the raw material of paging cursors.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sort_values: Vec<Value>,
}

/// Cursors for the neighbouring pages, when the sort is unambiguous.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageLinks {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub total: u64,
    pub hits: Vec<SearchHit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub links: Option<PageLinks>,
}
