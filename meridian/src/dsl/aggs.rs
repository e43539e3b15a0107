//! The backend aggregation tree we emit.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;

use super::query::SourceFilter;

/// One named backend aggregation with its nested sub-aggregations.
#[derive(Debug, Clone, Serialize)]
pub struct AggNode {
    #[serde(flatten)]
    pub body: AggBody,
    #[serde(rename = "aggs", skip_serializing_if = "HashMap::is_empty")]
    pub subs: HashMap<String, AggNode>,
}

impl AggNode {
    pub fn new(body: AggBody) -> Self {
        Self {
            body,
            subs: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AggBody {
    DateHistogram(DateHistogramAgg),
    Histogram(HistogramAgg),
    Terms(TermsAgg),
    GeohashGrid(GridAgg),
    GeotileGrid(GridAgg),
    GeohexGrid(GridAgg),
    Avg(FieldAgg),
    Min(FieldAgg),
    Max(FieldAgg),
    Sum(FieldAgg),
    Cardinality(FieldAgg),
    GeoBounds(FieldAgg),
    GeoCentroid(FieldAgg),
    TopHits(TopHitsAgg),
}

#[derive(Debug, Clone, Serialize)]
pub struct DateHistogramAgg {
    pub field: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calendar_interval: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fixed_interval: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HistogramAgg {
    pub field: String,
    pub interval: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TermsAgg {
    pub field: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<Value>,
}

/// geohash / geotile / geohex grid over a point field.
#[derive(Debug, Clone, Serialize)]
pub struct GridAgg {
    pub field: String,
    pub precision: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FieldAgg {
    pub field: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TopHitsAgg {
    pub size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<Vec<Value>>,
    #[serde(rename = "_source", skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceFilter>,
}
