//! The backend boolean query tree we emit.
//!
//! These types serialize to the backend's native query DSL; they are the
//! compile target of the filter compiler, never deserialized.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryNode {
    Bool(Box<BoolNode>),
    Term(HashMap<String, Value>),
    Range(HashMap<String, RangeClause>),
    Regexp(HashMap<String, String>),
    SimpleQueryString(SimpleQueryString),
    GeoBoundingBox(HashMap<String, GeoBoundingBox>),
    GeoPolygon(HashMap<String, GeoPolygonPoints>),
    GeoShape(HashMap<String, GeoShapeClause>),
}

impl QueryNode {
    pub fn term(field: impl Into<String>, value: impl Into<Value>) -> Self {
        QueryNode::Term(single(field, value.into()))
    }

    pub fn range(field: impl Into<String>, clause: RangeClause) -> Self {
        QueryNode::Range(single(field, clause))
    }

    pub fn regexp(field: impl Into<String>, pattern: impl Into<String>) -> Self {
        QueryNode::Regexp(single(field, pattern.into()))
    }

    pub fn geo_bounding_box(field: impl Into<String>, boxed: GeoBoundingBox) -> Self {
        QueryNode::GeoBoundingBox(single(field, boxed))
    }

    pub fn geo_polygon(field: impl Into<String>, points: Vec<LatLon>) -> Self {
        QueryNode::GeoPolygon(single(field, GeoPolygonPoints { points }))
    }

    pub fn geo_shape(field: impl Into<String>, clause: GeoShapeClause) -> Self {
        QueryNode::GeoShape(single(field, clause))
    }

    /// OR-combine: one node passes through, several become a `should` group
    /// requiring at least one match.
    pub fn any_of(mut nodes: Vec<QueryNode>) -> Self {
        if nodes.len() == 1 {
            nodes.remove(0)
        } else {
            QueryNode::Bool(Box::new(BoolNode {
                should: nodes,
                minimum_should_match: Some(1),
                ..BoolNode::default()
            }))
        }
    }

    /// Negate as a single entity.
    pub fn negate(node: QueryNode) -> Self {
        QueryNode::Bool(Box::new(BoolNode {
            must_not: vec![node],
            ..BoolNode::default()
        }))
    }
}

fn single<V>(field: impl Into<String>, value: V) -> HashMap<String, V> {
    let mut map = HashMap::with_capacity(1);
    map.insert(field.into(), value);
    map
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BoolNode {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub must: Vec<QueryNode>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub filter: Vec<QueryNode>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub should: Vec<QueryNode>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub must_not: Vec<QueryNode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum_should_match: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RangeClause {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gt: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gte: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lt: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lte: Option<Value>,
    /// Pinned to `epoch_millis` on the designated timestamp field.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SimpleQueryString {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<String>>,
    pub default_operator: String,
}

impl SimpleQueryString {
    pub fn new(query: impl Into<String>, fields: Option<Vec<String>>) -> Self {
        Self {
            query: query.into(),
            fields,
            default_operator: "AND".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct GeoBoundingBox {
    pub top_left: LatLon,
    pub bottom_right: LatLon,
}

#[derive(Debug, Clone, Serialize)]
pub struct GeoPolygonPoints {
    pub points: Vec<LatLon>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SpatialRelation {
    Within,
    Intersects,
}

#[derive(Debug, Clone, Serialize)]
pub struct GeoShapeClause {
    pub shape: geojson::Geometry,
    pub relation: SpatialRelation,
}

/// `_source` projection of the search body and of top-hits sub-aggregations.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SourceFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub includes: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excludes: Option<Vec<String>>,
}

/// The complete search request body posted to the backend: the compiled
/// boolean tree, paging/sort, projection and the aggregation tree.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<QueryNode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_after: Option<Vec<Value>>,
    #[serde(rename = "_source", skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceFilter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggs: Option<HashMap<String, super::aggs::AggNode>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub track_total_hits: Option<bool>,
}
