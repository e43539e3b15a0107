//! The backend's wire vocabulary: the query and aggregation trees we emit
//! and the raw result structures we consume.

pub mod aggs;
pub mod query;
pub mod response;

pub use aggs::{
    AggBody, AggNode, DateHistogramAgg, FieldAgg, GridAgg, HistogramAgg, TermsAgg, TopHitsAgg,
};
pub use query::{
    BoolNode, GeoBoundingBox, GeoPolygonPoints, GeoShapeClause, LatLon, QueryNode, RangeClause,
    SearchBody, SimpleQueryString, SourceFilter, SpatialRelation,
};
pub use response::{
    RawBucket, RawBucketList, RawGeoBounds, RawGeoCentroid, RawHit, RawHits, RawLatLon,
    RawMetricValue, RawSearchResponse, RawTopHits, RawTotal,
};
