pub mod aggregation;
pub mod filter;
pub mod request;
pub mod response;

pub use aggregation::{
    AggregatedGeometry, AggregationKind, AggregationLevel, DateUnit, HitsFetcher, Interval,
    Metric, MetricFunction, Order, OrderOn, RawGeometry,
};
pub use filter::{FilterExpression, FilterOperator, MultiValueFilter, RangeInterval};
pub use request::{AggregationRequest, FilterSpec, Page, Projection, SearchRequest};
pub use response::{
    AggregationMetric, AggregationResponse, AggregationsResponse, PageLinks, ReturnedGeometry,
    SearchHit, SearchResponse,
};
