//! Request compilation: filters, aggregation pipelines, sort and paging.

pub mod aggregation;
pub mod filter;
pub mod sort;

pub use aggregation::{
    build as build_aggregations, metric_name, AggregationPlan, LevelPlan, SubAggEntry, SubAggRole,
};
pub use filter::FilterCompiler;
pub use sort::{compile_page, compile_sort, sort_includes_id, CompiledPage};
