//! Request-side value objects. All of these are per-request values with no
//! shared state; the compilers consume them by reference.

use serde::{Deserialize, Serialize};

use super::aggregation::AggregationLevel;
use super::filter::{FilterExpression, MultiValueFilter};

/// The filter part of a request: AND of OR-groups, plus the full-text and
/// date/geometry interpretation hints that apply to the whole request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterSpec {
    /// Each entry is one OR-group; groups are ANDed together.
    #[serde(default)]
    pub f: Vec<MultiValueFilter<FilterExpression>>,
    /// Full-text search, either `text` over all fields or `field:text`.
    #[serde(default)]
    pub q: Option<String>,
    /// chrono format string applied to date literals in this request.
    #[serde(default)]
    pub dateformat: Option<String>,
    /// Emit polygon rings right-hand wound (clockwise exterior) instead of
    /// the default left-hand convention.
    #[serde(default)]
    pub righthand: bool,
}

fn default_size() -> usize {
    10
}

/// Offset or cursor paging plus the sort specification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    #[serde(default = "default_size")]
    pub size: usize,
    #[serde(default)]
    pub from: usize,
    /// Comma-separated signed field list; a token containing a space is a
    /// `"<lat> <lon>"` geo-distance anchor.
    #[serde(default)]
    pub sort: Option<String>,
    /// Cursor from a previous page's `next` link.
    #[serde(default)]
    pub after: Option<String>,
    /// Cursor from a previous page's `previous` link.
    #[serde(default)]
    pub before: Option<String>,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            size: default_size(),
            from: 0,
            sort: None,
            after: None,
            before: None,
        }
    }
}

/// Source projection: comma-separated include/exclude path lists.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Projection {
    #[serde(default)]
    pub includes: Option<String>,
    #[serde(default)]
    pub excludes: Option<String>,
}

/// A plain (non-aggregating) search request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub filter: FilterSpec,
    #[serde(default)]
    pub page: Page,
    #[serde(default)]
    pub projection: Projection,
}

/// An aggregating request: the same filter surface plus the level chain.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AggregationRequest {
    #[serde(default)]
    pub filter: FilterSpec,
    pub aggregations: Vec<AggregationLevel>,
}
