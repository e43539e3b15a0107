//! Result formatting: backend result trees → response model.

pub mod aggregation;
pub mod hits;

pub use aggregation::format_aggregations;
pub use hits::format_hits;

use serde_json::Value;

/// Resolves a dot-path inside a source document.
pub(crate) fn json_path<'a>(source: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = source;
    for segment in path.split('.') {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}
