//! Plain search hit mapping and hypermedia paging links.

use serde_json::Value;

use crate::collection::CollectionReference;
use crate::compile::sort::sort_includes_id;
use crate::dsl::response::RawSearchResponse;
use crate::model::request::Page;
use crate::model::response::{PageLinks, SearchHit, SearchResponse};

use super::json_path;

/// Maps the backend hits to the response model. `reversed` comes from the
/// compiled page: a `before` page arrives in flipped order and is put back.
pub fn format_hits(
    raw: RawSearchResponse,
    page: &Page,
    collection: &CollectionReference,
    reversed: bool,
) -> SearchResponse {
    let mut hits: Vec<SearchHit> = raw
        .hits
        .hits
        .into_iter()
        .map(|hit| {
            let id = hit.id.or_else(|| {
                json_path(&hit.source, &collection.params.id_path)
                    .map(value_label)
            });
            SearchHit {
                id,
                source: hit.source,
                sort_values: hit.sort,
            }
        })
        .collect();
    if reversed {
        hits.reverse();
    }

    let links = page_links(page, collection, &hits);
    SearchResponse {
        total: raw.hits.total.value,
        hits,
        links,
    }
}

/// `next`/`previous` cursors are only emitted when the sort order is
/// unambiguous (an explicit cursor was supplied, or the sort includes the
/// unique id field) and the returned page is full-sized.
fn page_links(
    page: &Page,
    collection: &CollectionReference,
    hits: &[SearchHit],
) -> Option<PageLinks> {
    let unambiguous = page.after.is_some()
        || page.before.is_some()
        || sort_includes_id(page.sort.as_deref(), collection);
    if !unambiguous || hits.len() != page.size {
        return None;
    }

    let first = hits.first()?;
    let last = hits.last()?;
    if first.sort_values.is_empty() || last.sort_values.is_empty() {
        return None;
    }
    Some(PageLinks {
        next: Some(cursor_of(&last.sort_values)),
        previous: Some(cursor_of(&first.sort_values)),
    })
}

/// A cursor is the comma-joined sort-value tuple of a boundary hit.
fn cursor_of(sort_values: &[Value]) -> String {
    sort_values
        .iter()
        .map(value_label)
        .collect::<Vec<_>>()
        .join(",")
}

fn value_label(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
