//! Sort and pagination compilation.
//!
//! The sort spec is a comma-separated signed field list; a token containing a
//! space is a `"<lat> <lon>"` anchor and becomes a planar geo-distance sort
//! on the collection's centroid field. Cursor paging (`after`/`before`)
//! compiles to `search_after`; `before` flips every sort direction and the
//! caller un-reverses the returned page.

use serde_json::{Map, Value};

use crate::collection::CollectionReference;
use crate::error::{Error, Result};
use crate::model::request::Page;

/// A page spec compiled to backend paging parameters.
#[derive(Debug, Clone)]
pub struct CompiledPage {
    pub size: usize,
    pub from: Option<usize>,
    pub sort: Option<Vec<Value>>,
    pub search_after: Option<Vec<Value>>,
    /// The page was requested with `before`: hits come back in flipped order.
    pub reversed: bool,
}

/// Plain signed field list (no geo tokens), shared with the top-hits
/// sub-aggregations of the pipeline builder.
pub(crate) fn signed_sort_entries(spec: &str) -> Vec<Value> {
    spec.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(|token| {
            let (field, direction) = split_signed(token);
            field_sort_entry(field, direction)
        })
        .collect()
}

fn split_signed(token: &str) -> (&str, &str) {
    match token.strip_prefix('-') {
        Some(field) => (field, "desc"),
        None => (token.strip_prefix('+').unwrap_or(token), "asc"),
    }
}

fn field_sort_entry(field: &str, direction: &str) -> Value {
    let mut order = Map::new();
    order.insert("order".to_string(), Value::from(direction));
    let mut entry = Map::new();
    entry.insert(field.to_string(), Value::Object(order));
    Value::Object(entry)
}

/// Compiles the request sort spec, including geo-distance anchors.
pub fn compile_sort(spec: &str, collection: &CollectionReference) -> Result<Vec<Value>> {
    let mut entries = Vec::new();
    for token in spec.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        // A space marks a "<lat> <lon>" anchor; the signs there belong to the
        // coordinates, so no descending prefix applies.
        if token.contains(' ') {
            entries.push(geo_distance_entry(token, collection)?);
        } else {
            let (field, direction) = split_signed(token);
            if field.is_empty() {
                return Err(Error::InvalidParameter(format!(
                    "empty field in sort spec '{spec}'"
                )));
            }
            entries.push(field_sort_entry(field, direction));
        }
    }
    Ok(entries)
}

fn geo_distance_entry(token: &str, collection: &CollectionReference) -> Result<Value> {
    let invalid = || {
        Error::InvalidParameter(format!(
            "geo-distance sort must be '<lat> <lon>', got '{token}'"
        ))
    };
    let (lat_s, lon_s) = token.split_once(' ').ok_or_else(invalid)?;
    let lat: f64 = lat_s.trim().parse().map_err(|_| invalid())?;
    let lon: f64 = lon_s.trim().parse().map_err(|_| invalid())?;
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        return Err(Error::InvalidParameter(format!(
            "geo-distance anchor ({lat}, {lon}) is out of range"
        )));
    }

    let mut anchor = Map::new();
    anchor.insert("lat".to_string(), Value::from(lat));
    anchor.insert("lon".to_string(), Value::from(lon));

    let mut body = Map::new();
    body.insert(
        collection.params.centroid_path.clone(),
        Value::Object(anchor),
    );
    body.insert("order".to_string(), Value::from("asc"));
    body.insert("distance_type".to_string(), Value::from("plane"));

    let mut entry = Map::new();
    entry.insert("_geo_distance".to_string(), Value::Object(body));
    Ok(Value::Object(entry))
}

/// Compiles size/from/cursor paging against the compiled sort.
pub fn compile_page(page: &Page, collection: &CollectionReference) -> Result<CompiledPage> {
    if page.size == 0 {
        return Err(Error::InvalidParameter(
            "page size must be at least 1".to_string(),
        ));
    }
    if page.after.is_some() && page.before.is_some() {
        return Err(Error::InvalidParameter(
            "after and before are mutually exclusive".to_string(),
        ));
    }

    let sort = match page.sort.as_deref() {
        Some(spec) => compile_sort(spec, collection)?,
        None => Vec::new(),
    };

    let cursor = page.after.as_deref().or(page.before.as_deref());
    if cursor.is_some() {
        if page.from != 0 {
            return Err(Error::InvalidParameter(
                "from must be 0 when paging with a cursor".to_string(),
            ));
        }
        // The cursor tuple is only total when the sort ends on the unique id.
        if !sort_ends_with_id(page.sort.as_deref(), collection) {
            return Err(Error::InvalidParameter(format!(
                "cursor paging requires the sort to end on '{}'",
                collection.params.id_path
            )));
        }
    }

    let reversed = page.before.is_some();
    let sort = if reversed { reverse_entries(sort) } else { sort };

    Ok(CompiledPage {
        size: page.size,
        from: if page.from > 0 { Some(page.from) } else { None },
        sort: if sort.is_empty() { None } else { Some(sort) },
        search_after: cursor.map(cursor_values),
        reversed,
    })
}

/// Whether the sort spec mentions the collection id at all (makes the order
/// unambiguous, allowing page links without an explicit cursor).
pub fn sort_includes_id(sort: Option<&str>, collection: &CollectionReference) -> bool {
    sort.is_some_and(|spec| {
        spec.split(',')
            .map(str::trim)
            .any(|t| split_signed(t).0 == collection.params.id_path)
    })
}

fn sort_ends_with_id(sort: Option<&str>, collection: &CollectionReference) -> bool {
    sort.and_then(|spec| spec.split(',').map(str::trim).filter(|t| !t.is_empty()).last())
        .is_some_and(|t| split_signed(t).0 == collection.params.id_path)
}

/// A cursor is the comma-joined sort-value tuple of a boundary hit.
fn cursor_values(cursor: &str) -> Vec<Value> {
    cursor
        .split(',')
        .map(|v| {
            let v = v.trim();
            if let Ok(n) = v.parse::<i64>() {
                Value::from(n)
            } else if let Ok(f) = v.parse::<f64>() {
                Value::from(f)
            } else {
                Value::from(v)
            }
        })
        .collect()
}

fn reverse_entries(entries: Vec<Value>) -> Vec<Value> {
    entries
        .into_iter()
        .map(|mut entry| {
            if let Value::Object(map) = &mut entry {
                for body in map.values_mut() {
                    if let Value::Object(body) = body {
                        if let Some(order) = body.get_mut("order") {
                            let flipped = if order == "asc" { "desc" } else { "asc" };
                            *order = Value::from(flipped);
                        }
                    }
                }
            }
            entry
        })
        .collect()
}
