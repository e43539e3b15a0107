//! The aggregation result formatter: backend bucket tree → hierarchical
//! response model.
//!
//! The walk is recursive over the pipeline depth. Sub-aggregation results are
//! dispatched through the roles the pipeline builder recorded, so nothing is
//! inferred from result names at this point.

use chrono::{DateTime, NaiveDateTime};
use geo_types::{Geometry, Point};
use serde_json::{Map, Value};

use crate::collection::CollectionReference;
use crate::compile::aggregation::{AggregationPlan, SubAggRole};
use crate::dsl::response::{
    RawBucket, RawBucketList, RawGeoBounds, RawGeoCentroid, RawMetricValue, RawTopHits,
};
use crate::error::{Error, Result};
use crate::geo::{
    geohash_center, geohash_polygon, h3_center, h3_polygon, parse_tile_key, parse_wkt, tile_bbox,
    tile_center, BoundingBox, RingOrientation,
};
use crate::model::aggregation::{AggregatedGeometry, AggregationKind, MetricFunction};
use crate::model::response::{AggregationMetric, AggregationResponse, ReturnedGeometry};

use super::json_path;

/// Formats the backend's aggregation section against the built plan.
///
/// An absent section or an empty bucket list at any depth is a valid empty
/// outcome, never an error.
pub fn format_aggregations(
    raw: Option<&Map<String, Value>>,
    plan: &AggregationPlan,
    collection: &CollectionReference,
) -> Result<Vec<AggregationResponse>> {
    match raw {
        Some(container) => format_level(container, plan, 0, collection),
        None => Ok(Vec::new()),
    }
}

fn format_level(
    container: &Map<String, Value>,
    plan: &AggregationPlan,
    depth: usize,
    collection: &CollectionReference,
) -> Result<Vec<AggregationResponse>> {
    let Some(level_plan) = plan.levels.get(depth) else {
        return Ok(Vec::new());
    };
    let Some(value) = container.get(&level_plan.name) else {
        return Ok(Vec::new());
    };
    let list: RawBucketList = serde_json::from_value(value.clone())?;
    list.buckets
        .iter()
        .map(|bucket| format_bucket(bucket, plan, depth, collection))
        .collect()
}

fn format_bucket(
    bucket: &RawBucket,
    plan: &AggregationPlan,
    depth: usize,
    collection: &CollectionReference,
) -> Result<AggregationResponse> {
    let level_plan = &plan.levels[depth];
    let kind = level_plan.level.kind;

    let mut response = AggregationResponse {
        key: bucket.key.clone(),
        key_as_string: bucket.key_as_string.clone(),
        count: bucket.doc_count,
        metrics: Vec::new(),
        geometries: Vec::new(),
        hits: Vec::new(),
        elements: Vec::new(),
    };

    match kind {
        // Response keys are always UTC epoch millis, whatever calendar
        // representation the backend used.
        AggregationKind::Datehistogram => {
            response.key =
                Value::from(normalize_date_key(&bucket.key, bucket.key_as_string.as_deref())?);
        }
        AggregationKind::Geohash | AggregationKind::Geotile | AggregationKind::H3 => {
            let cell_key = cell_key(bucket)?;
            let center = cell_center(kind, &cell_key)?;
            response.key = lat_lon_value(center.y(), center.x());
            response.key_as_string = Some(cell_key.clone());

            for geometry in &level_plan.level.aggregated_geometries {
                match geometry {
                    AggregatedGeometry::Cell => {
                        response.geometries.push(ReturnedGeometry {
                            reference: geometry.as_str().to_string(),
                            is_raw: false,
                            sort: None,
                            geometry: to_geojson(&Geometry::Polygon(cell_polygon(
                                kind, &cell_key,
                            )?)),
                        });
                    }
                    AggregatedGeometry::CellCenter => {
                        response.geometries.push(ReturnedGeometry {
                            reference: geometry.as_str().to_string(),
                            is_raw: false,
                            sort: None,
                            geometry: to_geojson(&Geometry::Point(center)),
                        });
                    }
                    // Fetched through sub-aggregations, handled below.
                    AggregatedGeometry::Bbox | AggregatedGeometry::Centroid => {}
                }
            }
        }
        AggregationKind::Histogram | AggregationKind::Term => {}
    }

    for entry in &level_plan.subs {
        let Some(sub) = bucket.subs.get(&entry.name) else {
            continue;
        };
        match &entry.role {
            SubAggRole::SubLevel => {
                response.elements = format_level(&bucket.subs, plan, depth + 1, collection)?;
            }
            SubAggRole::Metric { fct, field } => {
                if fct.is_geo() {
                    if let Some(geometry) = geo_result_geometry(*fct, sub)? {
                        response.geometries.push(ReturnedGeometry {
                            reference: entry.name.clone(),
                            is_raw: false,
                            sort: None,
                            geometry,
                        });
                    }
                } else {
                    let metric: RawMetricValue = serde_json::from_value(sub.clone())?;
                    response.metrics.push(AggregationMetric {
                        metric_type: fct.as_str().to_string(),
                        field: field.clone(),
                        value: metric.value.unwrap_or(Value::Null),
                    });
                }
            }
            SubAggRole::FetchedHits => {
                let top: RawTopHits = serde_json::from_value(sub.clone())?;
                response.hits = top.hits.hits.into_iter().map(|h| h.source).collect();
            }
            SubAggRole::RawGeometries { sort, paths } => {
                let top: RawTopHits = serde_json::from_value(sub.clone())?;
                if let Some(hit) = top.hits.hits.first() {
                    for path in paths {
                        // The named path may be absent from this document;
                        // fall back to the collection centroid.
                        let value = json_path(&hit.source, path)
                            .or_else(|| json_path(&hit.source, &collection.params.centroid_path));
                        let Some(value) = value else { continue };
                        if let Some(geometry) = geometry_from_source(value) {
                            response.geometries.push(ReturnedGeometry {
                                reference: path.clone(),
                                is_raw: true,
                                sort: (!sort.is_empty()).then(|| sort.clone()),
                                geometry,
                            });
                        }
                    }
                }
            }
            SubAggRole::AggregatedGeometry { kind } => {
                let fct = match kind {
                    AggregatedGeometry::Bbox => MetricFunction::Geobbox,
                    _ => MetricFunction::Geocentroid,
                };
                if let Some(geometry) = geo_result_geometry(fct, sub)? {
                    response.geometries.push(ReturnedGeometry {
                        reference: kind.as_str().to_string(),
                        is_raw: false,
                        sort: None,
                        geometry,
                    });
                }
            }
        }
    }

    Ok(response)
}

/// Numeric keys are already epoch millis; string labels are parsed with
/// their zone offset and converted.
fn normalize_date_key(key: &Value, key_as_string: Option<&str>) -> Result<i64> {
    if let Some(millis) = key.as_i64() {
        return Ok(millis);
    }
    if let Some(millis) = key.as_f64() {
        return Ok(millis as i64);
    }
    let label = key.as_str().or(key_as_string).ok_or_else(|| {
        Error::Backend(format!("date histogram bucket key is unreadable: {key}"))
    })?;
    if let Ok(dt) = DateTime::parse_from_rfc3339(label) {
        return Ok(dt.timestamp_millis());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(label, "%Y-%m-%dT%H:%M:%S%.3f") {
        return Ok(dt.and_utc().timestamp_millis());
    }
    Err(Error::Backend(format!(
        "date histogram bucket key '{label}' is not a recognized date"
    )))
}

fn cell_key(bucket: &RawBucket) -> Result<String> {
    bucket
        .key
        .as_str()
        .or(bucket.key_as_string.as_deref())
        .map(str::to_string)
        .ok_or_else(|| Error::Backend(format!("cell bucket key is unreadable: {}", bucket.key)))
}

fn cell_center(kind: AggregationKind, key: &str) -> Result<Point<f64>> {
    let coord = match kind {
        AggregationKind::Geohash => geohash_center(key)?,
        AggregationKind::Geotile => {
            let (z, x, y) = parse_tile_key(key)?;
            tile_center(z, x, y)
        }
        AggregationKind::H3 => h3_center(key)?,
        _ => {
            return Err(Error::Backend(format!(
                "{} buckets carry no cell key",
                kind.as_str()
            )))
        }
    };
    Ok(Point::from(coord))
}

fn cell_polygon(kind: AggregationKind, key: &str) -> Result<geo_types::Polygon<f64>> {
    match kind {
        AggregationKind::Geohash => geohash_polygon(key),
        AggregationKind::Geotile => {
            let (z, x, y) = parse_tile_key(key)?;
            Ok(tile_bbox(z, x, y).to_polygon(RingOrientation::CounterClockwise))
        }
        AggregationKind::H3 => h3_polygon(key),
        _ => Err(Error::Backend(format!(
            "{} buckets carry no cell key",
            kind.as_str()
        ))),
    }
}

fn geo_result_geometry(fct: MetricFunction, sub: &Value) -> Result<Option<geojson::Geometry>> {
    match fct {
        MetricFunction::Geobbox => {
            let bounds: RawGeoBounds = serde_json::from_value(sub.clone())?;
            Ok(bounds.bounds.map(|b| {
                let bbox = BoundingBox {
                    west: b.top_left.lon,
                    south: b.bottom_right.lat,
                    east: b.bottom_right.lon,
                    north: b.top_left.lat,
                };
                to_geojson(&Geometry::Polygon(
                    bbox.to_polygon(RingOrientation::CounterClockwise),
                ))
            }))
        }
        MetricFunction::Geocentroid => {
            let centroid: RawGeoCentroid = serde_json::from_value(sub.clone())?;
            Ok(centroid
                .location
                .map(|l| to_geojson(&Geometry::Point(Point::new(l.lon, l.lat)))))
        }
        _ => Ok(None),
    }
}

/// Interprets a geometry value read from a document source: GeoJSON object,
/// `[lon, lat]` array, `"lat,lon"` string or WKT string.
fn geometry_from_source(value: &Value) -> Option<geojson::Geometry> {
    match value {
        Value::Object(_) => serde_json::from_value(value.clone()).ok(),
        Value::Array(parts) if parts.len() == 2 => {
            let lon = parts[0].as_f64()?;
            let lat = parts[1].as_f64()?;
            Some(to_geojson(&Geometry::Point(Point::new(lon, lat))))
        }
        Value::String(s) => {
            if let Some((lat_s, lon_s)) = s.split_once(',') {
                if let (Ok(lat), Ok(lon)) =
                    (lat_s.trim().parse::<f64>(), lon_s.trim().parse::<f64>())
                {
                    return Some(to_geojson(&Geometry::Point(Point::new(lon, lat))));
                }
            }
            parse_wkt(s).ok().map(|g| to_geojson(&g))
        }
        _ => None,
    }
}

fn to_geojson(geometry: &Geometry<f64>) -> geojson::Geometry {
    geojson::Geometry::new(geojson::Value::from(geometry))
}

fn lat_lon_value(lat: f64, lon: f64) -> Value {
    let mut map = Map::new();
    map.insert("lat".to_string(), Value::from(lat));
    map.insert("lon".to_string(), Value::from(lon));
    Value::Object(map)
}
