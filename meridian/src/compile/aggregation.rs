//! The aggregation pipeline builder: level chain → backend aggregation tree.
//!
//! The chain is folded from the tail backward, each step wrapping the
//! already-built inner tree, so the input list is never consumed or mutated.
//! Alongside the tree, every level records which role each of its named
//! sub-aggregations plays; the result formatter dispatches on those recorded
//! roles instead of re-deriving them from name strings.

use serde_json::Value;
use tracing::debug;

use crate::collection::{CollectionReference, FieldType};
use crate::dsl::aggs::{
    AggBody, AggNode, DateHistogramAgg, FieldAgg, GridAgg, HistogramAgg, TermsAgg, TopHitsAgg,
};
use crate::dsl::query::SourceFilter;
use crate::error::{Error, Result};
use crate::model::aggregation::{
    AggregatedGeometry, AggregationKind, AggregationLevel, Interval, Metric, MetricFunction,
    OrderOn,
};

use super::sort::signed_sort_entries;

/// Name of the per-bucket document-fetch sub-aggregation.
const FETCHED_HITS: &str = "fetched_hits";

/// What one named sub-aggregation of a level means to the formatter.
#[derive(Debug, Clone, PartialEq)]
pub enum SubAggRole {
    /// The next pipeline level.
    SubLevel,
    /// A scalar or geometry metric requested through `collect_field`/`collect_fct`.
    Metric {
        fct: MetricFunction,
        field: String,
    },
    /// Documents fetched per bucket.
    FetchedHits,
    /// Top-1 hit carrying raw geometry paths for one sort key.
    RawGeometries {
        sort: String,
        paths: Vec<String>,
    },
    /// A backend-computed bucket geometry (`bbox` / `centroid`).
    AggregatedGeometry {
        kind: AggregatedGeometry,
    },
}

#[derive(Debug, Clone)]
pub struct SubAggEntry {
    pub name: String,
    pub role: SubAggRole,
}

/// One level of the built pipeline: its backend aggregation name, the
/// original request level, and the roles of its sub-aggregations.
#[derive(Debug, Clone)]
pub struct LevelPlan {
    pub name: String,
    pub level: AggregationLevel,
    pub subs: Vec<SubAggEntry>,
}

/// The built pipeline: the tree to send and the per-level formatting plan.
#[derive(Debug, Clone)]
pub struct AggregationPlan {
    pub root_name: String,
    pub root: AggNode,
    pub levels: Vec<LevelPlan>,
}

/// Builds the backend aggregation tree for an ordered level chain.
pub fn build(
    levels: &[AggregationLevel],
    collection: &CollectionReference,
) -> Result<AggregationPlan> {
    let mut plans: Vec<LevelPlan> = Vec::with_capacity(levels.len());
    let mut inner: Option<AggNode> = None;

    for (idx, level) in levels.iter().enumerate().rev() {
        let (mut node, mut subs) = build_level(level, collection)?;
        if let Some(child) = inner.take() {
            let child_name = level_name(idx + 1, &levels[idx + 1]);
            node.subs.insert(child_name.clone(), child);
            subs.push(SubAggEntry {
                name: child_name,
                role: SubAggRole::SubLevel,
            });
        }
        plans.push(LevelPlan {
            name: level_name(idx, level),
            level: level.clone(),
            subs,
        });
        inner = Some(node);
    }

    let Some(root) = inner else {
        return Err(Error::InvalidParameter(
            "an aggregation request requires at least one level".to_string(),
        ));
    };
    plans.reverse();
    debug!(levels = plans.len(), "built aggregation pipeline");
    Ok(AggregationPlan {
        root_name: plans[0].name.clone(),
        root,
        levels: plans,
    })
}

/// Wire name of a metric sub-aggregation.
pub fn metric_name(metric: &Metric) -> String {
    format!("{}:{}", metric.collect_fct.as_str(), metric.collect_field)
}

fn level_name(idx: usize, level: &AggregationLevel) -> String {
    format!("{}_{idx}", level.kind.as_str())
}

fn build_level(
    level: &AggregationLevel,
    collection: &CollectionReference,
) -> Result<(AggNode, Vec<SubAggEntry>)> {
    let field = resolve_field(level, collection)?;
    let order = build_order(level)?;
    let size = check_size(level)?;

    if level.include.is_some() && level.kind != AggregationKind::Term {
        return Err(Error::NotImplemented(format!(
            "include is only implemented on term aggregations, not {}",
            level.kind.as_str()
        )));
    }
    if level.format.is_some() && level.kind != AggregationKind::Datehistogram {
        return Err(Error::NotAllowed(format!(
            "format applies to datehistogram aggregations only, not {}",
            level.kind.as_str()
        )));
    }

    let body = build_body(level, &field, order, size)?;
    let mut node = AggNode::new(body);
    let mut subs = Vec::new();

    attach_metrics(level, collection, &mut node, &mut subs)?;
    attach_aggregated_geometries(level, collection, &field, &mut node, &mut subs)?;
    attach_raw_geometries(level, collection, &mut node, &mut subs)?;
    attach_fetch_hits(level, &mut node, &mut subs)?;

    Ok((node, subs))
}

fn resolve_field(level: &AggregationLevel, collection: &CollectionReference) -> Result<String> {
    let field = match (&level.field, level.kind) {
        (Some(f), _) => f.clone(),
        // A histogram over time defaults to the collection's timestamp field.
        (None, AggregationKind::Datehistogram) => collection.params.timestamp_path.clone(),
        (None, kind) => {
            return Err(Error::InvalidParameter(format!(
                "{} aggregation requires a field",
                kind.as_str()
            )))
        }
    };
    let field_type = collection.field_type(&field)?;
    if level.kind.is_cell() && field_type != FieldType::GeoPoint {
        return Err(Error::NotAllowed(format!(
            "{} aggregation requires a point field, '{field}' is {field_type:?}",
            level.kind.as_str()
        )));
    }
    if level.kind == AggregationKind::Datehistogram && field_type != FieldType::Date {
        return Err(Error::NotAllowed(format!(
            "datehistogram aggregation requires a date field, '{field}' is {field_type:?}"
        )));
    }
    Ok(field)
}

/// `order`/`on` come as a pair and never on cell aggregations; ordering on
/// `result` needs a non-geometry metric to point at.
fn build_order(level: &AggregationLevel) -> Result<Option<Value>> {
    match (level.order, level.on) {
        (None, None) => Ok(None),
        (Some(_), None) | (None, Some(_)) => Err(Error::InvalidParameter(
            "order and on must be provided together".to_string(),
        )),
        (Some(order), Some(on)) => {
            if level.kind.is_cell() {
                return Err(Error::NotAllowed(format!(
                    "order/on is not allowed on {} aggregations",
                    level.kind.as_str()
                )));
            }
            let key = match on {
                OrderOn::Field => "_key".to_string(),
                OrderOn::Count => "_count".to_string(),
                OrderOn::Result => {
                    let metric = level
                        .metrics
                        .iter()
                        .find(|m| !m.collect_fct.is_geo())
                        .ok_or_else(|| {
                            Error::InvalidParameter(
                                "ordering on result requires a non-geometry metric".to_string(),
                            )
                        })?;
                    metric_name(metric)
                }
            };
            let mut entry = serde_json::Map::new();
            entry.insert(key, Value::from(order.as_str()));
            Ok(Some(Value::Object(entry)))
        }
    }
}

fn check_size(level: &AggregationLevel) -> Result<Option<u32>> {
    let Some(size) = level.size else {
        return Ok(None);
    };
    match level.kind {
        AggregationKind::Term | AggregationKind::H3 => Ok(Some(size)),
        kind if kind.is_grid() => Err(Error::NotImplemented(format!(
            "bucket size on {} aggregations",
            kind.as_str()
        ))),
        kind => Err(Error::NotAllowed(format!(
            "bucket size applies to term and h3 aggregations only, not {}",
            kind.as_str()
        ))),
    }
}

fn build_body(
    level: &AggregationLevel,
    field: &str,
    order: Option<Value>,
    size: Option<u32>,
) -> Result<AggBody> {
    match level.kind {
        AggregationKind::Datehistogram => {
            let Some(Interval::Date { value, unit }) = level.interval else {
                return Err(Error::InvalidParameter(
                    "datehistogram aggregation requires an interval with a date unit".to_string(),
                ));
            };
            let (calendar, fixed) = if unit.is_calendar() {
                if value != 1 {
                    return Err(Error::InvalidParameter(format!(
                        "calendar unit {unit:?} only supports an interval value of 1"
                    )));
                }
                (Some(format!("1{}", unit.suffix())), None)
            } else {
                (None, Some(format!("{value}{}", unit.suffix())))
            };
            Ok(AggBody::DateHistogram(DateHistogramAgg {
                field: field.to_string(),
                calendar_interval: calendar,
                fixed_interval: fixed,
                format: level.format.clone(),
                order,
            }))
        }
        AggregationKind::Histogram => {
            let Some(Interval::Numeric(interval)) = level.interval else {
                return Err(Error::InvalidParameter(
                    "histogram aggregation requires a numeric interval".to_string(),
                ));
            };
            Ok(AggBody::Histogram(HistogramAgg {
                field: field.to_string(),
                interval,
                order,
            }))
        }
        AggregationKind::Term => {
            if level.interval.is_some() {
                return Err(Error::NotAllowed(
                    "interval is not allowed on term aggregations".to_string(),
                ));
            }
            Ok(AggBody::Terms(TermsAgg {
                field: field.to_string(),
                size,
                include: level.include.clone(),
                order,
            }))
        }
        AggregationKind::Geohash | AggregationKind::Geotile | AggregationKind::H3 => {
            let Some(Interval::Precision(precision)) = level.interval else {
                return Err(Error::InvalidParameter(format!(
                    "{} aggregation requires a precision interval",
                    level.kind.as_str()
                )));
            };
            let range = match level.kind {
                AggregationKind::Geohash => 1..=12,
                AggregationKind::Geotile => 0..=29,
                _ => 0..=15,
            };
            if !range.contains(&precision) {
                return Err(Error::InvalidParameter(format!(
                    "{} precision {precision} is out of range {range:?}",
                    level.kind.as_str()
                )));
            }
            let grid = GridAgg {
                field: field.to_string(),
                precision,
                size,
            };
            Ok(match level.kind {
                AggregationKind::Geohash => AggBody::GeohashGrid(grid),
                AggregationKind::Geotile => AggBody::GeotileGrid(grid),
                _ => AggBody::GeohexGrid(grid),
            })
        }
    }
}

fn attach_metrics(
    level: &AggregationLevel,
    collection: &CollectionReference,
    node: &mut AggNode,
    subs: &mut Vec<SubAggEntry>,
) -> Result<()> {
    for metric in &level.metrics {
        let field_type = collection.field_type(&metric.collect_field)?;
        if metric.collect_fct.is_geo() && field_type != FieldType::GeoPoint {
            return Err(Error::NotAllowed(format!(
                "{} requires a point collect field, '{}' is {field_type:?}",
                metric.collect_fct.as_str(),
                metric.collect_field
            )));
        }
        if matches!(
            metric.collect_fct,
            MetricFunction::Avg | MetricFunction::Min | MetricFunction::Max | MetricFunction::Sum
        ) && !(field_type.is_numeric() || field_type == FieldType::Date)
        {
            return Err(Error::NotAllowed(format!(
                "{} requires a numeric collect field, '{}' is {field_type:?}",
                metric.collect_fct.as_str(),
                metric.collect_field
            )));
        }

        let agg_field = FieldAgg {
            field: metric.collect_field.clone(),
        };
        let body = match metric.collect_fct {
            MetricFunction::Avg => AggBody::Avg(agg_field),
            MetricFunction::Min => AggBody::Min(agg_field),
            MetricFunction::Max => AggBody::Max(agg_field),
            MetricFunction::Sum => AggBody::Sum(agg_field),
            MetricFunction::Cardinality => AggBody::Cardinality(agg_field),
            MetricFunction::Geocentroid => AggBody::GeoCentroid(agg_field),
            MetricFunction::Geobbox => AggBody::GeoBounds(agg_field),
        };
        let name = metric_name(metric);
        node.subs.insert(name.clone(), AggNode::new(body));
        subs.push(SubAggEntry {
            name,
            role: SubAggRole::Metric {
                fct: metric.collect_fct,
                field: metric.collect_field.clone(),
            },
        });
    }
    Ok(())
}

/// `bbox`/`centroid` fetch sub-aggregations. When the same computation was
/// already requested as an explicit metric, the existing sub-aggregation is
/// referenced instead of being attached twice.
fn attach_aggregated_geometries(
    level: &AggregationLevel,
    collection: &CollectionReference,
    group_field: &str,
    node: &mut AggNode,
    subs: &mut Vec<SubAggEntry>,
) -> Result<()> {
    let geo_field = if level.kind.is_cell() {
        group_field.to_string()
    } else {
        collection.params.centroid_path.clone()
    };

    for geometry in &level.aggregated_geometries {
        // Cell shapes are synthesized from the bucket key by the formatter,
        // no sub-aggregation needed.
        if geometry.is_cell() {
            if !level.kind.is_cell() {
                return Err(Error::NotAllowed(format!(
                    "{} geometries apply to geohash, geotile and h3 aggregations only",
                    geometry.as_str()
                )));
            }
            continue;
        }

        let (fct, body) = match geometry {
            AggregatedGeometry::Bbox => (
                MetricFunction::Geobbox,
                AggBody::GeoBounds(FieldAgg {
                    field: geo_field.clone(),
                }),
            ),
            _ => (
                MetricFunction::Geocentroid,
                AggBody::GeoCentroid(FieldAgg {
                    field: geo_field.clone(),
                }),
            ),
        };
        let name = format!("{}:{geo_field}", fct.as_str());
        if !node.subs.contains_key(&name) {
            node.subs.insert(name.clone(), AggNode::new(body));
        }
        subs.push(SubAggEntry {
            name,
            role: SubAggRole::AggregatedGeometry { kind: *geometry },
        });
    }
    Ok(())
}

/// One top-1-hit sub-aggregation per distinct raw-geometry sort key, fetching
/// only the geometry paths requested under that sort (plus the centroid path
/// used as the absent-path fallback).
fn attach_raw_geometries(
    level: &AggregationLevel,
    collection: &CollectionReference,
    node: &mut AggNode,
    subs: &mut Vec<SubAggEntry>,
) -> Result<()> {
    let mut groups: Vec<(String, Vec<String>)> = Vec::new();
    for raw in &level.raw_geometries {
        collection.field_type(&raw.geometry_path)?;
        match groups.iter_mut().find(|(sort, _)| *sort == raw.sort) {
            Some((_, paths)) => {
                if !paths.contains(&raw.geometry_path) {
                    paths.push(raw.geometry_path.clone());
                }
            }
            None => groups.push((raw.sort.clone(), vec![raw.geometry_path.clone()])),
        }
    }

    for (idx, (sort, paths)) in groups.into_iter().enumerate() {
        let name = format!("rawgeom_{idx}");
        let mut includes = paths.clone();
        if !includes.contains(&collection.params.centroid_path) {
            includes.push(collection.params.centroid_path.clone());
        }
        let sort_entries = if sort.is_empty() {
            None
        } else {
            Some(signed_sort_entries(&sort))
        };
        node.subs.insert(
            name.clone(),
            AggNode::new(AggBody::TopHits(TopHitsAgg {
                size: 1,
                sort: sort_entries,
                source: Some(SourceFilter {
                    includes: Some(includes),
                    excludes: None,
                }),
            })),
        );
        subs.push(SubAggEntry {
            name,
            role: SubAggRole::RawGeometries { sort, paths },
        });
    }
    Ok(())
}

fn attach_fetch_hits(
    level: &AggregationLevel,
    node: &mut AggNode,
    subs: &mut Vec<SubAggEntry>,
) -> Result<()> {
    let Some(fetch) = &level.fetch_hits else {
        return Ok(());
    };
    if fetch.size == 0 {
        return Err(Error::InvalidParameter(
            "fetch_hits size must be at least 1".to_string(),
        ));
    }
    let source = if fetch.include_fields.is_empty() {
        None
    } else {
        Some(SourceFilter {
            includes: Some(fetch.include_fields.clone()),
            excludes: None,
        })
    };
    let sort = if fetch.sorts.is_empty() {
        None
    } else {
        Some(signed_sort_entries(&fetch.sorts.join(",")))
    };
    node.subs.insert(
        FETCHED_HITS.to_string(),
        AggNode::new(AggBody::TopHits(TopHitsAgg {
            size: fetch.size,
            sort,
            source,
        })),
    );
    subs.push(SubAggEntry {
        name: FETCHED_HITS.to_string(),
        role: SubAggRole::FetchedHits,
    });
    Ok(())
}
