//! The filter compiler: request filter specification → backend boolean tree.
//!
//! One compiler instance serves exactly one request; `compile` consumes it so
//! accumulated state can never leak across requests.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use geo_types::Geometry;
use serde_json::Value;
use tracing::debug;

use crate::collection::{CollectionReference, FieldType};
use crate::dsl::query::{
    BoolNode, GeoBoundingBox, GeoShapeClause, LatLon, QueryNode, RangeClause, SimpleQueryString,
    SpatialRelation,
};
use crate::error::{Error, Result};
use crate::geo::{orient_multi_polygon, orient_polygon, parse_wkt, BoundingBox, RingOrientation};
use crate::model::filter::{FilterExpression, FilterOperator, RangeInterval};
use crate::model::request::FilterSpec;

pub struct FilterCompiler<'a> {
    collection: &'a CollectionReference,
}

impl<'a> FilterCompiler<'a> {
    pub fn new(collection: &'a CollectionReference) -> Self {
        Self { collection }
    }

    /// Compiles one request's filter specification. Every OR-group becomes
    /// one entry of the outer `filter` conjunction.
    pub fn compile(self, spec: &FilterSpec) -> Result<BoolNode> {
        let orientation = RingOrientation::from_righthand(spec.righthand);
        let mut root = BoolNode::default();

        for group in &spec.f {
            if group.is_empty() {
                return Err(Error::InvalidParameter(
                    "a filter group must contain at least one expression".to_string(),
                ));
            }
            let mut clauses = Vec::with_capacity(group.len());
            for expr in group {
                clauses.push(self.compile_expression(expr, spec.dateformat.as_deref(), orientation)?);
            }
            root.filter.push(QueryNode::any_of(clauses));
        }

        if let Some(q) = spec.q.as_deref() {
            root.filter.push(self.compile_fulltext(q)?);
        }

        debug!(groups = spec.f.len(), fulltext = spec.q.is_some(), "compiled filter spec");
        Ok(root)
    }

    fn compile_expression(
        &self,
        expr: &FilterExpression,
        dateformat: Option<&str>,
        orientation: RingOrientation,
    ) -> Result<QueryNode> {
        expr.validate()?;
        match expr.op {
            FilterOperator::Eq => {
                let clauses = expr
                    .values()
                    .map(|v| QueryNode::term(&expr.field, literal_value(v)))
                    .collect();
                Ok(QueryNode::any_of(clauses))
            }
            // Every listed value must be individually absent, so the clauses
            // are negated one by one instead of negating their disjunction.
            FilterOperator::Ne => {
                let negations = expr
                    .values()
                    .map(|v| QueryNode::term(&expr.field, literal_value(v)))
                    .collect();
                Ok(QueryNode::Bool(Box::new(BoolNode {
                    must_not: negations,
                    ..BoolNode::default()
                })))
            }
            FilterOperator::Gt | FilterOperator::Gte | FilterOperator::Lt | FilterOperator::Lte => {
                let bound = self.bound_value(&expr.field, expr.value.trim(), dateformat)?;
                let mut clause = RangeClause::default();
                match expr.op {
                    FilterOperator::Gt => clause.gt = Some(bound),
                    FilterOperator::Gte => clause.gte = Some(bound),
                    FilterOperator::Lt => clause.lt = Some(bound),
                    FilterOperator::Lte => clause.lte = Some(bound),
                    _ => unreachable!(),
                }
                self.pin_timestamp_format(&expr.field, &mut clause);
                Ok(QueryNode::range(&expr.field, clause))
            }
            FilterOperator::Range => {
                let mut clauses = Vec::new();
                for literal in expr.values() {
                    let interval = RangeInterval::parse(literal)?;
                    let min = self.bound_value(&expr.field, &interval.min, dateformat)?;
                    let max = self.bound_value(&expr.field, &interval.max, dateformat)?;
                    let mut clause = RangeClause::default();
                    if interval.include_min {
                        clause.gte = Some(min);
                    } else {
                        clause.gt = Some(min);
                    }
                    if interval.include_max {
                        clause.lte = Some(max);
                    } else {
                        clause.lt = Some(max);
                    }
                    self.pin_timestamp_format(&expr.field, &mut clause);
                    clauses.push(QueryNode::range(&expr.field, clause));
                }
                Ok(QueryNode::any_of(clauses))
            }
            FilterOperator::Like => {
                let clauses = expr
                    .values()
                    .map(|v| QueryNode::regexp(&expr.field, format!(".*{v}.*")))
                    .collect();
                Ok(QueryNode::any_of(clauses))
            }
            FilterOperator::Within => self.compile_within(expr, orientation).map(QueryNode::any_of),
            FilterOperator::Notwithin => self
                .compile_within(expr, orientation)
                .map(|clauses| QueryNode::negate(QueryNode::any_of(clauses))),
            FilterOperator::Intersects => self
                .compile_intersects(expr, orientation)
                .map(QueryNode::any_of),
            FilterOperator::Notintersects => self
                .compile_intersects(expr, orientation)
                .map(|clauses| QueryNode::negate(QueryNode::any_of(clauses))),
        }
    }

    /// `q` is either `text` over all fields or `field:text`.
    fn compile_fulltext(&self, q: &str) -> Result<QueryNode> {
        let q = q.trim();
        if q.is_empty() {
            return Err(Error::InvalidParameter(
                "full-text search value is empty".to_string(),
            ));
        }
        let clause = match q.split_once(':') {
            Some((field, text)) if self.collection.field_type(field).is_ok() => {
                SimpleQueryString::new(text, Some(vec![field.to_string()]))
            }
            _ => SimpleQueryString::new(q, None),
        };
        Ok(QueryNode::SimpleQueryString(clause))
    }

    /// `within`/`notwithin` dispatch on the field's geometry kind. The
    /// returned clauses are the OR-able parts; the caller decides whether to
    /// union them or negate them as one entity.
    fn compile_within(
        &self,
        expr: &FilterExpression,
        orientation: RingOrientation,
    ) -> Result<Vec<QueryNode>> {
        match self.collection.field_type(&expr.field)? {
            FieldType::GeoPoint => {
                let mut clauses = Vec::new();
                for literal in expr.values() {
                    clauses.extend(self.point_within_clauses(&expr.field, literal)?);
                }
                Ok(clauses)
            }
            FieldType::GeoShape => expr
                .values()
                .map(|literal| {
                    self.shape_clause(&expr.field, literal, orientation, SpatialRelation::Within)
                })
                .collect(),
            other => Err(Error::NotAllowed(format!(
                "{} applies to geo fields only, '{}' is {other:?}",
                expr.op, expr.field
            ))),
        }
    }

    /// `intersects` has no point/shape branching: a point cannot
    /// intersect-test against a shape in this model.
    fn compile_intersects(
        &self,
        expr: &FilterExpression,
        orientation: RingOrientation,
    ) -> Result<Vec<QueryNode>> {
        match self.collection.field_type(&expr.field)? {
            FieldType::GeoShape => expr
                .values()
                .map(|literal| {
                    self.shape_clause(
                        &expr.field,
                        literal,
                        orientation,
                        SpatialRelation::Intersects,
                    )
                })
                .collect(),
            other => Err(Error::NotAllowed(format!(
                "{} applies to shape fields only, '{}' is {other:?}",
                expr.op, expr.field
            ))),
        }
    }

    /// Point-field `within`: a bbox literal becomes a bounding-box clause, a
    /// (multi)polygon becomes one ring clause per outer ring.
    fn point_within_clauses(&self, field: &str, literal: &str) -> Result<Vec<QueryNode>> {
        if looks_like_bbox(literal) {
            let bbox = BoundingBox::parse(literal)?;
            return Ok(vec![QueryNode::geo_bounding_box(
                field,
                GeoBoundingBox {
                    top_left: LatLon {
                        lat: bbox.north,
                        lon: bbox.west,
                    },
                    bottom_right: LatLon {
                        lat: bbox.south,
                        lon: bbox.east,
                    },
                },
            )]);
        }

        let polygons = match parse_wkt(literal)? {
            Geometry::Polygon(p) => vec![p],
            Geometry::MultiPolygon(mp) => mp.0,
            _ => {
                return Err(Error::NotAllowed(format!(
                    "within on point field '{field}' requires a bbox or polygon literal"
                )))
            }
        };

        polygons
            .into_iter()
            .map(|polygon| {
                if !polygon.interiors().is_empty() {
                    return Err(Error::NotImplemented(
                        "polygon holes are not supported on point-field within filters"
                            .to_string(),
                    ));
                }
                let points = polygon
                    .exterior()
                    .coords()
                    .map(|c| LatLon { lat: c.y, lon: c.x })
                    .collect();
                Ok(QueryNode::geo_polygon(field, points))
            })
            .collect()
    }

    /// Shape-field clause from a bbox or WKT literal, rings wound per the
    /// requested orientation.
    fn shape_clause(
        &self,
        field: &str,
        literal: &str,
        orientation: RingOrientation,
        relation: SpatialRelation,
    ) -> Result<QueryNode> {
        let geometry = if looks_like_bbox(literal) {
            Geometry::Polygon(BoundingBox::parse(literal)?.to_polygon(orientation))
        } else {
            match parse_wkt(literal)? {
                Geometry::Polygon(p) => Geometry::Polygon(orient_polygon(p, orientation)),
                Geometry::MultiPolygon(mp) => {
                    Geometry::MultiPolygon(orient_multi_polygon(mp, orientation))
                }
                other => other,
            }
        };
        let shape = geojson::Geometry::new(geojson::Value::from(&geometry));
        Ok(QueryNode::geo_shape(field, GeoShapeClause { shape, relation }))
    }

    /// Translates a range bound, honoring the request's date format and the
    /// epoch-millis pinning of the designated timestamp field.
    fn bound_value(&self, field: &str, literal: &str, dateformat: Option<&str>) -> Result<Value> {
        match self.collection.field_type(field)? {
            FieldType::Date => {
                if let Some(format) = dateformat {
                    return Ok(Value::from(parse_formatted_date(literal, format)?));
                }
                if self.collection.is_timestamp(field) {
                    if let Ok(millis) = literal.parse::<i64>() {
                        return Ok(Value::from(millis));
                    }
                    let parsed = DateTime::parse_from_rfc3339(literal).map_err(|_| {
                        Error::InvalidParameter(format!(
                            "cannot interpret '{literal}' as a timestamp; pass epoch millis, \
                             RFC 3339, or a dateformat hint"
                        ))
                    })?;
                    return Ok(Value::from(parsed.timestamp_millis()));
                }
                // Other date fields keep the literal; the backend interprets
                // it against the field's own mapping format.
                Ok(literal_value(literal))
            }
            _ => Ok(literal_value(literal)),
        }
    }

    fn pin_timestamp_format(&self, field: &str, clause: &mut RangeClause) {
        if self.collection.is_timestamp(field) {
            clause.format = Some("epoch_millis".to_string());
        }
    }
}

/// Numbers and booleans are emitted natively, everything else as a string.
fn literal_value(literal: &str) -> Value {
    if let Ok(n) = literal.parse::<i64>() {
        return Value::from(n);
    }
    if let Ok(f) = literal.parse::<f64>() {
        return Value::from(f);
    }
    match literal {
        "true" => Value::from(true),
        "false" => Value::from(false),
        _ => Value::from(literal),
    }
}

/// Bbox literals are purely numeric comma quadruples; anything with a letter
/// is WKT.
fn looks_like_bbox(literal: &str) -> bool {
    !literal.is_empty()
        && literal
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, ',' | '.' | '-' | '+' | ' '))
}

fn parse_formatted_date(literal: &str, format: &str) -> Result<i64> {
    if let Ok(dt) = DateTime::parse_from_str(literal, format) {
        return Ok(dt.timestamp_millis());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(literal, format) {
        return Ok(dt.and_utc().timestamp_millis());
    }
    if let Ok(d) = NaiveDate::parse_from_str(literal, format) {
        return Ok(d.and_time(chrono::NaiveTime::MIN).and_utc().timestamp_millis());
    }
    Err(Error::InvalidParameter(format!(
        "date '{literal}' does not match format '{format}'"
    )))
}
