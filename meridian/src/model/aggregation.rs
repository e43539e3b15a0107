//! Aggregation levels: the request-side description of one group-by chain.
//!
//! A request carries an ordered list of [`AggregationLevel`]; level *i* is
//! nested as the single sub-aggregation of level *i-1*, so the model is a
//! linear pipeline, not a tree.
//!
//! The wire form is a colon-delimited descriptor, e.g.
//! `geohash:track.location:interval-3:collect_field-speed:collect_fct-avg`.
//! Entry-valued parameters (`raw_geometries`) separate entries with `;`
//! because their own sort lists already use `,`.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregationKind {
    Datehistogram,
    Histogram,
    Term,
    Geohash,
    Geotile,
    H3,
}

impl AggregationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AggregationKind::Datehistogram => "datehistogram",
            AggregationKind::Histogram => "histogram",
            AggregationKind::Term => "term",
            AggregationKind::Geohash => "geohash",
            AggregationKind::Geotile => "geotile",
            AggregationKind::H3 => "h3",
        }
    }

    /// Spatial kinds whose buckets are geographic cells.
    pub fn is_cell(&self) -> bool {
        matches!(
            self,
            AggregationKind::Geohash | AggregationKind::Geotile | AggregationKind::H3
        )
    }

    /// The two backend grid aggregations with restricted parameter sets.
    pub fn is_grid(&self) -> bool {
        matches!(self, AggregationKind::Geohash | AggregationKind::Geotile)
    }
}

impl FromStr for AggregationKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "datehistogram" => Ok(AggregationKind::Datehistogram),
            "histogram" => Ok(AggregationKind::Histogram),
            "term" => Ok(AggregationKind::Term),
            "geohash" => Ok(AggregationKind::Geohash),
            "geotile" => Ok(AggregationKind::Geotile),
            "h3" => Ok(AggregationKind::H3),
            other => Err(Error::InvalidParameter(format!(
                "unknown aggregation kind: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateUnit {
    Year,
    Quarter,
    Month,
    Week,
    Day,
    Hour,
    Minute,
    Second,
}

impl DateUnit {
    /// Units the backend only supports as calendar intervals (single-valued).
    pub fn is_calendar(&self) -> bool {
        matches!(
            self,
            DateUnit::Year | DateUnit::Quarter | DateUnit::Month | DateUnit::Week
        )
    }

    /// The backend interval suffix for this unit.
    pub fn suffix(&self) -> &'static str {
        match self {
            DateUnit::Year => "y",
            DateUnit::Quarter => "q",
            DateUnit::Month => "M",
            DateUnit::Week => "w",
            DateUnit::Day => "d",
            DateUnit::Hour => "h",
            DateUnit::Minute => "m",
            DateUnit::Second => "s",
        }
    }
}

impl FromStr for DateUnit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "year" => Ok(DateUnit::Year),
            "quarter" => Ok(DateUnit::Quarter),
            "month" => Ok(DateUnit::Month),
            "week" => Ok(DateUnit::Week),
            "day" => Ok(DateUnit::Day),
            "hour" => Ok(DateUnit::Hour),
            "minute" => Ok(DateUnit::Minute),
            "second" => Ok(DateUnit::Second),
            other => Err(Error::InvalidParameter(format!(
                "unknown date interval unit: {other}"
            ))),
        }
    }
}

/// Group-by interval; the accepted variant depends on the level kind.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Interval {
    /// `datehistogram` interval: a value and a calendar/fixed unit.
    Date { value: u32, unit: DateUnit },
    /// `histogram` bucket width.
    Numeric(f64),
    /// Cell precision: geohash length, tile zoom or H3 resolution.
    Precision(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricFunction {
    Avg,
    Min,
    Max,
    Sum,
    Cardinality,
    Geocentroid,
    Geobbox,
}

impl MetricFunction {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricFunction::Avg => "avg",
            MetricFunction::Min => "min",
            MetricFunction::Max => "max",
            MetricFunction::Sum => "sum",
            MetricFunction::Cardinality => "cardinality",
            MetricFunction::Geocentroid => "geocentroid",
            MetricFunction::Geobbox => "geobbox",
        }
    }

    /// Geometry-valued metrics; these require a point-typed collect field and
    /// are never valid ordering targets.
    pub fn is_geo(&self) -> bool {
        matches!(self, MetricFunction::Geocentroid | MetricFunction::Geobbox)
    }
}

impl FromStr for MetricFunction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "avg" => Ok(MetricFunction::Avg),
            "min" => Ok(MetricFunction::Min),
            "max" => Ok(MetricFunction::Max),
            "sum" => Ok(MetricFunction::Sum),
            "cardinality" => Ok(MetricFunction::Cardinality),
            "geocentroid" => Ok(MetricFunction::Geocentroid),
            "geobbox" => Ok(MetricFunction::Geobbox),
            other => Err(Error::InvalidParameter(format!(
                "unknown collect function: {other}"
            ))),
        }
    }
}

/// One per-bucket metric: a collect function applied to a collect field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metric {
    pub collect_field: String,
    pub collect_fct: MetricFunction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Order {
    Asc,
    Desc,
}

impl Order {
    pub fn as_str(&self) -> &'static str {
        match self {
            Order::Asc => "asc",
            Order::Desc => "desc",
        }
    }
}

impl FromStr for Order {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "asc" => Ok(Order::Asc),
            "desc" => Ok(Order::Desc),
            other => Err(Error::InvalidParameter(format!("unknown order: {other}"))),
        }
    }
}

/// What a level's `order` applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderOn {
    Field,
    Count,
    Result,
}

impl FromStr for OrderOn {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "field" => Ok(OrderOn::Field),
            "count" => Ok(OrderOn::Count),
            "result" => Ok(OrderOn::Result),
            other => Err(Error::InvalidParameter(format!(
                "unknown order target: {other}"
            ))),
        }
    }
}

/// Per-bucket geometries computed by the backend or synthesized from the
/// bucket key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregatedGeometry {
    Bbox,
    Centroid,
    Cell,
    CellCenter,
}

impl AggregatedGeometry {
    pub fn as_str(&self) -> &'static str {
        match self {
            AggregatedGeometry::Bbox => "bbox",
            AggregatedGeometry::Centroid => "centroid",
            AggregatedGeometry::Cell => "cell",
            AggregatedGeometry::CellCenter => "cell_center",
        }
    }

    /// Cell shapes are synthesized from the bucket key, not fetched.
    pub fn is_cell(&self) -> bool {
        matches!(self, AggregatedGeometry::Cell | AggregatedGeometry::CellCenter)
    }
}

impl FromStr for AggregatedGeometry {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "bbox" => Ok(AggregatedGeometry::Bbox),
            "centroid" => Ok(AggregatedGeometry::Centroid),
            "cell" => Ok(AggregatedGeometry::Cell),
            "cell_center" => Ok(AggregatedGeometry::CellCenter),
            other => Err(Error::InvalidParameter(format!(
                "unknown aggregated geometry: {other}"
            ))),
        }
    }
}

/// A geometry read verbatim from a representative document of the bucket,
/// the representative being the first hit under `sort`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawGeometry {
    pub geometry_path: String,
    /// Signed comma-separated sort list selecting the representative hit.
    pub sort: String,
}

/// Fetch a few documents per bucket alongside the aggregated values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HitsFetcher {
    pub size: usize,
    pub include_fields: Vec<String>,
    /// Signed fields among `include_fields` that also sort the fetched hits.
    pub sorts: Vec<String>,
}

/// One node of the aggregation chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationLevel {
    pub kind: AggregationKind,
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default)]
    pub interval: Option<Interval>,
    #[serde(default)]
    pub metrics: Vec<Metric>,
    #[serde(default)]
    pub order: Option<Order>,
    #[serde(default)]
    pub on: Option<OrderOn>,
    #[serde(default)]
    pub size: Option<u32>,
    #[serde(default)]
    pub include: Option<String>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub aggregated_geometries: Vec<AggregatedGeometry>,
    #[serde(default)]
    pub raw_geometries: Vec<RawGeometry>,
    #[serde(default)]
    pub fetch_hits: Option<HitsFetcher>,
}

impl AggregationLevel {
    pub fn new(kind: AggregationKind) -> Self {
        Self {
            kind,
            field: None,
            interval: None,
            metrics: Vec::new(),
            order: None,
            on: None,
            size: None,
            include: None,
            format: None,
            aggregated_geometries: Vec::new(),
            raw_geometries: Vec::new(),
            fetch_hits: None,
        }
    }
}

impl FromStr for AggregationLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut tokens = s.split(':');
        let kind: AggregationKind = tokens
            .next()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::InvalidParameter("empty aggregation descriptor".to_string()))?
            .parse()?;

        let mut level = AggregationLevel::new(kind);
        let mut pending_collect_field: Option<String> = None;
        let mut saw_parameter = false;

        for token in tokens {
            if token.is_empty() {
                return Err(Error::InvalidParameter(format!(
                    "empty token in aggregation descriptor '{s}'"
                )));
            }
            match token.split_once('-') {
                Some(("interval", v)) => {
                    level.interval = Some(parse_interval(kind, v)?);
                }
                Some(("collect_field", v)) => {
                    if pending_collect_field.is_some() {
                        return Err(Error::InvalidParameter(
                            "collect_field without a matching collect_fct".to_string(),
                        ));
                    }
                    pending_collect_field = Some(v.to_string());
                }
                Some(("collect_fct", v)) => {
                    let collect_field = pending_collect_field.take().ok_or_else(|| {
                        Error::InvalidParameter(
                            "collect_fct without a preceding collect_field".to_string(),
                        )
                    })?;
                    level.metrics.push(Metric {
                        collect_field,
                        collect_fct: v.parse()?,
                    });
                }
                Some(("order", v)) => level.order = Some(v.parse()?),
                Some(("on", v)) => level.on = Some(v.parse()?),
                Some(("size", v)) => {
                    level.size = Some(v.parse().map_err(|_| {
                        Error::InvalidParameter(format!("size must be a positive integer: {v}"))
                    })?);
                }
                Some(("include", v)) => level.include = Some(v.to_string()),
                Some(("format", v)) => level.format = Some(v.to_string()),
                Some(("aggregated_geometries", v)) => {
                    level.aggregated_geometries = v
                        .split(',')
                        .map(str::parse)
                        .collect::<Result<Vec<_>>>()?;
                }
                Some(("raw_geometries", v)) => {
                    level.raw_geometries = v
                        .split(';')
                        .map(parse_raw_geometry)
                        .collect::<Result<Vec<_>>>()?;
                }
                Some(("fetch_hits", v)) => level.fetch_hits = Some(parse_fetch_hits(v)?),
                _ => {
                    // Not a parameter token: the group-by field. Only valid in
                    // second position, before any parameter.
                    if level.field.is_some() || saw_parameter {
                        return Err(Error::InvalidParameter(format!(
                            "unexpected token '{token}' in aggregation descriptor '{s}'"
                        )));
                    }
                    level.field = Some(token.to_string());
                    continue;
                }
            }
            saw_parameter = true;
        }

        if pending_collect_field.is_some() {
            return Err(Error::InvalidParameter(
                "collect_field without a matching collect_fct".to_string(),
            ));
        }
        Ok(level)
    }
}

fn parse_interval(kind: AggregationKind, v: &str) -> Result<Interval> {
    match kind {
        AggregationKind::Datehistogram => {
            let split = v
                .find(|c: char| !c.is_ascii_digit())
                .ok_or_else(|| Error::InvalidParameter(format!("date interval needs a unit: {v}")))?;
            let (digits, unit) = v.split_at(split);
            let value: u32 = if digits.is_empty() {
                1
            } else {
                digits.parse().map_err(|_| {
                    Error::InvalidParameter(format!("invalid date interval value: {v}"))
                })?
            };
            Ok(Interval::Date {
                value,
                unit: unit.parse()?,
            })
        }
        AggregationKind::Histogram => v
            .parse()
            .map(Interval::Numeric)
            .map_err(|_| Error::InvalidParameter(format!("invalid histogram interval: {v}"))),
        AggregationKind::Term | AggregationKind::Geohash | AggregationKind::Geotile
        | AggregationKind::H3 => v
            .parse()
            .map(Interval::Precision)
            .map_err(|_| Error::InvalidParameter(format!("invalid precision: {v}"))),
    }
}

fn parse_raw_geometry(entry: &str) -> Result<RawGeometry> {
    let entry = entry.trim();
    if entry.is_empty() {
        return Err(Error::InvalidParameter(
            "empty raw_geometries entry".to_string(),
        ));
    }
    match entry.split_once('(') {
        Some((path, rest)) => {
            let sort = rest.strip_suffix(')').ok_or_else(|| {
                Error::InvalidParameter(format!("unclosed sort in raw_geometries entry '{entry}'"))
            })?;
            Ok(RawGeometry {
                geometry_path: path.to_string(),
                sort: sort.to_string(),
            })
        }
        None => Ok(RawGeometry {
            geometry_path: entry.to_string(),
            sort: String::new(),
        }),
    }
}

fn parse_fetch_hits(v: &str) -> Result<HitsFetcher> {
    let (size_part, fields_part) = match v.split_once('(') {
        Some((s, rest)) => {
            let inner = rest.strip_suffix(')').ok_or_else(|| {
                Error::InvalidParameter(format!("unclosed field list in fetch_hits '{v}'"))
            })?;
            (s, Some(inner))
        }
        None => (v, None),
    };
    let size: usize = size_part
        .parse()
        .map_err(|_| Error::InvalidParameter(format!("fetch_hits size must be an integer: {v}")))?;

    let mut include_fields = Vec::new();
    let mut sorts = Vec::new();
    if let Some(fields) = fields_part {
        for raw in fields.split(',').map(str::trim).filter(|f| !f.is_empty()) {
            if let Some(field) = raw.strip_prefix('+') {
                include_fields.push(field.to_string());
                sorts.push(field.to_string());
            } else if let Some(field) = raw.strip_prefix('-') {
                include_fields.push(field.to_string());
                sorts.push(raw.to_string());
            } else {
                include_fields.push(raw.to_string());
            }
        }
    }
    Ok(HitsFetcher {
        size,
        include_fields,
        sorts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    // ===================================================================
    // Descriptor parsing
    // ===================================================================

    #[test]
    fn test_parse_term_level() {
        let l: AggregationLevel = "term:status:size-10:include-act.*".parse().unwrap();
        assert_eq!(l.kind, AggregationKind::Term);
        assert_eq!(l.field.as_deref(), Some("status"));
        assert_eq!(l.size, Some(10));
        assert_eq!(l.include.as_deref(), Some("act.*"));
    }

    #[test]
    fn test_parse_datehistogram_without_field() {
        let l: AggregationLevel = "datehistogram:interval-1day".parse().unwrap();
        assert_eq!(l.field, None);
        assert_eq!(
            l.interval,
            Some(Interval::Date {
                value: 1,
                unit: DateUnit::Day
            })
        );
    }

    #[test]
    fn test_parse_datehistogram_multi_value_interval() {
        let l: AggregationLevel = "datehistogram:startdate:interval-10minute".parse().unwrap();
        assert_eq!(
            l.interval,
            Some(Interval::Date {
                value: 10,
                unit: DateUnit::Minute
            })
        );
    }

    #[test]
    fn test_parse_geohash_precision() {
        let l: AggregationLevel = "geohash:track.location:interval-3".parse().unwrap();
        assert_eq!(l.interval, Some(Interval::Precision(3)));
    }

    #[test]
    fn test_parse_metrics_pairs() {
        let l: AggregationLevel =
            "term:status:collect_field-speed:collect_fct-avg:collect_field-speed:collect_fct-max"
                .parse()
                .unwrap();
        assert_eq!(l.metrics.len(), 2);
        assert_eq!(l.metrics[0].collect_fct, MetricFunction::Avg);
        assert_eq!(l.metrics[1].collect_fct, MetricFunction::Max);
    }

    #[test]
    fn test_parse_unpaired_collect_field_fails() {
        assert!("term:status:collect_field-speed"
            .parse::<AggregationLevel>()
            .is_err());
        assert!("term:status:collect_fct-avg"
            .parse::<AggregationLevel>()
            .is_err());
    }

    #[test]
    fn test_parse_aggregated_geometries() {
        let l: AggregationLevel = "geohash:g:interval-2:aggregated_geometries-bbox,cell_center"
            .parse()
            .unwrap();
        assert_eq!(
            l.aggregated_geometries,
            vec![AggregatedGeometry::Bbox, AggregatedGeometry::CellCenter]
        );
    }

    #[test]
    fn test_parse_raw_geometries_with_sorts() {
        let l: AggregationLevel = "term:s:raw_geometries-track(-startdate);centroid"
            .parse()
            .unwrap();
        assert_eq!(l.raw_geometries.len(), 2);
        assert_eq!(l.raw_geometries[0].geometry_path, "track");
        assert_eq!(l.raw_geometries[0].sort, "-startdate");
        assert_eq!(l.raw_geometries[1].sort, "");
    }

    #[test]
    fn test_parse_fetch_hits() {
        let l: AggregationLevel = "term:s:fetch_hits-3(+startdate,name)".parse().unwrap();
        let fh = l.fetch_hits.unwrap();
        assert_eq!(fh.size, 3);
        assert_eq!(fh.include_fields, vec!["startdate", "name"]);
        assert_eq!(fh.sorts, vec!["startdate"]);
    }

    #[test]
    fn test_parse_fetch_hits_descending_sort() {
        let l: AggregationLevel = "term:s:fetch_hits-1(-startdate)".parse().unwrap();
        let fh = l.fetch_hits.unwrap();
        assert_eq!(fh.include_fields, vec!["startdate"]);
        assert_eq!(fh.sorts, vec!["-startdate"]);
    }

    #[test]
    fn test_parse_field_after_parameter_fails() {
        assert!("term:size-3:status".parse::<AggregationLevel>().is_err());
    }

    #[test]
    fn test_parse_unknown_kind_fails() {
        assert!("pyramid:f".parse::<AggregationLevel>().is_err());
    }

    #[test]
    fn test_order_and_on_parse() {
        let l: AggregationLevel = "term:s:order-desc:on-count".parse().unwrap();
        assert_eq!(l.order, Some(Order::Desc));
        assert_eq!(l.on, Some(OrderOn::Count));
    }
}
