//! Filter compiler behavior: per-operator clause mapping and the
//! OR-within-group / AND-across-groups composition rule.

mod common;

use common::ships_collection;
use meridian::compile::FilterCompiler;
use meridian::error::Error;
use meridian::model::filter::{FilterExpression, FilterOperator};
use meridian::model::request::FilterSpec;
use serde_json::{json, Value};

fn compile(spec: &FilterSpec) -> Value {
    let collection = ships_collection();
    let tree = FilterCompiler::new(&collection).compile(spec).unwrap();
    serde_json::to_value(&tree).unwrap()
}

fn compile_err(spec: &FilterSpec) -> Error {
    let collection = ships_collection();
    FilterCompiler::new(&collection).compile(spec).unwrap_err()
}

fn spec_of(groups: Vec<Vec<FilterExpression>>) -> FilterSpec {
    FilterSpec {
        f: groups,
        ..FilterSpec::default()
    }
}

fn expr(field: &str, op: FilterOperator, value: &str) -> FilterExpression {
    FilterExpression::new(field, op, value)
}

// =======================================================================
// Composition
// =======================================================================

#[test]
fn test_groups_are_anded() {
    let spec = spec_of(vec![
        vec![expr("status", FilterOperator::Eq, "active")],
        vec![expr("speed", FilterOperator::Gte, "10")],
    ]);
    let v = compile(&spec);
    let filter = v["filter"].as_array().unwrap();
    assert_eq!(filter.len(), 2);
}

#[test]
fn test_expressions_within_group_are_ored() {
    let spec = spec_of(vec![vec![
        expr("status", FilterOperator::Eq, "active"),
        expr("speed", FilterOperator::Gte, "10"),
    ]]);
    let v = compile(&spec);
    let filter = v["filter"].as_array().unwrap();
    assert_eq!(filter.len(), 1);
    let group = &filter[0]["bool"];
    assert_eq!(group["should"].as_array().unwrap().len(), 2);
    assert_eq!(group["minimum_should_match"], json!(1));
}

#[test]
fn test_empty_group_is_rejected() {
    let spec = spec_of(vec![vec![]]);
    assert!(matches!(compile_err(&spec), Error::InvalidParameter(_)));
}

// =======================================================================
// eq / ne
// =======================================================================

#[test]
fn test_eq_multi_value_builds_or() {
    let spec = spec_of(vec![vec![expr("status", FilterOperator::Eq, "active,idle")]]);
    let v = compile(&spec);
    let group = &v["filter"][0]["bool"];
    let should = group["should"].as_array().unwrap();
    assert_eq!(should[0], json!({"term": {"status": "active"}}));
    assert_eq!(should[1], json!({"term": {"status": "idle"}}));
}

#[test]
fn test_ne_negates_every_value_individually() {
    let spec = spec_of(vec![vec![expr("status", FilterOperator::Ne, "a,b")]]);
    let v = compile(&spec);
    let must_not = v["filter"][0]["bool"]["must_not"].as_array().unwrap();
    // Both values are excluded: a document matching either is rejected.
    assert_eq!(must_not.len(), 2);
    assert_eq!(must_not[0], json!({"term": {"status": "a"}}));
    assert_eq!(must_not[1], json!({"term": {"status": "b"}}));
}

#[test]
fn test_missing_value_is_invalid() {
    let spec = spec_of(vec![vec![expr("status", FilterOperator::Eq, "")]]);
    assert!(matches!(compile_err(&spec), Error::InvalidParameter(_)));
}

// =======================================================================
// Ranges and dates
// =======================================================================

#[test]
fn test_single_bound_operators() {
    let spec = spec_of(vec![vec![expr("speed", FilterOperator::Lt, "12.5")]]);
    let v = compile(&spec);
    assert_eq!(v["filter"][0], json!({"range": {"speed": {"lt": 12.5}}}));
}

#[test]
fn test_range_brackets_select_inclusivity() {
    let spec = spec_of(vec![vec![expr("weight", FilterOperator::Range, "[100<200]")]]);
    let v = compile(&spec);
    assert_eq!(
        v["filter"][0],
        json!({"range": {"weight": {"gte": 100, "lte": 200}}})
    );

    let spec = spec_of(vec![vec![expr("weight", FilterOperator::Range, "(100<200)")]]);
    let v = compile(&spec);
    assert_eq!(
        v["filter"][0],
        json!({"range": {"weight": {"gt": 100, "lt": 200}}})
    );
}

#[test]
fn test_range_multi_value_builds_or() {
    let spec = spec_of(vec![vec![expr(
        "weight",
        FilterOperator::Range,
        "[1<2],[5<6]",
    )]]);
    let v = compile(&spec);
    assert_eq!(
        v["filter"][0]["bool"]["should"].as_array().unwrap().len(),
        2
    );
}

#[test]
fn test_timestamp_range_is_pinned_to_epoch_millis() {
    let spec = spec_of(vec![vec![expr(
        "startdate",
        FilterOperator::Gte,
        "1577836800000",
    )]]);
    let v = compile(&spec);
    assert_eq!(
        v["filter"][0],
        json!({"range": {"startdate": {"gte": 1_577_836_800_000i64, "format": "epoch_millis"}}})
    );
}

#[test]
fn test_dateformat_hint_translates_literals() {
    let spec = FilterSpec {
        f: vec![vec![expr("startdate", FilterOperator::Gt, "02/01/2020")]],
        dateformat: Some("%d/%m/%Y".to_string()),
        ..FilterSpec::default()
    };
    let v = compile(&spec);
    assert_eq!(
        v["filter"][0]["range"]["startdate"]["gt"],
        json!(1_577_923_200_000i64)
    );
}

#[test]
fn test_timestamp_rfc3339_literal() {
    let spec = spec_of(vec![vec![expr(
        "startdate",
        FilterOperator::Lte,
        "2020-01-01T00:00:00Z",
    )]]);
    let v = compile(&spec);
    assert_eq!(
        v["filter"][0]["range"]["startdate"]["lte"],
        json!(1_577_836_800_000i64)
    );
}

#[test]
fn test_non_timestamp_date_keeps_literal_without_hint() {
    let spec = spec_of(vec![vec![expr(
        "enddate",
        FilterOperator::Gt,
        "2020-01-01",
    )]]);
    let v = compile(&spec);
    assert_eq!(v["filter"][0]["range"]["enddate"]["gt"], json!("2020-01-01"));
}

#[test]
fn test_bad_bracket_syntax_is_invalid() {
    let spec = spec_of(vec![vec![expr("weight", FilterOperator::Range, "100<200")]]);
    assert!(matches!(compile_err(&spec), Error::InvalidParameter(_)));
}

// =======================================================================
// like
// =======================================================================

#[test]
fn test_like_wraps_value_in_anchor_free_regexp() {
    let spec = spec_of(vec![vec![expr("name", FilterOperator::Like, "mercur")]]);
    let v = compile(&spec);
    assert_eq!(v["filter"][0], json!({"regexp": {"name": ".*mercur.*"}}));
}

// =======================================================================
// Geo operators
// =======================================================================

#[test]
fn test_within_bbox_on_point_field() {
    let spec = spec_of(vec![vec![expr(
        "track.location",
        FilterOperator::Within,
        "-5.2,41.3,9.6,51.1",
    )]]);
    let v = compile(&spec);
    assert_eq!(
        v["filter"][0],
        json!({"geo_bounding_box": {"track.location": {
            "top_left": {"lat": 51.1, "lon": -5.2},
            "bottom_right": {"lat": 41.3, "lon": 9.6}
        }}})
    );
}

#[test]
fn test_within_multipolygon_on_point_field_unions_parts() {
    let wkt = "MULTIPOLYGON(((0 0, 5 0, 5 5, 0 5, 0 0)), ((10 10, 15 10, 15 15, 10 15, 10 10)))";
    let spec = spec_of(vec![vec![expr("track.location", FilterOperator::Within, wkt)]]);
    let v = compile(&spec);
    let should = v["filter"][0]["bool"]["should"].as_array().unwrap();
    assert_eq!(should.len(), 2);
    assert!(should[0]["geo_polygon"]["track.location"]["points"].is_array());
}

#[test]
fn test_notwithin_negates_the_union_as_one_entity() {
    let wkt = "MULTIPOLYGON(((0 0, 5 0, 5 5, 0 5, 0 0)), ((10 10, 15 10, 15 15, 10 15, 10 10)))";
    let spec = spec_of(vec![vec![expr(
        "track.location",
        FilterOperator::Notwithin,
        wkt,
    )]]);
    let v = compile(&spec);
    // A single must_not around the OR of rings: a point inside one ring and
    // outside the other is still excluded.
    let must_not = v["filter"][0]["bool"]["must_not"].as_array().unwrap();
    assert_eq!(must_not.len(), 1);
    assert_eq!(
        must_not[0]["bool"]["should"].as_array().unwrap().len(),
        2
    );
}

#[test]
fn test_polygon_holes_on_point_field_not_implemented() {
    let wkt = "POLYGON((0 0, 10 0, 10 10, 0 10, 0 0), (4 4, 6 4, 6 6, 4 6, 4 4))";
    let spec = spec_of(vec![vec![expr("track.location", FilterOperator::Within, wkt)]]);
    assert!(matches!(compile_err(&spec), Error::NotImplemented(_)));
}

#[test]
fn test_within_on_shape_field_builds_geo_shape() {
    let spec = spec_of(vec![vec![expr(
        "track.geometry",
        FilterOperator::Within,
        "POLYGON((0 0, 10 0, 10 10, 0 10, 0 0))",
    )]]);
    let v = compile(&spec);
    let clause = &v["filter"][0]["geo_shape"]["track.geometry"];
    assert_eq!(clause["relation"], json!("within"));
    assert_eq!(clause["shape"]["type"], json!("Polygon"));
}

#[test]
fn test_intersects_requires_shape_field() {
    let spec = spec_of(vec![vec![expr(
        "track.location",
        FilterOperator::Intersects,
        "POLYGON((0 0, 10 0, 10 10, 0 10, 0 0))",
    )]]);
    assert!(matches!(compile_err(&spec), Error::NotAllowed(_)));
}

#[test]
fn test_notintersects_negates_shape_clause() {
    let spec = spec_of(vec![vec![expr(
        "track.geometry",
        FilterOperator::Notintersects,
        "POLYGON((0 0, 10 0, 10 10, 0 10, 0 0))",
    )]]);
    let v = compile(&spec);
    let clause = &v["filter"][0]["bool"]["must_not"][0]["geo_shape"]["track.geometry"];
    assert_eq!(clause["relation"], json!("intersects"));
}

#[test]
fn test_within_on_non_geo_field_not_allowed() {
    let spec = spec_of(vec![vec![expr("status", FilterOperator::Within, "0,0,1,1")]]);
    assert!(matches!(compile_err(&spec), Error::NotAllowed(_)));
}

#[test]
fn test_unknown_field_is_not_found() {
    let spec = spec_of(vec![vec![expr("ghost", FilterOperator::Eq, "x")]]);
    assert!(matches!(compile_err(&spec), Error::FieldNotFound(_)));
}

#[test]
fn test_out_of_envelope_wkt_is_rejected() {
    let spec = spec_of(vec![vec![expr(
        "track.geometry",
        FilterOperator::Within,
        "POLYGON((400 0, 410 0, 410 10, 400 10, 400 0))",
    )]]);
    assert!(matches!(compile_err(&spec), Error::InvalidParameter(_)));
}

// =======================================================================
// Antimeridian
// =======================================================================

#[test]
fn test_antimeridian_bbox_on_shape_field_wraps() {
    let spec = spec_of(vec![vec![expr(
        "track.geometry",
        FilterOperator::Within,
        "170,-10,-170,10",
    )]]);
    let v = compile(&spec);
    let ring = v["filter"][0]["geo_shape"]["track.geometry"]["shape"]["coordinates"][0]
        .as_array()
        .unwrap();
    let lons: Vec<f64> = ring.iter().map(|c| c[0].as_f64().unwrap()).collect();
    // The ring spans [170, 190]: longitude ±180 is inside, longitude 0 is not.
    assert!(lons.iter().all(|&lon| (170.0..=190.0).contains(&lon)));
    assert!(lons.contains(&190.0));
}

#[test]
fn test_antimeridian_bbox_on_point_field_keeps_raw_bounds() {
    let spec = spec_of(vec![vec![expr(
        "track.location",
        FilterOperator::Within,
        "170,-10,-170,10",
    )]]);
    let v = compile(&spec);
    // The bounding-box clause understands west > east natively.
    let clause = &v["filter"][0]["geo_bounding_box"]["track.location"];
    assert_eq!(clause["top_left"]["lon"], json!(170.0));
    assert_eq!(clause["bottom_right"]["lon"], json!(-170.0));
}

// =======================================================================
// Full-text
// =======================================================================

#[test]
fn test_fulltext_over_all_fields() {
    let spec = FilterSpec {
        q: Some("mercury".to_string()),
        ..FilterSpec::default()
    };
    let v = compile(&spec);
    assert_eq!(
        v["filter"][0],
        json!({"simple_query_string": {"query": "mercury", "default_operator": "AND"}})
    );
}

#[test]
fn test_fulltext_on_named_field() {
    let spec = FilterSpec {
        q: Some("name:mercury".to_string()),
        ..FilterSpec::default()
    };
    let v = compile(&spec);
    assert_eq!(
        v["filter"][0],
        json!({"simple_query_string": {
            "query": "mercury",
            "fields": ["name"],
            "default_operator": "AND"
        }})
    );
}
