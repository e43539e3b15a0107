//! Property tests: the compiled boolean tree behaves like the declared
//! AND-of-OR-groups predicate when evaluated against synthetic documents.

mod common;

use common::ships_collection;
use meridian::compile::FilterCompiler;
use meridian::model::filter::{FilterExpression, FilterOperator};
use meridian::model::request::FilterSpec;
use proptest::prelude::*;
use serde_json::{json, Value};

/// A reference evaluator over the subset of clauses the compiler emits for
/// scalar operators.
fn evaluate(node: &Value, doc: &Value) -> bool {
    if let Some(b) = node.get("bool") {
        let all = |section: &str| {
            b.get(section)
                .and_then(Value::as_array)
                .map(|nodes| nodes.iter().all(|n| evaluate(n, doc)))
                .unwrap_or(true)
        };
        let none_of_must_not = b
            .get("must_not")
            .and_then(Value::as_array)
            .map(|nodes| !nodes.iter().any(|n| evaluate(n, doc)))
            .unwrap_or(true);
        let should_ok = b
            .get("should")
            .and_then(Value::as_array)
            .map(|nodes| nodes.is_empty() || nodes.iter().any(|n| evaluate(n, doc)))
            .unwrap_or(true);
        return all("must") && all("filter") && none_of_must_not && should_ok;
    }
    if let Some(t) = node.get("term") {
        let (field, expected) = t.as_object().unwrap().iter().next().unwrap();
        return doc.get(field) == Some(expected);
    }
    if let Some(r) = node.get("range") {
        let (field, clause) = r.as_object().unwrap().iter().next().unwrap();
        let Some(actual) = doc.get(field).and_then(Value::as_f64) else {
            return false;
        };
        let bound = |name: &str| clause.get(name).and_then(Value::as_f64);
        return bound("gte").is_none_or(|b| actual >= b)
            && bound("gt").is_none_or(|b| actual > b)
            && bound("lte").is_none_or(|b| actual <= b)
            && bound("lt").is_none_or(|b| actual < b);
    }
    panic!("unexpected clause in compiled tree: {node}");
}

fn compile_groups(groups: &[Vec<FilterExpression>]) -> Value {
    let collection = ships_collection();
    let spec = FilterSpec {
        f: groups.to_vec(),
        ..FilterSpec::default()
    };
    let tree = FilterCompiler::new(&collection).compile(&spec).unwrap();
    json!({"bool": serde_json::to_value(&tree).unwrap()})
}

proptest! {
    /// Membership equals the AND of per-group (OR of per-value) predicates.
    #[test]
    fn prop_and_of_or_groups(
        groups in prop::collection::vec(
            prop::collection::vec(0i64..10, 1..4),
            1..4,
        ),
        weight in 0i64..10,
    ) {
        let expressions: Vec<Vec<FilterExpression>> = groups
            .iter()
            .map(|values| {
                let joined = values
                    .iter()
                    .map(i64::to_string)
                    .collect::<Vec<_>>()
                    .join(",");
                vec![FilterExpression::new("weight", FilterOperator::Eq, joined)]
            })
            .collect();
        let tree = compile_groups(&expressions);
        let doc = json!({"weight": weight});

        let expected = groups
            .iter()
            .all(|values| values.iter().any(|v| *v == weight));
        prop_assert_eq!(evaluate(&tree, &doc), expected);
    }

    /// Several expressions in one group are OR-combined before the groups
    /// are ANDed.
    #[test]
    fn prop_or_within_group(
        a in 0i64..10,
        b in 0i64..10,
        weight in 0i64..10,
    ) {
        let group = vec![
            FilterExpression::new("weight", FilterOperator::Eq, a.to_string()),
            FilterExpression::new("weight", FilterOperator::Eq, b.to_string()),
        ];
        let tree = compile_groups(&[group]);
        let doc = json!({"weight": weight});
        prop_assert_eq!(evaluate(&tree, &doc), weight == a || weight == b);
    }

    /// `ne` with values {a,b} excludes documents matching *either* value,
    /// not just documents matching both.
    #[test]
    fn prop_ne_excludes_each_value(
        a in 0i64..5,
        b in 0i64..5,
        weight in 0i64..5,
    ) {
        let group = vec![FilterExpression::new(
            "weight",
            FilterOperator::Ne,
            format!("{a},{b}"),
        )];
        let tree = compile_groups(&[group]);
        let doc = json!({"weight": weight});
        prop_assert_eq!(evaluate(&tree, &doc), weight != a && weight != b);
    }
}

// =======================================================================
// Range bracket round trips
// =======================================================================

#[test]
fn test_inclusive_range_accepts_both_bounds() {
    let group = vec![FilterExpression::new(
        "weight",
        FilterOperator::Range,
        "[100<200]",
    )];
    let tree = compile_groups(&[group]);
    assert!(evaluate(&tree, &json!({"weight": 100})));
    assert!(evaluate(&tree, &json!({"weight": 200})));
    assert!(evaluate(&tree, &json!({"weight": 150})));
    assert!(!evaluate(&tree, &json!({"weight": 99})));
}

#[test]
fn test_exclusive_range_rejects_both_bounds() {
    let group = vec![FilterExpression::new(
        "weight",
        FilterOperator::Range,
        "(100<200)",
    )];
    let tree = compile_groups(&[group]);
    assert!(!evaluate(&tree, &json!({"weight": 100})));
    assert!(!evaluate(&tree, &json!({"weight": 200})));
    assert!(evaluate(&tree, &json!({"weight": 150})));
}
