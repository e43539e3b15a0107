//! Filter expressions: the request-side predicate vocabulary.
//!
//! A request carries an ordered list of OR-groups ([`MultiValueFilter`]); the
//! expressions inside one group are combined with OR, and the groups are
//! combined with AND. That is the only composition rule the surface offers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// One OR-group of filter expressions.
///
/// Must be non-empty; sibling groups supplied in the same request are ANDed.
pub type MultiValueFilter<T> = Vec<T>;

/// Comparison operator of a [`FilterExpression`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterOperator {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    Range,
    /// Substring match, emulated as an anchor-free regexp (`.*value.*`).
    /// Regex metacharacters in the value are NOT escaped; on analyzed text
    /// fields a phrase match would behave better. Known limitation, kept.
    Like,
    Within,
    Notwithin,
    Intersects,
    Notintersects,
}

impl FilterOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOperator::Eq => "eq",
            FilterOperator::Ne => "ne",
            FilterOperator::Gt => "gt",
            FilterOperator::Gte => "gte",
            FilterOperator::Lt => "lt",
            FilterOperator::Lte => "lte",
            FilterOperator::Range => "range",
            FilterOperator::Like => "like",
            FilterOperator::Within => "within",
            FilterOperator::Notwithin => "notwithin",
            FilterOperator::Intersects => "intersects",
            FilterOperator::Notintersects => "notintersects",
        }
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterOperator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "eq" => Ok(FilterOperator::Eq),
            "ne" => Ok(FilterOperator::Ne),
            "gt" => Ok(FilterOperator::Gt),
            "gte" => Ok(FilterOperator::Gte),
            "lt" => Ok(FilterOperator::Lt),
            "lte" => Ok(FilterOperator::Lte),
            "range" => Ok(FilterOperator::Range),
            "like" => Ok(FilterOperator::Like),
            "within" => Ok(FilterOperator::Within),
            "notwithin" => Ok(FilterOperator::Notwithin),
            "intersects" => Ok(FilterOperator::Intersects),
            "notintersects" => Ok(FilterOperator::Notintersects),
            other => Err(Error::InvalidParameter(format!(
                "unknown filter operator: {other}"
            ))),
        }
    }
}

/// One `field / operator / value` predicate.
///
/// `value` may carry several comma-separated literals; how they combine
/// depends on the operator (OR for `eq`-style operators, AND of negations
/// for `ne`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterExpression {
    pub field: String,
    pub op: FilterOperator,
    pub value: String,
}

impl FilterExpression {
    pub fn new(field: impl Into<String>, op: FilterOperator, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    /// Field and value must both be non-empty.
    pub fn validate(&self) -> Result<()> {
        if self.field.is_empty() || self.value.is_empty() {
            return Err(Error::InvalidParameter(format!(
                "filter expression requires a field, an operator and a value, got '{}:{}:{}'",
                self.field, self.op, self.value
            )));
        }
        Ok(())
    }

    /// The comma-separated literals carried by `value`.
    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.value.split(',').map(str::trim)
    }
}

impl FromStr for FilterExpression {
    type Err = Error;

    /// Parses the `field:op:value` wire form. The value may itself contain
    /// `:` (dates, WKT), so only the first two separators are structural.
    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.splitn(3, ':');
        let (field, op, value) = match (parts.next(), parts.next(), parts.next()) {
            (Some(f), Some(o), Some(v)) => (f, o, v),
            _ => {
                return Err(Error::InvalidParameter(format!(
                    "filter expression must be of the form field:operator:value, got '{s}'"
                )))
            }
        };
        let expr = FilterExpression::new(field, op.parse()?, value);
        expr.validate()?;
        Ok(expr)
    }
}

/// A bracketed interval literal: `[min<max)` / `(min<max]`.
///
/// The leading and trailing bracket characters select inclusive (`[`, `]`)
/// vs exclusive (`(`, `)`) bounds per side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeInterval {
    pub min: String,
    pub max: String,
    pub include_min: bool,
    pub include_max: bool,
}

impl RangeInterval {
    pub fn parse(literal: &str) -> Result<Self> {
        let invalid = || {
            Error::InvalidParameter(format!(
                "range value must be of the form [min<max] or (min<max), got '{literal}'"
            ))
        };

        let mut chars = literal.chars();
        let include_min = match chars.next() {
            Some('[') => true,
            Some('(') => false,
            _ => return Err(invalid()),
        };
        let include_max = match chars.next_back() {
            Some(']') => true,
            Some(')') => false,
            _ => return Err(invalid()),
        };

        let inner = &literal[1..literal.len() - 1];
        let (min, max) = inner.split_once('<').ok_or_else(invalid)?;
        if min.is_empty() || max.is_empty() {
            return Err(invalid());
        }
        Ok(RangeInterval {
            min: min.to_string(),
            max: max.to_string(),
            include_min,
            include_max,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ===================================================================
    // FilterExpression parsing
    // ===================================================================

    #[test]
    fn test_parse_expression() {
        let e: FilterExpression = "status:eq:active".parse().unwrap();
        assert_eq!(e.field, "status");
        assert_eq!(e.op, FilterOperator::Eq);
        assert_eq!(e.value, "active");
    }

    #[test]
    fn test_parse_expression_value_with_separators() {
        let e: FilterExpression = "startdate:gte:2020-01-01T00:00:00Z".parse().unwrap();
        assert_eq!(e.value, "2020-01-01T00:00:00Z");
    }

    #[test]
    fn test_parse_unknown_operator() {
        let err = "status:matches:x".parse::<FilterExpression>().unwrap_err();
        assert!(matches!(err, Error::InvalidParameter(_)));
    }

    #[test]
    fn test_parse_missing_parts() {
        assert!("status:eq".parse::<FilterExpression>().is_err());
        assert!(":eq:v".parse::<FilterExpression>().is_err());
        assert!("status:eq:".parse::<FilterExpression>().is_err());
    }

    #[test]
    fn test_multi_values_are_trimmed() {
        let e = FilterExpression::new("s", FilterOperator::Eq, "a, b ,c");
        let vs: Vec<&str> = e.values().collect();
        assert_eq!(vs, vec!["a", "b", "c"]);
    }

    // ===================================================================
    // RangeInterval brackets
    // ===================================================================

    #[test]
    fn test_interval_inclusive_both() {
        let r = RangeInterval::parse("[100<200]").unwrap();
        assert_eq!(r.min, "100");
        assert_eq!(r.max, "200");
        assert!(r.include_min);
        assert!(r.include_max);
    }

    #[test]
    fn test_interval_exclusive_both() {
        let r = RangeInterval::parse("(100<200)").unwrap();
        assert!(!r.include_min);
        assert!(!r.include_max);
    }

    #[test]
    fn test_interval_mixed_brackets() {
        let r = RangeInterval::parse("(100<200]").unwrap();
        assert!(!r.include_min);
        assert!(r.include_max);
    }

    #[test]
    fn test_interval_rejects_malformed() {
        assert!(RangeInterval::parse("100<200").is_err());
        assert!(RangeInterval::parse("[100..200]").is_err());
        assert!(RangeInterval::parse("[<200]").is_err());
        assert!(RangeInterval::parse("[100<]").is_err());
    }
}
