//! Metadata filters in operator-object form
//!
//! ```json
//! {"index": {"$eq": 3}}
//! {"$or": [{"Overall Rating": {"$gte": 8}}, {"Anime Title": {"$in": ["Mushishi"]}}]}
//! {"Anime Title": "Mushishi", "index": [1, 2]}
//! ```
//!
//! Several keys at one level are ANDed. A bare scalar means `$eq`, a bare
//! array means `$in`.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    NotIn,
}

impl FilterOp {
    fn from_key(key: &str) -> Option<Self> {
        Some(match key {
            "$eq" => FilterOp::Eq,
            "$ne" => FilterOp::Ne,
            "$gt" => FilterOp::Gt,
            "$gte" => FilterOp::Gte,
            "$lt" => FilterOp::Lt,
            "$lte" => FilterOp::Lte,
            "$in" => FilterOp::In,
            "$nin" => FilterOp::NotIn,
            _ => return None,
        })
    }

    fn key(self) -> &'static str {
        match self {
            FilterOp::Eq => "$eq",
            FilterOp::Ne => "$ne",
            FilterOp::Gt => "$gt",
            FilterOp::Gte => "$gte",
            FilterOp::Lt => "$lt",
            FilterOp::Lte => "$lte",
            FilterOp::In => "$in",
            FilterOp::NotIn => "$nin",
        }
    }
}

/// A single field comparison
#[derive(Debug, Clone, PartialEq)]
pub struct FilterCondition {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

/// Combined filter with AND/OR/NOT logic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub enum MetadataFilter {
    Condition(FilterCondition),
    And(Vec<MetadataFilter>),
    Or(Vec<MetadataFilter>),
    Not(Box<MetadataFilter>),
}

impl MetadataFilter {
    /// Exact-match filter on one field
    pub fn eq(field: &str, value: Value) -> Self {
        MetadataFilter::Condition(FilterCondition {
            field: field.to_string(),
            op: FilterOp::Eq,
            value,
        })
    }

    /// Parse a filter expression
    pub fn parse(value: &Value) -> anyhow::Result<Self> {
        let obj = value
            .as_object()
            .ok_or_else(|| anyhow::anyhow!("filter must be an object, got {}", value))?;
        parse_object(obj)
    }

    /// Check if metadata matches this filter
    pub fn matches(&self, metadata: &Map<String, Value>) -> bool {
        match self {
            MetadataFilter::Condition(cond) => cond.matches(metadata),
            MetadataFilter::And(filters) => filters.iter().all(|f| f.matches(metadata)),
            MetadataFilter::Or(filters) => filters.iter().any(|f| f.matches(metadata)),
            MetadataFilter::Not(inner) => !inner.matches(metadata),
        }
    }

    /// Render back into operator-object form
    pub fn to_value(&self) -> Value {
        match self {
            MetadataFilter::Condition(c) => {
                let mut op = Map::new();
                op.insert(c.op.key().to_string(), c.value.clone());
                let mut field = Map::new();
                field.insert(c.field.clone(), Value::Object(op));
                Value::Object(field)
            }
            MetadataFilter::And(fs) => logical("$and", fs),
            MetadataFilter::Or(fs) => logical("$or", fs),
            MetadataFilter::Not(inner) => {
                let mut m = Map::new();
                m.insert("$not".to_string(), inner.to_value());
                Value::Object(m)
            }
        }
    }
}

fn logical(key: &str, filters: &[MetadataFilter]) -> Value {
    let mut m = Map::new();
    m.insert(
        key.to_string(),
        Value::Array(filters.iter().map(MetadataFilter::to_value).collect()),
    );
    Value::Object(m)
}

impl TryFrom<Value> for MetadataFilter {
    type Error = anyhow::Error;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        MetadataFilter::parse(&value)
    }
}

impl From<MetadataFilter> for Value {
    fn from(filter: MetadataFilter) -> Self {
        filter.to_value()
    }
}

fn parse_object(obj: &Map<String, Value>) -> anyhow::Result<MetadataFilter> {
    let mut parts = Vec::with_capacity(obj.len());

    for (key, value) in obj {
        let part = match key.as_str() {
            "$and" => MetadataFilter::And(parse_list(key, value)?),
            "$or" => MetadataFilter::Or(parse_list(key, value)?),
            "$not" => MetadataFilter::Not(Box::new(MetadataFilter::parse(value)?)),
            k if k.starts_with('$') => anyhow::bail!("unknown logical operator '{}'", k),
            field => parse_field(field, value)?,
        };
        parts.push(part);
    }

    match parts.len() {
        0 => anyhow::bail!("empty filter"),
        1 => Ok(parts.remove(0)),
        _ => Ok(MetadataFilter::And(parts)),
    }
}

fn parse_list(key: &str, value: &Value) -> anyhow::Result<Vec<MetadataFilter>> {
    match value {
        Value::Array(items) => items.iter().map(MetadataFilter::parse).collect(),
        // `{"$and": {"a": 1, "b": 2}}` is accepted as shorthand
        Value::Object(obj) => obj
            .iter()
            .map(|(k, v)| parse_field(k, v))
            .collect(),
        _ => anyhow::bail!("'{}' expects a list of filters", key),
    }
}

fn parse_field(field: &str, value: &Value) -> anyhow::Result<MetadataFilter> {
    let condition = |op, value: &Value| {
        MetadataFilter::Condition(FilterCondition {
            field: field.to_string(),
            op,
            value: value.clone(),
        })
    };

    match value {
        Value::Object(ops) => {
            let mut conds = Vec::with_capacity(ops.len());
            for (op_key, operand) in ops {
                let op = FilterOp::from_key(op_key).ok_or_else(|| {
                    anyhow::anyhow!("unknown comparison operator '{}' on '{}'", op_key, field)
                })?;
                if matches!(op, FilterOp::In | FilterOp::NotIn) && !operand.is_array() {
                    anyhow::bail!("'{}' on '{}' expects a list", op_key, field);
                }
                conds.push(condition(op, operand));
            }
            match conds.len() {
                0 => anyhow::bail!("no operator given for '{}'", field),
                1 => Ok(conds.remove(0)),
                _ => Ok(MetadataFilter::And(conds)),
            }
        }
        Value::Array(_) => Ok(condition(FilterOp::In, value)),
        scalar => Ok(condition(FilterOp::Eq, scalar)),
    }
}

impl FilterCondition {
    fn ordered(&self, field_value: Option<&Value>, accept: impl Fn(Ordering) -> bool) -> bool {
        field_value
            .and_then(|v| compare_values(v, &self.value))
            .is_some_and(accept)
    }

    fn matches(&self, metadata: &Map<String, Value>) -> bool {
        let field_value = metadata.get(&self.field);

        match &self.op {
            FilterOp::Eq => field_value.is_some_and(|v| values_equal(v, &self.value)),
            FilterOp::Ne => field_value.map_or(true, |v| !values_equal(v, &self.value)),
            FilterOp::Gt => self.ordered(field_value, |o| o == Ordering::Greater),
            FilterOp::Gte => self.ordered(field_value, |o| o != Ordering::Less),
            FilterOp::Lt => self.ordered(field_value, |o| o == Ordering::Less),
            FilterOp::Lte => self.ordered(field_value, |o| o != Ordering::Greater),
            FilterOp::In => match self.value.as_array() {
                Some(arr) => field_value.is_some_and(|v| arr.iter().any(|item| values_equal(v, item))),
                None => false,
            },
            FilterOp::NotIn => match self.value.as_array() {
                Some(arr) => field_value.map_or(true, |v| !arr.iter().any(|item| values_equal(v, item))),
                None => true,
            },
        }
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::String(s1), Value::String(s2)) => s1 == s2,
        (Value::Number(n1), Value::Number(n2)) => match (n1.as_i64(), n2.as_i64()) {
            (Some(i1), Some(i2)) => i1 == i2,
            _ => n1
                .as_f64()
                .zip(n2.as_f64())
                .is_some_and(|(a, b)| (a - b).abs() < f64::EPSILON),
        },
        (Value::Bool(b1), Value::Bool(b2)) => b1 == b2,
        (Value::Null, Value::Null) => true,
        _ => false,
    }
}

/// Ordering for range operators; incomparable pairs never match
fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a.as_f64(), b.as_f64()) {
        (Some(n1), Some(n2)) => n1.partial_cmp(&n2),
        _ => match (a.as_str(), b.as_str()) {
            (Some(s1), Some(s2)) => Some(s1.cmp(s2)),
            _ => None,
        },
    }
}
