use serde_json::{Map, Value};
use uuid::Uuid;

use super::error::FilterError;
use super::filter_where::FilterWhere;
use super::types::{Condition, FilterOp, FilterWhereInfo, SqlResult, ID_FIELD};

/// Document query in the `{ field: value }` / `{ field: { "$op": value } }`
/// form, shared by every store backend.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    condition: Option<Condition>,
}

impl Filter {
    /// Matches every document.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn new(where_data: Value) -> Result<Self, FilterError> {
        match where_data {
            Value::Null => Ok(Self::all()),
            Value::Object(obj) if obj.is_empty() => Ok(Self::all()),
            Value::Object(obj) => Ok(Self {
                condition: Some(Self::parse_object(&obj)?),
            }),
            _ => Err(FilterError::InvalidWhereClause("WHERE must be an object".to_string())),
        }
    }

    /// Matches the document with the given id. Fails when `id` is not a valid id.
    pub fn by_id(id: &str) -> Result<Self, FilterError> {
        Self::new(Value::Object(Map::from_iter([(
            ID_FIELD.to_string(),
            Value::String(id.to_string()),
        )])))
    }

    pub fn condition(&self) -> Option<&Condition> {
        self.condition.as_ref()
    }

    pub fn to_where_sql(&self) -> SqlResult {
        match &self.condition {
            Some(condition) => FilterWhere::generate(condition, 0),
            None => SqlResult { query: "1=1".to_string(), params: vec![] },
        }
    }

    pub fn matches(&self, doc: &Map<String, Value>) -> bool {
        self.condition.as_ref().map_or(true, |c| Self::eval(c, doc))
    }

    fn parse_object(obj: &Map<String, Value>) -> Result<Condition, FilterError> {
        let mut conditions = Vec::with_capacity(obj.len());
        for (key, value) in obj {
            if key.starts_with('$') {
                conditions.push(Self::parse_logical_operator(key, value)?);
            } else {
                conditions.extend(Self::parse_field_condition(key, value)?);
            }
        }
        Ok(if conditions.len() == 1 {
            conditions.remove(0)
        } else {
            Condition::And(conditions)
        })
    }

    fn parse_logical_operator(op: &str, value: &Value) -> Result<Condition, FilterError> {
        match op {
            "$and" | "$or" => {
                let arr = value
                    .as_array()
                    .ok_or_else(|| FilterError::InvalidOperatorData(format!("{} requires array", op)))?;
                let mut parts = Vec::with_capacity(arr.len());
                for v in arr {
                    let obj = v.as_object().ok_or_else(|| {
                        FilterError::InvalidOperatorData(format!("{} entries must be objects", op))
                    })?;
                    parts.push(Self::parse_object(obj)?);
                }
                Ok(if op == "$and" { Condition::And(parts) } else { Condition::Or(parts) })
            }
            "$not" => {
                let obj = value
                    .as_object()
                    .ok_or_else(|| FilterError::InvalidOperatorData("$not requires object".to_string()))?;
                Ok(Condition::Not(Box::new(Self::parse_object(obj)?)))
            }
            _ => Err(FilterError::UnsupportedOperator(op.to_string())),
        }
    }

    fn parse_field_condition(field: &str, value: &Value) -> Result<Vec<Condition>, FilterError> {
        let mut conditions = vec![];
        match value {
            Value::Object(obj) if obj.keys().any(|k| k.starts_with('$')) => {
                for (op_key, op_val) in obj {
                    let operator = Self::map_operator(op_key)?;
                    conditions.push(Self::field(field, operator, op_val.clone())?);
                }
            }
            // Implicit equality: { field: value }
            _ => conditions.push(Self::field(field, FilterOp::Eq, value.clone())?),
        }
        Ok(conditions)
    }

    fn map_operator(op_key: &str) -> Result<FilterOp, FilterError> {
        Ok(match op_key {
            "$eq" => FilterOp::Eq,
            "$ne" | "$neq" => FilterOp::Ne,
            "$in" => FilterOp::In,
            "$nin" => FilterOp::NIn,
            "$exists" => FilterOp::Exists,
            other => return Err(FilterError::UnsupportedOperator(other.to_string())),
        })
    }

    fn field(field: &str, operator: FilterOp, data: Value) -> Result<Condition, FilterError> {
        let data = match operator {
            FilterOp::In | FilterOp::NIn => {
                let values = data.as_array().ok_or_else(|| {
                    FilterError::InvalidOperatorData(format!("{:?} requires array", operator))
                })?;
                if field == ID_FIELD {
                    Value::Array(values.iter().map(normalize_id).collect::<Result<_, _>>()?)
                } else {
                    Value::Array(values.clone())
                }
            }
            FilterOp::Exists => Value::Bool(data.as_bool().ok_or_else(|| {
                FilterError::InvalidOperatorData("$exists requires boolean".to_string())
            })?),
            FilterOp::Eq | FilterOp::Ne if field == ID_FIELD => normalize_id(&data)?,
            FilterOp::Eq | FilterOp::Ne => data,
        };

        Ok(Condition::Field(FilterWhereInfo {
            field: field.to_string(),
            operator,
            data,
        }))
    }

    fn eval(condition: &Condition, doc: &Map<String, Value>) -> bool {
        match condition {
            Condition::And(parts) => parts.iter().all(|c| Self::eval(c, doc)),
            Condition::Or(parts) => parts.iter().any(|c| Self::eval(c, doc)),
            Condition::Not(inner) => !Self::eval(inner, doc),
            Condition::Field(info) => {
                let actual = doc.get(&info.field);
                match info.operator {
                    FilterOp::Eq => value_eq(actual, &info.data),
                    FilterOp::Ne => !value_eq(actual, &info.data),
                    FilterOp::In => in_list(actual, &info.data),
                    FilterOp::NIn => !in_list(actual, &info.data),
                    FilterOp::Exists => actual.is_some() == info.data.as_bool().unwrap_or(true),
                }
            }
        }
    }
}

/// Null matches both a missing field and an explicit null.
fn value_eq(actual: Option<&Value>, expected: &Value) -> bool {
    match actual {
        None => expected.is_null(),
        Some(v) => v == expected,
    }
}

fn in_list(actual: Option<&Value>, list: &Value) -> bool {
    list.as_array()
        .map_or(false, |values| values.iter().any(|v| value_eq(actual, v)))
}

fn normalize_id(value: &Value) -> Result<Value, FilterError> {
    let raw = value
        .as_str()
        .ok_or_else(|| FilterError::InvalidId(value.to_string()))?;
    let id = Uuid::parse_str(raw).map_err(|_| FilterError::InvalidId(raw.to_string()))?;
    Ok(Value::String(id.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn empty_filter_matches_everything() {
        let filter = Filter::new(json!({})).unwrap();
        assert!(filter.condition().is_none());
        assert!(filter.matches(&doc(json!({ "a": 1 }))));
    }

    #[test]
    fn implicit_equality() {
        let filter = Filter::new(json!({ "hr_email": "hr@example.com" })).unwrap();
        assert!(filter.matches(&doc(json!({ "hr_email": "hr@example.com", "title": "x" }))));
        assert!(!filter.matches(&doc(json!({ "hr_email": "other@example.com" }))));
        assert!(!filter.matches(&doc(json!({ "title": "x" }))));
    }

    #[test]
    fn null_matches_missing_field() {
        let filter = Filter::new(json!({ "applicant_email": null })).unwrap();
        assert!(filter.matches(&doc(json!({ "job_id": "1" }))));
        assert!(!filter.matches(&doc(json!({ "applicant_email": "a@example.com" }))));
    }

    #[test]
    fn logical_operators() {
        let filter = Filter::new(json!({
            "$or": [ { "status": "accepted" }, { "status": { "$in": ["pending", "review"] } } ]
        }))
        .unwrap();
        assert!(filter.matches(&doc(json!({ "status": "review" }))));
        assert!(!filter.matches(&doc(json!({ "status": "rejected" }))));

        let not = Filter::new(json!({ "$not": { "status": "rejected" } })).unwrap();
        assert!(not.matches(&doc(json!({ "status": "pending" }))));
    }

    #[test]
    fn exists_operator() {
        let filter = Filter::new(json!({ "applicationCount": { "$exists": true } })).unwrap();
        assert!(filter.matches(&doc(json!({ "applicationCount": 0 }))));
        assert!(!filter.matches(&doc(json!({}))));
        assert!(Filter::new(json!({ "a": { "$exists": "yes" } })).is_err());
    }

    #[test]
    fn ids_are_validated_and_normalized() {
        let id = "3F2504E0-4F89-11D3-9A0C-0305E82C3301";
        let filter = Filter::by_id(id).unwrap();
        assert!(filter.matches(&doc(json!({ "_id": id.to_lowercase() }))));
        assert!(matches!(Filter::by_id("not-an-id"), Err(FilterError::InvalidId(_))));
        assert!(matches!(
            Filter::new(json!({ "_id": { "$in": ["nope"] } })),
            Err(FilterError::InvalidId(_))
        ));
    }

    #[test]
    fn rejects_unknown_operators() {
        assert!(matches!(
            Filter::new(json!({ "title": { "$regex": "rust" } })),
            Err(FilterError::UnsupportedOperator(_))
        ));
        assert!(matches!(
            Filter::new(json!({ "$xor": [] })),
            Err(FilterError::UnsupportedOperator(_))
        ));
        assert!(Filter::new(json!("raw sql")).is_err());
    }
}
