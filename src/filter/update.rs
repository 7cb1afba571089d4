use serde_json::{Map, Number, Value};

use super::error::FilterError;
use super::types::{SqlParam, SqlResult, ID_FIELD};

/// Document update in the `{ "$set": {...}, "$inc": {...} }` form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Update {
    set: Map<String, Value>,
    inc: Map<String, Value>,
}

impl Update {
    pub fn new(update_data: Value) -> Result<Self, FilterError> {
        let obj = match update_data {
            Value::Object(obj) => obj,
            _ => return Err(FilterError::InvalidUpdate("update must be an object".to_string())),
        };

        let mut update = Self::default();
        for (op, fields) in obj {
            let fields = match fields {
                Value::Object(fields) => fields,
                _ => return Err(FilterError::InvalidUpdate(format!("{} requires object", op))),
            };
            for (field, value) in fields {
                update = match op.as_str() {
                    "$set" => update.set(field, value)?,
                    "$inc" => update.inc(field, value)?,
                    other => return Err(FilterError::UnsupportedOperator(other.to_string())),
                };
            }
        }
        Ok(update)
    }

    pub fn set(mut self, field: impl Into<String>, value: Value) -> Result<Self, FilterError> {
        let field = self.check_field(field.into())?;
        self.set.insert(field, value);
        Ok(self)
    }

    pub fn inc(mut self, field: impl Into<String>, by: impl Into<Value>) -> Result<Self, FilterError> {
        let field = self.check_field(field.into())?;
        let by = by.into();
        if !by.is_number() {
            return Err(FilterError::InvalidUpdate(format!("$inc for '{}' must be a number", field)));
        }
        self.inc.insert(field, by);
        Ok(self)
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.inc.is_empty()
    }

    fn check_field(&self, field: String) -> Result<String, FilterError> {
        if field.is_empty() || field.starts_with('$') {
            return Err(FilterError::InvalidUpdate(format!("invalid field name '{}'", field)));
        }
        if field == ID_FIELD {
            return Err(FilterError::InvalidUpdate("_id is immutable".to_string()));
        }
        if self.set.contains_key(&field) || self.inc.contains_key(&field) {
            return Err(FilterError::InvalidUpdate(format!("conflicting updates for '{}'", field)));
        }
        Ok(field)
    }

    /// Apply in place. Returns whether the document changed.
    pub fn apply(&self, doc: &mut Map<String, Value>) -> Result<bool, FilterError> {
        let mut next = doc.clone();
        for (field, value) in &self.set {
            next.insert(field.clone(), value.clone());
        }
        for (field, by) in &self.inc {
            let current = next.get(field).cloned().unwrap_or(Value::from(0));
            next.insert(field.clone(), add_numbers(field, &current, by)?);
        }

        let changed = next != *doc;
        *doc = next;
        Ok(changed)
    }

    /// SQL expression producing the updated `doc` column value.
    pub fn to_sql_expr(&self, starting_param_index: usize) -> SqlResult {
        let mut params = vec![];
        let mut index = starting_param_index;
        let mut next_param = |value: SqlParam, params: &mut Vec<SqlParam>| {
            params.push(value);
            index += 1;
            format!("${}", index)
        };

        let mut expr = "\"doc\"".to_string();
        if !self.set.is_empty() {
            let p = next_param(SqlParam::Json(Value::Object(self.set.clone())), &mut params);
            expr = format!("({} || {}::jsonb)", expr, p);
        }
        for (field, by) in &self.inc {
            let name = next_param(SqlParam::Text(field.clone()), &mut params);
            let by = match by.as_i64() {
                Some(i) => next_param(SqlParam::Int(i), &mut params),
                None => next_param(SqlParam::Json(by.clone()), &mut params),
            };
            expr = format!(
                "jsonb_set({expr}, ARRAY[{name}::text], to_jsonb(COALESCE((\"doc\" ->> {name})::numeric, 0) + ({by})::text::numeric), true)",
            );
        }
        SqlResult { query: expr, params }
    }
}

fn add_numbers(field: &str, current: &Value, by: &Value) -> Result<Value, FilterError> {
    let not_numeric = || FilterError::InvalidUpdate(format!("cannot $inc non-numeric field '{}'", field));
    let current = match current {
        Value::Number(n) => n,
        Value::Null => return Ok(by.clone()),
        _ => return Err(not_numeric()),
    };
    let by = match by {
        Value::Number(n) => n,
        _ => return Err(not_numeric()),
    };

    if let (Some(a), Some(b)) = (current.as_i64(), by.as_i64()) {
        if let Some(sum) = a.checked_add(b) {
            return Ok(Value::from(sum));
        }
    }
    let sum = current.as_f64().unwrap_or(0.0) + by.as_f64().unwrap_or(0.0);
    Number::from_f64(sum).map(Value::Number).ok_or_else(not_numeric)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn set_overwrites_only_named_fields() {
        let update = Update::new(json!({ "$set": { "status": "accepted" } })).unwrap();
        let mut d = doc(json!({ "status": "pending", "job_id": "j1" }));
        assert!(update.apply(&mut d).unwrap());
        assert_eq!(Value::Object(d), json!({ "status": "accepted", "job_id": "j1" }));
    }

    #[test]
    fn unchanged_set_reports_no_modification() {
        let update = Update::default().set("status", json!("pending")).unwrap();
        let mut d = doc(json!({ "status": "pending" }));
        assert!(!update.apply(&mut d).unwrap());
    }

    #[test]
    fn inc_creates_missing_counter() {
        let update = Update::default().inc("applicationCount", 1).unwrap();
        let mut d = doc(json!({ "title": "Rust dev" }));
        update.apply(&mut d).unwrap();
        assert_eq!(d["applicationCount"], json!(1));
        update.apply(&mut d).unwrap();
        assert_eq!(d["applicationCount"], json!(2));
    }

    #[test]
    fn inc_rejects_non_numeric_targets() {
        let update = Update::default().inc("title", 1).unwrap();
        let mut d = doc(json!({ "title": "Rust dev" }));
        assert!(update.apply(&mut d).is_err());
        assert!(Update::default().inc("n", json!("one")).is_err());
    }

    #[test]
    fn rejects_id_and_conflicts() {
        assert!(Update::new(json!({ "$set": { "_id": "x" } })).is_err());
        assert!(Update::new(json!({ "$set": { "n": 1 }, "$inc": { "n": 1 } })).is_err());
        assert!(matches!(
            Update::new(json!({ "$unset": { "n": "" } })),
            Err(FilterError::UnsupportedOperator(_))
        ));
    }

    #[test]
    fn sql_expression_chains_set_then_inc() {
        let update = Update::new(json!({ "$set": { "a": 1 }, "$inc": { "n": 1 } })).unwrap();
        let result = update.to_sql_expr(2);
        assert_eq!(
            result.query,
            "jsonb_set((\"doc\" || $3::jsonb), ARRAY[$4::text], to_jsonb(COALESCE((\"doc\" ->> $4)::numeric, 0) + ($5)::text::numeric), true)"
        );
        assert_eq!(
            result.params,
            vec![
                SqlParam::Json(json!({ "a": 1 })),
                SqlParam::Text("n".to_string()),
                SqlParam::Int(1),
            ]
        );
    }
}
