use serde_json::Value;
use uuid::Uuid;

use super::types::{Condition, FilterOp, FilterWhereInfo, SqlParam, SqlResult, ID_FIELD};

/// Renders a parsed filter as a parameterized predicate over a
/// `(id UUID, doc JSONB)` table. Field names are bound, never interpolated.
pub struct FilterWhere {
    param_values: Vec<SqlParam>,
    param_index: usize,
}

impl FilterWhere {
    pub fn new(starting_param_index: usize) -> Self {
        Self {
            param_values: vec![],
            param_index: starting_param_index,
        }
    }

    pub fn generate(condition: &Condition, starting_param_index: usize) -> SqlResult {
        let mut filter_where = Self::new(starting_param_index);
        let query = filter_where.build(condition);
        SqlResult {
            query,
            params: filter_where.param_values,
        }
    }

    fn build(&mut self, condition: &Condition) -> String {
        match condition {
            Condition::And(parts) => self.join(parts, " AND ", "1=1"),
            Condition::Or(parts) => self.join(parts, " OR ", "1=0"),
            Condition::Not(inner) => format!("NOT ({})", self.build(inner)),
            Condition::Field(info) => self.build_field_condition(info),
        }
    }

    fn join(&mut self, parts: &[Condition], joiner: &str, empty: &str) -> String {
        if parts.is_empty() {
            return empty.to_string();
        }
        parts
            .iter()
            .map(|c| format!("({})", self.build(c)))
            .collect::<Vec<_>>()
            .join(joiner)
    }

    fn build_field_condition(&mut self, info: &FilterWhereInfo) -> String {
        if info.field == ID_FIELD {
            return self.build_id_condition(info);
        }

        let field = self.param(SqlParam::Text(info.field.clone()));
        let column = format!("\"doc\" -> {}", field);
        match info.operator {
            FilterOp::Eq => {
                if info.data.is_null() {
                    format!("({0} IS NULL OR {0} = 'null'::jsonb)", column)
                } else {
                    format!("{} = {}", column, self.param(SqlParam::Json(info.data.clone())))
                }
            }
            FilterOp::Ne => {
                if info.data.is_null() {
                    format!("({0} IS NOT NULL AND {0} <> 'null'::jsonb)", column)
                } else {
                    format!("({0} IS NULL OR {0} <> {1})", column, self.param(SqlParam::Json(info.data.clone())))
                }
            }
            FilterOp::In | FilterOp::NIn => {
                let values = info.data.as_array().cloned().unwrap_or_default();
                let matches_null = values.iter().any(Value::is_null);
                let params: Vec<String> = values
                    .into_iter()
                    .filter(|v| !v.is_null())
                    .map(|v| self.param(SqlParam::Json(v)))
                    .collect();
                let mut alternatives = vec![];
                if !params.is_empty() {
                    alternatives.push(format!("{} IN ({})", column, params.join(", ")));
                }
                if matches_null {
                    alternatives.push(format!("({0} IS NULL OR {0} = 'null'::jsonb)", column));
                }
                let positive = if alternatives.is_empty() {
                    "1=0".to_string()
                } else {
                    format!("({})", alternatives.join(" OR "))
                };
                if info.operator == FilterOp::In {
                    positive
                } else {
                    format!("NOT COALESCE({}, false)", positive)
                }
            }
            FilterOp::Exists => {
                let exists = format!("jsonb_exists(\"doc\", {})", field);
                if info.data.as_bool().unwrap_or(true) {
                    exists
                } else {
                    format!("NOT {}", exists)
                }
            }
        }
    }

    /// `_id` lives in the primary key column. Values were normalized at parse time.
    fn build_id_condition(&mut self, info: &FilterWhereInfo) -> String {
        let ids: Vec<Uuid> = match &info.data {
            Value::Array(values) => values.iter().filter_map(parse_uuid).collect(),
            other => parse_uuid(other).into_iter().collect(),
        };
        match info.operator {
            FilterOp::Eq | FilterOp::In if ids.is_empty() => "1=0".to_string(),
            FilterOp::Ne | FilterOp::NIn if ids.is_empty() => "1=1".to_string(),
            FilterOp::Eq => format!("\"id\" = {}", self.param(SqlParam::Uuid(ids[0]))),
            FilterOp::Ne => format!("\"id\" <> {}", self.param(SqlParam::Uuid(ids[0]))),
            FilterOp::In | FilterOp::NIn => {
                let params: Vec<String> = ids.into_iter().map(|id| self.param(SqlParam::Uuid(id))).collect();
                let keyword = if info.operator == FilterOp::In { "IN" } else { "NOT IN" };
                format!("\"id\" {} ({})", keyword, params.join(", "))
            }
            // Every stored document has an id
            FilterOp::Exists => {
                if info.data.as_bool().unwrap_or(true) { "1=1" } else { "1=0" }.to_string()
            }
        }
    }

    fn param(&mut self, value: SqlParam) -> String {
        self.param_values.push(value);
        self.param_index += 1;
        format!("${}", self.param_index)
    }
}

fn parse_uuid(value: &Value) -> Option<Uuid> {
    value.as_str().and_then(|s| Uuid::parse_str(s).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::Filter;
    use serde_json::json;

    fn sql(where_data: Value) -> SqlResult {
        Filter::new(where_data).unwrap().to_where_sql()
    }

    #[test]
    fn empty_filter_is_tautology() {
        let result = Filter::all().to_where_sql();
        assert_eq!(result.query, "1=1");
        assert!(result.params.is_empty());
    }

    #[test]
    fn field_equality_binds_name_and_value() {
        let result = sql(json!({ "hr_email": "hr@example.com" }));
        assert_eq!(result.query, "\"doc\" -> $1 = $2");
        assert_eq!(
            result.params,
            vec![
                SqlParam::Text("hr_email".to_string()),
                SqlParam::Json(json!("hr@example.com")),
            ]
        );
    }

    #[test]
    fn id_equality_uses_primary_key() {
        let id = Uuid::new_v4();
        let result = sql(json!({ "_id": id.to_string() }));
        assert_eq!(result.query, "\"id\" = $1");
        assert_eq!(result.params, vec![SqlParam::Uuid(id)]);
    }

    #[test]
    fn conjunction_numbers_params_in_order() {
        let result = sql(json!({ "$and": [ { "a": 1 }, { "b": { "$ne": 2 } } ] }));
        assert_eq!(
            result.query,
            "(\"doc\" -> $1 = $2) AND ((\"doc\" -> $3 IS NULL OR \"doc\" -> $3 <> $4))"
        );
        assert_eq!(result.params.len(), 4);
    }

    #[test]
    fn empty_in_never_matches() {
        let result = sql(json!({ "status": { "$in": [] } }));
        assert_eq!(result.query, "1=0");
    }

    #[test]
    fn exists_uses_key_lookup() {
        let result = sql(json!({ "applicationCount": { "$exists": false } }));
        assert_eq!(result.query, "NOT jsonb_exists(\"doc\", $1)");
    }

    #[test]
    fn null_equality_covers_missing_fields() {
        let result = sql(json!({ "applicant_email": null }));
        assert_eq!(result.query, "(\"doc\" -> $1 IS NULL OR \"doc\" -> $1 = 'null'::jsonb)");
        assert_eq!(result.params.len(), 1);
    }
}
