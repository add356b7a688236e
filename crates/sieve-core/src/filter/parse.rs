use super::{Condition, FieldFilter, Filter, Operator};
use crate::{stmt::Value, Error, Result};

use serde::Deserialize;
use serde_json::{Map, Value as Json};

impl Filter {
    /// Parses a filter from its JSON form.
    ///
    /// `null` and `{}` both parse to the unconditional filter. A non-object
    /// value under a field key is an implicit `_eq`.
    pub fn from_json(json: &Json) -> Result<Filter> {
        match json {
            Json::Null => Ok(Filter::all()),
            Json::Object(map) => parse_object(map),
            other => Err(Error::invalid_query(format!(
                "filter must be an object, got `{other}`"
            ))),
        }
    }
}

impl<'de> serde::Deserialize<'de> for Filter {
    fn deserialize<D: serde::Deserializer<'de>>(
        deserializer: D,
    ) -> core::result::Result<Filter, D::Error> {
        let json = Json::deserialize(deserializer)?;
        Filter::from_json(&json).map_err(serde::de::Error::custom)
    }
}

fn parse_object(map: &Map<String, Json>) -> Result<Filter> {
    let mut operands = Vec::with_capacity(map.len());

    for (key, value) in map {
        match key.as_str() {
            "_and" => operands.push(Filter::And(parse_list(key, value)?)),
            "_or" => operands.push(Filter::Or(parse_list(key, value)?)),
            // An empty key carries no condition.
            "" => {}
            _ => operands.push(parse_field(key, value)?),
        }
    }

    Ok(flatten(operands))
}

fn parse_list(key: &str, value: &Json) -> Result<Vec<Filter>> {
    let Json::Array(items) = value else {
        return Err(Error::invalid_query(format!("`{key}` expects a list")));
    };

    items.iter().map(Filter::from_json).collect()
}

fn parse_field(key: &str, value: &Json) -> Result<Filter> {
    let Json::Object(map) = value else {
        return Ok(Filter::compare(key, Operator::Eq, Value::from_json(value)));
    };

    let mut operands = vec![];
    let mut nested = Map::new();

    for (name, operand) in map {
        match name.as_str() {
            // `{date: {_and: [{_gte: a}, {_lt: b}]}}` becomes
            // `{_and: [{date: {_gte: a}}, {date: {_lt: b}}]}`.
            "_and" | "_or" => {
                let Json::Array(items) = operand else {
                    return Err(Error::invalid_query(format!("`{name}` expects a list")));
                };

                let shifted = items
                    .iter()
                    .map(|item| parse_field(key, item))
                    .collect::<Result<Vec<_>>>()?;

                operands.push(if name == "_and" {
                    Filter::And(shifted)
                } else {
                    Filter::Or(shifted)
                });
            }
            "_some" => operands.push(Filter::Field(FieldFilter {
                key: key.to_string(),
                condition: Condition::Some(Box::new(Filter::from_json(operand)?)),
            })),
            "_none" => operands.push(Filter::Field(FieldFilter {
                key: key.to_string(),
                condition: Condition::None(Box::new(Filter::from_json(operand)?)),
            })),
            op if op.starts_with('_') => {
                let Some(op) = Operator::parse(op) else {
                    return Err(Error::invalid_query(format!(
                        "unknown filter operator `{op}` on field `{key}`"
                    )));
                };

                operands.push(Filter::compare(key, op, parse_operand(op, operand)));
            }
            _ => {
                nested.insert(name.clone(), operand.clone());
            }
        }
    }

    if !nested.is_empty() {
        operands.push(Filter::Field(FieldFilter {
            key: key.to_string(),
            condition: Condition::Related(Box::new(parse_object(&nested)?)),
        }));
    }

    Ok(flatten(operands))
}

fn parse_operand(op: Operator, operand: &Json) -> Value {
    let value = Value::from_json(operand);

    if !op.takes_list() {
        return value;
    }

    match value {
        Value::List(_) => value,
        // `_in: "a,b"` is shorthand for `_in: ["a", "b"]`.
        Value::String(csv) => Value::List(
            csv.split(',')
                .map(|item| Value::String(item.trim().to_string()))
                .collect(),
        ),
        Value::Null => Value::List(vec![]),
        other => Value::List(vec![other]),
    }
}

fn flatten(mut operands: Vec<Filter>) -> Filter {
    if operands.len() == 1 {
        operands.remove(0)
    } else {
        Filter::And(operands)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn implicit_eq() {
        let filter = Filter::from_json(&json!({"status": "published"})).unwrap();
        assert_eq!(filter, Filter::eq("status", "published"));
    }

    #[test]
    fn multiple_keys_are_and() {
        let filter =
            Filter::from_json(&json!({"status": {"_eq": "published"}, "rank": {"_gt": 3}}))
                .unwrap();
        assert_eq!(
            filter,
            Filter::and([
                Filter::eq("status", "published"),
                Filter::compare("rank", Operator::Gt, 3),
            ])
        );
    }

    #[test]
    fn field_level_and_is_shifted_up() {
        let filter = Filter::from_json(&json!({
            "date": {"_and": [{"_gte": "2024-01-01"}, {"_lt": "2025-01-01"}]}
        }))
        .unwrap();

        assert_eq!(
            filter,
            Filter::and([
                Filter::compare("date", Operator::Gte, "2024-01-01"),
                Filter::compare("date", Operator::Lt, "2025-01-01"),
            ])
        );
    }

    #[test]
    fn relational_nesting() {
        let filter = Filter::from_json(&json!({"author": {"name": {"_eq": "Ada"}}})).unwrap();
        assert_eq!(filter, Filter::related("author", Filter::eq("name", "Ada")));
    }

    #[test]
    fn some_and_none() {
        let filter =
            Filter::from_json(&json!({"comments": {"_none": {"spam": {"_eq": true}}}})).unwrap();

        let Filter::Field(field) = filter else {
            panic!("expected a field filter");
        };
        assert_eq!(field.key, "comments");
        assert!(matches!(field.condition, Condition::None(_)));
    }

    #[test]
    fn in_accepts_csv() {
        let filter = Filter::from_json(&json!({"status": {"_in": "draft, published"}})).unwrap();
        assert_eq!(
            filter,
            Filter::compare(
                "status",
                Operator::In,
                Value::List(vec!["draft".into(), "published".into()])
            )
        );
    }

    #[test]
    fn unknown_operator() {
        let err = Filter::from_json(&json!({"status": {"_like": "x"}})).unwrap_err();
        assert!(err.is_invalid_query());
        assert_eq!(
            err.to_string(),
            "invalid query: unknown filter operator `_like` on field `status`"
        );
    }

    #[test]
    fn empty_key_is_ignored() {
        let filter = Filter::from_json(&json!({"": {}})).unwrap();
        assert!(filter.is_unconditional());
    }

    #[test]
    fn deserialize_through_serde() {
        let filter: Filter = serde_json::from_value(json!({"id": {"_eq": 1}})).unwrap();
        assert_eq!(filter, Filter::eq("id", 1));
    }
}
