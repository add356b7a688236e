use super::{Condition, Filter};

use serde::Serialize;
use serde_json::{json, Map, Value as Json};

impl Filter {
    /// Renders the filter back to its JSON form.
    pub fn to_json(&self) -> Json {
        match self {
            Filter::And(operands) if operands.is_empty() => Json::Object(Map::new()),
            Filter::And(operands) => {
                json!({ "_and": operands.iter().map(Filter::to_json).collect::<Vec<_>>() })
            }
            Filter::Or(operands) => {
                json!({ "_or": operands.iter().map(Filter::to_json).collect::<Vec<_>>() })
            }
            Filter::Field(field) => {
                let condition = match &field.condition {
                    Condition::Compare { op, value } => {
                        let mut map = Map::new();
                        map.insert(op.as_str().to_string(), value.to_json());
                        Json::Object(map)
                    }
                    Condition::Related(filter) => filter.to_json(),
                    Condition::Some(filter) => json!({ "_some": filter.to_json() }),
                    Condition::None(filter) => json!({ "_none": filter.to_json() }),
                };

                let mut map = Map::new();
                map.insert(field.key.clone(), condition);
                Json::Object(map)
            }
        }
    }
}

impl serde::Serialize for Filter {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shifted_filter_renders_flat() {
        let filter = Filter::from_json(&json!({
            "date": {"_and": [{"_gte": 1}, {"_lt": 5}]}
        }))
        .unwrap();

        assert_eq!(
            filter.to_json(),
            json!({"_and": [{"date": {"_gte": 1}}, {"date": {"_lt": 5}}]})
        );
    }

    #[test]
    fn relational_filter_renders_nested() {
        let filter = Filter::related("author", Filter::eq("name", "Ada"));
        assert_eq!(filter.to_json(), json!({"author": {"name": {"_eq": "Ada"}}}));
    }
}
