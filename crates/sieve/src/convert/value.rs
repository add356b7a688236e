use crate::{schema::FieldType, Error, Result, Value};

use serde_json::Value as Json;

/// Converts a filter operand to the type of the column it is compared to.
pub(super) fn coerce(value: &Value, ty: Option<FieldType>) -> Result<Value> {
    let Some(ty) = ty else {
        return Ok(value.clone());
    };

    Ok(match (value, ty) {
        (Value::List(items), _) => Value::List(
            items
                .iter()
                .map(|item| coerce(item, Some(ty)))
                .collect::<Result<_>>()?,
        ),
        (Value::String(s), ty) if ty.is_integer() => match s.trim().parse::<i64>() {
            Ok(v) => Value::I64(v),
            Err(_) => return Err(Error::invalid_query(format!("`{s}` is not an integer"))),
        },
        (Value::String(s), FieldType::Float | FieldType::Decimal) => match s.trim().parse::<f64>() {
            Ok(v) => Value::F64(v),
            Err(_) => return Err(Error::invalid_query(format!("`{s}` is not a number"))),
        },
        (Value::String(s), FieldType::Boolean) => match s.as_str() {
            "true" | "1" => Value::Bool(true),
            "false" | "0" => Value::Bool(false),
            _ => return Err(Error::invalid_query(format!("`{s}` is not a boolean"))),
        },
        (Value::I64(v @ (0 | 1)), FieldType::Boolean) => Value::Bool(*v == 1),
        (Value::String(s), FieldType::Uuid) => Value::String(s.to_lowercase()),
        (Value::Json(json), FieldType::Geometry) => Value::String(wkt(json)?),
        (value, _) => value.clone(),
    })
}

/// Reads the boolean flag of `_null`, `_nnull`, `_empty` and `_nempty`.
pub(super) fn flag(value: &Value) -> Result<bool> {
    match value {
        Value::String(s) if s == "true" => Ok(true),
        Value::String(s) if s == "false" => Ok(false),
        other => other
            .to_bool()
            .map_err(|_| Error::invalid_query(format!("expected a boolean flag, got {}", other.to_json()))),
    }
}

/// Operand of a `LIKE` comparison.
pub(super) fn text(value: &Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::I64(v) => Ok(v.to_string()),
        Value::F64(v) => Ok(v.to_string()),
        Value::Bool(v) => Ok(v.to_string()),
        other => Err(Error::invalid_query(format!(
            "expected a string operand, got {}",
            other.to_json()
        ))),
    }
}

/// Renders a GeoJSON geometry as well-known text.
pub(super) fn wkt(json: &Json) -> Result<String> {
    let kind = json.get("type").and_then(Json::as_str);
    let coordinates = json.get("coordinates");

    match (kind, coordinates) {
        (Some("Point"), Some(point)) => Ok(format!("POINT({})", position(point)?)),
        (Some("LineString"), Some(line)) => Ok(format!("LINESTRING({})", positions(line)?)),
        (Some("Polygon"), Some(Json::Array(rings))) => {
            let rings = rings
                .iter()
                .map(|ring| positions(ring).map(|ring| format!("({ring})")))
                .collect::<Result<Vec<_>>>()?;
            Ok(format!("POLYGON({})", rings.join(", ")))
        }
        _ => Err(Error::invalid_query(format!(
            "unsupported geometry `{json}`"
        ))),
    }
}

fn position(json: &Json) -> Result<String> {
    match json.as_array().map(Vec::as_slice) {
        Some([Json::Number(x), Json::Number(y), ..]) => Ok(format!("{x} {y}")),
        _ => Err(Error::invalid_query(format!("invalid position `{json}`"))),
    }
}

fn positions(json: &Json) -> Result<String> {
    let Json::Array(items) = json else {
        return Err(Error::invalid_query(format!("invalid coordinates `{json}`")));
    };

    Ok(items
        .iter()
        .map(position)
        .collect::<Result<Vec<_>>>()?
        .join(", "))
}
