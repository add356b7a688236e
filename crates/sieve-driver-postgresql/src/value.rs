use sieve_core::stmt::Value as CoreValue;
use tokio_postgres::{
    types::{accepts, private::BytesMut, to_sql_checked, IsNull, ToSql, Type},
    Row,
};

#[derive(Debug)]
pub struct Value<'a>(&'a CoreValue);

impl<'a> From<&'a CoreValue> for Value<'a> {
    fn from(value: &'a CoreValue) -> Self {
        Self(value)
    }
}

type BoxError = Box<dyn std::error::Error + Sync + Send>;

impl ToSql for Value<'_> {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError>
    where
        Self: Sized,
    {
        match self.0 {
            CoreValue::Null => Ok(IsNull::Yes),
            CoreValue::Bool(value) => value.to_sql(ty, out),
            CoreValue::I64(value) => match *ty {
                Type::INT2 => i16::try_from(*value)?.to_sql(ty, out),
                Type::INT4 => i32::try_from(*value)?.to_sql(ty, out),
                Type::FLOAT4 => (*value as f32).to_sql(ty, out),
                Type::FLOAT8 => (*value as f64).to_sql(ty, out),
                Type::TEXT | Type::VARCHAR => value.to_string().to_sql(ty, out),
                _ => value.to_sql(ty, out),
            },
            CoreValue::F64(value) => match *ty {
                Type::FLOAT4 => (*value as f32).to_sql(ty, out),
                _ => value.to_sql(ty, out),
            },
            CoreValue::String(value) => match *ty {
                Type::UUID => uuid::Uuid::parse_str(value)?.to_sql(ty, out),
                Type::JSON | Type::JSONB => serde_json::Value::String(value.clone()).to_sql(ty, out),
                Type::TIMESTAMPTZ => value
                    .parse::<chrono::DateTime<chrono::Utc>>()?
                    .to_sql(ty, out),
                Type::TIMESTAMP => value
                    .parse::<chrono::NaiveDateTime>()?
                    .to_sql(ty, out),
                Type::DATE => value.parse::<chrono::NaiveDate>()?.to_sql(ty, out),
                _ => value.to_sql(ty, out),
            },
            CoreValue::Json(value) => value.to_sql(ty, out),
            CoreValue::List(_) => Err("lists cannot be bound as a single PostgreSQL parameter".into()),
        }
    }

    accepts!(
        BOOL,
        INT2,
        INT4,
        INT8,
        FLOAT4,
        FLOAT8,
        TEXT,
        VARCHAR,
        BPCHAR,
        NAME,
        UUID,
        JSON,
        JSONB,
        TIMESTAMP,
        TIMESTAMPTZ,
        DATE
    );
    to_sql_checked!();
}

/// Reads column `index` of `row`. Types without a natural scalar are read
/// as text.
pub fn from_row(row: &Row, index: usize) -> Result<CoreValue, tokio_postgres::Error> {
    let ty = row.columns()[index].type_().clone();

    let value = match ty {
        Type::BOOL => row.try_get::<_, Option<bool>>(index)?.map(CoreValue::Bool),
        Type::INT2 => row
            .try_get::<_, Option<i16>>(index)?
            .map(|v| CoreValue::I64(v.into())),
        Type::INT4 => row
            .try_get::<_, Option<i32>>(index)?
            .map(|v| CoreValue::I64(v.into())),
        Type::INT8 => row.try_get::<_, Option<i64>>(index)?.map(CoreValue::I64),
        Type::FLOAT4 => row
            .try_get::<_, Option<f32>>(index)?
            .map(|v| CoreValue::F64(v.into())),
        Type::FLOAT8 => row.try_get::<_, Option<f64>>(index)?.map(CoreValue::F64),
        Type::UUID => row
            .try_get::<_, Option<uuid::Uuid>>(index)?
            .map(|v| CoreValue::String(v.to_string())),
        Type::JSON | Type::JSONB => row
            .try_get::<_, Option<serde_json::Value>>(index)?
            .map(|v| CoreValue::from_json(&v)),
        Type::TIMESTAMPTZ => row
            .try_get::<_, Option<chrono::DateTime<chrono::Utc>>>(index)?
            .map(|v| CoreValue::String(v.to_rfc3339())),
        Type::TIMESTAMP => row
            .try_get::<_, Option<chrono::NaiveDateTime>>(index)?
            .map(|v| CoreValue::String(v.format("%Y-%m-%dT%H:%M:%S%.f").to_string())),
        Type::DATE => row
            .try_get::<_, Option<chrono::NaiveDate>>(index)?
            .map(|v| CoreValue::String(v.to_string())),
        _ => row.try_get::<_, Option<String>>(index)?.map(CoreValue::String),
    };

    Ok(value.unwrap_or(CoreValue::Null))
}
