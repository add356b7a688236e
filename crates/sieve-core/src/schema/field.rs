use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Field {
    #[serde(default)]
    pub name: String,

    #[serde(rename = "type")]
    pub ty: FieldType,

    #[serde(default = "default_nullable")]
    pub nullable: bool,

    #[serde(default)]
    pub generated: bool,

    /// Special flags such as `m2o`, `o2m`, `cast-boolean`, `uuid`
    #[serde(default)]
    pub special: Vec<String>,

    #[serde(default)]
    pub precision: Option<u32>,

    #[serde(default)]
    pub scale: Option<u32>,
}

fn default_nullable() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldType {
    String,
    Text,
    Uuid,
    Hash,
    Csv,
    Integer,
    BigInteger,
    Float,
    Decimal,
    Boolean,
    Date,
    DateTime,
    Time,
    Timestamp,
    Json,
    Geometry,
    /// Not backed by a column (o2m back-references, presentation fields)
    Alias,
    #[serde(other)]
    Unknown,
}

impl Field {
    pub fn new(name: impl Into<String>, ty: FieldType) -> Field {
        Field {
            name: name.into(),
            ty,
            nullable: true,
            generated: false,
            special: vec![],
            precision: None,
            scale: None,
        }
    }

    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn generated(mut self, generated: bool) -> Self {
        self.generated = generated;
        self
    }

    pub fn special(mut self, flag: impl Into<String>) -> Self {
        self.special.push(flag.into());
        self
    }

    pub fn precision(mut self, precision: u32, scale: u32) -> Self {
        self.precision = Some(precision);
        self.scale = Some(scale);
        self
    }

    pub fn has_special(&self, flag: &str) -> bool {
        self.special.iter().any(|s| s == flag)
    }
}

impl FieldType {
    pub fn is_alias(self) -> bool {
        matches!(self, FieldType::Alias)
    }

    pub fn is_integer(self) -> bool {
        matches!(self, FieldType::Integer | FieldType::BigInteger)
    }

    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            FieldType::Integer | FieldType::BigInteger | FieldType::Float | FieldType::Decimal
        )
    }

    pub fn is_temporal(self) -> bool {
        matches!(
            self,
            FieldType::Date | FieldType::DateTime | FieldType::Time | FieldType::Timestamp
        )
    }

    pub fn is_textual(self) -> bool {
        matches!(
            self,
            FieldType::String | FieldType::Text | FieldType::Uuid | FieldType::Hash | FieldType::Csv
        )
    }
}
