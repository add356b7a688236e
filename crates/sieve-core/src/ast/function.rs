use crate::{Error, Result};

/// Functions applicable to a field in a field list, filter key or sort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Function {
    Year,
    Month,
    Week,
    Day,
    Weekday,
    Hour,
    Minute,
    Second,
    /// Number of related rows of a one-to-many field
    Count,
    /// Extract a value from a JSON field by path
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionCall {
    pub function: Function,
    pub field: String,
    pub args: Vec<String>,
}

impl Function {
    pub fn parse(name: &str) -> Option<Function> {
        Some(match name {
            "year" => Function::Year,
            "month" => Function::Month,
            "week" => Function::Week,
            "day" => Function::Day,
            "weekday" => Function::Weekday,
            "hour" => Function::Hour,
            "minute" => Function::Minute,
            "second" => Function::Second,
            "count" => Function::Count,
            "json" => Function::Json,
            _ => return None,
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Function::Year => "year",
            Function::Month => "month",
            Function::Week => "week",
            Function::Day => "day",
            Function::Weekday => "weekday",
            Function::Hour => "hour",
            Function::Minute => "minute",
            Function::Second => "second",
            Function::Count => "count",
            Function::Json => "json",
        }
    }

    pub fn is_date_part(self) -> bool {
        !matches!(self, Function::Count | Function::Json)
    }
}

impl FunctionCall {
    /// Parses `name(field, args…)`. Returns `Ok(None)` for a plain field key.
    pub fn parse(key: &str) -> Result<Option<FunctionCall>> {
        let Some(open) = key.find('(') else {
            return Ok(None);
        };

        let Some(inner) = key[open + 1..].strip_suffix(')') else {
            return Err(Error::invalid_query(format!(
                "malformed function field `{key}`"
            )));
        };

        let name = &key[..open];
        let Some(function) = Function::parse(name) else {
            return Err(Error::invalid_query(format!("unknown function `{name}`")));
        };

        let mut parts = inner.split(',').map(str::trim);
        let field = match parts.next() {
            Some(field) if !field.is_empty() => field.to_string(),
            _ => {
                return Err(Error::invalid_query(format!(
                    "function `{name}` needs a field"
                )))
            }
        };
        let args: Vec<String> = parts.map(str::to_string).collect();

        if function == Function::Json {
            let [path] = &args[..] else {
                return Err(Error::invalid_query(
                    "function `json` takes a field and a path",
                ));
            };
            validate_json_path(path)?;
        } else if !args.is_empty() {
            return Err(Error::invalid_query(format!(
                "function `{name}` takes a single field"
            )));
        }

        Ok(Some(FunctionCall {
            function,
            field,
            args,
        }))
    }

    /// Path segments of a `json` call.
    pub fn json_path(&self) -> Vec<&str> {
        self.args
            .first()
            .map(|path| path.split('.').collect())
            .unwrap_or_default()
    }
}

impl core::fmt::Display for FunctionCall {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "{}({}", self.function.as_str(), self.field)?;
        for arg in &self.args {
            write!(f, ", {arg}")?;
        }
        f.write_str(")")
    }
}

/// Path segments are rendered into SQL text, so only a conservative
/// character set is accepted.
fn validate_json_path(path: &str) -> Result<()> {
    let valid = !path.is_empty()
        && path.split('.').all(|segment| {
            !segment.is_empty()
                && segment
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        });

    if valid {
        Ok(())
    } else {
        Err(Error::invalid_query(format!("invalid json path `{path}`")))
    }
}

/// Strips a function wrapper from a field key: `year(date)` is `date`.
pub fn field_name(key: &str) -> &str {
    match (key.find('('), key.strip_suffix(')')) {
        (Some(open), Some(_)) => {
            let inner = &key[open + 1..key.len() - 1];
            inner.split(',').next().unwrap_or(inner).trim()
        }
        _ => key,
    }
}
