use crate::{
    store::{ContextKind, Store},
    Accountability, Error, Filter, Permission, Result, Value,
};

use chrono::{DateTime, Duration, Months, SecondsFormat, Utc};
use serde_json::Value as Json;

const CURRENT_USER: &str = "$CURRENT_USER";
const CURRENT_ROLE: &str = "$CURRENT_ROLE";
const CURRENT_ROLES: &str = "$CURRENT_ROLES";
const CURRENT_POLICIES: &str = "$CURRENT_POLICIES";
const NOW: &str = "$NOW";

/// Request-time values substituted into permission rules.
#[derive(Debug)]
pub(crate) struct Variables {
    user: Option<String>,
    role: Option<String>,
    roles: Vec<String>,
    policies: Vec<String>,
    now: DateTime<Utc>,

    user_record: Option<Json>,
    role_record: Option<Json>,
    policy_records: Vec<Json>,
}

impl Variables {
    /// Captures the caller's identity and loads the context records the
    /// rules in `permissions` refer to.
    pub(crate) async fn load(
        store: &dyn Store,
        accountability: &Accountability,
        policies: &[String],
        permissions: &[Permission],
    ) -> Result<Variables> {
        let mut variables = Variables::new(accountability, policies, Utc::now());

        let mut needs = Needs::default();
        for permission in permissions {
            for filter in rules(permission) {
                filter.for_each_value(&mut |value| needs.observe(value));
            }
        }

        if needs.user {
            if let Some(user) = &accountability.user {
                variables.user_record = store.context(ContextKind::User, user).await?;
            }
        }

        if needs.role {
            if let Some(role) = &accountability.role {
                variables.role_record = store.context(ContextKind::Role, role).await?;
            }
        }

        if needs.policies {
            for policy in policies {
                if let Some(record) = store.context(ContextKind::Policy, policy).await? {
                    variables.policy_records.push(record);
                }
            }
        }

        Ok(variables)
    }

    fn new(accountability: &Accountability, policies: &[String], now: DateTime<Utc>) -> Variables {
        let roles = match (&accountability.roles[..], &accountability.role) {
            ([], Some(role)) => vec![role.clone()],
            (roles, _) => roles.to_vec(),
        };

        Variables {
            user: accountability.user.clone(),
            role: accountability.role.clone(),
            roles,
            policies: policies.to_vec(),
            now,
            user_record: None,
            role_record: None,
            policy_records: vec![],
        }
    }

    /// Substitutes every variable in the row and validation rules of
    /// `permission`.
    pub(crate) fn apply(&self, permission: &mut Permission) -> Result<()> {
        for filter in [&mut permission.permissions, &mut permission.validation]
            .into_iter()
            .flatten()
        {
            filter.try_for_each_value_mut(&mut |value| {
                *value = self.resolve(value)?;
                Ok(())
            })?;
        }

        Ok(())
    }

    fn resolve(&self, value: &Value) -> Result<Value> {
        match value {
            Value::List(items) => {
                let mut resolved = Vec::with_capacity(items.len());
                for item in items {
                    match self.resolve(item)? {
                        Value::List(nested) => resolved.extend(nested),
                        other => resolved.push(other),
                    }
                }
                Ok(Value::List(resolved))
            }
            Value::String(s) => self.resolve_str(s),
            other => Ok(other.clone()),
        }
    }

    fn resolve_str(&self, s: &str) -> Result<Value> {
        match s {
            "true" => return Ok(Value::Bool(true)),
            "false" => return Ok(Value::Bool(false)),
            "null" => return Ok(Value::Null),
            CURRENT_USER => return Ok(self.user.clone().into()),
            CURRENT_ROLE => return Ok(self.role.clone().into()),
            CURRENT_ROLES => return Ok(self.roles.clone().into()),
            CURRENT_POLICIES => return Ok(self.policies.clone().into()),
            _ => {}
        }

        if let Some(path) = dotted(s, CURRENT_USER) {
            return Ok(lookup(self.user_record.as_ref(), path));
        }

        if let Some(path) = dotted(s, CURRENT_ROLE) {
            return Ok(lookup(self.role_record.as_ref(), path));
        }

        if let Some(path) = dotted(s, CURRENT_POLICIES) {
            let values = self
                .policy_records
                .iter()
                .map(|record| lookup(Some(record), path))
                .filter(|value| !value.is_null())
                .collect::<Vec<_>>();
            return Ok(Value::List(values));
        }

        if let Some(rest) = s.strip_prefix(NOW) {
            return self.now(rest);
        }

        Ok(Value::String(s.to_string()))
    }

    fn now(&self, rest: &str) -> Result<Value> {
        if rest.is_empty() {
            return Ok(Value::String(timestamp(self.now)));
        }

        let Some(adjustment) = rest
            .strip_prefix('(')
            .and_then(|rest| rest.strip_suffix(')'))
        else {
            // Some other `$NOW…` literal.
            return Ok(Value::String(format!("{NOW}{rest}")));
        };

        Ok(Value::String(timestamp(adjust(self.now, adjustment)?)))
    }
}

#[derive(Debug, Default)]
struct Needs {
    user: bool,
    role: bool,
    policies: bool,
}

impl Needs {
    fn observe(&mut self, value: &Value) {
        let Some(s) = value.as_str() else {
            return;
        };

        self.user |= dotted(s, CURRENT_USER).is_some();
        self.role |= dotted(s, CURRENT_ROLE).is_some();
        self.policies |= dotted(s, CURRENT_POLICIES).is_some();
    }
}

fn rules(permission: &Permission) -> impl Iterator<Item = &Filter> {
    permission
        .permissions
        .iter()
        .chain(permission.validation.iter())
}

/// `$CURRENT_USER.team.name` with `$CURRENT_USER` yields `team.name`.
fn dotted<'a>(s: &'a str, variable: &str) -> Option<&'a str> {
    s.strip_prefix(variable)?
        .strip_prefix('.')
        .filter(|path| !path.is_empty())
}

/// Reads `path` out of a context record. Lists are mapped over when the
/// segment is not an index.
fn lookup(record: Option<&Json>, path: &str) -> Value {
    let Some(record) = record else {
        return Value::Null;
    };

    let segments: Vec<&str> = path.split('.').collect();
    Value::from_json(&walk(record, &segments))
}

fn walk(json: &Json, segments: &[&str]) -> Json {
    let Some((head, rest)) = segments.split_first() else {
        return json.clone();
    };

    match json {
        Json::Object(map) => map
            .get(*head)
            .map_or(Json::Null, |value| walk(value, rest)),
        Json::Array(items) => match head.parse::<usize>() {
            Ok(index) => items
                .get(index)
                .map_or(Json::Null, |value| walk(value, rest)),
            Err(_) => Json::Array(items.iter().map(|item| walk(item, segments)).collect()),
        },
        _ => Json::Null,
    }
}

/// Applies `+n unit` / `-n unit` to `now`.
fn adjust(now: DateTime<Utc>, adjustment: &str) -> Result<DateTime<Utc>> {
    let invalid = || Error::invalid_query(format!("invalid $NOW adjustment `{adjustment}`"));

    let mut parts = adjustment.split_whitespace();
    let (Some(amount), Some(unit), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(invalid());
    };

    let amount: i64 = amount
        .strip_prefix('+')
        .unwrap_or(amount)
        .parse()
        .map_err(|_| invalid())?;

    let seconds = match unit.trim_end_matches('s') {
        "second" | "sec" | "" => Some(1),
        "minute" | "min" => Some(60),
        "hour" | "h" => Some(60 * 60),
        "day" | "d" => Some(24 * 60 * 60),
        "week" | "w" => Some(7 * 24 * 60 * 60),
        _ => None,
    };

    if let Some(seconds) = seconds {
        return amount
            .checked_mul(seconds)
            .and_then(Duration::try_seconds)
            .and_then(|delta| now.checked_add_signed(delta))
            .ok_or_else(invalid);
    }

    let months = match unit.trim_end_matches('s') {
        "month" => amount,
        "year" | "y" => amount.checked_mul(12).ok_or_else(invalid)?,
        _ => return Err(invalid()),
    };

    let magnitude = u32::try_from(months.unsigned_abs()).map_err(|_| invalid())?;
    let shifted = if months < 0 {
        now.checked_sub_months(Months::new(magnitude))
    } else {
        now.checked_add_months(Months::new(magnitude))
    };

    shifted.ok_or_else(invalid)
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}
