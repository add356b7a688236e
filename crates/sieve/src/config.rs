use crate::Result;

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Engine settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root limit applied when the query sets none. `-1` reads every row.
    pub query_limit_default: i64,

    /// Upper bound on any root limit. `-1` disables the cap.
    pub query_limit_max: i64,

    /// Seconds a fetched permission set stays cached. `0` disables caching.
    pub permission_cache_ttl: u64,

    /// Deepest relational nesting accepted in one query.
    pub relational_nesting_max: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            query_limit_default: 100,
            query_limit_max: -1,
            permission_cache_ttl: 5,
            relational_nesting_max: 8,
        }
    }
}

impl Config {
    /// Reads `SIEVE_*` environment variables over the defaults.
    pub fn from_env() -> Result<Config> {
        Config::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Config> {
        let mut config = Config::default();

        if let Some(value) = parse(&lookup, "SIEVE_QUERY_LIMIT_DEFAULT")? {
            config.query_limit_default = value;
        }

        if let Some(value) = parse(&lookup, "SIEVE_QUERY_LIMIT_MAX")? {
            config.query_limit_max = value;
        }

        if let Some(value) = parse(&lookup, "SIEVE_PERMISSION_CACHE_TTL")? {
            config.permission_cache_ttl = value;
        }

        if let Some(value) = parse(&lookup, "SIEVE_RELATIONAL_NESTING_MAX")? {
            config.relational_nesting_max = value;
        }

        Ok(config)
    }

    pub fn permission_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.permission_cache_ttl)
    }

    /// Root limit for a query that asked for `requested`, `None` meaning
    /// unlimited.
    pub(crate) fn effective_limit(&self, requested: Option<i64>) -> Option<i64> {
        let limit = match requested.unwrap_or(self.query_limit_default) {
            limit if limit < 0 => None,
            limit => Some(limit),
        };

        match (limit, self.query_limit_max) {
            (_, max) if max < 0 => limit,
            (None, max) => Some(max),
            (Some(limit), max) => Some(limit.min(max)),
        }
    }
}

fn parse<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
) -> Result<Option<T>> {
    let Some(value) = lookup(name) else {
        return Ok(None);
    };

    value
        .trim()
        .parse()
        .map(Some)
        .map_err(|_| sieve_core::err!("invalid value for {name}: `{value}`"))
}
