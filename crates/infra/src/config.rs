//! Storage configuration, read from the environment.

use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_SCHEMA: &str = "fruteria";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;
pub const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Name of the schema holding the back-office tables.
///
/// This is the only identifier ever interpolated into SQL, so it is checked
/// against a strict allow-list pattern: `^[a-z_][a-z0-9_]{0,62}$`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaName(String);

impl SchemaName {
    pub fn new(name: &str) -> Result<Self, ConfigError> {
        let invalid = |reason: &str| ConfigError::Invalid {
            name: "DATABASE_SCHEMA",
            reason: reason.to_string(),
        };

        let mut chars = name.chars();
        match chars.next() {
            Some(c) if c.is_ascii_lowercase() || c == '_' => {}
            Some(_) => return Err(invalid("must start with a lowercase letter or underscore")),
            None => return Err(invalid("must not be empty")),
        }
        if name.len() > 63 {
            return Err(invalid("longer than 63 characters"));
        }
        if !chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_') {
            return Err(invalid("only lowercase letters, digits and underscores are allowed"));
        }
        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Double-quoted form for use in DDL and `SET search_path`.
    pub fn quoted(&self) -> String {
        format!("\"{}\"", self.0)
    }
}

impl Default for SchemaName {
    fn default() -> Self {
        Self(DEFAULT_SCHEMA.to_string())
    }
}

/// Connection settings for the Postgres storage handle.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub schema: SchemaName,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl DatabaseConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            schema: SchemaName::default(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            acquire_timeout: Duration::from_secs(DEFAULT_ACQUIRE_TIMEOUT_SECS),
        }
    }

    /// Load from `DATABASE_URL`, `DATABASE_SCHEMA`, `DATABASE_MAX_CONNECTIONS`
    /// and `DATABASE_ACQUIRE_TIMEOUT_SECS`.
    ///
    /// Returns `Ok(None)` when `DATABASE_URL` is not set.
    pub fn from_env() -> Result<Option<Self>, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Option<Self>, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let Some(url) = lookup("DATABASE_URL").filter(|u| !u.trim().is_empty()) else {
            return Ok(None);
        };

        let mut config = Self::new(url);

        if let Some(schema) = lookup("DATABASE_SCHEMA") {
            config.schema = SchemaName::new(schema.trim())?;
        }
        if let Some(raw) = lookup("DATABASE_MAX_CONNECTIONS") {
            config.max_connections = parse_positive("DATABASE_MAX_CONNECTIONS", &raw)?;
        }
        if let Some(raw) = lookup("DATABASE_ACQUIRE_TIMEOUT_SECS") {
            let secs: u32 = parse_positive("DATABASE_ACQUIRE_TIMEOUT_SECS", &raw)?;
            config.acquire_timeout = Duration::from_secs(u64::from(secs));
        }

        Ok(Some(config))
    }
}

fn parse_positive(name: &'static str, raw: &str) -> Result<u32, ConfigError> {
    match raw.trim().parse::<u32>() {
        Ok(0) => Err(ConfigError::Invalid {
            name,
            reason: "must be greater than zero".to_string(),
        }),
        Ok(v) => Ok(v),
        Err(e) => Err(ConfigError::Invalid {
            name,
            reason: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn no_url_means_no_database() {
        assert!(DatabaseConfig::from_lookup(lookup(&[])).unwrap().is_none());
    }

    #[test]
    fn defaults_apply_when_only_url_is_set() {
        let cfg = DatabaseConfig::from_lookup(lookup(&[("DATABASE_URL", "postgres://localhost/x")]))
            .unwrap()
            .unwrap();
        assert_eq!(cfg.schema.as_str(), DEFAULT_SCHEMA);
        assert_eq!(cfg.max_connections, DEFAULT_MAX_CONNECTIONS);
        assert_eq!(cfg.acquire_timeout, Duration::from_secs(DEFAULT_ACQUIRE_TIMEOUT_SECS));
    }

    #[test]
    fn schema_allow_list_rejects_injection() {
        for bad in ["", "Fruteria", "1abc", "a-b", "a\"; DROP TABLE producto; --", "a b"] {
            assert!(SchemaName::new(bad).is_err(), "{bad:?} should be rejected");
        }
        assert_eq!(SchemaName::new("tienda_2").unwrap().quoted(), "\"tienda_2\"");
    }

    #[test]
    fn zero_pool_size_is_invalid() {
        let err = DatabaseConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/x"),
            ("DATABASE_MAX_CONNECTIONS", "0"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "DATABASE_MAX_CONNECTIONS", .. }));
    }
}
