use std::{str::FromStr, time::Duration};

use log::LevelFilter;

use crate::core::{ErrorKind, SQLError};

const ENV_PREFIX: &str = "ABADMIN_";

/// Connection and runtime settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: Option<String>,
    pub dbname: String,
    /// Schema the introspector reads from.
    pub schema: String,
    pub pool_size: usize,
    pub statement_timeout: Duration,
    pub log_level: LevelFilter,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            user: "postgres".to_string(),
            password: None,
            dbname: "abtest".to_string(),
            schema: "public".to_string(),
            pool_size: 4,
            statement_timeout: Duration::from_secs(30),
            log_level: LevelFilter::Info,
        }
    }
}

impl Config {
    /// Defaults overlaid with `ABADMIN_*` environment variables.
    pub fn from_env() -> Result<Self, SQLError> {
        Self::from_lookup(|key| std::env::var(format!("{}{}", ENV_PREFIX, key)).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, SQLError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(host) = lookup("HOST") {
            config.host = host;
        }
        if let Some(port) = lookup("PORT") {
            config.port = parse_setting("PORT", &port)?;
        }
        if let Some(user) = lookup("USER") {
            config.user = user;
        }
        if let Some(password) = lookup("PASSWORD") {
            config.password = Some(password);
        }
        if let Some(dbname) = lookup("DBNAME") {
            config.dbname = dbname;
        }
        if let Some(schema) = lookup("SCHEMA") {
            config.schema = schema;
        }
        if let Some(pool_size) = lookup("POOL_SIZE") {
            config.pool_size = parse_setting("POOL_SIZE", &pool_size)?;
            if config.pool_size == 0 {
                return Err(SQLError::new(
                    ErrorKind::ConfigError,
                    "POOL_SIZE must be at least 1",
                ));
            }
        }
        if let Some(timeout) = lookup("STATEMENT_TIMEOUT_SECS") {
            let secs: u64 = parse_setting("STATEMENT_TIMEOUT_SECS", &timeout)?;
            config.statement_timeout = Duration::from_secs(secs);
        }
        if let Some(level) = lookup("LOG_LEVEL") {
            config.log_level = parse_setting("LOG_LEVEL", &level)?;
        }

        Ok(config)
    }

    /// libpq-style `key=value` connection string.
    pub fn connection_string(&self) -> String {
        let mut conn = format!(
            "host={} port={} user={} dbname={}",
            quote_conn_value(&self.host),
            self.port,
            quote_conn_value(&self.user),
            quote_conn_value(&self.dbname)
        );
        if let Some(password) = &self.password {
            conn.push_str(&format!(" password={}", quote_conn_value(password)));
        }
        conn
    }
}

/// libpq key/value quoting: bare when safe, otherwise single-quoted with
/// `\` and `'` backslash-escaped.
fn quote_conn_value(value: &str) -> String {
    let bare = !value.is_empty()
        && !value
            .chars()
            .any(|c| c.is_whitespace() || c == '\'' || c == '\\');
    if bare {
        return value.to_string();
    }

    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('\'');
    for c in value.chars() {
        if c == '\'' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('\'');
    quoted
}

fn parse_setting<T: FromStr>(key: &str, value: &str) -> Result<T, SQLError> {
    value.trim().parse().map_err(|_| {
        SQLError::new(
            ErrorKind::ConfigError,
            format!("invalid value for {}{}: {:?}", ENV_PREFIX, key, value),
        )
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn overrides_apply_on_top_of_defaults() {
        let config = Config::from_lookup(lookup(&[
            ("HOST", "db.internal"),
            ("PORT", "6543"),
            ("STATEMENT_TIMEOUT_SECS", "5"),
            ("LOG_LEVEL", "debug"),
        ]))
        .unwrap();

        assert_eq!(config.host, "db.internal");
        assert_eq!(config.port, 6543);
        assert_eq!(config.statement_timeout, Duration::from_secs(5));
        assert_eq!(config.log_level, LevelFilter::Debug);
        assert_eq!(config.dbname, "abtest");
    }

    #[test]
    fn bad_values_are_config_errors() {
        let err = Config::from_lookup(lookup(&[("PORT", "not-a-port")])).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ConfigError);

        let err = Config::from_lookup(lookup(&[("POOL_SIZE", "0")])).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ConfigError);
    }

    #[test]
    fn connection_string_includes_password_only_when_set() {
        let mut config = Config::default();
        assert_eq!(
            config.connection_string(),
            "host=localhost port=5432 user=postgres dbname=abtest"
        );
        config.password = Some("secret".into());
        assert!(config.connection_string().ends_with(" password=secret"));
    }

    #[test]
    fn connection_string_quotes_awkward_values() {
        let config = Config {
            user: "ab admin".into(),
            password: Some(r"it's a\secret".into()),
            ..Config::default()
        };
        assert_eq!(
            config.connection_string(),
            r"host=localhost port=5432 user='ab admin' dbname=abtest password='it\'s a\\secret'"
        );

        let parsed: tokio_postgres::Config = config.connection_string().parse().unwrap();
        assert_eq!(parsed.get_user(), Some("ab admin"));
        assert_eq!(parsed.get_password(), Some(r"it's a\secret".as_bytes()));
    }
}
