use std::collections::HashMap;
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use muse_core::db::ReplicaConfig;
use muse_core::util::is_http_url;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub database_path: PathBuf,
    pub replica: Option<ReplicaConfig>,
    pub auth_jwks_url: String,
    pub auth_jwt_issuer: String,
    pub jwks_cache_ttl: Duration,
    pub auth_clock_skew: Duration,
    pub rate_limit_window: Duration,
    pub like_rate_limit_per_window: u32,
    pub feed_rate_limit_per_window: u32,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("AppConfig")
            .field("bind_addr", &self.bind_addr)
            .field("database_path", &self.database_path)
            .field("replica", &self.replica)
            .field("auth_jwks_url", &self.auth_jwks_url)
            .field("auth_jwt_issuer", &self.auth_jwt_issuer)
            .field("jwks_cache_ttl", &self.jwks_cache_ttl)
            .field("auth_clock_skew", &self.auth_clock_skew)
            .field("rate_limit_window", &self.rate_limit_window)
            .field(
                "like_rate_limit_per_window",
                &self.like_rate_limit_per_window,
            )
            .field(
                "feed_rate_limit_per_window",
                &self.feed_rate_limit_per_window,
            )
            .finish()
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let values: HashMap<String, String> = env::vars().collect();
        Self::from_lookup(|name| values.get(name).cloned())
    }

    pub(crate) fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let bind_addr = value_or_default(&lookup, "MUSE_API_BIND_ADDR", "127.0.0.1:8080");
        let database_path =
            PathBuf::from(value_or_default(&lookup, "MUSE_DATABASE_PATH", "muse.db"));
        let replica = parse_replica_config(&lookup)?;

        let auth_jwks_url = required_trimmed(&lookup, "AUTH_JWKS_URL")?;
        if !is_http_url(&auth_jwks_url) {
            return Err(ConfigError::Invalid(
                "AUTH_JWKS_URL must start with http:// or https://".to_string(),
            ));
        }
        let auth_jwt_issuer = required_trimmed(&lookup, "AUTH_JWT_ISSUER")?;

        let jwks_cache_ttl_secs = parse_u64(&lookup, "AUTH_JWKS_CACHE_TTL_SECS", "300")?;
        if jwks_cache_ttl_secs < 30 {
            return Err(ConfigError::Invalid(
                "AUTH_JWKS_CACHE_TTL_SECS must be >= 30".to_string(),
            ));
        }

        let auth_clock_skew_secs = parse_u64(&lookup, "AUTH_CLOCK_SKEW_SECS", "60")?;
        if auth_clock_skew_secs > 300 {
            return Err(ConfigError::Invalid(
                "AUTH_CLOCK_SKEW_SECS must be in [0, 300]".to_string(),
            ));
        }

        let rate_limit_window_secs = parse_u64(&lookup, "RATE_LIMIT_WINDOW_SECS", "60")?;
        if !(10..=3_600).contains(&rate_limit_window_secs) {
            return Err(ConfigError::Invalid(
                "RATE_LIMIT_WINDOW_SECS must be in [10, 3600]".to_string(),
            ));
        }

        let like_rate_limit_per_window = parse_u32(&lookup, "LIKE_RATE_LIMIT_PER_WINDOW", "60")?;
        if !(1..=1_000).contains(&like_rate_limit_per_window) {
            return Err(ConfigError::Invalid(
                "LIKE_RATE_LIMIT_PER_WINDOW must be in [1, 1000]".to_string(),
            ));
        }

        let feed_rate_limit_per_window = parse_u32(&lookup, "FEED_RATE_LIMIT_PER_WINDOW", "120")?;
        if !(1..=5_000).contains(&feed_rate_limit_per_window) {
            return Err(ConfigError::Invalid(
                "FEED_RATE_LIMIT_PER_WINDOW must be in [1, 5000]".to_string(),
            ));
        }

        Ok(Self {
            bind_addr,
            database_path,
            replica,
            auth_jwks_url,
            auth_jwt_issuer,
            jwks_cache_ttl: Duration::from_secs(jwks_cache_ttl_secs),
            auth_clock_skew: Duration::from_secs(auth_clock_skew_secs),
            rate_limit_window: Duration::from_secs(rate_limit_window_secs),
            like_rate_limit_per_window,
            feed_rate_limit_per_window,
        })
    }
}

fn parse_replica_config(
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<Option<ReplicaConfig>, ConfigError> {
    let url = optional_trimmed(&lookup, "TURSO_DATABASE_URL");
    let auth_token = optional_trimmed(&lookup, "TURSO_AUTH_TOKEN");

    match (url, auth_token) {
        (None, None) => Ok(None),
        (Some(url), Some(auth_token)) => Ok(Some(ReplicaConfig::new(url, auth_token))),
        (Some(_), None) => Err(ConfigError::MissingVar("TURSO_AUTH_TOKEN")),
        (None, Some(_)) => Err(ConfigError::MissingVar("TURSO_DATABASE_URL")),
    }
}

fn parse_u64(
    lookup: impl Fn(&str) -> Option<String>,
    name: &str,
    default: &str,
) -> Result<u64, ConfigError> {
    value_or_default(lookup, name, default)
        .parse::<u64>()
        .map_err(|_| ConfigError::Invalid(format!("{name} must be a non-negative integer")))
}

fn parse_u32(
    lookup: impl Fn(&str) -> Option<String>,
    name: &str,
    default: &str,
) -> Result<u32, ConfigError> {
    value_or_default(lookup, name, default)
        .parse::<u32>()
        .map_err(|_| ConfigError::Invalid(format!("{name} must be a non-negative integer")))
}

fn value_or_default(lookup: impl Fn(&str) -> Option<String>, name: &str, default: &str) -> String {
    optional_trimmed(lookup, name).unwrap_or_else(|| default.to_string())
}

fn required_trimmed(
    lookup: impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<String, ConfigError> {
    optional_trimmed(lookup, name).ok_or(ConfigError::MissingVar(name))
}

fn optional_trimmed(lookup: impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    muse_core::util::normalize_text_option(lookup(name))
}

#[cfg(test)]
pub(crate) fn test_config() -> AppConfig {
    AppConfig::from_lookup(|key| match key {
        "AUTH_JWKS_URL" => Some("https://auth.example.com/.well-known/jwks.json".to_string()),
        "AUTH_JWT_ISSUER" => Some("https://auth.example.com".to_string()),
        _ => None,
    })
    .expect("minimal config is valid")
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(map: &HashMap<&str, &str>) -> Result<AppConfig, ConfigError> {
        AppConfig::from_lookup(|key| map.get(key).map(|value| (*value).to_string()))
    }

    fn minimal() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("AUTH_JWKS_URL", "https://auth.example.com/.well-known/jwks.json"),
            ("AUTH_JWT_ISSUER", "https://auth.example.com"),
        ])
    }

    #[test]
    fn config_requires_auth_settings() {
        let err = config_from(&HashMap::new()).unwrap_err();
        assert!(err.to_string().contains("AUTH_JWKS_URL"));
    }

    #[test]
    fn config_applies_defaults() {
        let config = config_from(&minimal()).unwrap();
        assert_eq!(config.bind_addr, "127.0.0.1:8080");
        assert_eq!(config.database_path, PathBuf::from("muse.db"));
        assert!(config.replica.is_none());
        assert_eq!(config.like_rate_limit_per_window, 60);
        assert_eq!(config.feed_rate_limit_per_window, 120);
        assert_eq!(config.rate_limit_window, Duration::from_secs(60));
    }

    #[test]
    fn config_rejects_out_of_range_values() {
        let mut map = minimal();
        map.insert("LIKE_RATE_LIMIT_PER_WINDOW", "0");
        assert!(config_from(&map).is_err());

        let mut map = minimal();
        map.insert("RATE_LIMIT_WINDOW_SECS", "5");
        assert!(config_from(&map).is_err());

        let mut map = minimal();
        map.insert("AUTH_JWKS_URL", "auth.example.com/jwks");
        assert!(config_from(&map).is_err());
    }

    #[test]
    fn replica_requires_both_url_and_token() {
        let mut map = minimal();
        map.insert("TURSO_DATABASE_URL", "libsql://muse.turso.io");
        let err = config_from(&map).unwrap_err();
        assert!(err.to_string().contains("TURSO_AUTH_TOKEN"));
    }

    #[test]
    fn config_redacts_sensitive_debug_fields() {
        let mut map = minimal();
        map.insert("TURSO_DATABASE_URL", "libsql://muse.turso.io");
        map.insert("TURSO_AUTH_TOKEN", "sensitive-replica-token");

        let config = config_from(&map).unwrap();
        let debug_output = format!("{config:?}");
        assert!(!debug_output.contains("sensitive-replica-token"));
        assert!(debug_output.contains("[REDACTED]"));
    }
}
