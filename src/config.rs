use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_PHOTO_BUCKET: &str = "photos";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} is not a valid value: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Runtime settings, read from the environment (and `.env` when present).
#[derive(Debug, Clone)]
pub struct Config {
    pub supabase_url: String,
    pub anon_key: String,
    /// Direct Postgres connection, only needed for schema provisioning.
    pub database_url: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub photo_bucket: String,
    /// Transport timeout; unset means requests wait indefinitely.
    pub http_timeout: Option<Duration>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let supabase_url = var("SUPABASE_URL").ok_or(ConfigError::Missing("SUPABASE_URL"))?;
        if !supabase_url.starts_with("http://") && !supabase_url.starts_with("https://") {
            return Err(ConfigError::Invalid {
                name: "SUPABASE_URL",
                value: supabase_url,
            });
        }

        let http_timeout = match var("FITCOACH_HTTP_TIMEOUT_SECS") {
            Some(raw) => {
                let secs = raw.parse::<u64>().map_err(|_| ConfigError::Invalid {
                    name: "FITCOACH_HTTP_TIMEOUT_SECS",
                    value: raw.clone(),
                })?;
                Some(Duration::from_secs(secs))
            }
            None => None,
        };

        Ok(Self {
            supabase_url,
            anon_key: var("SUPABASE_ANON_KEY").ok_or(ConfigError::Missing("SUPABASE_ANON_KEY"))?,
            database_url: var("DATABASE_URL"),
            email: var("FITCOACH_EMAIL"),
            password: var("FITCOACH_PASSWORD"),
            photo_bucket: var("FITCOACH_PHOTO_BUCKET")
                .unwrap_or_else(|| DEFAULT_PHOTO_BUCKET.to_string()),
            http_timeout,
        })
    }

    /// Email and password when both are configured.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        Some((self.email.as_deref()?, self.password.as_deref()?))
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
        move |name| map.get(name).cloned()
    }

    #[test]
    fn requires_url_and_anon_key() {
        let err = Config::from_lookup(lookup(&[])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("SUPABASE_URL"));

        let err = Config::from_lookup(lookup(&[("SUPABASE_URL", "https://x.supabase.co")])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("SUPABASE_ANON_KEY"));
    }

    #[test]
    fn applies_defaults() {
        let config = Config::from_lookup(lookup(&[
            ("SUPABASE_URL", "https://x.supabase.co"),
            ("SUPABASE_ANON_KEY", "anon"),
            ("FITCOACH_EMAIL", "coach@example.com"),
        ]))
        .unwrap();

        assert_eq!(config.photo_bucket, DEFAULT_PHOTO_BUCKET);
        assert!(config.http_timeout.is_none());
        assert!(config.database_url.is_none());
        assert!(config.credentials().is_none());
    }

    #[test]
    fn rejects_bad_url_and_timeout() {
        let err = Config::from_lookup(lookup(&[
            ("SUPABASE_URL", "x.supabase.co"),
            ("SUPABASE_ANON_KEY", "anon"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "SUPABASE_URL", .. }));

        let err = Config::from_lookup(lookup(&[
            ("SUPABASE_URL", "https://x.supabase.co"),
            ("SUPABASE_ANON_KEY", "anon"),
            ("FITCOACH_HTTP_TIMEOUT_SECS", "soon"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "FITCOACH_HTTP_TIMEOUT_SECS", .. }));
    }

    #[test]
    fn parses_timeout_and_credentials() {
        let config = Config::from_lookup(lookup(&[
            ("SUPABASE_URL", "https://x.supabase.co"),
            ("SUPABASE_ANON_KEY", "anon"),
            ("FITCOACH_EMAIL", "coach@example.com"),
            ("FITCOACH_PASSWORD", "secret"),
            ("FITCOACH_HTTP_TIMEOUT_SECS", "15"),
        ]))
        .unwrap();

        assert_eq!(config.http_timeout, Some(Duration::from_secs(15)));
        assert_eq!(config.credentials(), Some(("coach@example.com", "secret")));
    }
}
