use std::env::var;
use std::str::FromStr;
use std::time::Duration;

use dotenvy::dotenv;
use thiserror::Error;

const DEFAULT_ALLOWED_DOMAINS: &str = "localhost:1337,pabbly.com,localhost:3031";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required env param {0}")]
    Missing(&'static str),
    #[error("invalid value for env param {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub scheme: String,
    pub host: String,
    pub database_url: String,
    pub database_max_connections: u32,
    pub jwt_secret: String,
    pub jwt_expiration: Duration,
    pub bouncify_api_url: String,
    pub bouncify_api_key: String,
    pub bouncify_timeout: Duration,
    pub cors_allowed_domains: Vec<String>,
    pub poll_interval: Duration,
    pub poll_max_attempts: u32,
}

impl Config {
    pub fn try_parse() -> Result<Config, ConfigError> {
        let _ = dotenv();
        Self::from_lookup(|name| var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Config, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| lookup(name).ok_or(ConfigError::Missing(name));
        let with_default =
            |name: &'static str, default: &str| lookup(name).unwrap_or_else(|| default.to_string());

        Ok(Config {
            port: parse("PORT", &required("PORT")?)?,
            scheme: required("SCHEME")?,
            host: required("HOST")?,
            database_url: required("DATABASE_URL")?,
            database_max_connections: parse(
                "DATABASE_MAX_CONNECTIONS",
                &with_default("DATABASE_MAX_CONNECTIONS", "10"),
            )?,
            jwt_secret: required("JWT_SECRET")?,
            jwt_expiration: Duration::from_secs(parse(
                "JWT_EXPIRATION_SECS",
                &with_default("JWT_EXPIRATION_SECS", "86400"),
            )?),
            bouncify_api_url: with_default("BOUNCIFY_API_URL", "https://api.bouncify.io/v1"),
            bouncify_api_key: required("BOUNCIFY_API_KEY")?,
            bouncify_timeout: Duration::from_secs(parse(
                "BOUNCIFY_TIMEOUT_SECS",
                &with_default("BOUNCIFY_TIMEOUT_SECS", "30"),
            )?),
            cors_allowed_domains: with_default("CORS_ALLOWED_DOMAINS", DEFAULT_ALLOWED_DOMAINS)
                .split(',')
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty())
                .collect(),
            poll_interval: Duration::from_secs(parse(
                "POLL_INTERVAL_SECS",
                &with_default("POLL_INTERVAL_SECS", "5"),
            )?),
            poll_max_attempts: parse(
                "POLL_MAX_ATTEMPTS",
                &with_default("POLL_MAX_ATTEMPTS", "720"),
            )?,
        })
    }
}

fn parse<T: FromStr>(name: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        name,
        value: value.to_string(),
    })
}
