//! Process configuration read from environment variables.
//!
//! | Variable | Default |
//! |---|---|
//! | `HOST` | `0.0.0.0` |
//! | `PORT` | `3000` |
//! | `STORE` | `mongodb` when `MONGODB_URI` is set, `memory` otherwise |
//! | `MONGODB_URI` | none |
//! | `MONGODB_DATABASE` | `blog` |
//! | `MONGODB_TIMEOUT_SECS` | `5` |
//! | `JWT_SECRET` | required |
//! | `TOKEN_TTL_SECS` | `3600` |
//! | `CORS_ORIGINS` | `http://localhost:5173` (comma separated, `*` for any origin) |
//! | `BCRYPT_COST` | `10` |
//! | `SEED_POSTS` | `false` |
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use blogpost_store::MongoOptions;
use salvo::http::HeaderValue;
use thiserror::Error;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_DATABASE: &str = "blog";
const DEFAULT_MONGODB_TIMEOUT_SECS: u64 = 5;
const DEFAULT_TOKEN_TTL_SECS: u64 = 60 * 60;
const DEFAULT_CORS_ORIGINS: &str = "http://localhost:5173";
const DEFAULT_BCRYPT_COST: u32 = 10;
const BCRYPT_COST_RANGE: std::ops::RangeInclusive<u32> = 4..=31;
const TOKEN_TTL_SECS_RANGE: std::ops::RangeInclusive<u64> = 1..=60 * 60 * 24 * 365;

/// Errors raised while reading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required variable is not set.
    #[error("environment variable `{0}` must be set")]
    Missing(&'static str),
    /// A variable is set to a value that cannot be used.
    #[error("invalid value `{value}` for `{key}`: {reason}")]
    Invalid {
        /// Variable name.
        key: &'static str,
        /// Raw value.
        value: String,
        /// Why it was rejected.
        reason: String,
    },
}

/// Which persistence accessor backs the service.
#[derive(Clone, Debug)]
pub enum StoreBackend {
    /// Process scoped in-memory store.
    Memory {
        /// Start with the sample posts.
        seed_posts: bool,
    },
    /// MongoDB document store.
    Mongo(MongoOptions),
}

/// Cross-origin policy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CorsPolicy {
    /// Any origin, credentials disabled.
    Open,
    /// Only the listed origins, credentials enabled.
    AllowList(Vec<String>),
}

/// Service configuration.
#[derive(Clone)]
pub struct Config {
    /// Listen address.
    pub host: String,
    /// Listen port.
    pub port: u16,
    /// Persistence backend.
    pub store: StoreBackend,
    /// Secret used to sign and verify bearer tokens.
    pub jwt_secret: String,
    /// Validity of issued tokens.
    pub token_ttl: Duration,
    /// Cross-origin policy.
    pub cors: CorsPolicy,
    /// Bcrypt work factor.
    pub bcrypt_cost: u32,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("store", &self.store)
            .field("jwt_secret", &"<redacted>")
            .field("token_ttl", &self.token_ttl)
            .field("cors", &self.cors)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .finish()
    }
}

impl Config {
    /// Reads configuration from the process environment, after loading a
    /// `.env` file when one is present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through `lookup`, which maps a variable name to its value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars(lookup);

        let jwt_secret = vars.get("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?;

        let mongodb_uri = vars.get("MONGODB_URI");
        let backend = vars.get("STORE").unwrap_or_else(|| {
            let inferred = if mongodb_uri.is_some() { "mongodb" } else { "memory" };
            inferred.to_owned()
        });
        let store = match backend.as_str() {
            "memory" => StoreBackend::Memory {
                seed_posts: vars.parse("SEED_POSTS", false)?,
            },
            "mongodb" | "mongo" => {
                let uri = mongodb_uri.ok_or(ConfigError::Missing("MONGODB_URI"))?;
                let timeout = vars.parse("MONGODB_TIMEOUT_SECS", DEFAULT_MONGODB_TIMEOUT_SECS)?;
                StoreBackend::Mongo(
                    MongoOptions::new(uri)
                        .database(
                            vars.get("MONGODB_DATABASE")
                                .unwrap_or_else(|| DEFAULT_DATABASE.to_owned()),
                        )
                        .timeout(Duration::from_secs(timeout)),
                )
            }
            _ => {
                return Err(ConfigError::Invalid {
                    key: "STORE",
                    value: backend,
                    reason: "expected `memory` or `mongodb`".to_owned(),
                });
            }
        };

        let bcrypt_cost = vars.parse("BCRYPT_COST", DEFAULT_BCRYPT_COST)?;
        if !BCRYPT_COST_RANGE.contains(&bcrypt_cost) {
            return Err(ConfigError::Invalid {
                key: "BCRYPT_COST",
                value: bcrypt_cost.to_string(),
                reason: format!(
                    "must be between {} and {}",
                    BCRYPT_COST_RANGE.start(),
                    BCRYPT_COST_RANGE.end()
                ),
            });
        }

        let token_ttl_secs = vars.parse("TOKEN_TTL_SECS", DEFAULT_TOKEN_TTL_SECS)?;
        if !TOKEN_TTL_SECS_RANGE.contains(&token_ttl_secs) {
            return Err(ConfigError::Invalid {
                key: "TOKEN_TTL_SECS",
                value: token_ttl_secs.to_string(),
                reason: format!(
                    "must be between {} and {} seconds",
                    TOKEN_TTL_SECS_RANGE.start(),
                    TOKEN_TTL_SECS_RANGE.end()
                ),
            });
        }

        let cors = parse_cors(&vars.get("CORS_ORIGINS").unwrap_or_else(|| {
            tracing::info!("CORS_ORIGINS not set, using default: {DEFAULT_CORS_ORIGINS}");
            DEFAULT_CORS_ORIGINS.to_owned()
        }))?;

        Ok(Self {
            host: vars.get("HOST").unwrap_or_else(|| DEFAULT_HOST.to_owned()),
            port: vars.parse("PORT", DEFAULT_PORT)?,
            store,
            jwt_secret,
            token_ttl: Duration::from_secs(token_ttl_secs),
            cors,
            bcrypt_cost,
        })
    }

    /// `host:port` string suitable for binding.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

struct Vars<F>(F);

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    fn parse<T>(&self, key: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        match self.get(key) {
            Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
                key,
                reason: e.to_string(),
                value,
            }),
            None => Ok(default),
        }
    }
}

/// Every origin must be usable as a header value.
fn parse_cors(raw: &str) -> Result<CorsPolicy, ConfigError> {
    let origins: Vec<String> = raw
        .split(',')
        .map(|origin| origin.trim().trim_end_matches('/'))
        .filter(|origin| !origin.is_empty())
        .map(ToOwned::to_owned)
        .collect();
    if origins.iter().any(|origin| origin == "*") {
        return Ok(CorsPolicy::Open);
    }
    for origin in &origins {
        if let Err(e) = HeaderValue::from_str(origin) {
            return Err(ConfigError::Invalid {
                key: "CORS_ORIGINS",
                value: origin.clone(),
                reason: e.to_string(),
            });
        }
    }
    Ok(CorsPolicy::AllowList(origins))
}
