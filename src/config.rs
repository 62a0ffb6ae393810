use std::{env, time::Duration};

use anyhow::{Context, anyhow, bail};

use crate::security::cipher::{self, KEY_LEN};

/// Upper bound for `JWT_TTL_HOURS`, one year.
pub const MAX_TOKEN_TTL_HOURS: i64 = 24 * 366;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt: JwtConfig,
    pub encryption_key: [u8; KEY_LEN],
    pub superadmin: SuperadminConfig,
    pub password_hash: PasswordHashConfig,
    pub rate_limit: RateLimitConfig,
    pub guardian_sweep_interval: Duration,
    pub enable_test_token_route: bool,
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub ttl_hours: i64,
    pub encrypt_claims: bool,
}

#[derive(Debug, Clone)]
pub struct SuperadminConfig {
    pub email: String,
    pub password: String,
}

/// Argon2 cost parameters. `None` keeps the argon2 crate default.
#[derive(Debug, Clone, Default)]
pub struct PasswordHashConfig {
    pub memory_kib: Option<u32>,
    pub iterations: Option<u32>,
    pub parallelism: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window: Duration::from_secs(60),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let require = |key: &str| get(key).ok_or_else(|| anyhow!("{key} is not set"));

        let database_url = match get("DATABASE_URL") {
            Some(url) => url,
            None => {
                let host = require("DB_HOST")?;
                let user = require("DB_USER")?;
                let password = require("DB_PASSWORD")?;
                let name = require("DB_NAME")?;
                let port = parse_or("DB_PORT", get("DB_PORT"), 5432u16)?;
                format!("postgres://{user}:{password}@{host}:{port}/{name}")
            }
        };

        let host = get("APP_HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let port = parse_or("APP_PORT", get("APP_PORT"), 3000u16)?;

        let jwt = JwtConfig {
            secret: require("JWT_SECRET")?,
            ttl_hours: parse_or("JWT_TTL_HOURS", get("JWT_TTL_HOURS"), 24i64)?,
            encrypt_claims: parse_or("JWT_ENCRYPT_CLAIMS", get("JWT_ENCRYPT_CLAIMS"), true)?,
        };
        if !(1..=MAX_TOKEN_TTL_HOURS).contains(&jwt.ttl_hours) {
            bail!("JWT_TTL_HOURS must be between 1 and {MAX_TOKEN_TTL_HOURS}");
        }

        let encryption_key =
            cipher::parse_key(&require("ENCRYPTION_KEY")?).context("ENCRYPTION_KEY is invalid")?;

        let superadmin = SuperadminConfig {
            email: require("SUPERADMIN_EMAIL")?,
            password: require("SUPERADMIN_PASSWORD")?,
        };

        let password_hash = PasswordHashConfig {
            memory_kib: parse_opt("PASSWORD_HASH_MEMORY_KIB", get("PASSWORD_HASH_MEMORY_KIB"))?,
            iterations: parse_opt("PASSWORD_HASH_ITERATIONS", get("PASSWORD_HASH_ITERATIONS"))?,
            parallelism: parse_opt(
                "PASSWORD_HASH_PARALLELISM",
                get("PASSWORD_HASH_PARALLELISM"),
            )?,
        };

        let defaults = RateLimitConfig::default();
        let rate_limit = RateLimitConfig {
            max_requests: parse_or(
                "RATE_LIMIT_MAX_REQUESTS",
                get("RATE_LIMIT_MAX_REQUESTS"),
                defaults.max_requests,
            )?,
            window: Duration::from_secs(parse_or(
                "RATE_LIMIT_WINDOW_SECS",
                get("RATE_LIMIT_WINDOW_SECS"),
                defaults.window.as_secs(),
            )?),
        };
        if rate_limit.max_requests == 0 || rate_limit.window.is_zero() {
            bail!("rate limit values must be positive");
        }

        let guardian_sweep_interval = Duration::from_secs(parse_or(
            "GUARDIAN_SWEEP_INTERVAL_SECS",
            get("GUARDIAN_SWEEP_INTERVAL_SECS"),
            24 * 60 * 60u64,
        )?);
        if guardian_sweep_interval.is_zero() {
            bail!("GUARDIAN_SWEEP_INTERVAL_SECS must be positive");
        }

        let enable_test_token_route = parse_or(
            "ENABLE_TEST_TOKEN_ROUTE",
            get("ENABLE_TEST_TOKEN_ROUTE"),
            false,
        )?;

        Ok(Self {
            database_url,
            host,
            port,
            jwt,
            encryption_key,
            superadmin,
            password_hash,
            rate_limit,
            guardian_sweep_interval,
            enable_test_token_route,
        })
    }
}

fn parse_or<T>(key: &str, raw: Option<String>, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    Ok(parse_opt(key, raw)?.unwrap_or(default))
}

fn parse_opt<T>(key: &str, raw: Option<String>) -> anyhow::Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.map(|v| {
        v.trim()
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value"))
    })
    .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn base() -> HashMap<&'static str, String> {
        HashMap::from([
            ("DATABASE_URL", "postgres://u:p@localhost/db".to_string()),
            ("JWT_SECRET", "secret".to_string()),
            ("ENCRYPTION_KEY", "0123456789abcdef0123456789abcdef".to_string()),
            ("SUPERADMIN_EMAIL", "root@example.com".to_string()),
            ("SUPERADMIN_PASSWORD", "changeme".to_string()),
        ])
    }

    fn load(vars: &HashMap<&'static str, String>) -> anyhow::Result<AppConfig> {
        AppConfig::from_lookup(|k| vars.get(k).cloned())
    }

    #[test]
    fn defaults_are_applied() {
        let config = load(&base()).unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.jwt.ttl_hours, 24);
        assert!(config.jwt.encrypt_claims);
        assert_eq!(config.rate_limit.max_requests, 100);
        assert_eq!(config.guardian_sweep_interval, Duration::from_secs(86_400));
        assert!(!config.enable_test_token_route);
    }

    #[test]
    fn database_url_is_composed_from_parts() {
        let mut vars = base();
        vars.remove("DATABASE_URL");
        vars.insert("DB_HOST", "db.local".into());
        vars.insert("DB_USER", "gym".into());
        vars.insert("DB_PASSWORD", "pw".into());
        vars.insert("DB_NAME", "members".into());
        vars.insert("DB_PORT", "6543".into());

        let config = load(&vars).unwrap();
        assert_eq!(config.database_url, "postgres://gym:pw@db.local:6543/members");
    }

    #[test]
    fn short_encryption_key_is_rejected() {
        let mut vars = base();
        vars.insert("ENCRYPTION_KEY", "too-short".into());
        let err = load(&vars).unwrap_err();
        assert!(format!("{err:#}").contains("32 bytes"));
    }

    #[test]
    fn zero_sweep_interval_is_rejected() {
        let mut vars = base();
        vars.insert("GUARDIAN_SWEEP_INTERVAL_SECS", "0".into());
        let err = load(&vars).unwrap_err();
        assert!(err.to_string().contains("GUARDIAN_SWEEP_INTERVAL_SECS"));
    }

    #[test]
    fn token_ttl_out_of_range_is_rejected() {
        for ttl in ["0", "876000000000"] {
            let mut vars = base();
            vars.insert("JWT_TTL_HOURS", ttl.into());
            let err = load(&vars).unwrap_err();
            assert!(err.to_string().contains("JWT_TTL_HOURS"));
        }

        let mut vars = base();
        vars.insert("JWT_TTL_HOURS", MAX_TOKEN_TTL_HOURS.to_string());
        assert_eq!(load(&vars).unwrap().jwt.ttl_hours, MAX_TOKEN_TTL_HOURS);
    }

    #[test]
    fn missing_jwt_secret_is_rejected() {
        let mut vars = base();
        vars.remove("JWT_SECRET");
        assert!(load(&vars).is_err());
    }

    #[test]
    fn malformed_number_is_rejected() {
        let mut vars = base();
        vars.insert("APP_PORT", "eighty".into());
        assert!(load(&vars).is_err());
    }
}
