use std::fmt::Display;
use std::net::SocketAddr;
use std::ops::RangeInclusive;
use std::str::FromStr;

use anyhow::{anyhow, bail, Context};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

/// Which `PortalStore` implementation backs the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Postgres,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            other => Err(anyhow!("unknown storage backend `{other}`")),
        }
    }
}

/// Who may read the public project listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadPolicy {
    Public,
    Authenticated,
}

impl FromStr for ReadPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "public" => Ok(Self::Public),
            "authenticated" => Ok(Self::Authenticated),
            other => Err(anyhow!("unknown read policy `{other}`")),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub storage: StorageBackend,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub jwt: JwtConfig,
    pub allowed_email_domain: String,
    pub projects_read: ReadPolicy,
    pub bind_addr: SocketAddr,
}

/// Parses a numeric variable and rejects values outside `range`.
fn parse_bounded<T>(key: &str, raw: &str, range: RangeInclusive<T>) -> anyhow::Result<T>
where
    T: FromStr + PartialOrd + Display,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let value: T = raw
        .trim()
        .parse()
        .with_context(|| format!("{key} must be a whole number, got `{raw}`"))?;
    if !range.contains(&value) {
        bail!(
            "{key} must be between {} and {}, got {value}",
            range.start(),
            range.end()
        );
    }
    Ok(value)
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    pub fn from_vars<F>(var: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let storage = match var("STORAGE_BACKEND") {
            Some(v) => v.parse().context("STORAGE_BACKEND")?,
            None => StorageBackend::Postgres,
        };

        let database_url = var("DATABASE_URL");
        if storage == StorageBackend::Postgres && database_url.is_none() {
            anyhow::bail!("DATABASE_URL is required for the postgres storage backend");
        }

        let jwt = JwtConfig {
            secret: var("JWT_SECRET").context("JWT_SECRET is required")?,
            issuer: var("JWT_ISSUER").unwrap_or_else(|| "project-portal".into()),
            audience: var("JWT_AUDIENCE").unwrap_or_else(|| "project-portal-users".into()),
            ttl_minutes: match var("JWT_TTL_MINUTES") {
                // one year at most
                Some(v) => parse_bounded("JWT_TTL_MINUTES", &v, 1..=525_600)?,
                None => 30,
            },
        };

        let database_max_connections = match var("DATABASE_MAX_CONNECTIONS") {
            Some(v) => parse_bounded("DATABASE_MAX_CONNECTIONS", &v, 1..=1_000)?,
            None => 10,
        };

        let host = var("APP_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = match var("APP_PORT") {
            Some(v) => parse_bounded("APP_PORT", &v, 1..=u16::MAX)?,
            None => 8080,
        };
        let bind_addr: SocketAddr = format!("{}:{port}", host.trim())
            .parse()
            .with_context(|| format!("APP_HOST must be an IP address, got `{host}`"))?;

        let projects_read = match var("PROJECTS_READ_POLICY") {
            Some(v) => v.parse().context("PROJECTS_READ_POLICY")?,
            None => ReadPolicy::Public,
        };

        Ok(Self {
            storage,
            database_url,
            database_max_connections,
            jwt,
            allowed_email_domain: var("ALLOWED_EMAIL_DOMAIN")
                .map(|d| d.trim().trim_start_matches('@').to_lowercase())
                .unwrap_or_else(|| "mits.ac.in".into()),
            projects_read,
            bind_addr,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_for_optional_vars() {
        let cfg = AppConfig::from_vars(vars(&[
            ("DATABASE_URL", "postgres://localhost/portal"),
            ("JWT_SECRET", "s3cret"),
        ]))
        .expect("config should load");

        assert_eq!(cfg.storage, StorageBackend::Postgres);
        assert_eq!(cfg.jwt.ttl_minutes, 30);
        assert_eq!(cfg.jwt.issuer, "project-portal");
        assert_eq!(cfg.allowed_email_domain, "mits.ac.in");
        assert_eq!(cfg.projects_read, ReadPolicy::Public);
        assert_eq!(cfg.database_max_connections, 10);
        assert_eq!(cfg.bind_addr, "0.0.0.0:8080".parse::<SocketAddr>().unwrap());
    }

    #[test]
    fn memory_backend_does_not_need_database_url() {
        let cfg = AppConfig::from_vars(vars(&[
            ("STORAGE_BACKEND", "memory"),
            ("JWT_SECRET", "s3cret"),
            ("ALLOWED_EMAIL_DOMAIN", "@Inst.EDU"),
            ("PROJECTS_READ_POLICY", "authenticated"),
        ]))
        .expect("config should load");

        assert_eq!(cfg.storage, StorageBackend::Memory);
        assert!(cfg.database_url.is_none());
        assert_eq!(cfg.allowed_email_domain, "inst.edu");
        assert_eq!(cfg.projects_read, ReadPolicy::Authenticated);
    }

    #[test]
    fn postgres_backend_requires_database_url() {
        let err = AppConfig::from_vars(vars(&[("JWT_SECRET", "s3cret")])).unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));
    }

    #[test]
    fn missing_secret_is_an_error() {
        let err = AppConfig::from_vars(vars(&[("STORAGE_BACKEND", "memory")])).unwrap_err();
        assert!(err.to_string().contains("JWT_SECRET"));
    }

    #[test]
    fn unknown_backend_is_rejected() {
        let err = AppConfig::from_vars(vars(&[
            ("STORAGE_BACKEND", "sqlite"),
            ("JWT_SECRET", "s3cret"),
        ]))
        .unwrap_err();
        assert!(format!("{err:#}").contains("sqlite"));
    }

    fn memory_with(extra: &[(&str, &str)]) -> anyhow::Result<AppConfig> {
        let mut pairs = vec![("STORAGE_BACKEND", "memory"), ("JWT_SECRET", "s3cret")];
        pairs.extend_from_slice(extra);
        AppConfig::from_vars(vars(&pairs))
    }

    #[test]
    fn malformed_numbers_are_rejected_not_defaulted() {
        let err = memory_with(&[("JWT_TTL_MINUTES", "3O")]).unwrap_err();
        assert!(format!("{err:#}").contains("JWT_TTL_MINUTES"));

        let err = memory_with(&[("DATABASE_MAX_CONNECTIONS", "ten")]).unwrap_err();
        assert!(format!("{err:#}").contains("DATABASE_MAX_CONNECTIONS"));

        let err = memory_with(&[("APP_PORT", "80a")]).unwrap_err();
        assert!(format!("{err:#}").contains("APP_PORT"));
    }

    #[test]
    fn token_lifetime_must_be_in_range() {
        for bad in ["0", "-5", "100000000000", "525601"] {
            let err = memory_with(&[("JWT_TTL_MINUTES", bad)]).unwrap_err();
            assert!(format!("{err:#}").contains("JWT_TTL_MINUTES"), "{bad}");
        }
        let cfg = memory_with(&[("JWT_TTL_MINUTES", " 45 ")]).unwrap();
        assert_eq!(cfg.jwt.ttl_minutes, 45);
    }

    #[test]
    fn pool_size_must_be_positive() {
        let err = memory_with(&[("DATABASE_MAX_CONNECTIONS", "0")]).unwrap_err();
        assert!(err.to_string().contains("DATABASE_MAX_CONNECTIONS"));
        let cfg = memory_with(&[("DATABASE_MAX_CONNECTIONS", "25")]).unwrap();
        assert_eq!(cfg.database_max_connections, 25);
    }

    #[test]
    fn listen_address_comes_from_host_and_port() {
        let cfg = memory_with(&[("APP_HOST", "127.0.0.1"), ("APP_PORT", "9000")]).unwrap();
        assert_eq!(cfg.bind_addr, "127.0.0.1:9000".parse::<SocketAddr>().unwrap());

        let err = memory_with(&[("APP_HOST", "not a host")]).unwrap_err();
        assert!(err.to_string().contains("APP_HOST"));

        let err = memory_with(&[("APP_PORT", "70000")]).unwrap_err();
        assert!(format!("{err:#}").contains("APP_PORT"));
    }
}
