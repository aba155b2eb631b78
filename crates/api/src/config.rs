//! Process configuration, read once from the environment at startup.

use std::path::PathBuf;
use std::str::FromStr;

use chrono::Duration;
use thiserror::Error;

use opsconsole_core::ClassificationId;
use opsconsole_infra::ServiceConfig;
use opsconsole_infra::services::{DEFAULT_SERVICE_DESK_CODE, DEFAULT_TOKEN_TTL_MINUTES};
use opsconsole_monitoring::DEFAULT_IDLE_SECONDS;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_BLOB_DIR: &str = "./storage";
const DEV_JWT_SECRET: &str = "dev-secret";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid {var}='{value}': {reason}")]
pub struct ConfigError {
    pub var: &'static str,
    pub value: String,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub bind_addr: String,
    pub jwt_secret: String,
    pub jwt_ttl: Duration,
    /// Unset means in-memory stores.
    pub database_url: Option<String>,
    pub blob_storage_dir: PathBuf,
    pub service: ServiceConfig,
    /// Email and password of the super_admin seeded on first start.
    pub bootstrap_admin: Option<(String, String)>,
    pub cors_allow_origin: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            jwt_secret: DEV_JWT_SECRET.to_string(),
            jwt_ttl: Duration::minutes(DEFAULT_TOKEN_TTL_MINUTES),
            database_url: None,
            blob_storage_dir: PathBuf::from(DEFAULT_BLOB_DIR),
            service: ServiceConfig::default(),
            bootstrap_admin: None,
            cors_allow_origin: "*".to_string(),
        }
    }
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let jwt_secret = get("JWT_SECRET").unwrap_or_else(|| {
            tracing::warn!("JWT_SECRET not set; using insecure dev default");
            DEV_JWT_SECRET.to_string()
        });

        let ttl_minutes: i64 = parse_or("JWT_TTL_MINUTES", get("JWT_TTL_MINUTES"), DEFAULT_TOKEN_TTL_MINUTES)?;
        if ttl_minutes <= 0 {
            return Err(invalid("JWT_TTL_MINUTES", ttl_minutes.to_string(), "must be positive"));
        }
        let idle_seconds: i64 = parse_or("SESSION_IDLE_SECONDS", get("SESSION_IDLE_SECONDS"), DEFAULT_IDLE_SECONDS)?;
        if idle_seconds <= 0 {
            return Err(invalid("SESSION_IDLE_SECONDS", idle_seconds.to_string(), "must be positive"));
        }

        let it_equipment_classification_id = get("IT_EQUIPMENT_CLASSIFICATION_ID")
            .map(|raw| {
                ClassificationId::from_str(&raw)
                    .map_err(|e| invalid("IT_EQUIPMENT_CLASSIFICATION_ID", raw.clone(), e.to_string()))
            })
            .transpose()?;

        let bootstrap_admin = match (get("BOOTSTRAP_ADMIN_EMAIL"), get("BOOTSTRAP_ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some((email, password)),
            (None, None) => None,
            (Some(email), None) => {
                return Err(invalid(
                    "BOOTSTRAP_ADMIN_PASSWORD",
                    String::new(),
                    format!("required together with BOOTSTRAP_ADMIN_EMAIL ({email})"),
                ));
            }
            (None, Some(_)) => {
                return Err(invalid(
                    "BOOTSTRAP_ADMIN_EMAIL",
                    String::new(),
                    "required together with BOOTSTRAP_ADMIN_PASSWORD",
                ));
            }
        };

        Ok(Self {
            bind_addr: get("BIND_ADDR").unwrap_or(defaults.bind_addr),
            jwt_secret,
            jwt_ttl: Duration::minutes(ttl_minutes),
            database_url: get("DATABASE_URL"),
            blob_storage_dir: get("BLOB_STORAGE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.blob_storage_dir),
            service: ServiceConfig {
                service_desk_department_code: get("SERVICE_DESK_DEPARTMENT_CODE")
                    .unwrap_or_else(|| DEFAULT_SERVICE_DESK_CODE.to_string()),
                it_equipment_classification_id,
                session_idle: Duration::seconds(idle_seconds),
            },
            bootstrap_admin,
            cors_allow_origin: get("CORS_ALLOW_ORIGIN").unwrap_or(defaults.cors_allow_origin),
        })
    }
}

fn invalid(var: &'static str, value: String, reason: impl Into<String>) -> ConfigError {
    ConfigError {
        var,
        value,
        reason: reason.into(),
    }
}

fn parse_or<T>(var: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: core::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|e: T::Err| invalid(var, raw.clone(), e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let cfg = ApiConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg.bind_addr, DEFAULT_BIND_ADDR);
        assert_eq!(cfg.jwt_ttl, Duration::minutes(720));
        assert_eq!(cfg.database_url, None);
        assert_eq!(cfg.service.service_desk_department_code, "IT");
        assert_eq!(cfg.service.session_idle, Duration::seconds(300));
        assert!(cfg.bootstrap_admin.is_none());
        assert_eq!(cfg.cors_allow_origin, "*");
    }

    #[test]
    fn reads_overrides() {
        let class = ClassificationId::new();
        let cfg = ApiConfig::from_lookup(lookup(&[
            ("BIND_ADDR", "127.0.0.1:9000"),
            ("JWT_TTL_MINUTES", "30"),
            ("DATABASE_URL", "postgres://ops@localhost/ops"),
            ("SERVICE_DESK_DEPARTMENT_CODE", "ICT"),
            ("IT_EQUIPMENT_CLASSIFICATION_ID", &class.to_string()),
            ("SESSION_IDLE_SECONDS", "60"),
            ("BOOTSTRAP_ADMIN_EMAIL", "root@ops.test"),
            ("BOOTSTRAP_ADMIN_PASSWORD", "Sup3r-Secret!"),
        ]))
        .unwrap();
        assert_eq!(cfg.bind_addr, "127.0.0.1:9000");
        assert_eq!(cfg.jwt_ttl, Duration::minutes(30));
        assert_eq!(cfg.database_url.as_deref(), Some("postgres://ops@localhost/ops"));
        assert_eq!(cfg.service.service_desk_department_code, "ICT");
        assert_eq!(cfg.service.it_equipment_classification_id, Some(class));
        assert_eq!(cfg.service.session_idle, Duration::seconds(60));
        assert_eq!(
            cfg.bootstrap_admin,
            Some(("root@ops.test".to_string(), "Sup3r-Secret!".to_string()))
        );
    }

    #[test]
    fn rejects_bad_values() {
        let err = ApiConfig::from_lookup(lookup(&[("JWT_TTL_MINUTES", "soon")])).unwrap_err();
        assert_eq!(err.var, "JWT_TTL_MINUTES");

        let err = ApiConfig::from_lookup(lookup(&[("SESSION_IDLE_SECONDS", "0")])).unwrap_err();
        assert_eq!(err.var, "SESSION_IDLE_SECONDS");

        let err = ApiConfig::from_lookup(lookup(&[("BOOTSTRAP_ADMIN_EMAIL", "root@ops.test")]))
            .unwrap_err();
        assert_eq!(err.var, "BOOTSTRAP_ADMIN_PASSWORD");
    }
}
