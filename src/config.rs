//! Configuration management for Stash

use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::upload::{
    SessionLimits, DEFAULT_MAX_ANONYMOUS_BYTES, DEFAULT_MAX_HEADER_BYTES, DEFAULT_SAFETY_MARGIN,
};

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub upload: UploadConfig,
    pub maintenance: MaintenanceConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Public host (and port) used in returned URLs
    pub domain: String,
    pub https: bool,
    /// Static UI directory served under `/public`
    pub public_dir: PathBuf,
}

impl ServerConfig {
    /// `http[s]://<domain>`, without a trailing slash
    pub fn base_url(&self) -> String {
        let scheme = if self.https { "https" } else { "http" };
        format!("{}://{}", scheme, self.domain.trim_end_matches('/'))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Permanent upload directory
    pub root_dir: PathBuf,
    /// Directory for in-flight temp files
    pub temp_dir: PathBuf,
    /// Length of generated file stems and short codes
    pub filename_length: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    pub safety_margin: usize,
    pub max_header_bytes: usize,
    /// File bytes streamed before a `password` form field must have vouched
    pub max_anonymous_bytes: u64,
}

impl UploadConfig {
    pub fn limits(&self) -> SessionLimits {
        SessionLimits {
            min_safety_margin: self.safety_margin,
            max_header_bytes: self.max_header_bytes,
            max_unverified_bytes: None,
        }
    }

    /// Limits for a request that arrived without header or cookie credentials
    pub fn anonymous_limits(&self) -> SessionLimits {
        SessionLimits {
            max_unverified_bytes: Some(self.max_anonymous_bytes),
            ..self.limits()
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MaintenanceConfig {
    pub sweep_max_age_hours: u64,
    pub interval_secs: u64,
}

impl MaintenanceConfig {
    pub fn sweep_max_age(&self) -> Duration {
        Duration::from_secs(self.sweep_max_age_hours * 3600)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// `user:pass,user:pass`
    pub admins: String,
    /// `user:pass,user:pass`
    pub users: String,
    pub jwt_expiry_days: i64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
                domain: "localhost:3000".to_string(),
                https: false,
                public_dir: PathBuf::from("dist"),
            },
            storage: StorageConfig {
                root_dir: PathBuf::from("uploads"),
                temp_dir: PathBuf::from("uploads/.incoming"),
                filename_length: 8,
            },
            upload: UploadConfig {
                safety_margin: DEFAULT_SAFETY_MARGIN,
                max_header_bytes: DEFAULT_MAX_HEADER_BYTES,
                max_anonymous_bytes: DEFAULT_MAX_ANONYMOUS_BYTES,
            },
            maintenance: MaintenanceConfig {
                sweep_max_age_hours: 24,
                interval_secs: 3600,
            },
            database: DatabaseConfig {
                url: "sqlite:./db.sqlite".to_string(),
            },
            auth: AuthConfig {
                admins: String::new(),
                users: String::new(),
                jwt_expiry_days: 30,
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let root_dir =
            PathBuf::from(env::var("ROOT_DIR").unwrap_or_else(|_| "uploads".to_string()));
        let temp_dir = env::var("UPLOAD_TEMP_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| root_dir.join(".incoming"));
        let dev = parse_var::<bool>("DEV", false)?;

        Ok(Config {
            server: ServerConfig {
                host: env::var("ADDRESS").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parse_var("PORT", 3000)?,
                domain: env::var("DOMAIN").unwrap_or_else(|_| "localhost:3000".to_string()),
                https: parse_var("HTTPS", false)?,
                public_dir: env::var("PUBLIC_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from(if dev { "public" } else { "dist" })),
            },
            storage: StorageConfig {
                root_dir,
                temp_dir,
                filename_length: parse_var("FILENAME_LENGTH", 8)?,
            },
            upload: UploadConfig {
                safety_margin: parse_var("UPLOAD_SAFETY_MARGIN", DEFAULT_SAFETY_MARGIN)?,
                max_header_bytes: parse_var("UPLOAD_MAX_HEADER_BYTES", DEFAULT_MAX_HEADER_BYTES)?,
                max_anonymous_bytes: parse_var(
                    "UPLOAD_ANON_MAX_BYTES",
                    DEFAULT_MAX_ANONYMOUS_BYTES,
                )?,
            },
            maintenance: MaintenanceConfig {
                sweep_max_age_hours: parse_var("SWEEP_MAX_AGE_HOURS", 24)?,
                interval_secs: parse_var("MAINTENANCE_INTERVAL_SECS", 3600)?,
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite:./db.sqlite".to_string()),
            },
            auth: AuthConfig {
                admins: env::var("ADMINS").unwrap_or_default(),
                users: env::var("USERS").unwrap_or_default(),
                jwt_expiry_days: parse_var("JWT_EXPIRY_DAYS", 30)?,
            },
        })
    }
}

/// Read `var`, using `default` when unset and failing when it does not parse
fn parse_var<T: FromStr>(var: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(var) {
        Ok(value) => parse_value(var, &value),
        Err(_) => Ok(default),
    }
}

fn parse_value<T: FromStr>(var: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        var,
        value: value.to_string(),
    })
}
