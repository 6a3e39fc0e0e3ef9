use anyhow::{Context, Result};
use dotenv::dotenv;
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

/// 500 MiB
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 500 * 1024 * 1024;
pub const DEFAULT_SESSION_TTL_HOURS: i64 = 24;
pub const PAGE_SIZE: i64 = 10;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub bind_addr: SocketAddr,
    pub media_root: PathBuf,
    pub max_upload_bytes: u64,
    pub session_ttl_hours: i64,
    pub metrics_addr: Option<SocketAddr>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();
        let database_url = env::var("DATABASE_URL").ok();
        let jwt_secret = env::var("JWT_SECRET").unwrap_or_else(|_| "jwt_secret".to_string());
        let bind_addr = env::var("BIND_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:8000".to_string())
            .parse()
            .context("BIND_ADDR is not a socket address")?;
        let media_root = env::var("MEDIA_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("media"));
        let max_upload_bytes = match env::var("MAX_UPLOAD_BYTES") {
            Ok(v) => v.parse().context("MAX_UPLOAD_BYTES is not a number")?,
            Err(_) => DEFAULT_MAX_UPLOAD_BYTES,
        };
        let session_ttl_hours = match env::var("SESSION_TTL_HOURS") {
            Ok(v) => v.parse().context("SESSION_TTL_HOURS is not a number")?,
            Err(_) => DEFAULT_SESSION_TTL_HOURS,
        };
        let metrics_addr = match env::var("METRICS_ADDR") {
            Ok(v) => Some(v.parse().context("METRICS_ADDR is not a socket address")?),
            Err(_) => None,
        };
        Ok(Self {
            database_url,
            jwt_secret,
            bind_addr,
            media_root,
            max_upload_bytes,
            session_ttl_hours,
            metrics_addr,
        })
    }

    /// Settings for tests and `--in-memory` runs rooted at `media_root`.
    pub fn for_media_root(media_root: impl Into<PathBuf>) -> Self {
        Self {
            database_url: None,
            jwt_secret: "jwt_secret".to_string(),
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8000)),
            media_root: media_root.into(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            session_ttl_hours: DEFAULT_SESSION_TTL_HOURS,
            metrics_addr: None,
        }
    }

    pub fn require_database_url(&self) -> Result<&str> {
        self.database_url
            .as_deref()
            .context("DATABASE_URL not set (use --in-memory to run without Postgres)")
    }
}
