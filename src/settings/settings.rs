use anyhow::{Result, anyhow};
use config::{Config, File};
use serde::Deserialize;
use std::fmt;

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub http: Http,
    pub log: Log,
    pub jwt: Jwt,
    pub store: Store,
    pub session: Session,
    pub gateway: Gateway,
}

#[derive(Debug, Deserialize)]
pub struct Http {
    pub address: String,
}

#[derive(Debug, Deserialize)]
pub struct Log {
    pub filter: String,
}

#[derive(Deserialize)]
pub struct Jwt {
    pub signing_key: String,
    pub access_ttl_secs: u64,
    pub refresh_ttl_secs: u64,
}

// Settings are logged at startup; the signing key must not be.
impl fmt::Debug for Jwt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Jwt")
            .field("signing_key", &"<redacted>")
            .field("access_ttl_secs", &self.access_ttl_secs)
            .field("refresh_ttl_secs", &self.refresh_ttl_secs)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
pub struct Store {
    pub backend: String, // "mysql" or "memory"
    pub mysql_dsn: String,
}

#[derive(Debug, Deserialize)]
pub struct Session {
    pub backend: String, // "redis" or "memory"
    pub redis_dsn: String,
    pub sweep_interval_secs: u64,
}

#[derive(Debug, Deserialize)]
pub struct Gateway {
    pub address: String,
    pub upstream_url: String,
    pub validate_url: String,
    pub timeout_ms: u64,
    pub whitelist: Vec<String>,
    pub tls: Option<GatewayTls>,
}

#[derive(Debug, Deserialize)]
pub struct GatewayTls {
    pub cert_path: String,
    pub key_path: String,
}

#[cfg(debug_assertions)]
const SETTINGS_PATH: &str = "settings/dev.toml";
#[cfg(not(debug_assertions))]
const SETTINGS_PATH: &str = "settings/release.toml";

pub fn parse_settings(path: Option<&str>) -> Result<Settings> {
    let path = path.unwrap_or(SETTINGS_PATH);

    let settings: Settings = Config::builder()
        .add_source(File::with_name(path))
        .build()
        .map_err(|e| anyhow!(e))?
        .try_deserialize()
        .map_err(|e| anyhow!(e))?;

    Ok(settings)
}
