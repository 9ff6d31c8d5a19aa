use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};

const DEFAULT_SESSION_TTL_DAYS: i64 = 30;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    /// Public base URL for external access (e.g., "https://ops.example.com").
    /// Used for generating photo URLs. Falls back to `http://{host}:{port}`.
    pub public_base_url: Option<String>,
    pub session_ttl_days: i64,
}

impl ServerConfig {
    /// Reads a TOML config file. Keys that are absent keep their defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml(&raw)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))
    }

    pub fn from_toml(raw: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    pub fn socket_addr(&self) -> std::result::Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }

    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("opslog.db")
    }

    #[must_use]
    pub fn storage_dir(&self) -> PathBuf {
        self.data_dir.join("storage")
    }

    #[must_use]
    pub fn base_url(&self) -> String {
        match &self.public_base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("http://{}:{}", self.host, self.port),
        }
    }

    #[must_use]
    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::days(self.session_ttl_days)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            data_dir: PathBuf::from("./data"),
            public_base_url: None,
            session_ttl_days: DEFAULT_SESSION_TTL_DAYS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = ServerConfig::from_toml("port = 9090\ndata_dir = \"/srv/opslog\"").unwrap();
        assert_eq!(config.port, 9090);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.db_path(), PathBuf::from("/srv/opslog/opslog.db"));
        assert_eq!(config.session_ttl_days, 30);
    }

    #[test]
    fn test_base_url_trims_trailing_slash() {
        let config = ServerConfig {
            public_base_url: Some("https://ops.example.com/".to_string()),
            ..ServerConfig::default()
        };
        assert_eq!(config.base_url(), "https://ops.example.com");
        assert_eq!(ServerConfig::default().base_url(), "http://127.0.0.1:8080");
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        assert!(ServerConfig::from_toml("port = \"eighty\"").is_err());
    }
}
