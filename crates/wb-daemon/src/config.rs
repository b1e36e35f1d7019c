// config.rs — Daemon settings loaded from `.weighbridge/daemon.toml`.
//
// Every field has a default, so a missing file or an empty one yields a
// working local setup. The `--bind` flag overrides `bind`.

use std::net::SocketAddr;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// HTTP daemon configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DaemonConfig {
    /// Listen address.
    #[serde(default = "default_bind")]
    pub bind: SocketAddr,

    /// Browser origins allowed to call the API.
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,

    /// Origins ending in any of these suffixes are also allowed
    /// (e.g. ".onrender.com" for hosted front ends).
    #[serde(default)]
    pub allowed_origin_suffixes: Vec<String>,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            allowed_origins: default_allowed_origins(),
            allowed_origin_suffixes: Vec::new(),
        }
    }
}

fn default_bind() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 5000))
}

fn default_allowed_origins() -> Vec<String> {
    vec![
        "http://localhost:5173".to_string(),
        "http://localhost:3000".to_string(),
    ]
}

impl DaemonConfig {
    /// Load from a TOML file, falling back to defaults if it does not exist.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no daemon config, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("invalid config in {}", path.display()))
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Whether a request `Origin` header value may use the API.
    pub fn origin_allowed(&self, origin: &str) -> bool {
        self.allowed_origins.iter().any(|o| o == origin)
            || self
                .allowed_origin_suffixes
                .iter()
                .any(|suffix| origin.ends_with(suffix.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn empty_file_gives_defaults() {
        let config = DaemonConfig::parse("").unwrap();
        assert_eq!(config, DaemonConfig::default());
        assert_eq!(config.bind.port(), 5000);
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = DaemonConfig::load(&dir.path().join("daemon.toml")).unwrap();
        assert_eq!(config, DaemonConfig::default());
    }

    #[test]
    fn parses_overrides() {
        let config = DaemonConfig::parse(
            r#"
bind = "0.0.0.0:8080"
allowed_origins = ["https://yard.example.com"]
allowed_origin_suffixes = [".onrender.com"]
"#,
        )
        .unwrap();
        assert_eq!(config.bind.port(), 8080);
        assert!(config.origin_allowed("https://yard.example.com"));
        assert!(config.origin_allowed("https://weighbridge-ui.onrender.com"));
        assert!(!config.origin_allowed("http://localhost:5173"));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("daemon.toml");
        std::fs::write(&path, "bind = 42").unwrap();
        assert!(DaemonConfig::load(&path).is_err());
    }
}
