// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Server list configuration.
//!
//! The client side reads its server list from an `mcp_servers.json` file:
//!
//! ```json
//! {
//!   "mcpServers": {
//!     "shell": {
//!       "transport": "sse",
//!       "url": "http://127.0.0.1:8000/sse"
//!     }
//!   }
//! }
//! ```
//!
//! Servers without an SSE transport are skipped with a warning; supporting
//! other transports is somebody else's job.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

use crate::error::ConfigError;

/// Default config file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "mcp_servers.json";

/// One server entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Transport name; only "sse" is supported here.
    #[serde(default)]
    pub transport: Option<String>,

    /// URL of the server's `/sse` route.
    #[serde(default)]
    pub url: Option<String>,

    /// Whether to connect to this server.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl ServerConfig {
    /// Create an SSE server entry.
    pub fn sse(url: impl Into<String>) -> Self {
        Self {
            transport: Some("sse".to_string()),
            url: Some(url.into()),
            enabled: true,
        }
    }

    /// An entry counts as SSE when it says so or just carries a URL.
    pub fn is_sse(&self) -> bool {
        self.transport.as_deref() == Some("sse") || self.url.is_some()
    }
}

/// The parsed server list, in deterministic (name-sorted) order.
#[derive(Debug, Clone, Default)]
pub struct McpConfig {
    pub servers: Vec<(String, ServerConfig)>,
}

impl McpConfig {
    /// Create an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a file.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parse configuration from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        #[derive(Deserialize)]
        struct FullConfig {
            #[serde(default, rename = "mcpServers")]
            mcp_servers: serde_json::Map<String, serde_json::Value>,
        }

        let full: FullConfig = serde_json::from_str(json)?;
        let mut servers = Vec::with_capacity(full.mcp_servers.len());
        for (name, value) in full.mcp_servers {
            let config: ServerConfig = serde_json::from_value(value)?;
            servers.push((name, config));
        }
        Ok(Self { servers })
    }

    /// Add a server configuration.
    pub fn add_server(&mut self, name: impl Into<String>, config: ServerConfig) {
        self.servers.push((name.into(), config));
    }

    /// The enabled SSE servers as (name, stream url) pairs.
    ///
    /// Entries without an SSE transport or without a URL are skipped.
    pub fn sse_servers(&self) -> Result<Vec<(String, String)>, ConfigError> {
        if self.servers.is_empty() {
            return Err(ConfigError::NoServers(
                "config contains no server entries".to_string(),
            ));
        }

        let mut result = Vec::new();
        for (name, config) in &self.servers {
            if !config.enabled {
                continue;
            }
            if !config.is_sse() {
                warn!(server = %name, "Skipping server without SSE transport");
                continue;
            }
            match &config.url {
                Some(url) => result.push((name.clone(), url.clone())),
                None => {
                    warn!(server = %name, "Skipping SSE server without a url");
                }
            }
        }

        if result.is_empty() {
            return Err(ConfigError::NoServers(
                "no enabled SSE servers in config".to_string(),
            ));
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_config() {
        let json = r#"{
            "mcpServers": {
                "shell": {"transport": "sse", "url": "http://127.0.0.1:8000/sse"},
                "other": {"url": "http://127.0.0.1:9000/sse"}
            }
        }"#;

        let config = McpConfig::from_json(json).unwrap();
        assert_eq!(config.servers.len(), 2);

        let servers = config.sse_servers().unwrap();
        assert_eq!(servers.len(), 2);
        assert!(servers
            .iter()
            .any(|(name, url)| name == "shell" && url.ends_with(":8000/sse")));
    }

    #[test]
    fn test_empty_config_is_an_error() {
        let config = McpConfig::from_json(r#"{"mcpServers": {}}"#).unwrap();
        assert!(matches!(
            config.sse_servers(),
            Err(ConfigError::NoServers(_))
        ));
    }

    #[test]
    fn test_non_sse_servers_are_skipped() {
        let json = r#"{
            "mcpServers": {
                "local": {"transport": "stdio", "command": "some-server"},
                "shell": {"transport": "sse", "url": "http://127.0.0.1:8000/sse"}
            }
        }"#;

        let config = McpConfig::from_json(json).unwrap();
        let servers = config.sse_servers().unwrap();
        assert_eq!(servers.len(), 1);
        assert_eq!(servers[0].0, "shell");
    }

    #[test]
    fn test_disabled_server_skipped() {
        let json = r#"{
            "mcpServers": {
                "off": {"transport": "sse", "url": "http://x/sse", "enabled": false},
                "on": {"transport": "sse", "url": "http://y/sse"}
            }
        }"#;

        let config = McpConfig::from_json(json).unwrap();
        let servers = config.sse_servers().unwrap();
        assert_eq!(servers.len(), 1);
        assert_eq!(servers[0].0, "on");
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            McpConfig::from_json("{nope"),
            Err(ConfigError::JsonError(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"mcpServers": {{"shell": {{"transport": "sse", "url": "http://127.0.0.1:8000/sse"}}}}}}"#
        )
        .unwrap();

        let config = McpConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.servers.len(), 1);
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(
            McpConfig::load_from_file("/does/not/exist.json"),
            Err(ConfigError::NotFound(_))
        ));
    }
}
