//! Resolves the optional on-disk MCP configuration into an environment
//! mapping for this server.
//!
//! Resolution never fails from the caller's point of view: a missing,
//! unreadable or unparsable file degrades to an empty mapping with a logged
//! diagnostic, so a broken config cannot take the tool down.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

/// Entry looked up in the config file's `mcpServers` table.
pub(crate) const SERVER_CONFIG_KEY: &str = "webhook-mcp-server";

/// Environment variable overriding the config file location.
pub(crate) const CONFIG_PATH_ENV_VAR: &str = "CONFIG_PATH";

#[derive(Debug, Deserialize)]
struct McpConfig {
    #[serde(default, rename = "mcpServers")]
    mcp_servers: HashMap<String, McpServerConfig>,
}

#[derive(Debug, Deserialize)]
struct McpServerConfig {
    #[serde(default)]
    env: Option<HashMap<String, String>>,
}

#[derive(Debug, Error)]
enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Returns the config file location: `CONFIG_PATH` when set and non-empty,
/// else `~/.codeium/windsurf/mcp_config.json`. `None` only when the home
/// directory cannot be determined.
pub(crate) fn config_file_path() -> Option<PathBuf> {
    if let Ok(val) = std::env::var(CONFIG_PATH_ENV_VAR)
        && !val.is_empty()
    {
        return Some(PathBuf::from(val));
    }

    let mut p = dirs::home_dir()?;
    p.push(".codeium");
    p.push("windsurf");
    p.push("mcp_config.json");
    Some(p)
}

/// Environment mapping configured for this server. Read fresh on every call;
/// any failure degrades to an empty mapping.
pub(crate) fn load_configured_env() -> HashMap<String, String> {
    match config_file_path() {
        Some(path) => configured_env_from_file(&path),
        None => HashMap::new(),
    }
}

pub(crate) fn configured_env_from_file(path: &Path) -> HashMap<String, String> {
    if !path.exists() {
        return HashMap::new();
    }

    match read_config_file(path) {
        Ok(config) => config
            .mcp_servers
            .get(SERVER_CONFIG_KEY)
            .and_then(|server| server.env.clone())
            .unwrap_or_default(),
        Err(e) => {
            warn!("Error reading config file: {e}");
            HashMap::new()
        }
    }
}

fn read_config_file(path: &Path) -> Result<McpConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
