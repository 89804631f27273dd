//! # Configuration
//!
//! Centralizes all settings with a clear override hierarchy:
//! defaults → config file → env vars → CLI flags.
//!
//! Config lives at `~/.astro/config.toml`. If missing on first run, a
//! commented-out default is generated so users can discover all options.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::session::PendingPolicy;

// ============================================================================
// Config Structs (all fields Option<T> for sparse TOML)
// ============================================================================

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct AstroConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ServerConfig {
    pub url: Option<String>,
    pub connect_timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct SessionConfig {
    pub pending_policy: Option<PendingPolicy>,
}

// ============================================================================
// Defaults
// ============================================================================

pub const DEFAULT_SERVER_URL: &str = "https://chatgpt-realtime-server.onrender.com";
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;

/// Env var that overrides the server URL.
pub const SERVER_URL_ENV: &str = "ASTRO_SERVER_URL";

// ============================================================================
// Resolved Config (concrete values, no Options)
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    pub server_url: String,
    pub connect_timeout: Duration,
    pub pending_policy: PendingPolicy,
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "config I/O error: {e}"),
            ConfigError::Parse(e) => write!(f, "config parse error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Loading
// ============================================================================

/// Returns the path to `~/.astro/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".astro").join("config.toml"))
}

/// Load config from `~/.astro/config.toml`.
///
/// If the file doesn't exist, generates a commented-out default and
/// returns `AstroConfig::default()`.
pub fn load_config() -> Result<AstroConfig, ConfigError> {
    let Some(path) = config_path() else {
        warn!("Could not determine home directory, using default config");
        return Ok(AstroConfig::default());
    };
    load_config_from(&path)
}

/// Load config from an explicit path, generating a default file if missing.
pub fn load_config_from(path: &Path) -> Result<AstroConfig, ConfigError> {
    if !path.exists() {
        info!("No config file found, generating default at {}", path.display());
        generate_default_config(path);
        return Ok(AstroConfig::default());
    }

    let contents = fs::read_to_string(path).map_err(ConfigError::Io)?;
    let config: AstroConfig = toml::from_str(&contents).map_err(ConfigError::Parse)?;
    info!("Loaded config from {}", path.display());
    debug!("Config: {:?}", config);
    Ok(config)
}

fn generate_default_config(path: &Path) {
    let default_content = r#"# Astro Configuration
# All settings are optional; defaults are used for anything not specified.
# Override hierarchy: defaults → this file → env vars → CLI flags.

# [server]
# url = "https://chatgpt-realtime-server.onrender.com"   # Or set ASTRO_SERVER_URL
# connect_timeout_secs = 30

# [session]
# pending_policy = "keep"    # "keep" or "refresh": what a second send does while waiting
"#;

    if let Some(parent) = path.parent()
        && let Err(e) = fs::create_dir_all(parent)
    {
        warn!("Failed to create config directory: {}", e);
        return;
    }
    if let Err(e) = fs::write(path, default_content) {
        warn!("Failed to write default config: {}", e);
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// CLI overrides; `None` means the flag was not given.
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    pub server_url: Option<String>,
    pub pending_policy: Option<PendingPolicy>,
}

/// Resolve the final config by collapsing: defaults → config file → env vars → CLI.
pub fn resolve(config: &AstroConfig, cli: &CliOverrides) -> ResolvedConfig {
    resolve_with_env(config, cli, std::env::var(SERVER_URL_ENV).ok())
}

fn resolve_with_env(
    config: &AstroConfig,
    cli: &CliOverrides,
    env_server_url: Option<String>,
) -> ResolvedConfig {
    // Server URL: CLI → env → config → default
    let server_url = cli
        .server_url
        .clone()
        .or(env_server_url)
        .or_else(|| config.server.url.clone())
        .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string());

    let connect_timeout = Duration::from_secs(
        config
            .server
            .connect_timeout_secs
            .unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS),
    );

    // Pending policy: CLI → config → default
    let pending_policy = cli
        .pending_policy
        .or(config.session.pending_policy)
        .unwrap_or_default();

    ResolvedConfig {
        server_url,
        connect_timeout,
        pending_policy,
    }
}
