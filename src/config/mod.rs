//! Configuration Management
//!
//! This module handles loading and saving named connection profiles.
//!
//! # Configuration Locations
//! - Local: `.employee-entry/config.json` (per directory, team-shareable)
//! - Global: `~/.config/employee-entry/connections.json` (per user)
//!
//! # Resolution Precedence
//! 1. Explicit connection flags (highest priority, applied by the CLI on top)
//! 2. Named profile, or the registry default, from the merged local + global view
//! 3. The built-in default (`MySQL` at `localhost:3306/DEMO`)
//!
//! Both files share one format:
//! ```json
//! {
//!   "connections": {
//!     "demo": { "engine": "mysql", "host": "localhost", "port": 3306, ... },
//!     "staff": { "engine": "sqlite", "file": "/var/lib/staff.db" }
//!   },
//!   "default": "demo"
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::engine::{ConnectionConfig, DatabaseType, DEFAULT_MYSQL_PORT, DEFAULT_POSTGRES_PORT};
use crate::error::{EntryError, Result};

const APP_DIR: &str = "employee-entry";
const LOCAL_DIR: &str = ".employee-entry";

/// Connection registry (stored in config files)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectionRegistry {
    /// Named connection profiles
    #[serde(default)]
    pub connections: HashMap<String, StoredConnection>,

    /// Name of the default profile (must exist in `connections`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

impl ConnectionRegistry {
    /// Merge `overlay` on top of `self`
    ///
    /// Profiles with the same name are replaced; the overlay's default wins when set.
    #[must_use]
    pub fn merged_with(mut self, overlay: Self) -> Self {
        self.connections.extend(overlay.connections);
        if overlay.default.is_some() {
            self.default = overlay.default;
        }
        self
    }
}

/// Stored connection profile
///
/// Same fields as `ConnectionConfig`, plus an optional environment variable
/// that supplies the password so it need not be written to disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredConnection {
    /// Connection configuration
    #[serde(flatten)]
    pub config: ConnectionConfig,

    /// Environment variable name for password (if not storing password directly)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_env: Option<String>,
}

impl StoredConnection {
    /// Resolve environment variables and return a `ConnectionConfig`
    pub fn resolve(&self) -> Result<ConnectionConfig> {
        let mut config = self.config.clone();

        if let Some(env_var) = &self.password_env {
            match std::env::var(env_var) {
                Ok(password) => config.password = Some(password),
                Err(_) => {
                    return Err(EntryError::config_error(format!(
                        "Environment variable {env_var} not found for password"
                    )));
                }
            }
        }

        Ok(config)
    }
}

/// A profile ready for use, remembering where its password came from
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedProfile {
    /// Connection configuration with the password filled in
    pub config: ConnectionConfig,

    /// Environment variable the password was read from, if any
    pub password_env: Option<String>,
}

impl ResolvedProfile {
    /// Apply explicit overrides
    ///
    /// An explicit password detaches the profile from its password variable.
    pub fn with_overrides(self, overrides: ConnectionOverrides) -> Result<Self> {
        let password_env = if overrides.password.is_some() { None } else { self.password_env };
        Ok(Self { config: overrides.apply(self.config)?, password_env })
    }
}

/// Individual connection fields given explicitly (e.g., CLI flags)
///
/// Applied on top of a resolved profile; set fields win.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConnectionOverrides {
    pub engine: Option<DatabaseType>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub database: Option<String>,
    pub file: Option<PathBuf>,
}

impl ConnectionOverrides {
    /// Apply the set fields to `base`
    ///
    /// Switching engine without an explicit port resets the port to the new
    /// engine's default, so `--engine postgres` alone does not dial 3306.
    /// Switching to `SQLite` drops the server fields. A `file` without an
    /// engine selects `SQLite`.
    ///
    /// Fields the resulting engine has no use for are a `ConfigError`.
    pub fn apply(self, base: ConnectionConfig) -> Result<ConnectionConfig> {
        let mut config = base;

        let engine = match (self.engine, &self.file) {
            (Some(engine), _) => engine,
            (None, Some(_)) => DatabaseType::SQLite,
            (None, None) => config.engine,
        };
        if engine != config.engine {
            config = switch_engine(config, engine);
        }
        self.check_applies_to(engine)?;

        if self.host.is_some() {
            config.host = self.host;
        }
        if self.port.is_some() {
            config.port = self.port;
        }
        if self.user.is_some() {
            config.user = self.user;
        }
        if self.password.is_some() {
            config.password = self.password;
        }
        if self.database.is_some() {
            config.database = self.database;
        }
        if self.file.is_some() {
            config.file = self.file;
        }

        Ok(config)
    }

    fn check_applies_to(&self, engine: DatabaseType) -> Result<()> {
        let misplaced = match engine {
            DatabaseType::SQLite => [
                ("host", self.host.is_some()),
                ("port", self.port.is_some()),
                ("user", self.user.is_some()),
                ("password", self.password.is_some()),
                ("database", self.database.is_some()),
            ]
            .into_iter()
            .find_map(|(field, set)| set.then_some(field)),
            DatabaseType::MySQL | DatabaseType::Postgres => self.file.as_ref().map(|_| "file"),
        };

        match misplaced {
            Some(field) => Err(EntryError::config_error(format!(
                "'{field}' does not apply to {engine} connections"
            ))),
            None => Ok(()),
        }
    }
}

/// Carry `config` over to another engine
///
/// Server fields are dropped when moving to `SQLite`. Moving to a server engine
/// resets the port, and starts from the built-in defaults when coming from `SQLite`.
fn switch_engine(config: ConnectionConfig, engine: DatabaseType) -> ConnectionConfig {
    let port = match engine {
        DatabaseType::MySQL => DEFAULT_MYSQL_PORT,
        DatabaseType::Postgres => DEFAULT_POSTGRES_PORT,
        DatabaseType::SQLite => {
            let mut sqlite = ConnectionConfig::sqlite(PathBuf::new());
            sqlite.file = config.file;
            return sqlite;
        }
    };

    let server =
        if config.engine == DatabaseType::SQLite { ConnectionConfig::default() } else { config };
    ConnectionConfig { engine, port: Some(port), file: None, ..server }
}

/// Configuration file location
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigLocation {
    /// Local config: `.employee-entry/config.json`
    Local,
    /// Global config: `~/.config/employee-entry/connections.json`
    Global,
}

impl ConfigLocation {
    /// Path of the config file for this location
    pub fn path(self) -> Result<PathBuf> {
        match self {
            Self::Local => local_config_path(),
            Self::Global => global_config_path(),
        }
    }
}

/// Get path to local config file (`.employee-entry/config.json`)
pub fn local_config_path() -> Result<PathBuf> {
    let current_dir = std::env::current_dir().map_err(|e| {
        EntryError::config_error(format!("Could not determine current directory: {e}"))
    })?;

    Ok(current_dir.join(LOCAL_DIR).join("config.json"))
}

/// Get path to global config file (`~/.config/employee-entry/connections.json`)
pub fn global_config_path() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| EntryError::config_error("Could not determine user config directory"))?;

    Ok(config_dir.join(APP_DIR).join("connections.json"))
}

/// Load connection registry from a config file
///
/// A missing file is an empty registry.
pub fn load_registry(path: &Path) -> Result<ConnectionRegistry> {
    if !path.exists() {
        return Ok(ConnectionRegistry::default());
    }

    let contents = fs::read_to_string(path)
        .map_err(|e| EntryError::config_error(format!("Could not read config file: {e}")))?;

    serde_json::from_str(&contents).map_err(|e| {
        EntryError::config_error(format!("Invalid config file format in {}: {e}", path.display()))
    })
}

/// Save connection registry to a config file, creating its directory if needed
pub fn save_registry(path: &Path, registry: &ConnectionRegistry) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            EntryError::config_error(format!("Could not create config directory: {e}"))
        })?;
    }

    let contents = serde_json::to_string_pretty(registry)
        .map_err(|e| EntryError::config_error(format!("Could not serialize config: {e}")))?;

    fs::write(path, contents)
        .map_err(|e| EntryError::config_error(format!("Could not write config file: {e}")))?;

    Ok(())
}

/// Load the merged registry: global first, local on top
pub fn load_with_precedence() -> Result<ConnectionRegistry> {
    let global = load_registry(&global_config_path()?)?;
    let local = load_registry(&local_config_path()?)?;
    Ok(global.merged_with(local))
}

/// Resolve a profile from an already loaded registry
///
/// - `Some(name)`: that profile, or an error listing the available names
/// - `None`: the registry default, or the built-in default config when the
///   registry has no default
pub fn resolve_from(registry: &ConnectionRegistry, name: Option<&str>) -> Result<ResolvedProfile> {
    let conn_name = match name.or(registry.default.as_deref()) {
        Some(n) => n,
        None => {
            return Ok(ResolvedProfile { config: ConnectionConfig::default(), password_env: None })
        }
    };

    let stored = registry.connections.get(conn_name).ok_or_else(|| {
        let mut available: Vec<_> = registry.connections.keys().collect();
        available.sort();
        EntryError::config_error(format!(
            "Connection '{conn_name}' not found. Available connections: {available:?}"
        ))
    })?;

    Ok(ResolvedProfile { config: stored.resolve()?, password_env: stored.password_env.clone() })
}

/// Resolve a profile from the merged local + global configuration
pub fn resolve_connection(name: Option<&str>) -> Result<ResolvedProfile> {
    resolve_from(&load_with_precedence()?, name)
}

/// Add or replace a profile in the registry at `path`
///
/// The first profile saved to a registry becomes its default.
pub fn save_connection_at(
    path: &Path,
    name: &str,
    config: ConnectionConfig,
    password_env: Option<String>,
) -> Result<()> {
    let mut registry = load_registry(path)?;

    let is_first_connection = registry.connections.is_empty();

    let mut config = config;
    if password_env.is_some() {
        // The password lives in the environment, not on disk
        config.password = None;
    }

    registry.connections.insert(name.to_string(), StoredConnection { config, password_env });

    if is_first_connection {
        registry.default = Some(name.to_string());
    }

    save_registry(path, &registry)
}

/// Add or replace a profile in the local or global config file
pub fn save_connection(
    name: &str,
    config: ConnectionConfig,
    password_env: Option<String>,
    location: ConfigLocation,
) -> Result<()> {
    save_connection_at(&location.path()?, name, config, password_env)
}

/// List all profiles in the merged view, sorted by name
///
/// Profiles that fail to resolve (e.g., missing env vars) are skipped with a warning.
pub fn list_connections() -> Result<Vec<(String, ConnectionConfig)>> {
    let registry = load_with_precedence()?;

    let mut connections = Vec::new();
    for (conn_name, stored) in registry.connections {
        match stored.resolve() {
            Ok(config) => connections.push((conn_name, config)),
            Err(_e) => {
                // Error details not logged to prevent credential leakage
                tracing::warn!(connection = %conn_name, "could not resolve connection profile");
            }
        }
    }

    connections.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(connections)
}
