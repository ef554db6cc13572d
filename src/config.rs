// MIT License - Copyright (c) 2026 Peter Wright
// Client configuration and the on-disk settings store

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::debug;

use crate::error::{LircError, Result};

/// Default lircd socket path on Linux.
pub const DEFAULT_SOCKET_PATH: &str = "/var/run/lirc/lircd";

/// Default time to wait on a single socket read.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Default wait between repeated key presses.
pub const DEFAULT_INTERPRESS_DELAY: Duration = Duration::from_millis(300);

/// Environment variable that overrides the settings file location.
pub const CONFIG_PATH_ENV: &str = "STB_CONFIG_FILE_PATH";

/// Configuration for connecting to lircd and pressing keys.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Path to the lircd Unix socket
    pub socket_path: PathBuf,
    /// Timeout applied to each read while waiting for a reply packet
    pub read_timeout: Duration,
    /// Remote used when the caller does not name one
    pub remote_name: String,
    /// Delay between presses when a key is pressed repeatedly
    pub interpress_delay: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            socket_path: PathBuf::from(DEFAULT_SOCKET_PATH),
            read_timeout: DEFAULT_READ_TIMEOUT,
            remote_name: String::new(),
            interpress_delay: DEFAULT_INTERPRESS_DELAY,
        }
    }
}

impl ClientConfig {
    /// Create a new config builder starting from defaults.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Build a config from the `lirc` and `remote` sections of a settings
    /// store, falling back to defaults for missing keys.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let mut builder = Self::builder();
        if let Some(path) = settings.get("lirc.socket_path") {
            builder = builder.socket_path(path);
        }
        if let Some(ms) = settings.get("lirc.read_timeout_ms") {
            builder = builder
                .read_timeout(Duration::from_millis(parse_ms("lirc.read_timeout_ms", &ms)?));
        }
        if let Some(name) = settings.get("remote.name") {
            builder = builder.remote_name(name);
        }
        if let Some(ms) = settings.get("remote.interpress_delay_ms") {
            builder = builder.interpress_delay(Duration::from_millis(parse_ms(
                "remote.interpress_delay_ms",
                &ms,
            )?));
        }
        Ok(builder.build())
    }
}

fn parse_ms(key: &str, value: &str) -> Result<u64> {
    value.parse().map_err(|_| LircError::Config {
        details: format!("{} must be a whole number of milliseconds, got {:?}", key, value),
    })
}

/// Builder for ClientConfig.
#[derive(Debug, Clone, Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    pub fn socket_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.socket_path = path.into();
        self
    }

    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.config.read_timeout = timeout;
        self
    }

    pub fn remote_name(mut self, name: impl Into<String>) -> Self {
        self.config.remote_name = name.into();
        self
    }

    pub fn interpress_delay(mut self, delay: Duration) -> Self {
        self.config.interpress_delay = delay;
        self
    }

    pub fn build(self) -> ClientConfig {
        self.config
    }
}

/// Key/value settings persisted as a TOML file of `[section]` tables.
///
/// Keys are addressed as `"section.key"`; a bare `"section"` addresses the
/// whole table for `get` and `delete`. Values are stored as strings.
#[derive(Debug, Clone)]
pub struct Settings {
    path: PathBuf,
    table: toml::Table,
}

/// Built-in settings written by `reset` and used when no file exists.
pub fn default_settings() -> toml::Table {
    let mut lirc = toml::Table::new();
    lirc.insert("socket_path".into(), DEFAULT_SOCKET_PATH.into());
    lirc.insert(
        "read_timeout_ms".into(),
        DEFAULT_READ_TIMEOUT.as_millis().to_string().into(),
    );

    let mut remote = toml::Table::new();
    remote.insert("name".into(), "".into());
    remote.insert(
        "interpress_delay_ms".into(),
        DEFAULT_INTERPRESS_DELAY.as_millis().to_string().into(),
    );

    let mut table = toml::Table::new();
    table.insert("lirc".into(), toml::Value::Table(lirc));
    table.insert("remote".into(), toml::Value::Table(remote));
    table
}

/// Resolve the settings file location: `$STB_CONFIG_FILE_PATH` if set,
/// otherwise `~/.hc/config.toml`.
pub fn settings_path() -> Result<PathBuf> {
    if let Some(path) = std::env::var_os(CONFIG_PATH_ENV) {
        return Ok(PathBuf::from(path));
    }
    std::env::var_os("HOME")
        .map(|home| PathBuf::from(home).join(".hc").join("config.toml"))
        .ok_or_else(|| LircError::Config {
            details: format!("neither {} nor HOME is set", CONFIG_PATH_ENV),
        })
}

fn split_key(key: &str) -> Result<(&str, &str)> {
    match key.split_once('.') {
        Some((section, name)) if !section.is_empty() && !name.is_empty() => Ok((section, name)),
        _ => Err(LircError::Config {
            details: format!("key {:?} must have the form section.key", key),
        }),
    }
}

impl Settings {
    /// Load settings from `path`. A missing file yields the built-in defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let table = match std::fs::read_to_string(&path) {
            Ok(text) => text.parse::<toml::Table>().map_err(|e| LircError::Config {
                details: format!("failed to parse {}: {}", path.display(), e),
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No settings file at {}, using defaults", path.display());
                default_settings()
            }
            Err(e) => return Err(LircError::Io(e)),
        };
        Ok(Self { path, table })
    }

    /// Load from the resolved default location.
    pub fn load_default() -> Result<Self> {
        Self::load(settings_path()?)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Look up `"section.key"`, or a whole `"section"` when there is no dot.
    /// Non-string values and sections are rendered as TOML.
    pub fn get(&self, key: &str) -> Option<String> {
        if !key.contains('.') {
            return match self.table.get(key)? {
                toml::Value::Table(section) => toml::to_string(section).ok(),
                other => Some(other.to_string()),
            };
        }
        let (section, name) = split_key(key).ok()?;
        match self.table.get(section)?.as_table()?.get(name)? {
            toml::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) -> Result<()> {
        let (section, name) = split_key(key)?;
        let entry = self
            .table
            .entry(section.to_string())
            .or_insert(toml::Value::Table(toml::Table::new()));
        let table = entry.as_table_mut().ok_or_else(|| LircError::Config {
            details: format!("{} is not a section", section),
        })?;
        table.insert(name.to_string(), toml::Value::String(value.into()));
        Ok(())
    }

    /// Remove `"section.key"`, or the whole section when `key` has no dot.
    /// Returns whether anything was removed.
    pub fn delete(&mut self, key: &str) -> Result<bool> {
        if !key.is_empty() && !key.contains('.') {
            return Ok(self.table.remove(key).is_some());
        }
        let (section, name) = split_key(key)?;
        Ok(self
            .table
            .get_mut(section)
            .and_then(|s| s.as_table_mut())
            .and_then(|t| t.remove(name))
            .is_some())
    }

    /// Render all settings as the TOML text `save` would write.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(&self.table).map_err(|e| LircError::Config {
            details: format!("failed to serialize settings: {}", e),
        })
    }

    /// Restore the built-in defaults.
    pub fn reset(&mut self) {
        self.table = default_settings();
    }

    /// Write the settings back to their file, creating parent directories.
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.path, self.to_toml_string()?)?;
        debug!("Saved settings to {}", self.path.display());
        Ok(())
    }
}
