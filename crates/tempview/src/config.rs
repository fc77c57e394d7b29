//! Application configuration
//!
//! Values are resolved in priority order: CLI flag, environment variable,
//! `~/.tempview/config.toml` (or the file given with `--config`), default.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tempview_db::ReadHint;

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:5080";

pub const ENV_BIND: &str = "TEMPVIEW_BIND";
pub const ENV_CONNECTION: &str = "TEMPVIEW_CONNECTION";
pub const ENV_FIXTURE: &str = "TEMPVIEW_FIXTURE";
pub const ENV_READ_HINT: &str = "TEMPVIEW_READ_HINT";

/// Contents of `config.toml`. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub bind_addr: Option<String>,
    pub connection_string: Option<String>,
    pub fixture: Option<PathBuf>,
    pub read_hint: Option<String>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }
}

/// Values given on the command line.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub bind_addr: Option<String>,
    pub connection_string: Option<String>,
    pub fixture: Option<PathBuf>,
}

/// Where catalog and history data come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendSource {
    Fixture(PathBuf),
    SqlServer(String),
}

/// Fully resolved configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: String,
    pub connection_string: Option<String>,
    pub fixture: Option<PathBuf>,
    pub read_hint: ReadHint,
    pub config_path: PathBuf,
}

/// Default config file: ~/.tempview/config.toml
pub fn default_config_path() -> PathBuf {
    tempview_logging::tempview_home().join("config.toml")
}

impl AppConfig {
    /// Resolve from the process environment and the config file.
    ///
    /// An explicitly named config file must exist; the default one may not.
    pub fn load(config_path: Option<&Path>, overrides: ConfigOverrides) -> Result<Self> {
        let (path, file) = match config_path {
            Some(path) => (path.to_path_buf(), FileConfig::load(path)?),
            None => {
                let path = default_config_path();
                let file = if path.exists() {
                    FileConfig::load(&path)?
                } else {
                    FileConfig::default()
                };
                (path, file)
            }
        };
        Self::resolve(path, file, overrides, |key| std::env::var(key).ok())
    }

    /// Merge the three sources. `env` looks up one environment variable.
    pub fn resolve<F>(
        config_path: PathBuf,
        file: FileConfig,
        overrides: ConfigOverrides,
        env: F,
    ) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        let bind_addr = overrides
            .bind_addr
            .or_else(|| env(ENV_BIND))
            .or(file.bind_addr)
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let connection_string = overrides
            .connection_string
            .or_else(|| env(ENV_CONNECTION))
            .or(file.connection_string);
        let fixture = overrides
            .fixture
            .or_else(|| env(ENV_FIXTURE).map(PathBuf::from))
            .or(file.fixture);

        let read_hint = match env(ENV_READ_HINT).or(file.read_hint) {
            Some(raw) => ReadHint::parse(&raw).with_context(|| {
                format!("Invalid read hint '{}': expected 'nolock' or 'none'", raw)
            })?,
            None => ReadHint::default(),
        };

        Ok(Self {
            bind_addr,
            connection_string,
            fixture,
            read_hint,
            config_path,
        })
    }

    /// Exactly one of fixture and connection string must be set.
    pub fn backend(&self) -> Result<BackendSource> {
        match (&self.fixture, &self.connection_string) {
            (Some(fixture), None) => Ok(BackendSource::Fixture(fixture.clone())),
            (None, Some(conn)) => Ok(BackendSource::SqlServer(conn.clone())),
            (Some(_), Some(_)) => bail!(
                "Both a fixture and a connection string are configured; choose one \
                 (--fixture / {} or --connection / {})",
                ENV_FIXTURE,
                ENV_CONNECTION
            ),
            (None, None) => bail!(
                "No data source configured. TRY: --fixture fixtures/demo.json, \
                 or --connection \"Server=tcp:host,1433;...\" (env {} / {})",
                ENV_FIXTURE,
                ENV_CONNECTION
            ),
        }
    }
}

/// Mask the password in an ADO connection string.
pub fn redact_connection_string(conn: &str) -> String {
    conn.split(';')
        .map(|part| match part.split_once('=') {
            Some((key, _))
                if matches!(
                    key.trim().to_ascii_lowercase().as_str(),
                    "password" | "pwd"
                ) =>
            {
                format!("{}=****", key)
            }
            _ => part.to_string(),
        })
        .collect::<Vec<_>>()
        .join(";")
}
