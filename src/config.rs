use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cache::CacheTtl;

pub const DEFAULT_SERVER_URL: &str = "http://localhost:8000";
pub const SERVER_URL_ENV: &str = "PUNCH_SERVER_URL";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub server: ServerConfig,
  #[serde(default)]
  pub cache: CacheTtl,
  #[serde(default)]
  pub ui: UiConfig,
  /// Persist credentials across runs unless a sign-in says otherwise
  #[serde(default = "default_true")]
  pub remember_me: bool,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      server: ServerConfig::default(),
      cache: CacheTtl::default(),
      ui: UiConfig::default(),
      remember_me: true,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  #[serde(default = "default_url")]
  pub url: String,
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      url: default_url(),
      timeout_secs: default_timeout_secs(),
    }
  }
}

impl ServerConfig {
  pub fn timeout(&self) -> Duration {
    Duration::from_secs(self.timeout_secs)
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UiConfig {
  /// Terminal poll interval; also how often background results are picked up
  #[serde(default = "default_tick_rate_ms")]
  pub tick_rate_ms: u64,
}

impl Default for UiConfig {
  fn default() -> Self {
    Self {
      tick_rate_ms: default_tick_rate_ms(),
    }
  }
}

impl UiConfig {
  pub fn tick_rate(&self) -> Duration {
    Duration::from_millis(self.tick_rate_ms)
  }
}

fn default_true() -> bool {
  true
}

fn default_url() -> String {
  DEFAULT_SERVER_URL.to_string()
}

fn default_timeout_secs() -> u64 {
  10
}

fn default_tick_rate_ms() -> u64 {
  250
}

impl Config {
  /// Load configuration, falling back to defaults when no file exists.
  ///
  /// Search order:
  /// 1. Explicit path if provided (must exist)
  /// 2. ./punch.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/punch/config.yaml
  ///
  /// `PUNCH_SERVER_URL` then overrides `server.url`.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    let mut config = match path {
      Some(p) => Self::load_from_path(&p)?,
      None => {
        tracing::debug!("no config file found, using defaults");
        Self::default()
      }
    };

    if let Ok(url) = std::env::var(SERVER_URL_ENV) {
      if !url.trim().is_empty() {
        config.server.url = url;
      }
    }

    Ok(config)
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("punch.yaml");
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("punch").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents).map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> std::result::Result<Self, serde_yaml::Error> {
    // An empty file is a valid, all-defaults config
    if contents.trim().is_empty() {
      return Ok(Self::default());
    }
    serde_yaml::from_str(contents)
  }

  /// Directory for credentials and log files.
  pub fn data_dir() -> Result<PathBuf> {
    dirs::data_dir()
      .map(|d| d.join("punch"))
      .ok_or_else(|| eyre!("Could not determine a data directory for this platform"))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::io::Write;

  #[test]
  fn test_defaults() {
    let config = Config::parse("").unwrap();
    assert_eq!(config.server.url, DEFAULT_SERVER_URL);
    assert_eq!(config.server.timeout(), Duration::from_secs(10));
    assert_eq!(config.ui.tick_rate(), Duration::from_millis(250));
    assert_eq!(config.cache.session_status(), Duration::from_secs(30));
    assert!(config.remember_me);
  }

  #[test]
  fn test_partial_file() {
    let yaml = r#"
server:
  url: https://time.example.com
cache:
  categories_secs: 60
remember_me: false
"#;
    let config = Config::parse(yaml).unwrap();
    assert_eq!(config.server.url, "https://time.example.com");
    assert_eq!(config.server.timeout_secs, 10);
    assert_eq!(config.cache.categories(), Duration::from_secs(60));
    assert_eq!(config.cache.statistics(), Duration::from_secs(900));
    assert!(!config.remember_me);
  }

  #[test]
  fn test_explicit_path() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "ui:\n  tick_rate_ms: 100").unwrap();

    let config = Config::load(Some(file.path())).unwrap();
    assert_eq!(config.ui.tick_rate_ms, 100);
  }

  #[test]
  fn test_missing_explicit_path_is_an_error() {
    let err = Config::load(Some(Path::new("/nonexistent/punch.yaml"))).unwrap_err();
    assert!(err.to_string().contains("Config file not found"));
  }
}
