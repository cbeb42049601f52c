use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::http::AuthScheme;

pub const APP_NAME: &str = "campus-admin";
pub const DEFAULT_API_URL: &str = "http://localhost:8000/api";
pub const API_URL_ENV: &str = "CAMPUS_ADMIN_API_URL";
pub const PASSWORD_ENV: &str = "CAMPUS_ADMIN_PASSWORD";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub api: ApiConfig,
  #[serde(default)]
  pub cache: CacheConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  #[serde(default = "default_url")]
  pub url: String,
  /// token (default) or csrf
  #[serde(default)]
  pub auth_scheme: AuthScheme,
  /// Per-request timeout
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      url: default_url(),
      auth_scheme: AuthScheme::default(),
      timeout_secs: default_timeout_secs(),
    }
  }
}

fn default_url() -> String {
  DEFAULT_API_URL.to_string()
}

fn default_timeout_secs() -> u64 {
  1000
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
  /// How long a cached response counts as fresh
  #[serde(default = "default_stale_secs")]
  pub stale_secs: u64,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      stale_secs: default_stale_secs(),
    }
  }
}

fn default_stale_secs() -> u64 {
  60
}

impl Config {
  /// Load configuration from file, then apply environment overrides.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./campus-admin.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/campus-admin/config.yaml
  ///
  /// Without a file the defaults are used.
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
      None => Self::default(),
    };
    if let Ok(url) = std::env::var(API_URL_ENV) {
      config.api.url = url;
    }
    Ok(config)
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from(format!("{}.yaml", APP_NAME));
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join(APP_NAME).join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    let config: Config = serde_yaml::from_str(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))?;

    Ok(config)
  }

  pub fn timeout(&self) -> Duration {
    Duration::from_secs(self.api.timeout_secs)
  }

  pub fn stale_time(&self) -> Duration {
    Duration::from_secs(self.cache.stale_secs)
  }

  /// Get the login password from the environment.
  pub fn get_password() -> Result<String> {
    std::env::var(PASSWORD_ENV)
      .map_err(|_| eyre!("Password not found. Set the {} environment variable.", PASSWORD_ENV))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::io::Write;

  #[test]
  fn test_partial_file_keeps_defaults() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "api:\n  auth_scheme: csrf\ncache:\n  stale_secs: 5").unwrap();

    let config = Config::load_from_path(file.path()).unwrap();
    assert_eq!(config.api.auth_scheme, AuthScheme::Csrf);
    assert_eq!(config.api.url, DEFAULT_API_URL);
    assert_eq!(config.api.timeout_secs, 1000);
    assert_eq!(config.stale_time(), Duration::from_secs(5));
  }

  #[test]
  fn test_missing_explicit_path_is_an_error() {
    let err = Config::load(Some(Path::new("/nonexistent/campus-admin.yaml"))).unwrap_err();
    assert!(err.to_string().contains("Config file not found"));
  }

  #[test]
  fn test_invalid_yaml_reports_path() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "api: [unclosed").unwrap();

    let err = Config::load_from_path(file.path()).unwrap_err();
    assert!(err.to_string().contains("Failed to parse config file"));
  }
}
