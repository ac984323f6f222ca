use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::gateway::AuthScheme;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub api: ApiConfig,
  pub identity: IdentityConfig,
  /// Custom title for header (defaults to the API host if not set)
  pub title: Option<String>,
  #[serde(default)]
  pub storage: StorageConfig,
  #[serde(default)]
  pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  /// GraphQL endpoint URL
  pub endpoint: String,
  /// How the access token is sent: raw or bearer
  #[serde(default)]
  pub auth_scheme: AuthScheme,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IdentityConfig {
  /// Hosted identity provider domain, without scheme
  pub domain: String,
  pub client_id: String,
  pub redirect_uri: String,
  /// Where the provider sends the browser after logout
  #[serde(default)]
  pub logout_uri: Option<String>,
  #[serde(default = "default_scopes")]
  pub scopes: Vec<String>,
}

fn default_scopes() -> Vec<String> {
  vec!["openid".into(), "email".into(), "phone".into()]
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageConfig {
  /// Local database path (defaults to $XDG_DATA_HOME/shopterm/local.db)
  pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
  #[serde(default = "default_log_level")]
  pub level: String,
  /// Log directory (defaults to $XDG_STATE_HOME/shopterm)
  pub directory: Option<PathBuf>,
}

impl Default for LogConfig {
  fn default() -> Self {
    Self {
      level: default_log_level(),
      directory: None,
    }
  }
}

fn default_log_level() -> String {
  "info".to_string()
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./shopterm.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/shopterm/config.yaml
  ///
  /// Environment overrides are applied on top, then the result is validated.
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
        return Err(eyre!(
          "No configuration file found. Create one at ~/.config/shopterm/config.yaml\n\
                 See config.example.yaml for the format."
        ))
      }
    };

    config.apply_env(|name| std::env::var(name).ok());
    config.validate()?;
    Ok(config)
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("shopterm.yaml");
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("shopterm").join("config.yaml");
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

  fn parse(contents: &str) -> Result<Self> {
    serde_yaml::from_str(contents).map_err(|e| eyre!("{}", e))
  }

  /// Apply SHOPTERM_GRAPHQL_ENDPOINT and SHOPTERM_CLIENT_ID overrides.
  fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
    if let Some(endpoint) = var("SHOPTERM_GRAPHQL_ENDPOINT").filter(|v| !v.is_empty()) {
      self.api.endpoint = endpoint;
    }
    if let Some(client_id) = var("SHOPTERM_CLIENT_ID").filter(|v| !v.is_empty()) {
      self.identity.client_id = client_id;
    }
  }

  /// Reject configurations the client cannot work with.
  pub fn validate(&self) -> Result<()> {
    let required = [
      ("api.endpoint", &self.api.endpoint),
      ("identity.domain", &self.identity.domain),
      ("identity.client_id", &self.identity.client_id),
      ("identity.redirect_uri", &self.identity.redirect_uri),
    ];

    for (name, value) in required {
      if value.trim().is_empty() {
        return Err(eyre!("Configuration value {} must not be empty", name));
      }
    }

    url::Url::parse(&self.api.endpoint)
      .map_err(|e| eyre!("api.endpoint is not a valid URL: {}", e))?;

    Ok(())
  }

  /// Header title: the configured one, else the API host.
  pub fn display_title(&self) -> String {
    if let Some(title) = &self.title {
      return title.clone();
    }
    url::Url::parse(&self.api.endpoint)
      .ok()
      .and_then(|u| u.host_str().map(String::from))
      .unwrap_or_else(|| "shopterm".to_string())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashMap;
  use std::io::Write;

  const MINIMAL: &str = r#"
api:
  endpoint: https://api.example.com/graphql
identity:
  domain: auth.example.com
  client_id: abc123
  redirect_uri: http://localhost:3000/callback
"#;

  #[test]
  fn test_parse_minimal_uses_defaults() {
    let config = Config::parse(MINIMAL).unwrap();
    assert_eq!(config.api.auth_scheme, AuthScheme::Raw);
    assert_eq!(config.identity.scopes, vec!["openid", "email", "phone"]);
    assert_eq!(config.log.level, "info");
    assert!(config.storage.path.is_none());
    assert_eq!(config.display_title(), "api.example.com");
    assert!(config.validate().is_ok());
  }

  #[test]
  fn test_parse_full() {
    let config = Config::parse(
      r#"
api:
  endpoint: https://api.example.com/graphql
  auth_scheme: bearer
identity:
  domain: auth.example.com
  client_id: abc123
  redirect_uri: http://localhost:3000/callback
  logout_uri: http://localhost:3000
  scopes: [openid]
title: Corner Shop
storage:
  path: /tmp/shop.db
log:
  level: debug
  directory: /tmp/logs
"#,
    )
    .unwrap();

    assert_eq!(config.api.auth_scheme, AuthScheme::Bearer);
    assert_eq!(config.display_title(), "Corner Shop");
    assert_eq!(config.log.level, "debug");
    assert_eq!(config.storage.path, Some(PathBuf::from("/tmp/shop.db")));
  }

  #[test]
  fn test_env_overrides() {
    let mut config = Config::parse(MINIMAL).unwrap();
    let env: HashMap<&str, &str> = [
      ("SHOPTERM_GRAPHQL_ENDPOINT", "https://staging.example.com/graphql"),
      ("SHOPTERM_CLIENT_ID", ""),
    ]
    .into_iter()
    .collect();

    config.apply_env(|name| env.get(name).map(|v| v.to_string()));
    assert_eq!(config.api.endpoint, "https://staging.example.com/graphql");
    // Empty overrides are ignored.
    assert_eq!(config.identity.client_id, "abc123");
  }

  #[test]
  fn test_validate_rejects_empty_values() {
    let mut config = Config::parse(MINIMAL).unwrap();
    config.identity.client_id = "  ".into();
    let err = config.validate().unwrap_err().to_string();
    assert!(err.contains("identity.client_id"));
  }

  #[test]
  fn test_load_explicit_path() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(MINIMAL.as_bytes()).unwrap();

    let config = Config::load(Some(file.path())).unwrap();
    assert_eq!(config.identity.domain, "auth.example.com");
  }

  #[test]
  fn test_load_missing_explicit_path() {
    let err = Config::load(Some(Path::new("/nonexistent/shopterm.yaml"))).unwrap_err();
    assert!(err.to_string().contains("Config file not found"));
  }
}
