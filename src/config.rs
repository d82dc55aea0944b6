use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::constants::constants;

/// User preferences persisted between sessions, plus the backend addresses.
/// Addresses are injected configuration, not hard-coded constants: prefs.toml
/// overrides the compiled defaults, CLI flags override prefs.toml.
#[derive(Serialize, Deserialize, Default, Debug, Clone)]
pub struct Config {
  pub theme_name: Option<String>,
  pub strict_mode: Option<bool>,
  pub primary_backend: Option<String>,
  pub secondary_backend: Option<String>,
  /// Address media bytes are served from. Defaults to the primary backend.
  pub media_backend: Option<String>,
}

impl Config {
  pub fn load() -> Self {
    if let Some(proj_dirs) = ProjectDirs::from("", "", "mq") {
      let config_file = proj_dirs.config_dir().join("prefs.toml");
      if let Ok(content) = std::fs::read_to_string(config_file)
        && let Ok(config) = toml::from_str(&content)
      {
        return config;
      }
    }
    Self::default()
  }

  pub fn save(&self) {
    if let Some(proj_dirs) = ProjectDirs::from("", "", "mq") {
      let config_dir = proj_dirs.config_dir();
      if std::fs::create_dir_all(config_dir).is_ok() {
        let config_file = config_dir.join("prefs.toml");
        if let Ok(content) = toml::to_string(self) {
          let _ = std::fs::write(config_file, content);
        }
      }
    }
  }

  pub fn primary_backend(&self) -> &str {
    self.primary_backend.as_deref().unwrap_or(&constants().default_primary_backend)
  }

  pub fn secondary_backend(&self) -> &str {
    self.secondary_backend.as_deref().unwrap_or(&constants().default_secondary_backend)
  }

  pub fn media_backend(&self) -> &str {
    self.media_backend.as_deref().unwrap_or_else(|| self.primary_backend())
  }
}

/// The two selectable backend search identities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
  Primary,
  Secondary,
}

impl Backend {
  pub fn label(self) -> &'static str {
    match self {
      Backend::Primary => "primary",
      Backend::Secondary => "secondary",
    }
  }

  pub fn toggled(self) -> Self {
    match self {
      Backend::Primary => Backend::Secondary,
      Backend::Secondary => Backend::Primary,
    }
  }

  pub fn base_url<'a>(self, config: &'a Config) -> &'a str {
    match self {
      Backend::Primary => config.primary_backend(),
      Backend::Secondary => config.secondary_backend(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn backend_toggles() {
    assert_eq!(Backend::Primary.toggled(), Backend::Secondary);
    assert_eq!(Backend::Secondary.toggled(), Backend::Primary);
  }

  #[test]
  fn addresses_fall_back_to_defaults() {
    let config = Config::default();
    assert_eq!(Backend::Primary.base_url(&config), constants().default_primary_backend);
    assert_eq!(Backend::Secondary.base_url(&config), constants().default_secondary_backend);
    assert_eq!(config.media_backend(), config.primary_backend());
  }

  #[test]
  fn configured_addresses_win() {
    let config = Config {
      primary_backend: Some("http://a.local:8000".to_string()),
      secondary_backend: Some("http://b.local:3000".to_string()),
      media_backend: Some("http://m.local:9000".to_string()),
      ..Default::default()
    };
    assert_eq!(Backend::Primary.base_url(&config), "http://a.local:8000");
    assert_eq!(Backend::Secondary.base_url(&config), "http://b.local:3000");
    assert_eq!(config.media_backend(), "http://m.local:9000");
  }
}
