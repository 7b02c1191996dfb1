//! Layered configuration for the `folio` binary.
//!
//! Values come from an optional TOML file, then `FOLIO_`-prefixed
//! environment variables (e.g. `FOLIO_APP_DOMAIN`), then the defaults below.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use folio_core::fact_check::DomainServiceLocator;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
  /// SQLite file holding artefacts, editions and downtime.
  #[serde(default = "default_store_path")]
  pub store_path:     PathBuf,
  /// Deployment domain that application hosts live under.
  #[serde(default = "default_app_domain")]
  pub app_domain:     String,
  #[serde(default = "default_service_scheme")]
  pub service_scheme: String,
}

fn default_store_path() -> PathBuf { PathBuf::from("folio.db") }

fn default_app_domain() -> String { "dev.gov.uk".into() }

fn default_service_scheme() -> String { "https".into() }

impl Settings {
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let mut settings: Settings = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("FOLIO"))
      .build()
      .context("failed to read config file")?
      .try_deserialize()
      .context("failed to deserialise Settings")?;
    settings.store_path = expand_tilde(&settings.store_path);
    Ok(settings)
  }

  pub fn service_locator(&self) -> DomainServiceLocator {
    DomainServiceLocator {
      scheme:     self.service_scheme.clone(),
      app_domain: self.app_domain.clone(),
    }
  }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use super::*;

  fn from_toml(toml: &str) -> Settings {
    config::Config::builder()
      .add_source(config::File::from_str(toml, config::FileFormat::Toml))
      .build()
      .unwrap()
      .try_deserialize()
      .unwrap()
  }

  #[test]
  fn empty_file_uses_defaults() {
    let settings = from_toml("");
    assert_eq!(settings.store_path, PathBuf::from("folio.db"));
    assert_eq!(settings.app_domain, "dev.gov.uk");
    assert_eq!(settings.service_scheme, "https");
  }

  #[test]
  fn locator_uses_configured_domain() {
    let settings = from_toml("app_domain = \"preview.alphagov.co.uk\"");
    let url = folio_core::fact_check::ServiceLocator::find(&settings.service_locator(), "publisher")
      .unwrap();
    assert_eq!(url.as_str(), "https://publisher.preview.alphagov.co.uk/");
  }

  #[test]
  fn relative_paths_are_left_alone() {
    assert_eq!(expand_tilde(Path::new("data/folio.db")), PathBuf::from("data/folio.db"));
  }
}
