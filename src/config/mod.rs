// ABOUTME: Harness configuration loaded from base_config.yml.
// ABOUTME: Selects one environment and exposes section/key lookups and typed section views.

mod env_value;
mod init;
mod ssh;
mod webdriver;

pub use env_value::SecretValue;
pub use init::init_config;
pub use ssh::{AuthMethodKind, KeyType, SshSettings};
pub use webdriver::WebDriverSettings;

use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde_yaml::{Mapping, Value};
use std::path::{Path, PathBuf};

pub const CONFIG_DIR: &str = "config";
pub const CONFIG_FILENAME: &str = "base_config.yml";
pub const DEFAULT_ENVIRONMENT: &str = "default";

pub const SSH_SECTION: &str = "ssh";
pub const WEBDRIVER_SECTION: &str = "webdriver";

/// Configuration for one environment: section name → option name → value.
#[derive(Debug, Clone)]
pub struct Config {
    environment: String,
    path: Option<PathBuf>,
    sections: Mapping,
}

impl Config {
    /// `<dir>/config/base_config.yml`.
    pub fn default_path(dir: &Path) -> PathBuf {
        dir.join(CONFIG_DIR).join(CONFIG_FILENAME)
    }

    /// Load the file and select `environment`. Every failure is reported as
    /// [`Error::ConfigLoad`] naming the path.
    pub fn load(path: &Path, environment: &str) -> Result<Self> {
        let load_failed = |reason: String| Error::ConfigLoad {
            path: path.to_path_buf(),
            reason,
        };

        tracing::info!("Loading harness config at {}", path.display());
        let content = std::fs::read_to_string(path).map_err(|e| load_failed(e.to_string()))?;
        let mut config =
            Self::from_yaml(&content, environment).map_err(|e| load_failed(e.to_string()))?;
        config.path = Some(path.to_path_buf());
        Ok(config)
    }

    pub fn from_yaml(yaml: &str, environment: &str) -> Result<Self> {
        let document: Value = serde_yaml::from_str(yaml)?;
        let Value::Mapping(mut environments) = document else {
            return Err(Error::InvalidConfig(
                "top level must map environment names to sections".to_string(),
            ));
        };

        let sections = match environments.remove(environment) {
            Some(Value::Mapping(sections)) => sections,
            Some(Value::Null) => Mapping::new(),
            Some(_) => {
                return Err(Error::InvalidConfig(format!(
                    "environment {} must be a mapping of sections",
                    environment
                )));
            }
            None => {
                return Err(Error::InvalidConfig(format!(
                    "environment {} not found",
                    environment
                )));
            }
        };

        Ok(Self {
            environment: environment.to_string(),
            path: None,
            sections,
        })
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    /// File the configuration was loaded from, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn section_names(&self) -> Vec<&str> {
        self.sections.keys().filter_map(Value::as_str).collect()
    }

    pub fn has_section(&self, section: &str) -> bool {
        self.sections.contains_key(section)
    }

    /// Raw value of `section.key`.
    pub fn get(&self, section: &str, key: &str) -> Result<&Value> {
        let options = self
            .sections
            .get(section)
            .ok_or_else(|| Error::MissingSection(section.to_string()))?;
        options.get(key).ok_or_else(|| Error::MissingKey {
            section: section.to_string(),
            key: key.to_string(),
        })
    }

    /// Typed value of `section.key`.
    pub fn get_as<T: DeserializeOwned>(&self, section: &str, key: &str) -> Result<T> {
        let value = self.get(section, key)?;
        serde_yaml::from_value(value.clone()).map_err(|e| Error::InvalidValue {
            section: section.to_string(),
            key: key.to_string(),
            reason: e.to_string(),
        })
    }

    /// Typed view of a whole section; an absent section yields the default.
    pub fn section_or_default<T: DeserializeOwned + Default>(&self, section: &str) -> Result<T> {
        match self.sections.get(section) {
            None | Some(Value::Null) => Ok(T::default()),
            Some(value) => serde_yaml::from_value(value.clone()).map_err(|e| {
                Error::InvalidConfig(format!("section {}: {}", section, e))
            }),
        }
    }

    pub fn ssh(&self) -> Result<SshSettings> {
        self.section_or_default(SSH_SECTION)
    }

    pub fn webdriver(&self) -> Result<WebDriverSettings> {
        self.section_or_default(WEBDRIVER_SECTION)
    }
}

/// Expand a leading `~` to `$HOME`. Paths are returned unchanged when HOME
/// is unset.
pub fn expand_home(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match std::env::var_os("HOME") {
        Some(home) => PathBuf::from(home).join(rest),
        None => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expand_home_only_touches_tilde_prefix() {
        temp_env::with_var("HOME", Some("/home/tester"), || {
            assert_eq!(
                expand_home(Path::new("~/.ssh/id_rsa")),
                PathBuf::from("/home/tester/.ssh/id_rsa")
            );
            assert_eq!(expand_home(Path::new("~")), PathBuf::from("/home/tester"));
            assert_eq!(expand_home(Path::new("/etc/~x")), PathBuf::from("/etc/~x"));
        });
    }

    #[test]
    fn null_environment_has_no_sections() {
        let config = Config::from_yaml("default:\n", "default").unwrap();
        assert!(config.section_names().is_empty());
        assert!(config.ssh().is_ok());
    }
}
