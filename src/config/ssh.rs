// ABOUTME: Settings for the `ssh` configuration section.
// ABOUTME: Controls authentication order, key files and host key checking.

use super::env_value::SecretValue;
use super::expand_home;
use nonempty::NonEmpty;
use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Private key algorithm expected in the configured key file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyType {
    #[default]
    #[serde(alias = "RSA", alias = "ssh-rsa")]
    Rsa,
    #[serde(alias = "DSA", alias = "dss", alias = "ssh-dss")]
    Dsa,
    #[serde(alias = "ECDSA")]
    Ecdsa,
    #[serde(alias = "ssh-ed25519")]
    Ed25519,
}

impl KeyType {
    /// File name of the conventional key under `~/.ssh`.
    pub fn default_file_name(&self) -> &'static str {
        match self {
            KeyType::Rsa => "id_rsa",
            KeyType::Dsa => "id_dsa",
            KeyType::Ecdsa => "id_ecdsa",
            KeyType::Ed25519 => "id_ed25519",
        }
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            KeyType::Rsa => "rsa",
            KeyType::Dsa => "dsa",
            KeyType::Ecdsa => "ecdsa",
            KeyType::Ed25519 => "ed25519",
        };
        f.write_str(name)
    }
}

/// An authentication method that can appear in `auth_methods`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMethodKind {
    Agent,
    Key,
    Password,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SshSettings {
    pub use_ssh_agent: bool,
    pub key_type: KeyType,
    /// Defaults to `~/.ssh/id_<type>`.
    pub key_path: Option<PathBuf>,
    /// Passphrase for an encrypted key. Falls back to the session password.
    pub key_password: Option<SecretValue>,
    pub check_host_keys: bool,
    /// Defaults to `~/.ssh/known_hosts`.
    pub known_hosts_path: Option<PathBuf>,
    /// Explicit authentication order. Overrides `use_ssh_agent`.
    #[serde(deserialize_with = "deserialize_auth_methods")]
    pub auth_methods: Option<NonEmpty<AuthMethodKind>>,
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,
    pub default_user: String,
}

impl Default for SshSettings {
    fn default() -> Self {
        Self {
            use_ssh_agent: false,
            key_type: KeyType::default(),
            key_path: None,
            key_password: None,
            check_host_keys: false,
            known_hosts_path: None,
            auth_methods: None,
            connect_timeout: Duration::from_secs(30),
            default_user: crate::ssh::DEFAULT_USER.to_string(),
        }
    }
}

impl SshSettings {
    pub fn key_path(&self) -> PathBuf {
        match &self.key_path {
            Some(path) => expand_home(path),
            None => expand_home(&PathBuf::from("~/.ssh").join(self.key_type.default_file_name())),
        }
    }

    pub fn known_hosts_path(&self) -> PathBuf {
        match &self.known_hosts_path {
            Some(path) => expand_home(path),
            None => expand_home(&PathBuf::from("~/.ssh/known_hosts")),
        }
    }

    /// Passphrase for the key file: `key_password` if it resolves, otherwise
    /// the session password.
    pub fn key_passphrase(&self, password: Option<&str>) -> Option<String> {
        if let Some(secret) = &self.key_password {
            match secret.resolve() {
                Ok(value) => return Some(value),
                Err(e) => tracing::debug!("Ignoring key_password: {}", e),
            }
        }
        password.map(str::to_string)
    }

    /// Methods in the order they are attempted.
    pub fn auth_order(&self) -> Vec<AuthMethodKind> {
        if let Some(methods) = &self.auth_methods {
            return methods.iter().copied().collect();
        }
        let mut order = Vec::with_capacity(3);
        if self.use_ssh_agent {
            order.push(AuthMethodKind::Agent);
        }
        order.push(AuthMethodKind::Key);
        order.push(AuthMethodKind::Password);
        order
    }
}

fn deserialize_auth_methods<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<NonEmpty<AuthMethodKind>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt: Option<Vec<AuthMethodKind>> = Option::deserialize(deserializer)?;
    match opt {
        None => Ok(None),
        Some(methods) => NonEmpty::from_vec(methods)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom("auth_methods cannot be empty")),
    }
}
