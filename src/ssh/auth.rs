// ABOUTME: Ordered SSH authentication strategies: agent, key file, password.
// ABOUTME: The chain stops at the first accepted method; individual failures are logged.

use super::error::{Error, Result};
use super::transport::Transport;
use crate::config::{AuthMethodKind, KeyType, SshSettings};
use async_trait::async_trait;
use russh::keys::load_secret_key;
use russh::keys::ssh_key::{Algorithm, PrivateKey};
use std::path::PathBuf;
use std::sync::Arc;

/// One way of authenticating a transport.
#[async_trait]
pub trait AuthStrategy: Send + Sync {
    /// Returns `Ok(true)` once the server accepts the credentials.
    async fn attempt(&self, transport: &mut dyn Transport, user: &str) -> Result<bool>;

    fn name(&self) -> &'static str;
}

/// Authenticate with keys held by the local SSH agent.
#[derive(Debug, Default)]
pub struct AgentAuth;

#[async_trait]
impl AuthStrategy for AgentAuth {
    async fn attempt(&self, transport: &mut dyn Transport, user: &str) -> Result<bool> {
        transport.auth_agent(user).await
    }

    fn name(&self) -> &'static str {
        "agent"
    }
}

/// Authenticate with a private key file, decrypting it when needed.
#[derive(Debug)]
pub struct KeyFileAuth {
    key_type: KeyType,
    path: PathBuf,
    passphrase: Option<String>,
}

impl KeyFileAuth {
    pub fn new(key_type: KeyType, path: impl Into<PathBuf>, passphrase: Option<String>) -> Self {
        Self {
            key_type,
            path: path.into(),
            passphrase,
        }
    }

    /// Load the key, retrying with the passphrase if the file is encrypted.
    pub fn load_key(&self) -> Result<PrivateKey> {
        tracing::debug!(
            "Trying {} key authentication from {}",
            self.key_type,
            self.path.display()
        );

        let key = match load_secret_key(&self.path, None) {
            Ok(key) => key,
            Err(russh::keys::Error::KeyIsEncrypted) => {
                let passphrase = self.passphrase.as_deref().ok_or_else(|| self.load_failed(
                    "key is encrypted and no passphrase is available".to_string(),
                ))?;
                load_secret_key(&self.path, Some(passphrase))
                    .map_err(|e| self.load_failed(format!("unable to decrypt key: {}", e)))?
            }
            Err(e) => return Err(self.load_failed(e.to_string())),
        };

        if !key_type_matches(self.key_type, &key.algorithm()) {
            return Err(self.load_failed(format!(
                "expected {} key, found {}",
                self.key_type,
                key.algorithm()
            )));
        }

        Ok(key)
    }

    fn load_failed(&self, reason: String) -> Error {
        Error::KeyLoadFailed {
            path: self.path.clone(),
            reason,
        }
    }
}

fn key_type_matches(key_type: KeyType, algorithm: &Algorithm) -> bool {
    match key_type {
        KeyType::Rsa => matches!(algorithm, Algorithm::Rsa { .. }),
        KeyType::Dsa => matches!(algorithm, Algorithm::Dsa),
        KeyType::Ecdsa => matches!(algorithm, Algorithm::Ecdsa { .. }),
        KeyType::Ed25519 => matches!(algorithm, Algorithm::Ed25519),
    }
}

#[async_trait]
impl AuthStrategy for KeyFileAuth {
    async fn attempt(&self, transport: &mut dyn Transport, user: &str) -> Result<bool> {
        let key = self.load_key()?;
        transport.auth_publickey(user, Arc::new(key)).await
    }

    fn name(&self) -> &'static str {
        "key"
    }
}

/// Authenticate with a password.
pub struct PasswordAuth {
    password: String,
}

impl PasswordAuth {
    pub fn new(password: impl Into<String>) -> Self {
        Self {
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for PasswordAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordAuth").finish_non_exhaustive()
    }
}

#[async_trait]
impl AuthStrategy for PasswordAuth {
    async fn attempt(&self, transport: &mut dyn Transport, user: &str) -> Result<bool> {
        transport.auth_password(user, &self.password).await
    }

    fn name(&self) -> &'static str {
        "password"
    }
}

/// Strategies tried in insertion order until one succeeds.
#[derive(Default)]
pub struct AuthChain {
    strategies: Vec<Box<dyn AuthStrategy>>,
}

impl AuthChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the chain configured in `settings`. The password strategy is
    /// left out when no password is supplied.
    pub fn from_settings(settings: &SshSettings, password: Option<&str>) -> Self {
        let mut chain = Self::new();
        for method in settings.auth_order() {
            chain = match method {
                AuthMethodKind::Agent => chain.with_agent(),
                AuthMethodKind::Key => chain.with_key_file(
                    settings.key_type,
                    settings.key_path(),
                    settings.key_passphrase(password),
                ),
                AuthMethodKind::Password => match password {
                    Some(password) => chain.with_password(password),
                    None => {
                        tracing::debug!("No password supplied; skipping password authentication");
                        chain
                    }
                },
            };
        }
        chain
    }

    pub fn with_agent(self) -> Self {
        self.with_strategy(AgentAuth)
    }

    pub fn with_key_file(
        self,
        key_type: KeyType,
        path: impl Into<PathBuf>,
        passphrase: Option<String>,
    ) -> Self {
        self.with_strategy(KeyFileAuth::new(key_type, path, passphrase))
    }

    pub fn with_password(self, password: impl Into<String>) -> Self {
        self.with_strategy(PasswordAuth::new(password))
    }

    pub fn with_strategy(mut self, strategy: impl AuthStrategy + 'static) -> Self {
        self.strategies.push(Box::new(strategy));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    /// Strategy names in the order they will be tried.
    pub fn names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Try each strategy in turn. Fails with [`Error::Authentication`] once
    /// every strategy has been rejected or has failed.
    pub async fn authenticate(
        &self,
        transport: &mut dyn Transport,
        user: &str,
        target: &str,
    ) -> Result<()> {
        for strategy in &self.strategies {
            tracing::debug!("Trying {} authentication to {}", strategy.name(), target);
            match strategy.attempt(transport, user).await {
                Ok(true) => {
                    tracing::debug!("Authenticated to {} with {}", target, strategy.name());
                    return Ok(());
                }
                Ok(false) => {
                    tracing::debug!("{} authentication to {} was rejected", strategy.name(), target);
                }
                Err(e) => {
                    tracing::debug!("{} authentication to {} failed: {}", strategy.name(), target, e);
                }
            }
        }

        Err(Error::Authentication {
            target: target.to_string(),
        })
    }
}

impl std::fmt::Debug for AuthChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthChain")
            .field("strategies", &self.names())
            .finish()
    }
}
