// ABOUTME: Host key verification against a known_hosts record.
// ABOUTME: Distinguishes unknown hosts from hosts whose key has changed.

use super::error::{Error, Result};
use russh::keys::known_hosts::known_host_keys_path;
use russh::keys::ssh_key::{HashAlg, PublicKey};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Source of trusted host keys.
pub trait HostKeyStore: Send + Sync {
    /// All keys recorded for `host` on `port`. Empty if the host is unknown.
    fn lookup(&self, host: &str, port: u16) -> Result<Vec<PublicKey>>;
}

/// An OpenSSH known_hosts file on disk. Handles plain and hashed entries.
#[derive(Debug, Clone)]
pub struct KnownHostsFile {
    path: PathBuf,
}

impl KnownHostsFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl HostKeyStore for KnownHostsFile {
    fn lookup(&self, host: &str, port: u16) -> Result<Vec<PublicKey>> {
        if !self.path.exists() {
            tracing::debug!("known_hosts file {} does not exist", self.path.display());
            return Ok(Vec::new());
        }
        let keys = known_host_keys_path(host, port, &self.path)?;
        Ok(keys.into_iter().map(|(_, key)| key).collect())
    }
}

/// In-memory known-hosts record, keyed by host name as it appears in a
/// known_hosts file (`host` for port 22, `[host]:port` otherwise).
#[derive(Debug, Clone, Default)]
pub struct KnownHosts {
    entries: HashMap<String, Vec<PublicKey>>,
}

impl KnownHosts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, host: impl Into<String>, key: PublicKey) {
        self.entries.entry(host.into()).or_default().push(key);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parse known_hosts text. Markers (`@revoked`, `@cert-authority`),
    /// hashed hostnames and negated patterns are skipped.
    pub fn parse(content: &str) -> Result<Self> {
        let mut record = Self::new();
        for (index, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with('@') {
                continue;
            }
            let mut fields = line.split_whitespace();
            let (Some(hosts), Some(algorithm), Some(encoded)) =
                (fields.next(), fields.next(), fields.next())
            else {
                return Err(Error::InvalidKnownHosts {
                    line: index + 1,
                    reason: "expected `hosts keytype key`".to_string(),
                });
            };
            if hosts.starts_with('|') {
                tracing::debug!("skipping hashed known_hosts entry on line {}", index + 1);
                continue;
            }
            let key = PublicKey::from_openssh(&format!("{algorithm} {encoded}")).map_err(|e| {
                Error::InvalidKnownHosts {
                    line: index + 1,
                    reason: e.to_string(),
                }
            })?;
            for host in hosts.split(',').filter(|h| !h.starts_with('!')) {
                record.insert(host, key.clone());
            }
        }
        Ok(record)
    }
}

impl HostKeyStore for KnownHosts {
    fn lookup(&self, host: &str, port: u16) -> Result<Vec<PublicKey>> {
        Ok(self
            .entries
            .get(&host_entry_name(host, port))
            .cloned()
            .unwrap_or_default())
    }
}

fn host_entry_name(host: &str, port: u16) -> String {
    if port == 22 {
        host.to_string()
    } else {
        format!("[{host}]:{port}")
    }
}

pub(crate) fn fingerprint(key: &PublicKey) -> String {
    format!("{} {}", key.algorithm(), key.fingerprint(HashAlg::Sha256))
}

/// Check the key a server presented against the trusted record.
///
/// Fails with [`Error::HostKeyUnknown`] when the host, or a key of the
/// presented algorithm, is not recorded, and with [`Error::HostKeyChanged`]
/// when a recorded key of that algorithm differs.
pub fn verify_host_key(
    store: &dyn HostKeyStore,
    host: &str,
    port: u16,
    presented: &PublicKey,
) -> Result<()> {
    let known = store.lookup(host, port)?;
    let same_algorithm: Vec<&PublicKey> = known
        .iter()
        .filter(|key| key.algorithm() == presented.algorithm())
        .collect();

    let Some(expected) = same_algorithm.first() else {
        return Err(Error::HostKeyUnknown {
            host: host.to_string(),
            presented: fingerprint(presented),
        });
    };

    if same_algorithm
        .iter()
        .any(|key| key.key_data() == presented.key_data())
    {
        tracing::debug!("host key for {} matches known_hosts", host);
        return Ok(());
    }

    Err(Error::HostKeyChanged {
        host: host.to_string(),
        expected: fingerprint(expected),
        presented: fingerprint(presented),
    })
}
