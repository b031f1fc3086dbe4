// ABOUTME: SSH-specific error types.
// ABOUTME: Covers connection, authentication, host key, timeout and transfer failures.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("connection to {host}:{port} failed: {reason}")]
    Connection {
        host: String,
        port: u16,
        reason: String,
    },

    #[error("unable to authenticate to {target} using any method")]
    Authentication { target: String },

    #[error("unknown host key {presented} for hostname {host}")]
    HostKeyUnknown { host: String, presented: String },

    #[error("host key has changed for hostname {host}; expected {expected}, got {presented}")]
    HostKeyChanged {
        host: String,
        expected: String,
        presented: String,
    },

    #[error(
        "reached timeout of {} seconds while executing SSH command against {target}: {command}",
        timeout.as_secs_f64()
    )]
    Timeout {
        timeout: Duration,
        target: String,
        command: String,
    },

    #[error("failed to execute SSH command against {target}: {command}: {source}")]
    Command {
        target: String,
        command: String,
        #[source]
        source: Box<Error>,
    },

    #[error("failed to {description}: {source}")]
    Sftp {
        description: String,
        #[source]
        source: Box<Error>,
    },

    #[error("failed to load key from {path}: {reason}")]
    KeyLoadFailed { path: PathBuf, reason: String },

    #[error("SSH agent not available: {0}")]
    AgentUnavailable(String),

    #[error("invalid known_hosts entry on line {line}: {reason}")]
    InvalidKnownHosts { line: usize, reason: String },

    #[error("server did not present a host key")]
    NoHostKey,

    #[error("channel closed unexpectedly without exit status")]
    ChannelClosed,

    #[error("SSH protocol error: {0}")]
    Protocol(#[from] russh::Error),

    #[error("SSH key error: {0}")]
    Key(#[from] russh::keys::Error),

    #[error("SFTP protocol error: {0}")]
    SftpProtocol(#[from] russh_sftp::client::error::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this is a host key trust failure (unknown or changed).
    pub fn is_host_key_error(&self) -> bool {
        matches!(
            self,
            Error::HostKeyUnknown { .. } | Error::HostKeyChanged { .. }
        )
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout { .. })
    }

    /// The innermost error beneath command and transfer context.
    pub fn root_cause(&self) -> &Error {
        match self {
            Error::Command { source, .. } | Error::Sftp { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
