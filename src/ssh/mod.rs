// ABOUTME: SSH client module for remote commands and file transfer.
// ABOUTME: Supports agent, key file and password authentication with known_hosts verification.

mod auth;
mod client;
mod command;
mod error;
mod known_hosts;
mod session_config;
mod transport;

pub use auth::{AgentAuth, AuthChain, AuthStrategy, KeyFileAuth, PasswordAuth};
pub use client::{RemoteOps, SshClient};
pub use command::{CommandOutput, ExecOptions, RemoteCommand};
pub use error::{Error, Result};
pub use known_hosts::{HostKeyStore, KnownHosts, KnownHostsFile, verify_host_key};
pub use session_config::{DEFAULT_PORT, DEFAULT_USER, SessionConfig};
pub use transport::{Connector, RusshConnector, RusshTransport, Transport};

/// Re-exported key types used by [`Transport`] and [`HostKeyStore`].
pub use russh::keys::ssh_key::{PrivateKey, PublicKey};
