// ABOUTME: Transport abstraction over an SSH connection, plus the russh implementation.
// ABOUTME: A transport records the presented host key and exposes auth, exec and SFTP primitives.

use super::command::{CommandOutput, ExecOptions};
use super::error::{Error, Result};
use super::session_config::SessionConfig;
use async_trait::async_trait;
use parking_lot::Mutex;
use russh::client::{self, Config, Handle};
use russh::keys::agent::client::AgentClient;
use russh::keys::{PrivateKeyWithHashAlg, ssh_key};
use russh::{ChannelMsg, Disconnect};
use russh_sftp::client::SftpSession;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// An open, possibly unauthenticated, connection to one remote host.
///
/// Authentication methods return `Ok(false)` when the server rejects the
/// credentials and `Err` when the attempt could not be made at all.
#[async_trait]
pub trait Transport: Send {
    /// Host key the server presented during the handshake.
    fn server_key(&self) -> Option<ssh_key::PublicKey>;

    /// Try every key held by the local SSH agent.
    async fn auth_agent(&mut self, user: &str) -> Result<bool>;

    async fn auth_publickey(&mut self, user: &str, key: Arc<ssh_key::PrivateKey>) -> Result<bool>;

    async fn auth_password(&mut self, user: &str, password: &str) -> Result<bool>;

    /// Run one command on a fresh channel and wait for it to finish.
    async fn exec(&mut self, command: &str, options: &ExecOptions) -> Result<CommandOutput>;

    async fn read_remote_file(&mut self, path: &str) -> Result<Vec<u8>>;

    async fn write_remote_file(&mut self, path: &str, contents: &[u8]) -> Result<()>;

    /// Tear down the connection.
    async fn close(&mut self) -> Result<()>;
}

/// Opens transports to remote hosts.
#[async_trait]
pub trait Connector: Send + Sync {
    type Transport: Transport + 'static;

    async fn connect(&self, config: &SessionConfig) -> Result<Self::Transport>;
}

/// Connects with russh.
#[derive(Debug, Clone)]
pub struct RusshConnector {
    connect_timeout: Duration,
}

impl RusshConnector {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

impl Default for RusshConnector {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

/// russh handler that accepts any host key and remembers it, so
/// verification can run against known_hosts before authentication.
pub(crate) struct HostKeyRecorder {
    presented: Arc<Mutex<Option<ssh_key::PublicKey>>>,
}

impl client::Handler for HostKeyRecorder {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &ssh_key::PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        *self.presented.lock() = Some(server_public_key.clone());
        Ok(true)
    }
}

#[async_trait]
impl Connector for RusshConnector {
    type Transport = RusshTransport;

    async fn connect(&self, config: &SessionConfig) -> Result<RusshTransport> {
        tracing::debug!("Opening SSH connection to {}", config.target());

        let presented = Arc::new(Mutex::new(None));
        let handler = HostKeyRecorder {
            presented: Arc::clone(&presented),
        };

        let russh_config = Config {
            keepalive_interval: Some(Duration::from_secs(15)),
            ..Default::default()
        };

        let connect = client::connect(
            Arc::new(russh_config),
            (config.host.as_str(), config.port),
            handler,
        );

        let handle = match tokio::time::timeout(self.connect_timeout, connect).await {
            Ok(Ok(handle)) => handle,
            Ok(Err(e)) => {
                return Err(Error::Connection {
                    host: config.host.clone(),
                    port: config.port,
                    reason: e.to_string(),
                });
            }
            Err(_) => {
                return Err(Error::Connection {
                    host: config.host.clone(),
                    port: config.port,
                    reason: format!("timed out after {:?}", self.connect_timeout),
                });
            }
        };

        let server_key = presented.lock().take();
        Ok(RusshTransport { handle, server_key })
    }
}

/// A russh client connection.
pub struct RusshTransport {
    handle: Handle<HostKeyRecorder>,
    server_key: Option<ssh_key::PublicKey>,
}

impl std::fmt::Debug for RusshTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RusshTransport")
            .field("handle", &"<russh::Handle>")
            .field("server_key", &self.server_key.as_ref().map(|k| k.algorithm()))
            .finish()
    }
}

impl RusshTransport {
    async fn sftp(&self) -> Result<SftpSession> {
        let channel = self.handle.channel_open_session().await?;
        channel.request_subsystem(true, "sftp").await?;
        Ok(SftpSession::new(channel.into_stream()).await?)
    }
}

#[async_trait]
impl Transport for RusshTransport {
    fn server_key(&self) -> Option<ssh_key::PublicKey> {
        self.server_key.clone()
    }

    async fn auth_agent(&mut self, user: &str) -> Result<bool> {
        let mut agent = AgentClient::connect_env()
            .await
            .map_err(|e| Error::AgentUnavailable(e.to_string()))?;

        let keys = agent.request_identities().await.map_err(|e| {
            Error::AgentUnavailable(format!("failed to list agent keys: {}", e))
        })?;

        let total = keys.len();
        for (index, key) in keys.into_iter().enumerate() {
            tracing::debug!("Trying agent key {} of {}", index + 1, total);
            match self
                .handle
                .authenticate_publickey_with(user, key, None, &mut agent)
                .await
            {
                Ok(result) if result.success() => return Ok(true),
                Ok(_) => tracing::debug!("Agent key {} was rejected", index + 1),
                Err(e) => tracing::debug!("Agent key {} failed: {}", index + 1, e),
            }
        }
        Ok(false)
    }

    async fn auth_publickey(&mut self, user: &str, key: Arc<ssh_key::PrivateKey>) -> Result<bool> {
        let hash_alg = self
            .handle
            .best_supported_rsa_hash()
            .await
            .map_err(Error::Protocol)?
            .flatten();

        let result = self
            .handle
            .authenticate_publickey(user, PrivateKeyWithHashAlg::new(key, hash_alg))
            .await
            .map_err(Error::Protocol)?;

        Ok(result.success())
    }

    async fn auth_password(&mut self, user: &str, password: &str) -> Result<bool> {
        let result = self
            .handle
            .authenticate_password(user, password)
            .await
            .map_err(Error::Protocol)?;

        Ok(result.success())
    }

    async fn exec(&mut self, command: &str, options: &ExecOptions) -> Result<CommandOutput> {
        let mut channel = self.handle.channel_open_session().await?;

        if options.pty {
            channel.request_pty(true, "xterm", 80, 24, 0, 0, &[]).await?;
        }

        if options.shell {
            channel.request_shell(true).await?;
            let script = format!("{command}\nexit\n");
            channel.data(script.as_bytes()).await?;
            channel.eof().await?;
        } else {
            channel.exec(true, command).await?;
        }

        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let mut exit_code = 0u32;

        let mut got_exit_status = false;
        let mut got_eof = false;

        loop {
            match channel.wait().await {
                Some(ChannelMsg::Data { data }) => {
                    stdout.extend_from_slice(&data);
                }
                Some(ChannelMsg::ExtendedData { data, ext }) => {
                    if ext == 1 {
                        if options.combine_stderr {
                            stdout.extend_from_slice(&data);
                        } else {
                            stderr.extend_from_slice(&data);
                        }
                    }
                }
                Some(ChannelMsg::ExitStatus { exit_status }) => {
                    exit_code = exit_status;
                    got_exit_status = true;
                    if got_eof {
                        break;
                    }
                }
                Some(ChannelMsg::Eof) => {
                    got_eof = true;
                    if got_exit_status {
                        break;
                    }
                }
                Some(ChannelMsg::Close) => break,
                Some(_) => {}
                None => break,
            }
        }

        if let Err(e) = channel.close().await {
            tracing::debug!("Failed to close exec channel: {}", e);
        }

        if !got_exit_status {
            return Err(Error::ChannelClosed);
        }

        Ok(CommandOutput {
            exit_code,
            stdout,
            stderr,
        })
    }

    async fn read_remote_file(&mut self, path: &str) -> Result<Vec<u8>> {
        let sftp = self.sftp().await?;
        let mut file = sftp.open(path).await?;
        let mut contents = Vec::new();
        file.read_to_end(&mut contents).await?;
        Ok(contents)
    }

    async fn write_remote_file(&mut self, path: &str, contents: &[u8]) -> Result<()> {
        let sftp = self.sftp().await?;
        let mut file = sftp.create(path).await?;
        file.write_all(contents).await?;
        file.shutdown().await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.handle
            .disconnect(Disconnect::ByApplication, "", "en")
            .await
            .map_err(Error::Protocol)
    }
}
