// ABOUTME: SSH client that opens one authenticated session per operation.
// ABOUTME: Runs remote commands and SFTP transfers, closing the session on every path.

use super::auth::AuthChain;
use super::command::{CommandOutput, ExecOptions, RemoteCommand};
use super::error::{Error, Result};
use super::known_hosts::{HostKeyStore, KnownHostsFile, verify_host_key};
use super::session_config::SessionConfig;
use super::transport::{Connector, RusshConnector, Transport};
use crate::config::SshSettings;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

/// Remote command and file capability, as seen by the harness.
#[async_trait]
pub trait RemoteOps: Send + Sync {
    async fn run_command(
        &self,
        config: &SessionConfig,
        command: RemoteCommand,
        options: ExecOptions,
    ) -> Result<CommandOutput>;

    async fn send_file(&self, config: &SessionConfig, local: &Path, remote: &str) -> Result<()>;

    async fn fetch_file(&self, config: &SessionConfig, remote: &str, local: &Path) -> Result<()>;

    async fn read_file(&self, config: &SessionConfig, remote: &str) -> Result<Vec<u8>>;
}

/// SSH client configured from the `ssh` settings section.
pub struct SshClient<C = RusshConnector> {
    settings: SshSettings,
    connector: C,
    host_keys: Arc<dyn HostKeyStore>,
}

impl<C> std::fmt::Debug for SshClient<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SshClient")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl SshClient<RusshConnector> {
    pub fn new(settings: SshSettings) -> Self {
        let connector = RusshConnector::new(settings.connect_timeout);
        Self::with_connector(settings, connector)
    }
}

impl<C: Connector> SshClient<C> {
    /// Use a custom connector. Host keys are read from the configured
    /// known_hosts file unless replaced with [`Self::with_host_key_store`].
    pub fn with_connector(settings: SshSettings, connector: C) -> Self {
        let host_keys = Arc::new(KnownHostsFile::new(settings.known_hosts_path()));
        Self {
            settings,
            connector,
            host_keys,
        }
    }

    /// Replace the trusted host key source. It is only consulted when
    /// `check_host_keys` is enabled.
    pub fn with_host_key_store(mut self, store: impl HostKeyStore + 'static) -> Self {
        self.host_keys = Arc::new(store);
        self
    }

    pub fn settings(&self) -> &SshSettings {
        &self.settings
    }

    /// Connect, verify the host key if configured, and authenticate.
    ///
    /// The caller owns the returned transport and must close it.
    pub async fn open_session(&self, config: &SessionConfig) -> Result<C::Transport> {
        let mut transport = self.connector.connect(config).await?;
        let target = config.target();

        if let Err(e) = self.establish(&mut transport, config, &target).await {
            release(&mut transport, &target).await;
            return Err(e);
        }

        tracing::debug!("Successfully authenticated to {}", target);
        Ok(transport)
    }

    async fn establish(
        &self,
        transport: &mut C::Transport,
        config: &SessionConfig,
        target: &str,
    ) -> Result<()> {
        if self.settings.check_host_keys {
            let presented = transport.server_key().ok_or(Error::NoHostKey)?;
            verify_host_key(self.host_keys.as_ref(), &config.host, config.port, &presented)?;
        }

        let chain = AuthChain::from_settings(&self.settings, config.password.as_deref());
        chain.authenticate(transport, &config.user, target).await
    }

    /// Execute a command on the remote host.
    pub async fn run_command(
        &self,
        config: &SessionConfig,
        command: impl Into<RemoteCommand>,
        options: ExecOptions,
    ) -> Result<CommandOutput> {
        let command = command.into().to_command_line();
        let target = config.target();
        tracing::info!("Executing SSH command against {}: {}", target, command);

        let command_failed = |source: Error| Error::Command {
            target: target.clone(),
            command: command.clone(),
            source: Box::new(source),
        };

        let mut transport = self.open_session(config).await.map_err(command_failed)?;

        let result = match options.timeout {
            Some(timeout) => {
                match tokio::time::timeout(timeout, transport.exec(&command, &options)).await {
                    Ok(result) => result,
                    Err(_) => Err(Error::Timeout {
                        timeout,
                        target: target.clone(),
                        command: command.clone(),
                    }),
                }
            }
            None => transport.exec(&command, &options).await,
        };

        release(&mut transport, &target).await;

        match result {
            Ok(output) => {
                tracing::info!("Exit code: {}", output.exit_code);
                tracing::info!("Stdout:\n{}", output.stdout_lossy());
                tracing::info!("Stderr:\n{}", output.stderr_lossy());
                Ok(output)
            }
            Err(e @ Error::Timeout { .. }) => Err(e),
            Err(e) => Err(command_failed(e)),
        }
    }

    /// Copy a local file to the remote host.
    pub async fn send_file(
        &self,
        config: &SessionConfig,
        local: impl AsRef<Path>,
        remote: &str,
    ) -> Result<()> {
        let local = local.as_ref();
        let description = format!(
            "send {} to {}:{}",
            local.display(),
            config.target(),
            remote
        );
        tracing::info!("SFTP: {}", description);

        let contents = tokio::fs::read(local)
            .await
            .map_err(|e| sftp_failed(&description, e.into()))?;

        let mut transport = self
            .open_session(config)
            .await
            .map_err(|e| sftp_failed(&description, e))?;
        let result = transport.write_remote_file(remote, &contents).await;
        release(&mut transport, &config.target()).await;

        result.map_err(|e| sftp_failed(&description, e))
    }

    /// Copy a remote file to a local path.
    pub async fn fetch_file(
        &self,
        config: &SessionConfig,
        remote: &str,
        local: impl AsRef<Path>,
    ) -> Result<()> {
        let local = local.as_ref();
        let description = format!(
            "get {} from {} to {}",
            remote,
            config.target(),
            local.display()
        );
        tracing::info!("SFTP: {}", description);

        let mut transport = self
            .open_session(config)
            .await
            .map_err(|e| sftp_failed(&description, e))?;
        let result = transport.read_remote_file(remote).await;
        release(&mut transport, &config.target()).await;

        let contents = result.map_err(|e| sftp_failed(&description, e))?;
        tokio::fs::write(local, contents)
            .await
            .map_err(|e| sftp_failed(&description, e.into()))
    }

    /// Read a remote file into memory.
    pub async fn read_file(&self, config: &SessionConfig, remote: &str) -> Result<Vec<u8>> {
        let description = format!("read {} from {}", remote, config.target());
        tracing::info!("SFTP: {}", description);

        let mut transport = self
            .open_session(config)
            .await
            .map_err(|e| sftp_failed(&description, e))?;
        let result = transport.read_remote_file(remote).await;
        release(&mut transport, &config.target()).await;

        result.map_err(|e| sftp_failed(&description, e))
    }
}

#[async_trait]
impl<C: Connector> RemoteOps for SshClient<C> {
    async fn run_command(
        &self,
        config: &SessionConfig,
        command: RemoteCommand,
        options: ExecOptions,
    ) -> Result<CommandOutput> {
        SshClient::<C>::run_command(self, config, command, options).await
    }

    async fn send_file(&self, config: &SessionConfig, local: &Path, remote: &str) -> Result<()> {
        SshClient::<C>::send_file(self, config, local, remote).await
    }

    async fn fetch_file(&self, config: &SessionConfig, remote: &str, local: &Path) -> Result<()> {
        SshClient::<C>::fetch_file(self, config, remote, local).await
    }

    async fn read_file(&self, config: &SessionConfig, remote: &str) -> Result<Vec<u8>> {
        SshClient::<C>::read_file(self, config, remote).await
    }
}

fn sftp_failed(description: &str, source: Error) -> Error {
    Error::Sftp {
        description: description.to_string(),
        source: Box::new(source),
    }
}

/// Close a transport, logging rather than returning a failure.
async fn release<T: Transport + ?Sized>(transport: &mut T, target: &str) {
    if let Err(e) = transport.close().await {
        tracing::warn!("Failed to close SSH session to {}: {}", target, e);
    }
}
