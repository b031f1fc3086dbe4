// ABOUTME: Test harness that composes configuration, remote access and the browser server.
// ABOUTME: Capabilities are attached explicitly and reached through narrow accessors.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::process::{self, BackgroundProcess, LocalOutput};
use crate::ssh::{RemoteOps, SessionConfig, SshClient};
use crate::webdriver::SeleniumServer;
use std::time::Duration;

/// Entry point for functional tests.
pub struct Harness {
    config: Config,
    remote: Option<Box<dyn RemoteOps>>,
    browser: Option<SeleniumServer>,
}

impl std::fmt::Debug for Harness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Harness")
            .field("environment", &self.config.environment())
            .field("remote", &self.remote.is_some())
            .field("browser", &self.browser)
            .finish()
    }
}

impl Harness {
    /// A harness with no capabilities attached.
    pub fn new(config: Config) -> Self {
        Self {
            config,
            remote: None,
            browser: None,
        }
    }

    /// Attach SSH access, plus a Selenium server when the environment has a
    /// `webdriver` section.
    pub fn from_config(config: Config) -> Result<Self> {
        let ssh = SshClient::new(config.ssh()?);
        let browser = if config.has_section(crate::config::WEBDRIVER_SECTION) {
            Some(SeleniumServer::from_settings(&config.webdriver()?))
        } else {
            None
        };

        let mut harness = Self::new(config).with_remote(ssh);
        harness.browser = browser;
        Ok(harness)
    }

    pub fn with_remote(mut self, remote: impl RemoteOps + 'static) -> Self {
        self.remote = Some(Box::new(remote));
        self
    }

    pub fn with_browser(mut self, server: SeleniumServer) -> Self {
        self.browser = Some(server);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Shorthand for [`Config::get`].
    pub fn cfg(&self, section: &str, key: &str) -> Result<&serde_yaml::Value> {
        self.config.get(section, key)
    }

    pub fn remote(&self) -> Result<&dyn RemoteOps> {
        self.remote.as_deref().ok_or(Error::RemoteNotConfigured)
    }

    pub fn browser_mut(&mut self) -> Result<&mut SeleniumServer> {
        self.browser.as_mut().ok_or(Error::BrowserNotConfigured)
    }

    /// Session parameters for `target` (`[user@]host[:port]`). The `ssh`
    /// section's `default_user` applies when no user is given.
    pub fn session(&self, target: &str) -> Result<SessionConfig> {
        let session = SessionConfig::parse(target).map_err(|reason| Error::InvalidTarget {
            target: target.to_string(),
            reason,
        })?;
        if target.contains('@') {
            return Ok(session);
        }
        Ok(session.user(self.config.ssh()?.default_user))
    }

    pub async fn run_local_command(&self, command: &str, shell: bool) -> Result<LocalOutput> {
        process::run_local_command(command, shell).await
    }

    pub fn spawn_background(&self, command: &str, shell: bool) -> Result<BackgroundProcess> {
        process::spawn_background(command, shell)
    }

    pub fn free_port(&self) -> Result<u16> {
        crate::net::free_port()
    }

    pub async fn sleep(&self, duration: Duration) {
        tracing::info!("Sleeping for {:?}", duration);
        tokio::time::sleep(duration).await;
    }

    /// Stop the browser server if one was started.
    pub async fn cleanup(&mut self) -> Result<()> {
        if let Some(browser) = self.browser.as_mut() {
            browser.stop().await?;
        }
        Ok(())
    }
}
