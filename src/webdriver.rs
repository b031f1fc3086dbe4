// ABOUTME: Selenium server lifecycle for browser-driven tests.
// ABOUTME: Picks a port, launches the server jar in the background and shuts it down on cleanup.

use crate::config::WebDriverSettings;
use crate::error::{Error, Result};
use crate::net::free_port;
use crate::process::BackgroundProcess;

/// A Selenium server, optionally launched locally.
#[derive(Debug)]
pub struct SeleniumServer {
    settings: WebDriverSettings,
    port: Option<u16>,
    process: Option<BackgroundProcess>,
}

impl SeleniumServer {
    pub fn from_settings(settings: &WebDriverSettings) -> Self {
        Self {
            settings: settings.clone(),
            port: None,
            process: None,
        }
    }

    pub fn settings(&self) -> &WebDriverSettings {
        &self.settings
    }

    /// Port chosen by [`Self::start`].
    pub fn port(&self) -> Option<u16> {
        self.port
    }

    pub fn is_running(&self) -> bool {
        self.process.is_some()
    }

    /// Arguments passed to the java launcher.
    pub fn launch_args(&self, port: u16) -> Result<Vec<String>> {
        let location = self.settings.selenium_location.as_ref().ok_or_else(|| {
            Error::WebDriver("selenium_location is required when start_selenium is set".into())
        })?;

        let mut args = vec!["-jar".to_string(), location.display().to_string()];
        args.extend(
            self.settings
                .selenium_args
                .split_whitespace()
                .map(str::to_string),
        );
        args.push("-port".to_string());
        args.push(port.to_string());
        Ok(args)
    }

    /// Choose a port and, when `start_selenium` is set, launch the server.
    /// Calling it again while running returns the current port.
    pub fn start(&mut self) -> Result<u16> {
        if let (Some(port), true) = (self.port, self.is_running()) {
            return Ok(port);
        }

        let port = match self.settings.selenium_port {
            Some(port) => port,
            None => free_port()?,
        };
        self.port = Some(port);

        if !self.settings.start_selenium {
            tracing::debug!("Using external Selenium server");
            return Ok(port);
        }

        let args = self.launch_args(port)?;
        if let Some(location) = self.settings.selenium_location.as_ref().filter(|p| !p.exists()) {
            return Err(Error::WebDriver(format!(
                "selenium server jar not found at {}",
                location.display()
            )));
        }

        tracing::info!("Starting Selenium server on port {}", port);
        self.process = Some(BackgroundProcess::spawn(&self.settings.java, &args)?);
        Ok(port)
    }

    /// URL a WebDriver client should connect to.
    pub fn command_executor_url(&self) -> String {
        match (self.settings.start_selenium, self.port) {
            (true, Some(port)) => format!("{}:{}/wd/hub", self.settings.command_executor, port),
            _ => self.settings.command_executor.clone(),
        }
    }

    /// Terminate the server, killing it if it outlives the grace period.
    pub async fn stop(&mut self) -> Result<()> {
        let Some(process) = self.process.take() else {
            return Ok(());
        };
        tracing::info!("Stopping Selenium server");
        let status = process.shutdown(self.settings.shutdown_grace).await?;
        tracing::debug!("Selenium server exited with {}", status);
        Ok(())
    }
}
