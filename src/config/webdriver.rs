// ABOUTME: Settings for the `webdriver` configuration section.
// ABOUTME: Describes how the Selenium server is started and where the driver connects.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WebDriverSettings {
    /// Launch a local Selenium server before driving the browser.
    pub start_selenium: bool,
    /// Path to the Selenium server jar.
    pub selenium_location: Option<PathBuf>,
    /// Extra arguments placed before `-port`.
    pub selenium_args: String,
    /// Listener port. A free port is picked when unset.
    pub selenium_port: Option<u16>,
    /// Java launcher used to run the jar.
    pub java: String,
    /// How long to wait after SIGTERM before killing the server.
    #[serde(with = "humantime_serde")]
    pub shutdown_grace: Duration,
    pub command_executor: String,
    pub driver: String,
    pub desired_capabilities_base: String,
    pub desired_capabilities: HashMap<String, serde_yaml::Value>,
}

impl Default for WebDriverSettings {
    fn default() -> Self {
        Self {
            start_selenium: false,
            selenium_location: None,
            selenium_args: String::new(),
            selenium_port: None,
            java: "java".to_string(),
            shutdown_grace: Duration::from_secs(30),
            command_executor: "http://localhost".to_string(),
            driver: "Chrome".to_string(),
            desired_capabilities_base: "CHROME".to_string(),
            desired_capabilities: HashMap::new(),
        }
    }
}
