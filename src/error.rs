// ABOUTME: Application-wide error types for quall.
// ABOUTME: Uses thiserror for ergonomic error handling.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("unable to read config file {path}: {reason}")]
    ConfigLoad { path: PathBuf, reason: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("missing configuration section: {0}")]
    MissingSection(String),

    #[error("missing configuration key {key} in section {section}")]
    MissingKey { section: String, key: String },

    #[error("invalid value for {section}.{key}: {reason}")]
    InvalidValue {
        section: String,
        key: String,
        reason: String,
    },

    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("file already exists: {0}")]
    AlreadyExists(PathBuf),

    #[error("invalid target {target}: {reason}")]
    InvalidTarget { target: String, reason: String },

    #[error("no remote command capability configured")]
    RemoteNotConfigured,

    #[error("no browser capability configured")]
    BrowserNotConfigured,

    #[error("selenium server: {0}")]
    WebDriver(String),

    #[error("local command `{command}` failed: {reason}")]
    Process { command: String, reason: String },

    #[error(transparent)]
    Ssh(#[from] crate::ssh::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
