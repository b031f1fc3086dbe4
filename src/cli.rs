// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines global options and the remote, local and config subcommands.

use clap::{Parser, Subcommand, ValueEnum};
use quall::output::OutputMode;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "quall")]
#[command(about = "Functional test harness: remote commands, file transfer and test helpers")]
#[command(version)]
pub struct Cli {
    /// Configuration environment to select
    #[arg(short, long, global = true, default_value = quall::config::DEFAULT_ENVIRONMENT)]
    pub env: String,

    /// Path to the configuration file [default: ./config/base_config.yml]
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Normal)]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Normal,
    Quiet,
    Json,
}

impl From<OutputFormat> for OutputMode {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Normal => OutputMode::Normal,
            OutputFormat::Quiet => OutputMode::Quiet,
            OutputFormat::Json => OutputMode::Json,
        }
    }
}

/// Connection options shared by the remote subcommands.
#[derive(Debug, clap::Args)]
pub struct RemoteArgs {
    /// Remote host as [user@]host[:port]
    pub target: String,

    /// Password for password authentication or an encrypted key
    #[arg(long, env = "QUALL_SSH_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create config/base_config.yml in the current directory
    Init {
        /// Overwrite an existing configuration file
        #[arg(long)]
        force: bool,
    },

    /// Run a command on a remote host
    Exec {
        #[command(flatten)]
        remote: RemoteArgs,

        /// Request a pseudo-terminal
        #[arg(long)]
        pty: bool,

        /// Feed the command to an interactive shell instead of exec
        #[arg(long)]
        shell: bool,

        /// Merge stderr into stdout
        #[arg(long)]
        combine_stderr: bool,

        /// Give up after this many seconds
        #[arg(long, value_name = "SECS")]
        timeout: Option<u64>,

        /// Command to run
        #[arg(last = true, required = true)]
        command: Vec<String>,
    },

    /// Upload a local file over SFTP
    Put {
        #[command(flatten)]
        remote: RemoteArgs,
        local: PathBuf,
        remote_path: String,
    },

    /// Download a remote file over SFTP
    Get {
        #[command(flatten)]
        remote: RemoteArgs,
        remote_path: String,
        local: PathBuf,
    },

    /// Print a remote file
    Cat {
        #[command(flatten)]
        remote: RemoteArgs,
        remote_path: String,
    },

    /// Print a free local TCP port
    FreePort,

    /// Print one configuration value
    Config { section: String, key: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn exec_collects_trailing_command() {
        let cli = Cli::try_parse_from([
            "quall", "exec", "deploy@web1", "--timeout", "5", "--", "ls", "-lah", "/etc",
        ])
        .unwrap();
        match cli.command {
            Commands::Exec {
                remote,
                timeout,
                command,
                ..
            } => {
                assert_eq!(remote.target, "deploy@web1");
                assert_eq!(timeout, Some(5));
                assert_eq!(command, vec!["ls", "-lah", "/etc"]);
            }
            _ => panic!("expected exec"),
        }
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["quall", "free-port", "-e", "staging", "--output", "json"])
            .unwrap();
        assert_eq!(cli.env, "staging");
        assert!(matches!(cli.output, OutputFormat::Json));
    }
}
