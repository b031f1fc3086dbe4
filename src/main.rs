// ABOUTME: Entry point for the quall CLI application.
// ABOUTME: Parses arguments, loads configuration and dispatches to command handlers.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use quall::config::Config;
use quall::error::{Error, Result};
use quall::harness::Harness;
use quall::output::Output;
use quall::ssh::ExecOptions;
use std::env;
use std::path::Path;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let output = Output::new(cli.output.into());

    match run(cli, &output).await {
        Ok(0) => {}
        Ok(code) => std::process::exit(code),
        Err(Error::ConfigLoad { path, reason }) => {
            eprintln!("FATAL: Unable to read config file: {}", path.display());
            eprintln!("{reason}");
            std::process::exit(2);
        }
        Err(e) => {
            output.error(&e.to_string());
            std::process::exit(1);
        }
    }
}

/// Returns the process exit code.
async fn run(cli: Cli, output: &Output) -> Result<i32> {
    let cwd = env::current_dir()?;
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| Config::default_path(&cwd));

    match cli.command {
        Commands::Init { force } => {
            commands::init(&cwd, &cli.env, force, output)?;
            Ok(0)
        }
        Commands::FreePort => {
            commands::free_port(output)?;
            Ok(0)
        }
        Commands::Config { section, key } => {
            let config = Config::load(&config_path, &cli.env)?;
            commands::show_value(&config, &section, &key, output)?;
            Ok(0)
        }
        Commands::Exec {
            remote,
            pty,
            shell,
            combine_stderr,
            timeout,
            command,
        } => {
            let harness = load_harness(&config_path, &cli.env)?;
            let mut options = ExecOptions::new()
                .pty(pty)
                .shell(shell)
                .combine_stderr(combine_stderr);
            if let Some(secs) = timeout {
                options = options.timeout(Duration::from_secs(secs));
            }
            let code = commands::exec(
                &harness,
                &remote.target,
                remote.password,
                command,
                options,
                output,
            )
            .await?;
            Ok(i32::try_from(code).unwrap_or(i32::MAX))
        }
        Commands::Put {
            remote,
            local,
            remote_path,
        } => {
            let harness = load_harness(&config_path, &cli.env)?;
            commands::put(
                &harness,
                &remote.target,
                remote.password,
                &local,
                &remote_path,
                output,
            )
            .await?;
            Ok(0)
        }
        Commands::Get {
            remote,
            remote_path,
            local,
        } => {
            let harness = load_harness(&config_path, &cli.env)?;
            commands::get(
                &harness,
                &remote.target,
                remote.password,
                &remote_path,
                &local,
                output,
            )
            .await?;
            Ok(0)
        }
        Commands::Cat {
            remote,
            remote_path,
        } => {
            let harness = load_harness(&config_path, &cli.env)?;
            commands::cat(
                &harness,
                &remote.target,
                remote.password,
                &remote_path,
                output,
            )
            .await?;
            Ok(0)
        }
    }
}

fn load_harness(path: &Path, environment: &str) -> Result<Harness> {
    Harness::from_config(Config::load(path, environment)?)
}
