// ABOUTME: Remote command implementations.
// ABOUTME: Runs commands and moves files over SSH through the harness.

use quall::error::Result;
use quall::harness::Harness;
use quall::output::Output;
use quall::ssh::{ExecOptions, RemoteCommand, SessionConfig};
use std::path::Path;

fn session(harness: &Harness, target: &str, password: Option<String>) -> Result<SessionConfig> {
    let session = harness.session(target)?;
    Ok(match password {
        Some(password) => session.password(password),
        None => session,
    })
}

/// Run `command` remotely and return its exit code.
pub async fn exec(
    harness: &Harness,
    target: &str,
    password: Option<String>,
    command: Vec<String>,
    options: ExecOptions,
    output: &Output,
) -> Result<u32> {
    let session = session(harness, target, password)?;
    output.progress(&format!("  → Running on {}...", session.target()));

    let result = harness
        .remote()?
        .run_command(&session, RemoteCommand::from(command), options)
        .await?;

    output.command_output(&result);
    Ok(result.exit_code)
}

pub async fn put(
    harness: &Harness,
    target: &str,
    password: Option<String>,
    local: &Path,
    remote_path: &str,
    output: &Output,
) -> Result<()> {
    let session = session(harness, target, password)?;
    output.progress(&format!("  → Uploading {}...", local.display()));
    harness
        .remote()?
        .send_file(&session, local, remote_path)
        .await?;
    output.success(&format!("Sent {} to {}", local.display(), remote_path));
    Ok(())
}

pub async fn get(
    harness: &Harness,
    target: &str,
    password: Option<String>,
    remote_path: &str,
    local: &Path,
    output: &Output,
) -> Result<()> {
    let session = session(harness, target, password)?;
    output.progress(&format!("  → Downloading {}...", remote_path));
    harness
        .remote()?
        .fetch_file(&session, remote_path, local)
        .await?;
    output.success(&format!("Saved {} to {}", remote_path, local.display()));
    Ok(())
}

pub async fn cat(
    harness: &Harness,
    target: &str,
    password: Option<String>,
    remote_path: &str,
    output: &Output,
) -> Result<()> {
    let session = session(harness, target, password)?;
    let contents = harness.remote()?.read_file(&session, remote_path).await?;
    output.bytes(&contents);
    Ok(())
}
