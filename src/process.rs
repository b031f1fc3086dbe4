// ABOUTME: Local subprocess execution for the harness.
// ABOUTME: Runs commands to completion or in the background with terminate-then-kill shutdown.

use crate::error::{Error, Result};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::process::{Child, Command};

/// Result of a local command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalOutput {
    /// None when the process was killed by a signal.
    pub exit_code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl LocalOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

fn build_command(command: &str, shell: bool) -> Result<Command> {
    if shell {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(command);
        return Ok(cmd);
    }

    let mut parts = command.split_whitespace();
    let program = parts.next().ok_or_else(|| Error::Process {
        command: command.to_string(),
        reason: "empty command".to_string(),
    })?;
    let mut cmd = Command::new(program);
    cmd.args(parts);
    Ok(cmd)
}

/// Run a command and wait for it. With `shell` the command goes through
/// `sh -c`; otherwise it is split on whitespace.
pub async fn run_local_command(command: &str, shell: bool) -> Result<LocalOutput> {
    tracing::info!("Running local command: {}", command);

    let output = build_command(command, shell)?
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| Error::Process {
            command: command.to_string(),
            reason: e.to_string(),
        })?;

    let result = LocalOutput {
        exit_code: output.status.code(),
        stdout: output.stdout,
        stderr: output.stderr,
    };

    tracing::info!("Return code: {:?}", result.exit_code);
    tracing::info!("Stdout: {}", String::from_utf8_lossy(&result.stdout));
    tracing::info!("Stderr: {}", String::from_utf8_lossy(&result.stderr));

    Ok(result)
}

/// Start a command without waiting for it.
pub fn spawn_background(command: &str, shell: bool) -> Result<BackgroundProcess> {
    let cmd = build_command(command, shell)?;
    BackgroundProcess::spawn_command(command.to_string(), cmd)
}

/// A child process owned by the harness. Killed on drop if still running.
#[derive(Debug)]
pub struct BackgroundProcess {
    description: String,
    child: Child,
}

impl BackgroundProcess {
    /// Start `program` with `args`, bypassing the shell.
    pub fn spawn(program: &str, args: &[String]) -> Result<Self> {
        let mut cmd = Command::new(program);
        cmd.args(args);
        let description = std::iter::once(program.to_string())
            .chain(args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ");
        Self::spawn_command(description, cmd)
    }

    fn spawn_command(description: String, mut cmd: Command) -> Result<Self> {
        tracing::info!("Starting background process: {}", description);
        let child = cmd
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::Process {
                command: description.clone(),
                reason: e.to_string(),
            })?;
        Ok(Self { description, child })
    }

    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Exit status if the process has already exited.
    pub fn try_status(&mut self) -> Result<Option<ExitStatus>> {
        Ok(self.child.try_wait()?)
    }

    /// Terminate, wait up to `grace`, then kill.
    pub async fn shutdown(mut self, grace: Duration) -> Result<ExitStatus> {
        if let Some(status) = self.child.try_wait()? {
            return Ok(status);
        }

        tracing::info!("Terminating {}...", self.description);
        self.terminate()?;

        match tokio::time::timeout(grace, self.child.wait()).await {
            Ok(status) => Ok(status?),
            Err(_) => {
                tracing::info!("Killing {}...", self.description);
                self.child.kill().await?;
                Ok(self.child.wait().await?)
            }
        }
    }

    #[cfg(unix)]
    fn terminate(&mut self) -> Result<()> {
        let Some(pid) = self.child.id() else {
            return Ok(());
        };
        // SAFETY: pid belongs to a child we have not yet reaped.
        let result = unsafe { libc::kill(pid as libc::pid_t, libc::SIGTERM) };
        if result != 0 {
            return Err(std::io::Error::last_os_error().into());
        }
        Ok(())
    }

    #[cfg(not(unix))]
    fn terminate(&mut self) -> Result<()> {
        self.child.start_kill()?;
        Ok(())
    }
}
