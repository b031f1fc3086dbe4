// ABOUTME: Remote command description, execution flags and results.
// ABOUTME: Token sequences are joined with single spaces before execution.

use std::fmt;
use std::time::Duration;

/// A command to run on the remote host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCommand {
    Line(String),
    Tokens(Vec<String>),
}

impl RemoteCommand {
    /// The exact string sent to the remote side.
    pub fn to_command_line(&self) -> String {
        match self {
            RemoteCommand::Line(line) => line.clone(),
            RemoteCommand::Tokens(tokens) => tokens.join(" "),
        }
    }
}

impl fmt::Display for RemoteCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_command_line())
    }
}

impl From<&str> for RemoteCommand {
    fn from(line: &str) -> Self {
        RemoteCommand::Line(line.to_string())
    }
}

impl From<String> for RemoteCommand {
    fn from(line: String) -> Self {
        RemoteCommand::Line(line)
    }
}

impl From<Vec<String>> for RemoteCommand {
    fn from(tokens: Vec<String>) -> Self {
        RemoteCommand::Tokens(tokens)
    }
}

impl From<&[&str]> for RemoteCommand {
    fn from(tokens: &[&str]) -> Self {
        RemoteCommand::Tokens(tokens.iter().map(|t| t.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for RemoteCommand {
    fn from(tokens: [&str; N]) -> Self {
        RemoteCommand::Tokens(tokens.iter().map(|t| t.to_string()).collect())
    }
}

/// Channel flags applied before the command runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecOptions {
    /// Allocate a pseudo-terminal.
    pub pty: bool,
    /// Start an interactive shell and feed it the command.
    pub shell: bool,
    /// Merge stderr into stdout.
    pub combine_stderr: bool,
    /// Limit on the blocking wait for the command. None waits forever.
    pub timeout: Option<Duration>,
}

impl ExecOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pty(mut self, pty: bool) -> Self {
        self.pty = pty;
        self
    }

    pub fn shell(mut self, shell: bool) -> Self {
        self.shell = shell;
        self
    }

    pub fn combine_stderr(mut self, combine: bool) -> Self {
        self.combine_stderr = combine;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Output from a remote command execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code of the command.
    pub exit_code: u32,
    /// Standard output.
    pub stdout: Vec<u8>,
    /// Standard error. Empty when stderr was combined into stdout.
    pub stderr: Vec<u8>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}
